//! Test fixtures for Strider development.
//!
//! Small modules with known behaviour for exercising the engine: analytic
//! ODEs ([`Decay`], [`ConstantRate`]), a hook-call [`Recorder`], a
//! time-triggered [`StopAt`] for stoppers, and a [`Failing`] module.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{labels, Call, CallLog, ConstantRate, Decay, Failing, Recorder, StopAt};
