//! Simulation engine for Strider.
//!
//! Provides the [`Simulator`] that advances a graph of [`Module`]s through
//! the per-tick phase state machine, resolving `run_before` ordering on
//! demand, propagating module states with a pluggable integration scheme,
//! and adapting the step size when the scheme supports it.
//!
//! Modules are held through [`Link`] and [`ModuleRef`] handles. Dropping
//! the last handle during a run defers destruction to the end of the
//! current full step.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod call;
pub mod config;
pub mod context;
pub mod directory;
pub mod history;
pub mod link;
pub mod module;
mod node;
pub mod observer;
mod registry;
pub mod simulator;
pub mod stopper;

pub use config::SimulatorConfig;
pub use context::Context;
pub use history::History;
pub use link::{AsModule, Link, ModuleRef};
pub use module::{Module, Setup};
pub use node::ModuleHeader;
pub use observer::RunObserver;
pub use simulator::Simulator;
pub use stopper::Stopper;
