//! Core types and errors for the Strider simulation kernel.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! vocabulary shared by the integrator and engine crates: identifiers,
//! the per-tick [`Phase`] state machine, named-variable [`Value`]s, and
//! the error taxonomy.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod phase;
pub mod value;

pub use error::{ConfigError, ModuleError, RunError, VarError};
pub use id::{ModuleId, SimulatorId, StateId};
pub use phase::Phase;
pub use value::Value;
