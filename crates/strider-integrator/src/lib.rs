//! State, shared clock and integrator contract for Strider simulations.
//!
//! A [`State`] is one scalar ODE variable. Every state under a simulator
//! advances on the same [`Stepper`] clock; the per-state scheme scratch
//! lives in a boxed [`Integrator`] created by [`Integrator::factory`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod integrator;
pub mod state;
pub mod stepper;

pub use integrator::Integrator;
pub use state::State;
pub use stepper::Stepper;
