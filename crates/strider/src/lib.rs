//! Strider: a continuous-time simulation kernel.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Strider sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use strider::prelude::*;
//!
//! // x' = -x, integrated with the default RK4 scheme.
//! struct Decay {
//!     x: StateId,
//! }
//!
//! impl Module for Decay {
//!     fn update(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
//!         let x = ctx.x(self.x);
//!         ctx.set_xd(self.x, -x);
//!         Ok(())
//!     }
//! }
//!
//! let sim = Simulator::new();
//! let decay = sim.add_with(|setup| Decay { x: setup.add_state(1.0) });
//! sim.run(0.01, 1.0).unwrap();
//!
//! let x = decay.state(StateId(0)).unwrap().x;
//! assert!((x - (-1.0f64).exp()).abs() < 1e-9);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `strider-core` | Ids, the [`types::Phase`] machine, values and errors |
//! | [`integrator`] | `strider-integrator` | [`integrator::State`], [`integrator::Stepper`] and the [`integrator::Integrator`] trait |
//! | [`integrators`] | `strider-integrators` | Reference schemes, fixed-step and adaptive |
//! | [`engine`] | `strider-engine` | [`engine::Simulator`], modules, links, stoppers and tracking |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and errors (`strider-core`).
pub use strider_core as types;

/// The state primitive, shared clock and integrator contract
/// (`strider-integrator`).
///
/// Implement [`integrator::Integrator`] to plug a new scheme into a
/// simulator.
pub use strider_integrator as integrator;

/// Reference integration schemes (`strider-integrators`).
///
/// Look schemes up by name with [`integrators::by_name`].
pub use strider_integrators as integrators;

/// The simulator and module machinery (`strider-engine`).
pub use strider_engine as engine;

/// Common imports for typical Strider usage.
///
/// ```rust
/// use strider::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use strider_core::{ModuleId, Phase, SimulatorId, StateId, Value};

    // Errors
    pub use strider_core::{ConfigError, ModuleError, RunError, VarError};

    // Integration
    pub use strider_integrator::{Integrator, State};
    pub use strider_integrators::{Dopri45, Dopri87, Euler, Rk4};

    // Engine
    pub use strider_engine::{
        AsModule, Context, Link, Module, ModuleRef, RunObserver, Setup, Simulator,
        SimulatorConfig, Stopper,
    };
}
