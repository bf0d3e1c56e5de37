//! The [`Module`] trait and the [`Setup`] builder used to create modules.

use std::rc::Rc;

use strider_core::{ModuleError, StateId, Value, VarError};
use strider_integrator::State;

use crate::context::Context;
use crate::node::{Slot, Slots};
use crate::simulator::{SimShared, Simulator};

/// A unit of simulated behaviour.
///
/// A module owns integrated states (registered through [`Setup`] at
/// construction) and reacts to the simulator's phases through lifecycle
/// hooks. Each hook runs at most once per phase sweep.
///
/// # Default hooks
///
/// A hook that is not overridden removes the module from that phase's
/// registry the first time it is called, so the simulator stops visiting
/// it. Overriding a hook keeps the module scheduled.
///
/// # Examples
///
/// Exponential decay, `xd = -k x`:
///
/// ```
/// use strider_core::{ModuleError, StateId};
/// use strider_engine::{AsModule, Context, Module, Simulator};
///
/// struct Decay {
///     x: StateId,
///     k: f64,
/// }
///
/// impl Module for Decay {
///     fn update(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
///         let x = ctx.x(self.x);
///         ctx.set_xd(self.x, -self.k * x);
///         Ok(())
///     }
/// }
///
/// let sim = Simulator::new();
/// let decay = sim.add_with(|setup| Decay { x: setup.add_state(1.0), k: 1.0 });
/// sim.run(0.01, 1.0).unwrap();
/// let x = decay.state(StateId(0)).unwrap().x;
/// assert!((x - (-1.0_f64).exp()).abs() < 1e-9);
/// ```
pub trait Module: 'static {
    /// Called once, before the module's first update.
    fn init(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        ctx.unschedule();
        Ok(())
    }

    /// Compute derivatives. Called on every integrator pass.
    fn update(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        ctx.unschedule();
        Ok(())
    }

    /// Computations on freshly propagated states, once per full step.
    fn postcalc(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        ctx.unschedule();
        Ok(())
    }

    /// Evaluate stop conditions, once per full step.
    fn check(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        ctx.unschedule();
        Ok(())
    }

    /// Output point, once per full step and once before the first update.
    fn report(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        ctx.unschedule();
        Ok(())
    }

    /// Cleanup before the next step, once per full step.
    fn reset(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        ctx.unschedule();
        Ok(())
    }

    /// Read a variable by name. `None` if the module has no such variable.
    fn var(&self, name: &str) -> Option<Value> {
        let _ = name;
        None
    }

    /// Write a variable by name. Only called for names [`var`](Module::var)
    /// knows; the default treats every variable as read-only.
    fn set_var(&mut self, name: &str, value: Value) -> Result<(), VarError> {
        let _ = value;
        Err(VarError::ReadOnly { name: name.into() })
    }
}

/// Construction-time access for a module being created: registers its
/// integrated states.
pub struct Setup<'a> {
    sim: &'a Rc<SimShared>,
    slots: Slots,
}

impl<'a> Setup<'a> {
    pub(crate) fn new(sim: &'a Rc<SimShared>) -> Self {
        Self {
            sim,
            slots: Slots::new(),
        }
    }

    pub(crate) fn into_slots(self) -> Slots {
        self.slots
    }

    /// Register a non-adaptive state with initial value `x0`.
    pub fn add_state(&mut self, x0: f64) -> StateId {
        self.push(State::new(x0))
    }

    /// Register a state with an adaptive-step tolerance. A non-positive
    /// tolerance disables adaptivity for the state.
    pub fn add_state_with_tolerance(&mut self, x0: f64, tolerance: f64) -> StateId {
        self.push(State::with_tolerance(x0, tolerance))
    }

    /// Register one non-adaptive state per initial value.
    pub fn add_states(&mut self, x0: &[f64]) -> Vec<StateId> {
        x0.iter().map(|&x| self.add_state(x)).collect()
    }

    /// Current simulation time.
    pub fn t(&self) -> f64 {
        self.sim.clock.borrow().t
    }

    /// Handle to the owning simulator, for creating sub-modules.
    pub fn simulator(&self) -> Simulator {
        Simulator::from_shared(Rc::clone(self.sim))
    }

    fn push(&mut self, state: State) -> StateId {
        let scheme = self.sim.integrator.borrow().factory();
        self.sim.states_registered.set(true);
        self.slots.push(Slot { state, scheme });
        StateId(self.slots.len() - 1)
    }
}
