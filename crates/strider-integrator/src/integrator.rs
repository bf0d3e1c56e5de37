//! The [`Integrator`] trait.
//!
//! An integrator advances one [`State`] through the passes of a full time
//! step. The simulator holds one prototype instance, used to advance the
//! shared [`Stepper`] clock, and asks it for a fresh per-state instance via
//! [`Integrator::factory`] whenever a module registers a state.

use crate::state::State;
use crate::stepper::Stepper;

/// A numerical integration scheme.
///
/// # Contract
///
/// - `propagate()` is called once per pass for every non-frozen state, after
///   the `update` sweep has written `xd`. It reads the pass index from the
///   clock and writes the next intra-step value of `x`.
/// - `update_clock()` is called once per pass on the simulator's prototype,
///   after all states have propagated. It advances `t` to the time of the
///   next pass and rolls `kpass`, recomputing `t1` on wrap. It must not
///   touch per-state scratch.
/// - All instances produced by one prototype read the same clock. Clock
///   state is never stored inside an integrator.
///
/// # Object safety
///
/// This trait is object-safe; the engine stores integrators as
/// `Box<dyn Integrator>`.
///
/// # Examples
///
/// Forward Euler in one pass:
///
/// ```
/// use strider_integrator::{Integrator, State, Stepper};
///
/// struct Euler;
///
/// impl Integrator for Euler {
///     fn name(&self) -> &'static str { "euler" }
///     fn factory(&self) -> Box<dyn Integrator> { Box::new(Euler) }
///     fn propagate(&mut self, state: &mut State, clock: &Stepper) {
///         state.x += clock.dt * state.xd;
///     }
///     fn update_clock(&self, clock: &mut Stepper) {
///         clock.t = clock.t1;
///         clock.advance_pass(1);
///     }
/// }
///
/// let mut clock = Stepper::new(1e-8);
/// clock.dtp = 0.5;
/// clock.dt = 0.5;
/// clock.t1 = 0.5;
/// let mut state = State::new(1.0);
/// state.xd = 2.0;
///
/// let mut scheme = Euler.factory();
/// scheme.propagate(&mut state, &clock);
/// Euler.update_clock(&mut clock);
/// assert_eq!(state.x, 2.0);
/// assert_eq!(clock.t, 0.5);
/// assert_eq!(clock.t1, 1.0);
/// ```
pub trait Integrator: 'static {
    /// Short scheme name for diagnostics.
    fn name(&self) -> &'static str;

    /// A fresh instance with empty scratch, bound to the same clock as
    /// `self`. History is never shared between states.
    fn factory(&self) -> Box<dyn Integrator>;

    /// Compute the next intra-step value of `state.x` for the current pass.
    fn propagate(&mut self, state: &mut State, clock: &Stepper);

    /// Advance the shared clock to the next pass.
    fn update_clock(&self, clock: &mut Stepper);

    /// Candidate step size from this state's local error estimate.
    ///
    /// `None` when no estimate is available (the scheme is not adaptive or
    /// the state has no tolerance). A zero error estimate yields a doubled
    /// step rather than a division by zero.
    fn optimal_time_step(&self, state: &State, clock: &Stepper) -> Option<f64> {
        let _ = (state, clock);
        None
    }

    /// Adaptive scheme whose estimate is computed after a full step.
    fn adaptive(&self) -> bool {
        false
    }

    /// First-same-as-last adaptive scheme: the estimate is computed before
    /// the final propagation of the next step, while the previous step's
    /// stage derivatives are still held.
    fn adaptive_fsal(&self) -> bool {
        false
    }
}
