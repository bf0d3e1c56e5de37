//! The [`Context`] handed to every lifecycle hook.

use std::rc::Rc;

use strider_core::{ModuleId, Phase, StateId};
use strider_integrator::State;

use crate::link::AsModule;
use crate::node::ModuleHeader;
use crate::simulator::Simulator;

/// A hook's view of its own module and of the simulator clock.
///
/// State accessors index the module's own states with the [`StateId`]s
/// issued by [`Setup`](crate::Setup); an id from another module panics
/// if it is out of range.
pub struct Context<'a> {
    header: &'a ModuleHeader,
    phase: Phase,
}

impl<'a> Context<'a> {
    pub(crate) fn new(header: &'a ModuleHeader, phase: Phase) -> Self {
        Self { header, phase }
    }

    // ── Identity ───────────────────────────────────────────────────

    /// This module's id.
    pub fn id(&self) -> ModuleId {
        self.header.id
    }

    /// This module's name.
    pub fn name(&self) -> String {
        self.header.name()
    }

    /// Handle to the owning simulator.
    pub fn simulator(&self) -> Simulator {
        Simulator::from_shared(Rc::clone(&self.header.sim))
    }

    // ── Clock ──────────────────────────────────────────────────────

    /// The phase of the hook being executed. Differs from the simulator's
    /// phase when a link access forces a lagging `init`.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current simulation time.
    pub fn t(&self) -> f64 {
        self.header.sim.clock.borrow().t
    }

    /// Working step of the current full step.
    pub fn dt(&self) -> f64 {
        self.header.sim.clock.borrow().dt
    }

    /// Base step of the run loop.
    pub fn dt_base(&self) -> f64 {
        self.header.sim.clock.borrow().dtp
    }

    /// End time of the current run.
    pub fn t_end(&self) -> f64 {
        self.header.sim.flags.get().t_end
    }

    /// Integrator pass within the current full step.
    pub fn kpass(&self) -> usize {
        self.header.sim.clock.borrow().kpass
    }

    /// True for the first update pass (and the report before it) of a run.
    pub fn first_update(&self) -> bool {
        self.header.sim.flags.get().tickfirst
    }

    /// True for the report before the first update of a run.
    pub fn first_report(&self) -> bool {
        self.header.sim.flags.get().tickfirst
    }

    /// True for the report of the final step of a run.
    pub fn last_report(&self) -> bool {
        self.header.sim.flags.get().ticklast
    }

    /// Whether the last clock update moved time forward.
    pub fn time_advanced(&self) -> bool {
        self.header.sim.flags.get().time_advanced
    }

    /// True at the first pass of a full step.
    pub fn sample(&self) -> bool {
        self.header.sim.clock.borrow().at_step_start()
    }

    /// Align the step grid to multiples of `sdt`. True when `t` is on a
    /// multiple of `sdt`. Always false on intermediate passes.
    pub fn sample_every(&mut self, sdt: f64) -> bool {
        self.header.sim.sample_every(sdt)
    }

    /// Make `t_event` a step boundary if it falls inside the current step.
    /// True when `t` is at `t_event`. Always false on intermediate passes.
    pub fn event(&mut self, t_event: f64) -> bool {
        self.header.sim.event(t_event)
    }

    // ── States ─────────────────────────────────────────────────────

    /// Value of state `id`.
    pub fn x(&self, id: StateId) -> f64 {
        self.header.states.borrow()[id.0].state.x
    }

    /// Derivative of state `id`.
    pub fn xd(&self, id: StateId) -> f64 {
        self.header.states.borrow()[id.0].state.xd
    }

    /// Overwrite the value of state `id`.
    pub fn set_x(&mut self, id: StateId, x: f64) {
        self.header.states.borrow_mut()[id.0].state.x = x;
    }

    /// Set the derivative of state `id`.
    pub fn set_xd(&mut self, id: StateId, xd: f64) {
        self.header.states.borrow_mut()[id.0].state.xd = xd;
    }

    /// Copy of state `id`.
    pub fn state(&self, id: StateId) -> State {
        self.header.states.borrow()[id.0].state
    }

    // ── Control ────────────────────────────────────────────────────

    /// Set this module's stop flag, read by stoppers that include it.
    pub fn set_stop(&mut self, stop: bool) {
        self.header.stop.set(stop);
    }

    /// This module's stop flag.
    pub fn stop(&self) -> bool {
        self.header.stop.get()
    }

    /// Finish the run after the current full step.
    pub fn stop_simulation(&mut self) {
        self.header.sim.with_flags(|f| f.stop_simulation = true);
    }

    /// Request a new base step, committed at the next step boundary.
    pub fn request_dt(&mut self, dt: f64) {
        self.header.sim.request_dt(dt);
    }

    /// Request a new end time, committed after the current full step.
    pub fn set_end_time(&mut self, t_end: f64) {
        self.header.sim.set_end_time(t_end);
    }

    /// Register this module to complete update and postcalc before
    /// `other`.
    pub fn run_before(&self, other: &impl AsModule) {
        if let Ok(target) = other.header() {
            target
                .run_first
                .borrow_mut()
                .insert(self.header.id, self.header.this.clone());
        }
    }

    /// Register `other` to complete update and postcalc before this module.
    pub fn depends_on(&self, other: &impl AsModule) {
        if let Ok(dep) = other.header() {
            self.header
                .run_first
                .borrow_mut()
                .insert(dep.id, dep.this.clone());
        }
    }

    /// Remove this module from the current phase's registry.
    pub(crate) fn unschedule(&mut self) {
        if let Some(registry) = self.header.sim.phase_registry(self.phase) {
            registry.erase(self.header.id);
        }
    }
}
