//! The shared simulation clock.

/// Clock variables shared by every state under one simulator.
///
/// Only the active integrator's [`update_clock`](crate::Integrator::update_clock)
/// and the simulator's step-size and end-time logic mutate a `Stepper`.
#[derive(Clone, Debug, PartialEq)]
pub struct Stepper {
    /// Time comparison tolerance.
    pub eps: f64,
    /// Base step of the run loop.
    pub dtp: f64,
    /// Working step; shortened by sampling and events.
    pub dt: f64,
    /// Current simulation time.
    pub t: f64,
    /// Time at the start of the full step in progress.
    pub t0: f64,
    /// Intended end time of the step in progress.
    pub t1: f64,
    /// Pass index within the current full step.
    pub kpass: usize,
    /// Whether a multi-step or FSAL scheme has enough history to run its
    /// own formula.
    pub integrator_initialized: bool,
    /// Full bootstrap steps completed by a multi-step scheme's initializer.
    pub bootstrap_steps: u32,
}

impl Stepper {
    /// A clock at `t = 0` with no step configured.
    pub fn new(eps: f64) -> Self {
        Self {
            eps,
            dtp: 0.0,
            dt: 0.0,
            t: 0.0,
            t0: 0.0,
            t1: 0.0,
            kpass: 0,
            integrator_initialized: false,
            bootstrap_steps: 0,
        }
    }

    /// Whether the clock is at the first pass of a full step.
    pub fn at_step_start(&self) -> bool {
        self.kpass == 0
    }

    /// Move `t` to `t0 + c * dt`, recording `t0` on the first pass.
    pub fn stage_time(&mut self, c: f64) {
        if self.kpass == 0 {
            self.t0 = self.t;
        }
        self.t = self.t0 + c * self.dt;
    }

    /// Advance the pass counter modulo `stages`. When it wraps to zero the
    /// next full-step boundary is recomputed on the `dtp` grid. Returns
    /// `true` on wrap.
    pub fn advance_pass(&mut self, stages: usize) -> bool {
        self.kpass = (self.kpass + 1) % stages;
        if self.kpass == 0 {
            self.t1 = self.next_boundary();
            true
        } else {
            false
        }
    }

    /// The first multiple of `dtp` strictly after `t` (within `eps`).
    pub fn next_boundary(&self) -> f64 {
        (((self.t + self.eps) / self.dtp) + 1.0).floor() * self.dtp
    }

    /// Clear scheme history; used when a run restarts.
    pub fn reset_scheme(&mut self) {
        self.kpass = 0;
        self.integrator_initialized = false;
        self.bootstrap_steps = 0;
    }
}

impl Default for Stepper {
    fn default() -> Self {
        Self::new(1e-8)
    }
}
