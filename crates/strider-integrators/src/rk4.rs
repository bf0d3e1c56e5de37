//! Classical fourth-order Runge-Kutta.

use strider_integrator::{Integrator, State, Stepper};

/// Four-pass classical Runge-Kutta.
///
/// Also the bootstrap initializer of the predictor-corrector schemes.
#[derive(Clone, Debug, Default)]
pub struct Rk4 {
    x0: f64,
    xd0: f64,
    xd1: f64,
    xd2: f64,
}

impl Integrator for Rk4 {
    fn name(&self) -> &'static str {
        "rk4"
    }

    fn factory(&self) -> Box<dyn Integrator> {
        Box::new(Rk4::default())
    }

    fn propagate(&mut self, state: &mut State, clock: &Stepper) {
        let dt = clock.dt;
        match clock.kpass {
            0 => {
                self.x0 = state.x;
                self.xd0 = state.xd;
                state.x = self.x0 + 0.5 * dt * state.xd;
            }
            1 => {
                self.xd1 = state.xd;
                state.x = self.x0 + 0.5 * dt * state.xd;
            }
            2 => {
                self.xd2 = state.xd;
                state.x = self.x0 + dt * state.xd;
            }
            _ => {
                state.x = self.x0
                    + dt / 6.0 * (self.xd0 + 2.0 * self.xd1 + 2.0 * self.xd2 + state.xd);
            }
        }
    }

    fn update_clock(&self, clock: &mut Stepper) {
        advance_clock(clock);
    }
}

/// The RK4 clock, shared with the schemes it bootstraps. Returns `true` when
/// a full step completes.
pub(crate) fn advance_clock(clock: &mut Stepper) -> bool {
    match clock.kpass {
        0 => clock.t += 0.5 * clock.dt,
        2 => clock.t = clock.t1,
        _ => {}
    }
    clock.advance_pass(4)
}

/// Run one RK4 clock pass on behalf of a multi-step scheme that needs
/// `steps` full bootstrap steps of derivative history.
pub(crate) fn bootstrap_clock(clock: &mut Stepper, steps: u32) {
    if advance_clock(clock) {
        clock.bootstrap_steps += 1;
        if clock.bootstrap_steps >= steps {
            clock.integrator_initialized = true;
        }
    }
}
