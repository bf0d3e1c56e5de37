//! Real-time predictor-corrector, P-2/PC-3/C-3.
//!
//! Same order and error coefficient as the P-3/PC-3/C-3 scheme, with better
//! stability. Derivatives are evaluated at one-third, two-thirds and the end
//! of each step. See R.M. Howe, "A new family of real-time
//! predictor-corrector integration algorithms", University of Michigan, 1991.

use strider_integrator::{Integrator, State, Stepper};

use crate::rk4::{self, Rk4};

/// Three-pass third-order real-time predictor-corrector.
///
/// Needs the derivative from the previous step, so the first step runs
/// under [`Rk4`].
#[derive(Clone, Debug, Default)]
pub struct Pc233 {
    init: Rk4,
    x0: f64,
    xd0: f64,
    xd_1: f64,
}

impl Integrator for Pc233 {
    fn name(&self) -> &'static str {
        "pc233"
    }

    fn factory(&self) -> Box<dyn Integrator> {
        Box::new(Pc233::default())
    }

    fn propagate(&mut self, state: &mut State, clock: &Stepper) {
        if !clock.integrator_initialized {
            if clock.kpass == 0 {
                self.xd_1 = state.xd;
            }
            self.init.propagate(state, clock);
            return;
        }
        let dt = clock.dt;
        match clock.kpass {
            0 => {
                self.x0 = state.x;
                self.xd0 = state.xd;
                state.x = self.x0 + dt / 18.0 * (7.0 * state.xd - self.xd_1);
            }
            1 => {
                state.x =
                    self.x0 + dt / 54.0 * (39.0 * state.xd - 4.0 * self.xd0 + self.xd_1);
            }
            _ => {
                state.x = self.x0 + dt / 4.0 * (self.xd0 + 3.0 * state.xd);
                self.xd_1 = self.xd0;
            }
        }
    }

    fn update_clock(&self, clock: &mut Stepper) {
        if !clock.integrator_initialized {
            rk4::bootstrap_clock(clock, 1);
            return;
        }
        match clock.kpass {
            0 | 1 => clock.t += clock.dt / 3.0,
            _ => clock.t = clock.t1,
        }
        clock.advance_pass(3);
    }
}
