//! Real-time second-order Adams-Moulton predictor-corrector.

use strider_integrator::{Integrator, State, Stepper};

use crate::rk4::{self, Rk4};

/// Two-pass real-time Adams-Moulton. The half-step value is predicted from
/// the current and previous derivatives; the full step is a midpoint
/// correction. Bootstraps with one [`Rk4`] step.
#[derive(Clone, Debug, Default)]
pub struct Rtam2 {
    init: Rk4,
    x0: f64,
    xd_1: f64,
}

impl Integrator for Rtam2 {
    fn name(&self) -> &'static str {
        "rtam2"
    }

    fn factory(&self) -> Box<dyn Integrator> {
        Box::new(Rtam2::default())
    }

    fn propagate(&mut self, state: &mut State, clock: &Stepper) {
        if !clock.integrator_initialized {
            if clock.kpass == 0 {
                self.xd_1 = state.xd;
            }
            self.init.propagate(state, clock);
            return;
        }
        match clock.kpass {
            0 => {
                self.x0 = state.x;
                state.x = self.x0 + clock.dt / 8.0 * (5.0 * state.xd - self.xd_1);
                self.xd_1 = state.xd;
            }
            _ => state.x = self.x0 + clock.dt * state.xd,
        }
    }

    fn update_clock(&self, clock: &mut Stepper) {
        if !clock.integrator_initialized {
            rk4::bootstrap_clock(clock, 1);
            return;
        }
        match clock.kpass {
            0 => clock.t += 0.5 * clock.dt,
            _ => clock.t = clock.t1,
        }
        clock.advance_pass(2);
    }
}
