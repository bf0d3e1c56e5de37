//! Real-time fourth-order Adams-Moulton predictor-corrector.

use strider_integrator::{Integrator, State, Stepper};

use crate::rk4::{self, Rk4};

const BOOTSTRAP_STEPS: u32 = 3;

/// Two-pass real-time Adams-Moulton using three past derivatives.
///
/// The first three steps run under [`Rk4`] while the history fills. The
/// bootstrap step count lives on the shared clock, so every state sees the
/// same switch-over step.
#[derive(Clone, Debug, Default)]
pub struct Rtam4 {
    init: Rk4,
    x0: f64,
    xd0: f64,
    /// Derivatives one, two and three steps back.
    history: [f64; 3],
}

impl Integrator for Rtam4 {
    fn name(&self) -> &'static str {
        "rtam4"
    }

    fn factory(&self) -> Box<dyn Integrator> {
        Box::new(Rtam4::default())
    }

    fn propagate(&mut self, state: &mut State, clock: &Stepper) {
        if !clock.integrator_initialized {
            if clock.kpass == 0 {
                self.history.rotate_right(1);
                self.history[0] = state.xd;
            }
            self.init.propagate(state, clock);
            return;
        }
        let [xd_1, xd_2, xd_3] = self.history;
        match clock.kpass {
            0 => {
                self.x0 = state.x;
                self.xd0 = state.xd;
                state.x = self.x0
                    + clock.dt / 384.0
                        * (297.0 * state.xd - 187.0 * xd_1 + 107.0 * xd_2 - 25.0 * xd_3);
            }
            _ => {
                state.x = self.x0
                    + clock.dt / 30.0 * (36.0 * state.xd - 10.0 * self.xd0 + 5.0 * xd_1 - xd_2);
                self.history = [self.xd0, xd_1, xd_2];
            }
        }
    }

    fn update_clock(&self, clock: &mut Stepper) {
        if !clock.integrator_initialized {
            rk4::bootstrap_clock(clock, BOOTSTRAP_STEPS);
            return;
        }
        match clock.kpass {
            0 => clock.t += 0.5 * clock.dt,
            _ => clock.t = clock.t1,
        }
        clock.advance_pass(2);
    }
}
