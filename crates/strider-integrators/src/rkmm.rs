//! Runge-Kutta-Merson.

use strider_integrator::{Integrator, State, Stepper};

/// Five-pass fourth-order Runge-Kutta-Merson scheme.
///
/// Stage times are `t`, `t + dt/3`, `t + dt/3`, `t + dt/2`, `t + dt`.
#[derive(Clone, Debug, Default)]
pub struct Rkmm {
    x0: f64,
    k: [f64; 4],
}

impl Integrator for Rkmm {
    fn name(&self) -> &'static str {
        "rkmm"
    }

    fn factory(&self) -> Box<dyn Integrator> {
        Box::new(Rkmm::default())
    }

    fn propagate(&mut self, state: &mut State, clock: &Stepper) {
        let step = clock.dt * state.xd;
        let [k1, k2, k3, k4] = &mut self.k;
        match clock.kpass {
            0 => {
                self.x0 = state.x;
                *k1 = step;
                state.x = self.x0 + *k1 / 3.0;
            }
            1 => {
                *k2 = step;
                state.x = self.x0 + (*k1 + *k2) / 6.0;
            }
            2 => {
                *k3 = step;
                state.x = self.x0 + 0.125 * *k1 + 0.375 * *k3;
            }
            3 => {
                *k4 = step;
                state.x = self.x0 + 0.5 * *k1 - 1.5 * *k3 + 2.0 * *k4;
            }
            _ => state.x = self.x0 + (*k1 + 4.0 * *k4 + step) / 6.0,
        }
    }

    fn update_clock(&self, clock: &mut Stepper) {
        match clock.kpass {
            0 => clock.t += clock.dt / 3.0,
            2 => clock.t += clock.dt / 6.0,
            3 => clock.t = clock.t1,
            _ => {}
        }
        clock.advance_pass(5);
    }
}
