//! Explicit midpoint method.

use strider_integrator::{Integrator, State, Stepper};

/// Two-pass second-order Runge-Kutta (midpoint).
#[derive(Clone, Debug, Default)]
pub struct Rk2 {
    x0: f64,
}

impl Integrator for Rk2 {
    fn name(&self) -> &'static str {
        "rk2"
    }

    fn factory(&self) -> Box<dyn Integrator> {
        Box::new(Rk2::default())
    }

    fn propagate(&mut self, state: &mut State, clock: &Stepper) {
        match clock.kpass {
            0 => {
                self.x0 = state.x;
                state.x = self.x0 + 0.5 * clock.dt * state.xd;
            }
            _ => state.x = self.x0 + clock.dt * state.xd,
        }
    }

    fn update_clock(&self, clock: &mut Stepper) {
        match clock.kpass {
            0 => clock.t += 0.5 * clock.dt,
            _ => clock.t = clock.t1,
        }
        clock.advance_pass(2);
    }
}
