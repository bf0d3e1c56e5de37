//! Forward Euler.

use strider_integrator::{Integrator, State, Stepper};

/// Single-pass forward Euler: `x += dt * xd`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Euler;

impl Integrator for Euler {
    fn name(&self) -> &'static str {
        "euler"
    }

    fn factory(&self) -> Box<dyn Integrator> {
        Box::new(Euler)
    }

    fn propagate(&mut self, state: &mut State, clock: &Stepper) {
        state.x += clock.dt * state.xd;
    }

    fn update_clock(&self, clock: &mut Stepper) {
        clock.t = clock.t1;
        clock.advance_pass(1);
    }
}
