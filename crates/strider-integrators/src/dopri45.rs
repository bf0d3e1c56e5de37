//! Dormand-Prince 5(4) embedded pair.
//!
//! Six passes per step. The fifth-order solution is propagated; the
//! fourth-order companion needs the derivative at the end of the step,
//! which is also the first stage of the next step (first-same-as-last).
//! The error estimate is therefore taken at the start of the following
//! step, after `update` and before `propagate`.

use strider_integrator::{Integrator, State, Stepper};

use crate::tableau::weighted;

const STAGES: usize = 6;

/// Stage times as fractions of `dt`, for passes 1 to 4.
const C: [f64; 4] = [1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0];

/// Rows for passes 0 to 4; row `p` weighs the stage derivatives `k[0..=p]`.
const A: [&[f64]; 5] = [
    &[1.0 / 5.0],
    &[3.0 / 40.0, 9.0 / 40.0],
    &[44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0],
    &[19372.0 / 6561.0, -25360.0 / 2187.0, 64448.0 / 6561.0, -212.0 / 729.0],
    &[
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
    ],
];

/// Fifth-order weights, used on the last pass.
const B5: [f64; STAGES] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
];

/// Fourth-order weights; the seventh applies to the next step's first
/// derivative.
const B4: [f64; STAGES + 1] = [
    5179.0 / 57600.0,
    0.0,
    7571.0 / 16695.0,
    393.0 / 640.0,
    -92097.0 / 339200.0,
    187.0 / 2100.0,
    1.0 / 40.0,
];

/// Dormand-Prince 5(4), adaptive with first-same-as-last error estimation.
#[derive(Clone, Debug, Default)]
pub struct Dopri45 {
    x0: f64,
    /// Step size of the step that produced the stored stages.
    h: f64,
    k: [f64; STAGES],
}

impl Integrator for Dopri45 {
    fn name(&self) -> &'static str {
        "dopri45"
    }

    fn factory(&self) -> Box<dyn Integrator> {
        Box::new(Dopri45::default())
    }

    fn propagate(&mut self, state: &mut State, clock: &Stepper) {
        let p = clock.kpass;
        if p == 0 {
            self.x0 = state.x;
            self.h = clock.dt;
        }
        self.k[p] = state.xd;
        let row: &[f64] = if p < STAGES - 1 { A[p] } else { &B5 };
        state.x = self.x0 + clock.dt * weighted(row, &self.k);
    }

    fn update_clock(&self, clock: &mut Stepper) {
        match clock.kpass {
            p @ 0..=3 => clock.stage_time(C[p]),
            4 => clock.t = clock.t1,
            _ => {}
        }
        clock.integrator_initialized = true;
        clock.advance_pass(STAGES);
    }

    /// Called at the first pass of a step, once `xd` holds the derivative
    /// at the end of the previous step and `x` still holds its
    /// fifth-order result.
    fn optimal_time_step(&self, state: &State, _clock: &Stepper) -> Option<f64> {
        let tolerance = state.tolerance()?;
        let x4 = self.x0
            + self.h * (weighted(&B4[..STAGES], &self.k) + B4[STAGES] * state.xd);
        let error = (x4 - state.x).abs();
        // Fifth-root controller with a safety factor, growth capped at 2.
        let s = if error > 0.0 {
            (0.9 * (tolerance / error).powf(0.2)).min(2.0)
        } else {
            2.0
        };
        Some(s * self.h)
    }

    fn adaptive_fsal(&self) -> bool {
        true
    }
}
