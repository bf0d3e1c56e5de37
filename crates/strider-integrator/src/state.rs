//! The [`State`] primitive.

/// One scalar ODE state: a value, its derivative, and an optional
/// adaptive-step tolerance.
///
/// The owning module writes `xd` during `update`; the integrator reads it
/// and writes `x` during propagation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct State {
    /// Current value.
    pub x: f64,
    /// Derivative of `x` with respect to time.
    pub xd: f64,
    tolerance: Option<f64>,
}

impl State {
    /// A non-adaptive state with initial value `x`.
    pub fn new(x: f64) -> Self {
        Self {
            x,
            xd: 0.0,
            tolerance: None,
        }
    }

    /// A state with initial value `x` and an adaptive-step tolerance.
    ///
    /// A tolerance that is not strictly positive disables adaptivity.
    pub fn with_tolerance(x: f64, tolerance: f64) -> Self {
        let mut s = Self::new(x);
        s.set_tolerance(tolerance);
        s
    }

    /// The adaptive-step tolerance, or `None` if this state does not take
    /// part in step-size selection.
    pub fn tolerance(&self) -> Option<f64> {
        self.tolerance
    }

    /// Set the tolerance. Non-positive or NaN values disable adaptivity.
    pub fn set_tolerance(&mut self, tolerance: f64) {
        self.tolerance = (tolerance > 0.0).then_some(tolerance);
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new(0.0)
    }
}
