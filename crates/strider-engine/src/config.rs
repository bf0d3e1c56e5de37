//! Simulator configuration and validation.

use strider_core::ConfigError;

/// Construction-time settings for a [`Simulator`](crate::Simulator).
#[derive(Clone, Debug, PartialEq)]
pub struct SimulatorConfig {
    /// Time comparison tolerance, and the smallest step adaptive control
    /// may choose. Default: `1e-8`.
    pub eps: f64,
    /// Record the time of every sampled step in the time history.
    /// Default: `true`.
    pub track_time: bool,
    /// Mirror every recorded error to `tracing` at error level.
    /// Default: `true`.
    pub print_errors: bool,
    /// Samples kept per tracked variable and in the time history; the
    /// oldest are dropped first. `None` keeps everything. Default: `None`.
    pub history_capacity: Option<usize>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            eps: 1e-8,
            track_time: true,
            print_errors: true,
            history_capacity: None,
        }
    }
}

impl SimulatorConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.eps.is_finite() || self.eps <= 0.0 {
            return Err(ConfigError::InvalidEpsilon { value: self.eps });
        }
        if self.history_capacity == Some(0) {
            return Err(ConfigError::InvalidHistoryCapacity);
        }
        Ok(())
    }
}
