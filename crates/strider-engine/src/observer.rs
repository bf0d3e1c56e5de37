//! Narrow notification interface for persistence and tracking layers.

/// Receives run-loop notifications.
///
/// The simulator calls [`on_sample`](RunObserver::on_sample) once per
/// tracker phase (the first tick and every full step) and
/// [`on_finish`](RunObserver::on_finish) once when a run reaches its last
/// tick. Output formats and cadence beyond that are the observer's concern.
pub trait RunObserver: 'static {
    /// A sampled step completed at time `t`.
    fn on_sample(&mut self, t: f64) {
        let _ = t;
    }

    /// The run finished at time `t`.
    fn on_finish(&mut self, t: f64) {
        let _ = t;
    }
}
