//! The per-tick phase state machine.

use std::fmt;

/// One stage of the simulator's per-tick state machine.
///
/// A run moves `Setup → Init`, then repeats
/// `Update → (propagate) → Postcalc → Check → Report → Tracker → Reset`
/// until a stop condition fires, and finally returns to `Setup`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Phase {
    /// Not running. Modules may be wired, destroyed and configured freely.
    #[default]
    Setup,
    /// One-time initialization before the first update.
    Init,
    /// Derivative evaluation, once per integrator pass.
    Update,
    /// Computations on freshly propagated states, once per full step.
    Postcalc,
    /// Stop-condition evaluation, once per full step.
    Check,
    /// Output point, once per full step.
    Report,
    /// Cleanup before the next step.
    Reset,
    /// Variable history sampling, after report on sampled steps.
    Tracker,
}

impl Phase {
    /// The six phases that dispatch a lifecycle hook on modules.
    pub const LIFECYCLE: [Phase; 6] = [
        Phase::Init,
        Phase::Update,
        Phase::Postcalc,
        Phase::Check,
        Phase::Report,
        Phase::Reset,
    ];

    /// Position of this phase in [`Phase::LIFECYCLE`], or `None` for
    /// `Setup` and `Tracker`.
    pub fn lifecycle_slot(self) -> Option<usize> {
        match self {
            Phase::Init => Some(0),
            Phase::Update => Some(1),
            Phase::Postcalc => Some(2),
            Phase::Check => Some(3),
            Phase::Report => Some(4),
            Phase::Reset => Some(5),
            Phase::Setup | Phase::Tracker => None,
        }
    }

    /// Whether `run_before` ordering constraints apply in this phase.
    pub fn is_ordered(self) -> bool {
        matches!(self, Phase::Update | Phase::Postcalc)
    }

    /// Lower-case name used in diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Setup => "setup",
            Phase::Init => "init",
            Phase::Update => "update",
            Phase::Postcalc => "postcalc",
            Phase::Check => "check",
            Phase::Report => "report",
            Phase::Reset => "reset",
            Phase::Tracker => "tracker",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
