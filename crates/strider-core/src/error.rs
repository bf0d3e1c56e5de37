//! Error types for the Strider simulation kernel.
//!
//! Organized by who raises them: lifecycle hooks and link access
//! ([`ModuleError`]), the simulator run loop ([`RunError`]), the
//! named-variable collaborator ([`VarError`]) and configuration
//! validation ([`ConfigError`]).

use std::error::Error;
use std::fmt;

use crate::phase::Phase;

/// Errors raised by a module's lifecycle hook or by dereferencing a link.
#[derive(Clone, Debug, PartialEq)]
pub enum ModuleError {
    /// The hook itself failed.
    ExecutionFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// A module's phase call was re-entered through its `run_before`
    /// chain while it was still resolving its dependencies.
    CircularDependency {
        /// Name of the module where the cycle closed.
        module: String,
        /// The phase being executed.
        phase: Phase,
    },
    /// A module was accessed while its own hook was executing.
    Reentrant {
        /// Name of the module that was re-entered.
        module: String,
    },
    /// A link was dereferenced before being assigned a module.
    EmptyLink {
        /// The concrete module type the link expects.
        expected: &'static str,
    },
    /// A module name was registered twice.
    DuplicateName {
        /// The contested name.
        name: String,
    },
    /// The call was abandoned because an error was already recorded in
    /// the simulator's error log.
    Aborted,
}

impl ModuleError {
    /// Shorthand for [`ModuleError::ExecutionFailed`].
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ModuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExecutionFailed { reason } => write!(f, "execution failed: {reason}"),
            Self::CircularDependency { module, phase } => {
                write!(f, "circular dependency for {phase}() within {module}")
            }
            Self::Reentrant { module } => {
                write!(f, "{module} accessed while its own hook is running")
            }
            Self::EmptyLink { expected } => {
                write!(f, "access through an empty Link<{expected}>")
            }
            Self::DuplicateName { name } => write!(f, "module name '{name}' is already defined"),
            Self::Aborted => write!(f, "aborted after an earlier error"),
        }
    }
}

impl Error for ModuleError {}

/// Errors recorded in a simulator's error log.
///
/// Any recorded error puts the simulator into its error state: the run
/// loop stops after the current phase sweep and `run()` fails.
#[derive(Clone, Debug, PartialEq)]
pub enum RunError {
    /// `run()` was called on a simulator with no modules.
    NoModules,
    /// The requested end time is not after the current time.
    InvalidEndTime {
        /// The requested end time.
        t_end: f64,
        /// The simulator's current time.
        t: f64,
    },
    /// The base step is not finite and positive.
    InvalidStep {
        /// The rejected step.
        dt: f64,
    },
    /// A module failed during a phase call.
    Module {
        /// Name of the failing module.
        module: String,
        /// The phase being executed.
        phase: Phase,
        /// The underlying module error.
        reason: ModuleError,
    },
    /// The integrator was changed after states were registered.
    IntegratorLocked,
    /// An attempt to set a negative simulation time.
    InvalidTime {
        /// The rejected time.
        t: f64,
    },
    /// An operation that is only valid in the setup phase was attempted
    /// during a run.
    NotInSetup {
        /// The rejected operation.
        operation: &'static str,
    },
    /// The simulator configuration is invalid.
    Config(ConfigError),
    /// The run was abandoned. Returned by `run()`; the individual causes
    /// are in the simulator's error log.
    Aborted {
        /// Number of errors recorded in the log.
        errors: usize,
    },
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoModules => write!(f, "there are no modules to run"),
            Self::InvalidEndTime { t_end, t } => write!(
                f,
                "the end time {t_end} is less than or equal to the current time {t}"
            ),
            Self::InvalidStep { dt } => write!(f, "the time step {dt} must be finite and positive"),
            Self::Module {
                module,
                phase,
                reason,
            } => write!(f, "{module} failed in {phase}(): {reason}"),
            Self::IntegratorLocked => write!(
                f,
                "states have already been registered; the integrator cannot be changed"
            ),
            Self::InvalidTime { t } => {
                write!(f, "attempted to set the time to {t}, which is less than zero")
            }
            Self::NotInSetup { operation } => {
                write!(f, "{operation} is only allowed in the setup phase")
            }
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Aborted { errors } => {
                write!(f, "simulation was stopped after {errors} error(s)")
            }
        }
    }
}

impl Error for RunError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Module { reason, .. } => Some(reason),
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for RunError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Errors from name-based variable access and history queries.
///
/// These are reported to the caller and never put the simulator into its
/// error state.
#[derive(Clone, Debug, PartialEq)]
pub enum VarError {
    /// The module exposes no variable with this name.
    UnknownVariable {
        /// Name of the module that was asked.
        module: String,
        /// The requested variable.
        name: String,
    },
    /// The variable exists but has a different type.
    TypeMismatch {
        /// The variable.
        name: String,
        /// The type the variable holds.
        expected: &'static str,
    },
    /// The variable can be read but not written.
    ReadOnly {
        /// The variable.
        name: String,
    },
    /// No module is registered under this name.
    UnknownModule {
        /// The requested module name.
        name: String,
    },
    /// The variable is not tracked, so it has no history.
    NotTracked {
        /// The variable.
        name: String,
    },
    /// A history index past the recorded length.
    OutOfRange {
        /// The variable.
        name: String,
        /// The requested index.
        index: usize,
        /// The recorded length.
        len: usize,
    },
    /// The module could not be reached: the link is empty or the module
    /// is executing a hook.
    Module(ModuleError),
}

impl fmt::Display for VarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownVariable { module, name } => {
                write!(f, "{module} has no variable '{name}'")
            }
            Self::TypeMismatch { name, expected } => {
                write!(f, "variable '{name}' holds {expected}")
            }
            Self::ReadOnly { name } => write!(f, "variable '{name}' is read-only"),
            Self::UnknownModule { name } => write!(f, "no module named '{name}'"),
            Self::NotTracked { name } => write!(f, "variable '{name}' is not tracked"),
            Self::OutOfRange { name, index, len } => write!(
                f,
                "history index {index} out of range for '{name}' (length {len})"
            ),
            Self::Module(e) => write!(f, "module: {e}"),
        }
    }
}

impl Error for VarError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Module(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ModuleError> for VarError {
    fn from(e: ModuleError) -> Self {
        Self::Module(e)
    }
}

/// Errors detected by simulator configuration validation.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// `eps` is NaN, infinite, zero or negative.
    InvalidEpsilon {
        /// The invalid value.
        value: f64,
    },
    /// A history capacity of zero would discard every sample.
    InvalidHistoryCapacity,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEpsilon { value } => {
                write!(f, "eps must be finite and positive, got {value}")
            }
            Self::InvalidHistoryCapacity => write!(f, "history_capacity must be at least 1"),
        }
    }
}

impl Error for ConfigError {}
