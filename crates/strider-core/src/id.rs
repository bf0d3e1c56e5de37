//! Strongly-typed identifiers for modules, simulators and states.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for unique [`ModuleId`] allocation.
static MODULE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Counter for fresh [`SimulatorId`] allocation via [`SimulatorId::next`].
///
/// Starts high so that ids handed out automatically never collide with the
/// small ids callers usually pick by hand (`SimulatorId(0)`, `SimulatorId(1)`).
static SIMULATOR_COUNTER: AtomicU64 = AtomicU64::new(1 << 32);

/// Process-wide unique identity of a module.
///
/// Allocated from a monotonic atomic counter. Ids are never reused, so a
/// stale id can be looked up safely: it simply resolves to nothing once
/// the module is gone. Ordering follows creation order, which is also the
/// iteration order of every phase registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(u64);

impl ModuleId {
    /// Allocate a fresh, unique module id.
    ///
    /// Each call returns an id that has never been returned before within
    /// this process. Thread-safe.
    pub fn next() -> Self {
        Self(MODULE_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies a simulator within the process.
///
/// Every module belongs to exactly one simulator for its lifetime. Callers
/// may pick ids by hand (`SimulatorId(0)`) or let [`SimulatorId::next`]
/// allocate one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimulatorId(pub u64);

impl SimulatorId {
    /// Allocate an id that is not used by any automatically created simulator.
    pub fn next() -> Self {
        Self(SIMULATOR_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SimulatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SimulatorId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Index of an integrated state within its owning module.
///
/// Issued by the module's setup builder in registration order. A `StateId`
/// is only meaningful for the module that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub usize);

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for StateId {
    fn from(v: usize) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_ids_are_unique_and_increasing() {
        let a = ModuleId::next();
        let b = ModuleId::next();
        assert!(b > a);
        assert_ne!(a, b);
    }

    #[test]
    fn simulator_next_skips_hand_picked_range() {
        let id = SimulatorId::next();
        assert!(id.0 >= 1 << 32);
        assert_eq!(SimulatorId::from(3), SimulatorId(3));
    }

    #[test]
    fn display_is_numeric() {
        assert_eq!(StateId(7).to_string(), "7");
        assert_eq!(SimulatorId(2).to_string(), "2");
    }
}
