//! Conjunctive stop conditions over a set of modules.

use std::rc::Weak;

use strider_core::{ModuleError, Phase};

use crate::call::call;
use crate::link::{AsModule, ModuleRef};
use crate::node::Dispatch;

/// Ends a run once every member module has raised its stop flag.
///
/// Members are held weakly: a destroyed member is dropped from the set, and
/// a stopper whose members are all gone is inert and is discarded by the
/// simulator. Register with [`Simulator::add_stopper`](crate::Simulator::add_stopper).
#[derive(Default)]
pub struct Stopper {
    members: Vec<Weak<dyn Dispatch>>,
}

impl Stopper {
    /// A stopper with no members.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `module` to the set. Empty handles are ignored.
    pub fn add(&mut self, module: &impl AsModule) -> &mut Self {
        if let Ok(header) = module.header() {
            self.members.push(header.this.clone());
        }
        self
    }

    /// Builder form of [`add`](Stopper::add).
    pub fn with(mut self, module: &impl AsModule) -> Self {
        self.add(module);
        self
    }

    /// Number of members still alive.
    pub fn len(&self) -> usize {
        self.members.iter().filter(|m| m.strong_count() > 0).count()
    }

    /// Whether no member is alive.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Force each member's check and report whether all of them stopped.
    /// Prunes destroyed members first; an empty set never fires.
    pub(crate) fn check(&mut self) -> Result<bool, ModuleError> {
        self.members.retain(|m| m.strong_count() > 0);
        if self.members.is_empty() {
            return Ok(false);
        }
        let live: Vec<ModuleRef> = self
            .members
            .iter()
            .filter_map(Weak::upgrade)
            .map(ModuleRef::from_rc)
            .collect();
        for member in &live {
            call(member.dispatch(), Phase::Check)?;
            if !member.stop() {
                return Ok(false);
            }
        }
        Ok(!live.is_empty())
    }
}
