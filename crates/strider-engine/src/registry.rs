//! Per-phase module registries with deferred erasure.
//!
//! A run sweeps a registry by taking a snapshot of its entries, so no
//! borrow is held while hooks execute. Erase requests made while a run is
//! in progress are queued and applied in one batch after the sweep.

use std::cell::{Cell, RefCell};
use std::rc::Weak;

use indexmap::IndexMap;
use strider_core::ModuleId;

use crate::node::Dispatch;

/// Modules taking part in one phase, in creation order.
pub(crate) struct Registry {
    live: RefCell<IndexMap<ModuleId, Weak<dyn Dispatch>>>,
    to_erase: RefCell<Vec<ModuleId>>,
    direct_erase: Cell<bool>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            live: RefCell::new(IndexMap::new()),
            to_erase: RefCell::new(Vec::new()),
            direct_erase: Cell::new(true),
        }
    }

    pub(crate) fn insert(&self, id: ModuleId, module: Weak<dyn Dispatch>) {
        self.live.borrow_mut().insert(id, module);
    }

    pub(crate) fn contains(&self, id: ModuleId) -> bool {
        self.live.borrow().contains_key(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.live.borrow().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.live.borrow().is_empty()
    }

    /// Remove `id`, now if the registry is in direct-erase mode and after
    /// the current sweep otherwise.
    pub(crate) fn erase(&self, id: ModuleId) {
        if self.direct_erase.get() {
            self.live.borrow_mut().shift_remove(&id);
        } else {
            self.to_erase.borrow_mut().push(id);
        }
    }

    /// Remove `id` immediately regardless of mode. Used when a module is
    /// destroyed.
    pub(crate) fn remove_now(&self, id: ModuleId) {
        self.live.borrow_mut().shift_remove(&id);
    }

    /// Apply queued erase requests.
    pub(crate) fn apply_erase(&self) {
        let pending = std::mem::take(&mut *self.to_erase.borrow_mut());
        if pending.is_empty() {
            return;
        }
        let mut live = self.live.borrow_mut();
        for id in pending {
            live.shift_remove(&id);
        }
    }

    pub(crate) fn set_direct_erase(&self, direct: bool) {
        self.direct_erase.set(direct);
        if direct {
            self.apply_erase();
        }
    }

    /// Copy of the current entries, for iteration without a held borrow.
    pub(crate) fn snapshot(&self) -> Vec<Weak<dyn Dispatch>> {
        self.live.borrow().values().cloned().collect()
    }
}
