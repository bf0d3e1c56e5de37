//! Process-wide lookup of simulators and modules.
//!
//! Keys are monotonically allocated ids, so a stale id simply resolves to
//! nothing once its entry is gone. The directory never owns modules; it
//! holds weak references and is kept consistent by module destruction.
//! Simulators are single-threaded, so the directory is per thread.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use strider_core::{ModuleError, ModuleId, SimulatorId, Value, VarError};

use crate::config::SimulatorConfig;
use crate::link::ModuleRef;
use crate::node::Dispatch;
use crate::simulator::SimShared;

#[derive(Default)]
struct Directory {
    simulators: IndexMap<SimulatorId, Rc<SimShared>>,
    modules: IndexMap<ModuleId, Weak<dyn Dispatch>>,
    names: IndexMap<String, ModuleId>,
}

thread_local! {
    static DIRECTORY: RefCell<Directory> = RefCell::new(Directory::default());
}

/// The module with `id`, if it is alive.
pub fn module(id: ModuleId) -> Option<ModuleRef> {
    let rc = DIRECTORY
        .try_with(|d| d.borrow().modules.get(&id).and_then(Weak::upgrade))
        .ok()
        .flatten()?;
    Some(ModuleRef::from_rc(rc))
}

/// The module registered under `name`, if it is alive.
pub fn find(name: &str) -> Option<ModuleRef> {
    let id = DIRECTORY
        .try_with(|d| d.borrow().names.get(name).copied())
        .ok()
        .flatten()?;
    module(id)
}

/// Read variable `var` of the module registered under `module_name`.
pub fn var(module_name: &str, var: &str) -> Result<Value, VarError> {
    use crate::link::AsModule;
    find(module_name)
        .ok_or_else(|| VarError::UnknownModule {
            name: module_name.into(),
        })?
        .var(var)
}

/// Number of live modules on this thread.
pub fn module_count() -> usize {
    DIRECTORY.try_with(|d| d.borrow().modules.len()).unwrap_or(0)
}

/// Whether a simulator is registered under `id`.
pub fn has_simulator(id: SimulatorId) -> bool {
    DIRECTORY
        .try_with(|d| d.borrow().simulators.contains_key(&id))
        .unwrap_or(false)
}

// ── Crate-internal bookkeeping ─────────────────────────────────────

/// The simulator registered under `id`, created with `config` on first
/// reference.
pub(crate) fn simulator(id: SimulatorId, config: SimulatorConfig) -> Rc<SimShared> {
    let existing = DIRECTORY
        .try_with(|d| d.borrow().simulators.get(&id).cloned())
        .ok()
        .flatten();
    if let Some(sim) = existing {
        return sim;
    }
    let sim = Rc::new(SimShared::new(id, config));
    let _ = DIRECTORY.try_with(|d| {
        d.borrow_mut().simulators.insert(id, Rc::clone(&sim));
    });
    sim
}

/// Register `sim` again if it was forgotten while a handle kept it alive.
pub(crate) fn adopt_simulator(sim: &Rc<SimShared>) {
    let _ = DIRECTORY.try_with(|d| {
        d.borrow_mut()
            .simulators
            .entry(sim.id)
            .or_insert_with(|| Rc::clone(sim));
    });
}

pub(crate) fn forget_simulator(id: SimulatorId) {
    let removed = DIRECTORY
        .try_with(|d| d.borrow_mut().simulators.shift_remove(&id))
        .ok()
        .flatten();
    drop(removed);
}

pub(crate) fn register_module(id: ModuleId, module: Weak<dyn Dispatch>) {
    let _ = DIRECTORY.try_with(|d| {
        d.borrow_mut().modules.insert(id, module);
    });
}

pub(crate) fn register_name(name: &str, id: ModuleId) -> Result<(), ModuleError> {
    DIRECTORY
        .try_with(|d| {
            let mut d = d.borrow_mut();
            if let Some(&owner) = d.names.get(name) {
                if owner != id {
                    return Err(ModuleError::DuplicateName { name: name.into() });
                }
            }
            d.names.insert(name.into(), id);
            Ok(())
        })
        .unwrap_or(Ok(()))
}

pub(crate) fn forget_name(name: &str) {
    let _ = DIRECTORY.try_with(|d| {
        d.borrow_mut().names.shift_remove(name);
    });
}

pub(crate) fn forget_module(id: ModuleId, name: Option<&str>) {
    let _ = DIRECTORY.try_with(|d| {
        let mut d = d.borrow_mut();
        d.modules.shift_remove(&id);
        if let Some(name) = name {
            if d.names.get(name) == Some(&id) {
                d.names.shift_remove(name);
            }
        }
    });
}
