//! Module storage: the shared header, the typed node, and the object-safe
//! dispatch layer the registries iterate over.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use smallvec::SmallVec;
use strider_core::{ModuleError, ModuleId, Phase, Value, VarError};
use strider_integrator::{Integrator, State};
use tracing::trace;

use crate::context::Context;
use crate::directory;
use crate::history::History;
use crate::link::ModuleRef;
use crate::module::Module;
use crate::simulator::SimShared;

// ── Mark ───────────────────────────────────────────────────────────

/// Per-phase progress of one module within the current sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub(crate) enum Mark {
    /// Not called yet in this sweep.
    #[default]
    Unvisited,
    /// Walking its `run_first` dependencies.
    Resolving,
    /// Its hook is executing.
    Running,
    /// Completed for this sweep.
    Done,
}

// ── Slot ───────────────────────────────────────────────────────────

/// One integrated state and its scheme scratch.
pub(crate) struct Slot {
    pub(crate) state: State,
    pub(crate) scheme: Box<dyn Integrator>,
}

/// A module's states. Most modules integrate one or two.
pub(crate) type Slots = SmallVec<[Slot; 2]>;

// ── ModuleHeader ───────────────────────────────────────────────────

/// Scheduling and bookkeeping data the simulator keeps for every module.
///
/// Opaque to users; reached through [`AsModule`](crate::AsModule).
pub struct ModuleHeader {
    pub(crate) id: ModuleId,
    pub(crate) sim: Rc<SimShared>,
    /// Revocable handle to the node holding this header.
    pub(crate) this: Weak<dyn Dispatch>,
    pub(crate) marks: [Cell<Mark>; 6],
    /// Hook depth at which this module started resolving dependencies.
    pub(crate) resolve_depth: Cell<usize>,
    pub(crate) frozen: Cell<bool>,
    pub(crate) freeze_integration: Cell<bool>,
    pub(crate) stop: Cell<bool>,
    /// Modules that must complete update and postcalc before this one.
    pub(crate) run_first: RefCell<IndexMap<ModuleId, Weak<dyn Dispatch>>>,
    pub(crate) states: RefCell<Slots>,
    pub(crate) name: RefCell<Option<String>>,
    pub(crate) tracked: RefCell<IndexMap<String, History<Value>>>,
    /// Modules owned by this one, released when it is destroyed.
    pub(crate) manipulators: RefCell<Vec<ModuleRef>>,
}

impl ModuleHeader {
    fn new(id: ModuleId, sim: Rc<SimShared>, this: Weak<dyn Dispatch>, states: Slots) -> Self {
        Self {
            id,
            sim,
            this,
            marks: Default::default(),
            resolve_depth: Cell::new(0),
            frozen: Cell::new(false),
            freeze_integration: Cell::new(false),
            stop: Cell::new(false),
            run_first: RefCell::new(IndexMap::new()),
            states: RefCell::new(states),
            name: RefCell::new(None),
            tracked: RefCell::new(IndexMap::new()),
            manipulators: RefCell::new(Vec::new()),
        }
    }

    /// The registered name, or `<id|simulator>` if none was set.
    pub(crate) fn name(&self) -> String {
        match &*self.name.borrow() {
            Some(name) => name.clone(),
            None => format!("<{}|{}>", self.id, self.sim.id),
        }
    }

    pub(crate) fn mark(&self, phase: Phase) -> Option<Mark> {
        phase.lifecycle_slot().map(|slot| self.marks[slot].get())
    }

    /// Live `run_first` entries. Expired ones are pruned.
    pub(crate) fn run_first_live(&self) -> Vec<ModuleRef> {
        let mut live = Vec::new();
        self.run_first.borrow_mut().retain(|_, dep| match dep.upgrade() {
            Some(rc) => {
                live.push(rc);
                true
            }
            None => false,
        });
        live.into_iter().map(ModuleRef::from_rc).collect()
    }

    pub(crate) fn has_states(&self) -> bool {
        !self.states.borrow().is_empty()
    }
}

impl Drop for ModuleHeader {
    fn drop(&mut self) {
        let sim = &self.sim;
        for registry in sim.registries() {
            registry.remove_now(self.id);
        }
        let name = self.name.get_mut().take();
        directory::forget_module(self.id, name.as_deref());
        trace!(module = %self.id, sim = %sim.id, "module destroyed");
        if sim.modules.is_empty() {
            directory::forget_simulator(sim.id);
        }
    }
}

// ── Dispatch ───────────────────────────────────────────────────────

/// Object-safe view of a module node.
pub(crate) trait Dispatch: Any {
    fn header(&self) -> &ModuleHeader;

    /// Borrow the body and run the hook for `phase`.
    fn run_hook(&self, phase: Phase) -> Result<(), ModuleError>;

    /// Read a named variable. `Ok(None)` if the module has no such variable.
    fn var(&self, name: &str) -> Result<Option<Value>, ModuleError>;

    fn set_var(&self, name: &str, value: Value) -> Result<(), VarError>;

    fn type_name(&self) -> &'static str;

    fn into_any(self: Rc<Self>) -> Rc<dyn Any>;
}

/// A module body and its header.
pub(crate) struct Node<T: Module> {
    pub(crate) header: ModuleHeader,
    pub(crate) body: RefCell<T>,
}

impl<T: Module> Node<T> {
    /// Allocate a node for `body` owned by `sim`.
    pub(crate) fn create(sim: Rc<SimShared>, body: T, states: Slots) -> Rc<Self> {
        let id = ModuleId::next();
        Rc::new_cyclic(|weak: &Weak<Node<T>>| {
            let this: Weak<dyn Dispatch> = weak.clone();
            Node {
                header: ModuleHeader::new(id, sim, this, states),
                body: RefCell::new(body),
            }
        })
    }

    fn reentrant(&self) -> ModuleError {
        ModuleError::Reentrant {
            module: self.header.name(),
        }
    }
}

impl<T: Module> Dispatch for Node<T> {
    fn header(&self) -> &ModuleHeader {
        &self.header
    }

    fn run_hook(&self, phase: Phase) -> Result<(), ModuleError> {
        let mut body = self.body.try_borrow_mut().map_err(|_| self.reentrant())?;
        let mut ctx = Context::new(&self.header, phase);
        match phase {
            Phase::Init => body.init(&mut ctx),
            Phase::Update => body.update(&mut ctx),
            Phase::Postcalc => body.postcalc(&mut ctx),
            Phase::Check => body.check(&mut ctx),
            Phase::Report => body.report(&mut ctx),
            Phase::Reset => body.reset(&mut ctx),
            Phase::Setup | Phase::Tracker => Ok(()),
        }
    }

    fn var(&self, name: &str) -> Result<Option<Value>, ModuleError> {
        let body = self.body.try_borrow().map_err(|_| self.reentrant())?;
        Ok(body.var(name))
    }

    fn set_var(&self, name: &str, value: Value) -> Result<(), VarError> {
        let mut body = self.body.try_borrow_mut().map_err(|_| self.reentrant())?;
        if body.var(name).is_none() {
            return Err(VarError::UnknownVariable {
                module: self.header.name(),
                name: name.into(),
            });
        }
        body.set_var(name, value)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// Called from a handle's `Drop` with the handle's own reference.
///
/// Outside setup, when this is the last handle, a reference is moved to
/// the simulator's deletion queue so the module is destroyed between full
/// steps rather than in the middle of a phase sweep.
pub(crate) fn release(node: &Rc<dyn Dispatch>) {
    if Rc::strong_count(node) == 1 {
        let sim = &node.header().sim;
        if sim.phase.get() != Phase::Setup {
            sim.to_delete.borrow_mut().push(Rc::clone(node));
        }
    }
}
