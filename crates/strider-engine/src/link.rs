//! Handles to modules: the typed [`Link`], the untyped [`ModuleRef`], and
//! the [`AsModule`] operations both share.
//!
//! Handles own their module through reference counting. Dropping the last
//! handle destroys the module immediately in the setup phase; during a run
//! the module is queued and destroyed after the current full step.
//! Dereferencing a link during a run first brings the module up to date:
//! `init` is forced if it has not run, then the current phase's hook.

use std::any::type_name;
use std::cell::{Ref, RefMut};
use std::fmt;
use std::rc::Rc;

use strider_core::{ModuleError, ModuleId, Phase, Value, VarError};
use strider_integrator::State;

use crate::call::call;
use crate::directory;
use crate::history::History;
use crate::module::{Module, Setup};
use crate::node::{release, Dispatch, ModuleHeader, Node};
use crate::simulator::Simulator;

/// Bring `node` up to date with the simulator's current phase.
fn force(node: &dyn Dispatch) -> Result<(), ModuleError> {
    let phase = node.header().sim.phase.get();
    if phase == Phase::Setup {
        return Ok(());
    }
    call(node, Phase::Init)?;
    if phase != Phase::Init {
        call(node, phase)?;
    }
    Ok(())
}

fn node_of(header: &ModuleHeader) -> Result<ModuleRef, ModuleError> {
    header
        .this
        .upgrade()
        .map(ModuleRef::from_rc)
        .ok_or(ModuleError::EmptyLink { expected: "module" })
}

// ── AsModule ───────────────────────────────────────────────────────

/// Operations available on any module handle.
pub trait AsModule {
    /// The module's bookkeeping header, or [`ModuleError::EmptyLink`].
    fn header(&self) -> Result<&ModuleHeader, ModuleError>;

    /// The module's id, if the handle is not empty.
    fn id(&self) -> Option<ModuleId> {
        self.header().ok().map(|h| h.id)
    }

    /// The module's name: the one set with [`set_name`](AsModule::set_name),
    /// or `<id|simulator>`.
    fn name(&self) -> Option<String> {
        self.header().ok().map(ModuleHeader::name)
    }

    /// Register the module process-wide under `name`. The name is released
    /// when the module is destroyed.
    fn set_name(&self, name: &str) -> Result<(), ModuleError> {
        let header = self.header()?;
        directory::register_name(name, header.id)?;
        let old = header.name.borrow_mut().replace(name.into());
        if let Some(old) = old.filter(|old| old != name) {
            directory::forget_name(&old);
        }
        Ok(())
    }

    /// Freeze or thaw the module. A frozen module keeps its place in every
    /// registry, but none of its hooks run and its states do not move.
    fn set_frozen(&self, frozen: bool) -> Result<(), ModuleError> {
        self.header()?.frozen.set(frozen);
        Ok(())
    }

    /// Whether the module is frozen.
    fn is_frozen(&self) -> bool {
        self.header().map(|h| h.frozen.get()).unwrap_or(false)
    }

    /// Freeze or thaw only the integration of the module's states.
    fn set_freeze_integration(&self, frozen: bool) -> Result<(), ModuleError> {
        self.header()?.freeze_integration.set(frozen);
        Ok(())
    }

    /// The module's stop flag.
    fn stop(&self) -> bool {
        self.header().map(|h| h.stop.get()).unwrap_or(false)
    }

    /// This module completes update and postcalc before `other` does.
    fn run_before(&self, other: &impl AsModule) -> Result<(), ModuleError>
    where
        Self: Sized,
    {
        let this = self.header()?;
        let target = other.header()?;
        target.run_first.borrow_mut().insert(this.id, this.this.clone());
        Ok(())
    }

    /// `other` completes update and postcalc before this module does.
    fn depends_on(&self, other: &impl AsModule) -> Result<(), ModuleError>
    where
        Self: Sized,
    {
        other.run_before(self)
    }

    /// Set the adaptive-step tolerance of every state of the module.
    fn integration_tolerance(&self, tolerance: f64) -> Result<(), ModuleError> {
        for slot in self.header()?.states.borrow_mut().iter_mut() {
            slot.state.set_tolerance(tolerance);
        }
        Ok(())
    }

    /// Copy of state `index`, if the handle is not empty and the index is
    /// in range.
    fn state(&self, index: strider_core::StateId) -> Option<State> {
        let header = self.header().ok()?;
        let states = header.states.borrow();
        states.get(index.0).map(|slot| slot.state)
    }

    /// Copies of all of the module's states.
    fn states(&self) -> Vec<State> {
        self.header()
            .map(|h| h.states.borrow().iter().map(|slot| slot.state).collect())
            .unwrap_or_default()
    }

    /// Read the variable `name`.
    fn var(&self, name: &str) -> Result<Value, VarError> {
        let header = self.header()?;
        let node = node_of(header)?;
        node.dispatch()
            .var(name)?
            .ok_or_else(|| VarError::UnknownVariable {
                module: header.name(),
                name: name.into(),
            })
    }

    /// Write the variable `name`.
    fn set_var(&self, name: &str, value: Value) -> Result<(), VarError> {
        let node = node_of(self.header()?)?;
        node.dispatch().set_var(name, value)
    }

    /// Record variable `name` once per sampled step, starting at the next
    /// tracker phase. A sample the module cannot provide is stored as
    /// `Value::F64(NAN)`.
    fn track(&self, name: &str) -> Result<(), VarError> {
        let header = self.header()?;
        self.var(name)?;
        let capacity = header.sim.config.history_capacity;
        header
            .tracked
            .borrow_mut()
            .entry(name.into())
            .or_insert_with(|| History::new(capacity));
        header.sim.trackers.insert(header.id, header.this.clone());
        Ok(())
    }

    /// Recorded samples of tracked variable `name`, oldest first.
    fn history(&self, name: &str) -> Result<Vec<Value>, VarError> {
        let header = self.header()?;
        let tracked = header.tracked.borrow();
        tracked
            .get(name)
            .map(History::to_vec)
            .ok_or_else(|| VarError::NotTracked { name: name.into() })
    }

    /// Number of recorded samples of tracked variable `name`.
    fn history_len(&self, name: &str) -> Result<usize, VarError> {
        let header = self.header()?;
        let tracked = header.tracked.borrow();
        tracked
            .get(name)
            .map(History::len)
            .ok_or_else(|| VarError::NotTracked { name: name.into() })
    }

    /// Sample `index` of tracked variable `name`, formatted for output.
    fn history_value(&self, name: &str, index: usize) -> Result<String, VarError> {
        let header = self.header()?;
        let tracked = header.tracked.borrow();
        let history = tracked
            .get(name)
            .ok_or_else(|| VarError::NotTracked { name: name.into() })?;
        history
            .get(index)
            .map(Value::to_string)
            .ok_or_else(|| VarError::OutOfRange {
                name: name.into(),
                index,
                len: history.len(),
            })
    }

    /// The simulator the module belongs to.
    fn simulator(&self) -> Option<Simulator> {
        self.header()
            .ok()
            .map(|h| Simulator::from_shared(Rc::clone(&h.sim)))
    }
}

// ── ModuleRef ──────────────────────────────────────────────────────

/// An untyped, owning handle to a module.
///
/// Turn it into a typed [`Link`] with [`ModuleRef::downcast`] or
/// [`Link::assign`].
pub struct ModuleRef {
    node: Rc<dyn Dispatch>,
}

impl ModuleRef {
    pub(crate) fn from_rc(node: Rc<dyn Dispatch>) -> Self {
        Self { node }
    }

    pub(crate) fn dispatch(&self) -> &dyn Dispatch {
        &*self.node
    }

    /// The concrete module type's name.
    pub fn type_name(&self) -> &'static str {
        self.node.type_name()
    }

    /// Whether the module is a `T`.
    pub fn is<T: Module>(&self) -> bool {
        Rc::clone(&self.node).into_any().is::<Node<T>>()
    }

    /// A typed link to the module, if it is a `T`.
    pub fn downcast<T: Module>(&self) -> Option<Link<T>> {
        let mut link = Link::new();
        link.assign(self).then_some(link)
    }
}

impl Clone for ModuleRef {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
        }
    }
}

impl Drop for ModuleRef {
    fn drop(&mut self) {
        release(&self.node);
    }
}

impl AsModule for ModuleRef {
    fn header(&self) -> Result<&ModuleHeader, ModuleError> {
        Ok(self.node.header())
    }
}

impl fmt::Debug for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRef")
            .field("id", &self.node.header().id)
            .field("type", &self.type_name())
            .finish()
    }
}

// ── Link ───────────────────────────────────────────────────────────

/// A typed, owning handle to a module of type `T`, or empty.
pub struct Link<T: Module> {
    node: Option<Rc<Node<T>>>,
}

impl<T: Module> Link<T> {
    /// An empty link.
    pub fn new() -> Self {
        Self { node: None }
    }

    pub(crate) fn from_node(node: Rc<Node<T>>) -> Self {
        Self { node: Some(node) }
    }

    fn empty_error() -> ModuleError {
        ModuleError::EmptyLink {
            expected: type_name::<T>(),
        }
    }

    fn node(&self) -> Result<&Rc<Node<T>>, ModuleError> {
        self.node.as_ref().ok_or_else(Self::empty_error)
    }

    /// Whether the link holds no module.
    pub fn is_empty(&self) -> bool {
        self.node.is_none()
    }

    /// Point the link at `module`. Returns `false`, leaving the link empty,
    /// if the module is not a `T`.
    pub fn assign(&mut self, module: &ModuleRef) -> bool {
        self.clear();
        match Rc::clone(&module.node).into_any().downcast::<Node<T>>() {
            Ok(node) => {
                self.node = Some(node);
                true
            }
            Err(_) => false,
        }
    }

    /// Drop the held module, leaving the link empty.
    pub fn clear(&mut self) {
        if let Some(node) = self.node.take() {
            let node: Rc<dyn Dispatch> = node;
            release(&node);
        }
    }

    /// Shared access to the module body, after bringing it up to date with
    /// the current phase.
    pub fn get(&self) -> Result<Ref<'_, T>, ModuleError> {
        let node = self.node()?;
        force(&**node)?;
        node.body.try_borrow().map_err(|_| ModuleError::Reentrant {
            module: node.header.name(),
        })
    }

    /// Exclusive access to the module body, after bringing it up to date
    /// with the current phase.
    pub fn get_mut(&self) -> Result<RefMut<'_, T>, ModuleError> {
        let node = self.node()?;
        force(&**node)?;
        node.body.try_borrow_mut().map_err(|_| ModuleError::Reentrant {
            module: node.header.name(),
        })
    }

    /// An untyped handle to the same module.
    pub fn untyped(&self) -> Option<ModuleRef> {
        let node: Rc<dyn Dispatch> = Rc::clone(self.node.as_ref()?) as Rc<dyn Dispatch>;
        Some(ModuleRef::from_rc(node))
    }

    /// Create a module owned by this one and ordered to run before it.
    ///
    /// The manipulator lives as long as this module does, even if the
    /// returned link is dropped.
    pub fn add_manipulator<M: Module>(&self, module: M) -> Result<Link<M>, ModuleError> {
        self.add_manipulator_with(|_| module)
    }

    /// Like [`add_manipulator`](Link::add_manipulator), with access to the
    /// manipulator's [`Setup`].
    pub fn add_manipulator_with<M: Module>(
        &self,
        build: impl FnOnce(&mut Setup<'_>) -> M,
    ) -> Result<Link<M>, ModuleError> {
        let node = self.node()?;
        let sim = Simulator::from_shared(Rc::clone(&node.header.sim));
        let manipulator = sim.add_with(build);
        manipulator.run_before(self)?;
        if let Some(owned) = manipulator.untyped() {
            node.header.manipulators.borrow_mut().push(owned);
        }
        Ok(manipulator)
    }
}

impl<T: Module> Default for Link<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Module> Clone for Link<T> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
        }
    }
}

impl<T: Module> Drop for Link<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: Module> AsModule for Link<T> {
    fn header(&self) -> Result<&ModuleHeader, ModuleError> {
        Ok(&self.node()?.header)
    }
}

impl<T: Module> fmt::Debug for Link<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Link");
        s.field("type", &type_name::<T>());
        match &self.node {
            Some(node) => s.field("id", &node.header.id),
            None => s.field("id", &"empty"),
        };
        s.finish()
    }
}
