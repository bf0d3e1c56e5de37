//! The [`Simulator`] handle and its run loop.
//!
//! A simulator owns the shared clock, the active integration scheme, one
//! [`Registry`] per lifecycle phase, and the queues that make it safe to
//! create and destroy modules while a run is in progress.
//!
//! # Run loop
//!
//! One call to [`Simulator::run`] moves `Setup → Init` and then repeats:
//!
//! 1. Align the step end with `t_end`. On the first tick of a run, commit
//!    any pending step change and report the initial state.
//! 2. `update`, once per integrator pass.
//! 3. Propagate every non-frozen state and advance the clock.
//! 4. On a completed full step: `postcalc`, `check` (with stoppers),
//!    `report`, tracker, step-size control, pending changes, deferred
//!    deletions, then either finish or `reset`.
//!
//! Registries are swept over snapshots and erase requests made during a
//! sweep are applied after it, so hooks may create, destroy and
//! unschedule modules freely.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use strider_core::{ConfigError, ModuleError, Phase, RunError, SimulatorId, Value};
use strider_integrator::{Integrator, Stepper};
use strider_integrators::Rk4;
use tracing::{debug, error, trace, warn};

use crate::call::call;
use crate::config::SimulatorConfig;
use crate::directory;
use crate::history::History;
use crate::link::{AsModule, Link, ModuleRef};
use crate::module::{Module, Setup};
use crate::node::{Dispatch, Mark, ModuleHeader, Node};
use crate::observer::RunObserver;
use crate::registry::Registry;
use crate::stopper::Stopper;

// ── RunFlags ───────────────────────────────────────────────────────

/// Per-run flags and pending change requests.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RunFlags {
    pub(crate) t_end: f64,
    /// First tick of the current run.
    pub(crate) tickfirst: bool,
    /// Last full step of the current run.
    pub(crate) ticklast: bool,
    /// First tick of the simulator's lifetime.
    pub(crate) tick0: bool,
    pub(crate) time_advanced: bool,
    pub(crate) stop_simulation: bool,
    pub(crate) dt_change: Option<f64>,
    pub(crate) t_end_change: Option<f64>,
}

impl Default for RunFlags {
    fn default() -> Self {
        Self {
            t_end: 0.0,
            tickfirst: true,
            ticklast: false,
            tick0: true,
            time_advanced: false,
            stop_simulation: false,
            dt_change: None,
            t_end_change: None,
        }
    }
}

// ── SimShared ──────────────────────────────────────────────────────

/// State shared by a simulator's handles and its modules.
pub(crate) struct SimShared {
    pub(crate) id: SimulatorId,
    pub(crate) config: SimulatorConfig,
    print_errors: Cell<bool>,
    pub(crate) clock: RefCell<Stepper>,
    pub(crate) integrator: RefCell<Box<dyn Integrator>>,
    pub(crate) phase: Cell<Phase>,
    pub(crate) flags: Cell<RunFlags>,
    errors: RefCell<Vec<RunError>>,
    t_hist: RefCell<History<f64>>,

    pub(crate) modules: Registry,
    inits: Registry,
    updates: Registry,
    postcalcs: Registry,
    checks: Registry,
    reports: Registry,
    resets: Registry,
    propagate: Registry,
    pub(crate) trackers: Registry,

    /// Modules created during a run, spliced into the registries at the
    /// end of the current sweep.
    to_add: RefCell<Vec<Weak<dyn Dispatch>>>,
    /// Last handles of modules released during a run.
    pub(crate) to_delete: RefCell<Vec<Rc<dyn Dispatch>>>,
    stoppers: RefCell<Vec<Stopper>>,
    observer: RefCell<Option<Box<dyn RunObserver>>>,

    pub(crate) states_registered: Cell<bool>,
    /// Number of hooks currently executing.
    pub(crate) hook_depth: Cell<usize>,
    last_run: Cell<Option<(f64, f64)>>,
}

impl SimShared {
    pub(crate) fn new(id: SimulatorId, config: SimulatorConfig) -> Self {
        Self {
            id,
            print_errors: Cell::new(config.print_errors),
            clock: RefCell::new(Stepper::new(config.eps)),
            integrator: RefCell::new(Box::new(Rk4::default())),
            phase: Cell::new(Phase::Setup),
            flags: Cell::new(RunFlags::default()),
            errors: RefCell::new(Vec::new()),
            t_hist: RefCell::new(History::new(config.history_capacity)),
            modules: Registry::new(),
            inits: Registry::new(),
            updates: Registry::new(),
            postcalcs: Registry::new(),
            checks: Registry::new(),
            reports: Registry::new(),
            resets: Registry::new(),
            propagate: Registry::new(),
            trackers: Registry::new(),
            to_add: RefCell::new(Vec::new()),
            to_delete: RefCell::new(Vec::new()),
            stoppers: RefCell::new(Vec::new()),
            observer: RefCell::new(None),
            states_registered: Cell::new(false),
            hook_depth: Cell::new(0),
            last_run: Cell::new(None),
            config,
        }
    }

    pub(crate) fn registries(&self) -> [&Registry; 9] {
        [
            &self.modules,
            &self.inits,
            &self.updates,
            &self.postcalcs,
            &self.checks,
            &self.reports,
            &self.resets,
            &self.propagate,
            &self.trackers,
        ]
    }

    /// The registry swept in `phase`, if it has one.
    pub(crate) fn phase_registry(&self, phase: Phase) -> Option<&Registry> {
        match phase {
            Phase::Init => Some(&self.inits),
            Phase::Update => Some(&self.updates),
            Phase::Postcalc => Some(&self.postcalcs),
            Phase::Check => Some(&self.checks),
            Phase::Report => Some(&self.reports),
            Phase::Reset => Some(&self.resets),
            Phase::Setup | Phase::Tracker => None,
        }
    }

    pub(crate) fn with_flags(&self, f: impl FnOnce(&mut RunFlags)) {
        let mut flags = self.flags.get();
        f(&mut flags);
        self.flags.set(flags);
    }

    // ── Errors ─────────────────────────────────────────────────────

    pub(crate) fn has_error(&self) -> bool {
        !self.errors.borrow().is_empty()
    }

    fn record(&self, err: RunError) {
        if self.print_errors.get() {
            error!(sim = %self.id, "{err}");
        }
        self.errors.borrow_mut().push(err);
    }

    /// Record a hook failure and return the marker callers propagate.
    pub(crate) fn fail(&self, header: &ModuleHeader, phase: Phase, reason: ModuleError) -> ModuleError {
        self.record(RunError::Module {
            module: header.name(),
            phase,
            reason,
        });
        ModuleError::Aborted
    }

    fn aborted(&self) -> RunError {
        RunError::Aborted {
            errors: self.errors.borrow().len(),
        }
    }

    // ── Step grid ──────────────────────────────────────────────────

    pub(crate) fn sample(&self) -> bool {
        self.clock.borrow().at_step_start()
    }

    pub(crate) fn sample_every(&self, sdt: f64) -> bool {
        let mut c = self.clock.borrow_mut();
        if c.kpass != 0 || !(sdt > 0.0) {
            return false;
        }
        let ts = ((c.t + c.eps) / sdt + 1.0).floor() * sdt;
        if ts < c.t1 - c.eps {
            c.t1 = ts;
        }
        c.dt = c.t1 - c.t;
        c.t - ts + sdt < c.eps
    }

    pub(crate) fn event(&self, t_event: f64) -> bool {
        let mut c = self.clock.borrow_mut();
        if c.kpass != 0 {
            return false;
        }
        if t_event < c.t1 - c.eps && t_event >= c.t + c.eps {
            c.t1 = t_event;
        }
        c.dt = c.t1 - c.t;
        (t_event - c.t).abs() < c.eps
    }

    /// Queue a new base step. Non-finite requests are ignored and requests
    /// below `eps` are raised to it.
    pub(crate) fn request_dt(&self, dt: f64) {
        if !dt.is_finite() {
            return;
        }
        let dt = dt.max(self.config.eps);
        if self.phase.get() == Phase::Setup {
            if let Some((_, t_end)) = self.last_run.get() {
                self.last_run.set(Some((dt, t_end)));
            }
        }
        self.with_flags(|f| f.dt_change = Some(dt));
    }

    pub(crate) fn set_end_time(&self, t_end: f64) {
        if self.phase.get() == Phase::Setup {
            if let Some((dt, _)) = self.last_run.get() {
                self.last_run.set(Some((dt, t_end)));
            }
            self.with_flags(|f| f.t_end = t_end);
        } else {
            self.with_flags(|f| f.t_end_change = Some(t_end));
        }
    }

    fn change_time_step(&self) {
        let mut flags = self.flags.get();
        if let Some(dt) = flags.dt_change.take() {
            self.flags.set(flags);
            let mut c = self.clock.borrow_mut();
            c.dt = dt;
            c.dtp = dt;
            c.t1 = c.t + dt;
            trace!(sim = %self.id, t = c.t, dt, "step size changed");
        }
    }

    fn change_end_time(&self) {
        let mut flags = self.flags.get();
        if let Some(t_end) = flags.t_end_change.take() {
            flags.t_end = t_end;
            self.flags.set(flags);
        }
    }

    // ── Registration ───────────────────────────────────────────────

    fn add_phases(&self, header: &ModuleHeader) {
        let this = &header.this;
        for registry in [
            &self.inits,
            &self.updates,
            &self.postcalcs,
            &self.checks,
            &self.reports,
            &self.resets,
        ] {
            registry.insert(header.id, this.clone());
        }
        if header.has_states() {
            self.propagate.insert(header.id, this.clone());
        }
    }

    fn set_direct_erase(&self, direct: bool) {
        for registry in self.registries() {
            registry.set_direct_erase(direct);
        }
    }

    /// Destroy released modules. Destroying one module can release
    /// others, so the queue is drained until it stays empty.
    fn delete_modules(&self) {
        let mut deleted = 0;
        loop {
            let batch = std::mem::take(&mut *self.to_delete.borrow_mut());
            if batch.is_empty() {
                break;
            }
            deleted += batch.len();
            drop(batch);
        }
        if deleted > 0 {
            debug!(sim = %self.id, deleted, "deferred deletions drained");
        }
    }

    // ── Sweeps ─────────────────────────────────────────────────────

    /// Run `phase` over its registry, splice modules created meanwhile,
    /// apply deferred erasures and clear the phase's marks.
    fn sweep(&self, phase: Phase) -> Result<(), ModuleError> {
        self.phase.set(phase);
        let Some(registry) = self.phase_registry(phase) else {
            return Ok(());
        };
        let result = self
            .sweep_registry(registry, phase)
            .and_then(|()| self.splice_added(phase))
            .and_then(|()| {
                if phase == Phase::Check {
                    self.run_stoppers()
                } else {
                    Ok(())
                }
            });
        registry.apply_erase();
        if phase != Phase::Init {
            clear_marks(registry, phase);
        }
        match result {
            Ok(()) if self.has_error() => Err(ModuleError::Aborted),
            other => other,
        }
    }

    fn sweep_registry(&self, registry: &Registry, phase: Phase) -> Result<(), ModuleError> {
        let entries: Vec<ModuleRef> = registry
            .snapshot()
            .iter()
            .filter_map(Weak::upgrade)
            .map(ModuleRef::from_rc)
            .collect();
        let mut pending = entries.len();
        for module in &entries {
            call(module.dispatch(), phase)?;
        }
        // Modules deferred behind a dependency that was still executing
        // are retried for as long as retries make progress.
        loop {
            let waiting: Vec<&ModuleRef> = entries
                .iter()
                .filter(|m| m.dispatch().header().mark(phase) != Some(Mark::Done))
                .collect();
            if waiting.is_empty() || waiting.len() == pending {
                return Ok(());
            }
            pending = waiting.len();
            for module in waiting {
                call(module.dispatch(), phase)?;
            }
        }
    }

    /// Bring modules created during the sweep into the registries, then
    /// initialize them and run them through the current phase.
    fn splice_added(&self, phase: Phase) -> Result<(), ModuleError> {
        loop {
            let added: Vec<ModuleRef> = std::mem::take(&mut *self.to_add.borrow_mut())
                .iter()
                .filter_map(Weak::upgrade)
                .map(ModuleRef::from_rc)
                .collect();
            if added.is_empty() {
                return Ok(());
            }
            for module in &added {
                self.add_phases(module.dispatch().header());
            }
            for module in &added {
                call(module.dispatch(), Phase::Init)?;
                if phase != Phase::Init {
                    call(module.dispatch(), phase)?;
                }
            }
        }
    }

    fn run_stoppers(&self) -> Result<(), ModuleError> {
        let mut stoppers = std::mem::take(&mut *self.stoppers.borrow_mut());
        let mut fired = false;
        let mut result = Ok(());
        for stopper in &mut stoppers {
            match stopper.check() {
                Ok(stop) => fired |= stop,
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        stoppers.retain(|s| !s.is_empty());
        {
            let mut slot = self.stoppers.borrow_mut();
            stoppers.append(&mut slot);
            *slot = stoppers;
        }
        if fired {
            debug!(sim = %self.id, t = self.clock.borrow().t, "stopper fired");
            self.with_flags(|f| f.stop_simulation = true);
        }
        result
    }

    /// Record every tracked variable and notify the observer.
    fn tracker(&self) {
        self.phase.set(Phase::Tracker);
        for weak in self.trackers.snapshot() {
            let Some(rc) = weak.upgrade() else { continue };
            let module = ModuleRef::from_rc(rc);
            let node = module.dispatch();
            let header = node.header();
            let names: Vec<String> = header.tracked.borrow().keys().cloned().collect();
            for name in names {
                // Every tracked history gains one sample per tick so it
                // stays aligned with the time history.
                let value = match node.var(&name) {
                    Ok(Some(value)) => value,
                    other => {
                        warn!(
                            sim = %self.id,
                            module = %header.name(),
                            var = %name,
                            result = ?other,
                            "tracked variable unavailable, recording NaN"
                        );
                        Value::F64(f64::NAN)
                    }
                };
                if let Some(history) = header.tracked.borrow_mut().get_mut(&name) {
                    history.push(value);
                }
            }
        }
        let t = self.clock.borrow().t;
        self.notify(|observer| observer.on_sample(t));
    }

    fn notify(&self, f: impl FnOnce(&mut dyn RunObserver)) {
        let taken = self.observer.borrow_mut().take();
        if let Some(mut observer) = taken {
            f(observer.as_mut());
            let mut slot = self.observer.borrow_mut();
            if slot.is_none() {
                *slot = Some(observer);
            }
        }
    }

    // ── Integration ────────────────────────────────────────────────

    fn propagating_modules(&self) -> Vec<ModuleRef> {
        self.propagate
            .snapshot()
            .iter()
            .filter_map(Weak::upgrade)
            .map(ModuleRef::from_rc)
            .filter(|m| {
                let h = m.dispatch().header();
                !h.frozen.get() && !h.freeze_integration.get()
            })
            .collect()
    }

    fn propagate_states(&self) {
        let modules = self.propagating_modules();
        let clock = self.clock.borrow();
        for module in &modules {
            for slot in module.dispatch().header().states.borrow_mut().iter_mut() {
                slot.scheme.propagate(&mut slot.state, &clock);
            }
        }
    }

    fn update_clock(&self) {
        let advanced = {
            let mut clock = self.clock.borrow_mut();
            let t_prev = clock.t;
            self.integrator.borrow().update_clock(&mut clock);
            clock.t >= t_prev + clock.eps
        };
        self.with_flags(|f| f.time_advanced = advanced);
    }

    /// Queue the smallest step any adaptive state will accept.
    fn adaptive_calc(&self) {
        let modules = self.propagating_modules();
        let clock = self.clock.borrow();
        let mut best: Option<f64> = None;
        for module in &modules {
            for slot in module.dispatch().header().states.borrow().iter() {
                if let Some(dt) = slot.scheme.optimal_time_step(&slot.state, &clock) {
                    if dt > 0.0 && best.map_or(true, |b| dt < b) {
                        best = Some(dt);
                    }
                }
            }
        }
        let eps = clock.eps;
        drop(clock);
        if let Some(dt) = best {
            self.with_flags(|f| f.dt_change = Some(dt.max(eps)));
        }
    }

    // ── Run ────────────────────────────────────────────────────────

    fn setup(&self, dt: f64) {
        self.phase.set(Phase::Setup);
        {
            let mut c = self.clock.borrow_mut();
            c.dt = dt;
            c.dtp = dt;
            c.t1 = c.t + dt;
            c.reset_scheme();
        }
        self.with_flags(|f| {
            f.ticklast = false;
            f.tickfirst = true;
            f.stop_simulation = false;
        });
        self.set_direct_erase(false);
    }

    /// The tick loop. Returns the number of full steps taken.
    fn run_loop(&self) -> usize {
        let mut steps = 0;
        if self.sweep(Phase::Init).is_err() {
            return steps;
        }
        let (adaptive, fsal) = {
            let scheme = self.integrator.borrow();
            (scheme.adaptive(), scheme.adaptive_fsal())
        };
        loop {
            self.event(self.flags.get().t_end);

            let flags = self.flags.get();
            if flags.tickfirst {
                if flags.tick0 && self.config.track_time {
                    let t = self.clock.borrow().t;
                    self.t_hist.borrow_mut().push(t);
                }
                self.change_time_step();
                // A committed step change moves t1; pull it back inside t_end.
                self.event(flags.t_end);
                if self.sweep(Phase::Report).is_err() {
                    break;
                }
                if flags.tick0 {
                    self.tracker();
                    self.with_flags(|f| f.tick0 = false);
                }
            }

            if self.sweep(Phase::Update).is_err() {
                break;
            }
            self.with_flags(|f| f.tickfirst = false);

            if fsal && self.sample() && self.clock.borrow().integrator_initialized {
                self.adaptive_calc();
            }

            self.propagate_states();
            self.update_clock();

            if !self.sample() {
                continue;
            }
            steps += 1;

            let t = self.clock.borrow().t;
            if self.config.track_time {
                self.t_hist.borrow_mut().push(t);
            }
            if self.sweep(Phase::Postcalc).is_err() || self.sweep(Phase::Check).is_err() {
                break;
            }

            let flags = self.flags.get();
            if flags.stop_simulation || t + self.config.eps >= flags.t_end {
                self.with_flags(|f| f.ticklast = true);
            }

            if self.sweep(Phase::Report).is_err() {
                break;
            }
            self.tracker();

            if adaptive {
                self.adaptive_calc();
            }
            self.change_time_step();
            self.change_end_time();
            self.delete_modules();
            trace!(sim = %self.id, t, dt = self.clock.borrow().dt, "full step");

            if self.flags.get().ticklast {
                self.notify(|observer| observer.on_finish(t));
                break;
            }
            if self.sweep(Phase::Reset).is_err() {
                break;
            }
        }
        steps
    }

    fn finish(&self) {
        self.set_direct_erase(true);
        self.phase.set(Phase::Setup);
        self.hook_depth.set(0);
        self.delete_modules();
    }
}

/// Clear the marks of `phase` for every member of `registry`.
fn clear_marks(registry: &Registry, phase: Phase) {
    let Some(slot) = phase.lifecycle_slot() else {
        return;
    };
    for weak in registry.snapshot() {
        if let Some(rc) = weak.upgrade() {
            let module = ModuleRef::from_rc(rc);
            module.dispatch().header().marks[slot].set(Mark::Unvisited);
        }
    }
}

// ── Simulator ──────────────────────────────────────────────────────

/// Handle to a simulator.
///
/// Handles are cheap to clone and all refer to the same simulator.
/// Simulators are registered per thread under their [`SimulatorId`] for as
/// long as they have modules or a handle refers to them.
#[derive(Clone)]
pub struct Simulator {
    shared: Rc<SimShared>,
}

impl Simulator {
    /// A fresh simulator with the default configuration.
    pub fn new() -> Self {
        Self {
            shared: directory::simulator(SimulatorId::next(), SimulatorConfig::default()),
        }
    }

    /// A fresh simulator with `config`.
    pub fn with_config(config: SimulatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            shared: directory::simulator(SimulatorId::next(), config),
        })
    }

    /// The simulator registered under `id`, created with the default
    /// configuration on first reference.
    pub fn get(id: SimulatorId) -> Self {
        Self {
            shared: directory::simulator(id, SimulatorConfig::default()),
        }
    }

    pub(crate) fn from_shared(shared: Rc<SimShared>) -> Self {
        Self { shared }
    }

    /// This simulator's id.
    pub fn id(&self) -> SimulatorId {
        self.shared.id
    }

    /// The configuration the simulator was created with.
    pub fn config(&self) -> &SimulatorConfig {
        &self.shared.config
    }

    // ── Modules ────────────────────────────────────────────────────

    /// Add `module` to the simulator.
    pub fn add<T: Module>(&self, module: T) -> Link<T> {
        self.add_with(|_| module)
    }

    /// Build a module with access to its [`Setup`], which registers its
    /// integrated states, and add it to the simulator.
    ///
    /// Modules added during a run join the phase registries at the end of
    /// the current sweep and are initialized then.
    pub fn add_with<T: Module>(&self, build: impl FnOnce(&mut Setup<'_>) -> T) -> Link<T> {
        let sim = &self.shared;
        let mut setup = Setup::new(sim);
        let body = build(&mut setup);
        let node = Node::create(Rc::clone(sim), body, setup.into_slots());
        let id = node.header.id;
        let weak: Weak<dyn Dispatch> = Rc::downgrade(&node) as Weak<dyn Dispatch>;
        directory::adopt_simulator(sim);
        directory::register_module(id, weak.clone());
        sim.modules.insert(id, weak.clone());
        if sim.phase.get() == Phase::Setup {
            sim.add_phases(&node.header);
        } else {
            sim.to_add.borrow_mut().push(weak);
        }
        trace!(sim = %sim.id, module = %id, kind = std::any::type_name::<T>(), "module added");
        Link::from_node(node)
    }

    /// Number of live modules.
    pub fn module_count(&self) -> usize {
        self.shared.modules.len()
    }

    /// Register a stopper. Ignored if it has no live members.
    pub fn add_stopper(&self, stopper: Stopper) {
        if !stopper.is_empty() {
            self.shared.stoppers.borrow_mut().push(stopper);
        }
    }

    /// Number of registered stoppers with live members.
    pub fn stopper_count(&self) -> usize {
        self.shared
            .stoppers
            .borrow()
            .iter()
            .filter(|s| !s.is_empty())
            .count()
    }

    /// Install the observer notified on every sampled step and when a run
    /// finishes. Replaces any previous observer.
    pub fn set_observer(&self, observer: impl RunObserver) {
        *self.shared.observer.borrow_mut() = Some(Box::new(observer));
    }

    // ── Integration ────────────────────────────────────────────────

    /// Replace the integration scheme. Only possible in the setup phase
    /// and before any state has been registered.
    pub fn set_integrator(&self, scheme: Box<dyn Integrator>) -> Result<(), RunError> {
        let sim = &self.shared;
        if sim.phase.get() != Phase::Setup {
            return Err(RunError::NotInSetup {
                operation: "set_integrator",
            });
        }
        if sim.states_registered.get() {
            return Err(RunError::IntegratorLocked);
        }
        debug!(sim = %sim.id, scheme = scheme.name(), "integrator selected");
        *sim.integrator.borrow_mut() = scheme;
        sim.clock.borrow_mut().reset_scheme();
        Ok(())
    }

    /// Name of the active integration scheme.
    pub fn integrator_name(&self) -> &'static str {
        self.shared.integrator.borrow().name()
    }

    /// Set the adaptive-step tolerance of every state of every module.
    pub fn integration_tolerance(&self, tolerance: f64) {
        for weak in self.shared.modules.snapshot() {
            if let Some(rc) = weak.upgrade() {
                let _ = ModuleRef::from_rc(rc).integration_tolerance(tolerance);
            }
        }
    }

    // ── Run ────────────────────────────────────────────────────────

    /// Advance from the current time to `t_end` with base step `dt`.
    ///
    /// Fails with [`RunError::Aborted`] if any error was recorded, before
    /// or during the run; [`errors`](Simulator::errors) lists the causes.
    /// Errors persist: once one is recorded, later runs fail immediately.
    pub fn run(&self, dt: f64, t_end: f64) -> Result<(), RunError> {
        let sim = &self.shared;
        if sim.phase.get() != Phase::Setup {
            return Err(RunError::NotInSetup { operation: "run" });
        }
        if sim.has_error() {
            return Err(sim.aborted());
        }
        sim.last_run.set(Some((dt, t_end)));
        sim.with_flags(|f| f.t_end = t_end);

        let t = sim.clock.borrow().t;
        if !(t_end > t) {
            sim.record(RunError::InvalidEndTime { t_end, t });
        }
        if sim.modules.is_empty() {
            sim.record(RunError::NoModules);
        }
        if !(dt.is_finite() && dt > 0.0) {
            sim.record(RunError::InvalidStep { dt });
        }
        if sim.has_error() {
            return Err(sim.aborted());
        }

        debug!(sim = %sim.id, dt, t_end, modules = sim.modules.len(), "run started");
        sim.setup(dt);
        let steps = sim.run_loop();
        sim.finish();

        if sim.has_error() {
            debug!(sim = %sim.id, steps, errors = sim.errors.borrow().len(), "run aborted");
            return Err(sim.aborted());
        }
        debug!(sim = %sim.id, steps, t = sim.clock.borrow().t, "run finished");
        Ok(())
    }

    /// Run again with the step and end time of the previous run, as
    /// amended by any change requested since. Fails with
    /// [`RunError::InvalidStep`] if there was no previous run.
    pub fn rerun(&self) -> Result<(), RunError> {
        let (dt, t_end) = self.shared.last_run.get().unwrap_or((0.0, 0.0));
        self.run(dt, t_end)
    }

    /// Request a new base step, committed at the next step boundary.
    pub fn request_dt(&self, dt: f64) {
        self.shared.request_dt(dt);
    }

    /// Request a new end time. Applied immediately in the setup phase and
    /// after the current full step during a run.
    pub fn set_end_time(&self, t_end: f64) {
        self.shared.set_end_time(t_end);
    }

    /// Move the clock to `t`. Only allowed in the setup phase.
    pub fn set_time(&self, t: f64) -> Result<(), RunError> {
        let sim = &self.shared;
        if sim.phase.get() != Phase::Setup {
            return Err(RunError::NotInSetup {
                operation: "set_time",
            });
        }
        if !(t >= 0.0) {
            return Err(RunError::InvalidTime { t });
        }
        sim.clock.borrow_mut().t = t;
        Ok(())
    }

    // ── Observation ────────────────────────────────────────────────

    /// Current simulation time.
    pub fn t(&self) -> f64 {
        self.shared.clock.borrow().t
    }

    /// Working step of the current full step.
    pub fn dt(&self) -> f64 {
        self.shared.clock.borrow().dt
    }

    /// Base step.
    pub fn dt_base(&self) -> f64 {
        self.shared.clock.borrow().dtp
    }

    /// End time of the current or last run.
    pub fn t_end(&self) -> f64 {
        self.shared.flags.get().t_end
    }

    /// The phase being executed; `Setup` between runs.
    pub fn phase(&self) -> Phase {
        self.shared.phase.get()
    }

    /// Every recorded error, oldest first.
    pub fn errors(&self) -> Vec<RunError> {
        self.shared.errors.borrow().clone()
    }

    /// Whether any error has been recorded.
    pub fn has_error(&self) -> bool {
        self.shared.has_error()
    }

    /// Times of the initial tick and of every full step taken.
    pub fn time_history(&self) -> Vec<f64> {
        self.shared.t_hist.borrow().to_vec()
    }

    /// Mirror recorded errors to `tracing`.
    pub fn set_print_errors(&self, print: bool) {
        self.shared.print_errors.set(print);
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Simulator {
    fn drop(&mut self) {
        // The directory holds the only other reference.
        if Rc::strong_count(&self.shared) <= 2 && self.shared.modules.is_empty() {
            directory::forget_simulator(self.shared.id);
        }
    }
}

impl fmt::Debug for Simulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulator")
            .field("id", &self.shared.id)
            .field("phase", &self.shared.phase.get())
            .field("t", &self.t())
            .field("modules", &self.module_count())
            .finish()
    }
}
