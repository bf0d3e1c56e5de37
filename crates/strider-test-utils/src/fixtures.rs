//! Reusable module fixtures.
//!
//! - [`Decay`]: `xd = -k x`, analytic solution `x0 e^(-k t)`.
//! - [`ConstantRate`]: `xd = rate`, exact for every consistent scheme.
//! - [`Recorder`]: logs every hook call into a shared [`CallLog`].
//! - [`StopAt`]: raises its stop flag once `t` reaches a threshold.
//! - [`Failing`]: fails in one chosen phase, optionally after N calls.

use std::cell::RefCell;
use std::rc::Rc;

use strider_core::{ModuleError, Phase, StateId, Value, VarError};
use strider_engine::{Context, Link, Module, Simulator};

// ── Decay ──────────────────────────────────────────────────────────

/// Exponential decay of one state.
pub struct Decay {
    pub x: StateId,
    pub k: f64,
}

impl Decay {
    /// Add a decaying module with initial value `x0` and rate `k`.
    pub fn add(sim: &Simulator, x0: f64, k: f64) -> Link<Decay> {
        sim.add_with(|setup| Decay {
            x: setup.add_state(x0),
            k,
        })
    }

    /// Like [`add`](Decay::add), with an adaptive-step tolerance.
    pub fn add_adaptive(sim: &Simulator, x0: f64, k: f64, tolerance: f64) -> Link<Decay> {
        sim.add_with(|setup| Decay {
            x: setup.add_state_with_tolerance(x0, tolerance),
            k,
        })
    }
}

impl Module for Decay {
    fn update(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        let x = ctx.x(self.x);
        ctx.set_xd(self.x, -self.k * x);
        Ok(())
    }

    fn var(&self, name: &str) -> Option<Value> {
        match name {
            "k" => Some(Value::F64(self.k)),
            _ => None,
        }
    }

    fn set_var(&mut self, name: &str, value: Value) -> Result<(), VarError> {
        match name {
            "k" => {
                self.k = value.try_f64(name)?;
                Ok(())
            }
            _ => Err(VarError::ReadOnly { name: name.into() }),
        }
    }
}

// ── ConstantRate ───────────────────────────────────────────────────

/// One state growing at a constant rate. Mirrors its value into the
/// variable `x` at postcalc so it can be tracked.
pub struct ConstantRate {
    pub x: StateId,
    pub rate: f64,
    pub last_x: f64,
}

impl ConstantRate {
    pub fn add(sim: &Simulator, x0: f64, rate: f64) -> Link<ConstantRate> {
        sim.add_with(|setup| ConstantRate {
            x: setup.add_state(x0),
            rate,
            last_x: x0,
        })
    }
}

impl Module for ConstantRate {
    fn update(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        ctx.set_xd(self.x, self.rate);
        Ok(())
    }

    fn postcalc(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        self.last_x = ctx.x(self.x);
        Ok(())
    }

    fn var(&self, name: &str) -> Option<Value> {
        match name {
            "x" => Some(Value::F64(self.last_x)),
            "rate" => Some(Value::F64(self.rate)),
            _ => None,
        }
    }
}

// ── Recorder ───────────────────────────────────────────────────────

/// One hook invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    pub module: &'static str,
    pub phase: Phase,
    pub t: f64,
}

/// Shared, ordered log of hook invocations.
pub type CallLog = Rc<RefCell<Vec<Call>>>;

/// Labels of the calls made in `phase`, in order.
pub fn labels(log: &CallLog, phase: Phase) -> Vec<&'static str> {
    log.borrow()
        .iter()
        .filter(|c| c.phase == phase)
        .map(|c| c.module)
        .collect()
}

/// Logs every hook it receives and keeps every phase scheduled.
pub struct Recorder {
    pub label: &'static str,
    pub log: CallLog,
}

impl Recorder {
    pub fn new(label: &'static str, log: &CallLog) -> Self {
        Self {
            label,
            log: Rc::clone(log),
        }
    }

    fn note(&self, ctx: &Context<'_>) -> Result<(), ModuleError> {
        self.log.borrow_mut().push(Call {
            module: self.label,
            phase: ctx.phase(),
            t: ctx.t(),
        });
        Ok(())
    }
}

impl Module for Recorder {
    fn init(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        self.note(ctx)
    }

    fn update(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        self.note(ctx)
    }

    fn postcalc(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        self.note(ctx)
    }

    fn check(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        self.note(ctx)
    }

    fn report(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        self.note(ctx)
    }

    fn reset(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        self.note(ctx)
    }
}

// ── StopAt ─────────────────────────────────────────────────────────

/// Raises its stop flag in `check` once `t >= t_stop`.
pub struct StopAt {
    pub t_stop: f64,
    pub checks: usize,
}

impl StopAt {
    pub fn new(t_stop: f64) -> Self {
        Self { t_stop, checks: 0 }
    }
}

impl Module for StopAt {
    fn check(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        self.checks += 1;
        let stop = ctx.t() + 1e-9 >= self.t_stop;
        ctx.set_stop(stop);
        Ok(())
    }
}

// ── Failing ────────────────────────────────────────────────────────

/// Fails in `phase` once it has been called there `after` times.
pub struct Failing {
    pub phase: Phase,
    pub after: usize,
    pub calls: usize,
}

impl Failing {
    pub fn new(phase: Phase) -> Self {
        Self::after(phase, 0)
    }

    pub fn after(phase: Phase, after: usize) -> Self {
        Self {
            phase,
            after,
            calls: 0,
        }
    }

    fn hit(&mut self, ctx: &Context<'_>) -> Result<(), ModuleError> {
        if ctx.phase() != self.phase {
            return Ok(());
        }
        self.calls += 1;
        if self.calls > self.after {
            return Err(ModuleError::failed(format!(
                "deliberate failure at t = {}",
                ctx.t()
            )));
        }
        Ok(())
    }
}

impl Module for Failing {
    fn init(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        self.hit(ctx)
    }

    fn update(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        self.hit(ctx)
    }

    fn postcalc(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        self.hit(ctx)
    }

    fn check(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        self.hit(ctx)
    }

    fn report(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        self.hit(ctx)
    }

    fn reset(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        self.hit(ctx)
    }
}
