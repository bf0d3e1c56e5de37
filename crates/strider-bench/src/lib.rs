//! Benchmark workloads for the Strider simulation kernel.
//!
//! - [`Oscillators`]: `n` undamped harmonic oscillators in one module,
//!   two states each
//! - [`chain_profile`]: a simulator of `n` single-state modules chained
//!   with `run_before`, for scheduling overhead
//! - [`oscillator_profile`]: a simulator holding one [`Oscillators`]
//!   module, for integration throughput

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use strider_core::{ModuleError, RunError, StateId};
use strider_engine::{AsModule, Context, Link, Module, Simulator};

/// A bank of harmonic oscillators `x'' = -w^2 x`.
pub struct Oscillators {
    x: Vec<StateId>,
    v: Vec<StateId>,
    omega: f64,
}

impl Module for Oscillators {
    fn update(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        let w2 = self.omega * self.omega;
        for (&x, &v) in self.x.iter().zip(&self.v) {
            let (pos, vel) = (ctx.x(x), ctx.x(v));
            ctx.set_xd(x, vel);
            ctx.set_xd(v, -w2 * pos);
        }
        Ok(())
    }
}

impl Oscillators {
    /// Total energy `(v^2 + w^2 x^2) / 2` summed over the bank, for checking
    /// that a benchmark did real work.
    pub fn energy(link: &Link<Oscillators>) -> f64 {
        let Ok(body) = link.get() else { return 0.0 };
        let w2 = body.omega * body.omega;
        let states = link.states();
        body.x
            .iter()
            .zip(&body.v)
            .map(|(x, v)| {
                let (pos, vel) = (states[x.0].x, states[v.0].x);
                0.5 * (vel * vel + w2 * pos * pos)
            })
            .sum()
    }
}

/// A simulator running `n` oscillators with the named scheme.
///
/// Returns `None` if `scheme` is not a known integrator name.
pub fn oscillator_profile(scheme: &str, n: usize) -> Option<(Simulator, Link<Oscillators>)> {
    let sim = Simulator::new();
    sim.set_integrator(strider_integrators::by_name(scheme)?).ok()?;
    let bank = sim.add_with(|setup| {
        let mut x = Vec::with_capacity(n);
        let mut v = Vec::with_capacity(n);
        for i in 0..n {
            x.push(setup.add_state(1.0 + i as f64 / n as f64));
            v.push(setup.add_state(0.0));
        }
        Oscillators { x, v, omega: 1.0 }
    });
    Some((sim, bank))
}

/// A relaxing state that depends on the module before it in a chain.
pub struct Relax {
    x: StateId,
}

impl Module for Relax {
    fn update(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        let x = ctx.x(self.x);
        ctx.set_xd(self.x, -x);
        Ok(())
    }
}

/// A simulator of `n` [`Relax`] modules, each ordered to run before the
/// next. Modules are created in reverse so every sweep resolves the chain.
pub fn chain_profile(n: usize) -> Result<(Simulator, Vec<Link<Relax>>), ModuleError> {
    let sim = Simulator::new();
    let mut links: Vec<Link<Relax>> = (0..n)
        .map(|_| {
            sim.add_with(|setup| Relax {
                x: setup.add_state(1.0),
            })
        })
        .collect();
    links.reverse();
    for pair in links.windows(2) {
        pair[0].run_before(&pair[1])?;
    }
    Ok((sim, links))
}

/// Run `sim` for `steps` steps of size `dt` from its current time.
pub fn advance(sim: &Simulator, dt: f64, steps: usize) -> Result<(), RunError> {
    let t_end = sim.t() + dt * steps as f64;
    sim.run(dt, t_end)
}
