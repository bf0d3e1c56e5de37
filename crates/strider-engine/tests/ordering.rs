//! `run_before` ordering, on-demand forcing through links, and cycle
//! detection.

use std::rc::Rc;

use proptest::prelude::*;
use strider_core::{ModuleError, Phase, RunError};
use strider_engine::{AsModule, Context, Link, Module, Simulator};
use strider_test_utils::{labels, Call, CallLog, Recorder};

fn pairs(labels: &[&'static str]) -> Vec<(&'static str, &'static str)> {
    labels.chunks(2).map(|c| (c[0], c[1])).collect()
}

#[test]
fn run_before_orders_update_and_postcalc() {
    let log = CallLog::default();
    let sim = Simulator::new();
    let b = sim.add(Recorder::new("b", &log));
    let a = sim.add(Recorder::new("a", &log));
    a.run_before(&b).unwrap();
    sim.run(0.5, 1.0).unwrap();

    let updates = labels(&log, Phase::Update);
    assert_eq!(updates.len(), 16);
    assert!(pairs(&updates).iter().all(|&p| p == ("a", "b")));
    assert_eq!(labels(&log, Phase::Postcalc), vec!["a", "b", "a", "b"]);
    // Unordered phases keep creation order.
    assert_eq!(labels(&log, Phase::Check), vec!["b", "a", "b", "a"]);
}

#[test]
fn depends_on_states_the_same_edge() {
    let log = CallLog::default();
    let sim = Simulator::new();
    let b = sim.add(Recorder::new("b", &log));
    let a = sim.add(Recorder::new("a", &log));
    b.depends_on(&a).unwrap();
    sim.run(1.0, 1.0).unwrap();

    assert_eq!(labels(&log, Phase::Postcalc), vec!["a", "b"]);
}

#[test]
fn chains_resolve_transitively() {
    let log = CallLog::default();
    let sim = Simulator::new();
    let c = sim.add(Recorder::new("c", &log));
    let b = sim.add(Recorder::new("b", &log));
    let a = sim.add(Recorder::new("a", &log));
    a.run_before(&b).unwrap();
    b.run_before(&c).unwrap();
    sim.run(1.0, 1.0).unwrap();

    assert_eq!(labels(&log, Phase::Postcalc), vec!["a", "b", "c"]);
    assert_eq!(&labels(&log, Phase::Update)[..3], &["a", "b", "c"]);
}

#[test]
fn two_module_cycle_is_reported() {
    let log = CallLog::default();
    let sim = Simulator::new();
    sim.set_print_errors(false);
    let a = sim.add(Recorder::new("a", &log));
    let b = sim.add(Recorder::new("b", &log));
    a.run_before(&b).unwrap();
    b.run_before(&a).unwrap();

    assert_eq!(sim.run(0.1, 1.0), Err(RunError::Aborted { errors: 1 }));
    assert!(matches!(
        &sim.errors()[0],
        RunError::Module {
            phase: Phase::Update,
            reason: ModuleError::CircularDependency { .. },
            ..
        }
    ));
    assert!(labels(&log, Phase::Update).is_empty());
}

#[test]
fn self_dependency_is_a_cycle() {
    let log = CallLog::default();
    let sim = Simulator::new();
    sim.set_print_errors(false);
    let a = sim.add(Recorder::new("a", &log));
    a.run_before(&a).unwrap();

    assert!(sim.run(0.1, 1.0).is_err());
    assert!(matches!(
        &sim.errors()[0],
        RunError::Module {
            reason: ModuleError::CircularDependency { .. },
            ..
        }
    ));
}

#[test]
fn dead_dependencies_are_pruned() {
    let log = CallLog::default();
    let sim = Simulator::new();
    let b = sim.add(Recorder::new("b", &log));
    let a = sim.add(Recorder::new("a", &log));
    a.run_before(&b).unwrap();
    drop(a);
    sim.run(1.0, 1.0).unwrap();

    assert_eq!(labels(&log, Phase::Postcalc), vec!["b"]);
}

/// Reads another module through a link inside its own update.
struct Reader {
    source: Link<Recorder>,
    log: CallLog,
}

impl Module for Reader {
    fn update(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        let source = self.source.get()?;
        self.log.borrow_mut().push(Call {
            module: "reader",
            phase: ctx.phase(),
            t: ctx.t(),
        });
        drop(source);
        Ok(())
    }
}

#[test]
fn link_access_forces_the_target_through_the_current_phase() {
    let log = CallLog::default();
    let sim = Simulator::new();
    let reader = sim.add(Reader {
        source: Link::new(),
        log: Rc::clone(&log),
    });
    let source = sim.add(Recorder::new("source", &log));
    reader.get_mut().unwrap().source = source.clone();
    sim.run(0.5, 1.0).unwrap();

    let updates = labels(&log, Phase::Update);
    assert_eq!(updates.len(), 16);
    assert!(pairs(&updates).iter().all(|&p| p == ("source", "reader")));
}

#[test]
fn link_access_in_setup_does_not_run_hooks() {
    let log = CallLog::default();
    let sim = Simulator::new();
    let source = sim.add(Recorder::new("source", &log));
    assert_eq!(source.get().unwrap().label, "source");
    assert!(log.borrow().is_empty());
}

/// Dereferences its own link from inside its hook.
struct Narcissus {
    me: Link<Narcissus>,
}

impl Module for Narcissus {
    fn update(&mut self, _ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        self.me.get().map(|_| ())
    }
}

#[test]
fn dereferencing_self_during_a_hook_is_reported() {
    let sim = Simulator::new();
    sim.set_print_errors(false);
    let n = sim.add(Narcissus { me: Link::new() });
    n.get_mut().unwrap().me = n.clone();

    assert!(sim.run(0.1, 1.0).is_err());
    assert!(matches!(
        &sim.errors()[0],
        RunError::Module {
            phase: Phase::Update,
            reason: ModuleError::CircularDependency { .. },
            ..
        }
    ));
    n.get_mut().unwrap().me.clear();
}

/// A module that adds a dependency edge from inside a hook.
struct LateWiring {
    target: Link<Recorder>,
    wired: bool,
    log: CallLog,
}

impl Module for LateWiring {
    fn postcalc(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        self.log.borrow_mut().push(Call {
            module: "wiring",
            phase: ctx.phase(),
            t: ctx.t(),
        });
        if !self.wired {
            ctx.run_before(&self.target);
            self.wired = true;
        }
        Ok(())
    }
}

#[test]
fn edges_added_during_a_run_apply_from_the_next_sweep() {
    let log = CallLog::default();
    let sim = Simulator::new();
    let target = sim.add(Recorder::new("target", &log));
    let _w = sim.add(LateWiring {
        target: target.clone(),
        wired: false,
        log: Rc::clone(&log),
    });
    sim.run(1.0, 2.0).unwrap();

    assert_eq!(
        labels(&log, Phase::Postcalc),
        vec!["target", "wiring", "wiring", "target"]
    );
}

proptest! {
    /// For any chain declared in any creation order, postcalc follows the
    /// chain.
    #[test]
    fn chain_order_is_independent_of_creation_order(
        perm in Just(vec![0usize, 1, 2, 3, 4]).prop_shuffle()
    ) {
        const NAMES: [&str; 5] = ["m0", "m1", "m2", "m3", "m4"];
        let log = CallLog::default();
        let sim = Simulator::new();
        let mut links: Vec<Option<Link<Recorder>>> = (0..5).map(|_| None).collect();
        for &i in &perm {
            links[i] = Some(sim.add(Recorder::new(NAMES[i], &log)));
        }
        let links: Vec<Link<Recorder>> = links.into_iter().flatten().collect();
        for w in links.windows(2) {
            w[0].run_before(&w[1]).unwrap();
        }
        sim.run(1.0, 1.0).unwrap();
        prop_assert_eq!(labels(&log, Phase::Postcalc), NAMES.to_vec());
    }
}
