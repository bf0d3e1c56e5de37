//! Run termination and time-grid control: stoppers, events, sampling,
//! end-time changes and explicit stop requests.

use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_abs_diff_eq;
use strider_core::ModuleError;
use strider_engine::{AsModule, Context, Module, Simulator, Stopper};
use strider_test_utils::{Decay, StopAt};

fn last_time(sim: &Simulator) -> f64 {
    *sim.time_history().last().unwrap()
}

fn contains_time(hist: &[f64], t: f64) -> bool {
    hist.iter().any(|&h| (h - t).abs() < 1e-9)
}

// ── Stoppers ───────────────────────────────────────────────────────

#[test]
fn stopper_ends_the_run_at_the_first_full_step_past_its_threshold() {
    let sim = Simulator::new();
    let _decay = Decay::add(&sim, 1.0, 1.0);
    let stop = sim.add(StopAt::new(0.35));
    sim.add_stopper(Stopper::new().with(&stop));
    assert_eq!(sim.stopper_count(), 1);

    sim.run(0.1, 1.0).unwrap();
    assert_abs_diff_eq!(last_time(&sim), 0.4, epsilon = 1e-9);
    assert_abs_diff_eq!(sim.t(), 0.4, epsilon = 1e-9);
    assert_eq!(stop.get().unwrap().checks, 4);
}

#[test]
fn stopper_waits_for_every_member() {
    let sim = Simulator::new();
    let early = sim.add(StopAt::new(0.2));
    let late = sim.add(StopAt::new(0.5));
    let mut stopper = Stopper::new();
    stopper.add(&early).add(&late);
    assert_eq!(stopper.len(), 2);
    sim.add_stopper(stopper);

    sim.run(0.1, 1.0).unwrap();
    assert_abs_diff_eq!(last_time(&sim), 0.5, epsilon = 1e-9);
}

#[test]
fn stopper_is_inert_once_its_members_are_gone() {
    let sim = Simulator::new();
    let _decay = Decay::add(&sim, 1.0, 1.0);
    let stop = sim.add(StopAt::new(0.2));
    sim.add_stopper(Stopper::new().with(&stop));
    drop(stop);
    assert_eq!(sim.stopper_count(), 0);

    sim.run(0.1, 1.0).unwrap();
    assert_abs_diff_eq!(last_time(&sim), 1.0, epsilon = 1e-9);
}

#[test]
fn stoppers_without_members_are_ignored() {
    let sim = Simulator::new();
    sim.add_stopper(Stopper::new());
    assert_eq!(sim.stopper_count(), 0);
}

/// Requests the end of the run from `check` once `t >= at`.
struct Quit {
    at: f64,
}

impl Module for Quit {
    fn check(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        if ctx.t() + 1e-9 >= self.at {
            ctx.stop_simulation();
        }
        Ok(())
    }
}

#[test]
fn stop_simulation_finishes_the_current_step() {
    let sim = Simulator::new();
    let decay = Decay::add(&sim, 1.0, 1.0);
    let _quit = sim.add(Quit { at: 0.2 });
    sim.run(0.1, 1.0).unwrap();
    assert_abs_diff_eq!(last_time(&sim), 0.2, epsilon = 1e-9);
    assert_eq!(sim.time_history().len(), 3);
    let x = decay.state(strider_core::StateId(0)).unwrap().x;
    assert_abs_diff_eq!(x, (-0.2f64).exp(), epsilon = 1e-6);

    // The next run picks up where this one stopped.
    sim.run(0.1, 0.4).unwrap();
    assert_abs_diff_eq!(sim.t(), 0.4, epsilon = 1e-9);
}

// ── Time grid ──────────────────────────────────────────────────────

/// Asks to land on `at` and counts the passes that do.
struct Alarm {
    at: f64,
    hits: Rc<RefCell<Vec<f64>>>,
}

impl Module for Alarm {
    fn update(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        if ctx.event(self.at) {
            self.hits.borrow_mut().push(ctx.t());
        }
        Ok(())
    }
}

#[test]
fn events_shorten_the_step_to_land_exactly() {
    let hits = Rc::new(RefCell::new(Vec::new()));
    let sim = Simulator::new();
    let _alarm = sim.add(Alarm {
        at: 0.25,
        hits: Rc::clone(&hits),
    });
    sim.run(0.1, 1.0).unwrap();

    let hist = sim.time_history();
    // 0, .1, .2, .25, then back on the 0.1 grid.
    assert_eq!(hist.len(), 12);
    assert!(contains_time(&hist, 0.25));
    assert!(contains_time(&hist, 0.3));
    assert_eq!(hits.borrow().len(), 1);
    assert_abs_diff_eq!(hits.borrow()[0], 0.25, epsilon = 1e-9);
}

#[test]
fn events_outside_the_current_step_leave_it_alone() {
    let hits = Rc::new(RefCell::new(Vec::new()));
    let sim = Simulator::new();
    let _alarm = sim.add(Alarm {
        at: 5.0,
        hits: Rc::clone(&hits),
    });
    sim.run(0.1, 1.0).unwrap();
    assert_eq!(sim.time_history().len(), 11);
    assert!(hits.borrow().is_empty());
}

/// Samples on a coarser grid than the base step.
struct Sampler {
    every: f64,
    hits: Rc<RefCell<Vec<f64>>>,
}

impl Module for Sampler {
    fn update(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        if ctx.sample_every(self.every) {
            self.hits.borrow_mut().push(ctx.t());
        }
        Ok(())
    }
}

#[test]
fn sample_every_visits_each_grid_point_once() {
    let hits = Rc::new(RefCell::new(Vec::new()));
    let sim = Simulator::new();
    let _sampler = sim.add(Sampler {
        every: 0.25,
        hits: Rc::clone(&hits),
    });
    sim.run(0.1, 1.0).unwrap();

    let hits = hits.borrow();
    assert_eq!(hits.len(), 4);
    for (hit, expected) in hits.iter().zip([0.0, 0.25, 0.5, 0.75]) {
        assert_abs_diff_eq!(*hit, expected, epsilon = 1e-9);
    }
    let hist = sim.time_history();
    assert_eq!(hist.len(), 13);
    assert!(contains_time(&hist, 0.25));
    assert!(contains_time(&hist, 0.75));
}

#[test]
fn sample_every_ignores_non_positive_intervals() {
    let hits = Rc::new(RefCell::new(Vec::new()));
    let sim = Simulator::new();
    let _sampler = sim.add(Sampler {
        every: 0.0,
        hits: Rc::clone(&hits),
    });
    sim.run(0.1, 1.0).unwrap();
    assert!(hits.borrow().is_empty());
    assert_eq!(sim.time_history().len(), 11);
}

/// Moves the end time from postcalc once `t >= at`.
struct Shorten {
    at: f64,
    t_end: f64,
}

impl Module for Shorten {
    fn postcalc(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        if ctx.t() + 1e-9 >= self.at {
            ctx.set_end_time(self.t_end);
        }
        Ok(())
    }
}

#[test]
fn end_time_changes_apply_after_the_step() {
    let sim = Simulator::new();
    let _shorten = sim.add(Shorten { at: 0.3, t_end: 0.5 });
    sim.run(0.1, 1.0).unwrap();
    assert_abs_diff_eq!(last_time(&sim), 0.5, epsilon = 1e-9);
    assert_abs_diff_eq!(sim.t_end(), 0.5, epsilon = 1e-9);
}

#[test]
fn end_time_set_in_setup_is_used_by_rerun() {
    let sim = Simulator::new();
    let _decay = Decay::add(&sim, 1.0, 1.0);
    sim.run(0.1, 1.0).unwrap();
    sim.set_end_time(1.5);
    sim.rerun().unwrap();
    assert_abs_diff_eq!(sim.t(), 1.5, epsilon = 1e-9);
    assert_eq!(sim.time_history().len(), 16);
}
