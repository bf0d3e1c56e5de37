//! Run-loop behaviour: phase cadence, time history, errors and reruns.

use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_abs_diff_eq;
use strider_core::{ModuleError, Phase, RunError, StateId};
use strider_engine::{AsModule, Context, Module, Simulator};
use strider_test_utils::{labels, CallLog, ConstantRate, Decay, Failing, Recorder};

#[test]
fn rk4_decay_matches_the_exponential() {
    let sim = Simulator::new();
    let decay = Decay::add(&sim, 1.0, 1.0);
    sim.run(0.1, 1.0).unwrap();

    assert_abs_diff_eq!(sim.t(), 1.0, epsilon = 1e-9);
    let x = decay.state(StateId(0)).unwrap().x;
    assert_abs_diff_eq!(x, (-1.0_f64).exp(), epsilon = 1e-6);
}

#[test]
fn time_history_has_initial_tick_plus_one_entry_per_step() {
    let sim = Simulator::new();
    let _decay = Decay::add(&sim, 1.0, 1.0);
    sim.run(0.1, 1.0).unwrap();

    let t_hist = sim.time_history();
    assert_eq!(t_hist.len(), 11);
    assert_eq!(t_hist[0], 0.0);
    assert!(t_hist.windows(2).all(|w| w[1] > w[0]));
    assert_abs_diff_eq!(t_hist[10], 1.0, epsilon = 1e-9);
}

#[test]
fn phases_follow_the_documented_cadence() {
    let log = CallLog::default();
    let sim = Simulator::new();
    let _r = sim.add(Recorder::new("r", &log));
    sim.run(0.1, 1.0).unwrap();

    assert_eq!(labels(&log, Phase::Init).len(), 1);
    // Four RK4 passes per step.
    assert_eq!(labels(&log, Phase::Update).len(), 40);
    assert_eq!(labels(&log, Phase::Postcalc).len(), 10);
    assert_eq!(labels(&log, Phase::Check).len(), 10);
    // The initial report plus one per step.
    assert_eq!(labels(&log, Phase::Report).len(), 11);
    // No reset after the last step.
    assert_eq!(labels(&log, Phase::Reset).len(), 9);

    let calls = log.borrow();
    assert_eq!(calls[0].phase, Phase::Init);
    assert_eq!(calls[1].phase, Phase::Report);
    assert_eq!(calls.last().unwrap().phase, Phase::Report);
}

#[test]
fn phase_order_within_a_step() {
    let log = CallLog::default();
    let sim = Simulator::new();
    let _r = sim.add(Recorder::new("r", &log));
    sim.run(0.5, 1.0).unwrap();

    let phases: Vec<Phase> = log.borrow().iter().map(|c| c.phase).collect();
    let mut expected = vec![Phase::Init, Phase::Report];
    expected.extend([Phase::Update; 4]);
    expected.extend([Phase::Postcalc, Phase::Check, Phase::Report, Phase::Reset]);
    expected.extend([Phase::Update; 4]);
    expected.extend([Phase::Postcalc, Phase::Check, Phase::Report]);
    assert_eq!(phases, expected);
}

struct Flags {
    seen: Rc<RefCell<Vec<(f64, bool, bool)>>>,
}

impl Module for Flags {
    fn report(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        self.seen
            .borrow_mut()
            .push((ctx.t(), ctx.first_report(), ctx.last_report()));
        Ok(())
    }
}

#[test]
fn first_and_last_report_are_flagged() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sim = Simulator::new();
    let _f = sim.add(Flags {
        seen: Rc::clone(&seen),
    });
    sim.run(0.25, 1.0).unwrap();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 5);
    assert!(seen[0].1 && !seen[0].2);
    assert!(seen[1..4].iter().all(|&(_, first, last)| !first && !last));
    assert!(!seen[4].1 && seen[4].2);
    assert_abs_diff_eq!(seen[4].0, 1.0, epsilon = 1e-9);
}

#[test]
fn no_modules_is_an_error() {
    let sim = Simulator::new();
    sim.set_print_errors(false);
    assert_eq!(sim.run(0.1, 1.0), Err(RunError::Aborted { errors: 1 }));
    assert_eq!(sim.errors(), vec![RunError::NoModules]);
}

#[test]
fn end_time_must_be_after_current_time() {
    let sim = Simulator::new();
    sim.set_print_errors(false);
    let _decay = Decay::add(&sim, 1.0, 1.0);
    assert!(sim.run(0.1, 0.0).is_err());
    assert_eq!(
        sim.errors(),
        vec![RunError::InvalidEndTime { t_end: 0.0, t: 0.0 }]
    );
    assert_eq!(sim.t(), 0.0);
}

#[test]
fn step_must_be_positive() {
    let sim = Simulator::new();
    sim.set_print_errors(false);
    let _decay = Decay::add(&sim, 1.0, 1.0);
    assert!(sim.run(-0.1, 1.0).is_err());
    assert_eq!(sim.errors(), vec![RunError::InvalidStep { dt: -0.1 }]);
}

#[test]
fn hook_failure_aborts_the_run() {
    let sim = Simulator::new();
    sim.set_print_errors(false);
    let _decay = Decay::add(&sim, 1.0, 1.0);
    let failing = sim.add(Failing::after(Phase::Postcalc, 2));
    failing.set_name("failing-postcalc").unwrap();

    assert_eq!(sim.run(0.1, 1.0), Err(RunError::Aborted { errors: 1 }));
    assert_abs_diff_eq!(sim.t(), 0.3, epsilon = 1e-9);
    assert_eq!(sim.phase(), Phase::Setup);

    match &sim.errors()[0] {
        RunError::Module {
            module,
            phase,
            reason,
        } => {
            assert_eq!(module, "failing-postcalc");
            assert_eq!(*phase, Phase::Postcalc);
            assert!(matches!(reason, ModuleError::ExecutionFailed { .. }));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn errors_persist_across_runs() {
    let sim = Simulator::new();
    sim.set_print_errors(false);
    let _failing = sim.add(Failing::new(Phase::Init));
    assert!(sim.run(0.1, 1.0).is_err());
    assert_eq!(sim.errors().len(), 1);
    assert_eq!(sim.run(0.1, 1.0), Err(RunError::Aborted { errors: 1 }));
    assert_eq!(sim.errors().len(), 1);
}

#[test]
fn rerun_continues_from_the_current_time() {
    let sim = Simulator::new();
    let decay = Decay::add(&sim, 1.0, 1.0);
    sim.run(0.1, 0.5).unwrap();
    assert_abs_diff_eq!(sim.t(), 0.5, epsilon = 1e-9);

    sim.set_end_time(1.0);
    sim.rerun().unwrap();
    assert_abs_diff_eq!(sim.t(), 1.0, epsilon = 1e-9);

    // The initial tick is recorded once per simulator, not per run.
    let t_hist = sim.time_history();
    assert_eq!(t_hist.len(), 11);
    assert!(t_hist.windows(2).all(|w| w[1] > w[0]));

    let x = decay.state(StateId(0)).unwrap().x;
    assert_abs_diff_eq!(x, (-1.0_f64).exp(), epsilon = 1e-6);
}

#[test]
fn rerun_without_a_previous_run_fails() {
    let sim = Simulator::new();
    sim.set_print_errors(false);
    let _decay = Decay::add(&sim, 1.0, 1.0);
    assert!(sim.rerun().is_err());
}

#[test]
fn time_can_only_be_moved_in_setup() {
    struct MoveTime;
    impl Module for MoveTime {
        fn report(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
            match ctx.simulator().set_time(5.0) {
                Err(RunError::NotInSetup { .. }) => Ok(()),
                other => Err(ModuleError::failed(format!("{other:?}"))),
            }
        }
    }

    let sim = Simulator::new();
    let _m = sim.add(MoveTime);
    sim.set_time(2.0).unwrap();
    sim.run(0.5, 3.0).unwrap();
    assert_eq!(sim.time_history()[0], 2.0);
    assert_abs_diff_eq!(sim.t(), 3.0, epsilon = 1e-9);
}

#[test]
fn nested_run_is_rejected() {
    struct Nested;
    impl Module for Nested {
        fn init(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
            match ctx.simulator().run(0.1, 10.0) {
                Err(RunError::NotInSetup { operation: "run" }) => Ok(()),
                other => Err(ModuleError::failed(format!("{other:?}"))),
            }
        }
    }

    let sim = Simulator::new();
    let _m = sim.add(Nested);
    sim.run(0.1, 0.2).unwrap();
}

#[test]
fn step_request_takes_effect_after_the_current_step() {
    struct Widen {
        done: bool,
    }
    impl Module for Widen {
        fn postcalc(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
            if !self.done {
                ctx.request_dt(0.2);
                self.done = true;
            }
            Ok(())
        }
    }

    let sim = Simulator::new();
    let _decay = Decay::add(&sim, 1.0, 1.0);
    let _w = sim.add(Widen { done: false });
    sim.run(0.1, 1.0).unwrap();

    let expected = [0.0, 0.1, 0.3, 0.4, 0.6, 0.8, 1.0];
    let t_hist = sim.time_history();
    assert_eq!(t_hist.len(), expected.len());
    for (t, e) in t_hist.iter().zip(expected) {
        assert_abs_diff_eq!(*t, e, epsilon = 1e-9);
    }
    assert_abs_diff_eq!(sim.dt_base(), 0.2, epsilon = 1e-12);
}

#[test]
fn step_requested_before_run_still_stops_at_the_end_time() {
    let sim = Simulator::new();
    let rate = ConstantRate::add(&sim, 0.0, 1.0);
    sim.request_dt(0.5);
    sim.run(0.1, 0.2).unwrap();

    assert_abs_diff_eq!(sim.t(), 0.2, epsilon = 1e-9);
    let t_hist = sim.time_history();
    assert_eq!(t_hist.len(), 2);
    assert_abs_diff_eq!(t_hist[0], 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(t_hist[1], 0.2, epsilon = 1e-9);
    let x = rate.state(StateId(0)).unwrap().x;
    assert_abs_diff_eq!(x, 0.2, epsilon = 1e-9);
    assert_abs_diff_eq!(sim.dt_base(), 0.5, epsilon = 1e-12);
}

#[test]
fn time_advanced_reflects_the_previous_clock_update() {
    struct Watch {
        advanced: Rc<RefCell<Vec<bool>>>,
    }
    impl Module for Watch {
        fn update(&mut self, ctx: &mut Context<'_>) -> Result<(), ModuleError> {
            self.advanced.borrow_mut().push(ctx.time_advanced());
            Ok(())
        }
    }

    let advanced = Rc::new(RefCell::new(Vec::new()));
    let sim = Simulator::new();
    let _w = sim.add(Watch {
        advanced: Rc::clone(&advanced),
    });
    sim.run(0.5, 1.0).unwrap();

    // RK4 moves the clock after passes 0 and 2 only: to the midpoint, then
    // to the step end.
    let expected = [false, true, false, true, false, true, false, true];
    assert_eq!(*advanced.borrow(), expected.to_vec());
}
