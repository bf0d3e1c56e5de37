//! Tracked variables, time history and run observers.

use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_abs_diff_eq;
use strider_core::{ModuleError, Value, VarError};
use strider_engine::{
    AsModule, Context, Module, RunObserver, Simulator, SimulatorConfig,
};
use strider_test_utils::ConstantRate;

/// Counts completed full steps.
#[derive(Default)]
struct StepCounter {
    steps: i64,
}

impl Module for StepCounter {
    fn postcalc(&mut self, _ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        self.steps += 1;
        Ok(())
    }

    fn var(&self, name: &str) -> Option<Value> {
        match name {
            "steps" => Some(Value::I64(self.steps)),
            _ => None,
        }
    }
}

#[test]
fn tracked_variables_are_sampled_alongside_time() {
    let sim = Simulator::new();
    let counter = sim.add(StepCounter::default());
    counter.track("steps").unwrap();
    sim.run(0.1, 1.0).unwrap();

    assert_eq!(counter.history_len("steps").unwrap(), 11);
    assert_eq!(counter.history_len("steps").unwrap(), sim.time_history().len());
    for i in 0..11 {
        assert_eq!(counter.history_value("steps", i).unwrap(), i.to_string());
    }
    assert_eq!(counter.history("steps").unwrap()[10], Value::I64(10));
}

/// Exposes `steps` only for the first five steps.
#[derive(Default)]
struct Vanishing {
    steps: i64,
}

impl Module for Vanishing {
    fn postcalc(&mut self, _ctx: &mut Context<'_>) -> Result<(), ModuleError> {
        self.steps += 1;
        Ok(())
    }

    fn var(&self, name: &str) -> Option<Value> {
        match name {
            "steps" if self.steps <= 5 => Some(Value::I64(self.steps)),
            _ => None,
        }
    }
}

#[test]
fn unavailable_variables_keep_their_history_aligned() {
    let sim = Simulator::new();
    let module = sim.add(Vanishing::default());
    module.track("steps").unwrap();
    sim.run(0.1, 1.0).unwrap();

    assert!(sim.errors().is_empty());
    assert_eq!(module.history_len("steps").unwrap(), sim.time_history().len());
    let samples = module.history("steps").unwrap();
    assert_eq!(samples.len(), 11);
    assert_eq!(samples[5], Value::I64(5));
    assert!(samples[6..]
        .iter()
        .all(|v| v.as_f64().is_some_and(f64::is_nan)));
    assert_eq!(module.history_value("steps", 10).unwrap(), "NaN");
}

#[test]
fn tracked_values_follow_the_state() {
    let sim = Simulator::new();
    let ramp = ConstantRate::add(&sim, 0.0, 2.0);
    ramp.track("x").unwrap();
    sim.run(0.25, 1.0).unwrap();

    let samples = ramp.history("x").unwrap();
    assert_eq!(samples.len(), 5);
    for (i, sample) in samples.iter().enumerate() {
        assert_abs_diff_eq!(sample.as_f64().unwrap(), 0.5 * i as f64, epsilon = 1e-9);
    }
}

#[test]
fn tracking_starts_at_the_next_sample() {
    let sim = Simulator::new();
    let counter = sim.add(StepCounter::default());
    sim.run(0.1, 0.5).unwrap();
    counter.track("steps").unwrap();
    sim.run(0.1, 1.0).unwrap();

    // The second run's first tick is not sampled again.
    assert_eq!(counter.history_len("steps").unwrap(), 5);
    assert_eq!(counter.history_value("steps", 0).unwrap(), "6");
}

#[test]
fn history_queries_report_their_failures() {
    let sim = Simulator::new();
    let counter = sim.add(StepCounter::default());
    assert_eq!(
        counter.history_len("steps"),
        Err(VarError::NotTracked {
            name: "steps".into()
        })
    );
    assert!(matches!(
        counter.track("laps"),
        Err(VarError::UnknownVariable { .. })
    ));

    counter.track("steps").unwrap();
    sim.run(0.5, 1.0).unwrap();
    assert_eq!(
        counter.history_value("steps", 3),
        Err(VarError::OutOfRange {
            name: "steps".into(),
            index: 3,
            len: 3,
        })
    );
}

#[test]
fn history_capacity_keeps_the_latest_samples() {
    let config = SimulatorConfig {
        history_capacity: Some(3),
        ..SimulatorConfig::default()
    };
    let sim = Simulator::with_config(config).unwrap();
    let counter = sim.add(StepCounter::default());
    counter.track("steps").unwrap();
    sim.run(0.1, 1.0).unwrap();

    let values: Vec<String> = (0..3)
        .map(|i| counter.history_value("steps", i).unwrap())
        .collect();
    assert_eq!(values, ["8", "9", "10"]);
    assert_eq!(sim.time_history().len(), 3);
}

#[test]
fn time_history_can_be_disabled() {
    let config = SimulatorConfig {
        track_time: false,
        ..SimulatorConfig::default()
    };
    let sim = Simulator::with_config(config).unwrap();
    let _counter = sim.add(StepCounter::default());
    sim.run(0.1, 1.0).unwrap();
    assert!(sim.time_history().is_empty());
    assert_abs_diff_eq!(sim.t(), 1.0, epsilon = 1e-9);
}

// ── Observers ──────────────────────────────────────────────────────

#[derive(Default)]
struct Tally {
    samples: Vec<f64>,
    finished: Vec<f64>,
}

struct Counting(Rc<RefCell<Tally>>);

impl RunObserver for Counting {
    fn on_sample(&mut self, t: f64) {
        self.0.borrow_mut().samples.push(t);
    }

    fn on_finish(&mut self, t: f64) {
        self.0.borrow_mut().finished.push(t);
    }
}

#[test]
fn observer_sees_every_sample_and_the_finish() {
    let tally = Rc::new(RefCell::new(Tally::default()));
    let sim = Simulator::new();
    let _counter = sim.add(StepCounter::default());
    sim.set_observer(Counting(Rc::clone(&tally)));
    sim.run(0.1, 1.0).unwrap();

    let tally = tally.borrow();
    assert_eq!(tally.samples.len(), 11);
    assert_eq!(tally.samples, sim.time_history());
    assert_eq!(tally.finished.len(), 1);
    assert_abs_diff_eq!(tally.finished[0], 1.0, epsilon = 1e-9);
}
