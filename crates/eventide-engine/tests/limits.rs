//! Run control: turn-by-turn stepping and the configured limits.

use std::cell::Cell;
use std::rc::Rc;

use eventide_core::{Value, VirtualTime};
use eventide_engine::{
    run_to_completion, DrainOutcome, EventLoop, HaltReason, LoopConfig, LoopPhase, Scope,
};
use eventide_test_utils::{bounded_config, init_test_logging, run_with};

fn forever(s: &mut Scope<'_>) -> Result<(), Value> {
    s.set_interval(
        |s| {
            s.emit(s.now().as_millis() as i64);
            Ok(())
        },
        100,
    );
    Ok(())
}

#[test]
fn macrotask_limit_bounds_endless_interval() {
    let config = LoopConfig {
        max_macrotasks: Some(4),
        ..LoopConfig::default()
    };
    let report = run_with(config, forever);
    assert_eq!(report.halt, HaltReason::MacrotaskLimit);
    assert_eq!(report.labels(), ["100", "200", "300", "400"]);
}

#[test]
fn time_limit_leaves_later_tasks_pending() {
    let config = LoopConfig {
        time_limit: Some(VirtualTime(250)),
        ..bounded_config()
    };
    let mut el = EventLoop::new(config).unwrap();
    el.run_script(forever);
    let report = el.run();
    assert_eq!(report.halt, HaltReason::TimeLimit);
    assert_eq!(report.labels(), ["100", "200"]);
    assert_eq!(report.final_time, VirtualTime(200));
    assert_eq!(el.pending_macrotasks(), 1);
    assert!(el.turn().is_none());
}

fn flood(s: &mut Scope<'_>) -> Result<(), Value> {
    fn again(s: &mut Scope<'_>) -> Result<(), Value> {
        s.queue_microtask(again);
        Ok(())
    }
    s.queue_microtask(again);
    s.set_timeout(
        |s| {
            s.emit("starved");
            Ok(())
        },
        0,
    );
    Ok(())
}

#[test]
fn microtask_limit_halts_starving_drain() {
    init_test_logging();
    let config = LoopConfig {
        max_microtasks_per_drain: Some(500),
        ..LoopConfig::default()
    };
    let mut el = EventLoop::new(config).unwrap();
    let outcome = el.run_script(flood);
    assert_eq!(outcome, DrainOutcome::LimitExceeded { ran: 500 });
    assert_eq!(el.phase(), LoopPhase::Halted(HaltReason::MicrotaskLimit));

    let report = el.run();
    assert_eq!(report.halt, HaltReason::MicrotaskLimit);
    assert!(report.trace.is_empty(), "timer never runs");
    assert_eq!(report.metrics.microtasks_run, 500);
}

#[test]
fn turn_steps_one_macrotask_at_a_time() {
    let mut el = EventLoop::new(bounded_config()).unwrap();
    el.run_script(|s| {
        for delay in [30, 10, 20] {
            s.set_timeout(
                move |s| {
                    s.emit(Value::Int(delay as i64));
                    Ok(())
                },
                delay,
            );
        }
        Ok(())
    });
    let mut times = Vec::new();
    while let Some(turn) = el.turn() {
        times.push(turn.at.as_millis());
        assert_eq!(el.trace().len(), times.len());
    }
    assert_eq!(times, [10, 20, 30]);
    assert_eq!(el.now(), VirtualTime(30));
}

#[test]
fn metrics_count_scheduling_work() {
    let fired = Rc::new(Cell::new(0));
    let counter = fired.clone();
    let report = run_to_completion(bounded_config(), move |s| {
        let p = s.promise_resolve(1);
        s.then(p, |_, v| Ok(v))?;
        for _ in 0..3 {
            s.queue_microtask(|_| Ok(()));
        }
        let c = counter.clone();
        s.set_timeout(
            move |_| {
                c.set(c.get() + 1);
                Ok(())
            },
            5,
        );
        s.set_immediate(|_| Ok(()));
        Ok(())
    })
    .unwrap();
    assert_eq!(fired.get(), 1);
    let m = report.metrics;
    assert_eq!(m.macrotasks_run, 2);
    assert_eq!(m.microtasks_run, 4);
    assert_eq!(m.promises_created, 2);
    assert_eq!(m.peak_microtask_depth, 4);
    assert_eq!(m.clock_advances, 1);
    assert_eq!(m.callbacks_run(), 6);
}
