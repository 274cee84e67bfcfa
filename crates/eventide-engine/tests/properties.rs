//! Property tests over randomly generated schedules.

use proptest::prelude::*;

use eventide_core::Value;
use eventide_engine::{LoopConfig, RunReport, Scope, TaskResult};
use eventide_test_utils::{bounded_config, run_with};

#[derive(Clone, Debug)]
enum Op {
    Timeout(u64),
    Immediate,
    Microtask,
    Then,
    /// A timeout that schedules a microtask and a zero-delay timeout.
    Nested(u64),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u64..50).prop_map(Op::Timeout),
        Just(Op::Immediate),
        Just(Op::Microtask),
        Just(Op::Then),
        (0u64..50).prop_map(Op::Nested),
    ]
}

fn schedule(s: &mut Scope<'_>, ops: &[Op]) -> TaskResult {
    for (i, op) in ops.iter().enumerate() {
        let label = format!("op{i}");
        match *op {
            Op::Timeout(delay) => {
                s.set_timeout(
                    move |s| {
                        s.emit(label);
                        Ok(())
                    },
                    delay,
                );
            }
            Op::Immediate => {
                s.set_immediate(move |s| {
                    s.emit(label);
                    Ok(())
                });
            }
            Op::Microtask => {
                s.queue_microtask(move |s| {
                    s.emit(label);
                    Ok(())
                });
            }
            Op::Then => {
                let p = s.promise_resolve(Value::Int(i as i64));
                s.then(p, move |s, _| {
                    s.emit(label);
                    Ok(Value::Undefined)
                })?;
            }
            Op::Nested(delay) => {
                s.set_timeout(
                    move |s| {
                        let inner = format!("{label}.m");
                        let later = format!("{label}.t");
                        s.emit(label);
                        s.queue_microtask(move |s| {
                            s.emit(inner);
                            Ok(())
                        });
                        s.set_timeout(
                            move |s| {
                                s.emit(later);
                                Ok(())
                            },
                            0,
                        );
                        Ok(())
                    },
                    delay,
                );
            }
        }
    }
    Ok(())
}

fn run_ops(config: LoopConfig, ops: &[Op]) -> RunReport {
    run_with(config, |s| schedule(s, ops))
}

proptest! {
    #[test]
    fn microtasks_run_in_registration_order(n in 1usize..40) {
        let report = run_with(bounded_config(), |s| {
            for i in 0..n {
                s.queue_microtask(move |s| {
                    s.emit(Value::Int(i as i64));
                    Ok(())
                });
            }
            Ok(())
        });
        let expected: Vec<String> = (0..n).map(|i| i.to_string()).collect();
        prop_assert_eq!(report.labels(), expected);
    }

    #[test]
    fn timers_fire_by_delay_then_registration(
        delays in proptest::collection::vec(0u64..100, 1..30)
    ) {
        let report = run_with(bounded_config(), |s| {
            for (i, &delay) in delays.iter().enumerate() {
                s.set_timeout(
                    move |s| {
                        s.emit(Value::Int(i as i64));
                        Ok(())
                    },
                    delay,
                );
            }
            Ok(())
        });
        let mut expected: Vec<usize> = (0..delays.len()).collect();
        expected.sort_by_key(|&i| delays[i]);
        let expected: Vec<String> = expected.iter().map(|i| i.to_string()).collect();
        prop_assert_eq!(report.labels(), expected);

        let times: Vec<u64> = report.trace.iter().map(|e| e.time.as_millis()).collect();
        prop_assert!(times.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn interval_fires_until_cancelled(n in 1i64..20, period in 1u64..50) {
        let report = run_with(bounded_config(), |s| {
            let handle = std::rc::Rc::new(std::cell::Cell::new(None));
            let inner = handle.clone();
            let mut fired = 0i64;
            let id = s.set_interval(
                move |s| {
                    fired += 1;
                    s.emit(Value::Int(fired));
                    if fired == n {
                        if let Some(id) = inner.get() {
                            s.clear_interval(id);
                        }
                    }
                    Ok(())
                },
                period,
            );
            handle.set(Some(id));
            Ok(())
        });
        prop_assert_eq!(report.trace.len() as i64, n);
        prop_assert_eq!(report.final_time.as_millis(), period * n as u64);
        prop_assert!(report.is_exhausted());
    }

    #[test]
    fn identical_schedules_produce_identical_runs(
        ops in proptest::collection::vec(arb_op(), 0..40)
    ) {
        let first = run_ops(bounded_config(), &ops);
        let second = run_ops(bounded_config(), &ops);
        prop_assert_eq!(&first.trace, &second.trace);
        prop_assert_eq!(&first.metrics, &second.metrics);
        prop_assert_eq!(first.final_time, second.final_time);
    }

    #[test]
    fn sync_phase_microtasks_precede_every_macrotask(
        ops in proptest::collection::vec(arb_op(), 1..40)
    ) {
        let report = run_ops(bounded_config(), &ops);
        let sync_micro = ops
            .iter()
            .filter(|op| matches!(op, Op::Microtask | Op::Then))
            .count();
        let labels = report.labels();
        for (pos, label) in labels.iter().enumerate().take(sync_micro) {
            let index: usize = label
                .trim_start_matches("op")
                .parse()
                .map_err(|_| TestCaseError::fail(format!("unexpected label {label} at {pos}")))?;
            prop_assert!(matches!(ops[index], Op::Microtask | Op::Then));
        }
        let nested = ops.iter().filter(|op| matches!(op, Op::Nested(_))).count();
        prop_assert_eq!(labels.len(), ops.len() + 2 * nested);
    }
}
