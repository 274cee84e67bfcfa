//! Benchmark profiles for the Eventide event-loop simulator.
//!
//! Each profile is a script that loads one part of the engine:
//!
//! - [`microtask_flood`]: `n` queued microtasks in a single drain
//! - [`promise_chain`]: a `.then` chain of the given depth
//! - [`timer_churn`]: `n` timeouts at spread-out delays, every other one cancelled
//! - [`interval_ticks`]: one interval firing `n` times before clearing itself
//! - [`async_pipeline`]: `n` async functions each awaiting twice
//! - [`bench_config`]: the loop configuration all profiles run under

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::cell::Cell;
use std::rc::Rc;

use eventide_core::Value;
use eventide_engine::{AsyncFn, LoopConfig, Scope, TaskResult, Yield};

/// Loop configuration for benchmarks: event log off, generous limits.
pub fn bench_config() -> LoopConfig {
    LoopConfig {
        max_macrotasks: Some(1_000_000),
        max_microtasks_per_drain: Some(10_000_000),
        record_events: false,
        ..LoopConfig::default()
    }
}

/// Queue `n` microtasks from the script. Each emits its index.
pub fn microtask_flood(n: u64) -> impl FnOnce(&mut Scope<'_>) -> TaskResult {
    move |s| {
        for i in 0..n {
            s.queue_microtask(move |s| {
                s.emit(i as i64);
                Ok(())
            });
        }
        Ok(())
    }
}

/// Build a chain of `depth` `.then` reactions off one resolved promise.
/// Each link adds one to the running value; the last link emits it.
pub fn promise_chain(depth: u64) -> impl FnOnce(&mut Scope<'_>) -> TaskResult {
    move |s| {
        let mut p = s.promise_resolve(0i64);
        for _ in 0..depth {
            p = s.then(p, |_, v| match v {
                Value::Int(n) => Ok(Value::Int(n + 1)),
                other => Ok(other),
            })?;
        }
        s.then(p, |s, v| {
            s.emit(v);
            Ok(Value::Undefined)
        })?;
        Ok(())
    }
}

/// Schedule `n` timeouts with delays cycling through 0..100ms, then
/// cancel every other one.
pub fn timer_churn(n: u64) -> impl FnOnce(&mut Scope<'_>) -> TaskResult {
    move |s| {
        let ids: Vec<_> = (0..n)
            .map(|i| {
                s.set_timeout(
                    move |s| {
                        s.emit(i as i64);
                        Ok(())
                    },
                    i % 100,
                )
            })
            .collect();
        for id in ids.into_iter().step_by(2) {
            s.clear_timeout(id);
        }
        Ok(())
    }
}

/// One 1ms interval that fires `n` times and clears itself on the last.
pub fn interval_ticks(n: u64) -> impl FnOnce(&mut Scope<'_>) -> TaskResult {
    move |s| {
        let fired = Rc::new(Cell::new(0u64));
        let handle = Rc::new(Cell::new(None));
        let own = Rc::clone(&handle);
        let id = s.set_interval(
            move |s| {
                fired.set(fired.get() + 1);
                if fired.get() >= n {
                    if let Some(id) = own.get() {
                        s.clear_interval(id);
                    }
                }
                Ok(())
            },
            1,
        );
        handle.set(Some(id));
        Ok(())
    }
}

/// Spawn `n` async functions that await two resolved values and return
/// their sum.
pub fn async_pipeline(n: u64) -> impl FnOnce(&mut Scope<'_>) -> TaskResult {
    move |s| {
        for i in 0..n {
            let base = i as i64;
            let body = AsyncFn::new()
                .step(move |_, _| Yield::Await(Value::Int(base)))
                .step(move |_, prev| match prev {
                    Ok(Value::Int(a)) => Yield::Await(Value::Int(a + 1)),
                    Ok(other) => Yield::Return(other),
                    Err(e) => Yield::Throw(e),
                })
                .step(|s, prev| match prev {
                    Ok(v) => {
                        s.emit(v.clone());
                        Yield::Return(v)
                    }
                    Err(e) => Yield::Throw(e),
                });
            s.spawn_async(body);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventide_engine::{run_to_completion, HaltReason};

    #[test]
    fn microtask_flood_emits_in_order() {
        let report = run_to_completion(bench_config(), microtask_flood(100)).unwrap();
        assert_eq!(report.trace.len(), 100);
        assert_eq!(report.metrics.microtasks_run, 100);
        assert_eq!(report.halt, HaltReason::Exhausted);
    }

    #[test]
    fn promise_chain_counts_depth() {
        let report = run_to_completion(bench_config(), promise_chain(50)).unwrap();
        assert_eq!(report.labels(), ["50"]);
    }

    #[test]
    fn timer_churn_runs_half() {
        let report = run_to_completion(bench_config(), timer_churn(200)).unwrap();
        assert_eq!(report.trace.len(), 100);
        assert_eq!(report.metrics.tasks_cancelled, 100);
    }

    #[test]
    fn interval_ticks_stops_itself() {
        let report = run_to_completion(bench_config(), interval_ticks(25)).unwrap();
        assert_eq!(report.metrics.interval_firings, 25);
        assert_eq!(report.final_time.0, 25);
        assert_eq!(report.halt, HaltReason::Exhausted);
    }

    #[test]
    fn async_pipeline_sums() {
        let report = run_to_completion(bench_config(), async_pipeline(3)).unwrap();
        assert_eq!(report.labels(), ["1", "2", "3"]);
    }
}
