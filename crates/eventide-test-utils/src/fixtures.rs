//! Canonical ordering scenarios.
//!
//! Each fixture is a plain entry script. [`CANONICAL`] pairs them with
//! their expected traces under the default [`LoopConfig`](eventide_engine::LoopConfig).

use eventide_core::Value;
use eventide_engine::{AsyncFn, Scope, TaskResult, Yield};

/// An entry script.
pub type Script = fn(&mut Scope<'_>) -> TaskResult;

/// `log(Start); setTimeout(Timeout, 0); Promise.resolve().then(Promise); log(End)`.
pub fn sync_first(s: &mut Scope<'_>) -> TaskResult {
    s.emit("Start");
    s.set_timeout(
        |s| {
            s.emit("Timeout");
            Ok(())
        },
        0,
    );
    let p = s.promise_resolve(Value::Undefined);
    s.then(p, |s, _| {
        s.emit("Promise");
        Ok(Value::Undefined)
    })?;
    s.emit("End");
    Ok(())
}

/// `log(A); queueMicrotask(B); Promise.resolve().then(C); setTimeout(D, 0); log(E)`.
pub fn interleaved(s: &mut Scope<'_>) -> TaskResult {
    s.emit("A");
    s.queue_microtask(|s| {
        s.emit("B");
        Ok(())
    });
    let p = s.promise_resolve(Value::Undefined);
    s.then(p, |s, _| {
        s.emit("C");
        Ok(Value::Undefined)
    })?;
    s.set_timeout(
        |s| {
            s.emit("D");
            Ok(())
        },
        0,
    );
    s.emit("E");
    Ok(())
}

/// Two chains started together; the first handler of chain `a` returns
/// an already-resolved promise.
pub fn thenable_chain(s: &mut Scope<'_>) -> TaskResult {
    let a = s.promise_resolve(Value::Undefined);
    let a1 = s.then(a, |s, _| {
        s.emit("a1");
        Ok(s.promise_resolve(Value::Undefined).into())
    })?;
    s.then(a1, |s, _| {
        s.emit("a2");
        Ok(Value::Undefined)
    })?;

    let mut b = s.promise_resolve(Value::Undefined);
    for label in ["b1", "b2", "b3", "b4"] {
        b = s.then(b, move |s, _| {
            s.emit(label);
            Ok(Value::Undefined)
        })?;
    }
    Ok(())
}

/// An async function awaiting twice, racing a plain `.then` chain.
pub fn async_await(s: &mut Scope<'_>) -> TaskResult {
    s.emit("sync:start");
    let body = AsyncFn::new()
        .step(|s, _| {
            s.emit("async:before");
            Yield::Await(Value::Int(1))
        })
        .step(|s, v| {
            s.emit(format!("async:after {}", v.unwrap_or_default()));
            Yield::Await(Value::Int(2))
        })
        .step(|s, v| {
            s.emit(format!("async:done {}", v.unwrap_or_default()));
            Yield::Return(Value::Undefined)
        });
    s.spawn_async(body);
    let p = s.promise_resolve(Value::Undefined);
    s.then(p, |s, _| {
        s.emit("then");
        Ok(Value::Undefined)
    })?;
    s.emit("sync:end");
    Ok(())
}

/// An interval that cancels itself on its third firing.
pub fn interval_countdown(s: &mut Scope<'_>) -> TaskResult {
    let handle = std::rc::Rc::new(std::cell::Cell::new(None));
    let inner = handle.clone();
    let mut fired = 0;
    let id = s.set_interval(
        move |s| {
            fired += 1;
            s.emit(format!("tick {fired}"));
            if fired == 3 {
                if let Some(id) = inner.get() {
                    s.clear_interval(id);
                }
            }
            Ok(())
        },
        10,
    );
    handle.set(Some(id));
    Ok(())
}

/// Timers of mixed delays and an immediate.
pub fn timer_mix(s: &mut Scope<'_>) -> TaskResult {
    for (label, delay) in [("t100", 100), ("t0a", 0), ("t50", 50), ("t0b", 0)] {
        s.set_timeout(
            move |s| {
                s.emit(label);
                Ok(())
            },
            delay,
        );
    }
    s.set_immediate(|s| {
        s.emit("imm");
        Ok(())
    });
    Ok(())
}

/// Every canonical scenario with its expected trace labels.
pub const CANONICAL: &[(&str, Script, &[&str])] = &[
    ("sync_first", sync_first, &["Start", "End", "Promise", "Timeout"]),
    ("interleaved", interleaved, &["A", "E", "B", "C", "D"]),
    (
        "thenable_chain",
        thenable_chain,
        &["a1", "b1", "b2", "a2", "b3", "b4"],
    ),
    (
        "async_await",
        async_await,
        &[
            "sync:start",
            "async:before",
            "sync:end",
            "async:after 1",
            "then",
            "async:done 2",
        ],
    ),
    (
        "interval_countdown",
        interval_countdown,
        &["tick 1", "tick 2", "tick 3"],
    ),
    (
        "timer_mix",
        timer_mix,
        &["t0a", "t0b", "imm", "t50", "t100"],
    ),
];
