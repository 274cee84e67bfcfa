//! The run loop.
//!
//! [`EventLoop`] owns the runtime and drives it through the cooperative
//! cycle: run the synchronous entry script, drain microtasks, then
//! repeatedly pop the next due macrotask (jumping the virtual clock to
//! it), run it, and drain microtasks again. It stops when nothing is
//! pending or a configured limit is reached.

use std::fmt;

use tracing::debug;

use eventide_core::{PromiseError, PromiseId, TaskId, Trace, VirtualTime};

use crate::config::{ConfigError, LoopConfig};
use crate::event::{CallbackSource, HaltReason, LoopEvent, UncaughtError, UnhandledRejection};
use crate::macrotask::{TaskKind, TaskResult};
use crate::metrics::RunMetrics;
use crate::microtask::DrainOutcome;
use crate::promise::PromiseState;
use crate::runtime::Runtime;
use crate::scope::Scope;

/// Where the loop is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopPhase {
    /// No script has run yet.
    Idle,
    /// The script ran; macrotasks may be pending.
    Ready,
    /// [`EventLoop::run`] returned, or a drain hit the microtask limit.
    Halted(HaltReason),
}

/// The result of one [`EventLoop::turn`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TurnOutcome {
    /// The macrotask that ran.
    pub task: TaskId,
    /// Its kind.
    pub kind: TaskKind,
    /// The virtual time it ran at.
    pub at: VirtualTime,
    /// The microtask drain that followed it.
    pub drain: DrainOutcome,
}

/// Everything observable about a finished run.
#[derive(Clone, Debug)]
pub struct RunReport {
    /// The emitted output trace.
    pub trace: Trace,
    /// Why the run stopped.
    pub halt: HaltReason,
    /// Rejections that never had a handler attached.
    pub unhandled_rejections: Vec<UnhandledRejection>,
    /// Throws that escaped callback bodies.
    pub uncaught_errors: Vec<UncaughtError>,
    /// Scheduling counters.
    pub metrics: RunMetrics,
    /// Virtual time when the run stopped.
    pub final_time: VirtualTime,
}

impl RunReport {
    /// The trace rendered as display strings.
    pub fn labels(&self) -> Vec<String> {
        self.trace.labels()
    }

    /// Whether the loop ran out of work (as opposed to hitting a limit).
    pub fn is_exhausted(&self) -> bool {
        self.halt == HaltReason::Exhausted
    }
}

/// A deterministic single-threaded event loop over a virtual clock.
///
/// # Example
///
/// ```
/// use eventide_engine::{EventLoop, LoopConfig};
/// use eventide_core::Value;
///
/// let mut el = EventLoop::new(LoopConfig::default()).unwrap();
/// el.run_script(|s| {
///     s.emit("Start");
///     s.set_timeout(|s| { s.emit("Timeout"); Ok(()) }, 0);
///     let p = s.promise_resolve(Value::Undefined);
///     s.then(p, |s, _| { s.emit("Promise"); Ok(Value::Undefined) })?;
///     s.emit("End");
///     Ok(())
/// });
/// let report = el.run();
/// assert_eq!(report.labels(), ["Start", "End", "Promise", "Timeout"]);
/// ```
pub struct EventLoop {
    rt: Runtime,
    phase: LoopPhase,
    halted_on_drain: bool,
}

impl EventLoop {
    /// Create a loop after validating `config`.
    pub fn new(config: LoopConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            rt: Runtime::new(config),
            phase: LoopPhase::Idle,
            halted_on_drain: false,
        })
    }

    /// Run the synchronous entry script, then drain microtasks.
    ///
    /// A throw from the script is recorded as an uncaught error; anything
    /// the script scheduled before throwing stays scheduled.
    pub fn run_script<F>(&mut self, script: F) -> DrainOutcome
    where
        F: FnOnce(&mut Scope<'_>) -> TaskResult,
    {
        debug!(at = %self.rt.clock.now(), "running script");
        self.rt.events.record(LoopEvent::ScriptStarted);
        if let Err(e) = script(&mut Scope::new(&mut self.rt)) {
            self.rt.report_uncaught(CallbackSource::Script, e);
        }
        if self.phase == LoopPhase::Idle {
            self.phase = LoopPhase::Ready;
        }
        self.drain_microtasks()
    }

    /// Drain the microtask queue to exhaustion (or the per-drain limit).
    pub fn drain_microtasks(&mut self) -> DrainOutcome {
        let outcome = self.rt.drain_microtasks();
        if let DrainOutcome::LimitExceeded { .. } = outcome {
            self.halted_on_drain = true;
            self.phase = LoopPhase::Halted(HaltReason::MicrotaskLimit);
        }
        outcome
    }

    /// Run the next due macrotask and the microtask drain after it.
    ///
    /// Microtasks queued from outside a callback (through
    /// [`scope`](Self::scope)) are drained first, so no macrotask starts
    /// while the microtask queue is non-empty.
    ///
    /// Returns `None` when nothing is pending, the next task lies beyond
    /// the time limit, or the loop halted on the microtask limit.
    /// Ignores `max_macrotasks`; that bound applies to [`run`](Self::run).
    pub fn turn(&mut self) -> Option<TurnOutcome> {
        if self.halted_on_drain {
            return None;
        }
        if !self.rt.microtasks.is_empty() {
            if let DrainOutcome::LimitExceeded { .. } = self.drain_microtasks() {
                return None;
            }
        }
        let (_, due) = self.rt.macrotasks.next_due()?;
        if self.rt.config.time_limit.is_some_and(|limit| due > limit) {
            return None;
        }
        let task = self.rt.macrotasks.pop_next()?;
        let (id, kind) = (task.id, task.kind);
        self.rt.run_macrotask(task);
        let drain = self.drain_microtasks();
        Some(TurnOutcome {
            task: id,
            kind,
            at: self.rt.clock.now(),
            drain,
        })
    }

    /// Run until nothing is pending or a limit is reached, then report.
    ///
    /// Unhandled rejections are collected when the run stops. With no
    /// limits configured, a never-cancelled interval keeps this running
    /// forever.
    pub fn run(&mut self) -> RunReport {
        let halt = self.run_until_halt();
        self.rt.collect_unhandled();
        let at = self.rt.clock.now();
        debug!(reason = %halt, %at, "loop halted");
        self.rt.events.record(LoopEvent::Halted { reason: halt, at });
        self.phase = LoopPhase::Halted(halt);
        RunReport {
            trace: self.rt.trace.clone(),
            halt,
            unhandled_rejections: self.rt.unhandled.clone(),
            uncaught_errors: self.rt.uncaught.clone(),
            metrics: self.rt.metrics_snapshot(),
            final_time: at,
        }
    }

    fn run_until_halt(&mut self) -> HaltReason {
        loop {
            if self.halted_on_drain {
                return HaltReason::MicrotaskLimit;
            }
            if !self.rt.microtasks.is_empty() {
                self.drain_microtasks();
                continue;
            }
            let Some((_, due)) = self.rt.macrotasks.next_due() else {
                return HaltReason::Exhausted;
            };
            if let Some(max) = self.rt.config.max_macrotasks {
                if self.rt.metrics.macrotasks_run >= max {
                    return HaltReason::MacrotaskLimit;
                }
            }
            if self.rt.config.time_limit.is_some_and(|limit| due > limit) {
                return HaltReason::TimeLimit;
            }
            if self.turn().is_none() {
                return HaltReason::Exhausted;
            }
        }
    }

    /// A scope for scheduling from outside any callback.
    ///
    /// Work scheduled here runs on the next [`turn`](Self::turn),
    /// [`drain_microtasks`](Self::drain_microtasks), or [`run`](Self::run).
    pub fn scope(&mut self) -> Scope<'_> {
        Scope::new(&mut self.rt)
    }

    /// The output trace so far.
    pub fn trace(&self) -> &Trace {
        &self.rt.trace
    }

    /// Current virtual time.
    pub fn now(&self) -> VirtualTime {
        self.rt.clock.now()
    }

    /// Counters so far.
    pub fn metrics(&self) -> RunMetrics {
        self.rt.metrics_snapshot()
    }

    /// The loop event log (empty unless `record_events` is set).
    pub fn events(&self) -> &[LoopEvent] {
        self.rt.events.events()
    }

    /// Lifecycle phase.
    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    /// The active configuration.
    pub fn config(&self) -> &LoopConfig {
        &self.rt.config
    }

    /// Number of pending macrotasks.
    pub fn pending_macrotasks(&self) -> usize {
        self.rt.macrotasks.len()
    }

    /// Number of queued microtasks.
    pub fn pending_microtasks(&self) -> usize {
        self.rt.microtasks.len()
    }

    /// The state of a promise.
    pub fn promise_state(&self, promise: PromiseId) -> Result<PromiseState, PromiseError> {
        self.rt.promises.state(promise).cloned()
    }

    /// Throws that escaped callbacks so far.
    pub fn uncaught_errors(&self) -> &[UncaughtError] {
        &self.rt.uncaught
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("now", &self.rt.clock.now())
            .field("phase", &self.phase)
            .field("macrotasks", &self.rt.macrotasks)
            .field("microtasks", &self.rt.microtasks)
            .finish()
    }
}

/// Build a loop, run `script`, and run to halt.
pub fn run_to_completion<F>(config: LoopConfig, script: F) -> Result<RunReport, ConfigError>
where
    F: FnOnce(&mut Scope<'_>) -> TaskResult,
{
    let mut event_loop = EventLoop::new(config)?;
    event_loop.run_script(script);
    Ok(event_loop.run())
}
