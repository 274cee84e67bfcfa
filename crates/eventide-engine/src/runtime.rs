//! The loop's owned state and the dispatch of individual callbacks.
//!
//! [`Runtime`] holds both queues, the clock, and every store. It is the
//! only mutable state in the system and is reached by scripts solely
//! through [`Scope`], so exactly one callback body runs at any instant.

use tracing::{debug, trace, warn};

use eventide_core::{Trace, Value};

use crate::clock::Clock;
use crate::combinator::CombinatorStore;
use crate::config::LoopConfig;
use crate::continuation::ContinuationStore;
use crate::event::{CallbackSource, EventLog, LoopEvent, UncaughtError, UnhandledRejection};
use crate::macrotask::{MacrotaskQueue, ReadyTask, TaskCallback, TaskKind};
use crate::metrics::RunMetrics;
use crate::microtask::{DrainOutcome, Job, Microtask, MicrotaskQueue};
use crate::promise::PromiseStore;
use crate::scope::Scope;

pub(crate) struct Runtime {
    pub(crate) config: LoopConfig,
    pub(crate) clock: Clock,
    pub(crate) macrotasks: MacrotaskQueue,
    pub(crate) microtasks: MicrotaskQueue,
    pub(crate) promises: PromiseStore,
    pub(crate) combinators: CombinatorStore,
    pub(crate) continuations: ContinuationStore,
    pub(crate) trace: Trace,
    pub(crate) events: EventLog,
    pub(crate) metrics: RunMetrics,
    pub(crate) uncaught: Vec<UncaughtError>,
    pub(crate) unhandled: Vec<UnhandledRejection>,
}

impl Runtime {
    pub(crate) fn new(config: LoopConfig) -> Self {
        Self {
            clock: Clock::new(),
            macrotasks: MacrotaskQueue::new(config.immediate_ordering),
            microtasks: MicrotaskQueue::new(),
            promises: PromiseStore::new(),
            combinators: CombinatorStore::new(),
            continuations: ContinuationStore::new(),
            trace: Trace::new(),
            events: EventLog::new(config.record_events),
            metrics: RunMetrics::default(),
            uncaught: Vec::new(),
            unhandled: Vec::new(),
            config,
        }
    }

    /// Record a throw that escaped a callback. Never fatal.
    pub(crate) fn report_uncaught(&mut self, source: CallbackSource, value: Value) {
        let at = self.clock.now();
        warn!(%source, error = %value, %at, "uncaught error in callback");
        let error = UncaughtError { source, value, at };
        self.metrics.uncaught_errors += 1;
        self.events.record(LoopEvent::UncaughtError(error.clone()));
        self.uncaught.push(error);
    }

    /// Report rejected promises that have no handler, once each.
    pub(crate) fn collect_unhandled(&mut self) {
        let at = self.clock.now();
        for (promise, reason) in self.promises.take_unhandled() {
            warn!(%promise, %reason, %at, "unhandled promise rejection");
            let rejection = UnhandledRejection {
                promise,
                reason,
                at,
            };
            self.metrics.unhandled_rejections += 1;
            self.events
                .record(LoopEvent::UnhandledRejection(rejection.clone()));
            self.unhandled.push(rejection);
        }
    }

    /// Run queued microtasks FIFO until the queue is empty, including any
    /// enqueued during this drain, or until the per-drain limit is hit.
    pub(crate) fn drain_microtasks(&mut self) -> DrainOutcome {
        let limit = self.config.max_microtasks_per_drain;
        let mut ran = 0u64;
        while !self.microtasks.is_empty() {
            if limit.is_some_and(|max| ran >= max) {
                warn!(ran, pending = self.microtasks.len(), "microtask drain limit exceeded");
                return DrainOutcome::LimitExceeded { ran };
            }
            let Some(task) = self.microtasks.pop() else {
                break;
            };
            self.run_microtask(task);
            ran += 1;
        }
        DrainOutcome::Drained { ran }
    }

    fn run_microtask(&mut self, task: Microtask) {
        let kind = task.kind();
        let Microtask { id, job } = task;
        trace!(microtask = %id, %kind, "dispatch microtask");
        self.metrics.microtasks_run += 1;
        self.events.record(LoopEvent::MicrotaskRan { id, kind });
        match job {
            Job::Callback(callback) => {
                if let Err(e) = callback(&mut Scope::new(self)) {
                    self.report_uncaught(CallbackSource::Microtask(id, kind), e);
                }
            }
            Job::Reaction {
                reaction,
                settlement,
            } => self.run_reaction(reaction, settlement),
            Job::ResolveThenable { target, thenable } => self.adopt_thenable(target, thenable),
        }
    }

    /// Jump the clock to the task's due time and run its callback. An
    /// interval is re-armed afterwards unless it cancelled itself.
    pub(crate) fn run_macrotask(&mut self, task: ReadyTask) {
        let ReadyTask {
            id,
            kind,
            due,
            callback,
        } = task;
        let from = self.clock.now();
        if self.clock.advance_to(due) {
            debug!(%from, to = %due, "clock advanced");
            self.events.record(LoopEvent::ClockAdvanced { from, to: due });
        }
        let at = self.clock.now();
        trace!(task = %id, %kind, %at, "dispatch macrotask");
        self.metrics.macrotasks_run += 1;
        self.events.record(LoopEvent::MacrotaskRan { id, kind, at });
        let source = CallbackSource::Macrotask(id, kind);
        match callback {
            TaskCallback::Once(f) => {
                if let Err(e) = f(&mut Scope::new(self)) {
                    self.report_uncaught(source, e);
                }
            }
            TaskCallback::Repeat(mut f) => {
                self.metrics.interval_firings += 1;
                if let Err(e) = f(&mut Scope::new(self)) {
                    self.report_uncaught(source, e);
                }
                debug_assert_eq!(kind, TaskKind::Interval);
                match self.macrotasks.rearm(id, f, at) {
                    Some(next) => trace!(task = %id, %next, "interval re-armed"),
                    None => trace!(task = %id, "interval cancelled during firing"),
                }
            }
        }
    }

    /// Metrics with the queue-derived counters filled in.
    pub(crate) fn metrics_snapshot(&self) -> RunMetrics {
        RunMetrics {
            tasks_cancelled: self.macrotasks.cancelled_count(),
            peak_microtask_depth: self.microtasks.peak_depth(),
            clock_advances: self.clock.advances(),
            ..self.metrics.clone()
        }
    }
}
