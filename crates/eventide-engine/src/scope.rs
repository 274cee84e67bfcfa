//! The script-facing API.
//!
//! Every callback receives a [`Scope`]: a short-lived handle onto the
//! loop through which it can emit to the trace, schedule timers and
//! microtasks, and create and chain promises. A `Scope` cannot outlive
//! the callback it was handed to.
//!
//! Promise chaining methods return `Result<_, PromiseError>` for invalid
//! handles. Since [`PromiseError`] converts into a [`Value`], callbacks
//! can propagate such misuse with `?` as a thrown error.

use tracing::trace;

use eventide_core::{
    Completion, MicrotaskId, PromiseError, PromiseId, Settlement, TaskId, Value, VirtualTime,
};

use crate::combinator::CombinatorKind;
use crate::continuation::AsyncFn;
use crate::macrotask::{TaskCallback, TaskKind, TaskResult};
use crate::microtask::Job;
use crate::promise::{Handler, PromiseState};
use crate::runtime::Runtime;

/// Script-side access to the running loop.
pub struct Scope<'rt> {
    rt: &'rt mut Runtime,
}

impl<'rt> Scope<'rt> {
    pub(crate) fn new(rt: &'rt mut Runtime) -> Self {
        Self { rt }
    }

    // ── Observation ────────────────────────────────────────────

    /// Append a value to the output trace.
    pub fn emit(&mut self, value: impl Into<Value>) {
        let value = value.into();
        let now = self.rt.clock.now();
        trace!(%now, %value, "emit");
        self.rt.trace.push(now, value);
    }

    /// Current virtual time.
    pub fn now(&self) -> VirtualTime {
        self.rt.clock.now()
    }

    // ── Macrotasks ─────────────────────────────────────────────

    fn schedule(
        &mut self,
        kind: TaskKind,
        delay_ms: u64,
        period: Option<u64>,
        callback: TaskCallback,
    ) -> TaskId {
        let now = self.rt.clock.now();
        let id = self
            .rt
            .macrotasks
            .schedule(now, kind, delay_ms, period, callback);
        trace!(task = %id, %kind, delay_ms, "scheduled");
        id
    }

    fn cancel(&mut self, id: TaskId) -> bool {
        let cancelled = self.rt.macrotasks.cancel(id);
        if cancelled {
            trace!(task = %id, "cancelled");
        }
        cancelled
    }

    /// `setTimeout(callback, delay_ms)`.
    pub fn set_timeout<F>(&mut self, callback: F, delay_ms: u64) -> TaskId
    where
        F: FnOnce(&mut Scope<'_>) -> TaskResult + 'static,
    {
        self.schedule(
            TaskKind::Timeout,
            delay_ms,
            None,
            TaskCallback::Once(Box::new(callback)),
        )
    }

    /// `clearTimeout(id)`. Unknown or already-fired ids are a no-op.
    pub fn clear_timeout(&mut self, id: TaskId) -> bool {
        self.cancel(id)
    }

    /// `setInterval(callback, period_ms)`. The first firing is one period
    /// from now; periods below the configured minimum are clamped.
    pub fn set_interval<F>(&mut self, callback: F, period_ms: u64) -> TaskId
    where
        F: FnMut(&mut Scope<'_>) -> TaskResult + 'static,
    {
        let period = period_ms.max(self.rt.config.min_interval_period);
        self.schedule(
            TaskKind::Interval,
            period,
            Some(period),
            TaskCallback::Repeat(Box::new(callback)),
        )
    }

    /// `clearInterval(id)`. Safe to call from the interval's own callback.
    pub fn clear_interval(&mut self, id: TaskId) -> bool {
        self.cancel(id)
    }

    /// `setImmediate(callback)`: a macrotask due at the current instant.
    pub fn set_immediate<F>(&mut self, callback: F) -> TaskId
    where
        F: FnOnce(&mut Scope<'_>) -> TaskResult + 'static,
    {
        self.schedule(
            TaskKind::Immediate,
            0,
            None,
            TaskCallback::Once(Box::new(callback)),
        )
    }

    /// `clearImmediate(id)`.
    pub fn clear_immediate(&mut self, id: TaskId) -> bool {
        self.cancel(id)
    }

    // ── Microtasks ─────────────────────────────────────────────

    /// `queueMicrotask(callback)`.
    pub fn queue_microtask<F>(&mut self, callback: F) -> MicrotaskId
    where
        F: FnOnce(&mut Scope<'_>) -> TaskResult + 'static,
    {
        self.rt.microtasks.enqueue(Job::Callback(Box::new(callback)))
    }

    // ── Promise construction ───────────────────────────────────

    /// `Promise.resolve(value)`. A promise value is returned unchanged.
    pub fn promise_resolve(&mut self, value: impl Into<Value>) -> PromiseId {
        self.rt.promise_resolve(value.into())
    }

    /// `Promise.reject(reason)`.
    pub fn promise_reject(&mut self, reason: impl Into<Value>) -> PromiseId {
        self.rt
            .create_settled_promise(Settlement::Rejected(reason.into()))
    }

    /// A pending promise, to be settled later with
    /// [`resolve_promise`](Self::resolve_promise) or
    /// [`reject_promise`](Self::reject_promise).
    pub fn pending_promise(&mut self) -> PromiseId {
        self.rt.create_promise()
    }

    /// `new Promise(executor)`. The executor runs synchronously and
    /// receives the new promise; a throw from it rejects the promise
    /// unless it was already resolved.
    pub fn new_promise<F>(&mut self, executor: F) -> PromiseId
    where
        F: FnOnce(&mut Scope<'_>, PromiseId) -> TaskResult,
    {
        let id = self.rt.create_promise();
        if let Err(e) = executor(self, id) {
            self.rt.reject(id, e);
        }
        id
    }

    /// Resolve a promise. Resolving with another promise adopts its state
    /// one microtask turn later. Returns `false` if the promise was
    /// already resolved or the handle is invalid.
    pub fn resolve_promise(&mut self, promise: PromiseId, value: impl Into<Value>) -> bool {
        self.rt.resolve(promise, value.into())
    }

    /// Reject a promise. Returns `false` if it was already resolved or the
    /// handle is invalid.
    pub fn reject_promise(&mut self, promise: PromiseId, reason: impl Into<Value>) -> bool {
        self.rt.reject(promise, reason.into())
    }

    /// The current state of a promise.
    pub fn promise_state(&self, promise: PromiseId) -> Result<PromiseState, PromiseError> {
        self.rt.promises.state(promise).cloned()
    }

    // ── Chaining ───────────────────────────────────────────────

    /// `.then(on_fulfilled)`. Rejections pass through to the returned
    /// promise.
    pub fn then<F>(
        &mut self,
        promise: PromiseId,
        on_fulfilled: F,
    ) -> Result<PromiseId, PromiseError>
    where
        F: FnOnce(&mut Scope<'_>, Value) -> Completion + 'static,
    {
        self.rt.then(promise, Some(Box::new(on_fulfilled)), None)
    }

    /// `.then(on_fulfilled, on_rejected)`.
    pub fn then_with<F, R>(
        &mut self,
        promise: PromiseId,
        on_fulfilled: F,
        on_rejected: R,
    ) -> Result<PromiseId, PromiseError>
    where
        F: FnOnce(&mut Scope<'_>, Value) -> Completion + 'static,
        R: FnOnce(&mut Scope<'_>, Value) -> Completion + 'static,
    {
        self.rt.then(
            promise,
            Some(Box::new(on_fulfilled)),
            Some(Box::new(on_rejected)),
        )
    }

    /// `.then` with either handler optional.
    pub fn then_boxed(
        &mut self,
        promise: PromiseId,
        on_fulfilled: Option<Handler>,
        on_rejected: Option<Handler>,
    ) -> Result<PromiseId, PromiseError> {
        self.rt.then(promise, on_fulfilled, on_rejected)
    }

    /// `.catch(on_rejected)`. Fulfillments pass through.
    pub fn catch<R>(
        &mut self,
        promise: PromiseId,
        on_rejected: R,
    ) -> Result<PromiseId, PromiseError>
    where
        R: FnOnce(&mut Scope<'_>, Value) -> Completion + 'static,
    {
        self.rt.then(promise, None, Some(Box::new(on_rejected)))
    }

    /// `.finally(on_finally)`. The handler sees no value; the original
    /// outcome is forwarded unless the handler throws or returns a
    /// promise that rejects.
    pub fn finally<F>(
        &mut self,
        promise: PromiseId,
        on_finally: F,
    ) -> Result<PromiseId, PromiseError>
    where
        F: FnOnce(&mut Scope<'_>) -> Completion + 'static,
    {
        self.rt.finally(promise, Box::new(on_finally))
    }

    // ── Combinators ────────────────────────────────────────────

    /// `Promise.all(inputs)`.
    pub fn all<I>(&mut self, inputs: I) -> PromiseId
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.combine(CombinatorKind::All, inputs)
    }

    /// `Promise.allSettled(inputs)`.
    pub fn all_settled<I>(&mut self, inputs: I) -> PromiseId
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.combine(CombinatorKind::AllSettled, inputs)
    }

    /// `Promise.race(inputs)`. An empty race never settles.
    pub fn race<I>(&mut self, inputs: I) -> PromiseId
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.combine(CombinatorKind::Race, inputs)
    }

    /// `Promise.any(inputs)`.
    pub fn any<I>(&mut self, inputs: I) -> PromiseId
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.combine(CombinatorKind::Any, inputs)
    }

    fn combine<I>(&mut self, kind: CombinatorKind, inputs: I) -> PromiseId
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let inputs = inputs.into_iter().map(Into::into).collect();
        self.rt.combine(kind, inputs)
    }

    // ── Async functions ────────────────────────────────────────

    /// Call an async function. Its first step runs now; the returned
    /// promise settles when the body returns or throws.
    pub fn spawn_async(&mut self, body: AsyncFn) -> PromiseId {
        self.rt.start_async(body)
    }
}

impl std::fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("now", &self.rt.clock.now())
            .finish()
    }
}
