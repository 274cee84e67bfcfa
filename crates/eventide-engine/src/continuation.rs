//! Async functions as continuation-passing state.
//!
//! An [`AsyncFn`] is an ordered list of [`Step`]s. The first step runs
//! synchronously when the function is spawned. Each step ends by yielding
//! [`Yield::Await`], [`Yield::Return`] or [`Yield::Throw`]. On `Await`, the
//! remaining steps are parked in the [`ContinuationStore`] and a
//! `Reaction::Resume` is attached to the awaited promise, so the next
//! step always runs from a microtask, never synchronously.

use std::collections::VecDeque;
use std::fmt;

use indexmap::IndexMap;
use tracing::trace;

use eventide_core::{Completion, ContinuationId, PromiseId, Value};

use crate::promise::Reaction;
use crate::runtime::Runtime;
use crate::scope::Scope;

/// What a step of an async function does when it finishes.
#[derive(Clone, Debug, PartialEq)]
pub enum Yield {
    /// Suspend until the value settles. Non-promise values are wrapped in
    /// an already-fulfilled promise.
    Await(Value),
    /// Finish, resolving the function's result promise.
    Return(Value),
    /// Finish, rejecting the function's result promise.
    Throw(Value),
}

/// One segment of an async function body between awaits.
///
/// Receives the completion of the previous await: `Ok(value)` on
/// fulfillment and `Err(reason)` on rejection. The first step receives
/// `Ok(Value::Undefined)`.
pub type Step = Box<dyn FnOnce(&mut Scope<'_>, Completion) -> Yield>;

/// Builder for an async function body.
///
/// ```ignore
/// let body = AsyncFn::new()
///     .step(|s, _| { s.emit("s1"); Yield::Await(Value::Int(1)) })
///     .step(|s, v| { s.emit("s2"); Yield::Return(v.unwrap_or_default()) });
/// let result = scope.spawn_async(body);
/// ```
#[derive(Default)]
pub struct AsyncFn {
    steps: VecDeque<Step>,
}

impl AsyncFn {
    /// An empty body. Spawning it resolves to `undefined`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step.
    pub fn step<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut Scope<'_>, Completion) -> Yield + 'static,
    {
        self.steps.push_back(Box::new(f));
        self
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the body has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Debug for AsyncFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncFn")
            .field("steps", &self.steps.len())
            .finish()
    }
}

/// A suspended async call: remaining steps, the promise being awaited,
/// and the promise the call will settle.
struct Continuation {
    steps: VecDeque<Step>,
    awaiting: PromiseId,
    result: PromiseId,
}

/// Suspended async calls keyed by [`ContinuationId`].
#[derive(Default)]
pub struct ContinuationStore {
    parked: IndexMap<ContinuationId, Continuation>,
    next_id: u64,
}

impl ContinuationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn park(&mut self, continuation: Continuation) -> ContinuationId {
        let id = ContinuationId(self.next_id);
        self.next_id += 1;
        self.parked.insert(id, continuation);
        id
    }

    fn take(&mut self, id: ContinuationId) -> Option<Continuation> {
        self.parked.swap_remove(&id)
    }

    /// The promise a suspended call is waiting on.
    pub fn awaiting(&self, id: ContinuationId) -> Option<PromiseId> {
        self.parked.get(&id).map(|c| c.awaiting)
    }

    /// Number of suspended calls.
    pub fn len(&self) -> usize {
        self.parked.len()
    }

    /// Whether no call is suspended.
    pub fn is_empty(&self) -> bool {
        self.parked.is_empty()
    }
}

impl Runtime {
    /// Start an async call; runs its first step now and returns the
    /// call's result promise.
    pub(crate) fn start_async(&mut self, body: AsyncFn) -> PromiseId {
        let result = self.create_promise();
        self.drive(body.steps, result, Ok(Value::Undefined));
        result
    }

    /// Resume a parked call with the completion of its await.
    pub(crate) fn resume_async(&mut self, id: ContinuationId, input: Completion) {
        let Some(cont) = self.continuations.take(id) else {
            return;
        };
        trace!(continuation = %id, awaited = %cont.awaiting, "async resume");
        self.drive(cont.steps, cont.result, input);
    }

    /// Run steps until the call suspends or finishes.
    fn drive(&mut self, mut steps: VecDeque<Step>, result: PromiseId, input: Completion) {
        let Some(step) = steps.pop_front() else {
            self.complete(result, input);
            return;
        };
        let yielded = step(&mut Scope::new(self), input);
        match yielded {
            Yield::Return(v) => {
                self.resolve(result, v);
            }
            Yield::Throw(e) => {
                self.reject(result, e);
            }
            Yield::Await(v) => {
                let awaiting = self.promise_resolve(v);
                let id = self.continuations.park(Continuation {
                    steps,
                    awaiting,
                    result,
                });
                if let Err(e) =
                    self.promises
                        .register(awaiting, Reaction::Resume(id), &mut self.microtasks)
                {
                    self.continuations.take(id);
                    self.reject(result, e.into());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_counts_steps() {
        let body = AsyncFn::new()
            .step(|_, _| Yield::Await(Value::Int(1)))
            .step(|_, _| Yield::Return(Value::Undefined));
        assert_eq!(body.len(), 2);
        assert!(!body.is_empty());
        assert!(AsyncFn::new().is_empty());
    }

    #[test]
    fn store_park_and_take() {
        let mut store = ContinuationStore::new();
        let id = store.park(Continuation {
            steps: VecDeque::new(),
            awaiting: PromiseId(3),
            result: PromiseId(4),
        });
        assert_eq!(store.awaiting(id), Some(PromiseId(3)));
        assert_eq!(store.len(), 1);
        let cont = store.take(id).unwrap();
        assert_eq!(cont.result, PromiseId(4));
        assert!(store.take(id).is_none());
        assert!(store.is_empty());
    }
}
