//! Promise state machine and reaction scheduling.
//!
//! Each promise is an explicit tagged state with an owned reaction list.
//! Settlement is one-way (`Pending → Fulfilled | Rejected`) and never runs
//! a reaction directly: every reaction, whether registered before or after
//! settlement, becomes its own microtask, in registration order.
//!
//! Resolution is separate from settlement. Resolving with a non-promise
//! value settles at once; resolving with a promise (a thenable) locks the
//! target and queues an adoption job, so the target settles no earlier
//! than the next microtask turn.

use std::collections::BTreeSet;
use std::fmt;

use smallvec::SmallVec;
use tracing::trace;

use eventide_core::{
    CombinatorId, Completion, ContinuationId, PromiseError, PromiseId, Settlement, Value,
};

use crate::config::ThenableAdoption;
use crate::microtask::{Job, MicrotaskKind, MicrotaskQueue};
use crate::runtime::Runtime;
use crate::scope::Scope;

/// A `.then`/`.catch` handler: receives the fulfillment value or rejection
/// reason, and its completion resolves or rejects the derived promise.
pub type Handler = Box<dyn FnOnce(&mut Scope<'_>, Value) -> Completion>;

/// A `.finally` handler: receives nothing.
pub type FinallyHandler = Box<dyn FnOnce(&mut Scope<'_>) -> Completion>;

// ── PromiseState ───────────────────────────────────────────────────

/// The state of a promise.
#[derive(Clone, Debug, PartialEq)]
pub enum PromiseState {
    /// Not yet settled.
    Pending,
    /// Fulfilled with a value.
    Fulfilled(Value),
    /// Rejected with a reason.
    Rejected(Value),
}

impl PromiseState {
    /// Whether the promise has left `Pending`.
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether the promise is fulfilled.
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Self::Fulfilled(_))
    }

    /// Whether the promise is rejected.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// The settlement, if settled.
    pub fn settlement(&self) -> Option<Settlement> {
        match self {
            Self::Pending => None,
            Self::Fulfilled(v) => Some(Settlement::Fulfilled(v.clone())),
            Self::Rejected(v) => Some(Settlement::Rejected(v.clone())),
        }
    }
}

impl From<Settlement> for PromiseState {
    fn from(s: Settlement) -> Self {
        match s {
            Settlement::Fulfilled(v) => Self::Fulfilled(v),
            Settlement::Rejected(v) => Self::Rejected(v),
        }
    }
}

impl fmt::Display for PromiseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Fulfilled(v) => write!(f, "fulfilled({v})"),
            Self::Rejected(v) => write!(f, "rejected({v})"),
        }
    }
}

// ── Reaction ───────────────────────────────────────────────────────

/// Work attached to a promise, run as a microtask once it settles.
pub(crate) enum Reaction {
    /// `.then(onFulfilled, onRejected)`; a missing handler passes the
    /// settlement through to `derived` unchanged.
    Then {
        on_fulfilled: Option<Handler>,
        on_rejected: Option<Handler>,
        derived: PromiseId,
    },
    /// `.finally(f)`.
    Finally {
        on_finally: FinallyHandler,
        derived: PromiseId,
    },
    /// Waits on the promise a finally handler returned, then forwards the
    /// original settlement (or this promise's rejection) to `derived`.
    FinallyForward {
        original: Settlement,
        derived: PromiseId,
    },
    /// Resume a suspended async function.
    Resume(ContinuationId),
    /// Feed input `index` of a combinator.
    Combine {
        combinator: CombinatorId,
        index: usize,
    },
    /// Copy this promise's settlement onto `target` (thenable adoption).
    Adopt { target: PromiseId },
}

impl Reaction {
    pub(crate) fn kind(&self) -> MicrotaskKind {
        match self {
            Self::Then { .. } | Self::Finally { .. } | Self::FinallyForward { .. } => {
                MicrotaskKind::PromiseReaction
            }
            Self::Resume(_) => MicrotaskKind::AsyncResume,
            Self::Combine { .. } => MicrotaskKind::CombinatorStep,
            Self::Adopt { .. } => MicrotaskKind::ResolveThenable,
        }
    }
}

// ── PromiseStore ───────────────────────────────────────────────────

struct PromiseRecord {
    state: PromiseState,
    reactions: SmallVec<[Reaction; 2]>,
    /// A reaction has been attached at some point.
    handled: bool,
    /// A resolving function has been called (possibly with a still-pending
    /// thenable); further resolve/reject calls are ignored.
    locked: bool,
}

impl PromiseRecord {
    fn new(state: PromiseState) -> Self {
        let locked = state.is_settled();
        Self {
            state,
            reactions: SmallVec::new(),
            handled: false,
            locked,
        }
    }
}

/// Arena of promise records indexed by [`PromiseId`].
///
/// Records live as long as the store: handles are plain values a script
/// may keep and chain on at any later point.
#[derive(Default)]
pub struct PromiseStore {
    records: Vec<PromiseRecord>,
    /// Rejected, never handled, not yet reported.
    unhandled: BTreeSet<PromiseId>,
}

impl PromiseStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of promises ever created.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no promise was created.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The state of a promise.
    pub fn state(&self, id: PromiseId) -> Result<&PromiseState, PromiseError> {
        self.record(id).map(|r| &r.state)
    }

    /// Whether a reaction has ever been attached to `id`.
    pub fn is_handled(&self, id: PromiseId) -> Result<bool, PromiseError> {
        self.record(id).map(|r| r.handled)
    }

    /// Number of reactions waiting on a pending promise.
    pub fn pending_reactions(&self, id: PromiseId) -> Result<usize, PromiseError> {
        self.record(id).map(|r| r.reactions.len())
    }

    pub(crate) fn create(&mut self) -> PromiseId {
        self.push(PromiseState::Pending)
    }

    pub(crate) fn create_settled(&mut self, settlement: Settlement) -> PromiseId {
        let rejected = settlement.is_rejected();
        let id = self.push(settlement.into());
        if rejected {
            self.unhandled.insert(id);
        }
        id
    }

    fn push(&mut self, state: PromiseState) -> PromiseId {
        let id = PromiseId(self.records.len() as u32);
        self.records.push(PromiseRecord::new(state));
        id
    }

    fn record(&self, id: PromiseId) -> Result<&PromiseRecord, PromiseError> {
        self.records
            .get(id.0 as usize)
            .ok_or(PromiseError::InvalidHandle { promise: id })
    }

    fn record_mut(&mut self, id: PromiseId) -> Result<&mut PromiseRecord, PromiseError> {
        self.records
            .get_mut(id.0 as usize)
            .ok_or(PromiseError::InvalidHandle { promise: id })
    }

    /// Claim the right to resolve `id`. Fails once any resolving function
    /// has run, even if the promise is still pending on a thenable.
    pub(crate) fn lock(&mut self, id: PromiseId) -> Result<(), PromiseError> {
        let record = self.record_mut(id)?;
        if record.locked {
            return Err(PromiseError::AlreadySettled { promise: id });
        }
        record.locked = true;
        Ok(())
    }

    pub(crate) fn mark_handled(&mut self, id: PromiseId) -> Result<(), PromiseError> {
        self.record_mut(id)?.handled = true;
        self.unhandled.remove(&id);
        Ok(())
    }

    /// Transition `id` out of `Pending` and queue every registered reaction
    /// as its own microtask, in registration order.
    pub(crate) fn settle(
        &mut self,
        id: PromiseId,
        settlement: Settlement,
        queue: &mut MicrotaskQueue,
    ) -> Result<(), PromiseError> {
        let record = self.record_mut(id)?;
        if record.state.is_settled() {
            return Err(PromiseError::AlreadySettled { promise: id });
        }
        record.locked = true;
        record.state = settlement.clone().into();
        if settlement.is_rejected() && !record.handled {
            self.unhandled.insert(id);
        }
        let record = self.record_mut(id)?;
        let reactions = std::mem::take(&mut record.reactions);
        trace!(promise = %id, %settlement, reactions = reactions.len(), "promise settled");
        for reaction in reactions {
            queue.enqueue(Job::Reaction {
                reaction,
                settlement: settlement.clone(),
            });
        }
        Ok(())
    }

    /// Attach a reaction. A pending promise stores it; a settled promise
    /// queues it as a microtask right away (never runs it synchronously).
    pub(crate) fn register(
        &mut self,
        id: PromiseId,
        reaction: Reaction,
        queue: &mut MicrotaskQueue,
    ) -> Result<(), PromiseError> {
        self.unhandled.remove(&id);
        let record = self.record_mut(id)?;
        record.handled = true;
        match record.state.settlement() {
            None => record.reactions.push(reaction),
            Some(settlement) => {
                queue.enqueue(Job::Reaction {
                    reaction,
                    settlement,
                });
            }
        }
        Ok(())
    }

    /// Rejected promises that never had a reaction attached and have not
    /// been reported before, in id order. Each is returned once.
    pub(crate) fn take_unhandled(&mut self) -> Vec<(PromiseId, Value)> {
        let ids = std::mem::take(&mut self.unhandled);
        ids.into_iter()
            .filter_map(|id| match self.record(id).map(|r| &r.state) {
                Ok(PromiseState::Rejected(reason)) => Some((id, reason.clone())),
                _ => None,
            })
            .collect()
    }

    /// Number of rejections waiting to be reported as unhandled.
    pub fn unreported_rejections(&self) -> usize {
        self.unhandled.len()
    }
}

impl fmt::Debug for PromiseStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromiseStore")
            .field("len", &self.records.len())
            .finish()
    }
}

// ── Runtime promise operations ─────────────────────────────────────

impl Runtime {
    pub(crate) fn create_promise(&mut self) -> PromiseId {
        self.metrics.promises_created += 1;
        self.promises.create()
    }

    pub(crate) fn create_settled_promise(&mut self, settlement: Settlement) -> PromiseId {
        self.metrics.promises_created += 1;
        self.promises.create_settled(settlement)
    }

    /// `Promise.resolve(v)`: a promise value is returned as-is, anything
    /// else is wrapped in an already-fulfilled promise.
    pub(crate) fn promise_resolve(&mut self, value: Value) -> PromiseId {
        match value.as_promise() {
            Some(id) => match self.promises.state(id) {
                Ok(_) => id,
                Err(e) => self.create_settled_promise(Settlement::Rejected(e.into())),
            },
            None => self.create_settled_promise(Settlement::Fulfilled(value)),
        }
    }

    /// A resolving function: fulfill `id` with `value`, or adopt `value`'s
    /// state if it is a promise. Returns `false` if `id` was already
    /// resolved.
    pub(crate) fn resolve(&mut self, id: PromiseId, value: Value) -> bool {
        let Some(thenable) = value.as_promise() else {
            return self.settle_locked(id, Settlement::Fulfilled(value));
        };
        if thenable == id {
            let cycle = PromiseError::ChainingCycle { promise: id };
            return self.settle_locked(id, Settlement::Rejected(cycle.into()));
        }
        if self.promises.lock(id).is_err() {
            return false;
        }
        self.microtasks.enqueue(Job::ResolveThenable {
            target: id,
            thenable,
        });
        true
    }

    /// A rejecting function. Returns `false` if `id` was already resolved.
    pub(crate) fn reject(&mut self, id: PromiseId, reason: Value) -> bool {
        self.settle_locked(id, Settlement::Rejected(reason))
    }

    /// Settle through the resolving-function gate.
    pub(crate) fn settle_locked(&mut self, id: PromiseId, settlement: Settlement) -> bool {
        if self.promises.lock(id).is_err() {
            return false;
        }
        self.settle(id, settlement)
    }

    /// Settle directly, bypassing the lock (adoption of a thenable the
    /// target is already locked onto).
    pub(crate) fn settle(&mut self, id: PromiseId, settlement: Settlement) -> bool {
        self.promises
            .settle(id, settlement, &mut self.microtasks)
            .is_ok()
    }

    /// Apply a completion to a derived promise: a return resolves it, a
    /// throw rejects it.
    pub(crate) fn complete(&mut self, id: PromiseId, completion: Completion) {
        match completion {
            Ok(v) => {
                self.resolve(id, v);
            }
            Err(e) => {
                self.reject(id, e);
            }
        }
    }

    /// The body of the adoption job queued by `resolve`.
    pub(crate) fn adopt_thenable(&mut self, target: PromiseId, thenable: PromiseId) {
        let settled = match self.promises.state(thenable) {
            Ok(state) => state.settlement(),
            Err(e) => {
                self.settle(target, Settlement::Rejected(e.into()));
                return;
            }
        };
        if let (ThenableAdoption::SingleHop, Some(settlement)) =
            (self.config.thenable_adoption, settled)
        {
            let _ = self.promises.mark_handled(thenable);
            self.settle(target, settlement);
            return;
        }
        let _ = self.promises.register(
            thenable,
            Reaction::Adopt { target },
            &mut self.microtasks,
        );
    }

    /// `.then(onFulfilled, onRejected)`.
    pub(crate) fn then(
        &mut self,
        id: PromiseId,
        on_fulfilled: Option<Handler>,
        on_rejected: Option<Handler>,
    ) -> Result<PromiseId, PromiseError> {
        self.promises.state(id)?;
        let derived = self.create_promise();
        self.promises.register(
            id,
            Reaction::Then {
                on_fulfilled,
                on_rejected,
                derived,
            },
            &mut self.microtasks,
        )?;
        Ok(derived)
    }

    /// `.finally(f)`.
    pub(crate) fn finally(
        &mut self,
        id: PromiseId,
        on_finally: FinallyHandler,
    ) -> Result<PromiseId, PromiseError> {
        self.promises.state(id)?;
        let derived = self.create_promise();
        self.promises.register(
            id,
            Reaction::Finally {
                on_finally,
                derived,
            },
            &mut self.microtasks,
        )?;
        Ok(derived)
    }

    /// Run a promise reaction job.
    pub(crate) fn run_reaction(&mut self, reaction: Reaction, settlement: Settlement) {
        match reaction {
            Reaction::Then {
                on_fulfilled,
                on_rejected,
                derived,
            } => {
                let (handler, value) = match settlement {
                    Settlement::Fulfilled(v) => (on_fulfilled, Ok(v)),
                    Settlement::Rejected(v) => (on_rejected, Err(v)),
                };
                let completion = match (handler, value) {
                    (Some(handler), Ok(v) | Err(v)) => handler(&mut Scope::new(self), v),
                    (None, pass_through) => pass_through,
                };
                self.complete(derived, completion);
            }
            Reaction::Finally {
                on_finally,
                derived,
            } => {
                let completion = on_finally(&mut Scope::new(self));
                match completion {
                    Err(e) => {
                        self.reject(derived, e);
                    }
                    Ok(Value::Promise(waited)) => {
                        let forward = Reaction::FinallyForward {
                            original: settlement,
                            derived,
                        };
                        if let Err(e) =
                            self.promises
                                .register(waited, forward, &mut self.microtasks)
                        {
                            self.reject(derived, e.into());
                        }
                    }
                    Ok(_) => {
                        self.settle_locked(derived, settlement);
                    }
                }
            }
            Reaction::FinallyForward { original, derived } => {
                let outcome = match settlement {
                    Settlement::Fulfilled(_) => original,
                    rejected @ Settlement::Rejected(_) => rejected,
                };
                self.settle_locked(derived, outcome);
            }
            Reaction::Resume(continuation) => {
                self.resume_async(continuation, settlement.into_completion());
            }
            Reaction::Combine { combinator, index } => {
                let decided = self.combinators.offer(combinator, index, settlement);
                if let Some((result, outcome)) = decided {
                    self.settle_locked(result, outcome);
                }
            }
            Reaction::Adopt { target } => {
                self.settle(target, settlement);
            }
        }
    }
}
