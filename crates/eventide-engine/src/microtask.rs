//! Microtask queue: strict FIFO of continuations.
//!
//! The queue itself is a plain FIFO. The exhaustive drain lives on the
//! loop (see [`EventLoop::drain_microtasks`](crate::EventLoop::drain_microtasks))
//! because running a microtask needs the whole runtime, and anything a
//! microtask enqueues must land in this same queue and run in the same
//! drain.

use std::collections::VecDeque;
use std::fmt;

use eventide_core::{MicrotaskId, PromiseId, Settlement};

use crate::macrotask::OnceCallback;
use crate::promise::Reaction;

/// The work a microtask performs.
pub(crate) enum Job {
    /// A `queueMicrotask` callback.
    Callback(OnceCallback),
    /// A promise reaction fired by settlement.
    Reaction {
        reaction: Reaction,
        settlement: Settlement,
    },
    /// Subscribe `target` to the eventual state of `thenable`.
    ResolveThenable {
        target: PromiseId,
        thenable: PromiseId,
    },
}

/// Coarse category of a microtask, for logging and the event log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MicrotaskKind {
    /// Queued with `queueMicrotask`.
    Callback,
    /// A `.then`/`.catch`/`.finally` handler or pass-through.
    PromiseReaction,
    /// Resumption of a suspended async function.
    AsyncResume,
    /// A `Promise.all`/`race`/`allSettled`/`any` input settling.
    CombinatorStep,
    /// Resolution of a promise with another promise.
    ResolveThenable,
}

impl fmt::Display for MicrotaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callback => write!(f, "callback"),
            Self::PromiseReaction => write!(f, "reaction"),
            Self::AsyncResume => write!(f, "async-resume"),
            Self::CombinatorStep => write!(f, "combinator"),
            Self::ResolveThenable => write!(f, "resolve-thenable"),
        }
    }
}

/// A queued unit of work, consumed exactly once.
pub struct Microtask {
    /// Identity; also the enqueue order.
    pub id: MicrotaskId,
    pub(crate) job: Job,
}

impl Microtask {
    /// The category of work this microtask performs.
    pub fn kind(&self) -> MicrotaskKind {
        match &self.job {
            Job::Callback(_) => MicrotaskKind::Callback,
            Job::Reaction { reaction, .. } => reaction.kind(),
            Job::ResolveThenable { .. } => MicrotaskKind::ResolveThenable,
        }
    }
}

impl fmt::Debug for Microtask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Microtask")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .finish()
    }
}

/// Result of an exhaustive microtask drain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The queue ran dry.
    Drained {
        /// Microtasks run by this drain.
        ran: u64,
    },
    /// The per-drain limit was hit with work still queued.
    LimitExceeded {
        /// Microtasks run by this drain.
        ran: u64,
    },
}

impl DrainOutcome {
    /// Microtasks run by this drain.
    pub fn ran(self) -> u64 {
        match self {
            Self::Drained { ran } | Self::LimitExceeded { ran } => ran,
        }
    }
}

/// Strict FIFO queue of microtasks.
#[derive(Default)]
pub struct MicrotaskQueue {
    queue: VecDeque<Microtask>,
    next_id: u64,
    peak_depth: usize,
}

impl MicrotaskQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn enqueue(&mut self, job: Job) -> MicrotaskId {
        let id = MicrotaskId(self.next_id);
        self.next_id += 1;
        self.queue.push_back(Microtask { id, job });
        self.peak_depth = self.peak_depth.max(self.queue.len());
        id
    }

    /// Take the oldest microtask.
    pub fn pop(&mut self) -> Option<Microtask> {
        self.queue.pop_front()
    }

    /// Number of queued microtasks.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Total microtasks ever enqueued.
    pub fn total_enqueued(&self) -> u64 {
        self.next_id
    }

    /// The deepest the queue has been.
    pub fn peak_depth(&self) -> usize {
        self.peak_depth
    }
}

impl fmt::Debug for MicrotaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MicrotaskQueue")
            .field("len", &self.queue.len())
            .field("total_enqueued", &self.next_id)
            .finish()
    }
}
