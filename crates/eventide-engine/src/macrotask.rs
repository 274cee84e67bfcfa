//! Macrotask queue: timers, intervals, and immediates.
//!
//! [`MacrotaskQueue`] is an arena of tasks keyed by [`TaskId`] plus an
//! ordered index over the pending ones. Cancellation by id is a map
//! removal and an index removal, both `O(log n)` or better, and is safe
//! even while the task's own callback is running.
//!
//! # Ordering
//!
//! Pending tasks are ordered by the composite key:
//! `(due_time, rank, insertion_seq)`
//!
//! This ensures:
//! - A task due earlier always fires first (delay-100 after delay-0).
//! - Under [`ImmediateOrdering::Registration`] every kind has rank 0, so
//!   same-instant tasks fire in registration order.
//! - Under [`ImmediateOrdering::AfterTimers`] immediates rank after timers
//!   due at the same instant.
//! - Each re-armed interval takes a fresh sequence number, so it orders
//!   against other pending tasks by its new due time.

use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;

use eventide_core::{TaskId, Value, VirtualTime};

use crate::config::ImmediateOrdering;
use crate::scope::Scope;

/// Return type of timer, immediate, and `queueMicrotask` callbacks.
///
/// `Err(v)` models a throw of `v`; it aborts only that callback.
pub type TaskResult = Result<(), Value>;

/// A callback that runs once (timeout, immediate).
pub type OnceCallback = Box<dyn FnOnce(&mut Scope<'_>) -> TaskResult>;

/// A callback that may run repeatedly (interval).
pub type RepeatCallback = Box<dyn FnMut(&mut Scope<'_>) -> TaskResult>;

/// The category of a macrotask.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// `setTimeout`.
    Timeout,
    /// `setInterval`.
    Interval,
    /// `setImmediate`.
    Immediate,
}

impl TaskKind {
    fn rank(self, ordering: ImmediateOrdering) -> u8 {
        match (self, ordering) {
            (TaskKind::Immediate, ImmediateOrdering::AfterTimers) => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Interval => write!(f, "interval"),
            Self::Immediate => write!(f, "immediate"),
        }
    }
}

/// The code a macrotask runs when it fires.
pub enum TaskCallback {
    /// Consumed on first firing.
    Once(OnceCallback),
    /// Checked out for each firing and returned for re-arming.
    Repeat(RepeatCallback),
}

impl fmt::Debug for TaskCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Once(_) => write!(f, "Once(..)"),
            Self::Repeat(_) => write!(f, "Repeat(..)"),
        }
    }
}

/// Ordering key of a pending task.
type OrderKey = (VirtualTime, u8, u64, TaskId);

struct TaskEntry {
    kind: TaskKind,
    due: VirtualTime,
    period: Option<u64>,
    seq: u64,
    /// `None` while an interval's callback is checked out and running.
    callback: Option<TaskCallback>,
    cancelled: bool,
}

impl TaskEntry {
    fn key(&self, id: TaskId, ordering: ImmediateOrdering) -> OrderKey {
        (self.due, self.kind.rank(ordering), self.seq, id)
    }
}

/// A task popped from the queue, ready to run.
#[derive(Debug)]
pub struct ReadyTask {
    /// The task's identity.
    pub id: TaskId,
    /// Timeout, interval, or immediate.
    pub kind: TaskKind,
    /// The instant the task was due; the clock is advanced to this.
    pub due: VirtualTime,
    /// The callback to run.
    pub callback: TaskCallback,
}

/// Priority structure of pending macrotasks.
pub struct MacrotaskQueue {
    tasks: IndexMap<TaskId, TaskEntry>,
    order: BTreeSet<OrderKey>,
    ordering: ImmediateOrdering,
    next_id: u64,
    next_seq: u64,
    cancelled: u64,
}

impl MacrotaskQueue {
    /// Create an empty queue using the given same-instant tie-break.
    pub fn new(ordering: ImmediateOrdering) -> Self {
        Self {
            tasks: IndexMap::new(),
            order: BTreeSet::new(),
            ordering,
            next_id: 1,
            next_seq: 0,
            cancelled: 0,
        }
    }

    /// Schedule a task due `delay_ms` after `now`.
    ///
    /// `period` is only meaningful for intervals; it is the re-arm offset
    /// applied after each firing.
    pub fn schedule(
        &mut self,
        now: VirtualTime,
        kind: TaskKind,
        delay_ms: u64,
        period: Option<u64>,
        callback: TaskCallback,
    ) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        let entry = TaskEntry {
            kind,
            due: now.after(delay_ms),
            period,
            seq: self.take_seq(),
            callback: Some(callback),
            cancelled: false,
        };
        self.order.insert(entry.key(id, self.ordering));
        self.tasks.insert(id, entry);
        id
    }

    /// Cancel a task.
    ///
    /// Returns `true` if this call cancelled something. Unknown ids, tasks
    /// that already fired, and repeated cancels are no-ops returning
    /// `false`. Cancelling an interval from inside its own callback stops
    /// all future firings.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let ordering = self.ordering;
        let Some(entry) = self.tasks.get_mut(&id) else {
            return false;
        };
        if entry.cancelled {
            return false;
        }
        if entry.callback.is_none() {
            // Running right now; re-arm will observe the flag.
            entry.cancelled = true;
        } else {
            let key = entry.key(id, ordering);
            self.order.remove(&key);
            self.tasks.swap_remove(&id);
        }
        self.cancelled += 1;
        true
    }

    /// The id and due time of the task that fires next, if any.
    pub fn next_due(&self) -> Option<(TaskId, VirtualTime)> {
        self.order.first().map(|&(due, _, _, id)| (id, due))
    }

    /// Remove the next task from the pending order and check out its
    /// callback.
    ///
    /// Timeouts and immediates leave the arena entirely. Intervals stay in
    /// the arena, callback-less, until [`rearm`](Self::rearm) returns it.
    pub fn pop_next(&mut self) -> Option<ReadyTask> {
        let (due, _, _, id) = self.order.pop_first()?;
        let entry = self.tasks.get_mut(&id)?;
        let kind = entry.kind;
        let callback = if kind == TaskKind::Interval {
            entry.callback.take()?
        } else {
            let entry = self.tasks.swap_remove(&id)?;
            entry.callback?
        };
        Some(ReadyTask {
            id,
            kind,
            due,
            callback,
        })
    }

    /// Return an interval's callback after a firing at `fired_at`.
    ///
    /// Unless the interval was cancelled while it ran, it is re-inserted
    /// due at `fired_at + period` with a fresh sequence number, and the new
    /// due time is returned. A cancelled interval is dropped and `None` is
    /// returned.
    pub fn rearm(
        &mut self,
        id: TaskId,
        callback: RepeatCallback,
        fired_at: VirtualTime,
    ) -> Option<VirtualTime> {
        let seq = self.take_seq();
        let ordering = self.ordering;
        let entry = self.tasks.get_mut(&id)?;
        if entry.cancelled {
            self.tasks.swap_remove(&id);
            return None;
        }
        entry.due = fired_at.after(entry.period.unwrap_or(0));
        entry.seq = seq;
        entry.callback = Some(TaskCallback::Repeat(callback));
        let due = entry.due;
        self.order.insert(entry.key(id, ordering));
        Some(due)
    }

    /// Whether `id` is scheduled to fire again.
    pub fn is_pending(&self, id: TaskId) -> bool {
        self.tasks
            .get(&id)
            .is_some_and(|e| !e.cancelled && e.callback.is_some())
    }

    /// Number of pending tasks.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no task is pending.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Whether any pending task is an interval.
    pub fn has_pending_intervals(&self) -> bool {
        self.tasks
            .values()
            .any(|e| e.kind == TaskKind::Interval && !e.cancelled)
    }

    /// Cumulative number of successful cancellations.
    pub fn cancelled_count(&self) -> u64 {
        self.cancelled
    }

    fn take_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

impl fmt::Debug for MacrotaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MacrotaskQueue")
            .field("pending", &self.order.len())
            .field("ordering", &self.ordering)
            .finish()
    }
}
