//! Strongly-typed identifiers and the [`VirtualTime`] unit.

use std::fmt;
use std::ops::Add;

/// Identifies a macrotask (timeout, interval, or immediate).
///
/// Returned by `setTimeout`/`setInterval`/`setImmediate` and accepted by
/// the matching `clear*` calls. IDs are never reused within one loop, so
/// clearing a stale ID is a harmless no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TaskId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Identifies a queued microtask.
///
/// Assigned from the microtask queue's monotonic enqueue counter, so the
/// numeric order of two IDs is also their execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MicrotaskId(pub u64);

impl fmt::Display for MicrotaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to a promise record in the promise store.
///
/// Promise handles are plain indices; `PromiseId(n)` is the n-th promise
/// created by the loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PromiseId(pub u32);

impl fmt::Display for PromiseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "promise#{}", self.0)
    }
}

impl From<u32> for PromiseId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a suspended asynchronous function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContinuationId(pub u64);

impl fmt::Display for ContinuationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies the shared state of one `Promise.all`/`race`/`allSettled`/`any`
/// invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CombinatorId(pub u64);

impl fmt::Display for CombinatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A point on the virtual clock, in milliseconds since loop start.
///
/// The clock never reads wall time. It only moves when the loop jumps to
/// the due time of the earliest pending macrotask.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VirtualTime(pub u64);

impl VirtualTime {
    /// The instant the loop starts at.
    pub const ZERO: VirtualTime = VirtualTime(0);

    /// Milliseconds since loop start.
    pub fn as_millis(self) -> u64 {
        self.0
    }

    /// Offset this instant by `delay_ms`, saturating at `u64::MAX`.
    pub fn after(self, delay_ms: u64) -> VirtualTime {
        VirtualTime(self.0.saturating_add(delay_ms))
    }
}

impl Add<u64> for VirtualTime {
    type Output = VirtualTime;

    fn add(self, rhs: u64) -> VirtualTime {
        self.after(rhs)
    }
}

impl fmt::Display for VirtualTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

impl From<u64> for VirtualTime {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
