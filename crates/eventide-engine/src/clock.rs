//! The virtual clock.

use eventide_core::VirtualTime;

/// Current virtual time of the loop.
///
/// Starts at [`VirtualTime::ZERO`] and only moves forward, and only when
/// the loop jumps to the due time of the next macrotask. Nothing here ever
/// sleeps or reads a wall clock.
#[derive(Clone, Debug, Default)]
pub struct Clock {
    now: VirtualTime,
    advances: u64,
}

impl Clock {
    /// A clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current instant.
    pub fn now(&self) -> VirtualTime {
        self.now
    }

    /// Jump forward to `to`.
    ///
    /// Returns `true` if the clock moved. Requests for an instant at or
    /// before `now` leave the clock untouched: virtual time never runs
    /// backwards.
    pub fn advance_to(&mut self, to: VirtualTime) -> bool {
        if to <= self.now {
            return false;
        }
        self.now = to;
        self.advances += 1;
        true
    }

    /// How many times the clock has moved.
    pub fn advances(&self) -> u64 {
        self.advances
    }
}
