//! Loop event log: a witness of every scheduling decision.
//!
//! Where the [`Trace`](eventide_core::Trace) records what scripts chose to
//! emit, the event log records what the loop itself did: clock jumps,
//! dispatches, errors, and the halt. It is kept only when
//! [`LoopConfig::record_events`](crate::LoopConfig::record_events) is set.

use std::fmt;

use eventide_core::{MicrotaskId, PromiseId, TaskId, Value, VirtualTime};

use crate::macrotask::TaskKind;
use crate::microtask::MicrotaskKind;

/// Where a failing callback was running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackSource {
    /// The synchronous entry script.
    Script,
    /// A timer, interval, or immediate callback.
    Macrotask(TaskId, TaskKind),
    /// A microtask callback.
    Microtask(MicrotaskId, MicrotaskKind),
}

impl fmt::Display for CallbackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Script => write!(f, "script"),
            Self::Macrotask(id, kind) => write!(f, "{kind} {id}"),
            Self::Microtask(id, kind) => write!(f, "{kind} {id}"),
        }
    }
}

/// A throw that escaped a callback body.
#[derive(Clone, Debug, PartialEq)]
pub struct UncaughtError {
    /// The callback that threw.
    pub source: CallbackSource,
    /// The thrown value.
    pub value: Value,
    /// Virtual time of the throw.
    pub at: VirtualTime,
}

/// A rejected promise that never had a handler attached.
#[derive(Clone, Debug, PartialEq)]
pub struct UnhandledRejection {
    /// The rejected promise.
    pub promise: PromiseId,
    /// Its rejection reason.
    pub reason: Value,
    /// Virtual time the rejection was reported.
    pub at: VirtualTime,
}

/// Why [`EventLoop::run`](crate::EventLoop::run) stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HaltReason {
    /// Both queues empty and nothing scheduled.
    Exhausted,
    /// `max_macrotasks` reached with work still pending.
    MacrotaskLimit,
    /// The next task is due after `time_limit`.
    TimeLimit,
    /// A drain exceeded `max_microtasks_per_drain`.
    MicrotaskLimit,
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted => write!(f, "exhausted"),
            Self::MacrotaskLimit => write!(f, "macrotask limit"),
            Self::TimeLimit => write!(f, "time limit"),
            Self::MicrotaskLimit => write!(f, "microtask limit"),
        }
    }
}

/// One entry of the loop event log.
#[derive(Clone, Debug, PartialEq)]
pub enum LoopEvent {
    /// The synchronous entry script started.
    ScriptStarted,
    /// The clock jumped forward.
    ClockAdvanced {
        /// Time before the jump.
        from: VirtualTime,
        /// Time after the jump.
        to: VirtualTime,
    },
    /// A macrotask was dispatched.
    MacrotaskRan {
        /// Task id.
        id: TaskId,
        /// Timeout, interval, or immediate.
        kind: TaskKind,
        /// Dispatch time.
        at: VirtualTime,
    },
    /// A microtask was dispatched.
    MicrotaskRan {
        /// Microtask id.
        id: MicrotaskId,
        /// What the microtask did.
        kind: MicrotaskKind,
    },
    /// A callback threw.
    UncaughtError(UncaughtError),
    /// A rejection was reported unhandled.
    UnhandledRejection(UnhandledRejection),
    /// The run stopped.
    Halted {
        /// Why.
        reason: HaltReason,
        /// When.
        at: VirtualTime,
    },
}

/// Append-only event log, optionally disabled.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    enabled: bool,
    events: Vec<LoopEvent>,
}

impl EventLog {
    /// A log that records only if `enabled`.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            events: Vec::new(),
        }
    }

    /// Record an event (dropped when disabled).
    pub fn record(&mut self, event: LoopEvent) {
        if self.enabled {
            self.events.push(event);
        }
    }

    /// All recorded events in order.
    pub fn events(&self) -> &[LoopEvent] {
        &self.events
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_log_drops_events() {
        let mut log = EventLog::new(false);
        log.record(LoopEvent::ScriptStarted);
        assert!(log.is_empty());
    }

    #[test]
    fn enabled_log_keeps_order() {
        let mut log = EventLog::new(true);
        log.record(LoopEvent::ScriptStarted);
        log.record(LoopEvent::ClockAdvanced {
            from: VirtualTime(0),
            to: VirtualTime(5),
        });
        assert_eq!(log.len(), 2);
        assert_eq!(log.events()[0], LoopEvent::ScriptStarted);
    }

    #[test]
    fn callback_source_display() {
        assert_eq!(CallbackSource::Script.to_string(), "script");
        let src = CallbackSource::Macrotask(TaskId(3), TaskKind::Interval);
        assert!(src.to_string().starts_with("interval"));
    }
}
