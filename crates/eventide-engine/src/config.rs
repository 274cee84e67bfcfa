//! Loop configuration, validation, and error types.
//!
//! [`LoopConfig`] is the builder-input for constructing an
//! [`EventLoop`](crate::EventLoop). [`validate()`](LoopConfig::validate)
//! checks structural invariants before the loop is created.

use std::error::Error;
use std::fmt;

use eventide_core::VirtualTime;

// ── Ordering policies ──────────────────────────────────────────────

/// How immediates rank against timers that fall due at the same instant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ImmediateOrdering {
    /// Immediates and same-instant timers share one ordering: insertion
    /// sequence. This is the default model.
    #[default]
    Registration,
    /// Immediates run after every timer due at the same instant, modelling
    /// a host with a separate check phase after its timers phase.
    AfterTimers,
}

/// How a promise resolved with another promise adopts its state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ThenableAdoption {
    /// The adoption job forwards an already-settled thenable directly, so
    /// `return Promise.resolve()` in a handler costs exactly one extra
    /// microtask turn.
    #[default]
    SingleHop,
    /// The adoption job always subscribes to the thenable with a reaction,
    /// which costs a second turn when the thenable is already settled.
    Subscribe,
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`LoopConfig::validate()`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `max_microtasks_per_drain` is `Some(0)`; no microtask could ever run.
    ZeroMicrotaskLimit,
    /// `min_interval_period` is zero; a zero-period interval would never
    /// let the virtual clock advance.
    ZeroIntervalPeriod,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroMicrotaskLimit => {
                write!(f, "max_microtasks_per_drain must be at least 1")
            }
            Self::ZeroIntervalPeriod => write!(f, "min_interval_period must be at least 1ms"),
        }
    }
}

impl Error for ConfigError {}

// ── LoopConfig ─────────────────────────────────────────────────────

/// Configuration for an [`EventLoop`](crate::EventLoop).
#[derive(Clone, Debug)]
pub struct LoopConfig {
    /// Halt after this many macrotasks have run. `None` = unbounded, which
    /// never terminates while an uncancelled interval exists.
    pub max_macrotasks: Option<u64>,
    /// Never advance the clock past this instant. Tasks due later stay
    /// pending and the run halts with `TimeLimit`.
    pub time_limit: Option<VirtualTime>,
    /// Microtask starvation guard: a single drain that would run more than
    /// this many microtasks halts the loop instead. Default: 1,000,000.
    pub max_microtasks_per_drain: Option<u64>,
    /// Interval periods below this are clamped up to it. Default: 1ms.
    pub min_interval_period: u64,
    /// Tie-break between immediates and same-instant timers.
    pub immediate_ordering: ImmediateOrdering,
    /// Cost model for resolving a promise with another promise.
    pub thenable_adoption: ThenableAdoption,
    /// Keep a [`LoopEvent`](crate::LoopEvent) log. Default: `true`.
    pub record_events: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_macrotasks: None,
            time_limit: None,
            max_microtasks_per_drain: Some(1_000_000),
            min_interval_period: 1,
            immediate_ordering: ImmediateOrdering::default(),
            thenable_adoption: ThenableAdoption::default(),
            record_events: true,
        }
    }
}

impl LoopConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_microtasks_per_drain == Some(0) {
            return Err(ConfigError::ZeroMicrotaskLimit);
        }
        if self.min_interval_period == 0 {
            return Err(ConfigError::ZeroIntervalPeriod);
        }
        Ok(())
    }
}
