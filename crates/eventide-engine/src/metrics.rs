//! Counters collected over a loop run.
//!
//! [`RunMetrics`] is cumulative from loop creation. Every counter is
//! deterministic: two runs of the same script produce equal metrics.

/// Cumulative scheduling counters for one [`EventLoop`](crate::EventLoop).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunMetrics {
    /// Macrotasks dispatched (timeouts, interval firings, immediates).
    pub macrotasks_run: u64,
    /// Microtasks dispatched across all drains.
    pub microtasks_run: u64,
    /// Interval firings; a subset of `macrotasks_run`.
    pub interval_firings: u64,
    /// Successful timer/immediate cancellations.
    pub tasks_cancelled: u64,
    /// Promises created, including derived and combinator result promises.
    pub promises_created: u64,
    /// Deepest the microtask queue has been.
    pub peak_microtask_depth: usize,
    /// Number of forward jumps of the virtual clock.
    pub clock_advances: u64,
    /// Callbacks whose body threw.
    pub uncaught_errors: u64,
    /// Rejections reported with no handler attached.
    pub unhandled_rejections: u64,
}

impl RunMetrics {
    /// Total callbacks dispatched, macro and micro.
    pub fn callbacks_run(&self) -> u64 {
        self.macrotasks_run + self.microtasks_run
    }
}
