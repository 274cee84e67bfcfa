//! Test utilities and scenario fixtures for Eventide development.
//!
//! Provides [`init_test_logging`] for `tracing` output under the test
//! harness, helpers that run a script and hand back its trace labels,
//! and the canonical ordering scenarios in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::sync::Once;

use eventide_engine::{run_to_completion, LoopConfig, RunReport, Scope, TaskResult};

static INIT_LOGGING: Once = Once::new();

/// Initialize test logging at `DEBUG`.
///
/// Safe to call from every test; only the first call installs the
/// subscriber.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::DEBUG);
}

/// Initialize test logging with a custom level. The first call wins.
pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_target(true)
            .with_ansi(false)
            .try_init();
    });
}

/// A config that bounds runaway scripts so a failing test cannot hang.
pub fn bounded_config() -> LoopConfig {
    LoopConfig {
        max_macrotasks: Some(10_000),
        max_microtasks_per_drain: Some(100_000),
        ..LoopConfig::default()
    }
}

/// Run `script` to halt under `config`.
///
/// Panics on an invalid config; only for use in tests.
pub fn run_with<F>(config: LoopConfig, script: F) -> RunReport
where
    F: FnOnce(&mut Scope<'_>) -> TaskResult,
{
    init_test_logging();
    run_to_completion(config, script).unwrap_or_else(|e| panic!("invalid test config: {e}"))
}

/// Run `script` under [`bounded_config`].
pub fn run(script: impl FnOnce(&mut Scope<'_>) -> TaskResult) -> RunReport {
    run_with(bounded_config(), script)
}

/// Run `script` and return the trace as display strings.
pub fn labels(script: impl FnOnce(&mut Scope<'_>) -> TaskResult) -> Vec<String> {
    run(script).labels()
}
