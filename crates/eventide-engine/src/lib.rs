//! Deterministic cooperative event-loop engine.
//!
//! Provides [`EventLoop`], a single-threaded discrete-event simulator of a
//! host event loop: a virtual [`Clock`], a macrotask queue of timers,
//! intervals and immediates, an exhaustively drained microtask queue, a
//! promise state machine, and async functions modelled as continuations.
//! Scripts are Rust closures that talk to the loop through [`Scope`].
//!
//! # Cycle
//!
//! ```text
//! run_script ─▶ drain microtasks ─▶ ┬─ next due macrotask? ─▶ jump clock ─▶ run ─┐
//!                                   │                                           │
//!                                   └──────────── drain microtasks ◀────────────┘
//! ```
//!
//! Nothing sleeps; delays are offsets on a virtual clock consumed
//! instantly when no earlier event exists.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod clock;
pub mod combinator;
pub mod config;
pub mod continuation;
pub mod event;
pub mod event_loop;
pub mod macrotask;
pub mod metrics;
pub mod microtask;
pub mod promise;
mod runtime;
pub mod scope;

pub use clock::Clock;
pub use combinator::{aggregate_error, CombinatorKind};
pub use config::{ConfigError, ImmediateOrdering, LoopConfig, ThenableAdoption};
pub use continuation::{AsyncFn, Step, Yield};
pub use event::{CallbackSource, HaltReason, LoopEvent, UncaughtError, UnhandledRejection};
pub use event_loop::{run_to_completion, EventLoop, LoopPhase, RunReport, TurnOutcome};
pub use macrotask::{TaskKind, TaskResult};
pub use metrics::RunMetrics;
pub use microtask::{DrainOutcome, MicrotaskKind};
pub use promise::{FinallyHandler, Handler, PromiseState};
pub use scope::Scope;
