//! Eventide: a deterministic simulator for a cooperative single-threaded
//! event loop with timers, immediates, microtasks, and promises.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Eventide sub-crates. For most users, adding `eventide` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use eventide::prelude::*;
//!
//! let report = run_to_completion(LoopConfig::default(), |s| {
//!     s.emit("Start");
//!     s.set_timeout(|s| { s.emit("Timeout"); Ok(()) }, 0);
//!     let p = s.promise_resolve(Value::Undefined);
//!     s.then(p, |s, _| { s.emit("Promise"); Ok(Value::Undefined) })?;
//!     s.emit("End");
//!     Ok(())
//! })
//! .unwrap();
//!
//! assert_eq!(report.labels(), ["Start", "End", "Promise", "Timeout"]);
//! assert_eq!(report.halt, HaltReason::Exhausted);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `eventide-core` | IDs, virtual time, values, the output trace, errors |
//! | [`engine`] | `eventide-engine` | Clock, queues, promises, async functions, the event loop |
//! | [`replay`] | `eventide-replay` | Trace recording, hashing, and determinism verification |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and IDs (`eventide-core`).
///
/// Contains [`types::Value`], [`types::Trace`], the typed handles, and
/// [`types::PromiseError`].
pub use eventide_core as types;

/// The event-loop engine (`eventide-engine`).
///
/// [`engine::EventLoop`] drives a run; scripts and callbacks talk to it
/// through [`engine::Scope`].
pub use eventide_engine as engine;

/// Trace recording and determinism verification (`eventide-replay`).
///
/// Record traces with [`replay::TraceWriter`], read them back with
/// [`replay::TraceReader`], and check a re-run with
/// [`replay::replay_and_compare`].
pub use eventide_replay as replay;

/// Common imports for typical Eventide usage.
///
/// ```rust
/// use eventide::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use eventide_core::{
        Completion, PromiseError, PromiseId, Settlement, TaskId, Trace, TraceEntry, Value,
        VirtualTime,
    };

    // Engine
    pub use eventide_engine::{
        run_to_completion, AsyncFn, EventLoop, HaltReason, ImmediateOrdering, LoopConfig,
        PromiseState, RunReport, Scope, TaskResult, ThenableAdoption, Yield,
    };

    // Replay
    pub use eventide_replay::{trace_hash, TraceReader, TraceWriter};
}
