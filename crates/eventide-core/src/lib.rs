//! Core types for the Eventide event-loop simulator.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental abstractions used throughout the Eventide workspace:
//! typed IDs, the virtual time unit, the script value model, the output
//! trace, and the error types shared across crates.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod trace;
pub mod value;

pub use error::PromiseError;
pub use id::{CombinatorId, ContinuationId, MicrotaskId, PromiseId, TaskId, VirtualTime};
pub use trace::{Trace, TraceEntry};
pub use value::{Completion, Settlement, Value};
