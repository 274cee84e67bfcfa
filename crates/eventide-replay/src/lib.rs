//! Trace recording and determinism verification for Eventide runs.
//!
//! Records the output trace of a run to a compact binary format and
//! verifies that re-running the same script under the same configuration
//! reproduces it exactly.
//!
//! # Architecture
//!
//! - [`TraceWriter`] records entries to any `Write` sink
//! - [`TraceReader`] reads entries back from any `Read` source
//! - [`trace_hash`] fingerprints a whole trace with FNV-1a
//! - [`compare_traces`] and [`replay_and_compare`] locate the first divergence
//! - All I/O uses a custom binary codec (no serde dependency)
//!
//! # Format
//!
//! ```text
//! [MAGIC "EVTR"] [VERSION u8] [TraceHeader]
//! [len u32][Entry 1] [len u32][Entry 2] ... [len u32][Entry N]
//! ```
//!
//! Each entry holds its sequence number, virtual time, and the emitted
//! value. All integers are little-endian.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod compare;
pub mod error;
pub mod hash;
pub mod reader;
pub mod types;
pub mod writer;

pub use compare::{compare_traces, replay_and_compare, DivergenceKind, DivergenceReport};
pub use error::ReplayError;
pub use hash::{config_hash, trace_hash, value_hash};
pub use reader::{EntryIter, TraceReader};
pub use types::TraceHeader;
pub use writer::TraceWriter;

/// Magic bytes at the start of every trace file.
pub const MAGIC: [u8; 4] = *b"EVTR";

/// Current binary format version.
pub const FORMAT_VERSION: u8 = 1;
