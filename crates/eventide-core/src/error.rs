//! Error types shared across the Eventide workspace.
//!
//! Script-level failures (throws, rejections) are ordinary [`Value`]s and
//! never surface as Rust errors. The enums here cover misuse of the host
//! API itself, such as handing the promise store a handle it never issued.

use std::error::Error;
use std::fmt;

use crate::id::PromiseId;
use crate::value::Value;

/// Errors from promise store operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PromiseError {
    /// The handle does not refer to a promise in this loop.
    InvalidHandle {
        /// The unknown handle.
        promise: PromiseId,
    },
    /// The promise is already settled (or locked onto a thenable).
    ///
    /// Script-facing resolve and reject treat this as a silent no-op.
    AlreadySettled {
        /// The promise that was already settled.
        promise: PromiseId,
    },
    /// A promise was resolved with itself.
    ChainingCycle {
        /// The self-resolved promise.
        promise: PromiseId,
    },
}

impl fmt::Display for PromiseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHandle { promise } => write!(f, "invalid promise handle {promise}"),
            Self::AlreadySettled { promise } => write!(f, "{promise} is already settled"),
            Self::ChainingCycle { promise } => {
                write!(f, "chaining cycle detected for {promise}")
            }
        }
    }
}

impl Error for PromiseError {}

/// Lets callbacks propagate host API misuse with `?`: the error becomes a
/// thrown error value, exactly like a `TypeError` in script code.
impl From<PromiseError> for Value {
    fn from(e: PromiseError) -> Self {
        Value::Error(e.to_string())
    }
}
