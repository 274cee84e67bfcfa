//! Error types for trace recording and verification.

use std::fmt;
use std::io;

/// Failure while recording, loading, or checking a trace file.
#[derive(Debug)]
pub enum ReplayError {
    /// The underlying reader or writer failed.
    Io(io::Error),
    /// The stream does not start with the `b"EVTR"` magic bytes.
    InvalidMagic,
    /// The stream was written by a different format revision.
    UnsupportedVersion {
        /// Version byte read from the stream.
        found: u8,
    },
    /// An entry could not be decoded (truncated or corrupt data).
    MalformedEntry {
        /// What went wrong.
        detail: String,
    },
    /// A value type tag is not recognized.
    UnknownValueTag {
        /// The unrecognized tag.
        tag: u8,
    },
    /// The trace was recorded under a different loop configuration.
    ConfigMismatch {
        /// Hash from the trace header.
        recorded: u64,
        /// Hash of the configuration used for replay.
        current: u64,
    },
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "trace i/o failed: {e}"),
            Self::InvalidMagic => write!(f, "invalid magic bytes (expected b\"EVTR\")"),
            Self::UnsupportedVersion { found } => write!(
                f,
                "trace format version {found} is not supported (this build reads {})",
                crate::FORMAT_VERSION
            ),
            Self::MalformedEntry { detail } => write!(f, "malformed entry: {detail}"),
            Self::UnknownValueTag { tag } => write!(f, "unknown value tag {tag}"),
            Self::ConfigMismatch { recorded, current } => write!(
                f,
                "trace recorded under config {recorded:#018x}, replaying under {current:#018x}"
            ),
        }
    }
}

impl std::error::Error for ReplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Self::Io(e) = self {
            Some(e)
        } else {
            None
        }
    }
}

impl From<io::Error> for ReplayError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn io_error_is_the_source() {
        let e = ReplayError::from(io::Error::new(io::ErrorKind::UnexpectedEof, "eof"));
        assert!(e.source().is_some());
        assert!(ReplayError::InvalidMagic.source().is_none());
    }

    #[test]
    fn config_mismatch_formats_hex() {
        let e = ReplayError::ConfigMismatch {
            recorded: 1,
            current: 0xff,
        };
        assert_eq!(
            e.to_string(),
            "trace recorded under config 0x0000000000000001, replaying under 0x00000000000000ff"
        );
    }
}
