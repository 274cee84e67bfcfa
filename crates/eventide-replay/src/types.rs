//! Data types for trace recording.

/// Metadata stored in the trace header.
///
/// # Examples
///
/// ```
/// use eventide_replay::TraceHeader;
///
/// let header = TraceHeader {
///     eventide_version: "0.1.0".into(),
///     config_hash: 0xDEAD_BEEF,
/// };
/// assert_eq!(header.eventide_version, "0.1.0");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceHeader {
    /// Version of the crate that produced the trace.
    pub eventide_version: String,
    /// [`config_hash`](crate::config_hash) of the loop configuration the
    /// trace was recorded under.
    pub config_hash: u64,
}

impl TraceHeader {
    /// A header stamped with this crate's version.
    pub fn current(config_hash: u64) -> Self {
        Self {
            eventide_version: env!("CARGO_PKG_VERSION").to_string(),
            config_hash,
        }
    }
}
