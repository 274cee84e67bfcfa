//! Hashing utilities for trace and configuration comparison.
//!
//! Uses FNV-1a for fast, deterministic fingerprints. These hashes are not
//! cryptographically secure; they are used as a fast equality check
//! before an entry-by-entry comparison.

use eventide_core::{Trace, Value};
use eventide_engine::{ImmediateOrdering, LoopConfig, ThenableAdoption};

use crate::codec::put_value;

/// FNV-1a offset basis for 64-bit.
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
/// FNV-1a prime for 64-bit.
const FNV_PRIME: u64 = 0x00000100000001B3;

#[inline]
fn fnv1a_byte(hash: u64, byte: u8) -> u64 {
    (hash ^ byte as u64).wrapping_mul(FNV_PRIME)
}

#[inline]
fn fnv1a_bytes(mut hash: u64, bytes: &[u8]) -> u64 {
    for &b in bytes {
        hash = fnv1a_byte(hash, b);
    }
    hash
}

#[inline]
fn fnv1a_u64(hash: u64, v: u64) -> u64 {
    fnv1a_bytes(hash, &v.to_le_bytes())
}

/// Hash a single value through its binary encoding.
pub fn value_hash(value: &Value) -> u64 {
    let mut buf = Vec::new();
    put_value(&mut buf, value);
    fnv1a_bytes(FNV_OFFSET, &buf)
}

/// Fingerprint a whole trace.
///
/// Folds in, per entry, the virtual time and the encoded value. Sequence
/// numbers are implied by position. An empty trace hashes to the FNV
/// offset basis.
pub fn trace_hash(trace: &Trace) -> u64 {
    let mut hash = FNV_OFFSET;
    let mut buf = Vec::new();
    for entry in trace {
        hash = fnv1a_u64(hash, entry.time.as_millis());
        buf.clear();
        put_value(&mut buf, &entry.value);
        hash = fnv1a_u64(hash, buf.len() as u64);
        hash = fnv1a_bytes(hash, &buf);
    }
    hash
}

fn opt_u64(hash: u64, v: Option<u64>) -> u64 {
    match v {
        Some(v) => fnv1a_u64(fnv1a_byte(hash, 1), v),
        None => fnv1a_byte(hash, 0),
    }
}

/// Hash the ordering-relevant parts of a loop configuration.
///
/// `record_events` is excluded: it does not affect the trace.
pub fn config_hash(config: &LoopConfig) -> u64 {
    let mut hash = FNV_OFFSET;
    hash = opt_u64(hash, config.max_macrotasks);
    hash = opt_u64(hash, config.time_limit.map(|t| t.as_millis()));
    hash = opt_u64(hash, config.max_microtasks_per_drain);
    hash = fnv1a_u64(hash, config.min_interval_period);
    hash = fnv1a_byte(
        hash,
        match config.immediate_ordering {
            ImmediateOrdering::Registration => 0,
            ImmediateOrdering::AfterTimers => 1,
        },
    );
    fnv1a_byte(
        hash,
        match config.thenable_adoption {
            ThenableAdoption::SingleHop => 0,
            ThenableAdoption::Subscribe => 1,
        },
    )
}
