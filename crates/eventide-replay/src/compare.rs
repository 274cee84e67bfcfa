//! Trace comparison and replay verification.
//!
//! Hash-first comparison (fast path) with an entry-by-entry fallback that
//! pinpoints the first divergence.

use std::io::Read;

use eventide_core::{Trace, TraceEntry};
use eventide_engine::LoopConfig;

use crate::error::ReplayError;
use crate::hash::{config_hash, trace_hash};
use crate::reader::TraceReader;

/// How two traces differ at the first divergent index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DivergenceKind {
    /// Same position, different emitted value.
    Value,
    /// Same value, emitted at a different virtual time.
    Time,
    /// The recorded trace has an entry the replay never produced.
    MissingInReplay,
    /// The replay produced an entry beyond the end of the recording.
    ExtraInReplay,
}

/// The first point at which a replay departed from its recording.
#[derive(Clone, Debug, PartialEq)]
pub struct DivergenceReport {
    /// Index of the first differing entry.
    pub index: usize,
    /// How the entries differ.
    pub kind: DivergenceKind,
    /// The recorded entry, if any.
    pub recorded: Option<TraceEntry>,
    /// The replayed entry, if any.
    pub replayed: Option<TraceEntry>,
    /// Hash of the full recorded trace.
    pub recorded_hash: u64,
    /// Hash of the full replayed trace.
    pub replayed_hash: u64,
}

/// Compare two traces. Returns `None` if they are identical.
pub fn compare_traces(recorded: &Trace, replayed: &Trace) -> Option<DivergenceReport> {
    let recorded_hash = trace_hash(recorded);
    let replayed_hash = trace_hash(replayed);
    if recorded_hash == replayed_hash && recorded == replayed {
        return None;
    }

    let rec = recorded.entries();
    let rep = replayed.entries();
    let len = rec.len().max(rep.len());
    (0..len).find_map(|index| {
        let (r, p) = (rec.get(index), rep.get(index));
        let kind = match (r, p) {
            (Some(r), Some(p)) if r.value != p.value => DivergenceKind::Value,
            (Some(r), Some(p)) if r.time != p.time => DivergenceKind::Time,
            (Some(_), Some(_)) => return None,
            (Some(_), None) => DivergenceKind::MissingInReplay,
            (None, Some(_)) => DivergenceKind::ExtraInReplay,
            (None, None) => return None,
        };
        Some(DivergenceReport {
            index,
            kind,
            recorded: r.cloned(),
            replayed: p.cloned(),
            recorded_hash,
            replayed_hash,
        })
    })
}

/// Re-run a recorded trace and compare.
///
/// Checks that `config` hashes to the value stored in the recording's
/// header, then calls `run` with it to produce a fresh trace and compares
/// the two. Returns `Ok(None)` if the replay matches.
pub fn replay_and_compare<R, F>(
    reader: TraceReader<R>,
    config: &LoopConfig,
    run: F,
) -> Result<Option<DivergenceReport>, ReplayError>
where
    R: Read,
    F: FnOnce(&LoopConfig) -> Trace,
{
    let current = config_hash(config);
    let recorded_hash = reader.header().config_hash;
    if recorded_hash != current {
        return Err(ReplayError::ConfigMismatch {
            recorded: recorded_hash,
            current,
        });
    }
    let recorded = reader.read_trace()?;
    let replayed = run(config);
    Ok(compare_traces(&recorded, &replayed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventide_core::{Value, VirtualTime};

    fn trace(items: &[(u64, i64)]) -> Trace {
        let mut t = Trace::new();
        for &(time, v) in items {
            t.push(VirtualTime(time), Value::Int(v));
        }
        t
    }

    #[test]
    fn identical_traces_match() {
        let a = trace(&[(0, 1), (5, 2)]);
        assert_eq!(compare_traces(&a, &a.clone()), None);
    }

    #[test]
    fn value_divergence_located() {
        let a = trace(&[(0, 1), (5, 2), (6, 3)]);
        let b = trace(&[(0, 1), (5, 9), (6, 3)]);
        let report = compare_traces(&a, &b).unwrap();
        assert_eq!(report.index, 1);
        assert_eq!(report.kind, DivergenceKind::Value);
        assert_ne!(report.recorded_hash, report.replayed_hash);
    }

    #[test]
    fn time_divergence_located() {
        let a = trace(&[(0, 1), (5, 2)]);
        let b = trace(&[(0, 1), (7, 2)]);
        let report = compare_traces(&a, &b).unwrap();
        assert_eq!(report.index, 1);
        assert_eq!(report.kind, DivergenceKind::Time);
    }

    #[test]
    fn length_divergence_located() {
        let a = trace(&[(0, 1), (5, 2)]);
        let b = trace(&[(0, 1)]);
        let short = compare_traces(&a, &b).unwrap();
        assert_eq!(short.kind, DivergenceKind::MissingInReplay);
        assert_eq!(short.replayed, None);
        let long = compare_traces(&b, &a).unwrap();
        assert_eq!(long.kind, DivergenceKind::ExtraInReplay);
        assert_eq!(long.index, 1);
    }
}
