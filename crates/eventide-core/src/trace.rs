//! The ordered output trace.
//!
//! Every `emit(value)` made by a callback appends one [`TraceEntry`]. The
//! trace is the only artifact a run produces and the object scenario tests
//! assert against.

use crate::id::VirtualTime;
use crate::value::Value;

/// One observation appended by `emit`.
#[derive(Clone, Debug, PartialEq)]
pub struct TraceEntry {
    /// Position in the trace, starting at 0.
    pub seq: u64,
    /// Virtual time at which the value was emitted.
    pub time: VirtualTime,
    /// The emitted value.
    pub value: Value,
}

/// Append-only, ordered log of emitted values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Trace {
    entries: Vec<TraceEntry>,
}

impl Trace {
    /// Create an empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value observed at `time`.
    pub fn push(&mut self, time: VirtualTime, value: Value) {
        let seq = self.entries.len() as u64;
        self.entries.push(TraceEntry { seq, time, value });
    }

    /// All entries in emission order.
    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    /// The emitted values, without timestamps.
    pub fn values(&self) -> Vec<Value> {
        self.entries.iter().map(|e| e.value.clone()).collect()
    }

    /// The emitted values rendered with their `Display` form.
    ///
    /// Handy for asserting against string scenarios such as
    /// `["Start", "End", "Promise", "Timeout"]`.
    pub fn labels(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.value.to_string()).collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was emitted.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in emission order.
    pub fn iter(&self) -> std::slice::Iter<'_, TraceEntry> {
        self.entries.iter()
    }
}

impl FromIterator<TraceEntry> for Trace {
    /// Rebuild a trace from decoded entries, renumbering `seq` densely.
    fn from_iter<I: IntoIterator<Item = TraceEntry>>(iter: I) -> Self {
        let mut trace = Trace::new();
        for entry in iter {
            trace.push(entry.time, entry.value);
        }
        trace
    }
}

impl<'a> IntoIterator for &'a Trace {
    type Item = &'a TraceEntry;
    type IntoIter = std::slice::Iter<'a, TraceEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_assigns_dense_sequence_numbers() {
        let mut t = Trace::new();
        t.push(VirtualTime(0), Value::from("a"));
        t.push(VirtualTime(5), Value::from("b"));
        assert_eq!(t.len(), 2);
        assert_eq!(t.entries()[1].seq, 1);
        assert_eq!(t.entries()[1].time, VirtualTime(5));
        assert_eq!(t.labels(), vec!["a", "b"]);
    }

    #[test]
    fn collect_renumbers() {
        let entries = vec![
            TraceEntry {
                seq: 7,
                time: VirtualTime(1),
                value: Value::Int(1),
            },
            TraceEntry {
                seq: 9,
                time: VirtualTime(2),
                value: Value::Int(2),
            },
        ];
        let t: Trace = entries.into_iter().collect();
        assert_eq!(t.entries()[0].seq, 0);
        assert_eq!(t.entries()[1].seq, 1);
        assert_eq!(t.values(), vec![Value::Int(1), Value::Int(2)]);
    }
}
