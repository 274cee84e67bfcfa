//! Promise combinators: `all`, `allSettled`, `race`, `any`.
//!
//! A combinator subscribes one `Reaction::Combine` per input and keeps a
//! tracker in the [`CombinatorStore`]. Each input settlement is offered to
//! its tracker; once the tracker decides, the entry is removed and the
//! result promise is settled. Offers arriving after that are discarded.

use indexmap::IndexMap;
use tracing::trace;

use eventide_core::{CombinatorId, PromiseId, Settlement, Value};

use crate::promise::Reaction;
use crate::runtime::Runtime;

/// Which combinator a tracker implements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CombinatorKind {
    /// `Promise.all`.
    All,
    /// `Promise.allSettled`.
    AllSettled,
    /// `Promise.race`.
    Race,
    /// `Promise.any`.
    Any,
}

/// Build the `AggregateError` value `Promise.any` rejects with.
pub fn aggregate_error(errors: Vec<Value>) -> Value {
    Value::record([
        ("name", Value::str("AggregateError")),
        ("message", Value::str("All promises were rejected")),
        ("errors", Value::List(errors)),
    ])
}

/// The `{status, value}` / `{status, reason}` record `allSettled` reports.
pub fn settled_record(settlement: &Settlement) -> Value {
    match settlement {
        Settlement::Fulfilled(v) => Value::record([
            ("status", Value::str("fulfilled")),
            ("value", v.clone()),
        ]),
        Settlement::Rejected(r) => Value::record([
            ("status", Value::str("rejected")),
            ("reason", r.clone()),
        ]),
    }
}

/// Index-preserving result slots shared by the collecting combinators.
#[derive(Debug)]
struct Slots {
    values: Vec<Value>,
    remaining: usize,
}

impl Slots {
    fn new(len: usize) -> Self {
        Self {
            values: vec![Value::Undefined; len],
            remaining: len,
        }
    }

    /// Fill slot `index`; returns the full list once every slot is in.
    fn fill(&mut self, index: usize, value: Value) -> Option<Value> {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = value;
            self.remaining = self.remaining.saturating_sub(1);
        }
        if self.remaining == 0 {
            Some(Value::List(std::mem::take(&mut self.values)))
        } else {
            None
        }
    }
}

#[derive(Debug)]
enum Tracker {
    All(Slots),
    AllSettled(Slots),
    Race,
    Any(Slots),
}

impl Tracker {
    fn offer(&mut self, index: usize, settlement: Settlement) -> Option<Settlement> {
        match self {
            Self::All(slots) => match settlement {
                Settlement::Fulfilled(v) => slots.fill(index, v).map(Settlement::Fulfilled),
                rejected => Some(rejected),
            },
            Self::AllSettled(slots) => slots
                .fill(index, settled_record(&settlement))
                .map(Settlement::Fulfilled),
            Self::Race => Some(settlement),
            Self::Any(slots) => match settlement {
                Settlement::Rejected(r) => slots.fill(index, r).map(|errors| {
                    let errors = match errors {
                        Value::List(e) => e,
                        other => vec![other],
                    };
                    Settlement::Rejected(aggregate_error(errors))
                }),
                fulfilled => Some(fulfilled),
            },
        }
    }
}

struct Entry {
    result: PromiseId,
    tracker: Tracker,
}

/// Live combinator trackers keyed by [`CombinatorId`].
#[derive(Default)]
pub struct CombinatorStore {
    live: IndexMap<CombinatorId, Entry>,
    next_id: u64,
}

impl CombinatorStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, kind: CombinatorKind, inputs: usize, result: PromiseId) -> CombinatorId {
        let id = CombinatorId(self.next_id);
        self.next_id += 1;
        let tracker = match kind {
            CombinatorKind::All => Tracker::All(Slots::new(inputs)),
            CombinatorKind::AllSettled => Tracker::AllSettled(Slots::new(inputs)),
            CombinatorKind::Race => Tracker::Race,
            CombinatorKind::Any => Tracker::Any(Slots::new(inputs)),
        };
        self.live.insert(id, Entry { result, tracker });
        id
    }

    /// Offer the settlement of input `index`.
    ///
    /// Returns the result promise and its outcome when this offer decides
    /// the combinator. The tracker is dropped at that point, so later
    /// offers for the same id return `None`.
    pub(crate) fn offer(
        &mut self,
        id: CombinatorId,
        index: usize,
        settlement: Settlement,
    ) -> Option<(PromiseId, Settlement)> {
        let entry = self.live.get_mut(&id)?;
        let outcome = entry.tracker.offer(index, settlement)?;
        let result = entry.result;
        self.live.swap_remove(&id);
        trace!(combinator = %id, promise = %result, %outcome, "combinator decided");
        Some((result, outcome))
    }

    /// Number of undecided combinators.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Whether every combinator has decided.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

impl Runtime {
    /// Create the result promise of a combinator over `inputs` and
    /// subscribe to each input in order.
    pub(crate) fn combine(&mut self, kind: CombinatorKind, inputs: Vec<Value>) -> PromiseId {
        let result = self.create_promise();
        if inputs.is_empty() {
            match kind {
                CombinatorKind::All | CombinatorKind::AllSettled => {
                    self.resolve(result, Value::List(Vec::new()));
                }
                CombinatorKind::Any => {
                    self.reject(result, aggregate_error(Vec::new()));
                }
                CombinatorKind::Race => {}
            }
            return result;
        }
        let id = self.combinators.insert(kind, inputs.len(), result);
        for (index, value) in inputs.into_iter().enumerate() {
            let input = self.promise_resolve(value);
            let reaction = Reaction::Combine {
                combinator: id,
                index,
            };
            if let Err(e) = self
                .promises
                .register(input, reaction, &mut self.microtasks)
            {
                self.reject(result, e.into());
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(v: i64) -> Settlement {
        Settlement::Fulfilled(Value::Int(v))
    }

    fn err(s: &str) -> Settlement {
        Settlement::Rejected(Value::from(s))
    }

    #[test]
    fn all_waits_for_every_slot_in_input_order() {
        let mut store = CombinatorStore::new();
        let id = store.insert(CombinatorKind::All, 2, PromiseId(7));
        assert_eq!(store.offer(id, 1, ok(2)), None);
        let (promise, outcome) = store.offer(id, 0, ok(1)).unwrap();
        assert_eq!(promise, PromiseId(7));
        assert_eq!(
            outcome,
            Settlement::Fulfilled(Value::List(vec![Value::Int(1), Value::Int(2)]))
        );
        assert!(store.is_empty());
    }

    #[test]
    fn all_rejects_on_first_rejection_and_ignores_later() {
        let mut store = CombinatorStore::new();
        let id = store.insert(CombinatorKind::All, 3, PromiseId(0));
        let (_, outcome) = store.offer(id, 1, err("boom")).unwrap();
        assert_eq!(outcome, err("boom"));
        assert_eq!(store.offer(id, 0, ok(1)), None);
        assert_eq!(store.offer(id, 2, err("late")), None);
    }

    #[test]
    fn race_takes_first_settlement() {
        let mut store = CombinatorStore::new();
        let id = store.insert(CombinatorKind::Race, 2, PromiseId(0));
        assert_eq!(store.offer(id, 1, err("fast")).unwrap().1, err("fast"));
        assert_eq!(store.offer(id, 0, ok(1)), None);
    }

    #[test]
    fn all_settled_records_each_outcome() {
        let mut store = CombinatorStore::new();
        let id = store.insert(CombinatorKind::AllSettled, 2, PromiseId(0));
        assert_eq!(store.offer(id, 0, err("no")), None);
        let (_, outcome) = store.offer(id, 1, ok(3)).unwrap();
        let Settlement::Fulfilled(Value::List(records)) = outcome else {
            panic!("expected list");
        };
        assert_eq!(records[0].get("status"), Some(&Value::str("rejected")));
        assert_eq!(records[0].get("reason"), Some(&Value::str("no")));
        assert_eq!(records[1].get("status"), Some(&Value::str("fulfilled")));
        assert_eq!(records[1].get("value"), Some(&Value::Int(3)));
    }

    #[test]
    fn any_fulfils_on_first_success() {
        let mut store = CombinatorStore::new();
        let id = store.insert(CombinatorKind::Any, 2, PromiseId(0));
        assert_eq!(store.offer(id, 0, err("a")), None);
        assert_eq!(store.offer(id, 1, ok(5)).unwrap().1, ok(5));
    }

    #[test]
    fn any_aggregates_reasons_in_input_order() {
        let mut store = CombinatorStore::new();
        let id = store.insert(CombinatorKind::Any, 2, PromiseId(0));
        assert_eq!(store.offer(id, 1, err("second")), None);
        let (_, outcome) = store.offer(id, 0, err("first")).unwrap();
        assert_eq!(
            outcome,
            Settlement::Rejected(aggregate_error(vec![
                Value::str("first"),
                Value::str("second")
            ]))
        );
    }

    #[test]
    fn unknown_combinator_ignored() {
        let mut store = CombinatorStore::new();
        assert_eq!(store.offer(CombinatorId(99), 0, ok(1)), None);
    }
}
