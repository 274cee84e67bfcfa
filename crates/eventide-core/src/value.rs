//! The script value model.
//!
//! [`Value`] is the dynamically typed payload carried by promises, emitted
//! into the trace, and passed to callbacks. It is deliberately small: the
//! simulator cares about *when* things happen, not about a full object
//! model. Records (`allSettled` results, `AggregateError`) use an
//! insertion-ordered [`IndexMap`] so their printed form is stable.

use std::fmt;

use indexmap::IndexMap;

use crate::id::PromiseId;

/// A script-level value.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// `undefined`.
    #[default]
    Undefined,
    /// `null`.
    Null,
    /// A boolean.
    Bool(bool),
    /// An integer number.
    Int(i64),
    /// A string.
    Str(String),
    /// An ordered list (array).
    List(Vec<Value>),
    /// A record with insertion-ordered keys.
    Object(IndexMap<String, Value>),
    /// An error object carrying a message.
    Error(String),
    /// A reference to a promise. Resolving another promise with this
    /// value adopts its eventual state instead of fulfilling directly.
    Promise(PromiseId),
}

impl Value {
    /// Build a [`Value::Str`].
    pub fn str(s: impl Into<String>) -> Value {
        Value::Str(s.into())
    }

    /// Build a [`Value::Error`].
    pub fn error(message: impl Into<String>) -> Value {
        Value::Error(message.into())
    }

    /// Build a [`Value::Object`] from `(key, value)` pairs, keeping their order.
    pub fn record<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Value {
        Value::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// The promise this value refers to, if it is a thenable.
    pub fn as_promise(&self) -> Option<PromiseId> {
        match self {
            Value::Promise(id) => Some(*id),
            _ => None,
        }
    }

    /// The string contents, if this is a [`Value::Str`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The integer, if this is a [`Value::Int`].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Look up a key on a [`Value::Object`].
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Whether this value is `undefined`.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Object(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, " {k}: {v}")?;
                }
                if map.is_empty() {
                    write!(f, "}}")
                } else {
                    write!(f, " }}")
                }
            }
            Value::Error(msg) => write!(f, "Error: {msg}"),
            Value::Promise(id) => write!(f, "Promise({})", id.0),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<PromiseId> for Value {
    fn from(id: PromiseId) -> Self {
        Value::Promise(id)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Undefined
    }
}

/// The outcome of running a script callback.
///
/// `Ok(v)` is a normal return of `v`; `Err(v)` is a throw of `v`.
pub type Completion = Result<Value, Value>;

/// The final outcome of a settled promise.
#[derive(Clone, Debug, PartialEq)]
pub enum Settlement {
    /// The promise was fulfilled with a value.
    Fulfilled(Value),
    /// The promise was rejected with a reason.
    Rejected(Value),
}

impl Settlement {
    /// The fulfillment value or rejection reason.
    pub fn value(&self) -> &Value {
        match self {
            Settlement::Fulfilled(v) | Settlement::Rejected(v) => v,
        }
    }

    /// Whether this is a fulfillment.
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Settlement::Fulfilled(_))
    }

    /// Whether this is a rejection.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Settlement::Rejected(_))
    }

    /// View the settlement as the completion an awaiting step receives.
    pub fn into_completion(self) -> Completion {
        match self {
            Settlement::Fulfilled(v) => Ok(v),
            Settlement::Rejected(v) => Err(v),
        }
    }
}

impl From<Completion> for Settlement {
    fn from(c: Completion) -> Self {
        match c {
            Ok(v) => Settlement::Fulfilled(v),
            Err(v) => Settlement::Rejected(v),
        }
    }
}

impl fmt::Display for Settlement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Settlement::Fulfilled(v) => write!(f, "fulfilled({v})"),
            Settlement::Rejected(v) => write!(f, "rejected({v})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_script_conventions() {
        assert_eq!(Value::Undefined.to_string(), "undefined");
        assert_eq!(Value::from("A").to_string(), "A");
        assert_eq!(
            Value::List(vec![Value::Int(1), Value::from("two")]).to_string(),
            "[1, two]"
        );
        assert_eq!(Value::error("boom").to_string(), "Error: boom");
        assert_eq!(Value::Object(IndexMap::new()).to_string(), "{}");
    }

    #[test]
    fn record_keeps_insertion_order() {
        let rec = Value::record([("status", Value::from("fulfilled")), ("value", Value::Int(1))]);
        assert_eq!(rec.to_string(), "{ status: fulfilled, value: 1 }");
        assert_eq!(rec.get("value"), Some(&Value::Int(1)));
        assert_eq!(rec.get("reason"), None);
    }

    #[test]
    fn settlement_round_trips_through_completion() {
        let s = Settlement::Rejected(Value::error("x"));
        assert!(s.is_rejected());
        let c = s.clone().into_completion();
        assert_eq!(Settlement::from(c), s);
    }

    #[test]
    fn promise_values_are_thenables() {
        let v = Value::from(PromiseId(4));
        assert_eq!(v.as_promise(), Some(PromiseId(4)));
        assert_eq!(Value::Int(4).as_promise(), None);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn list_display_joins_items(items in prop::collection::vec(any::<i64>(), 0..16)) {
                let expected = format!(
                    "[{}]",
                    items.iter().map(i64::to_string).collect::<Vec<_>>().join(", ")
                );
                let list = Value::List(items.into_iter().map(Value::Int).collect());
                prop_assert_eq!(list.to_string(), expected);
            }

            #[test]
            fn record_lookup_finds_every_key(
                keys in prop::collection::btree_set("[a-z]{1,6}", 1..8)
            ) {
                let rec = Value::record(
                    keys.iter().enumerate().map(|(i, k)| (k.clone(), Value::Int(i as i64))),
                );
                for (i, k) in keys.iter().enumerate() {
                    prop_assert_eq!(rec.get(k), Some(&Value::Int(i as i64)));
                }
            }
        }
    }
}
