//! The local key-value store a Shard owns: `local_name -> Value`, plus the
//! modification history used for last-writer-wins conflict resolution.
//!
//! No interior locking: a Shard's dispatch loop is the sole owner of its
//! `Store` and is never re-entered concurrently (§5 of SPEC_FULL.md).

use std::collections::HashMap;

use crate::clock::Timestamp;
use crate::transform::{Fold, Op, Pred};
use crate::wire::{LocalName, Value};

/// `(timestamp, committed)` per variable, mirroring the original's
/// `__modif_history` pair.
#[derive(Debug, Clone, Copy)]
struct History {
    ts: Timestamp,
    committed: bool,
}

#[derive(Default)]
pub struct Store {
    vars: HashMap<LocalName, Value>,
    history: HashMap<LocalName, History>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: LocalName, value: Value) {
        self.vars.insert(name, value);
    }

    pub fn get(&self, name: &LocalName) -> Option<Value> {
        self.vars.get(name).cloned()
    }

    pub fn contains(&self, name: &LocalName) -> bool {
        self.vars.contains_key(name)
    }

    /// Remove `name` and return the element count freed (1 for `Int`, the
    /// list length otherwise), or `None` if it was already absent.
    pub fn remove(&mut self, name: &LocalName) -> Option<usize> {
        self.history.remove(name);
        self.vars.remove(name).map(|v| v.len())
    }

    /// Last-writer-wins update, per §4.3 of SPEC_FULL.md:
    /// - no prior history, or the incoming timestamp is `>=` the previous
    ///   one *and* the previous write had already committed: accept.
    /// - otherwise (older write, or a concurrent write still mid-flight):
    ///   reject.
    ///
    /// `index` is `Some(local_index)` to overwrite one element of a `List`
    /// stripe, or `None` to replace an `Int` variable wholesale. A shape
    /// mismatch (e.g. an index against an `Int`, or none against a `List`)
    /// is rejected the same way a stale write is.
    ///
    /// Returns `false` without touching the store if `name` is absent:
    /// `MODIFY` on a missing name is not an error, it is a rejected write.
    pub fn modify(
        &mut self,
        name: &LocalName,
        new_value: i64,
        index: Option<usize>,
        ts: Timestamp,
        now: Timestamp,
    ) -> bool {
        if !self.vars.contains_key(name) {
            return false;
        }

        if let Some(prev) = self.history.get(name) {
            if ts < prev.ts || !prev.committed {
                return false;
            }
        }

        self.history.insert(
            name.clone(),
            History {
                ts: now,
                committed: false,
            },
        );

        let applied = match (self.vars.get_mut(name).expect("checked above"), index) {
            (Value::Int(slot), None) => {
                *slot = new_value;
                true
            }
            (Value::List(xs), Some(i)) if i < xs.len() => {
                xs[i] = new_value;
                true
            }
            _ => false,
        };

        self.history.insert(
            name.clone(),
            History {
                ts: now,
                committed: true,
            },
        );
        applied
    }

    /// Apply `op` pointwise. Silent no-op if `name` is absent, per §4.3.
    pub fn map(&mut self, name: &LocalName, op: Op) {
        if let Some(value) = self.vars.get_mut(name) {
            match value {
                Value::Int(x) => *x = op.apply(*x),
                Value::List(xs) => {
                    for x in xs.iter_mut() {
                        *x = op.apply(*x);
                    }
                }
            }
        }
    }

    /// Apply `pred`, dropping non-matching elements. Returns
    /// `(removed_count, still_present)`, removing the entry entirely when
    /// nothing survives. `None` if `name` is absent.
    pub fn filter(&mut self, name: &LocalName, pred: Pred) -> Option<(usize, bool)> {
        let value = self.vars.get(name)?.clone();
        match value {
            Value::Int(x) => {
                if pred.eval(x) {
                    Some((0, true))
                } else {
                    self.vars.remove(name);
                    self.history.remove(name);
                    Some((1, false))
                }
            }
            Value::List(xs) => {
                let original_len = xs.len();
                let retained: Vec<i64> = xs.into_iter().filter(|&x| pred.eval(x)).collect();
                let removed = original_len - retained.len();
                if retained.is_empty() {
                    self.vars.remove(name);
                    self.history.remove(name);
                    Some((removed, false))
                } else {
                    self.vars.insert(name.clone(), Value::List(retained));
                    Some((removed, true))
                }
            }
        }
    }

    /// Fold `fold` over the local value, starting from `acc`, in natural
    /// order. `None` if `name` is absent.
    pub fn reduce_local(&self, name: &LocalName, fold: Fold, acc: i64) -> Option<i64> {
        let value = self.vars.get(name)?;
        Some(match value {
            Value::Int(x) => fold.apply(acc, *x),
            Value::List(xs) => xs.iter().fold(acc, |a, &x| fold.apply(a, x)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name() -> LocalName {
        LocalName::new(1, 0)
    }

    #[test]
    fn modify_accepts_first_write() {
        let mut store = Store::new();
        store.insert(name(), Value::Int(1));
        assert!(store.modify(&name(), 99, None, Timestamp(10), Timestamp(10)));
        assert_eq!(store.get(&name()), Some(Value::Int(99)));
    }

    #[test]
    fn modify_rejects_stale_timestamp() {
        let mut store = Store::new();
        store.insert(name(), Value::Int(1));
        assert!(store.modify(&name(), 10, None, Timestamp(10), Timestamp(10)));
        assert!(!store.modify(&name(), 20, None, Timestamp(5), Timestamp(11)));
        assert_eq!(store.get(&name()), Some(Value::Int(10)));
    }

    #[test]
    fn modify_on_missing_name_returns_false() {
        let mut store = Store::new();
        assert!(!store.modify(&name(), 1, None, Timestamp(1), Timestamp(1)));
    }

    #[test]
    fn modify_list_element_by_local_index() {
        let mut store = Store::new();
        store.insert(name(), Value::List(vec![1, 2, 3]));
        assert!(store.modify(&name(), 42, Some(1), Timestamp(1), Timestamp(1)));
        assert_eq!(store.get(&name()), Some(Value::List(vec![1, 42, 3])));
    }

    #[test]
    fn modify_rejects_index_shape_mismatch() {
        let mut store = Store::new();
        store.insert(name(), Value::Int(1));
        assert!(!store.modify(&name(), 1, Some(0), Timestamp(1), Timestamp(1)));
    }

    #[test]
    fn map_is_silent_no_op_on_missing_name() {
        let mut store = Store::new();
        store.map(&name(), Op::Double); // must not panic
    }

    #[test]
    fn filter_int_removes_entry_when_predicate_fails() {
        let mut store = Store::new();
        store.insert(name(), Value::Int(4));
        let (removed, present) = store.filter(&name(), Pred::IsOdd).unwrap();
        assert_eq!((removed, present), (1, false));
        assert!(!store.contains(&name()));
    }

    #[test]
    fn filter_list_retains_matching_and_reports_diff() {
        let mut store = Store::new();
        store.insert(name(), Value::List(vec![1, 2, 3, 4, 5]));
        let (removed, present) = store.filter(&name(), Pred::IsEven).unwrap();
        assert_eq!(removed, 3);
        assert!(present);
        assert_eq!(store.get(&name()), Some(Value::List(vec![2, 4])));
    }

    #[test]
    fn filter_list_drops_entry_when_nothing_survives() {
        let mut store = Store::new();
        store.insert(name(), Value::List(vec![1, 3, 5]));
        let (removed, present) = store.filter(&name(), Pred::IsEven).unwrap();
        assert_eq!(removed, 3);
        assert!(!present);
        assert!(!store.contains(&name()));
    }
}
