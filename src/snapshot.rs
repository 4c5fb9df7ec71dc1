//! Immutable, copy-on-write views over JSON trees.
//!
//! Handlers frequently hand request bodies to concurrently running tasks. A
//! [`Snapshot`] copies the mutable JSON tree once at construction and never
//! mutates it afterwards; every derived view (merge, insert, remove, field
//! projection) builds a fresh snapshot, so a reader can never observe another
//! task's in-progress mutation. The backing storage is behind an `Arc`, which
//! makes cloning and cross-task sharing O(1) with no locking.

use serde_json::{Map, Value};
use std::ops::{Add, Sub};
use std::sync::Arc;

/// Immutable view over a JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    fields: Arc<Map<String, Value>>,
}

impl Snapshot {
    /// Build a snapshot by copying the given object.
    ///
    /// Non-object values produce an empty snapshot; the marshaller guards the
    /// only call sites where that distinction matters.
    #[must_use]
    pub fn new(value: &Value) -> Self {
        match value {
            Value::Object(map) => Snapshot {
                fields: Arc::new(map.clone()),
            },
            _ => Snapshot::empty(),
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Snapshot {
            fields: Arc::new(Map::new()),
        }
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    #[must_use]
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.fields.get(key).and_then(Value::as_i64)
    }

    #[must_use]
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(Value::as_f64)
    }

    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.fields.get(key).and_then(Value::as_bool)
    }

    /// Project a nested object field as its own snapshot.
    #[must_use]
    pub fn get_object(&self, key: &str) -> Option<Snapshot> {
        match self.fields.get(key) {
            Some(Value::Object(_)) => self.fields.get(key).map(Snapshot::new),
            _ => None,
        }
    }

    /// Project a nested array field as its own snapshot list.
    #[must_use]
    pub fn get_list(&self, key: &str) -> Option<SnapshotList> {
        match self.fields.get(key) {
            Some(v @ Value::Array(_)) => Some(SnapshotList::new(v)),
            _ => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// New snapshot with `key` set to `value`; the original is untouched.
    #[must_use]
    pub fn with(&self, key: &str, value: Value) -> Snapshot {
        let mut fields = (*self.fields).clone();
        fields.insert(key.to_string(), value);
        Snapshot {
            fields: Arc::new(fields),
        }
    }

    /// New snapshot without `key`; the original is untouched.
    #[must_use]
    pub fn without(&self, key: &str) -> Snapshot {
        let mut fields = (*self.fields).clone();
        fields.remove(key);
        Snapshot {
            fields: Arc::new(fields),
        }
    }

    /// New snapshot with the other's fields layered on top of this one.
    #[must_use]
    pub fn merged(&self, other: &Snapshot) -> Snapshot {
        let mut fields = (*self.fields).clone();
        for (k, v) in other.fields.iter() {
            fields.insert(k.clone(), v.clone());
        }
        Snapshot {
            fields: Arc::new(fields),
        }
    }

    /// Detach a plain JSON copy of this snapshot.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object((*self.fields).clone())
    }

    #[must_use]
    pub fn encode(&self) -> String {
        self.to_value().to_string()
    }
}

impl Add<&Snapshot> for &Snapshot {
    type Output = Snapshot;

    fn add(self, other: &Snapshot) -> Snapshot {
        self.merged(other)
    }
}

impl Sub<&str> for &Snapshot {
    type Output = Snapshot;

    fn sub(self, key: &str) -> Snapshot {
        self.without(key)
    }
}

/// Immutable view over a JSON array.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotList {
    items: Arc<Vec<Value>>,
}

impl SnapshotList {
    #[must_use]
    pub fn new(value: &Value) -> Self {
        match value {
            Value::Array(items) => SnapshotList {
                items: Arc::new(items.clone()),
            },
            _ => SnapshotList {
                items: Arc::new(Vec::new()),
            },
        }
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    #[must_use]
    pub fn get_object(&self, index: usize) -> Option<Snapshot> {
        match self.items.get(index) {
            Some(v @ Value::Object(_)) => Some(Snapshot::new(v)),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.items.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// New list with `value` appended.
    #[must_use]
    pub fn with(&self, value: Value) -> SnapshotList {
        let mut items = (*self.items).clone();
        items.push(value);
        SnapshotList {
            items: Arc::new(items),
        }
    }

    /// New list without the element at `index`; out of range is a no-op copy.
    #[must_use]
    pub fn without(&self, index: usize) -> SnapshotList {
        let mut items = (*self.items).clone();
        if index < items.len() {
            items.remove(index);
        }
        SnapshotList {
            items: Arc::new(items),
        }
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Array((*self.items).clone())
    }

    #[must_use]
    pub fn encode(&self) -> String {
        self.to_value().to_string()
    }
}

impl Add<Value> for &SnapshotList {
    type Output = SnapshotList;

    fn add(self, item: Value) -> SnapshotList {
        self.with(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_construction_copies() {
        let mut source = json!({ "a": 1 });
        let snap = Snapshot::new(&source);
        source["a"] = json!(2);
        assert_eq!(snap.get_i64("a"), Some(1));
    }

    #[test]
    fn test_derived_views_leave_original_untouched() {
        let snap = Snapshot::new(&json!({ "a": 1, "b": 2 }));
        let added = snap.with("c", json!(3));
        let removed = &snap - "a";

        assert_eq!(snap.len(), 2);
        assert!(snap.contains_key("a"));
        assert_eq!(added.get_i64("c"), Some(3));
        assert!(!removed.contains_key("a"));
        assert_eq!(removed.get_i64("b"), Some(2));
    }

    #[test]
    fn test_merge_overwrites_left_with_right() {
        let left = Snapshot::new(&json!({ "a": 1, "b": 2 }));
        let right = Snapshot::new(&json!({ "b": 20, "c": 30 }));
        let merged = &left + &right;
        assert_eq!(merged.get_i64("a"), Some(1));
        assert_eq!(merged.get_i64("b"), Some(20));
        assert_eq!(merged.get_i64("c"), Some(30));
    }

    #[test]
    fn test_field_projection() {
        let snap = Snapshot::new(&json!({
            "manufacturer": { "name": "Acme" },
            "tags": ["a", "b"]
        }));
        let nested = snap.get_object("manufacturer").unwrap();
        assert_eq!(nested.get_str("name"), Some("Acme"));

        let tags = snap.get_list("tags").unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags.get(0), Some(&json!("a")));
    }

    #[test]
    fn test_list_views() {
        let list = SnapshotList::new(&json!([1, 2, 3]));
        let extended = &list + json!(4);
        let shorter = list.without(0);
        assert_eq!(list.len(), 3);
        assert_eq!(extended.len(), 4);
        assert_eq!(shorter.get(0), Some(&json!(2)));
    }

    #[test]
    fn test_clone_shares_storage() {
        let snap = Snapshot::new(&json!({ "a": 1 }));
        let other = snap.clone();
        assert_eq!(snap, other);
        assert_eq!(other.to_value(), json!({ "a": 1 }));
    }
}
