// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Value type for nested heterogeneous data
//!
//! [`Value`] is the sum type every operation in this crate works on. Container
//! shapes are explicit variants, so the "is this a collection / record"
//! question is answered by a `match` at the API boundary rather than being
//! re-detected during traversal.

use super::adapter::{ContainerAdapter, CustomContainer};
use super::collection::Collection;
use super::record::Record;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// Ordered string-keyed map used for associative containers
pub type Map = IndexMap<String, Value>;

/// A nested data value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Explicit null
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Dense ordered sequence, keys are `0..n-1`
    List(Vec<Value>),
    /// Ordered associative map
    Map(Map),
    /// Record with named fields described by a schema
    Record(Record),
    /// Wrapped collection, sequence-like or map-like depending on its keys
    Collection(Collection),
    /// Container supplied by an external adapter
    Custom(CustomContainer),
}

impl Value {
    /// Create an empty map
    pub fn map() -> Self {
        Value::Map(Map::new())
    }

    /// Create an empty list
    pub fn list() -> Self {
        Value::List(Vec::new())
    }

    /// Empty container suitable for holding `key` as its first entry.
    ///
    /// A leading `"0"` starts a sequence, anything else starts a map.
    pub fn container_for_key(key: &str) -> Self {
        if key == "0" { Value::list() } else { Value::map() }
    }

    /// Human readable type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
            Value::Collection(_) => "collection",
            Value::Custom(_) => "custom",
        }
    }

    /// Whether the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether the value can be traversed by key
    pub fn is_container(&self) -> bool {
        self.as_container().is_some()
    }

    /// Container capabilities of this value, `None` for scalars
    pub fn as_container(&self) -> Option<&dyn ContainerAdapter> {
        match self {
            Value::List(items) => Some(items as &dyn ContainerAdapter),
            Value::Map(map) => Some(map as &dyn ContainerAdapter),
            Value::Record(record) => Some(record as &dyn ContainerAdapter),
            Value::Collection(collection) => Some(collection as &dyn ContainerAdapter),
            Value::Custom(custom) => Some(custom.adapter()),
            _ => None,
        }
    }

    /// Whether this container has sequence semantics
    pub fn is_sequence(&self) -> bool {
        match self {
            Value::List(_) => true,
            Value::Collection(collection) => collection.is_sequential(),
            Value::Custom(custom) => custom.adapter().is_sequential(),
            _ => false,
        }
    }

    /// String slice if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean if this is a bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer if this is an int
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Number as f64 for ints and floats
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Number as f64, also accepting numeric strings
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            other => other.as_f64(),
        }
    }

    /// Values of a container in key order, empty for scalars
    pub fn values(&self) -> Vec<Value> {
        match self.as_container() {
            Some(container) => container
                .keys_of()
                .iter()
                .filter_map(|key| container.get(key).cloned())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Text used when a value is interpolated into a string
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
            container => serde_json::Value::from(container.clone()).to_string(),
        }
    }

    /// Comparison used by WHERE predicates.
    ///
    /// Numbers compare numerically across int/float, a numeric string
    /// compares numerically against a number, strings compare
    /// lexicographically and booleans compare with booleans. Anything else is
    /// incomparable.
    pub fn loose_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_))
            | (Value::String(_), Value::Int(_) | Value::Float(_))
            | (Value::Int(_) | Value::Float(_), Value::String(_)) => {
                let a = self.as_number()?;
                let b = other.as_number()?;
                a.partial_cmp(&b)
            }
            _ => None,
        }
    }

    /// Equality used by WHERE predicates
    pub fn loose_eq(&self, other: &Value) -> bool {
        match self.loose_cmp(other) {
            Some(ordering) => ordering == Ordering::Equal,
            None => self == other,
        }
    }

    /// Total order used by ORDER BY.
    ///
    /// null < bool < number < string < container; values of the same rank
    /// compare naturally.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        fn rank(value: &Value) -> u8 {
            match value {
                Value::Null => 0,
                Value::Bool(_) => 1,
                Value::Int(_) | Value::Float(_) => 2,
                Value::String(_) => 3,
                _ => 4,
            }
        }

        match rank(self).cmp(&rank(other)) {
            Ordering::Equal => match (self, other) {
                (Value::Int(a), Value::Int(b)) => a.cmp(b),
                (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
                (Value::String(a), Value::String(b)) => a.cmp(b),
                (a, b) => match (a.as_f64(), b.as_f64()) {
                    (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                    _ => Ordering::Equal,
                },
            },
            ordering => ordering,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::String(s) => write!(f, "{s:?}"),
            other => f.write_str(&other.to_display_string()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        i64::try_from(value).map_or(Value::Float(value as f64), Value::Int)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(map)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record)
    }
}

impl From<Collection> for Value {
    fn from(collection: Collection) -> Self {
        Value::Collection(collection)
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Value::List(iter.into_iter().collect())
    }
}

impl FromIterator<(String, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Value::Map(iter.into_iter().collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map_or(Value::Null, Value::Float),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        fn object(map: Map) -> serde_json::Value {
            serde_json::Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect(),
            )
        }

        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::from(i),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::String(s) => serde_json::Value::String(s),
            Value::List(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            Value::Map(map) => object(map),
            Value::Record(record) => object(record.into_fields()),
            Value::Collection(collection) => {
                if collection.is_sequential() {
                    serde_json::Value::Array(
                        collection.into_items().into_values().map(Into::into).collect(),
                    )
                } else {
                    object(collection.into_items())
                }
            }
            Value::Custom(custom) => object(custom.adapter().to_canonical_array()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            Value::Float(_) => serializer.serialize_unit(),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(items) => serializer.collect_seq(items),
            Value::Map(map) => serializer.collect_map(map),
            Value::Record(record) => serializer.collect_map(record.fields()),
            Value::Collection(collection) if collection.is_sequential() => {
                serializer.collect_seq(collection.items().values())
            }
            Value::Collection(collection) => serializer.collect_map(collection.items()),
            Value::Custom(custom) => serializer.collect_map(custom.adapter().to_canonical_array()),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_conversion_preserves_order() {
        let value = Value::from(json!({"b": 1, "a": [true, null, 2.5], "c": "x"}));
        let Value::Map(map) = &value else {
            panic!("expected map");
        };
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["b", "a", "c"]);
        assert_eq!(
            serde_json::Value::from(value),
            json!({"b": 1, "a": [true, null, 2.5], "c": "x"})
        );
    }

    #[test]
    fn test_loose_comparison() {
        assert_eq!(Value::Int(2).loose_cmp(&Value::Float(1.5)), Some(Ordering::Greater));
        assert!(Value::from("100").loose_eq(&Value::Int(100)));
        assert!(!Value::from("abc").loose_eq(&Value::Int(0)));
        assert_eq!(Value::Bool(true).loose_cmp(&Value::Int(1)), None);
        assert!(Value::Null.loose_eq(&Value::Null));
    }

    #[test]
    fn test_sort_order_across_types() {
        let mut values = vec![
            Value::from("b"),
            Value::Int(3),
            Value::Null,
            Value::Float(1.5),
            Value::Bool(false),
            Value::from("a"),
        ];
        values.sort_by(Value::sort_cmp);
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Bool(false),
                Value::Float(1.5),
                Value::Int(3),
                Value::from("a"),
                Value::from("b"),
            ]
        );
    }

    #[test]
    fn test_display_string() {
        assert_eq!(Value::Null.to_display_string(), "");
        assert_eq!(Value::Float(2.0).to_display_string(), "2");
        assert_eq!(Value::from(json!([1, 2])).to_display_string(), "[1,2]");
    }
}
