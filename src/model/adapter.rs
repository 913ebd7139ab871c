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

//! Container capabilities
//!
//! [`ContainerAdapter`] is the uniform read/write contract the resolver,
//! accessor and mutator use to walk nested data. Every write returns a new
//! [`Value`] of the same concrete kind; nothing is mutated in place.
//!
//! Implementations exist for ordered maps, dense lists, schema-backed
//! records and wrapped collections. Framework layers plug their own shapes
//! in through [`CustomContainer`].

use super::collection::Collection;
use super::value::{Map, Value};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Concrete container shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// Ordered associative map
    Map,
    /// Dense sequence
    List,
    /// Schema-backed record
    Record,
    /// Wrapped collection
    Collection,
    /// Externally supplied container
    Custom,
}

/// Read/write capabilities of a nested-data container
pub trait ContainerAdapter: fmt::Debug + Send + Sync {
    /// Concrete shape of the container
    fn kind(&self) -> ContainerKind;

    /// Keys in iteration order
    fn keys_of(&self) -> Vec<String>;

    /// Value stored under `key`
    fn get(&self, key: &str) -> Option<&Value>;

    /// Whether `key` is present, including keys holding null
    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of entries
    fn len(&self) -> usize {
        self.keys_of().len()
    }

    /// Whether the container has no entries
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether keys are exactly `0..n-1` in order
    fn is_sequential(&self) -> bool {
        self.keys_of()
            .iter()
            .enumerate()
            .all(|(i, key)| parse_index(key) == Some(i))
    }

    /// Copy of this container with `key` set to `value`
    fn with_set(&self, key: &str, value: Value) -> Value;

    /// Copy of this container with several keys set, applied in order
    fn with_set_many(&self, entries: Vec<(String, Value)>) -> Value {
        let mut current = self.to_value();
        for (key, value) in entries {
            let next = match current.as_container() {
                Some(container) => container.with_set(&key, value),
                None => continue,
            };
            current = next;
        }
        current
    }

    /// Copy of this container without `key`
    fn with_unset(&self, key: &str) -> Value;

    /// Empty container of the same kind
    fn cleared(&self) -> Value;

    /// Ordered string-keyed view used for serialization and merges
    fn to_canonical_array(&self) -> Map;

    /// This container as an owned value
    fn to_value(&self) -> Value;
}

/// Parse a canonical sequence index (`"0"`, `"12"`, never `"01"` or `"-1"`)
pub fn parse_index(key: &str) -> Option<usize> {
    let canonical = !key.is_empty()
        && key.bytes().all(|b| b.is_ascii_digit())
        && (key == "0" || !key.starts_with('0'));
    if canonical { key.parse().ok() } else { None }
}

pub(crate) fn list_to_map(items: Vec<Value>) -> Map {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| (i.to_string(), item))
        .collect()
}

/// Sequence-kind wrapper over a list that is about to lose its dense keys
fn gapped(items: Vec<Value>, edit: impl FnOnce(&mut Map)) -> Value {
    let mut map = list_to_map(items);
    edit(&mut map);
    Value::Collection(Collection::from_map(map))
}

/// Set `key` on an owned list, converting to a gap-preserving [`Collection`]
/// when the key does not extend the dense index range.
pub(crate) fn list_set_owned(mut items: Vec<Value>, key: &str, value: Value) -> Value {
    match parse_index(key) {
        Some(index) if index < items.len() => {
            items[index] = value;
            Value::List(items)
        }
        Some(index) if index == items.len() => {
            items.push(value);
            Value::List(items)
        }
        _ => {
            log::trace!("list write at '{key}' is not dense, converting to collection");
            gapped(items, |map| {
                map.insert(key.to_string(), value);
            })
        }
    }
}

impl ContainerAdapter for Vec<Value> {
    fn kind(&self) -> ContainerKind {
        ContainerKind::List
    }

    fn keys_of(&self) -> Vec<String> {
        (0..self.len()).map(|i| i.to_string()).collect()
    }

    fn get(&self, key: &str) -> Option<&Value> {
        parse_index(key).and_then(|index| self.as_slice().get(index))
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn is_sequential(&self) -> bool {
        true
    }

    fn with_set(&self, key: &str, value: Value) -> Value {
        list_set_owned(self.clone(), key, value)
    }

    fn with_set_many(&self, entries: Vec<(String, Value)>) -> Value {
        let mut current = Value::List(self.clone());
        for (key, value) in entries {
            current = match current {
                Value::List(items) => list_set_owned(items, &key, value),
                Value::Collection(collection) => collection.with_set(&key, value),
                other => other,
            };
        }
        current
    }

    fn with_unset(&self, key: &str) -> Value {
        match parse_index(key) {
            Some(index) if index + 1 == Vec::len(self) => {
                let mut items = self.clone();
                items.pop();
                Value::List(items)
            }
            Some(index) if index < Vec::len(self) => gapped(self.clone(), |map| {
                map.shift_remove(key);
            }),
            _ => Value::List(self.clone()),
        }
    }

    fn cleared(&self) -> Value {
        Value::list()
    }

    fn to_value(&self) -> Value {
        Value::List(self.clone())
    }

    fn to_canonical_array(&self) -> Map {
        list_to_map(self.clone())
    }
}

impl ContainerAdapter for IndexMap<String, Value> {
    fn kind(&self) -> ContainerKind {
        ContainerKind::Map
    }

    fn keys_of(&self) -> Vec<String> {
        self.keys().cloned().collect()
    }

    fn get(&self, key: &str) -> Option<&Value> {
        IndexMap::get(self, key)
    }

    fn has(&self, key: &str) -> bool {
        self.contains_key(key)
    }

    fn len(&self) -> usize {
        IndexMap::len(self)
    }

    fn with_set(&self, key: &str, value: Value) -> Value {
        let mut map = self.clone();
        map.insert(key.to_string(), value);
        Value::Map(map)
    }

    fn with_set_many(&self, entries: Vec<(String, Value)>) -> Value {
        let mut map = self.clone();
        map.extend(entries);
        Value::Map(map)
    }

    fn with_unset(&self, key: &str) -> Value {
        let mut map = self.clone();
        map.shift_remove(key);
        Value::Map(map)
    }

    fn cleared(&self) -> Value {
        Value::map()
    }

    fn to_value(&self) -> Value {
        Value::Map(self.clone())
    }

    fn to_canonical_array(&self) -> Map {
        self.clone()
    }
}

/// Shared handle to an externally implemented container
#[derive(Clone)]
pub struct CustomContainer(Arc<dyn ContainerAdapter>);

impl CustomContainer {
    /// Wrap an adapter implementation
    pub fn new<A: ContainerAdapter + 'static>(adapter: A) -> Self {
        Self(Arc::new(adapter))
    }

    /// The wrapped adapter
    pub fn adapter(&self) -> &dyn ContainerAdapter {
        self.0.as_ref()
    }
}

impl fmt::Debug for CustomContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CustomContainer").field(&self.0).finish()
    }
}

impl PartialEq for CustomContainer {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
            || (self.0.kind() == other.0.kind()
                && self.0.to_canonical_array() == other.0.to_canonical_array())
    }
}

impl From<CustomContainer> for Value {
    fn from(custom: CustomContainer) -> Self {
        Value::Custom(custom)
    }
}
