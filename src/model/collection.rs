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

//! Wrapped collections
//!
//! Collection wrappers delegate to list semantics while their keys are
//! `0..n-1` and to map semantics otherwise. Writes always produce another
//! [`Collection`].

use super::adapter::{ContainerAdapter, ContainerKind, parse_index};
use super::value::{Map, Value};

/// Ordered key/value collection wrapper
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Collection {
    items: Map,
}

impl Collection {
    /// Empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Collection over an associative map
    pub fn from_map(items: Map) -> Self {
        Self { items }
    }

    /// Stored items
    pub fn items(&self) -> &Map {
        &self.items
    }

    /// Consume into the stored items
    pub fn into_items(self) -> Map {
        self.items
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the collection is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether keys are exactly `0..n-1`
    pub fn is_sequential(&self) -> bool {
        self.items
            .keys()
            .enumerate()
            .all(|(i, key)| parse_index(key) == Some(i))
    }
}

impl FromIterator<Value> for Collection {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self {
            items: iter
                .into_iter()
                .enumerate()
                .map(|(i, item)| (i.to_string(), item))
                .collect(),
        }
    }
}

impl From<Vec<Value>> for Collection {
    fn from(items: Vec<Value>) -> Self {
        items.into_iter().collect()
    }
}

impl ContainerAdapter for Collection {
    fn kind(&self) -> ContainerKind {
        ContainerKind::Collection
    }

    fn keys_of(&self) -> Vec<String> {
        self.items.keys().cloned().collect()
    }

    fn get(&self, key: &str) -> Option<&Value> {
        self.items.get(key)
    }

    fn has(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn is_sequential(&self) -> bool {
        Collection::is_sequential(self)
    }

    fn with_set(&self, key: &str, value: Value) -> Value {
        let mut items = self.items.clone();
        items.insert(key.to_string(), value);
        Value::Collection(Collection { items })
    }

    fn with_set_many(&self, entries: Vec<(String, Value)>) -> Value {
        let mut items = self.items.clone();
        items.extend(entries);
        Value::Collection(Collection { items })
    }

    fn with_unset(&self, key: &str) -> Value {
        let mut items = self.items.clone();
        items.shift_remove(key);
        Value::Collection(Collection { items })
    }

    fn cleared(&self) -> Value {
        Value::Collection(Collection::new())
    }

    fn to_canonical_array(&self) -> Map {
        self.items.clone()
    }

    fn to_value(&self) -> Value {
        Value::Collection(self.clone())
    }
}
