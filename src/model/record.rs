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

//! Schema-backed records
//!
//! A [`Record`] is a plain structure with named fields. Field names come
//! from a [`RecordSchema`], either declared by hand or derived once per Rust
//! type from its `serde` serialization and kept in a process-wide schema
//! table, so field access never needs runtime reflection.

use super::adapter::{ContainerAdapter, ContainerKind};
use super::value::{Map, Value};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

static SCHEMAS: Lazy<RwLock<FxHashMap<&'static str, Arc<RecordSchema>>>> =
    Lazy::new(|| RwLock::new(FxHashMap::default()));

/// Field layout of a record type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    name: String,
    fields: Vec<String>,
    dynamic: bool,
}

impl RecordSchema {
    /// Strict schema: only declared fields can be written
    pub fn new<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            dynamic: false,
        }
    }

    /// Schema that also accepts fields it does not declare
    pub fn dynamic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            dynamic: true,
        }
    }

    /// Record type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared fields in declaration order
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Whether undeclared fields may be added
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Whether `field` may be written
    pub fn accepts(&self, field: &str) -> bool {
        self.dynamic || self.fields.iter().any(|f| f == field)
    }

    /// Schema registered for `T`, if any
    pub fn registered<T: ?Sized + 'static>() -> Option<Arc<RecordSchema>> {
        SCHEMAS.read().get(std::any::type_name::<T>()).cloned()
    }

    /// Register the schema for `T`, replacing any previous one
    pub fn register<T: ?Sized + 'static>(schema: RecordSchema) -> Arc<RecordSchema> {
        let schema = Arc::new(schema);
        SCHEMAS
            .write()
            .insert(std::any::type_name::<T>(), schema.clone());
        schema
    }
}

/// A record value: schema plus stored field values
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: Arc<RecordSchema>,
    fields: Map,
}

impl Record {
    /// Empty record for a schema
    pub fn new(schema: Arc<RecordSchema>) -> Self {
        Self {
            schema,
            fields: Map::new(),
        }
    }

    /// Record with initial field values; undeclared fields of a strict
    /// schema are dropped.
    pub fn with_fields(schema: Arc<RecordSchema>, fields: Map) -> Self {
        let fields = fields
            .into_iter()
            .filter(|(name, _)| schema.accepts(name))
            .collect();
        Self { schema, fields }
    }

    /// Build a record from any serializable struct.
    ///
    /// The schema for `T` is derived from its serialized field names the first
    /// time and reused afterwards.
    pub fn from_serialize<T: Serialize + 'static>(value: &T) -> Result<Self, serde_json::Error> {
        let serde_json::Value::Object(object) = serde_json::to_value(value)? else {
            return Err(serde::ser::Error::custom(format!(
                "{} does not serialize to an object",
                std::any::type_name::<T>()
            )));
        };
        let schema = RecordSchema::registered::<T>().unwrap_or_else(|| {
            let short_name = std::any::type_name::<T>()
                .rsplit("::")
                .next()
                .unwrap_or_default()
                .to_string();
            RecordSchema::register::<T>(RecordSchema::new(short_name, object.keys().cloned()))
        });
        let fields = object
            .into_iter()
            .map(|(name, value)| (name, Value::from(value)))
            .collect();
        Ok(Self::with_fields(schema, fields))
    }

    /// Convert back into a typed struct
    pub fn to_typed<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(serde_json::Value::from(Value::Record(self.clone())))
    }

    /// Record schema
    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    /// Stored field values
    pub fn fields(&self) -> &Map {
        &self.fields
    }

    /// Consume into the stored field values
    pub fn into_fields(self) -> Map {
        self.fields
    }
}

impl ContainerAdapter for Record {
    fn kind(&self) -> ContainerKind {
        ContainerKind::Record
    }

    fn keys_of(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    fn has(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    fn len(&self) -> usize {
        self.fields.len()
    }

    fn with_set(&self, key: &str, value: Value) -> Value {
        let mut record = self.clone();
        if self.schema.accepts(key) {
            record.fields.insert(key.to_string(), value);
        } else {
            log::debug!(
                "ignoring write to undeclared field '{key}' on record '{}'",
                self.schema.name()
            );
        }
        Value::Record(record)
    }

    fn with_unset(&self, key: &str) -> Value {
        let mut record = self.clone();
        record.fields.shift_remove(key);
        Value::Record(record)
    }

    fn cleared(&self) -> Value {
        Value::Record(Record::new(self.schema.clone()))
    }

    fn to_canonical_array(&self) -> Map {
        self.fields.clone()
    }

    fn to_value(&self) -> Value {
        Value::Record(self.clone())
    }
}
