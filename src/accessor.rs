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

//! Read access to nested data by dot-path
//!
//! A path without wildcards reads one value. A path with at least one
//! wildcard always reads a [`WildcardMatches`], even when it matched once
//! or not at all.

use crate::error::Result;
use crate::evaluator::{WildcardMatches, WildcardResolver};
use crate::model::{Map, TypeCoercion, Value};
use crate::parser::PathParser;

/// Result of a read
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Path without wildcards: the value, if present
    Single(Option<Value>),
    /// Path with wildcards: every match keyed by resolved path
    Wildcard(WildcardMatches),
}

impl Lookup {
    /// Whether the path contained a wildcard
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Lookup::Wildcard(_))
    }

    /// The single value; `None` for absent values and wildcard lookups
    pub fn into_single(self) -> Option<Value> {
        match self {
            Lookup::Single(value) => value,
            Lookup::Wildcard(_) => None,
        }
    }

    /// The matches of a wildcard lookup
    pub fn into_matches(self) -> Option<WildcardMatches> {
        match self {
            Lookup::Wildcard(matches) => Some(matches),
            Lookup::Single(_) => None,
        }
    }

    /// Flatten into a value: absent becomes null, matches become an
    /// ordered map of resolved path to value
    pub fn into_value(self) -> Value {
        match self {
            Lookup::Single(value) => value.unwrap_or_default(),
            Lookup::Wildcard(matches) => matches.into_value(),
        }
    }
}

/// Read facade over dot-paths
///
/// # Examples
///
/// ```rust
/// use octofhir_datapath::accessor::{Accessor, Lookup};
/// use octofhir_datapath::model::Value;
/// use serde_json::json;
///
/// let accessor = Accessor::new();
/// let data = Value::from(json!({"users": [{"name": "ada"}, {"name": "bob"}]}));
///
/// let name = accessor.get_or(&data, "users.0.name", Value::Null).unwrap();
/// assert_eq!(name, Value::from("ada"));
///
/// let Lookup::Wildcard(names) = accessor.get(&data, "users.*.name").unwrap() else {
///     unreachable!()
/// };
/// assert_eq!(names.get("users.1.name"), Some(&Value::from("bob")));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Accessor {
    paths: PathParser,
}

impl Accessor {
    /// Accessor using the process-wide path cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Accessor using a specific path parser
    pub fn with_parser(paths: PathParser) -> Self {
        Self { paths }
    }

    /// The path parser in use
    pub fn parser(&self) -> &PathParser {
        &self.paths
    }

    /// Read `path` from `data`
    pub fn get(&self, data: &Value, path: &str) -> Result<Lookup> {
        let parsed = self.paths.parse(path)?;
        if parsed.has_wildcard() {
            return Ok(Lookup::Wildcard(WildcardResolver::resolve(&parsed, data)));
        }
        Ok(Lookup::Single(
            WildcardResolver::resolve_single(&parsed, data).cloned(),
        ))
    }

    /// Read `path`, substituting `default` for an absent single value.
    ///
    /// Wildcard paths return the ordered match map, never the default.
    pub fn get_or(&self, data: &Value, path: &str, default: Value) -> Result<Value> {
        Ok(match self.get(data, path)? {
            Lookup::Single(value) => value.unwrap_or(default),
            Lookup::Wildcard(matches) => matches.into_value(),
        })
    }

    /// Whether `path` exists; a stored null counts as present
    pub fn has(&self, data: &Value, path: &str) -> Result<bool> {
        let parsed = self.paths.parse(path)?;
        Ok(WildcardResolver::contains(&parsed, data))
    }

    fn typed<T>(
        &self,
        data: &Value,
        path: &str,
        default: T,
        coerce: impl FnOnce(&Value) -> Option<T>,
    ) -> Result<T> {
        Ok(match self.get(data, path)? {
            Lookup::Single(Some(value)) => coerce(&value).unwrap_or(default),
            _ => default,
        })
    }

    /// Read a string, falling back to `default` on absence or failed coercion
    pub fn get_string(&self, data: &Value, path: &str, default: &str) -> Result<String> {
        self.typed(data, path, default.to_string(), |value| {
            TypeCoercion::coerce_to_string(value).ok()
        })
    }

    /// Read an integer, falling back to `default`
    pub fn get_int(&self, data: &Value, path: &str, default: i64) -> Result<i64> {
        self.typed(data, path, default, |value| {
            TypeCoercion::coerce_to_integer(value).ok()
        })
    }

    /// Read a float, falling back to `default`
    pub fn get_float(&self, data: &Value, path: &str, default: f64) -> Result<f64> {
        self.typed(data, path, default, |value| {
            TypeCoercion::coerce_to_float(value).ok()
        })
    }

    /// Read a boolean, falling back to `default`
    pub fn get_bool(&self, data: &Value, path: &str, default: bool) -> Result<bool> {
        self.typed(data, path, default, |value| {
            TypeCoercion::coerce_to_boolean(value).ok()
        })
    }

    /// Read a container as an ordered map.
    ///
    /// Wildcard paths return their match map.
    pub fn get_array(&self, data: &Value, path: &str, default: Map) -> Result<Map> {
        Ok(match self.get(data, path)? {
            Lookup::Single(Some(value)) => TypeCoercion::coerce_to_array(&value).unwrap_or(default),
            Lookup::Single(None) => default,
            Lookup::Wildcard(matches) => matches.to_map(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn data() -> Value {
        Value::from(json!({
            "user": {"name": "ada", "age": "36", "active": "yes", "score": 9.5, "nick": null},
            "tags": ["x"]
        }))
    }

    #[test]
    fn test_return_shape_follows_wildcards() {
        let accessor = Accessor::new();
        let data = data();

        assert_eq!(
            accessor.get(&data, "user.name").unwrap(),
            Lookup::Single(Some(Value::from("ada")))
        );
        assert_eq!(accessor.get(&data, "user.none").unwrap(), Lookup::Single(None));

        let single = accessor.get(&data, "tags.*").unwrap().into_matches().unwrap();
        assert_eq!(single.len(), 1);
        let empty = accessor.get(&data, "missing.*").unwrap();
        assert!(empty.is_wildcard());
        assert_eq!(empty.into_value(), Value::map());
    }

    #[test]
    fn test_get_or_default() {
        let accessor = Accessor::new();
        let data = data();
        assert_eq!(
            accessor.get_or(&data, "user.none", Value::from("d")).unwrap(),
            Value::from("d")
        );
        assert_eq!(
            accessor.get_or(&data, "user.nick", Value::from("d")).unwrap(),
            Value::Null
        );
        assert_eq!(
            accessor.get_or(&data, "tags.*", Value::from("d")).unwrap(),
            Value::from(json!({"tags.0": "x"}))
        );
    }

    #[test]
    fn test_has_with_null() {
        let accessor = Accessor::new();
        let data = data();
        assert!(accessor.has(&data, "user.nick").unwrap());
        assert!(!accessor.has(&data, "user.email").unwrap());
        assert!(accessor.has(&data, "tags.*").unwrap());
        assert!(!accessor.has(&data, "user.name.first").unwrap());
    }

    #[test]
    fn test_typed_getters() {
        let accessor = Accessor::new();
        let data = data();
        assert_eq!(accessor.get_int(&data, "user.age", 0).unwrap(), 36);
        assert_eq!(accessor.get_int(&data, "user.name", -1).unwrap(), -1);
        assert!(accessor.get_bool(&data, "user.active", false).unwrap());
        assert_eq!(accessor.get_float(&data, "user.score", 0.0).unwrap(), 9.5);
        assert_eq!(accessor.get_string(&data, "user.score", "").unwrap(), "9.5");
        assert_eq!(accessor.get_string(&data, "user.nick", "none").unwrap(), "none");
        assert_eq!(accessor.get_int(&data, "tags.*", 7).unwrap(), 7);
        assert_eq!(accessor.get_array(&data, "user", Map::new()).unwrap().len(), 5);
    }

    #[test]
    fn test_syntax_errors_propagate() {
        let accessor = Accessor::new();
        assert!(matches!(
            accessor.get(&data(), "user..name"),
            Err(Error::PathSyntax(_))
        ));
        assert!(accessor.get_int(&data(), ".user", 0).is_err());
    }
}
