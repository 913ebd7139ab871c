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

//! Wildcard resolution
//!
//! Walks a [`Path`] left to right over a root [`Value`], carrying a list of
//! bindings. A literal segment advances each binding by one key and drops
//! bindings that miss it. A wildcard segment fans each binding out over the
//! keys of its own container, so nested wildcards only ever expand the
//! branch that was actually walked.

use crate::ast::{Path, ResolvedPath, Segment};
use crate::model::{Map, Value};
use std::fmt;

/// In-progress traversal state: resolved keys so far and the value reached
type Binding<'a> = (ResolvedPath, &'a Value);

/// Every concrete match of a wildcard path, in traversal order
///
/// This is the return shape of a wildcard read and the input of a wildcard
/// write: entries remember which keys the wildcards bound to, so they can
/// be replayed onto another pattern.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WildcardMatches {
    pattern: Path,
    entries: Vec<(ResolvedPath, Value)>,
}

impl WildcardMatches {
    /// Create a match set for `pattern`
    pub fn new(pattern: Path, entries: Vec<(ResolvedPath, Value)>) -> Self {
        Self { pattern, entries }
    }

    /// The pattern that produced the matches
    pub fn pattern(&self) -> &Path {
        &self.pattern
    }

    /// Matches in traversal order
    pub fn entries(&self) -> &[(ResolvedPath, Value)] {
        &self.entries
    }

    /// Iterate over `(resolved path, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = &(ResolvedPath, Value)> {
        self.entries.iter()
    }

    /// Number of matches
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing matched
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value at a dotted resolved path
    pub fn get(&self, resolved: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(path, _)| path.to_string() == resolved)
            .map(|(_, value)| value)
    }

    /// Matched values in order
    pub fn values(&self) -> Vec<Value> {
        self.entries.iter().map(|(_, value)| value.clone()).collect()
    }

    /// Ordered map of dotted resolved path to value
    pub fn to_map(&self) -> Map {
        self.entries
            .iter()
            .map(|(path, value)| (path.to_string(), value.clone()))
            .collect()
    }

    /// Consume into the ordered map form
    pub fn into_value(self) -> Value {
        Value::Map(
            self.entries
                .into_iter()
                .map(|(path, value)| (path.to_string(), value))
                .collect(),
        )
    }

    /// Consume into the raw entries
    pub fn into_entries(self) -> Vec<(ResolvedPath, Value)> {
        self.entries
    }
}

impl fmt::Display for WildcardMatches {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} matches)", self.pattern, self.entries.len())
    }
}

/// Resolves paths, wildcards included, against nested values
pub struct WildcardResolver;

impl WildcardResolver {
    /// Every concrete match of `path`, values cloned
    ///
    /// # Examples
    ///
    /// ```rust
    /// use octofhir_datapath::evaluator::WildcardResolver;
    /// use octofhir_datapath::model::Value;
    /// use octofhir_datapath::parser::parse_path;
    /// use serde_json::json;
    ///
    /// let data = Value::from(json!({"users": [{"name": "a"}, {"name": "b"}]}));
    /// let matches = WildcardResolver::resolve(&parse_path("users.*.name").unwrap(), &data);
    ///
    /// assert_eq!(matches.get("users.1.name"), Some(&Value::from("b")));
    /// ```
    pub fn resolve(path: &Path, root: &Value) -> WildcardMatches {
        let entries = Self::resolve_refs(path, root)
            .into_iter()
            .map(|(resolved, value)| (resolved, value.clone()))
            .collect();
        WildcardMatches::new(path.clone(), entries)
    }

    /// Every concrete match of `path`, values borrowed from `root`
    pub fn resolve_refs<'a>(path: &Path, root: &'a Value) -> Vec<(ResolvedPath, &'a Value)> {
        let mut bindings: Vec<Binding<'a>> = vec![(ResolvedPath::default(), root)];

        for segment in path.segments() {
            if bindings.is_empty() {
                break;
            }
            bindings = match segment {
                Segment::Literal(key) => bindings
                    .into_iter()
                    .filter_map(|(mut resolved, value)| {
                        let child = value.as_container()?.get(key)?;
                        resolved.push_literal(key.clone());
                        Some((resolved, child))
                    })
                    .collect(),
                Segment::Wildcard => {
                    let mut expanded = Vec::new();
                    for (resolved, value) in bindings {
                        let Some(container) = value.as_container() else {
                            continue;
                        };
                        for key in container.keys_of() {
                            if let Some(child) = container.get(&key) {
                                let mut next = resolved.clone();
                                next.push_bound(key);
                                expanded.push((next, child));
                            }
                        }
                    }
                    expanded
                }
            };
        }

        bindings
    }

    /// Walk a path's literal segments; a wildcard segment yields `None`
    pub fn resolve_single<'a>(path: &Path, root: &'a Value) -> Option<&'a Value> {
        path.segments()
            .iter()
            .try_fold(root, |value, segment| match segment {
                Segment::Literal(key) => value.as_container()?.get(key),
                Segment::Wildcard => None,
            })
    }

    /// Whether at least one binding's terminal container holds the final key.
    ///
    /// A stored null counts as present. For a trailing wildcard, any
    /// non-empty container counts. The root path always exists.
    pub fn contains(path: &Path, root: &Value) -> bool {
        let Some((parent, last)) = path.split_last() else {
            return true;
        };
        Self::resolve_refs(&parent, root)
            .into_iter()
            .filter_map(|(_, value)| value.as_container())
            .any(|container| match last {
                Segment::Literal(key) => container.has(key),
                Segment::Wildcard => !container.is_empty(),
            })
    }
}
