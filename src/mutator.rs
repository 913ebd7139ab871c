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

//! Pure write access to nested data by dot-path
//!
//! Every operation takes the target by reference and returns a new value;
//! the input is never modified. Containers keep their kind. A list stays a
//! list while writes keep it dense and becomes a sequence-kind
//! [`Collection`](crate::model::Collection) once a write or unset leaves a
//! gap. Records and collections keep their wrappers.
//!
//! Missing intermediate nodes are created on the way down. The next key
//! decides the shape: `"0"` starts a list, anything else a map.

use crate::ast::{Path, ResolvedPath, Segment};
use crate::error::Result;
use crate::evaluator::{WildcardMatches, WildcardResolver};
use crate::model::adapter::list_set_owned;
use crate::model::{ContainerAdapter, Value, parse_index};
use crate::parser::PathParser;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::mem;

/// How wildcard writes lay out their keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WritePolicy {
    /// Compact numeric keys bound by wildcards to a dense `0..n-1` range.
    /// When false, original keys are kept and gaps survive.
    pub reindex_wildcard: bool,
}

/// Write facade over dot-paths
///
/// # Examples
///
/// ```rust
/// use octofhir_datapath::mutator::Mutator;
/// use octofhir_datapath::model::Value;
/// use serde_json::json;
///
/// let mutator = Mutator::new();
/// let data = Value::from(json!({"user": {"name": "ada"}}));
///
/// let updated = mutator.set(&data, "user.tags.0", Value::from("admin")).unwrap();
/// assert_eq!(updated, Value::from(json!({"user": {"name": "ada", "tags": ["admin"]}})));
/// assert_eq!(data, Value::from(json!({"user": {"name": "ada"}})));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Mutator {
    paths: PathParser,
    policy: WritePolicy,
}

impl Mutator {
    /// Mutator using the process-wide path cache and the default policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutator using a specific path parser
    pub fn with_parser(paths: PathParser) -> Self {
        Self {
            paths,
            policy: WritePolicy::default(),
        }
    }

    /// Replace the write policy
    pub fn with_policy(mut self, policy: WritePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The active write policy
    pub fn policy(&self) -> WritePolicy {
        self.policy
    }

    /// Set `path` to `value`.
    ///
    /// A wildcard path writes `value` under every existing key the wildcards
    /// match; nothing is written when they match nothing. To copy the
    /// results of a wildcard [`Accessor`](crate::accessor::Accessor) read,
    /// use [`set_matches`](Self::set_matches), which replays the keys each
    /// match bound.
    pub fn set(&self, target: &Value, path: &str, value: Value) -> Result<Value> {
        let parsed = self.paths.parse(path)?;
        let Some(prefix) = parsed.wildcard_prefix() else {
            return Ok(write_at(target.clone(), &literal_keys(&parsed), value));
        };

        let suffix: Vec<String> = parsed.segments()[prefix.len()..]
            .iter()
            .map(|segment| segment.as_str().to_string())
            .collect();
        let locations: Vec<ResolvedPath> = WildcardResolver::resolve_refs(&prefix, target)
            .into_iter()
            .map(|(resolved, _)| resolved)
            .collect();

        let mut result = target.clone();
        for location in locations {
            let mut keys = location.keys().to_vec();
            keys.extend(suffix.iter().cloned());
            result = write_at(result, &keys, value.clone());
        }
        Ok(result)
    }

    /// Write the matches of a wildcard read onto `path`.
    ///
    /// The keys each match bound are replayed onto the target's wildcards:
    /// - equal wildcard counts bind positionally
    /// - with fewer target wildcards, all but the last bind positionally and
    ///   the last receives a dense ordinal, flattening the extra levels
    /// - with more target wildcards, the surplus bind to `"0"`
    /// - a target without wildcards receives the list of matched values
    pub fn set_matches(&self, target: &Value, path: &str, matches: &WildcardMatches) -> Result<Value> {
        let pattern = self.paths.parse(path)?;
        let wildcards = pattern.wildcard_count();
        if wildcards == 0 {
            return Ok(write_at(
                target.clone(),
                &literal_keys(&pattern),
                Value::List(matches.values()),
            ));
        }

        let sources: Vec<ResolvedPath> = matches.iter().map(|(resolved, _)| resolved.clone()).collect();
        let locations = self.plan_targets(&pattern, &sources);

        let mut result = target.clone();
        for (location, (_, value)) in locations.iter().zip(matches.iter()) {
            result = write_at(result, location.keys(), value.clone());
        }
        Ok(result)
    }

    /// Concrete locations on `pattern` for values read from `sources`,
    /// following the binding rules of [`Mutator::set_matches`].
    ///
    /// Returns one location per source, in order. A pattern without
    /// wildcards yields itself for every source.
    pub fn plan_targets(&self, pattern: &Path, sources: &[ResolvedPath]) -> Vec<ResolvedPath> {
        let wildcards = pattern.wildcard_count();
        let mut ordinals: FxHashMap<Vec<String>, usize> = FxHashMap::default();
        let mut reindexer = Reindexer::default();

        sources
            .iter()
            .map(|resolved| {
                if wildcards == 0 {
                    return locate(pattern, &[]);
                }
                let source = resolved.bindings();
                let mut bound: Vec<String>;
                if wildcards <= source.len() {
                    bound = source[..wildcards - 1].to_vec();
                    if wildcards == source.len() {
                        bound.push(source[wildcards - 1].clone());
                    } else {
                        let next = ordinals.entry(bound.clone()).or_insert(0);
                        bound.push(next.to_string());
                        *next += 1;
                    }
                } else {
                    bound = source;
                    bound.resize(wildcards, "0".to_string());
                }

                if self.policy.reindex_wildcard {
                    bound = reindexer.compact(bound);
                }
                locate(pattern, &bound)
            })
            .collect()
    }

    /// Write `value` at an already resolved location
    pub fn set_resolved(&self, target: &Value, path: &ResolvedPath, value: Value) -> Value {
        write_at(target.clone(), path.keys(), value)
    }

    /// Write `value` at a resolved location, consuming the target
    pub fn write(&self, target: Value, path: &ResolvedPath, value: Value) -> Value {
        write_at(target, path.keys(), value)
    }

    /// Merge `data` into the node at `path`.
    ///
    /// Overlapping container keys merge recursively; everything else in
    /// `data` replaces what was there. Sequences merge by index: a key
    /// overwrites that element and new keys are inserted, nothing shifts.
    /// A wildcard path merges into every match.
    pub fn merge(&self, target: &Value, path: &str, data: Value) -> Result<Value> {
        let parsed = self.paths.parse(path)?;
        if !parsed.has_wildcard() {
            let merged = match WildcardResolver::resolve_single(&parsed, target) {
                Some(existing) => merge_values(existing.clone(), data),
                None => data,
            };
            return Ok(write_at(target.clone(), &literal_keys(&parsed), merged));
        }

        let locations: Vec<(ResolvedPath, Value)> = WildcardResolver::resolve_refs(&parsed, target)
            .into_iter()
            .map(|(resolved, value)| (resolved, value.clone()))
            .collect();
        let mut result = target.clone();
        for (location, existing) in locations {
            result = write_at(result, location.keys(), merge_values(existing, data.clone()));
        }
        Ok(result)
    }

    /// Remove the node at `path`.
    ///
    /// With wildcards, every match is removed and all sibling data is left
    /// alone. Removing a missing key is a no-op. Unsetting the root empties it.
    pub fn unset(&self, target: &Value, path: &str) -> Result<Value> {
        let parsed = self.paths.parse(path)?;
        if !parsed.has_wildcard() {
            return Ok(remove_at(target.clone(), &literal_keys(&parsed)));
        }

        let locations: Vec<ResolvedPath> = WildcardResolver::resolve_refs(&parsed, target)
            .into_iter()
            .map(|(resolved, _)| resolved)
            .collect();
        // Back to front so removing a list tail keeps earlier indices valid
        let mut result = target.clone();
        for location in locations.iter().rev() {
            result = remove_at(result, location.keys());
        }
        Ok(result)
    }

    /// Remove several paths in order
    pub fn unset_many<I, S>(&self, target: &Value, paths: I) -> Result<Value>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut result = target.clone();
        for path in paths {
            result = self.unset(&result, path.as_ref())?;
        }
        Ok(result)
    }
}

/// Bind the wildcards of `pattern` left to right; unbound ones become `"0"`
fn locate(pattern: &Path, bound: &[String]) -> ResolvedPath {
    let mut location = ResolvedPath::default();
    let mut bound = bound.iter();
    for segment in pattern.segments() {
        match segment.as_literal() {
            Some(literal) => location.push_literal(literal),
            None => location.push_bound(bound.next().map_or("0", String::as_str)),
        }
    }
    location
}

fn literal_keys(path: &Path) -> Vec<String> {
    path.segments()
        .iter()
        .filter_map(Segment::as_literal)
        .map(str::to_string)
        .collect()
}

/// Assigns dense ordinals to numeric keys, separately under each parent
#[derive(Debug, Default)]
struct Reindexer {
    assigned: FxHashMap<(Vec<String>, String), String>,
    next: FxHashMap<Vec<String>, usize>,
}

impl Reindexer {
    fn compact(&mut self, bound: Vec<String>) -> Vec<String> {
        let mut compacted: Vec<String> = Vec::with_capacity(bound.len());
        for key in bound {
            if parse_index(&key).is_none() {
                compacted.push(key);
                continue;
            }
            let parent = compacted.clone();
            let slot = (parent.clone(), key);
            let ordinal = match self.assigned.get(&slot) {
                Some(ordinal) => ordinal.clone(),
                None => {
                    let counter = self.next.entry(parent).or_insert(0);
                    let ordinal = counter.to_string();
                    *counter += 1;
                    self.assigned.insert(slot, ordinal.clone());
                    ordinal
                }
            };
            compacted.push(ordinal);
        }
        compacted
    }
}

fn with_container(node: Value, f: impl FnOnce(&dyn ContainerAdapter) -> Value) -> Value {
    match node.as_container().map(f) {
        Some(updated) => updated,
        None => node,
    }
}

/// Owned write used by every set operation
pub(crate) fn write_at(node: Value, keys: &[String], value: Value) -> Value {
    let Some((key, rest)) = keys.split_first() else {
        return value;
    };

    match node {
        Value::Map(mut map) => {
            let child = map.get_mut(key.as_str()).map(mem::take).unwrap_or_default();
            let updated = write_at(child, rest, value);
            map.insert(key.clone(), updated);
            Value::Map(map)
        }
        Value::List(mut items) => match parse_index(key) {
            Some(index) if index < items.len() => {
                let child = mem::take(&mut items[index]);
                items[index] = write_at(child, rest, value);
                Value::List(items)
            }
            _ => list_set_owned(items, key, write_at(Value::Null, rest, value)),
        },
        other if other.is_container() => with_container(other, |container| {
            let child = container.get(key).cloned().unwrap_or_default();
            container.with_set(key, write_at(child, rest, value))
        }),
        _ => write_at(Value::container_for_key(key), keys, value),
    }
}

fn remove_at(node: Value, keys: &[String]) -> Value {
    let Some((key, rest)) = keys.split_first() else {
        return with_container(node, |container| container.cleared());
    };

    if rest.is_empty() {
        return match node {
            Value::Map(mut map) => {
                map.shift_remove(key.as_str());
                Value::Map(map)
            }
            other => with_container(other, |container| {
                if container.has(key) {
                    container.with_unset(key)
                } else {
                    container.to_value()
                }
            }),
        };
    }

    match node {
        Value::Map(mut map) => {
            if let Some(child) = map.get_mut(key.as_str()) {
                let taken = mem::take(child);
                *child = remove_at(taken, rest);
            }
            Value::Map(map)
        }
        Value::List(mut items) => {
            if let Some(child) = parse_index(key).and_then(|index| items.get_mut(index)) {
                let taken = mem::take(child);
                *child = remove_at(taken, rest);
            }
            Value::List(items)
        }
        other => with_container(other, |container| match container.get(key) {
            Some(child) if child.is_container() => {
                container.with_set(key, remove_at(child.clone(), rest))
            }
            _ => container.to_value(),
        }),
    }
}

/// Deep merge of `incoming` into `base`
pub(crate) fn merge_values(base: Value, incoming: Value) -> Value {
    if !base.is_container() {
        return incoming;
    }
    let Some(entries) = incoming.as_container().map(|c| c.to_canonical_array()) else {
        return incoming;
    };

    let mut result = base;
    for (key, value) in entries {
        let next = match result.as_container().and_then(|c| c.get(&key)) {
            Some(existing) if existing.is_container() && value.is_container() => {
                merge_values(existing.clone(), value)
            }
            _ => value,
        };
        result = write_at(result, std::slice::from_ref(&key), next);
    }
    result
}
