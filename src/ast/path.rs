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

//! Dot-path node types
//!
//! A [`Path`] is the parsed form of a dot-notation address such as
//! `orders.*.items.0.sku`. Segments are either literal keys or the `*`
//! wildcard. Numeric-looking keys stay literal strings; only a container
//! adapter decides whether a key indexes a sequence.
//!
//! A [`ResolvedPath`] is what a wildcard path turns into once every
//! wildcard has been bound to a concrete key during traversal.

use smallvec::SmallVec;
use std::fmt;

/// The wildcard token
pub const WILDCARD: &str = "*";

/// Segment separator
pub const SEPARATOR: char = '.';

/// A single path segment
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// A concrete key (map key, field name or sequence index)
    Literal(String),
    /// `*`, matches every key at this position
    Wildcard,
}

impl Segment {
    /// Create a literal segment
    pub fn literal(key: impl Into<String>) -> Self {
        Segment::Literal(key.into())
    }

    /// Whether this segment is the wildcard marker
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Segment::Wildcard)
    }

    /// The literal key, if any
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Segment::Literal(key) => Some(key),
            Segment::Wildcard => None,
        }
    }

    /// Textual form of the segment
    pub fn as_str(&self) -> &str {
        match self {
            Segment::Literal(key) => key,
            Segment::Wildcard => WILDCARD,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed dot-path
///
/// The empty path (zero segments) addresses the container root.
///
/// # Examples
///
/// ```rust
/// use octofhir_datapath::parser::parse_path;
///
/// let path = parse_path("orders.*.items.0").unwrap();
/// assert_eq!(path.len(), 4);
/// assert_eq!(path.wildcard_count(), 1);
/// assert_eq!(path.to_string(), "orders.*.items.0");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Path {
    segments: SmallVec<[Segment; 4]>,
}

impl Path {
    /// The root path
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from already validated segments
    pub fn from_segments<I>(segments: I) -> Self
    where
        I: IntoIterator<Item = Segment>,
    {
        Self {
            segments: segments.into_iter().collect(),
        }
    }

    /// Segments in order
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether this is the root path
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether at least one segment is a wildcard
    pub fn has_wildcard(&self) -> bool {
        self.segments.iter().any(Segment::is_wildcard)
    }

    /// Number of wildcard segments
    pub fn wildcard_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_wildcard()).count()
    }

    /// Indices of the wildcard segments
    pub fn wildcard_positions(&self) -> SmallVec<[usize; 2]> {
        self.segments
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.is_wildcard().then_some(i))
            .collect()
    }

    /// Append a segment, returning a new path
    pub fn child(&self, segment: Segment) -> Path {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Path { segments }
    }

    /// Concatenate two paths
    pub fn join(&self, other: &Path) -> Path {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Path { segments }
    }

    /// Split into the parent path and the final segment
    pub fn split_last(&self) -> Option<(Path, &Segment)> {
        let (last, rest) = self.segments.split_last()?;
        Some((Path::from_segments(rest.iter().cloned()), last))
    }

    /// Substitute the leading wildcards with concrete keys.
    ///
    /// Wildcards are bound left to right; surplus bindings are ignored and
    /// wildcards beyond the supplied bindings stay unbound.
    pub fn bind<S: AsRef<str>>(&self, bindings: &[S]) -> Path {
        let mut remaining = bindings.iter();
        Path {
            segments: self
                .segments
                .iter()
                .map(|segment| match segment {
                    Segment::Wildcard => match remaining.next() {
                        Some(key) => Segment::Literal(key.as_ref().to_string()),
                        None => Segment::Wildcard,
                    },
                    literal => literal.clone(),
                })
                .collect(),
        }
    }

    /// The prefix ending at the last wildcard, if the path has one
    pub fn wildcard_prefix(&self) -> Option<Path> {
        let last = self.segments.iter().rposition(Segment::is_wildcard)?;
        Some(Path::from_segments(self.segments[..=last].iter().cloned()))
    }

    /// Whether a concrete key sequence matches this path as a pattern
    pub fn matches<S: AsRef<str>>(&self, keys: &[S]) -> bool {
        self.segments.len() == keys.len()
            && self
                .segments
                .iter()
                .zip(keys)
                .all(|(segment, key)| match segment {
                    Segment::Wildcard => true,
                    Segment::Literal(literal) => literal == key.as_ref(),
                })
    }

    /// Convert a wildcard-free path into a resolved path
    pub fn to_resolved(&self) -> Option<ResolvedPath> {
        if self.has_wildcard() {
            return None;
        }
        Some(ResolvedPath::from_keys(
            self.segments.iter().map(|s| s.as_str().to_string()),
        ))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{SEPARATOR}")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// A path whose wildcards have been bound to concrete keys
///
/// Remembers which positions were wildcards in the originating pattern so
/// the bound keys can be replayed onto another wildcard path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ResolvedPath {
    keys: Vec<String>,
    wildcard_positions: SmallVec<[usize; 2]>,
}

impl ResolvedPath {
    /// A resolved path with no wildcard provenance
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            wildcard_positions: SmallVec::new(),
        }
    }

    /// Append a key that came from a literal segment
    pub fn push_literal(&mut self, key: impl Into<String>) {
        self.keys.push(key.into());
    }

    /// Append a key that was bound by a wildcard
    pub fn push_bound(&mut self, key: impl Into<String>) {
        self.wildcard_positions.push(self.keys.len());
        self.keys.push(key.into());
    }

    /// Concrete keys in order
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Positions that were bound by wildcards
    pub fn wildcard_positions(&self) -> &[usize] {
        &self.wildcard_positions
    }

    /// The keys bound by wildcards, left to right
    pub fn bindings(&self) -> Vec<String> {
        self.wildcard_positions
            .iter()
            .map(|&i| self.keys[i].clone())
            .collect()
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether this resolves to the root
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Extend with the keys of a relative resolved path
    pub fn extend(&mut self, other: &ResolvedPath) {
        let offset = self.keys.len();
        self.keys.extend(other.keys.iter().cloned());
        self.wildcard_positions
            .extend(other.wildcard_positions.iter().map(|p| p + offset));
    }

    /// Literal-only path addressing the same location
    pub fn to_path(&self) -> Path {
        Path::from_segments(self.keys.iter().cloned().map(Segment::Literal))
    }
}

impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.keys.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(segments: &[&str]) -> Path {
        Path::from_segments(segments.iter().map(|s| {
            if *s == WILDCARD {
                Segment::Wildcard
            } else {
                Segment::literal(*s)
            }
        }))
    }

    #[test]
    fn test_display_and_wildcards() {
        let p = path(&["orders", "*", "items", "*", "sku"]);
        assert_eq!(p.to_string(), "orders.*.items.*.sku");
        assert_eq!(p.wildcard_count(), 2);
        assert_eq!(p.wildcard_positions().as_slice(), &[1, 3]);
        assert_eq!(Path::root().to_string(), "");
    }

    #[test]
    fn test_bind_leading_wildcards() {
        let p = path(&["orders", "*", "items", "*", "sku"]);
        assert_eq!(p.bind(&["2"]).to_string(), "orders.2.items.*.sku");
        assert_eq!(p.bind(&["2", "0"]).to_string(), "orders.2.items.0.sku");
        assert_eq!(p.bind(&["2", "0", "9"]).to_string(), "orders.2.items.0.sku");
    }

    #[test]
    fn test_wildcard_prefix() {
        let p = path(&["users", "*", "address", "city"]);
        assert_eq!(p.wildcard_prefix().unwrap().to_string(), "users.*");
        assert!(path(&["a", "b"]).wildcard_prefix().is_none());
    }

    #[test]
    fn test_pattern_matching() {
        let p = path(&["users", "*", "name"]);
        assert!(p.matches(&["users", "3", "name"]));
        assert!(!p.matches(&["users", "3"]));
        assert!(!p.matches(&["people", "3", "name"]));
    }

    #[test]
    fn test_resolved_path_bindings() {
        let mut resolved = ResolvedPath::default();
        resolved.push_literal("orders");
        resolved.push_bound("1");
        resolved.push_literal("items");
        resolved.push_bound("0");
        assert_eq!(resolved.to_string(), "orders.1.items.0");
        assert_eq!(resolved.bindings(), vec!["1".to_string(), "0".to_string()]);
        assert_eq!(resolved.to_path().wildcard_count(), 0);
    }
}
