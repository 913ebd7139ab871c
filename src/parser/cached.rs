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

//! Parsers that consult a [`ParseCache`] before doing any work

use super::error::{ExpressionResult, PathResult};
use super::expression::parse_expression;
use super::path::parse_path;
use crate::ast::{Expression, Path};
use crate::cache::{CacheStats, ParseCache, global_expression_cache, global_path_cache};
use std::sync::Arc;

/// Dot-path parser backed by a shared cache
#[derive(Debug, Clone)]
pub struct PathParser {
    cache: Arc<ParseCache<Path>>,
}

impl PathParser {
    /// Parser using the process-wide path cache
    pub fn global() -> Self {
        Self::with_cache(global_path_cache())
    }

    /// Parser with a private cache of `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_cache(Arc::new(ParseCache::new(capacity)))
    }

    /// Parser sharing an existing cache
    pub fn with_cache(cache: Arc<ParseCache<Path>>) -> Self {
        Self { cache }
    }

    /// Parse `raw`, reusing a cached result when available
    pub fn parse(&self, raw: &str) -> PathResult<Arc<Path>> {
        self.cache.get_or_parse(raw, parse_path)
    }

    /// The underlying cache
    pub fn cache(&self) -> &Arc<ParseCache<Path>> {
        &self.cache
    }

    /// Cache statistics
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl Default for PathParser {
    fn default() -> Self {
        Self::global()
    }
}

/// Template expression parser backed by a shared cache
///
/// # Examples
///
/// ```rust
/// use octofhir_datapath::parser::ExpressionParser;
/// use std::sync::Arc;
///
/// let parser = ExpressionParser::with_capacity(10);
/// let a = parser.parse("{{ user.name | upper }}").unwrap();
/// let b = parser.parse("{{ user.name | upper }}").unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// assert_eq!(parser.stats().hits, 1);
/// ```
#[derive(Debug, Clone)]
pub struct ExpressionParser {
    cache: Arc<ParseCache<Expression>>,
}

impl ExpressionParser {
    /// Parser using the process-wide expression cache
    pub fn global() -> Self {
        Self::with_cache(global_expression_cache())
    }

    /// Parser with a private cache of `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_cache(Arc::new(ParseCache::new(capacity)))
    }

    /// Parser sharing an existing cache
    pub fn with_cache(cache: Arc<ParseCache<Expression>>) -> Self {
        Self { cache }
    }

    /// Parse `raw`, reusing a cached result when available
    pub fn parse(&self, raw: &str) -> ExpressionResult<Arc<Expression>> {
        self.cache.get_or_parse(raw, parse_expression)
    }

    /// The underlying cache
    pub fn cache(&self) -> &Arc<ParseCache<Expression>> {
        &self.cache
    }

    /// Cache statistics
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl Default for ExpressionParser {
    fn default() -> Self {
        Self::global()
    }
}
