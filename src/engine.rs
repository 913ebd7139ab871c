//! Data engine - the main entry point for reading, writing and mapping
//!
//! [`DataEngine`] owns one path cache, one expression cache and one filter
//! registry, and hands out accessors, mutators and mapping engines that
//! share them.

use crate::accessor::{Accessor, Lookup};
use crate::ast::Expression;
use crate::cache::CacheStats;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::mapper::{Mapping, MappingEngine};
use crate::model::Value;
use crate::mutator::Mutator;
use crate::parser::{ExpressionParser, PathParser};
use crate::registry::FilterRegistry;
use std::sync::Arc;

/// Parse cache statistics of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineCacheStats {
    /// Dot-path cache
    pub paths: CacheStats,
    /// Expression cache
    pub expressions: CacheStats,
}

/// Main engine for path access, mutation and template mapping
///
/// # Examples
///
/// ```rust
/// use octofhir_datapath::DataEngine;
/// use octofhir_datapath::model::Value;
/// use serde_json::json;
///
/// let engine = DataEngine::new();
/// let data = Value::from(json!({"user": {"name": "Ada"}}));
///
/// let updated = engine.set(&data, "user.email", Value::from("ada@example.com")).unwrap();
/// assert_eq!(
///     engine.get(&updated, "user.email").unwrap().into_value(),
///     Value::from("ada@example.com")
/// );
/// ```
#[derive(Debug, Clone)]
pub struct DataEngine {
    config: EngineConfig,
    paths: PathParser,
    expressions: ExpressionParser,
    registry: Arc<FilterRegistry>,
}

impl Default for DataEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DataEngine {
    /// Engine with default configuration and the built-in filters
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Engine with private caches sized by `config`
    pub fn with_config(config: EngineConfig) -> Self {
        log::debug!(
            "creating data engine: path cache {}, expression cache {}",
            config.path_cache_size,
            config.expression_cache_size
        );
        Self {
            paths: PathParser::with_capacity(config.path_cache_size),
            expressions: ExpressionParser::with_capacity(config.expression_cache_size),
            registry: Arc::new(FilterRegistry::standard()),
            config,
        }
    }

    /// Replace the filter registry
    pub fn with_registry(mut self, registry: FilterRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Filters available to expressions and pipelines
    pub fn registry(&self) -> &FilterRegistry {
        &self.registry
    }

    /// Accessor sharing this engine's path cache
    pub fn accessor(&self) -> Accessor {
        Accessor::with_parser(self.paths.clone())
    }

    /// Mutator sharing this engine's path cache
    pub fn mutator(&self) -> Mutator {
        Mutator::with_parser(self.paths.clone()).with_policy(self.config.mapper.write_policy())
    }

    /// Mapping engine sharing this engine's caches and filters
    pub fn mapper(&self) -> MappingEngine {
        MappingEngine::new()
            .with_parsers(self.paths.clone(), self.expressions.clone())
            .with_registry(Arc::clone(&self.registry))
            .with_config(self.config.mapper)
    }

    /// Read `path` from `data`
    pub fn get(&self, data: &Value, path: &str) -> Result<Lookup> {
        self.accessor().get(data, path)
    }

    /// Return a copy of `data` with `value` written at `path`
    pub fn set(&self, data: &Value, path: &str, value: Value) -> Result<Value> {
        self.mutator().set(data, path, value)
    }

    /// Parse a template expression through the expression cache
    pub fn parse_expression(&self, raw: &str) -> Result<Arc<Expression>> {
        Ok(self.expressions.parse(raw)?)
    }

    /// Compile a mapping template
    pub fn compile(&self, template: &Value) -> Result<Mapping> {
        Mapping::compile(template, &self.expressions, &self.paths)
    }

    /// Compile `template` and map `source` through it
    pub fn map(&self, source: &Value, template: &Value) -> Result<Value> {
        self.mapper().map_template(source, template)
    }

    /// Current cache statistics
    pub fn cache_stats(&self) -> EngineCacheStats {
        EngineCacheStats {
            paths: self.paths.stats(),
            expressions: self.expressions.stats(),
        }
    }

    /// Drop every cached parse
    pub fn clear_caches(&self) {
        self.paths.cache().clear();
        self.expressions.cache().clear();
    }
}
