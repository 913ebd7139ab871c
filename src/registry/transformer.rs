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

//! Value transformers and the filter registry

use crate::error::{Error, Result};
use crate::model::Value;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result type for transformer operations
pub type FilterResult<T> = std::result::Result<T, FilterError>;

/// Transformer evaluation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    /// Invalid number of arguments
    #[error("Filter '{name}' expects {min}-{} arguments, got {actual}", max.map_or("∞".to_string(), |n| n.to_string()))]
    InvalidArity {
        /// Filter name
        name: String,
        /// Minimum arguments
        min: usize,
        /// Maximum arguments (None for unlimited)
        max: Option<usize>,
        /// Actual arguments provided
        actual: usize,
    },

    /// An argument could not be interpreted
    #[error("Filter '{filter}' invalid argument: {message}")]
    InvalidArgument {
        /// Filter name
        filter: String,
        /// Error message
        message: String,
    },

    /// The filter cannot handle the input value
    #[error("Filter '{filter}' does not support {value_type} values")]
    Unsupported {
        /// Filter name
        filter: String,
        /// Type name of the rejected value
        value_type: String,
    },
}

impl FilterError {
    /// Build an [`FilterError::InvalidArgument`]
    pub fn invalid_argument(filter: &str, message: impl Into<String>) -> Self {
        FilterError::InvalidArgument {
            filter: filter.to_string(),
            message: message.into(),
        }
    }
}

/// A stateless value transformer, invoked by name from a filter chain or
/// directly from a [`Pipeline`](crate::pipeline::Pipeline)
pub trait Transformer: Send + Sync {
    /// Filter name used in expressions
    fn name(&self) -> &str;

    /// Minimum and maximum number of positional arguments
    fn arity(&self) -> (usize, Option<usize>) {
        (0, Some(0))
    }

    /// Aggregate filters receive every wildcard match as one list;
    /// the others are applied to each match separately
    fn is_aggregate(&self) -> bool {
        false
    }

    /// Short description
    fn documentation(&self) -> &str {
        ""
    }

    /// Transform a value
    fn transform(&self, value: Value, args: &[String]) -> FilterResult<Value>;

    /// Check the argument count against [`Transformer::arity`]
    fn validate_args(&self, args: &[String]) -> FilterResult<()> {
        let (min, max) = self.arity();
        if args.len() < min || max.is_some_and(|max| args.len() > max) {
            return Err(FilterError::InvalidArity {
                name: self.name().to_string(),
                min,
                max,
                actual: args.len(),
            });
        }
        Ok(())
    }
}

/// Transformer built from a closure
pub struct FnTransformer<F> {
    name: String,
    aggregate: bool,
    func: F,
}

impl<F> FnTransformer<F>
where
    F: Fn(Value, &[String]) -> FilterResult<Value> + Send + Sync,
{
    /// Per-element transformer
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            aggregate: false,
            func,
        }
    }

    /// Transformer receiving all wildcard matches at once
    pub fn aggregate(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            aggregate: true,
            func,
        }
    }
}

impl<F> Transformer for FnTransformer<F>
where
    F: Fn(Value, &[String]) -> FilterResult<Value> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> (usize, Option<usize>) {
        (0, None)
    }

    fn is_aggregate(&self) -> bool {
        self.aggregate
    }

    fn transform(&self, value: Value, args: &[String]) -> FilterResult<Value> {
        (self.func)(value, args)
    }
}

/// Registry of named transformers
///
/// # Examples
///
/// ```rust
/// use octofhir_datapath::model::Value;
/// use octofhir_datapath::registry::FilterRegistry;
///
/// let registry = FilterRegistry::standard();
/// let value = registry.apply("upper", Value::from("abc"), &[]).unwrap();
/// assert_eq!(value, Value::from("ABC"));
/// assert!(registry.apply("nope", Value::Null, &[]).is_err());
/// ```
#[derive(Clone, Default)]
pub struct FilterRegistry {
    filters: FxHashMap<String, Arc<dyn Transformer>>,
}

impl FilterRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in filter
    pub fn standard() -> Self {
        let mut registry = Self::new();
        super::functions::register_builtin_filters(&mut registry);
        registry
    }

    /// Register a transformer under its own name, replacing any previous one
    pub fn register<T: Transformer + 'static>(&mut self, transformer: T) {
        self.register_arc(Arc::new(transformer));
    }

    /// Register a shared transformer
    pub fn register_arc(&mut self, transformer: Arc<dyn Transformer>) {
        let name = transformer.name().to_string();
        if self.filters.insert(name.clone(), transformer).is_some() {
            log::debug!("filter '{name}' replaced");
        }
    }

    /// Register a closure as a per-element filter
    pub fn register_fn<F>(&mut self, name: &str, func: F)
    where
        F: Fn(Value, &[String]) -> FilterResult<Value> + Send + Sync + 'static,
    {
        self.register(FnTransformer::new(name, func));
    }

    /// Make `alias` resolve to the transformer registered as `target`
    pub fn register_alias(&mut self, alias: &str, target: &str) {
        if let Some(transformer) = self.filters.get(target).cloned() {
            self.filters.insert(alias.to_string(), transformer);
        }
    }

    /// Look up a transformer
    pub fn get(&self, name: &str) -> Option<Arc<dyn Transformer>> {
        self.filters.get(name).cloned()
    }

    /// Whether a filter is registered
    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.filters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Look up a transformer, failing with [`Error::UnknownFilter`]
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Transformer>> {
        self.get(name).ok_or_else(|| Error::UnknownFilter {
            name: name.to_string(),
        })
    }

    /// Apply a filter by name after validating its arguments
    pub fn apply(&self, name: &str, value: Value, args: &[String]) -> Result<Value> {
        let transformer = self.resolve(name)?;
        transformer.validate_args(args)?;
        Ok(transformer.transform(value, args)?)
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("filters", &self.names())
            .finish()
    }
}
