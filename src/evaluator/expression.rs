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

//! Expression evaluation against a source value
//!
//! An expression's path is first bound with the wildcard keys of the current
//! row, then resolved. A path that still contains wildcards yields many
//! values; per-element filters map over them and the first aggregate filter
//! collapses them.

use super::resolver::WildcardResolver;
use crate::ast::{Expression, FilterCall};
use crate::error::Result;
use crate::model::Value;
use crate::registry::{FilterRegistry, FilterResult};

/// Intermediate result while a filter chain runs
#[derive(Debug, Clone, PartialEq)]
enum Evaluated {
    Single(Value),
    Many(Vec<Value>),
}

impl Evaluated {
    fn into_value(self) -> Value {
        match self {
            Evaluated::Single(value) => value,
            Evaluated::Many(values) => Value::List(values),
        }
    }
}

/// Evaluates parsed expressions using a filter registry
///
/// # Examples
///
/// ```rust
/// use octofhir_datapath::evaluator::ExpressionEvaluator;
/// use octofhir_datapath::model::Value;
/// use octofhir_datapath::parser::parse_expression;
/// use octofhir_datapath::registry::FilterRegistry;
/// use serde_json::json;
///
/// let registry = FilterRegistry::standard();
/// let evaluator = ExpressionEvaluator::new(&registry);
/// let source = Value::from(json!({"items": [{"price": 2}, {"price": 3}]}));
///
/// let expr = parse_expression("{{ items.*.price | sum }}").unwrap();
/// assert_eq!(evaluator.evaluate(&expr, &source).unwrap(), Value::Int(5));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ExpressionEvaluator<'r> {
    registry: &'r FilterRegistry,
}

impl<'r> ExpressionEvaluator<'r> {
    /// Create an evaluator
    pub fn new(registry: &'r FilterRegistry) -> Self {
        Self { registry }
    }

    /// The registry filters are looked up in
    pub fn registry(&self) -> &'r FilterRegistry {
        self.registry
    }

    /// Evaluate without any bound wildcards
    pub fn evaluate(&self, expr: &Expression, source: &Value) -> Result<Value> {
        self.evaluate_bound::<&str>(expr, source, &[])
    }

    /// Evaluate with the leading wildcards of the path bound to `bindings`.
    ///
    /// A path without remaining wildcards yields its single value, with the
    /// default substituted for null or absent. A path with remaining
    /// wildcards yields a list; the default replaces null elements, or the
    /// whole result when nothing matched.
    pub fn evaluate_bound<S: AsRef<str>>(
        &self,
        expr: &Expression,
        source: &Value,
        bindings: &[S],
    ) -> Result<Value> {
        let state = self.resolve(expr, source, bindings);
        self.run_filters(state, &expr.filters)
    }

    /// Evaluate over several rows at once.
    ///
    /// The values of every row are collected into one list before the
    /// filter chain runs, so a leading aggregate filter sees the whole group.
    pub fn evaluate_group<S: AsRef<str>>(
        &self,
        expr: &Expression,
        source: &Value,
        rows: &[Vec<S>],
    ) -> Result<Value> {
        let mut values = Vec::new();
        for bindings in rows {
            match self.resolve(expr, source, bindings) {
                Evaluated::Single(value) => values.push(value),
                Evaluated::Many(many) => values.extend(many),
            }
        }
        self.run_filters(Evaluated::Many(values), &expr.filters)
    }

    /// Apply a filter chain to a single value
    pub fn apply_filters(&self, value: Value, filters: &[FilterCall]) -> Result<Value> {
        self.run_filters(Evaluated::Single(value), filters)
    }

    fn resolve<S: AsRef<str>>(&self, expr: &Expression, source: &Value, bindings: &[S]) -> Evaluated {
        let path = expr.path.bind(bindings);

        if !path.has_wildcard() {
            let value = WildcardResolver::resolve_single(&path, source)
                .filter(|value| !value.is_null())
                .cloned()
                .or_else(|| expr.default.clone())
                .unwrap_or_default();
            return Evaluated::Single(value);
        }

        let values: Vec<Value> = WildcardResolver::resolve_refs(&path, source)
            .into_iter()
            .map(|(_, value)| match (value, &expr.default) {
                (Value::Null, Some(default)) => default.clone(),
                (value, _) => value.clone(),
            })
            .collect();

        match &expr.default {
            Some(default) if values.is_empty() => Evaluated::Single(default.clone()),
            _ => Evaluated::Many(values),
        }
    }

    fn run_filters(&self, mut state: Evaluated, filters: &[FilterCall]) -> Result<Value> {
        for call in filters {
            let transformer = self.registry.resolve(&call.name)?;
            transformer.validate_args(&call.args)?;

            state = match state {
                Evaluated::Many(values) if transformer.is_aggregate() => {
                    match transformer.transform(Value::List(values), &call.args)? {
                        Value::List(items) => Evaluated::Many(items),
                        other => Evaluated::Single(other),
                    }
                }
                Evaluated::Many(values) => Evaluated::Many(
                    values
                        .into_iter()
                        .map(|value| transformer.transform(value, &call.args))
                        .collect::<FilterResult<Vec<_>>>()?,
                ),
                Evaluated::Single(value) => {
                    Evaluated::Single(transformer.transform(value, &call.args)?)
                }
            };
        }
        Ok(state.into_value())
    }
}
