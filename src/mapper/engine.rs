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

//! Mapping engine
//!
//! Walks a compiled [`Mapping`], evaluates every leaf against the source and
//! writes the results into the target through the mutator. Query directives
//! expand rows first; leaves inside a row see that row's wildcard bindings.

use super::hooks::{
    EntryContext, HookAction, HookError, HookPoint, MappingContext, MappingHooks, NoopHooks,
    PairContext, WriteContext,
};
use super::query::{Query, Selection};
use super::template::{Directive, Mapping, Piece, TemplateEntry, TemplateNode};
use crate::ast::{Expression, Path, ResolvedPath, Segment};
use crate::config::MapperConfig;
use crate::error::{Error, Result};
use crate::evaluator::{ExpressionEvaluator, WildcardResolver};
use crate::model::Value;
use crate::mutator::Mutator;
use crate::parser::{ExpressionParser, PathParser};
use crate::pipeline::Pipeline;
use crate::registry::FilterRegistry;
use std::borrow::Cow;
use std::fmt;
use std::mem;
use std::sync::Arc;

fn hook_error(point: HookPoint) -> impl FnOnce(HookError) -> Error {
    move |error| Error::Hook {
        point,
        message: error.message,
    }
}

/// Maps source data into a target shape described by a template
///
/// # Examples
///
/// ```rust
/// use octofhir_datapath::mapper::MappingEngine;
/// use octofhir_datapath::model::Value;
/// use serde_json::json;
///
/// let engine = MappingEngine::new();
/// let source = Value::from(json!({"user": {"first": " Ada ", "langs": ["en", "fr"]}}));
/// let template = Value::from(json!({
///     "name": "{{ user.first | upper }}",
///     "languages": "{{ user.langs.* | join:'/' }}",
///     "missing": "{{ user.email }}"
/// }));
///
/// let result = engine.map_template(&source, &template).unwrap();
/// assert_eq!(result, Value::from(json!({"name": "ADA", "languages": "en/fr"})));
/// ```
#[derive(Clone)]
pub struct MappingEngine {
    expressions: ExpressionParser,
    paths: PathParser,
    registry: Arc<FilterRegistry>,
    config: MapperConfig,
    pipeline: Option<Pipeline>,
    hooks: Arc<dyn MappingHooks>,
}

impl fmt::Debug for MappingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingEngine")
            .field("config", &self.config)
            .field("filters", &self.registry.names().len())
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

impl Default for MappingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MappingEngine {
    /// Engine with the built-in filters, default configuration and the
    /// process-wide parse caches
    pub fn new() -> Self {
        Self {
            expressions: ExpressionParser::global(),
            paths: PathParser::global(),
            registry: Arc::new(FilterRegistry::standard()),
            config: MapperConfig::default(),
            pipeline: None,
            hooks: Arc::new(NoopHooks),
        }
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: MapperConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the filter registry
    pub fn with_registry(mut self, registry: Arc<FilterRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Use specific parsers, and therefore specific caches
    pub fn with_parsers(mut self, paths: PathParser, expressions: ExpressionParser) -> Self {
        self.paths = paths;
        self.expressions = expressions;
        self
    }

    /// Run `pipeline` over every value before it is written
    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Install lifecycle hooks
    pub fn with_hooks<H: MappingHooks + 'static>(mut self, hooks: H) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    /// Active configuration
    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Filters available to expressions
    pub fn registry(&self) -> &FilterRegistry {
        &self.registry
    }

    /// Compile a template with this engine's parsers
    pub fn compile(&self, template: &Value) -> Result<Mapping> {
        Mapping::compile(template, &self.expressions, &self.paths)
    }

    /// Map `source` into `target`, returning the updated target
    pub fn map(&self, source: &Value, target: &Value, mapping: &Mapping) -> Result<Value> {
        let hooks = self.hooks.as_ref();
        let start = MappingContext { source, target };
        let source: Cow<'_, Value> = match hooks
            .before_all(&start)
            .map_err(hook_error(HookPoint::BeforeAll))?
        {
            HookAction::Continue => Cow::Borrowed(source),
            HookAction::Skip => {
                log::debug!("mapping skipped by before_all hook");
                return Ok(target.clone());
            }
            HookAction::Replace(replacement) => Cow::Owned(replacement),
        };
        let source = source.as_ref();

        let mut run = Run::new(self, source, target.clone());
        let root = ResolvedPath::default();
        for entry in mapping.entries() {
            let ctx = EntryContext {
                key: &entry.key,
                source,
            };
            match hooks
                .before_entry(&ctx)
                .map_err(hook_error(HookPoint::BeforeEntry))?
            {
                HookAction::Continue => run.entry(entry, &root, Scope::root())?,
                HookAction::Skip => {
                    log::trace!("entry '{}' skipped by hook", entry.key);
                    continue;
                }
                HookAction::Replace(value) => {
                    let pair = PairContext {
                        source_path: &entry.key,
                        target_path: &entry.key,
                        bindings: &[],
                    };
                    run.write_pattern(&entry.target, value, &pair)?;
                }
            }
            hooks
                .after_entry(&ctx, &run.target)
                .map_err(hook_error(HookPoint::AfterEntry))?;
        }

        let mut result = run.target;
        hooks
            .after_all(&MappingContext { source, target }, &mut result)
            .map_err(hook_error(HookPoint::AfterAll))?;
        Ok(result)
    }

    /// Compile `template` and map `source` into a fresh map
    pub fn map_template(&self, source: &Value, template: &Value) -> Result<Value> {
        let mapping = self.compile(template)?;
        self.map(source, &Value::map(), &mapping)
    }

    /// Copy each `(source path, target path)` pair from `source` into `target`
    pub fn map_paths<I, S, T>(&self, source: &Value, target: &Value, pairs: I) -> Result<Value>
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let mapping = Mapping::from_paths(pairs, &self.paths)?;
        self.map(source, target, &mapping)
    }

    /// Copy values of a mapped result back into the shape of the original
    /// source, using the reversible leaves of `mapping`
    pub fn reverse_map(&self, mapped: &Value, original: &Value, mapping: &Mapping) -> Result<Value> {
        self.map(mapped, original, &mapping.reversed())
    }
}

/// Wildcard bindings leaves are evaluated with
#[derive(Debug, Clone, Copy)]
struct Scope<'s> {
    bindings: &'s [String],
    group: Option<&'s [Vec<String>]>,
}

impl Scope<'_> {
    fn root() -> Self {
        Scope {
            bindings: &[],
            group: None,
        }
    }
}

/// State of one mapping call
struct Run<'a> {
    engine: &'a MappingEngine,
    source: &'a Value,
    evaluator: ExpressionEvaluator<'a>,
    mutator: Mutator,
    target: Value,
}

impl<'a> Run<'a> {
    fn new(engine: &'a MappingEngine, source: &'a Value, target: Value) -> Self {
        Self {
            engine,
            source,
            evaluator: ExpressionEvaluator::new(&engine.registry),
            mutator: Mutator::with_parser(engine.paths.clone())
                .with_policy(engine.config.write_policy()),
            target,
        }
    }

    fn hooks(&self) -> &'a dyn MappingHooks {
        self.engine.hooks.as_ref()
    }

    fn entries(&mut self, entries: &[TemplateEntry], base: &ResolvedPath, scope: Scope<'_>) -> Result<()> {
        for entry in entries {
            self.entry(entry, base, scope)?;
        }
        Ok(())
    }

    fn entry(&mut self, entry: &TemplateEntry, base: &ResolvedPath, scope: Scope<'_>) -> Result<()> {
        let location = Path::from_segments(
            base.keys()
                .iter()
                .map(|key| Segment::literal(key.as_str()))
                .chain(entry.target.segments().iter().cloned()),
        );

        match &entry.node {
            TemplateNode::Nested(children) => {
                let nested = ResolvedPath::from_keys(location.segments().iter().map(|s| s.as_str()));
                self.entries(children, &nested, scope)
            }
            TemplateNode::Directive(directive) => {
                let nested = ResolvedPath::from_keys(location.segments().iter().map(|s| s.as_str()));
                self.directive(directive, &nested, scope)
            }
            leaf => self.leaf(leaf, &location, scope),
        }
    }

    fn directive(&mut self, directive: &Directive, base: &ResolvedPath, scope: Scope<'_>) -> Result<()> {
        let location = base.to_string();
        let query = Query::new(self.evaluator, self.source);
        let (prefix, selections) = query.select(
            directive,
            scope.bindings,
            self.engine.config.reindex_wildcard,
            &location,
        )?;

        let prefix_text = prefix.to_string();
        if selections.is_empty() {
            let pair = PairContext {
                source_path: &prefix_text,
                target_path: &location,
                bindings: scope.bindings,
            };
            if WildcardResolver::resolve_single(&base.to_path(), &self.target).is_none() {
                self.write(base.clone(), Value::list(), &pair)?;
            }
            return Ok(());
        }

        let grouped = !directive.group_by.is_empty();
        for Selection { key, rows } in selections {
            let Some(first) = rows.first() else {
                continue;
            };
            let mut row_base = base.clone();
            row_base.push_bound(key);

            let group: Vec<Vec<String>> = rows.iter().map(|row| row.bindings.clone()).collect();
            let row_scope = Scope {
                bindings: &first.bindings,
                group: grouped.then_some(group.as_slice()),
            };

            match directive.projection.as_deref() {
                Some(TemplateNode::Nested(children)) => self.entries(children, &row_base, row_scope)?,
                Some(TemplateNode::Directive(inner)) => self.directive(inner, &row_base, row_scope)?,
                Some(leaf) => self.leaf(leaf, &row_base.to_path(), row_scope)?,
                None => {
                    let target_text = row_base.to_string();
                    let pair = PairContext {
                        source_path: &prefix_text,
                        target_path: &target_text,
                        bindings: row_scope.bindings,
                    };
                    let value = if grouped {
                        Value::List(rows.iter().map(|row| row.value.clone()).collect())
                    } else {
                        first.value.clone()
                    };
                    self.write(row_base, value, &pair)?;
                }
            }
        }
        Ok(())
    }

    fn leaf(&mut self, node: &TemplateNode, target: &Path, scope: Scope<'_>) -> Result<()> {
        let hooks = self.hooks();
        let source_text = describe(node);
        let target_text = target.to_string();
        let pair = PairContext {
            source_path: &source_text,
            target_path: &target_text,
            bindings: scope.bindings,
        };

        match hooks
            .before_pair(&pair)
            .map_err(hook_error(HookPoint::BeforePair))?
        {
            HookAction::Continue => {}
            HookAction::Skip => return Ok(()),
            HookAction::Replace(value) => {
                hooks
                    .after_pair(&pair, &value)
                    .map_err(hook_error(HookPoint::AfterPair))?;
                return self.write_pattern(target, value, &pair);
            }
        }

        if let TemplateNode::Expression(expr) = node
            && target.has_wildcard()
            && self.spreads(expr, scope)
        {
            let matches = self.matches(expr, scope)?;
            let values = Value::List(matches.iter().map(|(_, value)| value.clone()).collect());
            hooks
                .after_pair(&pair, &values)
                .map_err(hook_error(HookPoint::AfterPair))?;

            let sources: Vec<ResolvedPath> = matches.iter().map(|(resolved, _)| resolved.clone()).collect();
            let locations = self.mutator.plan_targets(target, &sources);
            for (location, (_, value)) in locations.into_iter().zip(matches) {
                self.write(location, value, &pair)?;
            }
            return Ok(());
        }

        let value = self.evaluate_node(node, scope)?;
        hooks
            .after_pair(&pair, &value)
            .map_err(hook_error(HookPoint::AfterPair))?;
        self.write_pattern(target, value, &pair)
    }

    /// Whether each match of `expr` is written to its own target location
    fn spreads(&self, expr: &Expression, scope: Scope<'_>) -> bool {
        scope.group.is_none()
            && expr.path.bind(scope.bindings).has_wildcard()
            && !self.has_aggregate(expr)
    }

    fn has_aggregate(&self, expr: &Expression) -> bool {
        expr.filters.iter().any(|call| {
            self.engine
                .registry
                .get(&call.name)
                .is_some_and(|filter| filter.is_aggregate())
        })
    }

    fn leads_with_aggregate(&self, expr: &Expression) -> bool {
        expr.filters.first().is_some_and(|call| {
            self.engine
                .registry
                .get(&call.name)
                .is_some_and(|filter| filter.is_aggregate())
        })
    }

    /// Matches of a wildcard expression, each with default and filters applied
    fn matches(&self, expr: &Expression, scope: Scope<'_>) -> Result<Vec<(ResolvedPath, Value)>> {
        let path = expr.path.bind(scope.bindings);
        WildcardResolver::resolve_refs(&path, self.source)
            .into_iter()
            .map(|(resolved, value)| {
                let value = match (value, &expr.default) {
                    (Value::Null, Some(default)) => default.clone(),
                    (value, _) => value.clone(),
                };
                Ok((resolved, self.evaluator.apply_filters(value, &expr.filters)?))
            })
            .collect()
    }

    fn evaluate(&self, expr: &Expression, scope: Scope<'_>) -> Result<Value> {
        match scope.group {
            Some(rows) if self.leads_with_aggregate(expr) => {
                self.evaluator.evaluate_group(expr, self.source, rows)
            }
            _ => self.evaluator.evaluate_bound(expr, self.source, scope.bindings),
        }
    }

    fn evaluate_node(&self, node: &TemplateNode, scope: Scope<'_>) -> Result<Value> {
        match node {
            TemplateNode::Expression(expr) => self.evaluate(expr, scope),
            TemplateNode::Interpolation(pieces) => {
                let mut rendered = String::new();
                for piece in pieces {
                    match piece {
                        Piece::Text(text) => rendered.push_str(text),
                        Piece::Expression(expr) => {
                            rendered.push_str(&self.evaluate(expr, scope)?.to_display_string())
                        }
                    }
                }
                Ok(Value::String(rendered))
            }
            TemplateNode::Literal(value) => Ok(value.clone()),
            // Containers are walked by `entry`
            TemplateNode::Nested(_) | TemplateNode::Directive(_) => Ok(Value::Null),
        }
    }

    /// Write one value at `target`; a wildcard target receives it under
    /// every key it already has
    fn write_pattern(&mut self, target: &Path, value: Value, pair: &PairContext<'_>) -> Result<()> {
        let Some(prefix) = target.wildcard_prefix() else {
            let location = ResolvedPath::from_keys(target.segments().iter().map(|s| s.as_str()));
            return self.write(location, value, pair);
        };

        let suffix = &target.segments()[prefix.len()..];
        let locations: Vec<ResolvedPath> = WildcardResolver::resolve_refs(&prefix, &self.target)
            .into_iter()
            .map(|(mut resolved, _)| {
                for segment in suffix {
                    resolved.push_literal(segment.as_str());
                }
                resolved
            })
            .collect();
        for location in locations {
            self.write(location, value.clone(), pair)?;
        }
        Ok(())
    }

    /// The single place values reach the target
    fn write(&mut self, location: ResolvedPath, value: Value, pair: &PairContext<'_>) -> Result<()> {
        let config = self.engine.config;
        let mut value = if config.trim_values {
            trim_strings(value)
        } else {
            value
        };
        if let Some(pipeline) = &self.engine.pipeline {
            value = pipeline.apply_at(&location, value)?;
        }
        if config.skip_null && value.is_null() {
            log::trace!("skipping null value for '{location}'");
            return Ok(());
        }

        let hooks = self.hooks();
        let ctx = WriteContext {
            pair: *pair,
            target: &location,
        };
        match hooks
            .before_write(&ctx, &value)
            .map_err(hook_error(HookPoint::BeforeWrite))?
        {
            HookAction::Continue => {}
            HookAction::Skip => return Ok(()),
            HookAction::Replace(replacement) => value = replacement,
        }

        self.target = self
            .mutator
            .write(mem::take(&mut self.target), &location, value.clone());
        hooks
            .after_write(&ctx, &value)
            .map_err(hook_error(HookPoint::AfterWrite))
    }
}

fn describe(node: &TemplateNode) -> String {
    match node {
        TemplateNode::Expression(expr) => expr.raw.clone(),
        TemplateNode::Interpolation(pieces) => pieces
            .iter()
            .map(|piece| match piece {
                Piece::Text(text) => text.clone(),
                Piece::Expression(expr) => expr.raw.clone(),
            })
            .collect(),
        TemplateNode::Literal(value) => value.to_display_string(),
        TemplateNode::Nested(_) | TemplateNode::Directive(_) => String::new(),
    }
}

fn trim_strings(value: Value) -> Value {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.len() == text.len() {
                Value::String(text)
            } else {
                Value::String(trimmed.to_string())
            }
        }
        Value::List(items) => Value::List(items.into_iter().map(trim_strings).collect()),
        Value::Map(map) => Value::Map(
            map.into_iter()
                .map(|(key, item)| (key, trim_strings(item)))
                .collect(),
        ),
        other => match other.as_container() {
            Some(container) => container.with_set_many(
                container
                    .to_canonical_array()
                    .into_iter()
                    .map(|(key, item)| (key, trim_strings(item)))
                    .collect(),
            ),
            None => other,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::hooks::HookResult;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn json(value: serde_json::Value) -> Value {
        Value::from(value)
    }

    #[test]
    fn test_wildcard_leaf_spreads_over_target() {
        let engine = MappingEngine::new();
        let source = json(json!({"users": [{"name": " a "}, {"name": "b"}]}));
        let result = engine
            .map_template(&source, &json(json!({"people.*.label": "{{ users.*.name | upper }}"})))
            .unwrap();
        assert_eq!(result, json(json!({"people": [{"label": "A"}, {"label": "B"}]})));
    }

    #[test]
    fn test_skip_null_and_trim_can_be_disabled() {
        let source = json(json!({"a": " x ", "b": null}));
        let template = json(json!({"a": "{{ a }}", "b": "{{ b }}"}));

        let default = MappingEngine::new().map_template(&source, &template).unwrap();
        assert_eq!(default, json(json!({"a": "x"})));

        let verbatim = MappingEngine::new()
            .with_config(MapperConfig::verbatim())
            .map_template(&source, &template)
            .unwrap();
        assert_eq!(verbatim, json(json!({"a": " x ", "b": null})));
    }

    #[test]
    fn test_directive_scenario() {
        let engine = MappingEngine::new();
        let source = json(json!({"users": [{"total": 100}, {"total": 200}, {"total": 150}]}));
        let template = json(json!({"top": {
            "WHERE": {"{{ users.*.total }}": [">", 100]},
            "ORDER BY": {"{{ users.*.total }}": "DESC"},
            "LIMIT": 5,
            "*": {"total": "{{ users.*.total }}"}
        }}));
        assert_eq!(
            engine.map_template(&source, &template).unwrap(),
            json(json!({"top": [{"total": 200}, {"total": 150}]}))
        );
    }

    #[test]
    fn test_directive_keeps_source_keys_unless_reindexed() {
        let source = json(json!({"users": [{"n": "a", "on": false}, {"n": "b", "on": true}, {"n": "c", "on": true}]}));
        let template = json(json!({"active": {
            "WHERE": {"{{ users.*.on }}": true},
            "*": "{{ users.*.n }}"
        }}));

        let kept = MappingEngine::new().map_template(&source, &template).unwrap();
        assert_eq!(kept, json(json!({"active": {"1": "b", "2": "c"}})));

        let reindexed = MappingEngine::new()
            .with_config(MapperConfig {
                reindex_wildcard: true,
                ..MapperConfig::default()
            })
            .map_template(&source, &template)
            .unwrap();
        assert_eq!(reindexed, json(json!({"active": ["b", "c"]})));
    }

    #[test]
    fn test_group_by_aggregates() {
        let source = json(json!({"sales": [
            {"region": "n", "amount": 10},
            {"region": "s", "amount": 5},
            {"region": "n", "amount": 7}
        ]}));
        let template = json(json!({"regions": {
            "GROUP BY": "{{ sales.*.region }}",
            "*": {
                "region": "{{ sales.*.region }}",
                "total": "{{ sales.*.amount | sum }}",
                "count": "{{ sales.*.amount | count }}"
            }
        }}));
        assert_eq!(
            MappingEngine::new().map_template(&source, &template).unwrap(),
            json(json!({"regions": [
                {"region": "n", "total": 17, "count": 2},
                {"region": "s", "total": 5, "count": 1}
            ]}))
        );
    }

    #[test]
    fn test_nested_directive_is_correlated() {
        let source = json(json!({"orders": [
            {"id": 1, "items": [{"sku": "a", "qty": 0}, {"sku": "b", "qty": 2}]},
            {"id": 2, "items": [{"sku": "c", "qty": 1}]}
        ]}));
        let template = json(json!({"orders": {
            "*": {
                "id": "{{ orders.*.id }}",
                "lines": {
                    "WHERE": [["{{ orders.*.items.*.qty }}", ">", 0]],
                    "LIMIT": 10,
                    "*": "{{ orders.*.items.*.sku }}"
                }
            }
        }}));
        assert_eq!(
            MappingEngine::new().map_template(&source, &template).unwrap(),
            json(json!({"orders": [
                {"id": 1, "lines": ["b"]},
                {"id": 2, "lines": ["c"]}
            ]}))
        );
    }

    #[test]
    fn test_empty_selection_writes_empty_list() {
        let source = json(json!({"users": [{"total": 1}]}));
        let template = json(json!({"top": {
            "WHERE": {"{{ users.*.total }}": [">", 100]},
            "*": "{{ users.*.total }}"
        }}));
        assert_eq!(
            MappingEngine::new().map_template(&source, &template).unwrap(),
            json(json!({"top": []}))
        );
    }

    #[test]
    fn test_interpolation_and_literals() {
        let source = json(json!({"user": {"first": "Ada", "last": "Lovelace"}}));
        let template = json(json!({
            "full": "{{ user.first }} {{ user.last | upper }}",
            "kind": "person",
            "version": 2
        }));
        assert_eq!(
            MappingEngine::new().map_template(&source, &template).unwrap(),
            json(json!({"full": "Ada LOVELACE", "kind": "person", "version": 2}))
        );
    }

    #[test]
    fn test_pipeline_scoped_by_target() {
        let registry = FilterRegistry::standard();
        let pipeline = Pipeline::new()
            .pipe_filter_at("out.*.code", &registry, "lower", &[])
            .unwrap();
        let engine = MappingEngine::new().with_pipeline(pipeline);
        let source = json(json!({"items": [{"code": "AB"}, {"code": "CD"}], "title": "XY"}));
        let template = json(json!({"out.*.code": "{{ items.*.code }}", "title": "{{ title }}"}));
        assert_eq!(
            engine.map_template(&source, &template).unwrap(),
            json(json!({"out": [{"code": "ab"}, {"code": "cd"}], "title": "XY"}))
        );
    }

    #[test]
    fn test_reverse_map() {
        let engine = MappingEngine::new();
        let mapping = engine
            .compile(&json(json!({
                "profile": {"name": "{{ user.name }}"},
                "ids.*": "{{ items.*.id }}",
                "greeting": "Hello {{ user.name }}"
            })))
            .unwrap();
        let source = json(json!({"user": {"name": "ada"}, "items": [{"id": 1}, {"id": 2}]}));
        let mapped = engine.map(&source, &Value::map(), &mapping).unwrap();
        assert_eq!(
            mapped,
            json(json!({"profile": {"name": "ada"}, "ids": [1, 2], "greeting": "Hello ada"}))
        );

        let edited = json(json!({"profile": {"name": "grace"}, "ids": [1, 3]}));
        let restored = engine.reverse_map(&edited, &source, &mapping).unwrap();
        assert_eq!(
            restored,
            json(json!({"user": {"name": "grace"}, "items": [{"id": 1}, {"id": 3}]}))
        );
    }

    #[test]
    fn test_map_paths() {
        let engine = MappingEngine::new();
        let result = engine
            .map_paths(
                &json(json!({"a": {"b": 1}, "list": [1, 2]})),
                &json(json!({"keep": true})),
                [("a.b", "x.y"), ("list.*", "copy.*")],
            )
            .unwrap();
        assert_eq!(result, json(json!({"keep": true, "x": {"y": 1}, "copy": [1, 2]})));
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl MappingHooks for Recorder {
        fn before_entry(&self, ctx: &EntryContext<'_>) -> HookResult<HookAction> {
            self.events.lock().push(format!("entry:{}", ctx.key));
            Ok(match ctx.key {
                "skipped" => HookAction::Skip,
                "replaced" => HookAction::Replace(Value::from("r")),
                _ => HookAction::Continue,
            })
        }

        fn before_write(&self, ctx: &WriteContext<'_>, value: &Value) -> HookResult<HookAction> {
            self.events.lock().push(format!("write:{}", ctx.target));
            if ctx.target.keys().last().is_some_and(|key| key == "secret") {
                return Ok(HookAction::Skip);
            }
            if value.as_str() == Some("boom") {
                return Err(HookError::new("refusing boom"));
            }
            Ok(HookAction::Continue)
        }

        fn after_all(&self, _ctx: &MappingContext<'_>, result: &mut Value) -> HookResult<()> {
            *result = Mutator::new()
                .set(result, "meta.done", Value::Bool(true))
                .map_err(|error| HookError::new(error.to_string()))?;
            Ok(())
        }
    }

    #[test]
    fn test_hooks_skip_replace_and_rewrite() {
        let engine = MappingEngine::new().with_hooks(Recorder::default());
        let source = json(json!({"a": 1, "s": "x"}));
        let template = json(json!({
            "a": "{{ a }}",
            "skipped": "{{ a }}",
            "replaced": "{{ a }}",
            "secret": "{{ s }}"
        }));
        let result = engine.map_template(&source, &template).unwrap();
        assert_eq!(
            result,
            json(json!({"a": 1, "replaced": "r", "meta": {"done": true}}))
        );
    }

    #[derive(Default)]
    struct PairRecorder {
        events: Mutex<Vec<String>>,
    }

    impl MappingHooks for PairRecorder {
        fn after_entry(&self, ctx: &EntryContext<'_>, target: &Value) -> HookResult<()> {
            let keys = target
                .as_container()
                .map(|container| container.keys_of().join(","))
                .unwrap_or_default();
            self.events.lock().push(format!("entry {} [{keys}]", ctx.key));
            Ok(())
        }

        fn before_pair(&self, ctx: &PairContext<'_>) -> HookResult<HookAction> {
            Ok(match ctx.target_path {
                "dropped" => HookAction::Skip,
                "fixed" => HookAction::Replace(Value::from("F")),
                _ => HookAction::Continue,
            })
        }

        fn after_write(&self, ctx: &WriteContext<'_>, value: &Value) -> HookResult<()> {
            self.events.lock().push(format!(
                "write {} = {} from {}",
                ctx.target,
                value.to_display_string(),
                ctx.pair.target_path
            ));
            Ok(())
        }
    }

    #[test]
    fn test_pair_hooks_and_write_observers() {
        let recorder = Arc::new(PairRecorder::default());

        struct Shared(Arc<PairRecorder>);
        impl MappingHooks for Shared {
            fn after_entry(&self, ctx: &EntryContext<'_>, target: &Value) -> HookResult<()> {
                self.0.after_entry(ctx, target)
            }
            fn before_pair(&self, ctx: &PairContext<'_>) -> HookResult<HookAction> {
                self.0.before_pair(ctx)
            }
            fn after_write(&self, ctx: &WriteContext<'_>, value: &Value) -> HookResult<()> {
                self.0.after_write(ctx, value)
            }
        }

        let engine = MappingEngine::new().with_hooks(Shared(Arc::clone(&recorder)));
        let source = json(json!({"a": 1, "b": 2, "list": ["x", "y"]}));
        let template = json(json!({
            "dropped": "{{ a }}",
            "fixed": "{{ b }}",
            "tags.*": "{{ list.* }}"
        }));

        let result = engine.map_template(&source, &template).unwrap();
        assert_eq!(result, json(json!({"fixed": "F", "tags": ["x", "y"]})));
        assert_eq!(
            *recorder.events.lock(),
            vec![
                "entry dropped []".to_string(),
                "write fixed = F from fixed".to_string(),
                "entry fixed [fixed]".to_string(),
                "write tags.0 = x from tags.*".to_string(),
                "write tags.1 = y from tags.*".to_string(),
                "entry tags.* [fixed,tags]".to_string(),
            ]
        );
    }

    #[test]
    fn test_hook_errors_propagate() {
        let engine = MappingEngine::new().with_hooks(Recorder::default());
        let error = engine
            .map_template(&json(json!({"v": "boom"})), &json(json!({"v": "{{ v }}"})))
            .unwrap_err();
        assert_eq!(
            error,
            Error::Hook {
                point: HookPoint::BeforeWrite,
                message: "refusing boom".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_filter_surfaces_at_mapping_time() {
        let engine = MappingEngine::new();
        let mapping = engine.compile(&json(json!({"a": "{{ a | shout }}"}))).unwrap();
        assert!(matches!(
            engine.map(&json(json!({"a": 1})), &Value::map(), &mapping),
            Err(Error::UnknownFilter { .. })
        ));
    }
}
