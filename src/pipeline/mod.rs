//! Transformer pipelines
//!
//! A [`Pipeline`] is an ordered list of stages. A stage either applies a
//! transformer to every scalar leaf of a value, or to every node matching a
//! (possibly wildcard) path. Stages run in the order they were added.

#![warn(missing_docs)]

use crate::ast::{Path, ResolvedPath};
use crate::error::Result;
use crate::evaluator::WildcardResolver;
use crate::model::Value;
use crate::mutator::write_at;
use crate::parser::PathParser;
use crate::registry::{FilterRegistry, FnTransformer, Transformer};
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
enum Stage {
    Leaves {
        transformer: Arc<dyn Transformer>,
        args: Vec<String>,
    },
    At {
        pattern: Arc<Path>,
        transformer: Arc<dyn Transformer>,
        args: Vec<String>,
    },
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Leaves { transformer, args } => f
                .debug_struct("Leaves")
                .field("transformer", &transformer.name())
                .field("args", args)
                .finish(),
            Stage::At {
                pattern,
                transformer,
                args,
            } => f
                .debug_struct("At")
                .field("pattern", &pattern.to_string())
                .field("transformer", &transformer.name())
                .field("args", args)
                .finish(),
        }
    }
}

impl Stage {
    fn validate(&self) -> Result<()> {
        let (Stage::Leaves { transformer, args } | Stage::At { transformer, args, .. }) = self;
        transformer.validate_args(args)?;
        Ok(())
    }
}

/// Ordered chain of value transformers
///
/// # Examples
///
/// ```rust
/// use octofhir_datapath::pipeline::Pipeline;
/// use octofhir_datapath::registry::FilterRegistry;
/// use octofhir_datapath::model::Value;
/// use serde_json::json;
///
/// let registry = FilterRegistry::standard();
/// let pipeline = Pipeline::new()
///     .pipe_filter(&registry, "trim", &[]).unwrap()
///     .pipe_filter_at("user.age", &registry, "int", &[]).unwrap();
///
/// let cleaned = pipeline
///     .apply(Value::from(json!({"user": {"name": " ada ", "age": "36"}})))
///     .unwrap();
/// assert_eq!(cleaned, Value::from(json!({"user": {"name": "ada", "age": 36}})));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
    paths: PathParser,
}

impl Pipeline {
    /// Empty pipeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the pipeline has no stages
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Apply `transformer` to every scalar leaf
    pub fn pipe<T: Transformer + 'static>(self, transformer: T) -> Self {
        self.pipe_arc(Arc::new(transformer), Vec::new())
    }

    /// Apply a closure to every scalar leaf
    pub fn pipe_fn<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value, &[String]) -> crate::registry::FilterResult<Value> + Send + Sync + 'static,
    {
        self.pipe(FnTransformer::new(name, f))
    }

    fn pipe_arc(mut self, transformer: Arc<dyn Transformer>, args: Vec<String>) -> Self {
        self.stages.push(Stage::Leaves { transformer, args });
        self
    }

    /// Apply `transformer` to every node matching `path`
    pub fn pipe_at<T: Transformer + 'static>(self, path: &str, transformer: T) -> Result<Self> {
        self.pipe_arc_at(path, Arc::new(transformer), Vec::new())
    }

    fn pipe_arc_at(
        mut self,
        path: &str,
        transformer: Arc<dyn Transformer>,
        args: Vec<String>,
    ) -> Result<Self> {
        let pattern = self.paths.parse(path)?;
        self.stages.push(Stage::At {
            pattern,
            transformer,
            args,
        });
        Ok(self)
    }

    /// Apply a registered filter to every scalar leaf
    pub fn pipe_filter(self, registry: &FilterRegistry, name: &str, args: &[&str]) -> Result<Self> {
        let (transformer, args) = lookup(registry, name, args)?;
        Ok(self.pipe_arc(transformer, args))
    }

    /// Apply a registered filter to every node matching `path`
    pub fn pipe_filter_at(
        self,
        path: &str,
        registry: &FilterRegistry,
        name: &str,
        args: &[&str],
    ) -> Result<Self> {
        let (transformer, args) = lookup(registry, name, args)?;
        self.pipe_arc_at(path, transformer, args)
    }

    /// Run every stage over `value`
    ///
    /// Fails with [`FilterError::InvalidArity`](crate::registry::FilterError)
    /// when a stage added through [`pipe`](Self::pipe) does not carry the
    /// arguments its transformer requires.
    pub fn apply(&self, value: Value) -> Result<Value> {
        let mut value = value;
        for stage in &self.stages {
            stage.validate()?;
            value = match stage {
                Stage::Leaves { transformer, args } => map_leaves(value, transformer.as_ref(), args)?,
                Stage::At {
                    pattern,
                    transformer,
                    args,
                } => apply_path(value, pattern, transformer.as_ref(), args)?,
            };
        }
        Ok(value)
    }

    /// Run every stage over a `value` about to be written at `target`.
    ///
    /// Path stages are matched against the concrete target: a stage whose
    /// path equals the target transforms the whole value, a longer path
    /// reaching below the target transforms the matching descendants, and
    /// any other path stage is skipped.
    pub fn apply_at(&self, target: &ResolvedPath, value: Value) -> Result<Value> {
        let keys = target.keys();
        let mut value = value;
        for stage in &self.stages {
            stage.validate()?;
            value = match stage {
                Stage::Leaves { transformer, args } => map_leaves(value, transformer.as_ref(), args)?,
                Stage::At {
                    pattern,
                    transformer,
                    args,
                } => {
                    let depth = keys.len();
                    if pattern.len() < depth || !pattern_prefix_matches(pattern, keys) {
                        continue;
                    }
                    let relative = Path::from_segments(pattern.segments()[depth..].iter().cloned());
                    apply_path(value, &relative, transformer.as_ref(), args)?
                }
            };
        }
        Ok(value)
    }
}

fn lookup(
    registry: &FilterRegistry,
    name: &str,
    args: &[&str],
) -> Result<(Arc<dyn Transformer>, Vec<String>)> {
    let transformer = registry.resolve(name)?;
    let args: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
    transformer.validate_args(&args)?;
    Ok((transformer, args))
}

fn pattern_prefix_matches(pattern: &Path, keys: &[String]) -> bool {
    pattern
        .segments()
        .iter()
        .zip(keys)
        .all(|(segment, key)| segment.as_literal().is_none_or(|literal| literal == key.as_str()))
}

fn map_leaves(value: Value, transformer: &dyn Transformer, args: &[String]) -> Result<Value> {
    Ok(match value {
        Value::List(items) => Value::List(
            items
                .into_iter()
                .map(|item| map_leaves(item, transformer, args))
                .collect::<Result<Vec<_>>>()?,
        ),
        Value::Map(map) => Value::Map(
            map.into_iter()
                .map(|(key, item)| Ok((key, map_leaves(item, transformer, args)?)))
                .collect::<Result<_>>()?,
        ),
        other => match other.as_container() {
            Some(container) => {
                let entries = container
                    .to_canonical_array()
                    .into_iter()
                    .map(|(key, item)| Ok((key, map_leaves(item, transformer, args)?)))
                    .collect::<Result<Vec<_>>>()?;
                container.with_set_many(entries)
            }
            None => transformer.transform(other, args)?,
        },
    })
}

fn apply_path(
    value: Value,
    pattern: &Path,
    transformer: &dyn Transformer,
    args: &[String],
) -> Result<Value> {
    if pattern.is_root() {
        return Ok(transformer.transform(value, args)?);
    }

    let matches: Vec<(ResolvedPath, Value)> = WildcardResolver::resolve_refs(pattern, &value)
        .into_iter()
        .map(|(resolved, node)| (resolved, node.clone()))
        .collect();

    let mut value = value;
    for (resolved, node) in matches {
        let transformed = transformer.transform(node, args)?;
        value = write_at(value, resolved.keys(), transformed);
    }
    Ok(value)
}
