//! Mapping lifecycle hooks
//!
//! Hooks observe a mapping at four levels: the whole run, each top-level
//! template entry, each source/target pair and each physical write. Every
//! `before_*` hook can let the step continue, skip it, or replace the value
//! it would produce. `after_*` hooks observe the outcome.

use crate::ast::ResolvedPath;
use crate::model::Value;
use std::fmt;
use thiserror::Error;

/// Where in the mapping lifecycle a hook runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// Before anything is evaluated
    BeforeAll,
    /// After the whole mapping
    AfterAll,
    /// Before a top-level template entry
    BeforeEntry,
    /// After a top-level template entry
    AfterEntry,
    /// Before a source expression is evaluated for a target
    BeforePair,
    /// After a source expression was evaluated
    AfterPair,
    /// Before a value is written at a concrete path
    BeforeWrite,
    /// After a value was written
    AfterWrite,
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HookPoint::BeforeAll => "before_all",
            HookPoint::AfterAll => "after_all",
            HookPoint::BeforeEntry => "before_entry",
            HookPoint::AfterEntry => "after_entry",
            HookPoint::BeforePair => "before_pair",
            HookPoint::AfterPair => "after_pair",
            HookPoint::BeforeWrite => "before_write",
            HookPoint::AfterWrite => "after_write",
        })
    }
}

/// Error raised by a hook; aborts the mapping
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct HookError {
    /// Error message
    pub message: String,
}

impl HookError {
    /// Create a hook error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result type for hooks
pub type HookResult<T> = std::result::Result<T, HookError>;

/// What a `before_*` hook wants to happen next
#[derive(Debug, Clone, PartialEq, Default)]
pub enum HookAction {
    /// Proceed normally
    #[default]
    Continue,
    /// Skip this step; nothing is evaluated or written for it
    Skip,
    /// Use this value instead of evaluating
    Replace(Value),
}

/// Context for the whole mapping
#[derive(Debug, Clone, Copy)]
pub struct MappingContext<'a> {
    /// Source data
    pub source: &'a Value,
    /// Target as it stands
    pub target: &'a Value,
}

/// Context for one top-level template entry
#[derive(Debug, Clone, Copy)]
pub struct EntryContext<'a> {
    /// Template key of the entry
    pub key: &'a str,
    /// Source data
    pub source: &'a Value,
}

/// Context for one source/target pair
#[derive(Debug, Clone, Copy)]
pub struct PairContext<'a> {
    /// Source expression as written
    pub source_path: &'a str,
    /// Target path, wildcards unbound
    pub target_path: &'a str,
    /// Wildcard keys of the current row
    pub bindings: &'a [String],
}

/// Context for one physical write
#[derive(Debug, Clone, Copy)]
pub struct WriteContext<'a> {
    /// The pair the write belongs to
    pub pair: PairContext<'a>,
    /// Concrete location being written
    pub target: &'a ResolvedPath,
}

/// Lifecycle callbacks for a mapping run
///
/// Every method has a no-op default, so implementors override only what
/// they need.
///
/// # Examples
///
/// ```rust
/// use octofhir_datapath::mapper::{HookAction, HookResult, MappingHooks, WriteContext};
/// use octofhir_datapath::model::Value;
///
/// struct HideSecrets;
///
/// impl MappingHooks for HideSecrets {
///     fn before_write(&self, ctx: &WriteContext<'_>, _value: &Value) -> HookResult<HookAction> {
///         let secret = ctx.target.keys().last().is_some_and(|key| key == "password");
///         Ok(if secret { HookAction::Skip } else { HookAction::Continue })
///     }
/// }
/// ```
pub trait MappingHooks: Send + Sync {
    /// Called once before the mapping starts. `Replace` swaps the source,
    /// `Skip` returns the target untouched.
    fn before_all(&self, _ctx: &MappingContext<'_>) -> HookResult<HookAction> {
        Ok(HookAction::Continue)
    }

    /// Called once with the finished target, which may be edited in place
    fn after_all(&self, _ctx: &MappingContext<'_>, _result: &mut Value) -> HookResult<()> {
        Ok(())
    }

    /// Called before a top-level entry. `Replace` writes the given value
    /// at the entry's target.
    fn before_entry(&self, _ctx: &EntryContext<'_>) -> HookResult<HookAction> {
        Ok(HookAction::Continue)
    }

    /// Called after a top-level entry with the target so far
    fn after_entry(&self, _ctx: &EntryContext<'_>, _target: &Value) -> HookResult<()> {
        Ok(())
    }

    /// Called before a source expression is evaluated
    fn before_pair(&self, _ctx: &PairContext<'_>) -> HookResult<HookAction> {
        Ok(HookAction::Continue)
    }

    /// Called with the evaluated value of a pair
    fn after_pair(&self, _ctx: &PairContext<'_>, _value: &Value) -> HookResult<()> {
        Ok(())
    }

    /// Called before each write
    fn before_write(&self, _ctx: &WriteContext<'_>, _value: &Value) -> HookResult<HookAction> {
        Ok(HookAction::Continue)
    }

    /// Called after each write with the written value
    fn after_write(&self, _ctx: &WriteContext<'_>, _value: &Value) -> HookResult<()> {
        Ok(())
    }
}

/// Hooks that do nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl MappingHooks for NoopHooks {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_point_names() {
        assert_eq!(HookPoint::BeforeWrite.to_string(), "before_write");
        assert_eq!(HookPoint::AfterAll.to_string(), "after_all");
    }

    #[test]
    fn test_noop_defaults() {
        let hooks = NoopHooks;
        let source = Value::Null;
        let ctx = EntryContext {
            key: "a",
            source: &source,
        };
        assert_eq!(hooks.before_entry(&ctx), Ok(HookAction::Continue));
        assert_eq!(HookError::new("boom").to_string(), "boom");
    }
}
