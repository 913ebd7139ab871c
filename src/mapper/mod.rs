//! Template-driven mapping between data shapes
//!
//! A template is a nested value whose leaves are expressions such as
//! `"{{ user.name | trim }}"`. [`Mapping`] compiles it once; [`MappingEngine`]
//! evaluates it against source data and writes the results into a target.
//! Keys like `WHERE`, `ORDER BY` and `GROUP BY` turn a template node into a
//! query over wildcard rows.

#![warn(missing_docs)]

pub mod engine;
pub mod hooks;
mod query;
pub mod template;

pub use engine::MappingEngine;
pub use hooks::{
    EntryContext, HookAction, HookError, HookPoint, HookResult, MappingContext, MappingHooks,
    NoopHooks, PairContext, WriteContext,
};
pub use template::{
    Directive, Mapping, Operand, Operator, OrderKey, Piece, Predicate, TemplateEntry,
    TemplateNode,
};
