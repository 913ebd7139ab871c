//! Parsed forms of dot-paths and template expressions

pub mod expression;
pub mod path;

pub use expression::{Expression, ExpressionForm, FilterCall};
pub use path::{Path, ResolvedPath, SEPARATOR, Segment, WILDCARD};
