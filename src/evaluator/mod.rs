//! Path resolution and expression evaluation
//!
//! [`WildcardResolver`] enumerates the concrete matches of a path;
//! [`ExpressionEvaluator`] resolves a parsed expression and runs its filter
//! chain.

#![warn(missing_docs)]

mod expression;
mod resolver;

pub use expression::ExpressionEvaluator;
pub use resolver::{WildcardMatches, WildcardResolver};
