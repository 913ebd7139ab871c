//! Parsers for dot-paths and template expressions
//!
//! [`parse_path`] and [`parse_expression`] are pure functions. The cached
//! [`PathParser`] and [`ExpressionParser`] wrap them with a shared
//! [`ParseCache`](crate::cache::ParseCache).

#![warn(missing_docs)]

pub mod cached;
pub mod error;
pub mod expression;
pub mod lexer;
pub mod path;
pub mod template;
pub mod tokenizer;

pub use cached::{ExpressionParser, PathParser};
pub use error::{ExpressionError, ExpressionResult, PathError, PathResult, PathSyntaxIssue};
pub use expression::{parse_expression, parse_literal};
pub use path::parse_path;
pub use template::{TemplateKind, TemplatePart, classify, split_placeholders};
