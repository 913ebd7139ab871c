//! Filter registry
//!
//! Transformers are looked up by name when an expression's filter chain is
//! evaluated, so parsing stays independent of what is registered.

#![warn(missing_docs)]

pub mod functions;
pub mod transformer;

pub use transformer::{FilterError, FilterRegistry, FilterResult, FnTransformer, Transformer};

/// Create a registry with every built-in filter
pub fn create_standard_registry() -> FilterRegistry {
    FilterRegistry::standard()
}
