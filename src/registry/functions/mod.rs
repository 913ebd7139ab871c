//! Built-in filters grouped by family

pub mod cast;
pub mod collection;
pub mod json;
pub mod math;
pub mod string;

use crate::model::Value;
use crate::parser::parse_literal;
use crate::registry::transformer::{FilterError, FilterRegistry, FilterResult};

pub use cast::register_cast_filters;
pub use collection::register_collection_filters;
pub use json::register_json_filters;
pub use math::register_math_filters;
pub use string::register_string_filters;

/// Register every built-in filter
pub fn register_builtin_filters(registry: &mut FilterRegistry) {
    register_string_filters(registry);
    register_cast_filters(registry);
    register_math_filters(registry);
    register_json_filters(registry);
    register_collection_filters(registry);
}

/// Positional argument `index`
pub(crate) fn arg<'a>(filter: &str, args: &'a [String], index: usize) -> FilterResult<&'a str> {
    args.get(index).map(String::as_str).ok_or_else(|| {
        FilterError::invalid_argument(filter, format!("missing argument {}", index + 1))
    })
}

/// Parse an integer argument
pub(crate) fn arg_i64(filter: &str, arg: &str) -> FilterResult<i64> {
    arg.trim()
        .parse()
        .map_err(|_| FilterError::invalid_argument(filter, format!("'{arg}' is not an integer")))
}

/// Parse a numeric argument
pub(crate) fn arg_f64(filter: &str, arg: &str) -> FilterResult<f64> {
    arg.trim()
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .ok_or_else(|| FilterError::invalid_argument(filter, format!("'{arg}' is not a number")))
}

/// Interpret an argument as a literal value, falling back to the raw string
pub(crate) fn parse_arg_value(arg: &str) -> Value {
    parse_literal(arg).unwrap_or_else(|| Value::from(arg))
}

/// The elements an aggregate filter works on.
///
/// Lists and containers yield their values, null yields nothing and any
/// other scalar is a one-element list.
pub(crate) fn elements(value: Value) -> Vec<Value> {
    match value {
        Value::List(items) => items,
        Value::Null => Vec::new(),
        other if other.is_container() => other.values(),
        scalar => vec![scalar],
    }
}
