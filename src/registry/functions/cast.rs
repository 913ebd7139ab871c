//! Type cast filters
//!
//! A value that cannot be converted becomes null.

use crate::model::{TypeCoercion, Value};
use crate::registry::transformer::{FilterRegistry, FilterResult, Transformer};

/// `int`
pub struct IntFilter;

impl Transformer for IntFilter {
    fn name(&self) -> &str {
        "int"
    }
    fn documentation(&self) -> &str {
        "Convert to an integer; floats truncate, failures become null"
    }
    fn transform(&self, value: Value, _args: &[String]) -> FilterResult<Value> {
        Ok(TypeCoercion::coerce_to_integer(&value).map_or(Value::Null, Value::Int))
    }
}

/// `float`
pub struct FloatFilter;

impl Transformer for FloatFilter {
    fn name(&self) -> &str {
        "float"
    }
    fn transform(&self, value: Value, _args: &[String]) -> FilterResult<Value> {
        Ok(TypeCoercion::coerce_to_float(&value).map_or(Value::Null, Value::Float))
    }
}

/// `bool`
pub struct BoolFilter;

impl Transformer for BoolFilter {
    fn name(&self) -> &str {
        "bool"
    }
    fn transform(&self, value: Value, _args: &[String]) -> FilterResult<Value> {
        Ok(TypeCoercion::coerce_to_boolean(&value).map_or(Value::Null, Value::Bool))
    }
}

/// `string`
pub struct StringFilter;

impl Transformer for StringFilter {
    fn name(&self) -> &str {
        "string"
    }
    fn transform(&self, value: Value, _args: &[String]) -> FilterResult<Value> {
        Ok(TypeCoercion::coerce_to_string(&value).map_or(Value::Null, Value::String))
    }
}

/// Register all cast filters
pub fn register_cast_filters(registry: &mut FilterRegistry) {
    registry.register(IntFilter);
    registry.register(FloatFilter);
    registry.register(BoolFilter);
    registry.register(StringFilter);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_casts() {
        assert_eq!(IntFilter.transform(Value::from("12"), &[]), Ok(Value::Int(12)));
        assert_eq!(IntFilter.transform(Value::Float(9.99), &[]), Ok(Value::Int(9)));
        assert_eq!(IntFilter.transform(Value::from("abc"), &[]), Ok(Value::Null));
        assert_eq!(FloatFilter.transform(Value::Int(2), &[]), Ok(Value::Float(2.0)));
        assert_eq!(BoolFilter.transform(Value::from("on"), &[]), Ok(Value::Bool(true)));
        assert_eq!(BoolFilter.transform(Value::from("perhaps"), &[]), Ok(Value::Null));
        assert_eq!(StringFilter.transform(Value::Int(5), &[]), Ok(Value::from("5")));
        assert_eq!(StringFilter.transform(Value::Null, &[]), Ok(Value::Null));
    }
}
