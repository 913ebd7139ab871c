//! JSON encode/decode filters

use crate::model::Value;
use crate::registry::transformer::{FilterError, FilterRegistry, FilterResult, Transformer};

/// `json_encode` (alias `json`) serializes any value to a JSON string
pub struct JsonEncodeFilter;

impl Transformer for JsonEncodeFilter {
    fn name(&self) -> &str {
        "json_encode"
    }
    fn arity(&self) -> (usize, Option<usize>) {
        (0, Some(1))
    }
    fn documentation(&self) -> &str {
        "Serialize to JSON; pass `pretty` for indented output"
    }
    fn transform(&self, value: Value, args: &[String]) -> FilterResult<Value> {
        let json = serde_json::Value::from(value);
        let encoded = match args.first().map(String::as_str) {
            Some("pretty") => serde_json::to_string_pretty(&json),
            Some(other) => {
                return Err(FilterError::invalid_argument(
                    self.name(),
                    format!("unknown option '{other}'"),
                ));
            }
            None => serde_json::to_string(&json),
        };
        encoded
            .map(Value::String)
            .map_err(|e| FilterError::invalid_argument(self.name(), e.to_string()))
    }
}

/// `json_decode` parses a JSON string; invalid JSON becomes null
pub struct JsonDecodeFilter;

impl Transformer for JsonDecodeFilter {
    fn name(&self) -> &str {
        "json_decode"
    }
    fn transform(&self, value: Value, _args: &[String]) -> FilterResult<Value> {
        Ok(match value {
            Value::String(text) => match serde_json::from_str::<serde_json::Value>(&text) {
                Ok(json) => Value::from(json),
                Err(e) => {
                    log::debug!("json_decode: {e}");
                    Value::Null
                }
            },
            other => other,
        })
    }
}

/// Register the JSON filters
pub fn register_json_filters(registry: &mut FilterRegistry) {
    registry.register(JsonEncodeFilter);
    registry.register(JsonDecodeFilter);
    registry.register_alias("json", "json_encode");
}
