//! Narrow coercion table used by typed getters and cast filters

use super::value::{Map, Value};
use thiserror::Error;

/// Result type for coercions
pub type CoercionResult<T> = Result<T, CoercionError>;

/// Errors that can occur during coercion
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoercionError {
    /// Cannot coerce between the specified types
    #[error("Cannot coerce from {from} to {to}")]
    IncompatibleTypes {
        /// Source type name
        from: String,
        /// Target type name
        to: String,
    },
    /// The value format is invalid for the target type
    #[error("Invalid format '{value}' for type {target_type}")]
    InvalidFormat {
        /// Offending value
        value: String,
        /// Target type name
        target_type: String,
    },
}

/// Coercion utility
pub struct TypeCoercion;

impl TypeCoercion {
    /// Coerce to a string.
    ///
    /// Strings pass through, numbers and booleans are formatted; null and
    /// containers are rejected.
    pub fn coerce_to_string(value: &Value) -> CoercionResult<String> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Int(i) => Ok(i.to_string()),
            Value::Float(f) if f.is_finite() => Ok(f.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(incompatible(other, "string")),
        }
    }

    /// Coerce to an integer.
    ///
    /// Floats truncate toward zero, numeric strings are parsed, booleans map
    /// to 1/0.
    pub fn coerce_to_integer(value: &Value) -> CoercionResult<i64> {
        match value {
            Value::Int(i) => Ok(*i),
            Value::Float(f) if f.is_finite() => Ok(f.trunc() as i64),
            Value::Bool(b) => Ok(i64::from(*b)),
            Value::String(s) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<i64>()
                    .ok()
                    .or_else(|| {
                        trimmed
                            .parse::<f64>()
                            .ok()
                            .filter(|f| f.is_finite())
                            .map(|f| f.trunc() as i64)
                    })
                    .ok_or_else(|| invalid_format(s, "int"))
            }
            other => Err(incompatible(other, "int")),
        }
    }

    /// Coerce to a float
    pub fn coerce_to_float(value: &Value) -> CoercionResult<f64> {
        match value {
            Value::Int(i) => Ok(*i as f64),
            Value::Float(f) => Ok(*f),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .ok_or_else(|| invalid_format(s, "float")),
            other => Err(incompatible(other, "float")),
        }
    }

    /// Coerce to a boolean.
    ///
    /// `"true" / "1" / "yes" / "on"` are true, `"false" / "0" / "no" / "off" / ""`
    /// are false (case-insensitive); numbers are true when non-zero.
    pub fn coerce_to_boolean(value: &Value) -> CoercionResult<bool> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Int(i) => Ok(*i != 0),
            Value::Float(f) => Ok(*f != 0.0),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" | "" => Ok(false),
                _ => Err(invalid_format(s, "bool")),
            },
            other => Err(incompatible(other, "bool")),
        }
    }

    /// Coerce to an ordered string-keyed map.
    ///
    /// Containers expose their canonical view; scalars are rejected.
    pub fn coerce_to_array(value: &Value) -> CoercionResult<Map> {
        value
            .as_container()
            .map(|container| container.to_canonical_array())
            .ok_or_else(|| incompatible(value, "array"))
    }
}

fn incompatible(value: &Value, to: &str) -> CoercionError {
    CoercionError::IncompatibleTypes {
        from: value.type_name().to_string(),
        to: to.to_string(),
    }
}

fn invalid_format(value: &str, target_type: &str) -> CoercionError {
    CoercionError::InvalidFormat {
        value: value.to_string(),
        target_type: target_type.to_string(),
    }
}
