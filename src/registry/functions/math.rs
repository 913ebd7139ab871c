//! Numeric filters
//!
//! Numeric strings are accepted; anything else that is not a number passes
//! through unchanged.

use super::{arg, arg_f64, arg_i64};
use crate::model::Value;
use crate::registry::transformer::{FilterError, FilterRegistry, FilterResult, Transformer};

/// Integer when the float has no fractional part and fits, float otherwise
fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::Int(value as i64)
    } else {
        Value::Float(value)
    }
}

/// `clamp:min:max`
pub struct ClampFilter;

impl Transformer for ClampFilter {
    fn name(&self) -> &str {
        "clamp"
    }
    fn arity(&self) -> (usize, Option<usize>) {
        (2, Some(2))
    }
    fn transform(&self, value: Value, args: &[String]) -> FilterResult<Value> {
        let min = arg_f64(self.name(), arg(self.name(), args, 0)?)?;
        let max = arg_f64(self.name(), arg(self.name(), args, 1)?)?;
        if min > max {
            return Err(FilterError::invalid_argument(
                self.name(),
                format!("min {min} is greater than max {max}"),
            ));
        }
        Ok(value
            .as_number()
            .map_or(value, |n| number(n.clamp(min, max))))
    }
}

/// `round[:precision]`
pub struct RoundFilter;

impl Transformer for RoundFilter {
    fn name(&self) -> &str {
        "round"
    }
    fn arity(&self) -> (usize, Option<usize>) {
        (0, Some(1))
    }
    fn transform(&self, value: Value, args: &[String]) -> FilterResult<Value> {
        let precision = match args.first() {
            Some(arg) => arg_i64(self.name(), arg)?,
            None => 0,
        };
        let Some(n) = value.as_number() else {
            return Ok(value);
        };
        if precision <= 0 {
            let factor = 10f64.powi((-precision).min(15) as i32);
            return Ok(number((n / factor).round() * factor));
        }
        let factor = 10f64.powi(precision.min(15) as i32);
        Ok(Value::Float((n * factor).round() / factor))
    }
}

/// `abs`
pub struct AbsFilter;

impl Transformer for AbsFilter {
    fn name(&self) -> &str {
        "abs"
    }
    fn transform(&self, value: Value, _args: &[String]) -> FilterResult<Value> {
        Ok(match value {
            Value::Int(i) => Value::Int(i.saturating_abs()),
            other => match other.as_number() {
                Some(n) => Value::Float(n.abs()),
                None => other,
            },
        })
    }
}

/// `floor`
pub struct FloorFilter;

impl Transformer for FloorFilter {
    fn name(&self) -> &str {
        "floor"
    }
    fn transform(&self, value: Value, _args: &[String]) -> FilterResult<Value> {
        Ok(value.as_number().map_or(value, |n| number(n.floor())))
    }
}

/// `ceil`
pub struct CeilFilter;

impl Transformer for CeilFilter {
    fn name(&self) -> &str {
        "ceil"
    }
    fn transform(&self, value: Value, _args: &[String]) -> FilterResult<Value> {
        Ok(value.as_number().map_or(value, |n| number(n.ceil())))
    }
}

/// Register all math filters
pub fn register_math_filters(registry: &mut FilterRegistry) {
    registry.register(ClampFilter);
    registry.register(RoundFilter);
    registry.register(AbsFilter);
    registry.register(FloorFilter);
    registry.register(CeilFilter);
}
