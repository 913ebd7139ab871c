//! Aggregate filters
//!
//! These receive every wildcard match at once as a list. Applied to a
//! single container they work on its values; a lone scalar is treated as a
//! one-element list.

use super::elements;
use crate::model::Value;
use crate::registry::transformer::{FilterError, FilterRegistry, FilterResult, Transformer};

fn sum_of(items: &[Value]) -> Option<Value> {
    let numbers: Vec<&Value> = items
        .iter()
        .filter(|item| item.as_number().is_some())
        .collect();
    if numbers.is_empty() {
        return None;
    }
    if numbers.iter().all(|item| matches!(item, Value::Int(_))) {
        let total = numbers
            .iter()
            .filter_map(|item| item.as_i64())
            .fold(0i64, i64::saturating_add);
        return Some(Value::Int(total));
    }
    Some(Value::Float(
        numbers.iter().filter_map(|item| item.as_number()).sum(),
    ))
}

macro_rules! aggregate_filter {
    ($(#[$doc:meta])* $ty:ident, $name:literal, $arity:expr, |$items:ident, $args:ident| $body:expr) => {
        $(#[$doc])*
        pub struct $ty;

        impl Transformer for $ty {
            fn name(&self) -> &str {
                $name
            }
            fn arity(&self) -> (usize, Option<usize>) {
                $arity
            }
            fn is_aggregate(&self) -> bool {
                true
            }
            fn transform(&self, value: Value, $args: &[String]) -> FilterResult<Value> {
                let $items = elements(value);
                $body
            }
        }
    };
}

aggregate_filter!(
    /// `count`
    CountFilter, "count", (0, Some(0)), |items, _args| Ok(Value::from(items.len()))
);

aggregate_filter!(
    /// `sum` of the numeric elements; 0 when there are none
    SumFilter, "sum", (0, Some(0)), |items, _args| Ok(sum_of(&items).unwrap_or(Value::Int(0)))
);

aggregate_filter!(
    /// `avg` of the numeric elements; null when there are none
    AvgFilter, "avg", (0, Some(0)), |items, _args| {
        let numbers: Vec<f64> = items.iter().filter_map(Value::as_number).collect();
        if numbers.is_empty() {
            Ok(Value::Null)
        } else {
            Ok(Value::Float(numbers.iter().sum::<f64>() / numbers.len() as f64))
        }
    }
);

aggregate_filter!(
    /// `min` of the non-null elements
    MinFilter, "min", (0, Some(0)), |items, _args| {
        Ok(items
            .into_iter()
            .filter(|item| !item.is_null())
            .min_by(Value::sort_cmp)
            .unwrap_or_default())
    }
);

aggregate_filter!(
    /// `max` of the non-null elements
    MaxFilter, "max", (0, Some(0)), |items, _args| {
        Ok(items
            .into_iter()
            .filter(|item| !item.is_null())
            .max_by(Value::sort_cmp)
            .unwrap_or_default())
    }
);

aggregate_filter!(
    /// `first`
    FirstFilter, "first", (0, Some(0)), |items, _args| {
        Ok(items.into_iter().next().unwrap_or_default())
    }
);

aggregate_filter!(
    /// `last`
    LastFilter, "last", (0, Some(0)), |items, _args| {
        Ok(items.into_iter().last().unwrap_or_default())
    }
);

aggregate_filter!(
    /// `join[:separator]`, default separator `,`
    JoinFilter, "join", (0, Some(1)), |items, args| {
        let separator = args.first().map_or(",", String::as_str);
        Ok(Value::String(
            items
                .iter()
                .map(Value::to_display_string)
                .collect::<Vec<_>>()
                .join(separator),
        ))
    }
);

aggregate_filter!(
    /// `unique` keeps the first occurrence of each value
    UniqueFilter, "unique", (0, Some(0)), |items, _args| {
        let mut unique: Vec<Value> = Vec::with_capacity(items.len());
        for item in items {
            if !unique.contains(&item) {
                unique.push(item);
            }
        }
        Ok(Value::List(unique))
    }
);

aggregate_filter!(
    /// `reverse`
    ReverseFilter, "reverse", (0, Some(0)), |items, _args| {
        Ok(Value::List(items.into_iter().rev().collect()))
    }
);

aggregate_filter!(
    /// `values`
    ValuesFilter, "values", (0, Some(0)), |items, _args| Ok(Value::List(items))
);

/// `sort[:asc|desc]`, stable
pub struct SortFilter;

impl Transformer for SortFilter {
    fn name(&self) -> &str {
        "sort"
    }
    fn arity(&self) -> (usize, Option<usize>) {
        (0, Some(1))
    }
    fn is_aggregate(&self) -> bool {
        true
    }
    fn transform(&self, value: Value, args: &[String]) -> FilterResult<Value> {
        let descending = match args.first().map(|arg| arg.to_ascii_lowercase()) {
            None => false,
            Some(direction) if direction == "asc" => false,
            Some(direction) if direction == "desc" => true,
            Some(other) => {
                return Err(FilterError::invalid_argument(
                    self.name(),
                    format!("expected 'asc' or 'desc', got '{other}'"),
                ));
            }
        };
        let mut items = elements(value);
        if descending {
            items.sort_by(|a, b| b.sort_cmp(a));
        } else {
            items.sort_by(Value::sort_cmp);
        }
        Ok(Value::List(items))
    }
}

/// `keys` of a container: indices for sequences, strings for maps
pub struct KeysFilter;

impl Transformer for KeysFilter {
    fn name(&self) -> &str {
        "keys"
    }
    fn is_aggregate(&self) -> bool {
        true
    }
    fn transform(&self, value: Value, _args: &[String]) -> FilterResult<Value> {
        let Some(container) = value.as_container() else {
            return Ok(Value::list());
        };
        let sequential = value.is_sequence();
        Ok(Value::List(
            container
                .keys_of()
                .into_iter()
                .enumerate()
                .map(|(i, key)| if sequential { Value::from(i) } else { Value::String(key) })
                .collect(),
        ))
    }
}

/// Register all aggregate filters
pub fn register_collection_filters(registry: &mut FilterRegistry) {
    registry.register(CountFilter);
    registry.register(SumFilter);
    registry.register(AvgFilter);
    registry.register(MinFilter);
    registry.register(MaxFilter);
    registry.register(FirstFilter);
    registry.register(LastFilter);
    registry.register(JoinFilter);
    registry.register(UniqueFilter);
    registry.register(KeysFilter);
    registry.register(ValuesFilter);
    registry.register(ReverseFilter);
    registry.register(SortFilter);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn list() -> Value {
        Value::from(json!([3, 1.5, "2", null, 1]))
    }

    #[test]
    fn test_numeric_aggregates() {
        assert_eq!(CountFilter.transform(list(), &[]), Ok(Value::Int(5)));
        assert_eq!(SumFilter.transform(list(), &[]), Ok(Value::Float(7.5)));
        assert_eq!(
            SumFilter.transform(Value::from(vec![1, 2, 3]), &[]),
            Ok(Value::Int(6))
        );
        assert_eq!(SumFilter.transform(Value::list(), &[]), Ok(Value::Int(0)));
        assert_eq!(
            AvgFilter.transform(Value::from(vec![1, 2]), &[]),
            Ok(Value::Float(1.5))
        );
        assert_eq!(AvgFilter.transform(Value::Null, &[]), Ok(Value::Null));
        assert_eq!(MinFilter.transform(list(), &[]), Ok(Value::Int(1)));
        assert_eq!(MaxFilter.transform(list(), &[]), Ok(Value::from("2")));
    }

    #[test]
    fn test_positional_aggregates() {
        assert_eq!(FirstFilter.transform(list(), &[]), Ok(Value::Int(3)));
        assert_eq!(LastFilter.transform(list(), &[]), Ok(Value::Int(1)));
        assert_eq!(FirstFilter.transform(Value::list(), &[]), Ok(Value::Null));
        assert_eq!(
            ReverseFilter.transform(Value::from(vec![1, 2]), &[]),
            Ok(Value::from(vec![2, 1]))
        );
    }

    #[test]
    fn test_join_unique_sort() {
        assert_eq!(
            JoinFilter.transform(Value::from(vec!["a", "b"]), &[", ".to_string()]),
            Ok(Value::from("a, b"))
        );
        assert_eq!(
            UniqueFilter.transform(Value::from(vec![1, 2, 1, 3, 2]), &[]),
            Ok(Value::from(vec![1, 2, 3]))
        );
        assert_eq!(
            SortFilter.transform(Value::from(vec![3, 1, 2]), &["desc".to_string()]),
            Ok(Value::from(vec![3, 2, 1]))
        );
        assert!(SortFilter.transform(Value::list(), &["up".to_string()]).is_err());
    }

    #[test]
    fn test_keys_and_values() {
        let map = Value::from(json!({"a": 1, "b": 2}));
        assert_eq!(KeysFilter.transform(map.clone(), &[]), Ok(Value::from(vec!["a", "b"])));
        assert_eq!(ValuesFilter.transform(map, &[]), Ok(Value::from(vec![1, 2])));
        assert_eq!(
            KeysFilter.transform(Value::from(vec!["x", "y"]), &[]),
            Ok(Value::from(vec![0, 1]))
        );
    }
}
