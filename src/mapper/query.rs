//! Row selection for query directives
//!
//! A directive expands rows from the source, then filters, sorts, paginates
//! and optionally groups them, in that order. Each surviving row (or group)
//! becomes one output row keyed under the directive's target.

use super::template::{
    Directive, Operand, Operator, OrderKey, Piece, Predicate, TemplateEntry, TemplateNode,
};
use crate::ast::{Expression, Path};
use crate::error::{Error, Result};
use crate::evaluator::{ExpressionEvaluator, WildcardResolver};
use crate::model::Value;
use std::cmp::Ordering;
use std::sync::Arc;

/// One wildcard binding combination of the row prefix
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Row {
    /// Wildcard keys, including those inherited from enclosing rows
    pub bindings: Vec<String>,
    /// Key under the row prefix's last wildcard
    pub key: String,
    /// Node the prefix resolves to
    pub value: Value,
}

/// An output row: one source row, or every row of a group
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Selection {
    pub key: String,
    pub rows: Vec<Row>,
}

impl Operator {
    /// Compare two values
    pub fn test(&self, left: &Value, right: &Value) -> bool {
        match self {
            Operator::Eq => left.loose_eq(right),
            Operator::Ne => !left.loose_eq(right),
            Operator::Gt => left.loose_cmp(right) == Some(Ordering::Greater),
            Operator::Ge => matches!(left.loose_cmp(right), Some(Ordering::Greater | Ordering::Equal)),
            Operator::Lt => left.loose_cmp(right) == Some(Ordering::Less),
            Operator::Le => matches!(left.loose_cmp(right), Some(Ordering::Less | Ordering::Equal)),
            Operator::In => contains(right, left),
            Operator::NotIn => !contains(right, left),
        }
    }
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    if haystack.is_container() {
        haystack.values().iter().any(|item| item.loose_eq(needle))
    } else {
        haystack.loose_eq(needle)
    }
}

fn collect_node<'d>(node: &'d TemplateNode, out: &mut Vec<&'d Arc<Expression>>) {
    match node {
        TemplateNode::Expression(expr) => out.push(expr),
        TemplateNode::Interpolation(pieces) => out.extend(pieces.iter().filter_map(|piece| match piece {
            Piece::Expression(expr) => Some(expr),
            Piece::Text(_) => None,
        })),
        TemplateNode::Nested(entries) => collect_entries(entries, out),
        // Nested directives expand their own rows
        TemplateNode::Literal(_) | TemplateNode::Directive(_) => {}
    }
}

fn collect_entries<'d>(entries: &'d [TemplateEntry], out: &mut Vec<&'d Arc<Expression>>) {
    for entry in entries {
        collect_node(&entry.node, out);
    }
}

/// Every expression a directive evaluates per row
fn directive_expressions(directive: &Directive) -> Vec<&Arc<Expression>> {
    let mut expressions = Vec::new();
    for Predicate { left, right, .. } in &directive.predicates {
        expressions.push(left);
        if let Operand::Expression(expr) = right {
            expressions.push(expr);
        }
    }
    expressions.extend(directive.order.iter().map(|key| &key.expression));
    expressions.extend(directive.group_by.iter());
    if let Some(projection) = &directive.projection {
        collect_node(projection, &mut expressions);
    }
    expressions
}

/// The prefix rows are expanded from: the wildcard prefix with the most
/// wildcards left once `outer` is bound. Ties go to the first expression.
pub(crate) fn row_prefix<S: AsRef<str>>(directive: &Directive, outer: &[S]) -> Option<Path> {
    let mut best: Option<Path> = None;
    for expr in directive_expressions(directive) {
        let Some(prefix) = expr.path.bind(outer).wildcard_prefix() else {
            continue;
        };
        if best
            .as_ref()
            .is_none_or(|current| prefix.wildcard_count() > current.wildcard_count())
        {
            best = Some(prefix);
        }
    }
    best
}

/// Executes the clauses of a directive against a source
pub(crate) struct Query<'e> {
    evaluator: ExpressionEvaluator<'e>,
    source: &'e Value,
}

impl<'e> Query<'e> {
    pub fn new(evaluator: ExpressionEvaluator<'e>, source: &'e Value) -> Self {
        Self { evaluator, source }
    }

    /// Select the output rows of `directive`.
    ///
    /// Keys are dense ordinals when the directive sorts, paginates or
    /// groups, when the prefix binds several wildcards, or when `reindex` is
    /// set. Otherwise each row keeps the source key it was read from.
    pub fn select(
        &self,
        directive: &Directive,
        outer: &[String],
        reindex: bool,
        location: &str,
    ) -> Result<(Path, Vec<Selection>)> {
        let prefix = row_prefix(directive, outer).ok_or_else(|| {
            Error::invalid_template(location, "query directive has no wildcard expression to expand")
        })?;

        let rows = self.expand(&prefix, outer);
        let total = rows.len();
        let rows = self.filter(rows, &directive.predicates)?;
        let rows = self.sort(rows, &directive.order)?;
        let rows = paginate(rows, directive.offset, directive.limit);

        let dense = reindex || directive.is_dense() || prefix.wildcard_count() > 1;
        let groups: Vec<Vec<Row>> = if directive.group_by.is_empty() {
            rows.into_iter().map(|row| vec![row]).collect()
        } else {
            self.group(rows, &directive.group_by)?
        };

        log::debug!(
            "directive at '{location}' expanded {total} rows from '{prefix}', kept {}",
            groups.len()
        );

        let selections = groups
            .into_iter()
            .enumerate()
            .map(|(ordinal, rows)| Selection {
                key: if dense {
                    ordinal.to_string()
                } else {
                    rows[0].key.clone()
                },
                rows,
            })
            .collect();
        Ok((prefix, selections))
    }

    fn expand(&self, prefix: &Path, outer: &[String]) -> Vec<Row> {
        WildcardResolver::resolve_refs(prefix, self.source)
            .into_iter()
            .map(|(resolved, value)| {
                let own = resolved.bindings();
                let key = own.last().cloned().unwrap_or_default();
                let mut bindings = outer.to_vec();
                bindings.extend(own);
                Row {
                    bindings,
                    key,
                    value: value.clone(),
                }
            })
            .collect()
    }

    fn value(&self, expr: &Expression, row: &Row) -> Result<Value> {
        self.evaluator.evaluate_bound(expr, self.source, &row.bindings)
    }

    fn filter(&self, rows: Vec<Row>, predicates: &[Predicate]) -> Result<Vec<Row>> {
        if predicates.is_empty() {
            return Ok(rows);
        }
        let mut kept = Vec::with_capacity(rows.len());
        'rows: for row in rows {
            for predicate in predicates {
                let left = self.value(&predicate.left, &row)?;
                let right = match &predicate.right {
                    Operand::Expression(expr) => self.value(expr, &row)?,
                    Operand::Literal(value) => value.clone(),
                };
                if !predicate.operator.test(&left, &right) {
                    continue 'rows;
                }
            }
            kept.push(row);
        }
        Ok(kept)
    }

    fn sort(&self, rows: Vec<Row>, order: &[OrderKey]) -> Result<Vec<Row>> {
        if order.is_empty() {
            return Ok(rows);
        }
        let mut keyed = rows
            .into_iter()
            .map(|row| {
                let keys = order
                    .iter()
                    .map(|key| self.value(&key.expression, &row))
                    .collect::<Result<Vec<_>>>()?;
                Ok((keys, row))
            })
            .collect::<Result<Vec<_>>>()?;

        // Vec::sort_by is stable, ties keep source order
        keyed.sort_by(|(a, _), (b, _)| {
            order
                .iter()
                .zip(a.iter().zip(b))
                .map(|(key, (a, b))| {
                    let ordering = a.sort_cmp(b);
                    if key.descending { ordering.reverse() } else { ordering }
                })
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
        Ok(keyed.into_iter().map(|(_, row)| row).collect())
    }

    fn group(&self, rows: Vec<Row>, keys: &[Arc<Expression>]) -> Result<Vec<Vec<Row>>> {
        let mut groups: Vec<(Vec<Value>, Vec<Row>)> = Vec::new();
        for row in rows {
            let values = keys
                .iter()
                .map(|expr| self.value(expr, &row))
                .collect::<Result<Vec<_>>>()?;
            match groups.iter_mut().find(|(existing, _)| *existing == values) {
                Some((_, members)) => members.push(row),
                None => groups.push((values, vec![row])),
            }
        }
        Ok(groups.into_iter().map(|(_, members)| members).collect())
    }
}

fn paginate(rows: Vec<Row>, offset: usize, limit: Option<usize>) -> Vec<Row> {
    let rows = rows.into_iter().skip(offset);
    match limit {
        Some(limit) => rows.take(limit).collect(),
        None => rows.collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::template::Mapping;
    use crate::registry::FilterRegistry;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn directive(template: serde_json::Value) -> Directive {
        let mapping = Mapping::parse(&Value::from(json!({ "rows": template }))).unwrap();
        match &mapping.entries()[0].node {
            TemplateNode::Directive(directive) => (**directive).clone(),
            other => panic!("expected a directive, got {other:?}"),
        }
    }

    fn users() -> Value {
        Value::from(json!({"users": [
            {"name": "a", "total": 100, "team": "x"},
            {"name": "b", "total": 200, "team": "y"},
            {"name": "c", "total": 150, "team": "x"},
            {"name": "d", "total": 150, "team": "y"}
        ]}))
    }

    fn selected(template: serde_json::Value) -> Vec<(String, Vec<String>)> {
        let registry = FilterRegistry::standard();
        let source = users();
        let query = Query::new(ExpressionEvaluator::new(&registry), &source);
        let (_, selections) = query.select(&directive(template), &[], false, "rows").unwrap();
        selections
            .into_iter()
            .map(|selection| {
                let names = selection
                    .rows
                    .iter()
                    .map(|row| {
                        row.value
                            .as_container()
                            .and_then(|c| c.get("name"))
                            .map(Value::to_display_string)
                            .unwrap_or_default()
                    })
                    .collect();
                (selection.key, names)
            })
            .collect()
    }

    #[rstest]
    #[case(Operator::Eq, json!(1), json!("1"), true)]
    #[case(Operator::Ne, json!(1), json!(2), true)]
    #[case(Operator::Gt, json!(200), json!(100), true)]
    #[case(Operator::Ge, json!(100), json!(100), true)]
    #[case(Operator::Lt, json!("a"), json!("b"), true)]
    #[case(Operator::Le, json!(null), json!(1), false)]
    #[case(Operator::In, json!("x"), json!(["x", "y"]), true)]
    #[case(Operator::NotIn, json!("z"), json!(["x", "y"]), true)]
    fn test_operators(
        #[case] operator: Operator,
        #[case] left: serde_json::Value,
        #[case] right: serde_json::Value,
        #[case] expected: bool,
    ) {
        assert_eq!(operator.test(&Value::from(left), &Value::from(right)), expected);
    }

    #[test]
    fn test_where_keeps_source_keys() {
        assert_eq!(
            selected(json!({"WHERE": {"{{ users.*.total }}": [">", 100]}})),
            vec![
                ("1".to_string(), vec!["b".to_string()]),
                ("2".to_string(), vec!["c".to_string()]),
                ("3".to_string(), vec!["d".to_string()]),
            ]
        );
    }

    #[test]
    fn test_stable_sort_and_pagination() {
        let rows = selected(json!({
            "ORDER BY": {"{{ users.*.total }}": "DESC"},
            "OFFSET": 1,
            "LIMIT": 10
        }));
        let names: Vec<String> = rows.iter().flat_map(|(_, names)| names.clone()).collect();
        assert_eq!(names, vec!["c", "d", "a"]);
        assert_eq!(rows[0].0, "0");
    }

    #[test]
    fn test_group_by_first_appearance() {
        let rows = selected(json!({"GROUP BY": "{{ users.*.team }}"}));
        assert_eq!(
            rows,
            vec![
                ("0".to_string(), vec!["a".to_string(), "c".to_string()]),
                ("1".to_string(), vec!["b".to_string(), "d".to_string()]),
            ]
        );
    }

    #[test]
    fn test_row_prefix_prefers_most_wildcards() {
        let directive = directive(json!({"*": {
            "id": "{{ orders.*.id }}",
            "sku": "{{ orders.*.items.*.sku }}"
        }}));
        assert_eq!(
            row_prefix::<&str>(&directive, &[]).map(|p| p.to_string()),
            Some("orders.*.items.*".to_string())
        );
        assert_eq!(
            row_prefix(&directive, &["3"]).map(|p| p.to_string()),
            Some("orders.3.items.*".to_string())
        );
    }

    #[test]
    fn test_directive_without_wildcards() {
        let registry = FilterRegistry::standard();
        let source = users();
        let query = Query::new(ExpressionEvaluator::new(&registry), &source);
        let result = query.select(&directive(json!({"*": "{{ users.0.name }}"})), &[], false, "rows");
        assert!(matches!(result, Err(Error::InvalidTemplate { .. })));
    }
}
