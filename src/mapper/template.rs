// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Compiled mapping templates
//!
//! A template is a nested map whose keys are target paths and whose leaves
//! say where each value comes from. Maps carrying query keywords (`*`,
//! `WHERE`, `ORDER BY`, `LIMIT`, `OFFSET`, `GROUP BY`) become directives that
//! expand rows out of the source.
//!
//! ```json
//! {
//!   "name": "{{ user.first | trim }} {{ user.last }}",
//!   "email": "@user.contact.email",
//!   "top": {
//!     "WHERE": {"{{ users.*.total }}": [">", 100]},
//!     "ORDER BY": {"{{ users.*.total }}": "DESC"},
//!     "LIMIT": 5,
//!     "*": {"total": "{{ users.*.total }}"}
//!   }
//! }
//! ```

use crate::ast::{Expression, Path, Segment};
use crate::error::{Error, Result};
use crate::model::Value;
use crate::parser::{ExpressionParser, PathParser, TemplateKind, TemplatePart, classify};
use std::fmt;
use std::sync::Arc;

/// A compiled mapping template
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mapping {
    entries: Vec<TemplateEntry>,
}

/// One key of a template map
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateEntry {
    /// Key as written
    pub key: String,
    /// Target path the key parses to, relative to the enclosing node
    pub target: Arc<Path>,
    /// What is written there
    pub node: TemplateNode,
}

/// A compiled template value
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    /// `{{ ... }}` or `@path`; the result keeps its type
    Expression(Arc<Expression>),
    /// Text with embedded placeholders; renders to a string
    Interpolation(Vec<Piece>),
    /// Copied as-is
    Literal(Value),
    /// Nested target structure
    Nested(Vec<TemplateEntry>),
    /// Row expansion with query clauses
    Directive(Box<Directive>),
}

/// Part of an interpolated string
#[derive(Debug, Clone, PartialEq)]
pub enum Piece {
    /// Literal text
    Text(String),
    /// Placeholder rendered with its display string
    Expression(Arc<Expression>),
}

/// A template node expanding one row per source wildcard binding
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Directive {
    /// Conjunctive filter
    pub predicates: Vec<Predicate>,
    /// Sort keys, most significant first
    pub order: Vec<OrderKey>,
    /// Maximum number of rows kept
    pub limit: Option<usize>,
    /// Rows dropped before the limit applies
    pub offset: usize,
    /// Group keys
    pub group_by: Vec<Arc<Expression>>,
    /// Per-row template; `None` writes the whole row
    pub projection: Option<Box<TemplateNode>>,
}

impl Directive {
    /// Whether rows are renumbered densely
    pub fn is_dense(&self) -> bool {
        !self.order.is_empty() || self.limit.is_some() || self.offset > 0 || !self.group_by.is_empty()
    }
}

/// Comparison operator of a WHERE predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `in`
    In,
    /// `not in`
    NotIn,
}

impl Operator {
    /// Parse an operator; case and inner whitespace are ignored
    pub fn parse(text: &str) -> Option<Self> {
        let normalized = text
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_lowercase();
        Some(match normalized.as_str() {
            "=" | "==" => Operator::Eq,
            "!=" | "<>" => Operator::Ne,
            ">" => Operator::Gt,
            ">=" => Operator::Ge,
            "<" => Operator::Lt,
            "<=" => Operator::Le,
            "in" => Operator::In,
            "not in" => Operator::NotIn,
            _ => return None,
        })
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::In => "in",
            Operator::NotIn => "not in",
        })
    }
}

/// Side of a predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Evaluated per row
    Expression(Arc<Expression>),
    /// Constant
    Literal(Value),
}

/// `left operator right`
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    /// Row value
    pub left: Arc<Expression>,
    /// Comparison
    pub operator: Operator,
    /// Compared against
    pub right: Operand,
}

/// ORDER BY key
#[derive(Debug, Clone, PartialEq)]
pub struct OrderKey {
    /// Sort value per row
    pub expression: Arc<Expression>,
    /// Largest first
    pub descending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    Projection,
    Where,
    OrderBy,
    Limit,
    Offset,
    GroupBy,
}

fn keyword(key: &str) -> Option<Keyword> {
    let normalized = key
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase();
    Some(match normalized.as_str() {
        "*" => Keyword::Projection,
        "WHERE" => Keyword::Where,
        "ORDER BY" => Keyword::OrderBy,
        "LIMIT" => Keyword::Limit,
        "OFFSET" => Keyword::Offset,
        "GROUP BY" => Keyword::GroupBy,
        _ => return None,
    })
}

fn child_location(location: &str, key: &str) -> String {
    if location.is_empty() {
        key.to_string()
    } else {
        format!("{location}.{key}")
    }
}

struct Compiler<'p> {
    expressions: &'p ExpressionParser,
    paths: &'p PathParser,
}

impl Compiler<'_> {
    fn entries(&self, template: &Value, location: &str) -> Result<Vec<TemplateEntry>> {
        let Some(container) = template.as_container() else {
            return Err(Error::invalid_template(location, "expected a map of target paths"));
        };

        container
            .to_canonical_array()
            .into_iter()
            .map(|(key, value)| {
                let here = child_location(location, &key);
                let target = self.paths.parse(&key)?;
                let node = self.node(&value, &here)?;
                if target.has_wildcard()
                    && matches!(node, TemplateNode::Nested(_) | TemplateNode::Directive(_))
                {
                    return Err(Error::invalid_template(
                        here,
                        "wildcards are only allowed in keys of leaf values",
                    ));
                }
                Ok(TemplateEntry { key, target, node })
            })
            .collect()
    }

    fn node(&self, value: &Value, location: &str) -> Result<TemplateNode> {
        match value {
            Value::String(text) => self.leaf(text, location),
            Value::Map(map) if self.is_directive(map.keys()) => {
                Ok(TemplateNode::Directive(Box::new(self.directive(value, location)?)))
            }
            other if other.is_container() => Ok(TemplateNode::Nested(self.entries(other, location)?)),
            scalar => Ok(TemplateNode::Literal(scalar.clone())),
        }
    }

    fn is_directive<'k>(&self, mut keys: impl Iterator<Item = &'k String>) -> bool {
        keys.any(|key| {
            matches!(
                keyword(key),
                Some(Keyword::Projection | Keyword::Where | Keyword::OrderBy | Keyword::GroupBy)
            )
        })
    }

    fn leaf(&self, text: &str, location: &str) -> Result<TemplateNode> {
        Ok(match classify(text) {
            TemplateKind::Expression | TemplateKind::Alias => {
                TemplateNode::Expression(self.expressions.parse(text)?)
            }
            TemplateKind::Interpolation(parts) => TemplateNode::Interpolation(
                parts
                    .into_iter()
                    .map(|part| match part {
                        TemplatePart::Text(text) => Ok(Piece::Text(text.to_string())),
                        TemplatePart::Placeholder(raw) => {
                            Ok(Piece::Expression(self.expressions.parse(raw)?))
                        }
                    })
                    .collect::<Result<_>>()?,
            ),
            TemplateKind::Literal => {
                log::trace!("template value at '{location}' is a literal");
                TemplateNode::Literal(Value::String(text.to_string()))
            }
        })
    }

    /// An expression in a query clause; bare paths are accepted too
    fn clause_expression(&self, text: &str, location: &str) -> Result<Arc<Expression>> {
        match classify(text) {
            TemplateKind::Expression | TemplateKind::Alias => Ok(self.expressions.parse(text)?),
            TemplateKind::Literal => Ok(self.expressions.parse(&format!("{{{{ {text} }}}}"))?),
            TemplateKind::Interpolation(_) => Err(Error::invalid_template(
                location,
                format!("'{text}' mixes text and placeholders"),
            )),
        }
    }

    fn clause_text<'v>(&self, value: &'v Value, location: &str) -> Result<&'v str> {
        value
            .as_str()
            .ok_or_else(|| Error::invalid_template(location, format!("expected a string, got {}", value.type_name())))
    }

    fn operand(&self, value: &Value) -> Result<Operand> {
        if let Value::String(text) = value
            && matches!(classify(text), TemplateKind::Expression | TemplateKind::Alias)
        {
            return Ok(Operand::Expression(self.expressions.parse(text)?));
        }
        Ok(Operand::Literal(value.clone()))
    }

    fn directive(&self, template: &Value, location: &str) -> Result<Directive> {
        let mut directive = Directive::default();
        let Some(container) = template.as_container() else {
            return Ok(directive);
        };

        for (key, value) in container.to_canonical_array() {
            let here = child_location(location, &key);
            match keyword(&key) {
                Some(Keyword::Projection) => {
                    directive.projection = Some(Box::new(self.node(&value, &here)?));
                }
                Some(Keyword::Where) => directive.predicates = self.predicates(&value, &here)?,
                Some(Keyword::OrderBy) => directive.order = self.order(&value, &here)?,
                Some(Keyword::Limit) => directive.limit = Some(self.count(&value, &here)?),
                Some(Keyword::Offset) => directive.offset = self.count(&value, &here)?,
                Some(Keyword::GroupBy) => directive.group_by = self.group_by(&value, &here)?,
                None => {
                    return Err(Error::invalid_template(
                        here,
                        "unexpected key in a query directive",
                    ));
                }
            }
        }
        Ok(directive)
    }

    fn predicates(&self, value: &Value, location: &str) -> Result<Vec<Predicate>> {
        match value {
            Value::Map(map) => map
                .iter()
                .map(|(left, right)| {
                    let left = self.clause_expression(left, location)?;
                    let (operator, right) = match right {
                        Value::List(pair) if pair.len() == 2 => {
                            match pair[0].as_str().and_then(Operator::parse) {
                                Some(operator) => (operator, &pair[1]),
                                None => (Operator::Eq, right),
                            }
                        }
                        _ => (Operator::Eq, right),
                    };
                    Ok(Predicate {
                        left,
                        operator,
                        right: self.operand(right)?,
                    })
                })
                .collect(),
            Value::List(items) => items
                .iter()
                .map(|item| match item {
                    Value::List(triple) if triple.len() == 3 => {
                        let left = self.clause_expression(self.clause_text(&triple[0], location)?, location)?;
                        let text = self.clause_text(&triple[1], location)?;
                        let operator = Operator::parse(text).ok_or_else(|| {
                            Error::invalid_template(location, format!("unknown operator '{text}'"))
                        })?;
                        Ok(Predicate {
                            left,
                            operator,
                            right: self.operand(&triple[2])?,
                        })
                    }
                    _ => Err(Error::invalid_template(
                        location,
                        "expected [expression, operator, value]",
                    )),
                })
                .collect(),
            other => Err(Error::invalid_template(
                location,
                format!("expected a map or list, got {}", other.type_name()),
            )),
        }
    }

    fn direction(&self, value: &Value, location: &str) -> Result<bool> {
        let text = self.clause_text(value, location)?;
        match text.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(false),
            "desc" => Ok(true),
            _ => Err(Error::invalid_template(
                location,
                format!("expected ASC or DESC, got '{text}'"),
            )),
        }
    }

    fn order(&self, value: &Value, location: &str) -> Result<Vec<OrderKey>> {
        let key = |text: &str, descending: bool| -> Result<OrderKey> {
            Ok(OrderKey {
                expression: self.clause_expression(text, location)?,
                descending,
            })
        };

        match value {
            Value::String(text) => Ok(vec![key(text, false)?]),
            Value::Map(map) => map
                .iter()
                .map(|(text, direction)| key(text, self.direction(direction, location)?))
                .collect(),
            Value::List(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(text) => key(text, false),
                    Value::List(pair) if pair.len() == 2 => key(
                        self.clause_text(&pair[0], location)?,
                        self.direction(&pair[1], location)?,
                    ),
                    _ => Err(Error::invalid_template(
                        location,
                        "expected an expression or [expression, direction]",
                    )),
                })
                .collect(),
            other => Err(Error::invalid_template(
                location,
                format!("expected a string, map or list, got {}", other.type_name()),
            )),
        }
    }

    fn count(&self, value: &Value, location: &str) -> Result<usize> {
        let parsed = match value {
            Value::Int(n) => usize::try_from(*n).ok(),
            Value::String(text) => text.trim().parse::<usize>().ok(),
            _ => None,
        };
        parsed.ok_or_else(|| {
            Error::invalid_template(location, format!("expected a non-negative integer, got {value}"))
        })
    }

    fn group_by(&self, value: &Value, location: &str) -> Result<Vec<Arc<Expression>>> {
        match value {
            Value::String(text) => Ok(vec![self.clause_expression(text, location)?]),
            Value::List(items) => items
                .iter()
                .map(|item| self.clause_expression(self.clause_text(item, location)?, location))
                .collect(),
            other => Err(Error::invalid_template(
                location,
                format!("expected a string or list, got {}", other.type_name()),
            )),
        }
    }
}

impl Mapping {
    /// Compile a template
    pub fn compile(template: &Value, expressions: &ExpressionParser, paths: &PathParser) -> Result<Self> {
        let compiler = Compiler { expressions, paths };
        Ok(Self {
            entries: compiler.entries(template, "")?,
        })
    }

    /// Compile using the process-wide parse caches
    pub fn parse(template: &Value) -> Result<Self> {
        Self::compile(template, &ExpressionParser::global(), &PathParser::global())
    }

    /// Mapping copying each `source` path to its `target` path
    pub fn from_paths<I, S, T>(pairs: I, paths: &PathParser) -> Result<Self>
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let entries = pairs
            .into_iter()
            .map(|(source, target)| {
                let source = paths.parse(source.as_ref())?;
                Ok(TemplateEntry {
                    key: target.as_ref().to_string(),
                    target: paths.parse(target.as_ref())?,
                    node: TemplateNode::Expression(Arc::new(Expression::from_path((*source).clone()))),
                })
            })
            .collect::<Result<_>>()?;
        Ok(Self { entries })
    }

    /// Top-level entries in template order
    pub fn entries(&self) -> &[TemplateEntry] {
        &self.entries
    }

    /// Number of top-level entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the template is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mapping that copies values back from target to source.
    ///
    /// Only plain path leaves can be reversed. Defaults, filters, literals,
    /// interpolations and directives are dropped.
    pub fn reversed(&self) -> Mapping {
        let mut entries = Vec::new();
        collect_reversed(&self.entries, &[], &mut entries);
        Mapping { entries }
    }
}

fn collect_reversed(entries: &[TemplateEntry], base: &[Segment], out: &mut Vec<TemplateEntry>) {
    for entry in entries {
        let mut target: Vec<Segment> = base.to_vec();
        target.extend(entry.target.segments().iter().cloned());

        match &entry.node {
            TemplateNode::Expression(expr) if expr.is_plain() => {
                let reversed_source = Path::from_segments(target);
                out.push(TemplateEntry {
                    key: expr.path.to_string(),
                    target: Arc::new(expr.path.clone()),
                    node: TemplateNode::Expression(Arc::new(Expression::from_path(reversed_source))),
                });
            }
            TemplateNode::Nested(children) => collect_reversed(children, &target, out),
            _ => log::debug!(
                "entry '{}' is not reversible, skipping",
                Path::from_segments(target)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn compile(template: serde_json::Value) -> Result<Mapping> {
        Mapping::parse(&Value::from(template))
    }

    #[test]
    fn test_leaf_kinds() {
        let mapping = compile(json!({
            "a": "{{ x.y | upper }}",
            "b": "@x.z",
            "c": "Hi {{ name }}!",
            "d": "plain",
            "e": 5,
            "f": {"g": "{{ x }}"}
        }))
        .unwrap();
        let kinds: Vec<&str> = mapping
            .entries()
            .iter()
            .map(|entry| match entry.node {
                TemplateNode::Expression(_) => "expression",
                TemplateNode::Interpolation(_) => "interpolation",
                TemplateNode::Literal(_) => "literal",
                TemplateNode::Nested(_) => "nested",
                TemplateNode::Directive(_) => "directive",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["expression", "expression", "interpolation", "literal", "literal", "nested"]
        );
    }

    #[test]
    fn test_directive_keywords_are_case_insensitive() {
        let mapping = compile(json!({"top": {
            "where": [["users.*.total", ">", 100]],
            "Order_By": {"{{ users.*.total }}": "desc"},
            "limit": "5",
            "OFFSET": 1,
            "*": {"total": "{{ users.*.total }}"}
        }}))
        .unwrap();
        let TemplateNode::Directive(directive) = &mapping.entries()[0].node else {
            panic!("expected a directive");
        };
        assert_eq!(directive.predicates.len(), 1);
        assert_eq!(directive.predicates[0].operator, Operator::Gt);
        assert_eq!(directive.predicates[0].right, Operand::Literal(Value::Int(100)));
        assert!(directive.order[0].descending);
        assert_eq!(directive.limit, Some(5));
        assert_eq!(directive.offset, 1);
        assert!(directive.is_dense());
    }

    #[test]
    fn test_where_forms() {
        let mapping = compile(json!({"rows": {
            "WHERE": {
                "{{ u.*.role }}": "admin",
                "{{ u.*.age }}": [">=", 18],
                "{{ u.*.tag }}": ["not in", ["x", "y"]],
                "{{ u.*.a }}": "{{ u.*.b }}"
            }
        }}))
        .unwrap();
        let TemplateNode::Directive(directive) = &mapping.entries()[0].node else {
            panic!("expected a directive");
        };
        let operators: Vec<Operator> = directive.predicates.iter().map(|p| p.operator).collect();
        assert_eq!(
            operators,
            vec![Operator::Eq, Operator::Ge, Operator::NotIn, Operator::Eq]
        );
        assert!(matches!(directive.predicates[3].right, Operand::Expression(_)));
        assert!(directive.projection.is_none());
    }

    #[test]
    fn test_invalid_templates() {
        assert!(matches!(
            compile(json!({"rows": {"WHERE": {}, "LIMIT": -1}})),
            Err(Error::InvalidTemplate { .. })
        ));
        assert!(matches!(
            compile(json!({"rows": {"*": "{{ a.* }}", "extra": 1}})),
            Err(Error::InvalidTemplate { .. })
        ));
        assert!(matches!(
            compile(json!({"rows": {"ORDER BY": {"{{ a.* }}": "sideways"}}})),
            Err(Error::InvalidTemplate { .. })
        ));
        assert!(matches!(
            compile(json!({"a.*": {"b": "{{ x }}"}})),
            Err(Error::InvalidTemplate { .. })
        ));
        assert!(compile(json!({"a..b": "{{ x }}"})).unwrap_err().is_syntax_error());
        assert!(compile(json!({"a": "{{ x | }}"})).unwrap_err().is_syntax_error());
        assert!(compile(json!("just text")).is_err());
    }

    #[test]
    fn test_limit_alone_is_not_a_directive() {
        let mapping = compile(json!({"settings": {"limit": "{{ cfg.limit }}"}})).unwrap();
        assert!(matches!(mapping.entries()[0].node, TemplateNode::Nested(_)));
    }

    #[test]
    fn test_reversed_swaps_plain_leaves() {
        let mapping = compile(json!({
            "profile": {"name": "{{ user.name }}", "shout": "{{ user.name | upper }}"},
            "ids.*": "@items.*.id",
            "fixed": 1
        }))
        .unwrap();
        let reversed = mapping.reversed();
        let pairs: Vec<(String, String)> = reversed
            .entries()
            .iter()
            .map(|entry| match &entry.node {
                TemplateNode::Expression(expr) => (entry.target.to_string(), expr.path.to_string()),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("user.name".to_string(), "profile.name".to_string()),
                ("items.*.id".to_string(), "ids.*".to_string()),
            ]
        );
    }

    #[test]
    fn test_from_paths() {
        let mapping =
            Mapping::from_paths([("user.name", "name"), ("a.*.b", "c.*")], &PathParser::global()).unwrap();
        assert_eq!(mapping.len(), 2);
        assert!(Mapping::from_paths([("a.", "b")], &PathParser::global()).is_err());
    }
}
