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

//! Template expression parser
//!
//! Grammar:
//!
//! ```text
//! expression := "{{" path [ "??" default ] ( "|" filter ( ":" arg )* )* "}}"
//!             | "@" path
//! default    := quoted | integer | float | "true" | "false" | "null"
//! arg        := word | quoted
//! ```
//!
//! Filter names are only checked for identifier syntax here. Whether a
//! filter exists is decided when the expression is evaluated.

use super::error::{ExpressionError, ExpressionResult};
use super::lexer::{TokenStream, is_identifier};
use super::path::parse_path;
use super::tokenizer::{Token, Tokenizer};
use crate::ast::{Expression, ExpressionForm, FilterCall, Path};
use crate::model::Value;

/// Opening delimiter of a braced expression
pub const OPEN: &str = "{{";
/// Closing delimiter of a braced expression
pub const CLOSE: &str = "}}";
/// Prefix of the alias form
pub const ALIAS: char = '@';

/// Parse a raw expression string.
///
/// Surrounding whitespace is ignored. Anything that is neither `{{ ... }}`
/// nor `@path` is a syntax error.
///
/// # Examples
///
/// ```rust
/// use octofhir_datapath::parser::parse_expression;
///
/// let expr = parse_expression("{{ user.name ?? 'Unknown' | upper }}").unwrap();
/// assert_eq!(expr.path.to_string(), "user.name");
/// assert_eq!(expr.filters[0].name, "upper");
/// ```
pub fn parse_expression(raw: &str) -> ExpressionResult<Expression> {
    let leading = raw.len() - raw.trim_start().len();
    let trimmed = raw.trim();

    if let Some(alias) = trimmed.strip_prefix(ALIAS) {
        return parse_alias(raw, alias, leading + ALIAS.len_utf8());
    }

    let body = trimmed
        .strip_prefix(OPEN)
        .ok_or_else(|| ExpressionError::syntax(raw, leading, "expected '{{' or '@'"))?;
    let body = body.strip_suffix(CLOSE).ok_or_else(|| {
        ExpressionError::syntax(raw, leading + trimmed.len(), "missing closing '}}'")
    })?;
    let base = leading + OPEN.len();

    if body.contains(OPEN) || body.contains(CLOSE) {
        return Err(ExpressionError::syntax(raw, base, "nested braces"));
    }

    let tokens = Tokenizer::new(raw, body, base).tokenize_all()?;
    let mut stream = TokenStream::new(tokens, base + body.len());

    let path = parse_source_path(raw, &mut stream)?;
    let default = parse_default(raw, &mut stream)?;
    let filters = parse_filters(raw, &mut stream)?;

    if let Some(token) = stream.peek() {
        return Err(ExpressionError::syntax(
            raw,
            token.offset,
            format!("unexpected {}", token.value.describe()),
        ));
    }

    Ok(Expression {
        raw: raw.to_string(),
        path,
        default,
        filters,
        form: ExpressionForm::Braced,
    })
}

fn parse_alias(raw: &str, alias: &str, offset: usize) -> ExpressionResult<Expression> {
    if alias.is_empty() {
        return Err(ExpressionError::syntax(raw, offset, "empty alias path"));
    }
    if let Some(position) = alias.find(char::is_whitespace) {
        return Err(ExpressionError::syntax(
            raw,
            offset + position,
            "whitespace in alias path",
        ));
    }
    Ok(Expression {
        raw: raw.to_string(),
        path: path_or_error(raw, alias)?,
        default: None,
        filters: Vec::new(),
        form: ExpressionForm::Alias,
    })
}

fn path_or_error(raw: &str, text: &str) -> ExpressionResult<Path> {
    parse_path(text).map_err(|source| ExpressionError::InvalidPath {
        expression: raw.to_string(),
        source,
    })
}

fn parse_source_path(raw: &str, stream: &mut TokenStream<'_>) -> ExpressionResult<Path> {
    let offset = stream.offset();
    match stream.next().map(|token| token.value) {
        Some(Token::Word(text)) => path_or_error(raw, text),
        Some(other) => Err(ExpressionError::syntax(
            raw,
            offset,
            format!("expected a path, found {}", other.describe()),
        )),
        None => Err(ExpressionError::syntax(raw, offset, "empty expression")),
    }
}

fn parse_default(raw: &str, stream: &mut TokenStream<'_>) -> ExpressionResult<Option<Value>> {
    if stream
        .consume_if(|t| matches!(t, Token::Coalesce))
        .is_none()
    {
        return Ok(None);
    }

    let offset = stream.offset();
    match stream.next().map(|token| token.value) {
        Some(Token::Quoted(text)) => Ok(Some(Value::String(text))),
        Some(Token::Word(word)) => parse_literal(word)
            .map(Some)
            .ok_or_else(|| {
                ExpressionError::syntax(raw, offset, format!("invalid default literal '{word}'"))
            }),
        Some(other) => Err(ExpressionError::syntax(
            raw,
            offset,
            format!("expected a default value after '??', found {}", other.describe()),
        )),
        None => Err(ExpressionError::syntax(
            raw,
            offset,
            "expected a default value after '??'",
        )),
    }
}

/// Parse a bare default literal: number, boolean or null
pub fn parse_literal(word: &str) -> Option<Value> {
    match word {
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        "null" => Some(Value::Null),
        _ => word
            .parse::<i64>()
            .map(Value::Int)
            .ok()
            .or_else(|| {
                word.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(Value::Float)
            }),
    }
}

fn parse_filters(raw: &str, stream: &mut TokenStream<'_>) -> ExpressionResult<Vec<FilterCall>> {
    let mut filters = Vec::new();

    while stream.consume_if(|t| matches!(t, Token::Pipe)).is_some() {
        let offset = stream.offset();
        let name = match stream.next().map(|token| token.value) {
            Some(Token::Word(name)) if is_identifier(name) => name.to_string(),
            Some(Token::Word(name)) => {
                return Err(ExpressionError::syntax(
                    raw,
                    offset,
                    format!("invalid filter name '{name}'"),
                ));
            }
            Some(other) => {
                return Err(ExpressionError::syntax(
                    raw,
                    offset,
                    format!("expected a filter name, found {}", other.describe()),
                ));
            }
            None => {
                return Err(ExpressionError::syntax(
                    raw,
                    offset,
                    "expected a filter name after '|'",
                ));
            }
        };

        let mut args = Vec::new();
        while stream.consume_if(|t| matches!(t, Token::Colon)).is_some() {
            let offset = stream.offset();
            match stream.next().map(|token| token.value) {
                Some(Token::Word(word)) => args.push(word.to_string()),
                Some(Token::Quoted(text)) => args.push(text),
                _ => {
                    return Err(ExpressionError::syntax(
                        raw,
                        offset,
                        format!("expected an argument for filter '{name}'"),
                    ));
                }
            }
        }

        filters.push(FilterCall::new(name, args));
    }

    Ok(filters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_full_grammar() {
        let expr = parse_expression("{{ user.name ?? 'Unknown' | trim | replace:' ':'_' | upper }}")
            .unwrap();
        assert_eq!(expr.path.to_string(), "user.name");
        assert_eq!(expr.default, Some(Value::from("Unknown")));
        assert_eq!(
            expr.filters,
            vec![
                FilterCall::new("trim", vec![]),
                FilterCall::new("replace", vec![" ".into(), "_".into()]),
                FilterCall::new("upper", vec![]),
            ]
        );
        assert_eq!(expr.form, ExpressionForm::Braced);
    }

    #[rstest]
    #[case("{{ a ?? 0 }}", Value::Int(0))]
    #[case("{{ a ?? -2.5 }}", Value::Float(-2.5))]
    #[case("{{ a ?? true }}", Value::Bool(true))]
    #[case("{{ a ?? null }}", Value::Null)]
    #[case("{{ a ?? \"x y\" }}", Value::from("x y"))]
    fn test_default_literals(#[case] raw: &str, #[case] expected: Value) {
        assert_eq!(parse_expression(raw).unwrap().default, Some(expected));
    }

    #[test]
    fn test_alias_form() {
        let expr = parse_expression("@orders.*.id").unwrap();
        assert_eq!(expr.form, ExpressionForm::Alias);
        assert_eq!(expr.path.wildcard_count(), 1);
        assert!(expr.is_plain());
    }

    #[test]
    fn test_compact_spacing() {
        let expr = parse_expression("{{price??0|round:2}}").unwrap();
        assert_eq!(expr.path.to_string(), "price");
        assert_eq!(expr.default, Some(Value::Int(0)));
        assert_eq!(expr.filters[0], FilterCall::new("round", vec!["2".into()]));
    }

    #[rstest]
    #[case("user.name", 0)]
    #[case("{{ }}", 3)]
    #[case("{{ a ?? }}", 8)]
    #[case("{{ a ?? oops }}", 8)]
    #[case("{{ a | }}", 7)]
    #[case("{{ a | 9x }}", 7)]
    #[case("{{ a | f: }}", 10)]
    #[case("{{ a b }}", 5)]
    #[case("{{ a", 4)]
    #[case("@", 1)]
    fn test_syntax_errors(#[case] raw: &str, #[case] position: usize) {
        match parse_expression(raw).unwrap_err() {
            ExpressionError::Syntax { position: at, .. } => assert_eq!(at, position, "{raw}"),
            other => panic!("unexpected error for {raw}: {other}"),
        }
    }

    #[test]
    fn test_invalid_path_inside_expression() {
        let err = parse_expression("{{ user..name }}").unwrap_err();
        assert!(matches!(err, ExpressionError::InvalidPath { .. }));
    }
}
