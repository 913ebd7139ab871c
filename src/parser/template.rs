//! Classification of template strings
//!
//! A string leaf of a mapping template is one of:
//! - a whole `{{ ... }}` expression, whose result keeps its type
//! - an `@path` alias
//! - text with embedded `{{ ... }}` placeholders, which renders to a string
//! - a literal copied as-is

use super::expression::{ALIAS, CLOSE, OPEN};

/// A piece of an interpolated string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart<'a> {
    /// Literal text
    Text(&'a str),
    /// Raw `{{ ... }}` placeholder, delimiters included
    Placeholder(&'a str),
}

/// What a template string is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateKind<'a> {
    /// The whole string is one `{{ ... }}` expression
    Expression,
    /// `@path`
    Alias,
    /// Text mixed with placeholders
    Interpolation(Vec<TemplatePart<'a>>),
    /// Plain text
    Literal,
}

/// Classify a template string
pub fn classify(text: &str) -> TemplateKind<'_> {
    let trimmed = text.trim();

    if trimmed.starts_with(OPEN)
        && trimmed.ends_with(CLOSE)
        && trimmed.find(CLOSE) == Some(trimmed.len() - CLOSE.len())
    {
        return TemplateKind::Expression;
    }

    if let Some(rest) = trimmed.strip_prefix(ALIAS)
        && !rest.is_empty()
        && !rest.contains(char::is_whitespace)
    {
        return TemplateKind::Alias;
    }

    let parts = split_placeholders(text);
    if parts
        .iter()
        .any(|part| matches!(part, TemplatePart::Placeholder(_)))
    {
        TemplateKind::Interpolation(parts)
    } else {
        TemplateKind::Literal
    }
}

/// Split text into literal runs and `{{ ... }}` placeholders.
///
/// An opening `{{` without a matching `}}` is kept as text.
pub fn split_placeholders(text: &str) -> Vec<TemplatePart<'_>> {
    let mut parts = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(OPEN) {
        let Some(len) = rest[start..].find(CLOSE) else {
            break;
        };
        let end = start + len + CLOSE.len();
        if start > 0 {
            parts.push(TemplatePart::Text(&rest[..start]));
        }
        parts.push(TemplatePart::Placeholder(&rest[start..end]));
        rest = &rest[end..];
    }

    if !rest.is_empty() {
        parts.push(TemplatePart::Text(rest));
    }
    parts
}
