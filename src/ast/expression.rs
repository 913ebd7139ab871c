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

//! Parsed template expressions

use super::path::Path;
use crate::model::Value;
use std::fmt;

/// How the expression was written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionForm {
    /// `{{ path ?? default | filter }}`
    Braced,
    /// `@path`
    Alias,
}

/// One `| name:arg:arg` step of a filter chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCall {
    /// Filter name as written
    pub name: String,
    /// Positional arguments, unquoted
    pub args: Vec<String>,
}

impl FilterCall {
    /// Create a filter call
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

impl fmt::Display for FilterCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for arg in &self.args {
            write!(f, ":{arg}")?;
        }
        Ok(())
    }
}

/// A parsed placeholder: source path, optional default and filter chain
///
/// Immutable once parsed; the expression cache hands out shared
/// `Arc<Expression>` values keyed by the raw text.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    /// Raw text the expression was parsed from
    pub raw: String,
    /// Source path
    pub path: Path,
    /// Value used when the path is absent or null
    pub default: Option<Value>,
    /// Filters applied left to right
    pub filters: Vec<FilterCall>,
    /// Written form
    pub form: ExpressionForm,
}

impl Expression {
    /// Plain path expression without default or filters
    pub fn from_path(path: Path) -> Self {
        Self {
            raw: format!("{{{{ {path} }}}}"),
            path,
            default: None,
            filters: Vec::new(),
            form: ExpressionForm::Braced,
        }
    }

    /// Whether the expression is a bare path reference
    pub fn is_plain(&self) -> bool {
        self.default.is_none() && self.filters.is_empty()
    }

    /// Whether the source path contains a wildcard
    pub fn has_wildcard(&self) -> bool {
        self.path.has_wildcard()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
