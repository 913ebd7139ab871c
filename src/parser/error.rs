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

//! Syntax errors raised while parsing paths and expressions

use std::fmt;
use thiserror::Error;

/// Result type for path parsing
pub type PathResult<T> = Result<T, PathError>;

/// Result type for expression parsing
pub type ExpressionResult<T> = Result<T, ExpressionError>;

/// What exactly is wrong with a malformed path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSyntaxIssue {
    /// The path starts with `.`
    LeadingDot,
    /// The path ends with `.`
    TrailingDot,
    /// Two consecutive dots
    EmptySegment {
        /// Byte offset of the second dot
        position: usize,
    },
}

impl fmt::Display for PathSyntaxIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSyntaxIssue::LeadingDot => write!(f, "leading dot"),
            PathSyntaxIssue::TrailingDot => write!(f, "trailing dot"),
            PathSyntaxIssue::EmptySegment { position } => {
                write!(f, "empty segment at position {position}")
            }
        }
    }
}

/// Dot-path syntax error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// Leading, trailing or double dot
    #[error("Malformed path '{path}': {issue}")]
    MalformedSyntax {
        /// The raw path as given
        path: String,
        /// What is wrong with it
        issue: PathSyntaxIssue,
    },
}

impl PathError {
    /// The offending raw path
    pub fn path(&self) -> &str {
        match self {
            PathError::MalformedSyntax { path, .. } => path,
        }
    }

    /// The specific syntax issue
    pub fn issue(&self) -> PathSyntaxIssue {
        match self {
            PathError::MalformedSyntax { issue, .. } => *issue,
        }
    }
}

/// Template expression syntax error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    /// Malformed expression text
    #[error("Expression syntax error at position {position} in '{expression}': {message}")]
    Syntax {
        /// The raw expression
        expression: String,
        /// Byte offset of the problem
        position: usize,
        /// Human-readable description
        message: String,
    },

    /// The source path inside the expression is malformed
    #[error("Invalid path in expression '{expression}': {source}")]
    InvalidPath {
        /// The raw expression
        expression: String,
        /// Underlying path error
        source: PathError,
    },
}

impl ExpressionError {
    /// Build a syntax error
    pub fn syntax(expression: &str, position: usize, message: impl Into<String>) -> Self {
        ExpressionError::Syntax {
            expression: expression.to_string(),
            position,
            message: message.into(),
        }
    }
}
