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

//! Crate-wide error type
//!
//! Only malformed input surfaces as an error. Absent data, paths running
//! into scalars and wildcards over non-containers resolve to `None` or the
//! caller's default.

use crate::mapper::hooks::HookPoint;
use crate::parser::{ExpressionError, PathError};
use crate::registry::FilterError;
use thiserror::Error;

/// Result type for data operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by accessor, mutator and mapping operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed dot-path
    #[error("Path syntax error: {0}")]
    PathSyntax(#[from] PathError),

    /// Malformed template expression
    #[error("Expression syntax error: {0}")]
    ExpressionSyntax(#[from] ExpressionError),

    /// A filter chain names a filter nobody registered
    #[error("Unknown filter '{name}'")]
    UnknownFilter {
        /// Filter name as written
        name: String,
    },

    /// A filter rejected its arguments
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    /// A mapping template node cannot be compiled
    #[error("Invalid template at '{path}': {message}")]
    InvalidTemplate {
        /// Location of the offending node inside the template
        path: String,
        /// Error message
        message: String,
    },

    /// A lifecycle hook failed
    #[error("Hook '{point}' failed: {message}")]
    Hook {
        /// Hook point that raised
        point: HookPoint,
        /// Error message
        message: String,
    },
}

impl Error {
    /// Build an [`Error::InvalidTemplate`]
    pub fn invalid_template(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidTemplate {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether the error comes from malformed path or expression text
    pub fn is_syntax_error(&self) -> bool {
        matches!(self, Error::PathSyntax(_) | Error::ExpressionSyntax(_))
    }
}
