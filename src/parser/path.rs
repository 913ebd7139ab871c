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

//! Dot-path parser

use super::error::{PathError, PathResult, PathSyntaxIssue};
use crate::ast::{Path, SEPARATOR, Segment, WILDCARD};

/// Parse a dot-notation path.
///
/// The empty string is the root path. A leading dot, trailing dot or empty
/// segment fails with [`PathError::MalformedSyntax`]. `*` becomes a
/// wildcard; every other segment, digits included, stays literal.
pub fn parse_path(raw: &str) -> PathResult<Path> {
    if raw.is_empty() {
        return Ok(Path::root());
    }

    let malformed = |issue| PathError::MalformedSyntax {
        path: raw.to_string(),
        issue,
    };

    if raw.starts_with(SEPARATOR) {
        return Err(malformed(PathSyntaxIssue::LeadingDot));
    }
    if raw.ends_with(SEPARATOR) {
        return Err(malformed(PathSyntaxIssue::TrailingDot));
    }
    if let Some(offset) = raw.find("..") {
        return Err(malformed(PathSyntaxIssue::EmptySegment {
            position: offset + 1,
        }));
    }

    Ok(Path::from_segments(raw.split(SEPARATOR).map(|segment| {
        if segment == WILDCARD {
            Segment::Wildcard
        } else {
            Segment::literal(segment)
        }
    })))
}
