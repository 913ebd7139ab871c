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

//! Tokenizer for the body of a template expression
//!
//! Works on the text between `{{` and `}}`. Bare words borrow from the
//! input; quoted strings are unescaped into owned strings.

use super::error::{ExpressionError, ExpressionResult};

/// Expression token
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'input> {
    /// Unquoted run of characters: a path, filter name, number or keyword
    Word(&'input str),
    /// Single- or double-quoted string, unescaped
    Quoted(String),
    /// `??`
    Coalesce,
    /// `|`
    Pipe,
    /// `:`
    Colon,
}

impl Token<'_> {
    /// Short description used in error messages
    pub fn describe(&self) -> String {
        match self {
            Token::Word(word) => format!("'{word}'"),
            Token::Quoted(text) => format!("string '{text}'"),
            Token::Coalesce => "'??'".to_string(),
            Token::Pipe => "'|'".to_string(),
            Token::Colon => "':'".to_string(),
        }
    }
}

/// A token together with its byte offset in the raw expression
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    /// The token
    pub value: T,
    /// Byte offset in the raw expression
    pub offset: usize,
}

/// Expression tokenizer
pub struct Tokenizer<'input> {
    raw: &'input str,
    body: &'input str,
    base: usize,
    position: usize,
}

impl<'input> Tokenizer<'input> {
    /// Tokenize `body`, which starts at byte `base` of `raw`
    pub fn new(raw: &'input str, body: &'input str, base: usize) -> Self {
        Self {
            raw,
            body,
            base,
            position: 0,
        }
    }

    /// Produce every token of the body
    pub fn tokenize_all(&mut self) -> ExpressionResult<Vec<Spanned<Token<'input>>>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    /// Next token, `None` at the end of input
    pub fn next_token(&mut self) -> ExpressionResult<Option<Spanned<Token<'input>>>> {
        self.skip_whitespace();
        let rest = &self.body[self.position..];
        let Some(first) = rest.chars().next() else {
            return Ok(None);
        };
        let offset = self.base + self.position;

        let token = match first {
            '|' => {
                self.position += 1;
                Token::Pipe
            }
            ':' => {
                self.position += 1;
                Token::Colon
            }
            '?' if rest.starts_with("??") => {
                self.position += 2;
                Token::Coalesce
            }
            '\'' | '"' => Token::Quoted(self.read_quoted(first, offset)?),
            _ => Token::Word(self.read_word()),
        };

        Ok(Some(Spanned {
            value: token,
            offset,
        }))
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.body[self.position..];
        self.position += rest.len() - rest.trim_start().len();
    }

    fn read_word(&mut self) -> &'input str {
        let rest = &self.body[self.position..];
        let mut end = rest.len();
        for (i, c) in rest.char_indices() {
            let stop = c.is_whitespace()
                || c == '|'
                || c == ':'
                || c == '\''
                || c == '"'
                || rest[i..].starts_with("??");
            if stop {
                end = i;
                break;
            }
        }
        self.position += end;
        &rest[..end]
    }

    fn read_quoted(&mut self, quote: char, offset: usize) -> ExpressionResult<String> {
        let rest = &self.body[self.position + 1..];
        let mut text = String::new();
        let mut chars = rest.char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, escaped)) => text.push(escaped),
                    None => break,
                },
                c if c == quote => {
                    self.position += 1 + i + c.len_utf8();
                    return Ok(text);
                }
                c => text.push(c),
            }
        }
        Err(ExpressionError::syntax(
            self.raw,
            offset,
            "unterminated string literal",
        ))
    }
}
