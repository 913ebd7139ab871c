//! Lexical analysis utilities

use super::tokenizer::{Spanned, Token};

/// Check if a character can start an identifier
pub fn is_identifier_start(c: char) -> bool {
    unicode_xid::UnicodeXID::is_xid_start(c) || c == '_'
}

/// Check if a character can continue an identifier
pub fn is_identifier_continue(c: char) -> bool {
    unicode_xid::UnicodeXID::is_xid_continue(c)
}

/// Whether `name` is a valid filter identifier
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => is_identifier_start(first) && chars.all(is_identifier_continue),
        None => false,
    }
}

/// Token stream with lookahead capability
#[derive(Debug)]
pub struct TokenStream<'input> {
    tokens: Vec<Spanned<Token<'input>>>,
    position: usize,
    end_offset: usize,
}

impl<'input> TokenStream<'input> {
    /// Create a new token stream; `end_offset` is reported for errors at EOF
    pub fn new(tokens: Vec<Spanned<Token<'input>>>, end_offset: usize) -> Self {
        Self {
            tokens,
            position: 0,
            end_offset,
        }
    }

    /// Peek at the current token without consuming
    pub fn peek(&self) -> Option<&Spanned<Token<'input>>> {
        self.tokens.get(self.position)
    }

    /// Consume and return the current token
    pub fn next(&mut self) -> Option<Spanned<Token<'input>>> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    /// Check if we're at the end of the stream
    pub fn is_eof(&self) -> bool {
        self.position >= self.tokens.len()
    }

    /// Byte offset of the current token, or of the end of input
    pub fn offset(&self) -> usize {
        self.peek().map_or(self.end_offset, |token| token.offset)
    }

    /// Consume a token if it matches the predicate
    pub fn consume_if<F>(&mut self, predicate: F) -> Option<Spanned<Token<'input>>>
    where
        F: FnOnce(&Token<'input>) -> bool,
    {
        match self.peek() {
            Some(token) if predicate(&token.value) => self.next(),
            _ => None,
        }
    }
}
