//! Byte-offset cursor shared by the recursive-descent parsers.

use crate::error::VarsmithError;

/// A read position inside a source string.
///
/// Offsets are byte offsets; every advance lands on a char boundary.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Start at `pos` (clamped to the text length).
    #[must_use]
    pub fn new(text: &'a str, pos: usize) -> Self {
        Self {
            text,
            pos: pos.min(text.len()),
        }
    }

    /// Current byte offset.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// The unread remainder.
    #[must_use]
    pub fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.text.len()
    }

    /// Next char without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Consume one char.
    pub fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    /// Skip spaces, tabs and newlines.
    pub fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    /// Consume `token` if the remainder starts with it.
    pub fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    /// Consume `token` or fail at the current offset.
    ///
    /// # Errors
    ///
    /// Returns `MalformedExpression` if `token` is not next.
    pub fn expect(&mut self, token: &str) -> Result<(), VarsmithError> {
        if self.eat(token) {
            Ok(())
        } else if self.is_eof() {
            Err(self.error(format!("expected '{token}', found end of input")))
        } else {
            Err(self.error(format!("expected '{token}'")))
        }
    }

    /// Whether the remainder starts with `keyword` as a whole word.
    #[must_use]
    pub fn at_keyword(&self, keyword: &str) -> bool {
        let rest = self.rest();
        rest.starts_with(keyword)
            && !rest[keyword.len()..]
                .chars()
                .next()
                .is_some_and(is_ident_char)
    }

    /// Consume an identifier (`[A-Za-z0-9_-]+`).
    pub fn ident(&mut self) -> Option<&'a str> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if is_ident_char(c)) {
            self.bump();
        }
        (self.pos > start).then(|| &self.text[start..self.pos])
    }

    /// Consume a double-quoted string and return its unescaped contents.
    ///
    /// # Errors
    ///
    /// Returns `MalformedExpression` if the string is not terminated.
    pub fn quoted(&mut self) -> Result<String, VarsmithError> {
        let start = self.pos;
        self.expect("\"")?;
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(c) => out.push(c),
                    None => break,
                },
                Some(c) => out.push(c),
                None => break,
            }
        }
        Err(self.error_at(start, "unterminated string".to_string()))
    }

    /// Skip one literal: a balanced `{...}` or `[...]`, a quoted string,
    /// `null`, or a bare token (number, bool, reference) ending at `,`, `)`
    /// or whitespace. Returns the skipped text.
    ///
    /// # Errors
    ///
    /// Returns `MalformedExpression` on an unterminated bracket or string.
    pub fn skip_literal(&mut self) -> Result<&'a str, VarsmithError> {
        let start = self.pos;
        match self.peek() {
            Some('{' | '[') => self.skip_balanced()?,
            Some('"') => {
                self.quoted()?;
            }
            Some(_) if self.at_keyword("null") => {
                self.pos += "null".len();
            }
            Some(_) => {
                while matches!(self.peek(), Some(c) if c != ',' && c != ')' && !c.is_whitespace()) {
                    self.bump();
                }
                if self.pos == start {
                    return Err(self.error("expected a default value".to_string()));
                }
            }
            None => return Err(self.error("expected a default value, found end of input".to_string())),
        }
        Ok(&self.text[start..self.pos])
    }

    /// Skip from an opening `{` or `[` to its matching closer. Quoted strings
    /// are skipped whole so brackets inside them do not count.
    fn skip_balanced(&mut self) -> Result<(), VarsmithError> {
        let start = self.pos;
        let mut stack: Vec<char> = Vec::new();
        while let Some(ch) = self.peek() {
            match ch {
                '"' => {
                    self.quoted()?;
                    continue;
                }
                '{' => stack.push('}'),
                '[' => stack.push(']'),
                '(' => stack.push(')'),
                '}' | ']' | ')' => {
                    if stack.pop() != Some(ch) {
                        return Err(self.error(format!("unbalanced '{ch}'")));
                    }
                }
                _ => {}
            }
            self.bump();
            if stack.is_empty() {
                return Ok(());
            }
        }
        Err(self.error_at(start, "unterminated bracket".to_string()))
    }

    /// Build a `MalformedExpression` at the current offset.
    #[must_use]
    pub fn error(&self, message: String) -> VarsmithError {
        self.error_at(self.pos, message)
    }

    #[must_use]
    pub fn error_at(&self, position: usize, message: String) -> VarsmithError {
        crate::err!(MalformedExpression {
            position,
            source_text: self.text.to_string(),
            message,
        })
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}
