//! The grammar tokenizer.

use pegc_util::Span;

use crate::cursor::Cursor;
use crate::error::{LexError, Result};
use crate::token::{Token, TokenKind, LEXICAL_PATTERNS};

/// Tokenizer for grammar source text.
///
/// Scans left to right, skipping whitespace between tokens. Most tokens are
/// matched by the anchored patterns of the lexical table, tried in
/// declaration order; `{...}` actions, `<...>` rule types and the bodies of
/// `%cpp`/`%hpp` directives are consumed by bracket-balanced scans that
/// track nesting depth.
///
/// The token list is computed once and cached; subsequent
/// [`Tokenizer::tokenize`] calls return the same tokens.
pub struct Tokenizer<'a> {
    /// Grammar source text.
    source: &'a str,

    /// Cached token list.
    tokens: Vec<Token>,

    /// Whether a scan has already completed.
    scanned: bool,
}

impl<'a> Tokenizer<'a> {
    /// Creates a tokenizer over `source`.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            tokens: Vec::new(),
            scanned: false,
        }
    }

    /// Tokenizes the source, returning the full token list.
    ///
    /// The first call scans the input; later calls return the cached list.
    pub fn tokenize(&mut self) -> Result<&[Token]> {
        if !self.scanned {
            self.tokens.clear();
            self.scan()?;
            self.scanned = true;
        }
        Ok(&self.tokens)
    }

    fn scan(&mut self) -> Result<()> {
        let mut cursor = Cursor::new(self.source);

        loop {
            cursor.skip_whitespace();
            if cursor.is_at_end() {
                return Ok(());
            }

            if self.expects_code_section() {
                self.scan_code_section(&mut cursor)?;
            } else if cursor.current_char() == Some('{') {
                let (span, start, end) = Self::scan_balanced(&mut cursor, '{', '}')?;
                // action text keeps its braces
                self.tokens.push(Token {
                    kind: TokenKind::Action,
                    lexeme: self.source[start..=end].to_string(),
                    span,
                });
            } else if cursor.current_char() == Some('<') {
                let (span, start, end) = Self::scan_balanced(&mut cursor, '<', '>')?;
                self.tokens.push(Token {
                    kind: TokenKind::RuleType,
                    lexeme: self.source[start..=end].to_string(),
                    span,
                });
            } else {
                self.scan_lexical(&mut cursor)?;
            }
        }
    }

    /// Returns true when the previous two tokens are `%` followed by the
    /// identifier `cpp` or `hpp`, which forces the next token to be a
    /// brace-delimited code section.
    fn expects_code_section(&self) -> bool {
        let n = self.tokens.len();
        if n < 2 {
            return false;
        }
        self.tokens[n - 2].kind == TokenKind::Percent
            && self.tokens[n - 1].kind == TokenKind::Identifier
            && matches!(self.tokens[n - 1].lexeme.as_str(), "cpp" | "hpp")
    }

    fn scan_code_section(&mut self, cursor: &mut Cursor<'a>) -> Result<()> {
        if cursor.current_char() != Some('{') {
            return Err(LexError::ExpectedBlock {
                span: Span::new(
                    cursor.position(),
                    cursor.position(),
                    cursor.line(),
                    cursor.column(),
                ),
            });
        }
        let (span, start, end) = Self::scan_balanced(cursor, '{', '}')?;
        // code sections drop their braces
        self.tokens.push(Token {
            kind: TokenKind::CodeSection,
            lexeme: self.source[start + 1..end].to_string(),
            span,
        });
        Ok(())
    }

    /// Consumes a bracket-balanced block starting at the cursor.
    ///
    /// The cursor must sit on `open`. Nesting of `open`/`close` is tracked;
    /// the cursor is left just past the matching closer. Returns the span of
    /// the whole block plus the byte offsets of the opener and the closer.
    fn scan_balanced(
        cursor: &mut Cursor<'a>,
        open: char,
        close: char,
    ) -> Result<(Span, usize, usize)> {
        let start = cursor.position();
        let line = cursor.line();
        let column = cursor.column();

        let mut depth = 0usize;
        loop {
            match cursor.current_char() {
                Some(c) if c == open => depth += 1,
                Some(c) if c == close => {
                    depth -= 1;
                    if depth == 0 {
                        let end = cursor.position();
                        cursor.advance();
                        return Ok((Span::new(start, cursor.position(), line, column), start, end));
                    }
                }
                Some(_) => {}
                None => {
                    return Err(LexError::UnbalancedDelimiter {
                        delimiter: close,
                        span: Span::new(
                            cursor.position(),
                            cursor.position(),
                            cursor.line(),
                            cursor.column(),
                        ),
                    });
                }
            }
            cursor.advance();
        }
    }

    /// Matches one lexical token at the cursor, in pattern declaration
    /// order. Comments are consumed and discarded.
    fn scan_lexical(&mut self, cursor: &mut Cursor<'a>) -> Result<()> {
        let start = cursor.position();
        let line = cursor.line();
        let column = cursor.column();

        for (kind, pattern) in LEXICAL_PATTERNS.iter() {
            if let Some(m) = pattern.find(cursor.remaining()) {
                cursor.advance_bytes(m.end());
                if *kind != TokenKind::Comment {
                    self.tokens.push(Token {
                        kind: *kind,
                        lexeme: m.as_str().to_string(),
                        span: Span::new(start, start + m.end(), line, column),
                    });
                }
                return Ok(());
            }
        }

        Err(LexError::UnknownCharacter {
            // scan_lexical is only entered when a character is present
            ch: cursor.current_char().unwrap_or('\0'),
            span: Span::new(start, start, line, column),
        })
    }
}
