//! Lexical error types.

use pegc_util::{Diagnostic, Span, ToDiagnostics};
use thiserror::Error;

/// Error type for grammar tokenization.
///
/// Every variant is fatal: the tokenizer stops at the first problem and
/// produces no token list.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LexError {
    /// No token pattern matched at the current position
    #[error("unknown character '{ch}'")]
    UnknownCharacter { ch: char, span: Span },

    /// A bracket-balanced scan ran off the end of the input
    #[error("'{delimiter}' is expected")]
    UnbalancedDelimiter { delimiter: char, span: Span },

    /// `%cpp` / `%hpp` was not followed by a `{...}` block
    #[error("'{{' is expected")]
    ExpectedBlock { span: Span },
}

impl LexError {
    /// Returns the source position of the error.
    pub fn span(&self) -> Span {
        match self {
            LexError::UnknownCharacter { span, .. }
            | LexError::UnbalancedDelimiter { span, .. }
            | LexError::ExpectedBlock { span } => *span,
        }
    }
}

impl ToDiagnostics for LexError {
    fn to_diagnostics(&self) -> Vec<Diagnostic> {
        vec![Diagnostic::at(self.span(), self.to_string())]
    }
}

/// Result type alias for tokenization operations.
pub type Result<T> = std::result::Result<T, LexError>;
