//! Error types for parser code generation.

use pegc_util::{Diagnostic, ToDiagnostics};
use thiserror::Error;

/// Error type for code generation.
///
/// Generation runs only on grammars that passed static analysis, so every
/// variant here is a developer-facing "can't happen" condition rather than
/// a user mistake.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodeGenError {
    /// A rule reference had no entry in the result-type table
    #[error("no result type recorded for rule '{0}'")]
    UnknownRule(String),

    /// A null value was requested for a type that has none
    #[error("null value not implemented for type '{0}'")]
    NoNullValue(String),

    /// Internal error - indicates a bug
    #[error("internal error: {0}")]
    Internal(String),
}

impl ToDiagnostics for CodeGenError {
    fn to_diagnostics(&self) -> Vec<Diagnostic> {
        vec![Diagnostic::new(self.to_string())]
    }
}

/// Result type alias for code generation operations.
pub type Result<T> = std::result::Result<T, CodeGenError>;
