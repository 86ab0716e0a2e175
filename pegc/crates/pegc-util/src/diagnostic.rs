//! Fatal diagnostics.
//!
//! The generator aborts on the first error it finds, so the diagnostic
//! model is deliberately small: a message, an optional source position, and
//! a renderer that produces the `file:line:col: message` form the CLI
//! prints to stderr. Stage error types (lexical, syntactic, semantic,
//! generation) implement [`ToDiagnostics`] so the driver can report any of
//! them uniformly; most errors map to exactly one diagnostic, but a few
//! (unused-rule detection) fan out to one diagnostic per offender.

use crate::span::Span;

/// A single positioned error message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// Where in the grammar file the problem was found, if known.
    pub span: Option<Span>,

    /// Human-readable description of the problem.
    pub message: String,
}

impl Diagnostic {
    /// Creates a diagnostic with no source position.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            span: None,
            message: message.into(),
        }
    }

    /// Creates a diagnostic positioned at `span`.
    pub fn at(span: Span, message: impl Into<String>) -> Self {
        Self {
            span: Some(span),
            message: message.into(),
        }
    }

    /// Renders the diagnostic for the given file name.
    ///
    /// Positioned diagnostics render as `file:line:col: message`;
    /// unpositioned ones render the bare message.
    ///
    /// # Examples
    ///
    /// ```
    /// use pegc_util::diagnostic::Diagnostic;
    /// use pegc_util::span::Span;
    ///
    /// let diag = Diagnostic::at(Span::point(3, 14), "No rule is defined");
    /// assert_eq!(diag.render("calc.peg"), "calc.peg:3:14: No rule is defined");
    /// ```
    pub fn render(&self, filename: &str) -> String {
        match self.span {
            Some(span) => format!(
                "{}:{}:{}: {}",
                filename, span.line, span.column, self.message
            ),
            None => self.message.clone(),
        }
    }
}

/// Conversion of a stage error into the diagnostics it should print.
pub trait ToDiagnostics {
    /// Returns the diagnostics for this error, in reporting order.
    fn to_diagnostics(&self) -> Vec<Diagnostic>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_positioned() {
        let diag = Diagnostic::at(Span::point(2, 5), "unknown character '@'");
        assert_eq!(diag.render("g.peg"), "g.peg:2:5: unknown character '@'");
    }

    #[test]
    fn test_render_unpositioned() {
        let diag = Diagnostic::new("No rule is defined");
        assert_eq!(diag.render("g.peg"), "No rule is defined");
    }
}
