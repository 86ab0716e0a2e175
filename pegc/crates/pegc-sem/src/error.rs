//! Semantic error types.
//!
//! One variant per static-analysis violation. Message texts are part of
//! the tool's contract (tests and users match on them), so they are kept
//! stable here rather than composed at the call sites.

use pegc_util::{Diagnostic, Span, ToDiagnostics};
use thiserror::Error;

/// Error type for grammar static analysis.
///
/// Every variant is fatal; analysis stops at the first violation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    /// The grammar defines no rule at all
    #[error("No rule is defined")]
    NoRules,

    /// Two rules share a name
    #[error("Rule '{name}' has more than one definition")]
    DuplicateRule { name: String, span: Span },

    /// A directive appears more than once
    #[error("The '%{directive}' directive has more than one definition")]
    DuplicateDirective { directive: &'static str, span: Span },

    /// `%root` names an unknown rule
    #[error("The directive '%root' contains a non-existing rule: '{name}'")]
    UnknownRootRule { name: String, span: Span },

    /// A rule reference names an unknown rule
    #[error("The '{rule}' rule invokes a nonexistent rule '{name}'")]
    UnknownRuleReference {
        rule: String,
        name: String,
        span: Span,
    },

    /// Rules defined but unreachable from the root; reported together,
    /// one diagnostic per rule
    #[error("{}", unused_listing(.rules))]
    UnusedRules { rules: Vec<(String, Span)> },

    /// A left-recursive rule needs an alternative to terminate on
    #[error("In the '{name}' name, a left-recursive rule must be at least 2 sequences of expressions")]
    LeftRecursiveSingleSequence { name: String, span: Span },

    /// Captures exist but the sequence has no action to consume them
    #[error("In the '{rule}' rule, variables are declared, but there is no action")]
    CapturesWithoutAction { rule: String, span: Span },

    /// The rule declares a return type but a sequence has no action
    #[error("In the '{rule}' rule, the return type is defined, but the action not specified")]
    ReturnTypeWithoutAction { rule: String, span: Span },

    /// The rule declares a return type but the action never assigns `$$`
    #[error("In the '{rule}' rule, the return type is defined, but '$$' variable in the action is not")]
    ReturnTypeWithoutResult { rule: String, span: Span },

    /// The same capture name is used twice within one sequence
    #[error("In the '{rule}' rule, variable '{var}' is declared multiple times")]
    DuplicateCapture {
        rule: String,
        var: String,
        span: Span,
    },

    /// A `*`/`+` group contains captures
    #[error("In the '{rule}' rule, the group uses variables inside itself and repetitions operators simultaneously")]
    CapturesInRepeatedGroup { rule: String, span: Span },

    /// A `!` item carries a capture name
    #[error("In the '{rule}' rule, a parsing expression with the '!' operator cannot be assigned to a variable")]
    NegativeLookaheadCapture { rule: String, span: Span },

    /// A string under `&` carries a capture name
    #[error("In the '{rule}' rule, a string with the '&' operator cannot be assigned to a variable")]
    LookaheadStringCapture { rule: String, span: Span },

    /// A bare string (no loop, no optional) carries a capture name
    #[error("In the '{rule}' rule, simple string cannot be assigned to a variable")]
    PlainStringCapture { rule: String, span: Span },

    /// Alternatives of one rule disagree on boolean vs. value result
    #[error("In the '{rule}' rule, parsing expression sequences return different types")]
    MixedResultTypes { rule: String, span: Span },

    /// A character class lists the same character twice
    #[error("In the '{rule}' rule, the character class has the same characters: {ch}")]
    DuplicateClassCharacter {
        rule: String,
        ch: String,
        span: Span,
    },

    /// A character-class range has identical endpoints
    #[error("In the '{rule}' rule, inside the character class '[{class_text}]', the first and second characters in the range are the same '{range}'")]
    DegenerateClassRange {
        rule: String,
        class_text: String,
        range: String,
        span: Span,
    },

    /// A character-class range runs backwards
    #[error("In the '{rule}' rule, inside the character class '[{class_text}]', the first character is 'greater' than the second in a range '{range}'")]
    InvertedClassRange {
        rule: String,
        class_text: String,
        range: String,
        span: Span,
    },

    /// A character-class member falls inside one of its own ranges
    #[error("In the '{rule}' rule, inside the character class '[{class_text}]', the character '{ch}' intersects with the range '{range}'")]
    ClassCharacterInRange {
        rule: String,
        class_text: String,
        ch: String,
        range: String,
        span: Span,
    },

    /// An action references `$k` beyond the sequence length
    #[error("'${index}', the index exceeds the number of expressions")]
    PositionVarOutOfRange { index: usize, span: Span },
}

fn unused_listing(rules: &[(String, Span)]) -> String {
    rules
        .iter()
        .map(|(name, _)| format!("Rule '{}' defined but not used", name))
        .collect::<Vec<_>>()
        .join("\n")
}

impl AnalysisError {
    /// Returns the source position of the error, when it has a single one.
    pub fn span(&self) -> Option<Span> {
        match self {
            AnalysisError::NoRules | AnalysisError::UnusedRules { .. } => None,
            AnalysisError::DuplicateRule { span, .. }
            | AnalysisError::DuplicateDirective { span, .. }
            | AnalysisError::UnknownRootRule { span, .. }
            | AnalysisError::UnknownRuleReference { span, .. }
            | AnalysisError::LeftRecursiveSingleSequence { span, .. }
            | AnalysisError::CapturesWithoutAction { span, .. }
            | AnalysisError::ReturnTypeWithoutAction { span, .. }
            | AnalysisError::ReturnTypeWithoutResult { span, .. }
            | AnalysisError::DuplicateCapture { span, .. }
            | AnalysisError::CapturesInRepeatedGroup { span, .. }
            | AnalysisError::NegativeLookaheadCapture { span, .. }
            | AnalysisError::LookaheadStringCapture { span, .. }
            | AnalysisError::PlainStringCapture { span, .. }
            | AnalysisError::MixedResultTypes { span, .. }
            | AnalysisError::DuplicateClassCharacter { span, .. }
            | AnalysisError::DegenerateClassRange { span, .. }
            | AnalysisError::InvertedClassRange { span, .. }
            | AnalysisError::ClassCharacterInRange { span, .. }
            | AnalysisError::PositionVarOutOfRange { span, .. } => Some(*span),
        }
    }
}

impl ToDiagnostics for AnalysisError {
    fn to_diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            AnalysisError::UnusedRules { rules } => rules
                .iter()
                .map(|(name, span)| {
                    Diagnostic::at(*span, format!("Rule '{}' defined but not used", name))
                })
                .collect(),
            other => match other.span() {
                Some(span) => vec![Diagnostic::at(span, other.to_string())],
                None => vec![Diagnostic::new(other.to_string())],
            },
        }
    }
}

/// Result type alias for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;
