//! Token definitions and the lexical pattern table.

use once_cell::sync::Lazy;
use pegc_util::Span;
use regex::Regex;

/// The kind of a grammar token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// `# ...` to end of line; matched and discarded
    Comment,
    /// Rule or directive name
    Identifier,
    /// `=`
    Equal,
    /// `|`
    Pipe,
    /// `&`
    Ampersand,
    /// `!`
    Bang,
    /// `*`
    Star,
    /// `+`
    Plus,
    /// `?`
    Question,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `%`
    Percent,
    /// `:`
    Colon,
    /// `"..."` string literal, delimiters included
    Str,
    /// `[...]` character-class literal, delimiters included
    CharClass,
    /// `.`
    Dot,
    /// `~`
    Tilde,
    /// `%cpp { ... }` / `%hpp { ... }` body, braces stripped
    CodeSection,
    /// `{ ... }` semantic action, braces included
    Action,
    /// `< ... >` rule return type, angle brackets included
    RuleType,
}

/// A single token with its source text and position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    /// Token kind.
    pub kind: TokenKind,

    /// The matched text. For [`TokenKind::CodeSection`] this is the block
    /// interior; for [`TokenKind::Action`] and [`TokenKind::RuleType`] the
    /// delimiters are kept.
    pub lexeme: String,

    /// Source position of the token's first character.
    pub span: Span,
}

/// Lexical token patterns in match priority order.
///
/// Every pattern is anchored; the tokenizer applies them to the remaining
/// source slice and the first kind that matches wins. The special kinds
/// (code section, action, rule type) are produced by bracket-balanced
/// scans instead and do not appear here.
pub(crate) static LEXICAL_PATTERNS: Lazy<Vec<(TokenKind, Regex)>> = Lazy::new(|| {
    const TABLE: &[(TokenKind, &str)] = &[
        (TokenKind::Comment, r"^#.*"),
        (TokenKind::Identifier, r"^[\p{Alphabetic}_]\w*"),
        (TokenKind::Equal, r"^="),
        (TokenKind::Pipe, r"^\|"),
        (TokenKind::Ampersand, r"^&"),
        (TokenKind::Bang, r"^!"),
        (TokenKind::Star, r"^\*"),
        (TokenKind::Plus, r"^\+"),
        (TokenKind::Question, r"^\?"),
        (TokenKind::LParen, r"^\("),
        (TokenKind::RParen, r"^\)"),
        (TokenKind::LBrace, r"^\{"),
        (TokenKind::RBrace, r"^\}"),
        (TokenKind::Percent, r"^%"),
        (TokenKind::Colon, r"^:"),
        (TokenKind::Str, r#"^"(?:[^"\\\n]|\\[^\n])+""#),
        (TokenKind::CharClass, r"^\[(?:[^\]\\\n]|\\[^\n])+\]"),
        (TokenKind::Dot, r"^\."),
        (TokenKind::Tilde, r"^~"),
    ];

    TABLE
        .iter()
        .map(|&(kind, pattern)| {
            // The table is static; a malformed pattern is a programming
            // error caught by the tests below.
            (kind, Regex::new(pattern).unwrap())
        })
        .collect()
});
