//! pegc-par - Parser for the pegc grammar DSL.
//!
//! A backtracking recursive-descent parser over the token list produced by
//! pegc-lex. The single control primitive is the scoped save-point
//! [`Parser::attempt`]: it records the token position, runs a production,
//! and on soft failure restores the position and reports `None` so the
//! next alternative can be tried. Soft failure ([`ParseFail`]) is a
//! two-state result, distinct from the fatal [`SyntaxError`] raised when
//! input remains after the statement loop.
//!
//! DSL productions, at this parser's altitude:
//!
//! ```text
//! root       := statement*
//! statement  := name | header | code | ruleType | rootRule | rule
//! rule       := IDENT RULE_TYPE? '=' expr+
//! expr       := seq action? errAction? | '|' seq
//! seq        := namedItem+
//! namedItem  := IDENT ':' item | item
//! item       := atom ('+'|'*'|'?') | atom | '&' atom | '!' atom
//! atom       := IDENT !'=' !RULE_TYPE | STRING | '(' expr+ ')' | CHAR_CLASS | '.'
//! ```

pub mod ast;

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use pegc_lex::{Token, TokenKind};
use pegc_util::escape::{unescape_char_class, unescape_string};
use pegc_util::{Diagnostic, Span, ToDiagnostics};
use regex::Regex;
use thiserror::Error;

use ast::{
    CodeBlock, Grammar, HeaderBlock, Item, ItemKind, Lookahead, NameDirective, Repeat,
    RootRuleDirective, Rule, RuleTypeDirective, Sequence, Statement,
};

/// Fatal syntax error: tokens remained after the last parsable statement.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{message}, token: \"{lexeme}\"")]
pub struct SyntaxError {
    pub message: String,
    pub lexeme: String,
    pub span: Span,
}

impl ToDiagnostics for SyntaxError {
    fn to_diagnostics(&self) -> Vec<Diagnostic> {
        vec![Diagnostic::at(self.span, self.to_string())]
    }
}

/// Soft parse failure; swallowed by [`Parser::attempt`].
struct ParseFail;

/// Two-state production result: success or backtrack.
type Attempt<T> = Result<T, ParseFail>;

/// Positional variables referenced by an action: `$1`, `$2`, ...
static POSITION_VAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$([1-9][0-9]*)").unwrap());

/// Recursive-descent parser over the grammar token list.
pub struct Parser<'a> {
    /// Token stream from the tokenizer.
    tokens: &'a [Token],

    /// Current position in the token stream.
    pos: usize,
}

impl<'a> Parser<'a> {
    /// Creates a parser over `tokens`.
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parses the token list into a grammar AST.
    ///
    /// Statements are consumed greedily; any leftover token is a fatal
    /// syntax error positioned at the first unconsumed token.
    pub fn parse(&mut self) -> Result<Grammar, SyntaxError> {
        let mut statements = Vec::new();
        while let Some(statement) = self.attempt(|p| p.statement()) {
            statements.push(statement);
        }

        if self.pos != self.tokens.len() {
            let token = &self.tokens[self.pos];
            return Err(SyntaxError {
                message: "parsing fail".to_string(),
                lexeme: token.lexeme.clone(),
                span: token.span,
            });
        }

        Ok(Grammar { statements })
    }

    // ------------------------------------------------------------------
    // save-point primitive and token helpers
    // ------------------------------------------------------------------

    /// Runs `f` under a save-point: on soft failure the token position is
    /// restored and `None` is returned.
    fn attempt<T>(&mut self, f: impl FnOnce(&mut Self) -> Attempt<T>) -> Option<T> {
        let mark = self.pos;
        match f(self) {
            Ok(value) => Some(value),
            Err(ParseFail) => {
                self.pos = mark;
                None
            }
        }
    }

    /// Consumes the current token if it has the given kind.
    fn match_token(&mut self, kind: TokenKind) -> Attempt<&'a Token> {
        match self.tokens.get(self.pos) {
            Some(token) if token.kind == kind => {
                self.pos += 1;
                Ok(token)
            }
            _ => Err(ParseFail),
        }
    }

    /// Consumes the current token if it has the given kind, without failing.
    fn optional_token(&mut self, kind: TokenKind) -> Option<&'a Token> {
        match self.tokens.get(self.pos) {
            Some(token) if token.kind == kind => {
                self.pos += 1;
                Some(token)
            }
            _ => None,
        }
    }

    /// Negative single-token lookahead: fails if the current token has the
    /// given kind. Consumes nothing.
    fn not_followed_by(&self, kind: TokenKind) -> Attempt<()> {
        match self.tokens.get(self.pos) {
            Some(token) if token.kind == kind => Err(ParseFail),
            _ => Ok(()),
        }
    }

    /// Applies `f` as often as it succeeds; fails unless it succeeded at
    /// least once.
    fn repeat1<T>(&mut self, mut f: impl FnMut(&mut Self) -> Attempt<T>) -> Attempt<Vec<T>> {
        let mut nodes = Vec::new();
        while let Some(node) = self.attempt(&mut f) {
            nodes.push(node);
        }
        if nodes.is_empty() {
            Err(ParseFail)
        } else {
            Ok(nodes)
        }
    }

    // ------------------------------------------------------------------
    // productions
    // ------------------------------------------------------------------

    fn statement(&mut self) -> Attempt<Statement> {
        if let Some(n) = self.attempt(|p| p.name_statement()) {
            return Ok(Statement::Name(n));
        }
        if let Some(h) = self.attempt(|p| p.header_statement()) {
            return Ok(Statement::Header(h));
        }
        if let Some(c) = self.attempt(|p| p.code_statement()) {
            return Ok(Statement::Code(c));
        }
        if let Some(t) = self.attempt(|p| p.rule_type_statement()) {
            return Ok(Statement::RuleType(t));
        }
        if let Some(r) = self.attempt(|p| p.root_rule_statement()) {
            return Ok(Statement::RootRule(r));
        }
        if let Some(r) = self.attempt(|p| p.rule_statement()) {
            return Ok(Statement::Rule(r));
        }
        Err(ParseFail)
    }

    fn directive_keyword(&mut self, keyword: &str) -> Attempt<&'a Token> {
        self.match_token(TokenKind::Percent)?;
        let ident = self.match_token(TokenKind::Identifier)?;
        if ident.lexeme == keyword {
            Ok(ident)
        } else {
            Err(ParseFail)
        }
    }

    fn name_statement(&mut self) -> Attempt<NameDirective> {
        self.directive_keyword("name")?;
        let ident = self.match_token(TokenKind::Identifier)?;
        Ok(NameDirective {
            name: ident.lexeme.clone(),
            span: ident.span,
        })
    }

    fn header_statement(&mut self) -> Attempt<HeaderBlock> {
        self.directive_keyword("hpp")?;
        let section = self.match_token(TokenKind::CodeSection)?;
        Ok(HeaderBlock {
            body: section.lexeme.clone(),
            span: section.span,
        })
    }

    fn code_statement(&mut self) -> Attempt<CodeBlock> {
        self.directive_keyword("cpp")?;
        let section = self.match_token(TokenKind::CodeSection)?;
        Ok(CodeBlock {
            body: section.lexeme.clone(),
            span: section.span,
        })
    }

    fn rule_type_statement(&mut self) -> Attempt<RuleTypeDirective> {
        self.directive_keyword("type")?;
        let string = self.match_token(TokenKind::Str)?;
        Ok(RuleTypeDirective {
            type_name: strip_delimiters(&string.lexeme).to_string(),
            span: string.span,
        })
    }

    fn root_rule_statement(&mut self) -> Attempt<RootRuleDirective> {
        self.directive_keyword("root")?;
        let ident = self.match_token(TokenKind::Identifier)?;
        Ok(RootRuleDirective {
            name: ident.lexeme.clone(),
            span: ident.span,
        })
    }

    fn rule_statement(&mut self) -> Attempt<Rule> {
        let name = self.match_token(TokenKind::Identifier)?;
        let return_type = self
            .optional_token(TokenKind::RuleType)
            .map(|t| strip_delimiters(&t.lexeme).trim().to_string());
        self.match_token(TokenKind::Equal)?;
        let sequences = self.repeat1(|p| p.sequence())?;
        Ok(Rule {
            name: name.lexeme.clone(),
            sequences,
            return_type,
            is_left_recursive: false,
            span: name.span,
        })
    }

    /// One alternative: its items, an optional action, an optional `~`
    /// error action.
    fn sequence(&mut self) -> Attempt<Sequence> {
        let items = self.alternative_items()?;
        let action = self
            .optional_token(TokenKind::Action)
            .map(|t| t.lexeme.clone());
        let error_action = self.attempt(|p| {
            p.match_token(TokenKind::Tilde)?;
            Ok(p.match_token(TokenKind::Action)?.lexeme.clone())
        });

        let position_vars = action
            .as_deref()
            .map(position_vars_in)
            .unwrap_or_default();

        let span = items[0].span;
        Ok(Sequence {
            items,
            action,
            error_action,
            position_vars,
            span,
        })
    }

    /// The item list of one alternative; alternatives after the first are
    /// introduced by `|`.
    fn alternative_items(&mut self) -> Attempt<Vec<Item>> {
        if let Some(items) = self.attempt(|p| p.repeat1(|p| p.named_item())) {
            return Ok(items);
        }
        self.match_token(TokenKind::Pipe)?;
        self.repeat1(|p| p.named_item())
    }

    fn named_item(&mut self) -> Attempt<Item> {
        if let Some(item) = self.attempt(|p| {
            let ident = p.match_token(TokenKind::Identifier)?;
            p.match_token(TokenKind::Colon)?;
            let mut item = p.item()?;
            item.ctx.name = Some(ident.lexeme.clone());
            Ok(item)
        }) {
            return Ok(item);
        }
        self.item()
    }

    fn item(&mut self) -> Attempt<Item> {
        if let Some(mut item) = self.attempt(|p| {
            let atom = p.atom()?;
            p.match_token(TokenKind::Plus)?;
            Ok(atom)
        }) {
            item.ctx.repeat = Some(Repeat::OneOrMore);
            return Ok(item);
        }
        if let Some(mut item) = self.attempt(|p| {
            let atom = p.atom()?;
            p.match_token(TokenKind::Star)?;
            Ok(atom)
        }) {
            item.ctx.repeat = Some(Repeat::ZeroOrMore);
            return Ok(item);
        }
        if let Some(mut item) = self.attempt(|p| {
            let atom = p.atom()?;
            p.match_token(TokenKind::Question)?;
            Ok(atom)
        }) {
            item.ctx.optional = true;
            return Ok(item);
        }
        if let Some(item) = self.attempt(|p| p.atom()) {
            return Ok(item);
        }
        if let Some(mut item) = self.attempt(|p| {
            p.match_token(TokenKind::Ampersand)?;
            p.atom()
        }) {
            item.ctx.lookahead = Some(Lookahead::Positive);
            return Ok(item);
        }
        if let Some(mut item) = self.attempt(|p| {
            p.match_token(TokenKind::Bang)?;
            p.atom()
        }) {
            item.ctx.lookahead = Some(Lookahead::Negative);
            return Ok(item);
        }
        Err(ParseFail)
    }

    fn atom(&mut self) -> Attempt<Item> {
        // rule reference: an identifier that does not begin the next rule,
        // checked with a two-token negative lookahead
        if let Some(item) = self.attempt(|p| {
            let ident = p.match_token(TokenKind::Identifier)?;
            p.not_followed_by(TokenKind::Equal)?;
            p.not_followed_by(TokenKind::RuleType)?;
            Ok(Item {
                kind: ItemKind::RuleRef(ident.lexeme.clone()),
                ctx: Default::default(),
                span: ident.span,
            })
        }) {
            return Ok(item);
        }
        if let Some(item) = self.attempt(|p| {
            let token = p.match_token(TokenKind::Str)?;
            Ok(Item {
                kind: ItemKind::Literal(unescape_string(strip_delimiters(&token.lexeme))),
                ctx: Default::default(),
                span: token.span,
            })
        }) {
            return Ok(item);
        }
        if let Some(item) = self.attempt(|p| {
            let lpar = p.match_token(TokenKind::LParen)?;
            let alternatives = p.repeat1(|p| p.alternative_items())?;
            p.match_token(TokenKind::RParen)?;
            let sequences = alternatives
                .into_iter()
                .map(|items| Sequence {
                    items,
                    action: None,
                    error_action: None,
                    position_vars: BTreeSet::new(),
                    span: lpar.span,
                })
                .collect();
            Ok(Item {
                kind: ItemKind::Group(sequences),
                ctx: Default::default(),
                span: lpar.span,
            })
        }) {
            return Ok(item);
        }
        if let Some(item) = self.attempt(|p| {
            let token = p.match_token(TokenKind::CharClass)?;
            Ok(Item {
                kind: ItemKind::CharClass(unescape_char_class(strip_delimiters(&token.lexeme))),
                ctx: Default::default(),
                span: token.span,
            })
        }) {
            return Ok(item);
        }
        if let Some(item) = self.attempt(|p| {
            let dot = p.match_token(TokenKind::Dot)?;
            Ok(Item {
                kind: ItemKind::Any,
                ctx: Default::default(),
                span: dot.span,
            })
        }) {
            return Ok(item);
        }
        Err(ParseFail)
    }
}

/// Drops the first and last character of a delimited lexeme.
fn strip_delimiters(lexeme: &str) -> &str {
    let mut chars = lexeme.chars();
    chars.next();
    chars.next_back();
    chars.as_str()
}

/// Extracts the `$k` indices referenced by an action body.
fn position_vars_in(action: &str) -> BTreeSet<usize> {
    POSITION_VAR
        .captures_iter(action)
        .filter_map(|c| c[1].parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pegc_lex::Tokenizer;

    fn parse(source: &str) -> Grammar {
        let mut tokenizer = Tokenizer::new(source);
        let tokens = tokenizer.tokenize().expect("tokenize");
        Parser::new(tokens).parse().expect("parse")
    }

    fn first_rule(grammar: &Grammar) -> &Rule {
        grammar.rules().next().expect("a rule")
    }

    #[test]
    fn test_directives() {
        let grammar = parse(
            "%name calc\n%type \"int\"\n%root s\n%hpp { #include <x> }\n%cpp { int n; }\ns = \"a\"",
        );
        assert_eq!(grammar.name_directive().unwrap().name, "calc");
        assert_eq!(grammar.rule_type_directive().unwrap().type_name, "int");
        assert_eq!(grammar.root_rule_directive().unwrap().name, "s");
        assert_eq!(grammar.header_block().unwrap().body, " #include <x> ");
        assert_eq!(grammar.code_block().unwrap().body, " int n; ");
    }

    #[test]
    fn test_rule_with_alternatives() {
        let grammar = parse("s = \"a\" \"b\" | \"c\"");
        let rule = first_rule(&grammar);
        assert_eq!(rule.sequences.len(), 2);
        assert_eq!(rule.sequences[0].items.len(), 2);
        assert_eq!(rule.sequences[1].items.len(), 1);
    }

    #[test]
    fn test_rule_reference_does_not_steal_next_rule() {
        let grammar = parse("a = b\nb = \"x\"");
        let rules: Vec<_> = grammar.rules().collect();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].sequences[0].items.len(), 1);
        assert_eq!(
            rules[0].sequences[0].items[0].kind,
            ItemKind::RuleRef("b".to_string())
        );
    }

    #[test]
    fn test_typed_rule_not_stolen() {
        // `b` is followed by a RULE_TYPE token, so it starts the next rule
        let grammar = parse("a = x b<int> = \"y\" { $$ = 1; }\nx = \"x\"");
        let rules: Vec<_> = grammar.rules().collect();
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[1].name, "b");
        assert_eq!(rules[1].return_type.as_deref(), Some("int"));
    }

    #[test]
    fn test_modifiers() {
        let grammar = parse("s = a+ b* c? &d !e f");
        let items = &first_rule(&grammar).sequences[0].items;
        assert_eq!(items[0].ctx.repeat, Some(Repeat::OneOrMore));
        assert_eq!(items[1].ctx.repeat, Some(Repeat::ZeroOrMore));
        assert!(items[2].ctx.optional);
        assert_eq!(items[3].ctx.lookahead, Some(Lookahead::Positive));
        assert_eq!(items[4].ctx.lookahead, Some(Lookahead::Negative));
        assert_eq!(items[5].ctx, Default::default());
    }

    #[test]
    fn test_named_items() {
        let grammar = parse("s = x:a y:\"lit\"? { $$ = x; }");
        let items = &first_rule(&grammar).sequences[0].items;
        assert_eq!(items[0].ctx.name.as_deref(), Some("x"));
        assert_eq!(items[1].ctx.name.as_deref(), Some("y"));
        assert!(items[1].ctx.optional);
    }

    #[test]
    fn test_string_unescaping() {
        let grammar = parse(r#"s = "a\nb\\c""#);
        let items = &first_rule(&grammar).sequences[0].items;
        assert_eq!(items[0].kind, ItemKind::Literal("a\nb\\c".to_string()));
    }

    #[test]
    fn test_char_class_unescaping() {
        let grammar = parse(r"s = [a-z\]\n]");
        let items = &first_rule(&grammar).sequences[0].items;
        assert_eq!(items[0].kind, ItemKind::CharClass("a-z]\n".to_string()));
    }

    #[test]
    fn test_group() {
        let grammar = parse("s = (a b | c)* \"x\"");
        let items = &first_rule(&grammar).sequences[0].items;
        match &items[0].kind {
            ItemKind::Group(sequences) => {
                assert_eq!(sequences.len(), 2);
                assert_eq!(sequences[0].items.len(), 2);
                assert_eq!(sequences[1].items.len(), 1);
            }
            other => panic!("expected group, got {other:?}"),
        }
        assert_eq!(items[0].ctx.repeat, Some(Repeat::ZeroOrMore));
    }

    #[test]
    fn test_actions_and_error_action() {
        let grammar = parse("s = a { $$ = 1; } ~ { std::cerr << \"boom\"; }");
        let seq = &first_rule(&grammar).sequences[0];
        assert_eq!(seq.action.as_deref(), Some("{ $$ = 1; }"));
        assert_eq!(
            seq.error_action.as_deref(),
            Some("{ std::cerr << \"boom\"; }")
        );
    }

    #[test]
    fn test_position_vars_extracted() {
        let grammar = parse("s = a b { $$ = $1; use($2, $12); }");
        let seq = &first_rule(&grammar).sequences[0];
        assert_eq!(
            seq.position_vars.iter().copied().collect::<Vec<_>>(),
            vec![1, 2, 12]
        );
    }

    #[test]
    fn test_rule_type_trimmed() {
        let grammar = parse("s< int > = a { $$ = 1; }");
        assert_eq!(first_rule(&grammar).return_type.as_deref(), Some("int"));
    }

    #[test]
    fn test_parse_deterministic() {
        let source = "%root s\ns = x:a+ { $$ = x.size(); } | !b .\na = \"a\"\nb = [xy]";
        let mut tokenizer = Tokenizer::new(source);
        let tokens = tokenizer.tokenize().unwrap().to_vec();
        let first = Parser::new(&tokens).parse().unwrap();
        let second = Parser::new(&tokens).parse().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_leftover_tokens_fail() {
        let mut tokenizer = Tokenizer::new("s = \"a\"\n= broken");
        let tokens = tokenizer.tokenize().unwrap();
        let err = Parser::new(tokens).parse().unwrap_err();
        assert_eq!(err.message, "parsing fail");
        assert_eq!(err.lexeme, "=");
        assert_eq!(err.span.line, 2);
    }

    #[test]
    fn test_empty_input_is_empty_grammar() {
        let grammar = parse("");
        assert!(grammar.statements.is_empty());
    }
}
