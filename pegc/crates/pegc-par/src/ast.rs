//! Grammar AST node definitions.
//!
//! Every node is created during parsing and carries the source position of
//! its introducing token. The only later mutation is the
//! `is_left_recursive` flag on [`Rule`], set once by the left-recursion
//! analyzer; static analysis and code generation are read-only walks.

use std::collections::BTreeSet;

use pegc_util::Span;

/// AST root: the ordered list of top-level statements of a grammar file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Grammar {
    pub statements: Vec<Statement>,
}

impl Grammar {
    /// Iterates over the rule statements in definition order.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.statements.iter().filter_map(|s| match s {
            Statement::Rule(rule) => Some(rule),
            _ => None,
        })
    }

    /// Mutable variant of [`Grammar::rules`].
    pub fn rules_mut(&mut self) -> impl Iterator<Item = &mut Rule> {
        self.statements.iter_mut().filter_map(|s| match s {
            Statement::Rule(rule) => Some(rule),
            _ => None,
        })
    }

    /// Looks up a rule by name.
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules().find(|r| r.name == name)
    }

    /// Returns the `%name` directive, if present.
    pub fn name_directive(&self) -> Option<&NameDirective> {
        self.statements.iter().find_map(|s| match s {
            Statement::Name(n) => Some(n),
            _ => None,
        })
    }

    /// Returns the `%hpp` block, if present.
    pub fn header_block(&self) -> Option<&HeaderBlock> {
        self.statements.iter().find_map(|s| match s {
            Statement::Header(h) => Some(h),
            _ => None,
        })
    }

    /// Returns the `%cpp` block, if present.
    pub fn code_block(&self) -> Option<&CodeBlock> {
        self.statements.iter().find_map(|s| match s {
            Statement::Code(c) => Some(c),
            _ => None,
        })
    }

    /// Returns the `%type` directive, if present.
    pub fn rule_type_directive(&self) -> Option<&RuleTypeDirective> {
        self.statements.iter().find_map(|s| match s {
            Statement::RuleType(t) => Some(t),
            _ => None,
        })
    }

    /// Returns the `%root` directive, if present.
    pub fn root_rule_directive(&self) -> Option<&RootRuleDirective> {
        self.statements.iter().find_map(|s| match s {
            Statement::RootRule(r) => Some(r),
            _ => None,
        })
    }

    /// The entry-point rule: the `%root` target, or the first defined rule.
    pub fn root_rule_name(&self) -> Option<&str> {
        match self.root_rule_directive() {
            Some(root) => Some(&root.name),
            None => self.rules().next().map(|r| r.name.as_str()),
        }
    }
}

/// A top-level statement.
#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    /// `%name IDENT` - parser name and output file stem
    Name(NameDirective),
    /// `%hpp {...}` - verbatim text for the interface file
    Header(HeaderBlock),
    /// `%cpp {...}` - verbatim text for the implementation file
    Code(CodeBlock),
    /// `%type "T"` - default semantic result type
    RuleType(RuleTypeDirective),
    /// `%root IDENT` - entry-point rule
    RootRule(RootRuleDirective),
    /// A named parsing rule
    Rule(Rule),
}

/// `%name` directive.
#[derive(Clone, Debug, PartialEq)]
pub struct NameDirective {
    pub name: String,
    pub span: Span,
}

/// `%hpp` block.
#[derive(Clone, Debug, PartialEq)]
pub struct HeaderBlock {
    pub body: String,
    pub span: Span,
}

/// `%cpp` block.
#[derive(Clone, Debug, PartialEq)]
pub struct CodeBlock {
    pub body: String,
    pub span: Span,
}

/// `%type` directive.
#[derive(Clone, Debug, PartialEq)]
pub struct RuleTypeDirective {
    pub type_name: String,
    pub span: Span,
}

/// `%root` directive.
#[derive(Clone, Debug, PartialEq)]
pub struct RootRuleDirective {
    pub name: String,
    pub span: Span,
}

/// A named rule: an ordered alternation of sequences.
#[derive(Clone, Debug, PartialEq)]
pub struct Rule {
    /// Rule name.
    pub name: String,

    /// Alternative sequences, in priority order.
    pub sequences: Vec<Sequence>,

    /// Declared semantic return type (from `<...>`), trimmed.
    pub return_type: Option<String>,

    /// Set by the left-recursion analyzer; false until then.
    pub is_left_recursive: bool,

    pub span: Span,
}

/// One alternative: an ordered list of items plus optional actions.
#[derive(Clone, Debug, PartialEq)]
pub struct Sequence {
    /// The items to match, in order.
    pub items: Vec<Item>,

    /// Verbatim semantic action, braces included.
    pub action: Option<String>,

    /// Verbatim error action, braces included.
    pub error_action: Option<String>,

    /// Positional variable indices `$k` referenced by the action (k >= 1).
    pub position_vars: BTreeSet<usize>,

    pub span: Span,
}

impl Sequence {
    /// Returns true when the action assigns the rule result variable `$$`,
    /// which makes this alternative value-carrying instead of boolean.
    pub fn returns_value(&self) -> bool {
        self.action.as_deref().is_some_and(|a| a.contains("$$"))
    }
}

/// A single parsing item with its context modifiers.
#[derive(Clone, Debug, PartialEq)]
pub struct Item {
    pub kind: ItemKind,
    pub ctx: ItemContext,
    pub span: Span,
}

/// What an item matches.
#[derive(Clone, Debug, PartialEq)]
pub enum ItemKind {
    /// Reference to another rule by name
    RuleRef(String),
    /// String literal, unescaped
    Literal(String),
    /// Character-class literal, unescaped (characters and `a-b` ranges)
    CharClass(String),
    /// Parenthesized inner alternation
    Group(Vec<Sequence>),
    /// `.` - any single code point
    Any,
}

/// Lookahead polarity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lookahead {
    /// `&atom` - must match, consumes nothing
    Positive,
    /// `!atom` - must not match, consumes nothing
    Negative,
}

/// Repetition flavor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Repeat {
    /// `atom*`
    ZeroOrMore,
    /// `atom+`
    OneOrMore,
}

/// Context modifiers of an item.
///
/// At most one of `lookahead`, `repeat`, `optional` is set; the parser
/// cannot produce any other combination.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ItemContext {
    /// Capture name (`name:item`).
    pub name: Option<String>,

    /// `&`/`!` lookahead.
    pub lookahead: Option<Lookahead>,

    /// `*`/`+` repetition.
    pub repeat: Option<Repeat>,

    /// `?` optionality.
    pub optional: bool,
}
