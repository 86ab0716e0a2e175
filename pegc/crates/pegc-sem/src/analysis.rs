//! Static analysis of the grammar AST.
//!
//! Fourteen semantic checks run in a fixed order; the first violation
//! aborts analysis with a positioned [`AnalysisError`]. The order matters:
//! unused-rule detection runs before left-recursion marking (marking
//! assumes every reachable reference resolves), and marking runs before
//! the check that a left-recursive rule has an alternative to terminate
//! on.

use pegc_util::escape::escape;
use pegc_util::Span;
use rustc_hash::FxHashSet;

use pegc_par::ast::{Grammar, Item, ItemKind, Lookahead, Sequence, Statement};

use crate::error::{AnalysisError, Result};
use crate::left_recursion::mark_left_recursion;

/// Runs the full battery of semantic checks, marking left recursion along
/// the way.
pub fn analyze(grammar: &mut Grammar) -> Result<()> {
    check_rules_present(grammar)?;
    check_duplicate_rules(grammar)?;
    check_duplicate_directives(grammar)?;
    check_root_rule(grammar)?;
    check_rule_references(grammar)?;
    check_unused_rules(grammar)?;
    mark_left_recursion(grammar); // only after unused rules are rejected
    check_left_recursive_shapes(grammar)?;
    check_action_presence(grammar)?;
    check_duplicate_captures(grammar)?;
    check_repeated_group_captures(grammar)?;
    check_negative_lookahead_captures(grammar)?;
    check_string_captures(grammar)?;
    check_result_types(grammar)?;
    check_character_classes(grammar)?;
    check_position_vars(grammar)?;
    Ok(())
}

// ----------------------------------------------------------------------
// walkers
// ----------------------------------------------------------------------

/// Applies `f` to every item of the sequences, recursing into groups.
fn walk_items<'a>(
    sequences: &'a [Sequence],
    f: &mut impl FnMut(&'a Item) -> Result<()>,
) -> Result<()> {
    for sequence in sequences {
        for item in &sequence.items {
            f(item)?;
            if let ItemKind::Group(inner) = &item.kind {
                walk_items(inner, f)?;
            }
        }
    }
    Ok(())
}

/// Collects capture names declared inside a group, recursively. A nested
/// group contributes its inner captures, not its own name.
fn group_captures<'a>(sequences: &'a [Sequence], out: &mut Vec<&'a str>) {
    for sequence in sequences {
        for item in &sequence.items {
            if let ItemKind::Group(inner) = &item.kind {
                group_captures(inner, out);
            } else if let Some(name) = &item.ctx.name {
                out.push(name);
            }
        }
    }
}

// ----------------------------------------------------------------------
// checks, in battery order
// ----------------------------------------------------------------------

fn check_rules_present(grammar: &Grammar) -> Result<()> {
    if grammar.rules().next().is_none() {
        return Err(AnalysisError::NoRules);
    }
    Ok(())
}

fn check_duplicate_rules(grammar: &Grammar) -> Result<()> {
    let mut seen = FxHashSet::default();
    for rule in grammar.rules() {
        if !seen.insert(rule.name.as_str()) {
            return Err(AnalysisError::DuplicateRule {
                name: rule.name.clone(),
                span: rule.span,
            });
        }
    }
    Ok(())
}

fn check_duplicate_directives(grammar: &Grammar) -> Result<()> {
    let directives: [(&'static str, Vec<Span>); 5] = [
        ("name", directive_spans(grammar, |s| matches!(s, Statement::Name(_)))),
        ("hpp", directive_spans(grammar, |s| matches!(s, Statement::Header(_)))),
        ("cpp", directive_spans(grammar, |s| matches!(s, Statement::Code(_)))),
        ("type", directive_spans(grammar, |s| matches!(s, Statement::RuleType(_)))),
        ("root", directive_spans(grammar, |s| matches!(s, Statement::RootRule(_)))),
    ];
    for (directive, spans) in directives {
        if spans.len() > 1 {
            return Err(AnalysisError::DuplicateDirective {
                directive,
                span: spans[1],
            });
        }
    }
    Ok(())
}

fn directive_spans(grammar: &Grammar, pred: impl Fn(&Statement) -> bool) -> Vec<Span> {
    grammar
        .statements
        .iter()
        .filter(|s| pred(s))
        .map(statement_span)
        .collect()
}

fn statement_span(statement: &Statement) -> Span {
    match statement {
        Statement::Name(n) => n.span,
        Statement::Header(h) => h.span,
        Statement::Code(c) => c.span,
        Statement::RuleType(t) => t.span,
        Statement::RootRule(r) => r.span,
        Statement::Rule(r) => r.span,
    }
}

fn check_root_rule(grammar: &Grammar) -> Result<()> {
    if let Some(root) = grammar.root_rule_directive() {
        if grammar.rule(&root.name).is_none() {
            return Err(AnalysisError::UnknownRootRule {
                name: root.name.clone(),
                span: root.span,
            });
        }
    }
    Ok(())
}

fn check_rule_references(grammar: &Grammar) -> Result<()> {
    let names: FxHashSet<&str> = grammar.rules().map(|r| r.name.as_str()).collect();
    for rule in grammar.rules() {
        walk_items(&rule.sequences, &mut |item| {
            if let ItemKind::RuleRef(name) = &item.kind {
                if !names.contains(name.as_str()) {
                    return Err(AnalysisError::UnknownRuleReference {
                        rule: rule.name.clone(),
                        name: name.clone(),
                        span: item.span,
                    });
                }
            }
            Ok(())
        })?;
    }
    Ok(())
}

fn check_unused_rules(grammar: &Grammar) -> Result<()> {
    // check_rules_present guarantees a root exists
    let Some(root) = grammar.root_rule_name() else {
        return Ok(());
    };

    let mut used = FxHashSet::default();
    let mut pending = vec![root.to_string()];
    while let Some(name) = pending.pop() {
        if !used.insert(name.clone()) {
            continue;
        }
        if let Some(rule) = grammar.rule(&name) {
            // references exist by now; collect them, groups included
            walk_items(&rule.sequences, &mut |item| {
                if let ItemKind::RuleRef(target) = &item.kind {
                    if !used.contains(target) {
                        pending.push(target.clone());
                    }
                }
                Ok(())
            })?;
        }
    }

    let unused: Vec<(String, Span)> = grammar
        .rules()
        .filter(|r| !used.contains(&r.name))
        .map(|r| (r.name.clone(), r.span))
        .collect();
    if !unused.is_empty() {
        return Err(AnalysisError::UnusedRules { rules: unused });
    }
    Ok(())
}

fn check_left_recursive_shapes(grammar: &Grammar) -> Result<()> {
    for rule in grammar.rules() {
        if rule.is_left_recursive && rule.sequences.len() == 1 {
            return Err(AnalysisError::LeftRecursiveSingleSequence {
                name: rule.name.clone(),
                span: rule.span,
            });
        }
    }
    Ok(())
}

fn check_action_presence(grammar: &Grammar) -> Result<()> {
    for rule in grammar.rules() {
        let has_return_type = rule.return_type.is_some();
        for sequence in &rule.sequences {
            let has_captures = sequence.items.iter().any(|item| {
                if let ItemKind::Group(inner) = &item.kind {
                    let mut vars = Vec::new();
                    group_captures(inner, &mut vars);
                    if !vars.is_empty() {
                        return true;
                    }
                }
                item.ctx.name.is_some()
            });

            if has_captures && sequence.action.is_none() {
                return Err(AnalysisError::CapturesWithoutAction {
                    rule: rule.name.clone(),
                    span: sequence.span,
                });
            }
            if has_return_type {
                match &sequence.action {
                    None => {
                        return Err(AnalysisError::ReturnTypeWithoutAction {
                            rule: rule.name.clone(),
                            span: sequence.span,
                        });
                    }
                    Some(action) if !action.contains("$$") => {
                        return Err(AnalysisError::ReturnTypeWithoutResult {
                            rule: rule.name.clone(),
                            span: sequence.span,
                        });
                    }
                    _ => {}
                }
            }
        }
    }
    Ok(())
}

fn check_duplicate_captures(grammar: &Grammar) -> Result<()> {
    for rule in grammar.rules() {
        for sequence in &rule.sequences {
            let mut seen: Vec<&str> = Vec::new();
            for item in &sequence.items {
                if let ItemKind::Group(inner) = &item.kind {
                    let mut vars = Vec::new();
                    group_captures(inner, &mut vars);
                    for var in vars {
                        if seen.contains(&var) {
                            return Err(AnalysisError::DuplicateCapture {
                                rule: rule.name.clone(),
                                var: var.to_string(),
                                span: sequence.span,
                            });
                        }
                        seen.push(var);
                    }
                }
                if let Some(name) = &item.ctx.name {
                    if seen.contains(&name.as_str()) {
                        return Err(AnalysisError::DuplicateCapture {
                            rule: rule.name.clone(),
                            var: name.clone(),
                            span: sequence.span,
                        });
                    }
                    seen.push(name);
                }
            }
        }
    }
    Ok(())
}

fn check_repeated_group_captures(grammar: &Grammar) -> Result<()> {
    for rule in grammar.rules() {
        walk_items(&rule.sequences, &mut |item| {
            if let ItemKind::Group(inner) = &item.kind {
                if item.ctx.repeat.is_some() {
                    let mut vars = Vec::new();
                    group_captures(inner, &mut vars);
                    if !vars.is_empty() {
                        return Err(AnalysisError::CapturesInRepeatedGroup {
                            rule: rule.name.clone(),
                            span: item.span,
                        });
                    }
                }
            }
            Ok(())
        })?;
    }
    Ok(())
}

fn check_negative_lookahead_captures(grammar: &Grammar) -> Result<()> {
    for rule in grammar.rules() {
        walk_items(&rule.sequences, &mut |item| {
            if item.ctx.lookahead == Some(Lookahead::Negative) && item.ctx.name.is_some() {
                return Err(AnalysisError::NegativeLookaheadCapture {
                    rule: rule.name.clone(),
                    span: item.span,
                });
            }
            Ok(())
        })?;
    }
    Ok(())
}

fn check_string_captures(grammar: &Grammar) -> Result<()> {
    for rule in grammar.rules() {
        walk_items(&rule.sequences, &mut |item| {
            if matches!(item.kind, ItemKind::Literal(_)) && item.ctx.name.is_some() {
                if item.ctx.lookahead.is_some() {
                    return Err(AnalysisError::LookaheadStringCapture {
                        rule: rule.name.clone(),
                        span: item.span,
                    });
                }
                if item.ctx.repeat.is_none() && !item.ctx.optional {
                    return Err(AnalysisError::PlainStringCapture {
                        rule: rule.name.clone(),
                        span: item.span,
                    });
                }
            }
            Ok(())
        })?;
    }
    Ok(())
}

fn check_result_types(grammar: &Grammar) -> Result<()> {
    for rule in grammar.rules() {
        if rule.sequences.len() > 1 {
            let first = rule.sequences[0].returns_value();
            if rule.sequences[1..].iter().any(|s| s.returns_value() != first) {
                return Err(AnalysisError::MixedResultTypes {
                    rule: rule.name.clone(),
                    span: rule.span,
                });
            }
        }
    }
    Ok(())
}

fn check_character_classes(grammar: &Grammar) -> Result<()> {
    for rule in grammar.rules() {
        walk_items(&rule.sequences, &mut |item| {
            if let ItemKind::CharClass(text) = &item.kind {
                check_one_class(&rule.name, text, item.span)?;
            }
            Ok(())
        })?;
    }
    Ok(())
}

/// Validates a single character class: no duplicate characters, no
/// degenerate or inverted range, no character inside one of the ranges.
fn check_one_class(rule: &str, text: &str, span: Span) -> Result<()> {
    let chars: Vec<char> = text.chars().collect();
    let mut singles: Vec<char> = Vec::new();
    let mut ranges: Vec<(char, char)> = Vec::new();

    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        if i + 2 < chars.len() && chars[i + 1] == '-' {
            let (from, to) = (ch, chars[i + 2]);
            let range = format!(
                "{}-{}",
                escape(&from.to_string()),
                escape(&to.to_string())
            );
            if from == to {
                return Err(AnalysisError::DegenerateClassRange {
                    rule: rule.to_string(),
                    class_text: escape(text),
                    range,
                    span,
                });
            }
            if from > to {
                return Err(AnalysisError::InvertedClassRange {
                    rule: rule.to_string(),
                    class_text: escape(text),
                    range,
                    span,
                });
            }
            ranges.push((from, to));
            i += 2;
        } else {
            if singles.contains(&ch) {
                return Err(AnalysisError::DuplicateClassCharacter {
                    rule: rule.to_string(),
                    ch: escape(&ch.to_string()),
                    span,
                });
            }
            singles.push(ch);
        }
        i += 1;
    }

    for (from, to) in &ranges {
        for ch in &singles {
            if ch >= from && ch <= to {
                return Err(AnalysisError::ClassCharacterInRange {
                    rule: rule.to_string(),
                    class_text: escape(text),
                    ch: escape(&ch.to_string()),
                    range: format!(
                        "{}-{}",
                        escape(&from.to_string()),
                        escape(&to.to_string())
                    ),
                    span,
                });
            }
        }
    }
    Ok(())
}

fn check_position_vars(grammar: &Grammar) -> Result<()> {
    for rule in grammar.rules() {
        for sequence in &rule.sequences {
            for &index in &sequence.position_vars {
                if index > sequence.items.len() {
                    return Err(AnalysisError::PositionVarOutOfRange {
                        index,
                        span: sequence.span,
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pegc_lex::Tokenizer;
    use pegc_par::Parser;

    fn check(source: &str) -> std::result::Result<Grammar, AnalysisError> {
        let mut tokenizer = Tokenizer::new(source);
        let tokens = tokenizer.tokenize().expect("tokenize");
        let mut grammar = Parser::new(tokens).parse().expect("parse");
        analyze(&mut grammar).map(|_| grammar)
    }

    fn message(source: &str) -> String {
        check(source).unwrap_err().to_string()
    }

    // check 1: at least one rule

    #[test]
    fn test_no_rules() {
        assert_eq!(message("%name foo"), "No rule is defined");
    }

    // check 2: unique rule names, unique directives

    #[test]
    fn test_duplicate_rule() {
        assert_eq!(
            message("s = \"a\"\ns = \"b\""),
            "Rule 's' has more than one definition"
        );
    }

    #[test]
    fn test_duplicate_directive() {
        assert_eq!(
            message("%name a\n%name b\ns = \"a\""),
            "The '%name' directive has more than one definition"
        );
        assert_eq!(
            message("%root s\n%root s\ns = \"a\""),
            "The '%root' directive has more than one definition"
        );
    }

    // check 3: root exists

    #[test]
    fn test_unknown_root() {
        let err = check("%root t\ns = \"a\"").unwrap_err();
        assert_eq!(
            err.to_string(),
            "The directive '%root' contains a non-existing rule: 't'"
        );
        assert_eq!(err.span().unwrap().line, 1);
    }

    // check 4: referenced rules exist

    #[test]
    fn test_unknown_reference() {
        assert_eq!(
            message("s = missing"),
            "The 's' rule invokes a nonexistent rule 'missing'"
        );
    }

    #[test]
    fn test_unknown_reference_inside_group() {
        assert_eq!(
            message("s = (\"a\" missing)"),
            "The 's' rule invokes a nonexistent rule 'missing'"
        );
    }

    // check 5: reachability

    #[test]
    fn test_unused_rule() {
        let err = check("s = \"a\"\ndead = \"b\"").unwrap_err();
        match &err {
            AnalysisError::UnusedRules { rules } => {
                assert_eq!(rules.len(), 1);
                assert_eq!(rules[0].0, "dead");
                assert_eq!(rules[0].1.line, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let diags = pegc_util::ToDiagnostics::to_diagnostics(&err);
        assert_eq!(diags[0].render("g.peg"), "g.peg:2:1: Rule 'dead' defined but not used");
    }

    #[test]
    fn test_group_reference_counts_as_use() {
        assert!(check("s = (\"a\" b)*\nb = \"b\"").is_ok());
    }

    #[test]
    fn test_unused_before_left_recursion_shape() {
        // `dead` is both unreachable and an ill-formed LR rule; the
        // unused-rule check fires first
        let err = check("s = \"a\"\ndead = dead \"x\"").unwrap_err();
        assert!(matches!(err, AnalysisError::UnusedRules { .. }));
    }

    // check 6: LR rules need two alternatives

    #[test]
    fn test_left_recursive_single_sequence() {
        assert_eq!(
            message("s = s \"x\""),
            "In the 's' name, a left-recursive rule must be at least 2 sequences of expressions"
        );
    }

    #[test]
    fn test_left_recursive_two_sequences_ok() {
        assert!(check("s = s \"x\" | \"y\"").is_ok());
    }

    // check 7: actions must consume captures / produce declared results

    #[test]
    fn test_captures_without_action() {
        assert_eq!(
            message("s = x:[0-9]"),
            "In the 's' rule, variables are declared, but there is no action"
        );
    }

    #[test]
    fn test_group_captures_without_action() {
        assert_eq!(
            message("s = (x:[0-9])"),
            "In the 's' rule, variables are declared, but there is no action"
        );
    }

    #[test]
    fn test_return_type_without_action() {
        assert_eq!(
            message("s<int> = \"a\""),
            "In the 's' rule, the return type is defined, but the action not specified"
        );
    }

    #[test]
    fn test_return_type_without_result_var() {
        assert_eq!(
            message("s<int> = \"a\" { int x = 0; }"),
            "In the 's' rule, the return type is defined, but '$$' variable in the action is not"
        );
    }

    // check 8: distinct capture names

    #[test]
    fn test_duplicate_capture() {
        assert_eq!(
            message("s = x:[0-9] x:[a-f] { $$ = 1; }"),
            "In the 's' rule, variable 'x' is declared multiple times"
        );
    }

    #[test]
    fn test_duplicate_capture_through_group() {
        assert_eq!(
            message("s = x:[0-9] (x:[a-f]) { $$ = 1; }"),
            "In the 's' rule, variable 'x' is declared multiple times"
        );
    }

    // check 9: repeated groups must not capture

    #[test]
    fn test_captures_in_repeated_group() {
        assert_eq!(
            message("s = (x:[0-9])+ { $$ = 1; }"),
            "In the 's' rule, the group uses variables inside itself and repetitions operators simultaneously"
        );
    }

    // check 10: no captures under negative lookahead

    #[test]
    fn test_negative_lookahead_capture() {
        assert_eq!(
            message("s = x:!r . { use(x); }\nr = \"a\""),
            "In the 's' rule, a parsing expression with the '!' operator cannot be assigned to a variable"
        );
    }

    #[test]
    fn test_positive_lookahead_rule_capture_ok() {
        assert!(check("s = x:&r . { $$ = x; }\nr = \"a\"").is_ok());
    }

    // check 11: string capture restrictions

    #[test]
    fn test_lookahead_string_capture() {
        assert_eq!(
            message("s = x:&\"a\" . { $$ = x; }"),
            "In the 's' rule, a string with the '&' operator cannot be assigned to a variable"
        );
    }

    #[test]
    fn test_plain_string_capture() {
        assert_eq!(
            message("s = x:\"a\" { $$ = x; }"),
            "In the 's' rule, simple string cannot be assigned to a variable"
        );
    }

    #[test]
    fn test_looped_and_optional_string_captures_ok() {
        assert!(check("s = x:\"a\"* y:\"b\"? { $$ = x + y; }").is_ok());
    }

    // check 12: result shapes must agree

    #[test]
    fn test_mixed_result_types() {
        assert_eq!(
            message("s = x:[0-9] { $$ = x; } | \"a\""),
            "In the 's' rule, parsing expression sequences return different types"
        );
    }

    #[test]
    fn test_uniform_result_types_ok() {
        assert!(check("s = x:[0-9] { $$ = x; } | y:[a-f] { $$ = y; }").is_ok());
    }

    // check 13: character class well-formedness

    #[test]
    fn test_duplicate_class_character() {
        assert_eq!(
            message("s = [aa]"),
            "In the 's' rule, the character class has the same characters: a"
        );
    }

    #[test]
    fn test_duplicate_class_character_escaped_in_message() {
        assert_eq!(
            message("s = [\\n\\n]"),
            "In the 's' rule, the character class has the same characters: \\n"
        );
    }

    #[test]
    fn test_degenerate_range() {
        assert_eq!(
            message("s = [a-a]"),
            "In the 's' rule, inside the character class '[a-a]', the first and second characters in the range are the same 'a-a'"
        );
    }

    #[test]
    fn test_inverted_range() {
        assert_eq!(
            message("s = [z-a]"),
            "In the 's' rule, inside the character class '[z-a]', the first character is 'greater' than the second in a range 'z-a'"
        );
    }

    #[test]
    fn test_character_inside_range() {
        assert_eq!(
            message("s = [a-zm]"),
            "In the 's' rule, inside the character class '[a-zm]', the character 'm' intersects with the range 'a-z'"
        );
    }

    #[test]
    fn test_valid_class_ok() {
        assert!(check("s = [a-z0-9_]").is_ok());
    }

    #[test]
    fn test_trailing_dash_is_a_character() {
        assert!(check("s = [a-]").is_ok());
    }

    // check 14: positional variables in range

    #[test]
    fn test_position_var_out_of_range() {
        assert_eq!(
            message("s = \"a\" { doThing($2); }"),
            "'$2', the index exceeds the number of expressions"
        );
    }

    #[test]
    fn test_position_var_in_range_ok() {
        assert!(check("s = \"a\" \"b\" { doThing($1, $2); }").is_ok());
    }
}
