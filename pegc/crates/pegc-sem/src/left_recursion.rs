//! Direct left-recursion marking.
//!
//! A rule R is directly left-recursive iff some sequence of R has, as its
//! first "consuming" item, a reference to R itself. An item is consuming
//! unless it is guaranteed to accept without advancing the input: optional
//! items, lookaheads, `*` loops, and references to rules that themselves
//! can accept without advancing. The latter is a local fixed point over
//! rule definitions; rules currently under evaluation are treated as
//! consuming, which bounds the computation by the rule count even when
//! references form a cycle.

use pegc_par::ast::{Grammar, Item, ItemKind, Repeat, Sequence};

/// Sets the `is_left_recursive` flag on every rule of the grammar.
///
/// Runs after unused-rule detection, so every referenced rule exists.
pub fn mark_left_recursion(grammar: &mut Grammar) {
    let flags: Vec<bool> = grammar
        .rules()
        .map(|rule| {
            rule.sequences
                .iter()
                .any(|seq| first_rule_reference(grammar, seq) == Some(rule.name.as_str()))
        })
        .collect();

    for (rule, flag) in grammar.rules_mut().zip(flags) {
        rule.is_left_recursive = flag;
    }
}

/// Returns the rule reference that starts this sequence, skipping over
/// items that accept without advancing. Returns `None` when a consuming
/// non-reference item is reached first.
fn first_rule_reference<'a>(grammar: &Grammar, sequence: &'a Sequence) -> Option<&'a str> {
    for item in &sequence.items {
        if let ItemKind::RuleRef(name) = &item.kind {
            return Some(name);
        }
        if !accepts_without_advancing(grammar, item, &mut Vec::new()) {
            break;
        }
    }
    None
}

/// True if `item` can succeed without consuming input.
fn accepts_without_advancing<'a>(
    grammar: &'a Grammar,
    item: &'a Item,
    in_progress: &mut Vec<&'a str>,
) -> bool {
    if item.ctx.optional
        || item.ctx.lookahead.is_some()
        || item.ctx.repeat == Some(Repeat::ZeroOrMore)
    {
        return true;
    }
    if let ItemKind::RuleRef(name) = &item.kind {
        return rule_accepts_without_advancing(grammar, name, in_progress);
    }
    false
}

/// True if some sequence of the named rule consists entirely of items that
/// accept without advancing.
fn rule_accepts_without_advancing<'a>(
    grammar: &'a Grammar,
    name: &'a str,
    in_progress: &mut Vec<&'a str>,
) -> bool {
    if in_progress.contains(&name) {
        // reference cycle: treat as consuming
        return false;
    }
    let Some(rule) = grammar.rule(name) else {
        return false;
    };

    in_progress.push(name);
    let result = rule.sequences.iter().any(|seq| {
        seq.items
            .iter()
            .all(|item| accepts_without_advancing(grammar, item, in_progress))
    });
    in_progress.pop();
    result
}
