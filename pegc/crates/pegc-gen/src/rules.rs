//! Per-rule body emission.
//!
//! Every rule method follows the same skeleton: consult the memo table,
//! save `__mark`, then try each alternative inside a labeled block. Item
//! failure jumps to the next alternative's label (`NEXT_i`), which
//! restores the saved position; the last alternative jumps to `FAIL`.
//! Boolean alternatives finish through `SUCCESS`; value-carrying ones
//! return their `__rule_result` directly from the action block.
//!
//! Left-recursive rules split in two: the public method owns the memo slot
//! and grows the seed by re-invoking a private worker (the ordinary body,
//! without memo access) until the parse stops advancing.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use pegc_par::ast::{ItemKind, Rule, Sequence};
use pegc_util::indent::{add_indent, set_indent};

use crate::error::Result;
use crate::items::GeneratedItem;
use crate::types::CppType;
use crate::Generator;

/// `$k` positional variables and the `$$` result variable, matched in one
/// scan so a rewrite never sees the other's output. Trailing digits are
/// part of the match, which keeps `$1` from matching inside `$12`.
static ACTION_VAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$(\$|[1-9][0-9]*)").unwrap());

/// Rewrites `$$` to `__rule_result` and `$k` to `__token_pos_k` inside
/// verbatim action text.
fn rewrite_action(action: &str) -> String {
    ACTION_VAR
        .replace_all(action, |caps: &Captures| {
            if &caps[1] == "$" {
                "__rule_result".to_string()
            } else {
                format!("__token_pos_{}", &caps[1])
            }
        })
        .into_owned()
}

impl Generator<'_> {
    /// Emits one rule: its declaration(s) into the interface and its
    /// method body (or bodies, when left-recursive) into the
    /// implementation.
    pub(crate) fn gen_rule(&mut self, rule: &Rule, rule_id: usize) -> Result<()> {
        let return_type = self.rule_type(&rule.name)?.clone();

        self.interface
            .push_str(&format!("        {} rule__{}();\n", return_type, rule.name));

        if rule.is_left_recursive {
            self.interface
                .push_str(&format!("        {} rule__{}_();\n", return_type, rule.name));
            self.write_seed_growing_wrapper(rule, rule_id, &return_type)?;
            self.implementation.push_str(&format!(
                "    {} Parser::rule__{}_()\n    {{\n",
                return_type, rule.name
            ));
        } else {
            self.implementation.push_str(&format!(
                "    {} Parser::rule__{}()\n    {{\n",
                return_type, rule.name
            ));
        }

        let mut code = String::new();
        if !rule.is_left_recursive {
            code.push_str(&format!("auto __memoized = this->memoGet({});\n", rule_id));
            code.push_str("if (__memoized.has_value())\n{\n");
            code.push_str("    auto& [__memoized_value, __memoized_position] = __memoized.value();\n");
            code.push_str("    this->position = __memoized_position;\n");
            code.push_str(&format!(
                "    if (!__memoized_value.has_value()) return {};\n",
                return_type.null()?
            ));
            code.push_str(&format!(
                "    return std::any_cast<{}>(__memoized_value);\n",
                return_type.raw()
            ));
            code.push_str("}\n\n");
        }
        code.push_str("auto __mark = this->position;\n");

        for (i, sequence) in rule.sequences.iter().enumerate() {
            if i > 0 {
                code.push_str(&format!("NEXT_{}:\n", i));
                code.push_str("this->position = __mark;\n");
            }
            let next = if i + 1 < rule.sequences.len() {
                format!("NEXT_{}", i + 1)
            } else {
                "FAIL".to_string()
            };
            code.push_str(&self.gen_sequence(
                sequence,
                &next,
                &return_type,
                i + 1,
                rule_id,
                rule.is_left_recursive,
            )?);
            code.push('\n');
        }
        self.implementation.push_str(&add_indent(&code, 8));

        self.implementation
            .push_str("    FAIL:\n        this->position = __mark;\n");
        if !rule.is_left_recursive {
            self.implementation
                .push_str(&format!("        this->memoSet({}, {{}}, __mark);\n", rule_id));
        }
        self.implementation
            .push_str(&format!("        return {};\n", return_type.null()?));
        if !return_type.is_optional() {
            self.implementation.push_str("    SUCCESS:\n");
            if !rule.is_left_recursive {
                self.implementation.push_str(&format!(
                    "        this->memoSet({}, true, __mark);\n",
                    rule_id
                ));
            }
            self.implementation.push_str("        return true;\n");
        }
        self.implementation.push_str("    }\n\n");
        Ok(())
    }

    /// Emits the public entry of a left-recursive rule: memoize the
    /// failure sentinel, then repeatedly re-parse from the same start,
    /// keeping the longest result, until growth halts.
    fn write_seed_growing_wrapper(
        &mut self,
        rule: &Rule,
        rule_id: usize,
        return_type: &CppType,
    ) -> Result<()> {
        self.implementation.push_str(&format!(
            r#"    {ty} Parser::rule__{name}()
    {{
        auto mark = this->position;
        auto memoized = this->memoGet({id});
        if (memoized.has_value())
        {{
            auto& [memoized_value, memoized_position] = memoized.value();
            this->position = memoized_position;
            if (!memoized_value.has_value()) return {null};
            return std::any_cast<{raw}>(memoized_value);
        }}
        else
        {{
            auto last_position = mark;
            this->memoSet({id}, {{}}, mark);
            {raw} last_result;

            for(;;)
            {{
                this->position = mark;
                auto result = rule__{name}_();
                auto end_position = this->position;
                if (end_position <= last_position) break;
                this->memoSet({id}, result{getter}, mark);
                last_result = result{getter};
                last_position = end_position;
            }}

            if (last_position == mark) return {null};
            this->position = last_position;
            return last_result;
        }}
    }}

"#,
            ty = return_type,
            name = rule.name,
            id = rule_id,
            null = return_type.null()?,
            raw = return_type.raw(),
            getter = return_type.getter(),
        ));
        Ok(())
    }

    /// Emits one alternative as a braced block: hoisted capture variables,
    /// the item fragments (bracketed with `TokenPos` capture where the
    /// action references `$k`), then the action / `goto SUCCESS` tail and
    /// the optional error-action label.
    fn gen_sequence(
        &self,
        sequence: &Sequence,
        next: &str,
        return_type: &CppType,
        expr_index: usize,
        rule_id: usize,
        is_left_recursive: bool,
    ) -> Result<String> {
        let outer_next = next;
        let item_next = if sequence.error_action.is_some() {
            format!("ERROR_ACTION_{}", expr_index)
        } else {
            next.to_string()
        };

        let mut generated: Vec<GeneratedItem> = Vec::new();
        let mut group_index = 1usize;
        for item in &sequence.items {
            let generated_item = match &item.kind {
                ItemKind::Group(sequences) => {
                    let prefix = format!("group_{}_{}", expr_index, group_index);
                    group_index += 1;
                    self.gen_group(item, sequences, &item_next, &prefix)?
                }
                _ => self.gen_atomic_item(item, &item_next)?,
            };
            generated.push(generated_item);
        }

        let mut declarations = String::new();
        for generated_item in &generated {
            for var in &generated_item.vars {
                declarations.push_str(var);
                declarations.push('\n');
            }
        }

        let mut code = String::from("{\n");
        if !declarations.is_empty() {
            code.push_str("    // User defined variables\n");
            code.push_str(&add_indent(&declarations, 4));
            code.push_str("    // end variables\n\n");
        }

        for (i, generated_item) in generated.iter().enumerate() {
            let index = i + 1;
            let save_pos = sequence.position_vars.contains(&index);
            if save_pos {
                code.push_str(&format!("    TokenPos __token_pos_{};\n", index));
                code.push_str(&format!(
                    "    __token_pos_{i}.startLine = this->getLineFromPosition(this->position);\n",
                    i = index
                ));
                code.push_str(&format!(
                    "    __token_pos_{i}.startCol = this->getColFromPosition(this->position, __token_pos_{i}.startLine);\n\n",
                    i = index
                ));
            }
            code.push_str(&add_indent(&generated_item.code, 4));
            code.push('\n');
            if save_pos {
                code.push_str(&format!(
                    "    __token_pos_{i}.endLine = this->getLineFromPosition(this->position);\n",
                    i = index
                ));
                code.push_str(&format!(
                    "    __token_pos_{i}.endCol = this->getColFromPosition(this->position, __token_pos_{i}.endLine);\n\n",
                    i = index
                ));
            }
        }

        if let Some(action) = &sequence.action {
            let rewritten = rewrite_action(action);
            code.push_str("    { // action\n");
            if sequence.returns_value() {
                code.push_str(&format!("        {} __rule_result;\n", return_type.raw()));
                code.push_str(&set_indent(&rewritten, 8));
                code.push('\n');
                if !is_left_recursive {
                    code.push_str(&format!(
                        "        this->memoSet({}, __rule_result, __mark);\n",
                        rule_id
                    ));
                }
                code.push_str("        return __rule_result;\n");
            } else {
                code.push_str(&set_indent(&rewritten, 8));
                code.push('\n');
            }
            code.push_str("    } // end of action\n");
        }
        if !sequence.returns_value() {
            code.push_str("    goto SUCCESS;\n");
        }

        if let Some(error_action) = &sequence.error_action {
            code.push('\n');
            code.push_str(&format!("{}:\n", item_next));
            code.push_str("    { // error action\n");
            code.push_str(&set_indent(error_action, 8));
            code.push('\n');
            code.push_str("    } // end of error action\n");
            code.push_str(&format!("    goto {};\n", outer_next));
        }
        code.push_str("}\n");
        Ok(code)
    }
}
