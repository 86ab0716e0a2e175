//! Per-item code templates.
//!
//! Each item kind emits a fragment for every combination of its context
//! modifiers (plain, `&`/`!` lookahead, `?` optional, `*`/`+` loop). All
//! templates obey one rule: failure transfers control to the `next` label
//! (the following alternative, or `FAIL`). Lookahead templates restore
//! the input position and never consume; loop templates for `+` assert at
//! least one iteration through a local `__i` counter.
//!
//! Captured items additionally produce a variable declaration, hoisted by
//! the sequence emitter to the top of the alternative block. Item-local
//! temporaries (`__result`, `__n`, `__ch`) are brace-scoped so repeated
//! items of one sequence never collide.

use pegc_par::ast::{Item, ItemKind, Lookahead, Repeat, Sequence};
use pegc_util::escape::{escape, escape_cpp_char};
use pegc_util::indent::add_indent;

use crate::error::{CodeGenError, Result};
use crate::Generator;

/// A generated item fragment plus the capture variables it declares.
pub(crate) struct GeneratedItem {
    /// The code fragment; failure paths jump to the caller's `next` label.
    pub code: String,

    /// Hoisted variable declarations, one per line, semicolon included.
    pub vars: Vec<String>,
}

impl GeneratedItem {
    fn with_var(code: String, var: Option<String>) -> Self {
        Self {
            code,
            vars: var.into_iter().collect(),
        }
    }
}

impl Generator<'_> {
    /// Emits a non-group item.
    pub(crate) fn gen_atomic_item(&self, item: &Item, next: &str) -> Result<GeneratedItem> {
        match &item.kind {
            ItemKind::RuleRef(name) => self.gen_rule_ref(item, name, next),
            ItemKind::Literal(value) => Ok(gen_literal(item, value, next)),
            ItemKind::CharClass(text) => Ok(gen_char_class(item, text, next)),
            ItemKind::Any => Ok(gen_any(item, next)),
            ItemKind::Group(_) => Err(CodeGenError::Internal(
                "group reached the atomic item emitter".to_string(),
            )),
        }
    }

    /// Rule reference: call the generated rule method. The binding type is
    /// the referenced rule's raw result type (loop captures collect into a
    /// vector, optional captures into an optional of raw).
    fn gen_rule_ref(&self, item: &Item, name: &str, next: &str) -> Result<GeneratedItem> {
        let referenced = self.rule_type(name)?;
        let raw = referenced.raw();
        let getter = referenced.getter();
        let capture = item.ctx.name.as_deref();

        let mut code = String::new();
        let mut var = None;

        if let Some(polarity) = item.ctx.lookahead {
            code.push_str("{\n");
            code.push_str("    size_t __tempMark = this->position;\n");
            code.push_str(&format!("    auto __result = rule__{}();\n", name));
            code.push_str("    this->position = __tempMark;\n");
            match polarity {
                Lookahead::Positive => {
                    code.push_str(&format!("    if (!__result) goto {};\n", next));
                    if let Some(capture_name) = capture {
                        var = Some(format!("{} {};", raw, capture_name));
                        code.push_str(&format!("    {} = __result{};\n", capture_name, getter));
                    }
                }
                Lookahead::Negative => {
                    code.push_str(&format!("    if (__result) goto {};\n", next));
                }
            }
            code.push_str("}\n");
        } else if item.ctx.optional {
            if let Some(capture_name) = capture {
                var = Some(format!("std::optional<{}> {};", raw, capture_name));
                code.push_str("{\n");
                code.push_str(&format!("    auto __result = rule__{}();\n", name));
                code.push_str(&format!(
                    "    if (__result) {} = __result{};\n",
                    capture_name, getter
                ));
                code.push_str("}\n");
            } else {
                code.push_str(&format!("rule__{}();\n", name));
            }
        } else if let Some(repeat) = item.ctx.repeat {
            if let Some(capture_name) = capture {
                var = Some(format!("std::vector<{}> {};", raw, capture_name));
            }
            code.push_str("{\n");
            if repeat == Repeat::OneOrMore {
                code.push_str("    size_t __i = 0;\n");
            }
            code.push_str("    for (;;)\n    {\n");
            if let Some(capture_name) = capture {
                code.push_str(&format!("        auto __result = rule__{}();\n", name));
                code.push_str("        if (!__result) break;\n");
                code.push_str(&format!(
                    "        {}.push_back(__result{});\n",
                    capture_name, getter
                ));
            } else {
                code.push_str(&format!("        if (!rule__{}()) break;\n", name));
            }
            if repeat == Repeat::OneOrMore {
                code.push_str("        __i++;\n");
            }
            code.push_str("    }\n");
            if repeat == Repeat::OneOrMore {
                code.push_str(&format!("\n    if (!__i) goto {};\n", next));
            }
            code.push_str("}\n");
        } else {
            code.push_str("{\n");
            if let Some(capture_name) = capture {
                var = Some(format!("{} {};", raw, capture_name));
                code.push_str(&format!("    {} __result;\n", referenced));
                code.push_str(&format!(
                    "    if (!(__result = rule__{}())) goto {};\n",
                    name, next
                ));
                code.push_str(&format!("    {} = __result{};\n", capture_name, getter));
            } else {
                code.push_str(&format!("    if (!rule__{}()) goto {};\n", name, next));
            }
            code.push_str("}\n");
        }
        Ok(GeneratedItem::with_var(code, var))
    }

    /// Group: an inner alternation with prefix-namespaced labels. A
    /// captured group binds the raw source slice spanning its consumed
    /// range.
    pub(crate) fn gen_group(
        &self,
        item: &Item,
        sequences: &[Sequence],
        next: &str,
        prefix: &str,
    ) -> Result<GeneratedItem> {
        let mut vars = Vec::new();

        let mut body = String::from("auto __mark = this->position;\n");
        for (i, sequence) in sequences.iter().enumerate() {
            if i > 0 {
                body.push_str(&format!("{}_NEXT_{}:\n", prefix, i));
                body.push_str("this->position = __mark;\n");
            }
            let group_next = if i + 1 < sequences.len() {
                format!("{}_NEXT_{}", prefix, i + 1)
            } else {
                format!("{}_FAIL", prefix)
            };
            let (sequence_code, mut sequence_vars) =
                self.gen_group_sequence(sequence, &group_next, i + 1, prefix)?;
            body.push_str(&sequence_code);
            vars.append(&mut sequence_vars);
            body.push('\n');
        }

        let mut code = String::new();
        if item.ctx.name.is_some() {
            code.push_str(&format!(
                "auto {}_start_position = this->position;\n",
                prefix
            ));
        }

        if let Some(polarity) = item.ctx.lookahead {
            code.push_str("{\n");
            code.push_str(&add_indent(&body, 4));
            code.push_str(&format!("{}_FAIL:\n", prefix));
            code.push_str("    this->position = __mark;\n");
            match polarity {
                Lookahead::Positive => {
                    code.push_str(&format!("    goto {};\n", next));
                    code.push_str(&format!("{}_SUCCESS:\n", prefix));
                    code.push_str("    this->position = __mark;\n");
                }
                Lookahead::Negative => {
                    code.push_str(&format!("    goto {}_END;\n", prefix));
                    code.push_str(&format!("{}_SUCCESS:\n", prefix));
                    code.push_str("    this->position = __mark;\n");
                    code.push_str(&format!("    goto {};\n", next));
                    code.push_str(&format!("{}_END:;\n", prefix));
                }
            }
            code.push_str("}\n");
        } else if item.ctx.optional {
            code.push_str("{\n");
            code.push_str(&add_indent(&body, 4));
            code.push_str(&format!("{}_FAIL:\n", prefix));
            code.push_str("    this->position = __mark;\n");
            code.push_str("    // fallthrough\n");
            code.push_str(&format!("{}_SUCCESS:;\n", prefix));
            code.push_str("}\n");
        } else if let Some(repeat) = item.ctx.repeat {
            let nonempty = repeat == Repeat::OneOrMore;
            code.push_str("{\n");
            if nonempty {
                code.push_str("    size_t __i = 0;\n");
            }
            code.push_str("    for (;;)\n    {\n");
            code.push_str(&add_indent(&body, 8));
            code.push_str(&format!("    {}_FAIL:\n", prefix));
            code.push_str("        this->position = __mark;\n");
            code.push_str("        break;\n");
            code.push_str(&format!("    {}_SUCCESS:;\n", prefix));
            if nonempty {
                code.push_str("        __i++;\n");
            }
            code.push_str("    }\n");
            if nonempty {
                code.push_str(&format!("    if (!__i) goto {};\n", next));
            }
            code.push_str("}\n");
        } else {
            code.push_str("{\n");
            code.push_str(&add_indent(&body, 4));
            code.push_str(&format!("{}_FAIL:\n", prefix));
            code.push_str("    this->position = __mark;\n");
            code.push_str(&format!("    goto {};\n", next));
            code.push_str(&format!("{}_SUCCESS:;\n", prefix));
            code.push_str("}\n");
        }

        if let Some(capture_name) = &item.ctx.name {
            let var_type = if item.ctx.optional {
                "std::optional<std::string>"
            } else {
                "std::string"
            };
            vars.push(format!("{} {};", var_type, capture_name));
            code.push_str(&format!(
                "if (this->position != {}_start_position)\n",
                prefix
            ));
            code.push_str("{\n");
            code.push_str(&format!(
                "    {} = std::string{{this->src.substr({p}_start_position, this->position - {p}_start_position)}};\n",
                capture_name,
                p = prefix
            ));
            code.push_str("}\n");
        }

        Ok(GeneratedItem { code, vars })
    }

    /// One alternative inside a group: the item fragments followed by a
    /// jump to the group's `SUCCESS` label.
    fn gen_group_sequence(
        &self,
        sequence: &Sequence,
        group_next: &str,
        sequence_index: usize,
        prefix: &str,
    ) -> Result<(String, Vec<String>)> {
        let mut generated = Vec::new();
        let mut group_index = 1usize;
        for item in &sequence.items {
            let generated_item = match &item.kind {
                ItemKind::Group(inner) => {
                    let nested_prefix = format!("{}_{}_{}", prefix, sequence_index, group_index);
                    group_index += 1;
                    self.gen_group(item, inner, group_next, &nested_prefix)?
                }
                _ => self.gen_atomic_item(item, group_next)?,
            };
            generated.push(generated_item);
        }

        let mut vars = Vec::new();
        for generated_item in &mut generated {
            vars.append(&mut generated_item.vars);
        }

        let mut code = String::from("{\n");
        for generated_item in &generated {
            code.push_str(&add_indent(&generated_item.code, 4));
            code.push('\n');
        }
        code.push_str(&format!("    goto {}_SUCCESS;\n", prefix));
        code.push_str("}\n");
        Ok((code, vars))
    }
}

/// String literal: bounds check, byte-by-byte comparison against the
/// literal's UTF-8 bytes, advance by byte length. A loop capture counts
/// matches; an optional capture is a boolean.
fn gen_literal(item: &Item, value: &str, next: &str) -> GeneratedItem {
    let length = value.len();
    let last = length.saturating_sub(1);
    let condition = literal_condition(value);
    let capture = item.ctx.name.as_deref();

    let mut code = String::new();
    let mut var = None;

    if let Some(polarity) = item.ctx.lookahead {
        match polarity {
            Lookahead::Positive => {
                code.push_str(&format!(
                    "if (this->position + {} >= this->src.size()) goto {};\n",
                    last, next
                ));
                code.push_str("if (!(true\n");
                code.push_str(&condition);
                code.push_str(&format!(")) goto {};\n", next));
            }
            Lookahead::Negative => {
                code.push_str(&format!(
                    "if (this->position + {} < this->src.size())\n",
                    last
                ));
                code.push_str("{\n");
                code.push_str("    if (true\n");
                code.push_str(&add_indent(&condition, 4));
                code.push_str(&format!("    ) goto {};\n", next));
                code.push_str("}\n");
            }
        }
    } else if item.ctx.optional {
        code.push_str(&format!(
            "if (this->position + {} < this->src.size())\n",
            last
        ));
        code.push_str("{\n");
        code.push_str("    if ((true\n");
        code.push_str(&add_indent(&condition, 4));
        code.push_str("    ))\n    {\n");
        if let Some(capture_name) = capture {
            var = Some(format!("bool {} = false;", capture_name));
            code.push_str(&format!("        {} = true;\n", capture_name));
        }
        code.push_str(&format!("        this->position += {};\n", length));
        code.push_str("    }\n}\n");
    } else if let Some(repeat) = item.ctx.repeat {
        let nonempty = repeat == Repeat::OneOrMore;
        code.push_str("{\n");
        if nonempty {
            code.push_str("    size_t __i = 0;\n");
        }
        code.push_str("    for (;;)\n    {\n");
        code.push_str(&format!(
            "        if (this->position + {} >= this->src.size()) break;\n",
            last
        ));
        code.push_str("        if (!(true\n");
        code.push_str(&add_indent(&condition, 8));
        code.push_str("        )) break;\n");
        if let Some(capture_name) = capture {
            var = Some(format!("size_t {} = 0;", capture_name));
            code.push_str(&format!("        {}++;\n", capture_name));
        }
        code.push_str(&format!("        this->position += {};\n", length));
        if nonempty {
            code.push_str("        __i++;\n");
        }
        code.push_str("    }\n");
        if nonempty {
            code.push_str(&format!("\n    if (!__i) goto {};\n", next));
        }
        code.push_str("}\n");
    } else {
        code.push_str(&format!(
            "if (this->position + {} >= this->src.size()) goto {};\n",
            last, next
        ));
        code.push_str("if (!(true\n");
        code.push_str(&condition);
        code.push_str(&format!(")) goto {};\n", next));
        code.push_str(&format!("this->position += {};\n", length));
    }
    GeneratedItem::with_var(code, var)
}

/// Builds the `&&`-chained byte comparison for a string literal. ASCII
/// characters compare as character literals; multi-byte characters
/// compare each UTF-8 byte, annotated with the character.
fn literal_condition(value: &str) -> String {
    let mut out = String::new();
    let mut offset = 0usize;
    for ch in value.chars() {
        if ch.is_ascii() {
            out.push_str(&format!(
                "   && this->src[this->position + {}] == '{}'\n",
                offset,
                escape_cpp_char(ch)
            ));
            offset += 1;
        } else {
            let mut buf = [0u8; 4];
            let encoded = ch.encode_utf8(&mut buf);
            for (i, byte) in encoded.bytes().enumerate() {
                if i == 0 {
                    out.push_str(&format!(
                        "   && (unsigned char)this->src[this->position + {}] == 0x{:02X} // {}\n",
                        offset,
                        byte,
                        escape(&ch.to_string())
                    ));
                } else {
                    out.push_str(&format!(
                        "   && (unsigned char)this->src[this->position + {}] == 0x{:02X}\n",
                        offset + i,
                        byte
                    ));
                }
            }
            offset += encoded.len();
        }
    }
    out
}

/// Character class: decode one code point, test membership, advance by the
/// decoded byte length. Loop captures concatenate the matched UTF-8
/// slices.
fn gen_char_class(item: &Item, text: &str, next: &str) -> GeneratedItem {
    let condition = class_condition(text);
    let capture = item.ctx.name.as_deref();

    let mut code = String::new();
    let mut var = None;

    if let Some(polarity) = item.ctx.lookahead {
        match polarity {
            Lookahead::Positive => {
                code.push_str("{\n");
                code.push_str("    size_t __n;\n    char32_t __ch;\n");
                code.push_str(&format!(
                    "    if (!(__n = getUtf32Char(__ch))) goto {};\n",
                    next
                ));
                code.push_str("    if (!(false\n");
                code.push_str(&add_indent(&condition, 4));
                code.push_str(&format!("    )) goto {};\n", next));
                if let Some(capture_name) = capture {
                    var = Some(format!("std::string {};", capture_name));
                    code.push_str(&format!(
                        "    {} = this->src.substr(this->position, __n);\n",
                        capture_name
                    ));
                }
                code.push_str("}\n");
            }
            Lookahead::Negative => {
                code.push_str("if (char32_t __ch; getUtf32Char(__ch))\n{\n");
                code.push_str("    if ((false\n");
                code.push_str(&add_indent(&condition, 4));
                code.push_str(&format!("    )) goto {};\n", next));
                code.push_str("}\n");
                code.push_str(&format!("else goto {};\n", next));
            }
        }
    } else if item.ctx.optional {
        code.push_str("{\n");
        code.push_str("    char32_t __ch;\n");
        code.push_str("    if (size_t __n = getUtf32Char(__ch))\n    {\n");
        code.push_str("        if ((false\n");
        code.push_str(&add_indent(&condition, 8));
        code.push_str("        ))\n        {\n");
        if let Some(capture_name) = capture {
            var = Some(format!("std::optional<std::string> {};", capture_name));
            code.push_str(&format!(
                "            {} = this->src.substr(this->position, __n);\n",
                capture_name
            ));
        }
        code.push_str("            this->position += __n;\n");
        code.push_str("        }\n    }\n}\n");
    } else if let Some(repeat) = item.ctx.repeat {
        let nonempty = repeat == Repeat::OneOrMore;
        code.push_str("{\n");
        if nonempty {
            code.push_str("    size_t __i = 0;\n");
        }
        code.push_str("    size_t __n;\n    char32_t __ch;\n");
        code.push_str("    for(;;)\n    {\n");
        code.push_str("        if (!(__n = getUtf32Char(__ch))) break;\n");
        code.push_str("        if (!(false\n");
        code.push_str(&add_indent(&condition, 8));
        code.push_str("        )) break;\n");
        if let Some(capture_name) = capture {
            var = Some(format!("std::string {};", capture_name));
            code.push_str(&format!(
                "        {} += this->src.substr(this->position, __n);\n",
                capture_name
            ));
        }
        code.push_str("        this->position += __n;\n");
        if nonempty {
            code.push_str("        __i++;\n");
        }
        code.push_str("    }\n");
        if nonempty {
            code.push_str(&format!("\n    if (!__i) goto {};\n", next));
        }
        code.push_str("}\n");
    } else {
        code.push_str("{\n");
        code.push_str("    size_t __n;\n    char32_t __ch;\n");
        code.push_str(&format!(
            "    if (!(__n = getUtf32Char(__ch))) goto {};\n",
            next
        ));
        code.push_str("    if (!(false\n");
        code.push_str(&add_indent(&condition, 4));
        code.push_str(&format!("    )) goto {};\n", next));
        if let Some(capture_name) = capture {
            var = Some(format!("std::string {};", capture_name));
            code.push_str(&format!(
                "    {} = this->src.substr(this->position, __n);\n",
                capture_name
            ));
        }
        code.push_str("    this->position += __n;\n");
        code.push_str("}\n");
    }
    GeneratedItem::with_var(code, var)
}

/// Builds the `||`-chained membership test for a character class, one
/// line per single character or closed range.
fn class_condition(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::new();
    let mut i = 0usize;
    while i < chars.len() {
        let ch = chars[i];
        if i + 2 < chars.len() && chars[i + 1] == '-' {
            let to = chars[i + 2];
            out.push_str(&format!(
                "    || __ch >= 0x{:06x} && __ch <= 0x{:06x} // {}, {}\n",
                ch as u32,
                to as u32,
                escape(&ch.to_string()),
                escape(&to.to_string())
            ));
            i += 2;
        } else {
            out.push_str(&format!(
                "    || __ch == 0x{:06x} // {}\n",
                ch as u32,
                escape(&ch.to_string())
            ));
        }
        i += 1;
    }
    out
}

/// Dot: any single code point, advancing by its byte length. Captures
/// behave as for character classes; lookahead never consumes.
fn gen_any(item: &Item, next: &str) -> GeneratedItem {
    let capture = item.ctx.name.as_deref();

    let mut code = String::new();
    let mut var = None;

    if let Some(polarity) = item.ctx.lookahead {
        match polarity {
            Lookahead::Positive => {
                code.push_str("{\n");
                code.push_str("    size_t __n = getUtf8Size();\n");
                code.push_str(&format!("    if (!__n) goto {};\n", next));
                if let Some(capture_name) = capture {
                    var = Some(format!("std::string {};", capture_name));
                    code.push_str(&format!(
                        "    {} = this->src.substr(this->position, __n);\n",
                        capture_name
                    ));
                }
                code.push_str("}\n");
            }
            Lookahead::Negative => {
                code.push_str(&format!(
                    "if (this->position < this->src.size()) goto {};\n",
                    next
                ));
            }
        }
    } else if item.ctx.optional {
        code.push_str("if (size_t __n = getUtf8Size())\n{\n");
        if let Some(capture_name) = capture {
            var = Some(format!("std::optional<std::string> {};", capture_name));
            code.push_str(&format!(
                "    {} = this->src.substr(this->position, __n);\n",
                capture_name
            ));
        }
        code.push_str("    this->position += __n;\n");
        code.push_str("}\n");
    } else if let Some(repeat) = item.ctx.repeat {
        let nonempty = repeat == Repeat::OneOrMore;
        code.push_str("{\n");
        if nonempty {
            code.push_str("    size_t __i = 0;\n");
        }
        code.push_str("    for (;;)\n    {\n");
        code.push_str("        size_t __n = getUtf8Size();\n");
        code.push_str("        if (!__n) break;\n");
        if let Some(capture_name) = capture {
            var = Some(format!("std::string {};", capture_name));
            code.push_str(&format!(
                "        {} += this->src.substr(this->position, __n);\n",
                capture_name
            ));
        }
        code.push_str("        this->position += __n;\n");
        if nonempty {
            code.push_str("        __i++;\n");
        }
        code.push_str("    }\n");
        if nonempty {
            code.push_str(&format!("    if (!__i) goto {};\n", next));
        }
        code.push_str("}\n");
    } else {
        code.push_str("{\n");
        code.push_str("    size_t __n = getUtf8Size();\n");
        code.push_str(&format!("    if (!__n) goto {};\n", next));
        if let Some(capture_name) = capture {
            var = Some(format!("std::string {};", capture_name));
            code.push_str(&format!(
                "    {} = this->src.substr(this->position, __n);\n",
                capture_name
            ));
        }
        code.push_str("    this->position += __n;\n");
        code.push_str("}\n");
    }
    GeneratedItem::with_var(code, var)
}
