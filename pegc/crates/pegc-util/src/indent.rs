//! Text re-indentation helpers.
//!
//! User actions arrive as verbatim text with whatever indentation the
//! grammar author used. Before splicing them into the emitted parser the
//! code generator normalizes them: strip the common leading indentation,
//! then re-indent to the depth of the surrounding generated block. Blank
//! lines stay empty and trailing whitespace is dropped.

/// Returns the leading-whitespace width of `line` in bytes.
pub fn get_indent(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Prefixes every non-blank line of `text` with `indent` spaces.
pub fn add_indent(text: &str, indent: usize) -> String {
    let pad = " ".repeat(indent);
    text.split('\n')
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("{}{}", pad, line.trim_end())
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Removes the common leading indentation from every line of `text`.
///
/// The common indentation is the minimum over non-blank lines; blank lines
/// become empty.
pub fn remove_indent(text: &str) -> String {
    let common = text
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(get_indent)
        .min()
        .unwrap_or(0);

    text.split('\n')
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                let depth = get_indent(line) - common;
                format!("{}{}", " ".repeat(depth), line.trim_start())
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Normalizes `text` to exactly `indent` spaces of leading indentation,
/// preserving relative nesting.
pub fn set_indent(text: &str, indent: usize) -> String {
    add_indent(&remove_indent(text), indent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_indent() {
        assert_eq!(get_indent("    x"), 4);
        assert_eq!(get_indent("x"), 0);
        assert_eq!(get_indent("\t x"), 2);
    }

    #[test]
    fn test_add_indent() {
        assert_eq!(add_indent("a\nb", 4), "    a\n    b");
        assert_eq!(add_indent("a\n\nb", 2), "  a\n\n  b");
    }

    #[test]
    fn test_add_indent_strips_trailing_whitespace() {
        assert_eq!(add_indent("a   \nb", 1), " a\n b");
    }

    #[test]
    fn test_remove_indent() {
        assert_eq!(remove_indent("    a\n      b"), "a\n  b");
        assert_eq!(remove_indent("a\n  b"), "a\n  b");
    }

    #[test]
    fn test_remove_indent_ignores_blank_lines() {
        assert_eq!(remove_indent("    a\n\n    b"), "a\n\nb");
    }

    #[test]
    fn test_set_indent() {
        assert_eq!(set_indent("        x = 1;\n        y;", 4), "    x = 1;\n    y;");
        assert_eq!(set_indent("x;\n    y;", 8), "        x;\n            y;");
    }

    #[test]
    fn test_set_indent_empty() {
        assert_eq!(set_indent("", 4), "");
    }
}
