//! Escape handling for grammar literals and emitted C++.
//!
//! String and character-class literals in the grammar DSL support the
//! escape sequences `\\ \a \b \f \n \r \t \v`; character classes
//! additionally accept `\[` and `\]` so the delimiters can appear as
//! members. An unrecognized backslash pair is kept verbatim.
//!
//! The reverse direction ([`escape`], [`escape_cpp_char`]) is used by the
//! code generator when a decoded character has to reappear inside the
//! emitted parser - in a comment, a diagnostic, or a C++ `char` literal.

/// Decodes a single escape character, or `None` if it is not part of the
/// common table.
fn decode_common(c: char) -> Option<char> {
    match c {
        '\\' => Some('\\'),
        'a' => Some('\x07'),
        'b' => Some('\x08'),
        'f' => Some('\x0C'),
        'n' => Some('\n'),
        'r' => Some('\r'),
        't' => Some('\t'),
        'v' => Some('\x0B'),
        _ => None,
    }
}

fn unescape_with(input: &str, extra: &[char]) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                let decoded = decode_common(next).or(if extra.contains(&next) {
                    Some(next)
                } else {
                    None
                });
                if let Some(d) = decoded {
                    out.push(d);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// Decodes the escape sequences of a string literal body.
///
/// # Examples
///
/// ```
/// use pegc_util::escape::unescape_string;
///
/// assert_eq!(unescape_string(r"a\nb"), "a\nb");
/// assert_eq!(unescape_string(r"a\\b"), "a\\b");
/// assert_eq!(unescape_string(r"a\qb"), "a\\qb"); // unknown escape kept
/// ```
pub fn unescape_string(input: &str) -> String {
    unescape_with(input, &[])
}

/// Decodes the escape sequences of a character-class literal body.
///
/// Same table as [`unescape_string`] plus `\[` and `\]`.
pub fn unescape_char_class(input: &str) -> String {
    unescape_with(input, &['[', ']'])
}

/// Re-encodes control characters into backslash form for display.
///
/// Inverse of the common table for the control set; characters outside it
/// pass through unchanged.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match encode_control(c) {
            Some(e) => {
                out.push('\\');
                out.push(e);
            }
            None => out.push(c),
        }
    }
    out
}

fn encode_control(c: char) -> Option<char> {
    match c {
        '\x07' => Some('a'),
        '\x08' => Some('b'),
        '\x0C' => Some('f'),
        '\n' => Some('n'),
        '\r' => Some('r'),
        '\t' => Some('t'),
        '\x0B' => Some('v'),
        _ => None,
    }
}

/// Renders one ASCII character as the body of a C++ `char` literal.
///
/// Unlike [`escape`] this also escapes `'` and `\`, which are meaningful
/// inside a C++ character literal.
pub fn escape_cpp_char(c: char) -> String {
    match c {
        '\'' => "\\'".to_string(),
        '\\' => "\\\\".to_string(),
        _ => match encode_control(c) {
            Some(e) => format!("\\{}", e),
            None => c.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_unescape_string_table() {
        assert_eq!(unescape_string(r"\a\b\f\n\r\t\v"), "\x07\x08\x0C\n\r\t\x0B");
        assert_eq!(unescape_string(r"\\"), "\\");
    }

    #[test]
    fn test_unescape_unknown_escape_kept() {
        assert_eq!(unescape_string(r"\q"), "\\q");
        assert_eq!(unescape_string(r"\["), "\\[");
    }

    #[test]
    fn test_unescape_trailing_backslash() {
        assert_eq!(unescape_string("ab\\"), "ab\\");
    }

    #[test]
    fn test_unescape_char_class_brackets() {
        assert_eq!(unescape_char_class(r"\[\]"), "[]");
        assert_eq!(unescape_char_class(r"a-z\]"), "a-z]");
    }

    #[test]
    fn test_escape_controls() {
        assert_eq!(escape("a\nb\tc"), r"a\nb\tc");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_escape_cpp_char() {
        assert_eq!(escape_cpp_char('a'), "a");
        assert_eq!(escape_cpp_char('\''), "\\'");
        assert_eq!(escape_cpp_char('\\'), "\\\\");
        assert_eq!(escape_cpp_char('\n'), "\\n");
    }

    #[quickcheck]
    fn prop_escape_unescape_round_trip(s: String) -> bool {
        // escape() never introduces '\\' except as an escape prefix, so the
        // round trip holds for inputs without a literal backslash.
        if s.contains('\\') {
            return true;
        }
        unescape_string(&escape(&s)) == s
    }
}
