//! Edge case and generative tests for pegc-lex

#[cfg(test)]
mod tests {
    use crate::{LexError, Token, Tokenizer};
    use proptest::prelude::*;

    fn lex_all(source: &str) -> Result<Vec<Token>, LexError> {
        Tokenizer::new(source).tokenize().map(|t| t.to_vec())
    }

    // ==================== EDGE CASES ====================

    #[test]
    fn test_edge_empty_source() {
        assert!(lex_all("").unwrap().is_empty());
    }

    #[test]
    fn test_edge_whitespace_only() {
        assert!(lex_all(" \t\r\n ").unwrap().is_empty());
    }

    #[test]
    fn test_edge_comment_only() {
        assert!(lex_all("# nothing else").unwrap().is_empty());
    }

    #[test]
    fn test_edge_comment_at_eof_without_newline() {
        assert!(lex_all("# note").unwrap().is_empty());
    }

    #[test]
    fn test_edge_long_identifier() {
        let name = "a".repeat(10000);
        let tokens = lex_all(&format!("{} = \"x\"", name)).unwrap();
        assert_eq!(tokens[0].lexeme, name);
    }

    #[test]
    fn test_edge_deeply_nested_action() {
        let action = format!("{}x{}", "{".repeat(50), "}".repeat(50));
        let tokens = lex_all(&format!("s = r {}", action)).unwrap();
        assert_eq!(tokens.last().unwrap().lexeme, action);
    }

    #[test]
    fn test_edge_unterminated_rule_type() {
        let err = lex_all("s<std::vector<int> = r").unwrap_err();
        assert!(matches!(
            err,
            LexError::UnbalancedDelimiter { delimiter: '>', .. }
        ));
    }

    #[test]
    fn test_edge_stray_close_brace_is_a_token() {
        // a leading `}` is matched by the lexical table, not the balanced scan
        let tokens = lex_all("}").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].lexeme, "}");
    }

    #[test]
    fn test_edge_multibyte_positions() {
        let tokens = lex_all("日本 = \"語\"").unwrap();
        assert_eq!((tokens[0].span.line, tokens[0].span.column), (1, 1));
        assert_eq!((tokens[1].span.line, tokens[1].span.column), (1, 4));
    }

    // ==================== GENERATIVE PROPERTIES ====================

    proptest! {
        /// Tokenization is total: any input yields a token list or a single
        /// error, and never panics.
        #[test]
        fn prop_tokenizer_total(source in ".*") {
            let _ = lex_all(&source);
        }

        /// Scanning twice yields the identical token list.
        #[test]
        fn prop_tokenizer_deterministic(source in ".*") {
            let mut tokenizer = Tokenizer::new(&source);
            let first = tokenizer.tokenize().map(|t| t.to_vec());
            let second = tokenizer.tokenize().map(|t| t.to_vec());
            if let (Ok(a), Ok(b)) = (&first, &second) {
                prop_assert_eq!(a, b);
            }
        }

        /// Token spans are in source order and lexemes of regex-matched
        /// tokens reproduce the source slice.
        #[test]
        fn prop_token_spans_ordered(source in "[ -~\n]{0,200}") {
            if let Ok(tokens) = lex_all(&source) {
                let mut last_start = 0usize;
                for token in &tokens {
                    prop_assert!(token.span.start >= last_start);
                    last_start = token.span.start;
                }
            }
        }
    }
}
