//! pegc-lex - Tokenizer for the pegc grammar DSL.
//!
//! The tokenizer converts grammar source text into a flat list of typed
//! tokens with source positions. Two token families exist:
//!
//! - *lexical* tokens, each matched by an anchored regular expression tried
//!   in a fixed declaration order (comments are matched and discarded);
//! - *special* tokens produced by bracket-balanced scans: `%cpp`/`%hpp`
//!   code sections, `{...}` actions, and `<...>` rule return types.
//!
//! The scan is total: it either yields the complete token list or a single
//! fatal [`LexError`], never partial output. A tokenizer instance caches
//! its result, so repeated [`Tokenizer::tokenize`] calls are cheap.

pub mod cursor;
mod edge_cases;
mod error;
mod token;
mod tokenizer;

pub use error::LexError;
pub use token::{Token, TokenKind};
pub use tokenizer::Tokenizer;
