//! pegc-util - Shared utilities for the pegc parser generator.
//!
//! This crate provides the pieces every pipeline phase leans on:
//!
//! - [`span`] - source location tracking for tokens and AST nodes
//! - [`diagnostic`] - positioned fatal diagnostics in `file:line:col: message`
//!   form, and the [`ToDiagnostics`] conversion implemented by every stage
//!   error type
//! - [`escape`] - escape/unescape tables for grammar string and
//!   character-class literals
//! - [`indent`] - text re-indentation helpers used when splicing verbatim
//!   user code into the emitted parser

pub mod diagnostic;
pub mod escape;
pub mod indent;
pub mod span;

pub use diagnostic::{Diagnostic, ToDiagnostics};
pub use span::Span;
