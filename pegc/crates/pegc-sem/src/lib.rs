//! pegc-sem - Semantic analysis for pegc grammars.
//!
//! Two passes over the grammar AST:
//!
//! 1. [`left_recursion`] marks each rule as directly left-recursive or not
//!    (the only AST mutation in the whole pipeline);
//! 2. [`analysis`] runs the fixed battery of semantic checks and rejects
//!    malformed grammars with a positioned error.
//!
//! The passes are interleaved: [`analysis::analyze`] invokes the marker at
//! the point in the battery where its preconditions hold.

pub mod analysis;
mod error;
pub mod left_recursion;

pub use analysis::analyze;
pub use error::AnalysisError;
pub use left_recursion::mark_left_recursion;
