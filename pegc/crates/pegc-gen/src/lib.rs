//! pegc-gen - C++ code generator for analyzed pegc grammars.
//!
//! The generator walks the analyzed AST and produces two artifacts as
//! strings: an interface header declaring the `Parser` class, and an
//! implementation file with one method per rule plus a fixed runtime
//! surface (UTF-8 decoding, the packrat memo table, line/column lookup,
//! the error-handler plumbing and the public `parse()` entry point).
//!
//! Rule bodies are deterministic backtracking fragments: each alternative
//! is a labeled block, item failure jumps to the next alternative's label
//! (or `FAIL`), and every label restores the saved input position first.
//! Non-left-recursive rules consult and fill the memo table themselves;
//! left-recursive rules get a Warth-style seed-growing wrapper around a
//! private worker body.

mod error;
mod items;
mod rules;
mod runtime;
mod types;

pub use error::{CodeGenError, Result};
pub use types::CppType;

use indexmap::IndexMap;
use pegc_par::ast::{Grammar, Statement};

use types::sequence_result_type;

/// File extension of the emitted interface artifact.
pub const INTERFACE_EXTENSION: &str = "hpp";

/// File extension of the emitted implementation artifact.
pub const IMPLEMENTATION_EXTENSION: &str = "cpp";

/// Version stamp embedded in the generated file headers.
const GENERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The two emitted artifacts, ready to be written to disk.
#[derive(Clone, Debug)]
pub struct GeneratedParser {
    /// Parser name; also the output file stem.
    pub name: String,

    /// Interface header content (`<name>.hpp`).
    pub interface: String,

    /// Implementation content (`<name>.cpp`).
    pub implementation: String,
}

/// Code generator over an analyzed grammar.
///
/// The grammar must have passed semantic analysis: every rule reference
/// resolves, left-recursion flags are set, and capture/action invariants
/// hold. Violations surface here only as internal errors.
pub struct Generator<'a> {
    grammar: &'a Grammar,

    /// Input file name, embedded in the generated header comment.
    input_filename: String,

    /// Parser name: `%name` directive, or the input file stem.
    parser_name: String,

    /// The `ExprResult` type: `%type` directive, or `size_t`.
    expr_result: String,

    /// Entry-point rule name.
    root_rule: String,

    /// Result type per rule, in definition order; the index is the rule id
    /// used to key the memo table.
    return_types: IndexMap<String, CppType>,

    /// Interface artifact under construction.
    interface: String,

    /// Implementation artifact under construction.
    implementation: String,
}

impl<'a> Generator<'a> {
    /// Creates a generator for `grammar`, deriving the default parser name
    /// from `input_filename` (its stem up to the first `.`).
    pub fn new(grammar: &'a Grammar, input_filename: &str) -> Result<Self> {
        let parser_name = match grammar.name_directive() {
            Some(directive) => directive.name.clone(),
            None => input_filename
                .split('.')
                .next()
                .unwrap_or(input_filename)
                .to_string(),
        };

        let expr_result = grammar
            .rule_type_directive()
            .map(|t| t.type_name.clone())
            .unwrap_or_else(|| "size_t".to_string());

        let root_rule = grammar
            .root_rule_name()
            .ok_or_else(|| CodeGenError::Internal("grammar defines no rules".to_string()))?
            .to_string();

        let mut return_types = IndexMap::new();
        for rule in grammar.rules() {
            let result_type = match &rule.return_type {
                Some(raw) => CppType::optional(raw.clone()),
                None => rule
                    .sequences
                    .first()
                    .map(sequence_result_type)
                    .unwrap_or_else(CppType::boolean),
            };
            return_types.insert(rule.name.clone(), result_type);
        }

        Ok(Self {
            grammar,
            input_filename: input_filename.to_string(),
            parser_name,
            expr_result,
            root_rule,
            return_types,
            interface: String::new(),
            implementation: String::new(),
        })
    }

    /// Generates both artifacts.
    pub fn generate(mut self) -> Result<GeneratedParser> {
        self.write_interface_prologue();
        self.write_implementation_prologue();

        let grammar = self.grammar;
        let mut rule_id = 0usize;
        for statement in &grammar.statements {
            if let Statement::Rule(rule) = statement {
                self.gen_rule(rule, rule_id)?;
                rule_id += 1;
            }
        }

        self.write_runtime_helpers()?;
        self.write_interface_epilogue()?;

        Ok(GeneratedParser {
            name: self.parser_name,
            interface: self.interface,
            implementation: self.implementation,
        })
    }

    /// Looks up a rule's result type; analysis guarantees presence.
    fn rule_type(&self, name: &str) -> Result<&CppType> {
        self.return_types
            .get(name)
            .ok_or_else(|| CodeGenError::UnknownRule(name.to_string()))
    }

    /// Number of rules = size of the memo array.
    fn rule_count(&self) -> usize {
        self.return_types.len()
    }

    /// The root rule's result type.
    fn root_type(&self) -> Result<&CppType> {
        self.rule_type(&self.root_rule)
    }
}
