//! pegc-drv - Driver for the pegc pipeline.
//!
//! The driver composes the whole pipeline for a single grammar file:
//!
//! ```text
//! Grammar file (.peg)
//!        │
//!        ▼
//!   [Tokenizer]  ──▶ token list          (pegc-lex)
//!        │
//!        ▼
//!   [Parser]     ──▶ grammar AST         (pegc-par)
//!        │
//!        ▼
//!   [Analysis]   ──▶ checked, LR-marked  (pegc-sem)
//!        │
//!        ▼
//!   [Generator]  ──▶ <name>.hpp/.cpp     (pegc-gen)
//! ```
//!
//! Any stage error aborts the run; the CLI renders its diagnostics to
//! stderr in `file:line:col: message` form and exits with code 1.

use std::fs;
use std::path::PathBuf;

use thiserror::Error;

use pegc_gen::{CodeGenError, GeneratedParser, Generator, IMPLEMENTATION_EXTENSION, INTERFACE_EXTENSION};
use pegc_lex::{LexError, Tokenizer};
use pegc_par::{Parser, SyntaxError};
use pegc_sem::AnalysisError;
use pegc_util::{Diagnostic, ToDiagnostics};

/// Driver configuration for one invocation.
#[derive(Clone, Debug)]
pub struct Config {
    /// Path to the grammar file.
    pub input: PathBuf,

    /// Where to write the two artifacts; the current working directory
    /// when `None`.
    pub output_dir: Option<PathBuf>,

    /// Trace pipeline phases to stderr.
    pub verbose: bool,
}

impl Config {
    /// Creates a configuration for the given grammar file with defaults.
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output_dir: None,
            verbose: false,
        }
    }
}

/// Error from any stage of the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Tokenization failed
    #[error(transparent)]
    Lex(#[from] LexError),

    /// The grammar did not parse
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// A semantic check rejected the grammar
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// Code generation failed (internal)
    #[error(transparent)]
    CodeGen(#[from] CodeGenError),

    /// Reading the grammar or writing an artifact failed
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ToDiagnostics for PipelineError {
    fn to_diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            PipelineError::Lex(e) => e.to_diagnostics(),
            PipelineError::Syntax(e) => e.to_diagnostics(),
            PipelineError::Analysis(e) => e.to_diagnostics(),
            PipelineError::CodeGen(e) => e.to_diagnostics(),
            PipelineError::Io { .. } => vec![Diagnostic::new(self.to_string())],
        }
    }
}

/// One generator invocation: reads a grammar file, runs the pipeline, and
/// writes the two artifacts.
pub struct Session {
    /// Configuration for this run.
    pub config: Config,
}

impl Session {
    /// Creates a session for the given configuration.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// The file name used in diagnostics: the input path's base name.
    pub fn diagnostics_filename(&self) -> String {
        self.config
            .input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.config.input.display().to_string())
    }

    /// Runs the pipeline. On success the artifacts have been written and
    /// are also returned for inspection.
    pub fn run(&self) -> Result<GeneratedParser, PipelineError> {
        let source = fs::read_to_string(&self.config.input).map_err(|e| PipelineError::Io {
            path: self.config.input.clone(),
            source: e,
        })?;
        let filename = self.diagnostics_filename();

        if self.config.verbose {
            eprintln!("Tokenizing {}", filename);
        }
        let mut tokenizer = Tokenizer::new(&source);
        let tokens = tokenizer.tokenize()?;

        if self.config.verbose {
            eprintln!("Parsing {} tokens", tokens.len());
        }
        let mut grammar = Parser::new(tokens).parse()?;

        if self.config.verbose {
            eprintln!("Analyzing grammar");
        }
        pegc_sem::analyze(&mut grammar)?;

        if self.config.verbose {
            eprintln!("Generating parser");
        }
        let generated = Generator::new(&grammar, &filename)?.generate()?;

        let output_dir = self
            .config
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let interface_path = output_dir.join(format!("{}.{}", generated.name, INTERFACE_EXTENSION));
        let implementation_path =
            output_dir.join(format!("{}.{}", generated.name, IMPLEMENTATION_EXTENSION));

        fs::write(&interface_path, &generated.interface).map_err(|e| PipelineError::Io {
            path: interface_path.clone(),
            source: e,
        })?;
        fs::write(&implementation_path, &generated.implementation).map_err(|e| {
            PipelineError::Io {
                path: implementation_path.clone(),
                source: e,
            }
        })?;

        if self.config.verbose {
            eprintln!(
                "Wrote {} and {}",
                interface_path.display(),
                implementation_path.display()
            );
        }
        Ok(generated)
    }
}
