//! pegc CLI - PEG parser generator.
//!
//! Takes a single grammar file and emits a standalone C++ packrat parser
//! next to the current working directory. Diagnostics go to stderr in
//! `file:line:col: message` form; the exit code is 0 on success and 1 on
//! any lexical, syntactic, semantic, or I/O error.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use pegc_drv::{Config, Session};
use pegc_util::ToDiagnostics;

/// Generates a recursive-descent packrat C++ parser from a PEG grammar.
#[derive(Parser, Debug)]
#[command(name = "pegc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Peg parser generator", long_about = None)]
struct Cli {
    /// Path to the grammar file
    path: PathBuf,

    /// Trace pipeline phases to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let session = Session::new(Config {
        input: cli.path,
        output_dir: None,
        verbose: cli.verbose,
    });
    let filename = session.diagnostics_filename();

    match session.run() {
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            for diagnostic in error.to_diagnostics() {
                eprintln!("{}", diagnostic.render(&filename));
            }
            ExitCode::FAILURE
        }
    }
}
