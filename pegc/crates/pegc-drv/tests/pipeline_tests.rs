//! End-to-end pipeline tests: grammar text in, artifacts out.

use std::fs;

use pegc_drv::{Config, PipelineError, Session};
use pegc_util::ToDiagnostics;
use tempfile::TempDir;

/// Runs the full pipeline on `grammar`, returning the session result and
/// keeping the temp dir alive so artifact files can be inspected.
fn run(grammar: &str) -> (TempDir, Result<pegc_gen::GeneratedParser, PipelineError>) {
    let dir = TempDir::new().expect("temp dir");
    let input = dir.path().join("g.peg");
    fs::write(&input, grammar).expect("write grammar");

    let config = Config {
        input,
        output_dir: Some(dir.path().to_path_buf()),
        verbose: false,
    };
    let result = Session::new(config).run();
    (dir, result)
}

fn run_ok(grammar: &str) -> (TempDir, pegc_gen::GeneratedParser) {
    let (dir, result) = run(grammar);
    (dir, result.expect("pipeline"))
}

fn first_diagnostic(grammar: &str) -> String {
    let (_dir, result) = run(grammar);
    let error = result.expect_err("pipeline should fail");
    error.to_diagnostics()[0].render("g.peg")
}

#[test]
fn test_artifacts_written_to_disk() {
    let (dir, generated) = run_ok("%name demo\ns = \"a\"");
    let hpp = fs::read_to_string(dir.path().join("demo.hpp")).expect("hpp written");
    let cpp = fs::read_to_string(dir.path().join("demo.cpp")).expect("cpp written");
    assert_eq!(hpp, generated.interface);
    assert_eq!(cpp, generated.implementation);
}

#[test]
fn test_default_name_from_input_stem() {
    let (dir, generated) = run_ok("s = \"a\"");
    assert_eq!(generated.name, "g");
    assert!(dir.path().join("g.hpp").exists());
    assert!(dir.path().join("g.cpp").exists());
}

// E1: two-literal sequence

#[test]
fn test_e1_literal_sequence() {
    let (_dir, generated) = run_ok("%root s\ns = \"a\" \"b\"");
    let cpp = &generated.implementation;
    assert!(cpp.contains("return rule__s();"));
    assert!(cpp.contains("== 'a'"));
    assert!(cpp.contains("== 'b'"));
    // the error handler plumbing the failing parse dispatches through
    assert!(cpp.contains("if (errorHandler) errorHandler(error.message, error.position);"));
}

// E2: semantic values through captures

#[test]
fn test_e2_semantic_value() {
    let (_dir, generated) = run_ok(
        "s<int> = n:num { $$ = n; }\nnum<int> = d:[0-9]+ { $$ = std::stoi(d); }",
    );
    let cpp = &generated.implementation;
    assert!(cpp.contains("std::optional<int> Parser::rule__s()"));
    assert!(cpp.contains("__rule_result = std::stoi(d);"));
    assert!(generated.interface.contains("using Result = std::optional<int>;"));
}

// E3: left-recursive sum builds left-leaning results via seed growing

#[test]
fn test_e3_left_recursive_sum() {
    let (_dir, generated) = run_ok(
        "sum<int> = l:sum \"+\" r:num { $$ = l + r; } | n:num { $$ = n; }\n\
         num<int> = d:[0-9]+ { $$ = std::stoi(d); }",
    );
    let cpp = &generated.implementation;
    assert!(cpp.contains("Parser::rule__sum_()"));
    assert!(cpp.contains("if (end_position <= last_position) break;"));
    assert!(cpp.contains("__rule_result = l + r;"));
}

// E4: lookahead consumes nothing

#[test]
fn test_e4_lookahead() {
    let (_dir, generated) = run_ok("s = &\"x\" .");
    let cpp = &generated.implementation;
    assert!(cpp.contains("== 'x'"));
    // only the dot moves the position
    assert_eq!(cpp.matches("this->position +=").count(), 1);
}

// E5: duplicate character-class diagnostic

#[test]
fn test_e5_duplicate_class_character() {
    assert_eq!(
        first_diagnostic("s = [aa]"),
        "g.peg:1:5: In the 's' rule, the character class has the same characters: a"
    );
}

// E6: unused-rule diagnostic lists each rule's position

#[test]
fn test_e6_unused_rules_listed_with_positions() {
    let (_dir, result) = run("s = \"a\"\ndead = \"b\"\ngone = \"c\"");
    let error = result.expect_err("unused rules");
    let rendered: Vec<String> = error
        .to_diagnostics()
        .iter()
        .map(|d| d.render("g.peg"))
        .collect();
    assert_eq!(
        rendered,
        vec![
            "g.peg:2:1: Rule 'dead' defined but not used",
            "g.peg:3:1: Rule 'gone' defined but not used",
        ]
    );
}

#[test]
fn test_lexical_error_diagnostic() {
    assert_eq!(first_diagnostic("s = @"), "g.peg:1:5: unknown character '@'");
}

#[test]
fn test_syntax_error_diagnostic() {
    assert_eq!(
        first_diagnostic("s = \"a\"\n= broken"),
        "g.peg:2:1: parsing fail, token: \"=\""
    );
}

#[test]
fn test_missing_input_is_io_error() {
    let config = Config::new("/nonexistent/grammar.peg");
    let error = Session::new(config).run().expect_err("missing file");
    assert!(matches!(error, PipelineError::Io { .. }));
}

#[test]
fn test_directives_flow_through() {
    let (_dir, generated) = run_ok(
        "%name calc\n%type \"int\"\n%root expr\n%hpp { struct Node; }\n%cpp { int depth = 0; }\n\
         expr = t\nt = \"x\"",
    );
    assert_eq!(generated.name, "calc");
    assert!(generated.interface.contains("using ExprResult = int;"));
    assert!(generated.interface.contains("struct Node;"));
    assert!(generated.implementation.contains("int depth = 0;"));
    assert!(generated.implementation.contains("return rule__expr();"));
}
