//! CLI tests: spawn the taskbase binary and check exit codes and effects.

use std::path::Path;
use std::process::{Command, Output};

use taskbase::exit_codes;
use taskbase::test_support::SeededBase;

fn taskbase(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_taskbase"))
        .arg("--root")
        .arg(root)
        .args(args)
        .output()
        .expect("spawn taskbase")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn init_refuses_to_run_twice_without_force() {
    let temp = tempfile::tempdir().expect("tempdir");

    let first = taskbase(temp.path(), &["init"]);
    assert_eq!(first.status.code(), Some(exit_codes::OK));
    assert!(temp.path().join("taskbase.toml").is_file());
    assert!(temp.path().join("tasks.json").is_file());

    let second = taskbase(temp.path(), &["init"]);
    assert_eq!(second.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&second.stderr).contains("already exists"));

    let forced = taskbase(temp.path(), &["init", "--force"]);
    assert_eq!(forced.status.code(), Some(exit_codes::OK));
}

#[test]
fn reorder_past_the_end_places_last() {
    let seeded = SeededBase::new("algebra", "fractions", &["A"]);
    seeded.seed("algebra", "powers", &["P"]);

    let output = taskbase(seeded.root(), &["reorder", "algebra", "fractions", "10"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(stdout(&output).contains("position=2"));
    assert_eq!(
        seeded.section_order().subsections("algebra"),
        Some(&["powers".to_string(), "fractions".to_string()][..])
    );
}

#[test]
fn move_renames_files_and_reports() {
    let seeded = SeededBase::new("algebra", "fractions", &["A", "B", "C"]);

    let output = taskbase(seeded.root(), &["move", "algebra", "fractions", "3", "1"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK), "{output:?}");
    assert!(stdout(&output).contains("move: name=C position=1 shifted=2"));
    assert_eq!(seeded.task_files(), vec!["1_C.tex", "2_A.tex", "3_B.tex"]);
}

#[test]
fn add_places_staged_files() {
    let seeded = SeededBase::new("algebra", "fractions", &["A"]);
    seeded.stage("B");

    let output = taskbase(
        seeded.root(),
        &["add", "algebra", "fractions", "B", "--position", "1"],
    );

    assert_eq!(output.status.code(), Some(exit_codes::OK), "{output:?}");
    assert_eq!(seeded.solution_files(), vec!["1_B-sol.pdf", "2_A-sol.pdf"]);
}

#[test]
fn invalid_requests_exit_invalid() {
    let seeded = SeededBase::new("algebra", "fractions", &["A", "B"]);

    let same = taskbase(seeded.root(), &["move", "algebra", "fractions", "2", "2"]);
    assert_eq!(same.status.code(), Some(exit_codes::INVALID));

    let unknown = taskbase(seeded.root(), &["reorder", "geometry", "angles", "1"]);
    assert_eq!(unknown.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&unknown.stderr).contains("unknown section 'geometry'"));
}

#[test]
fn check_reports_inconsistency_and_reconcile_fixes_it() {
    let seeded = SeededBase::new("algebra", "fractions", &["A", "B"]);
    seeded.write_task_file("5_C.tex");
    seeded.write_solution_file("5_C-sol.pdf");

    let check = taskbase(seeded.root(), &["check"]);
    assert_eq!(check.status.code(), Some(exit_codes::INCONSISTENT));

    let reconcile = taskbase(seeded.root(), &["reconcile"]);
    assert_eq!(reconcile.status.code(), Some(exit_codes::OK));
    assert!(stdout(&reconcile).contains("records=3 renamed=2"));

    let check = taskbase(seeded.root(), &["check"]);
    assert_eq!(check.status.code(), Some(exit_codes::OK));
}

#[test]
fn attr_set_then_generate_with_filter() {
    let seeded = SeededBase::new("algebra", "fractions", &["A", "B"]);

    let set = taskbase(
        seeded.root(),
        &["attr", "set", "algebra", "fractions", "2", "difficulty", "3"],
    );
    assert_eq!(set.status.code(), Some(exit_codes::OK), "{set:?}");

    let generate = taskbase(
        seeded.root(),
        &[
            "generate",
            "all",
            "--where",
            "difficulty>=2",
            "--name",
            "hard",
            "--no-typeset",
        ],
    );
    assert_eq!(generate.status.code(), Some(exit_codes::OK), "{generate:?}");
    let markup = std::fs::read_to_string(seeded.root().join("out/hard.tex")).expect("markup");
    assert!(markup.contains("B content"));
    assert!(!markup.contains("A content"));
}
