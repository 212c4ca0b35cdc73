//! CLI command implementations. Each returns the process exit code.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use taskbase::add::{AddRequest, insert_task};
use taskbase::attributes::{remove_attribute, set_attribute};
use taskbase::base::TaskBase;
use taskbase::check::check_base;
use taskbase::core::filter::AttributeFilter;
use taskbase::exit_codes;
use taskbase::generate::{
    GenerateRequest, Selection, TypesetOutcome, generate as generate_document, load_selection,
};
use taskbase::io::init::{InitOptions, init_base};
use taskbase::reconcile::{ReconcileReport, reconcile_from_filesystem};
use taskbase::renumber;
use taskbase::reorder::reorder_subsection;

/// What `generate` should cover.
pub enum Scope {
    All,
    Section(String),
    Selection(PathBuf),
}

pub fn init(root: &Path, force: bool) -> Result<i32> {
    let paths = init_base(root, &InitOptions { force })?;
    println!("init: root={}", paths.root.display());
    Ok(exit_codes::OK)
}

pub fn add(
    root: &Path,
    section: String,
    subsection: String,
    stem: String,
    solution_stem: Option<String>,
    position: Option<usize>,
) -> Result<i32> {
    let base = open_reconciled(root)?;
    let report = insert_task(
        &base,
        &AddRequest {
            section,
            subsection,
            stem,
            solution_stem,
            position,
        },
    )?;
    println!(
        "add: name={} position={} shifted={}",
        report.name, report.position, report.shifted
    );
    Ok(exit_codes::OK)
}

pub fn move_task(
    root: &Path,
    section: &str,
    subsection: &str,
    old: usize,
    new: usize,
) -> Result<i32> {
    let base = open_reconciled(root)?;
    let report = renumber::move_task(&base, section, subsection, old, new)?;
    println!(
        "move: name={} position={} shifted={}",
        report.name, report.position, report.shifted
    );
    Ok(exit_codes::OK)
}

pub fn reorder(root: &Path, section: &str, subsection: &str, position: usize) -> Result<i32> {
    let base = TaskBase::open(root)?;
    let placed = reorder_subsection(&base, section, subsection, position)?;
    println!("reorder: subsection={subsection} position={placed}");
    Ok(exit_codes::OK)
}

pub fn reconcile(root: &Path) -> Result<i32> {
    let base = TaskBase::open(root)?;
    let report = reconcile_from_filesystem(&base)?;
    print_reconcile(&report);
    Ok(exit_codes::OK)
}

pub fn attr_set(
    root: &Path,
    section: &str,
    subsection: &str,
    position: usize,
    key: &str,
    value: i64,
) -> Result<i32> {
    let base = open_reconciled(root)?;
    let previous = set_attribute(&base, section, subsection, position, key, value)?;
    match previous {
        Some(previous) => println!("attr: {key}={value} (was {previous})"),
        None => println!("attr: {key}={value}"),
    }
    Ok(exit_codes::OK)
}

pub fn attr_unset(
    root: &Path,
    section: &str,
    subsection: &str,
    position: usize,
    key: &str,
) -> Result<i32> {
    let base = open_reconciled(root)?;
    match remove_attribute(&base, section, subsection, position, key)? {
        Some(value) => println!("attr: removed {key} (was {value})"),
        None => println!("attr: {key} not set"),
    }
    Ok(exit_codes::OK)
}

pub fn check(root: &Path) -> Result<i32> {
    let base = TaskBase::open(root)?;
    let report = check_base(&base)?;
    if report.is_consistent() {
        println!("check: ok");
        return Ok(exit_codes::OK);
    }
    for problem in &report.problems {
        println!("check: {problem}");
    }
    Ok(exit_codes::INCONSISTENT)
}

pub fn generate(
    root: &Path,
    scope: Scope,
    filters: &[String],
    name: String,
    typeset: bool,
) -> Result<i32> {
    let base = TaskBase::open(root)?;
    let selection = match scope {
        Scope::All => Selection::All,
        Scope::Section(section) => Selection::Section(section),
        Scope::Selection(file) => load_selection(&file)?,
    };
    let filters = filters
        .iter()
        .map(|raw| raw.parse::<AttributeFilter>())
        .collect::<Result<Vec<_>>>()
        .context("parse --where filters")?;
    let outcome = generate_document(
        &base,
        &GenerateRequest {
            selection,
            filters,
            name,
            typeset,
        },
    )?;
    println!(
        "generate: document={} tasks={} typeset={:?}",
        outcome.document.display(),
        outcome.tasks,
        outcome.typeset
    );
    Ok(match outcome.typeset {
        TypesetOutcome::Succeeded | TypesetOutcome::Skipped => exit_codes::OK,
        TypesetOutcome::Failed(_) | TypesetOutcome::TimedOut => exit_codes::INVALID,
    })
}

/// Open the base and rebuild the registry from disk before a mutation.
fn open_reconciled(root: &Path) -> Result<TaskBase> {
    let base = TaskBase::open(root)?;
    let report = reconcile_from_filesystem(&base).context("reconcile before mutation")?;
    debug!(records = report.records, renamed = report.renamed, "pre-mutation reconcile");
    Ok(base)
}

fn print_reconcile(report: &ReconcileReport) {
    println!(
        "reconcile: sections={} subsections={} records={} renamed={}",
        report.sections, report.subsections, report.records, report.renamed
    );
    for missing in &report.missing_solutions {
        println!("reconcile: missing solution {missing}");
    }
    for orphan in &report.orphan_solutions {
        println!("reconcile: orphan solution {orphan}");
    }
}
