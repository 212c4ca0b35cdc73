//! Orchestration for `taskbase add`: move a staged task into the base.
//!
//! A staged task is two files in the staging dir, `<stem><task_ext>` and
//! `<stem>-sol<solution_ext>`. The stem becomes the record name and the task
//! file's lines become its content.

use std::fs;

use anyhow::{Context, Result, bail};
use tracing::{debug, info, instrument};

use crate::base::TaskBase;
use crate::core::naming::{SOLUTION_SUFFIX, validate_name};
use crate::engine::{ShiftReport, insert_at};
use crate::io::mirror::StagedFiles;
use crate::registry::TaskRecord;

/// Inputs for [`insert_task`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddRequest {
    pub section: String,
    pub subsection: String,
    /// File stem in the staging dir; also the record name.
    pub stem: String,
    /// Explicit solution stem. Must be `<stem>-sol` when given.
    pub solution_stem: Option<String>,
    /// 1-based target position; `None` appends.
    pub position: Option<usize>,
}

/// Resolve the staged task and solution paths for `request`.
pub fn staged_files(base: &TaskBase, request: &AddRequest) -> Result<StagedFiles> {
    let expected = format!("{}{SOLUTION_SUFFIX}", request.stem);
    let solution_stem = match &request.solution_stem {
        Some(stem) if *stem != expected => {
            bail!("solution stem '{stem}' must be '{expected}' for task '{}'", request.stem)
        }
        Some(stem) => stem.clone(),
        None => expected,
    };
    let dir = &base.paths.staging_dir;
    Ok(StagedFiles {
        task: dir.join(format!("{}{}", request.stem, base.config.task_extension)),
        solution: dir.join(format!("{solution_stem}{}", base.config.solution_extension)),
    })
}

/// Insert a staged task at `request.position` (or the end), shifting later records.
///
/// A missing section or subsection is created in the registry, the section
/// order and both trees. Both stores are written only after every file is in place.
#[instrument(skip_all, fields(section = %request.section, subsection = %request.subsection, stem = %request.stem))]
pub fn insert_task(base: &TaskBase, request: &AddRequest) -> Result<ShiftReport> {
    validate_name(&request.stem)?;
    let staged = staged_files(base, request)?;
    let text = fs::read_to_string(&staged.task)
        .with_context(|| format!("read staged task {}", staged.task.display()))?;
    let record = TaskRecord::new(&request.stem, text.lines().map(str::to_string).collect());

    let mut registry = base.load_registry()?;
    let mut order = base.load_section_order()?;
    if registry.ensure_subsection(&request.section, &request.subsection) {
        debug!("creating subsection");
    }
    let len = registry
        .subsection(&request.section, &request.subsection)?
        .len();
    let position = request.position.unwrap_or(len + 1);

    let report = insert_at(
        &mut registry,
        &base.mirror(),
        &request.section,
        &request.subsection,
        position,
        record,
        &staged,
    )?;

    order.ensure_listed(&request.section, &request.subsection);
    base.write_registry(&registry)?;
    base.write_section_order(&order)?;
    info!(position = report.position, shifted = report.shifted, "added task");
    Ok(report)
}
