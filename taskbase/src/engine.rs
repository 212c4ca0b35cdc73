//! Renumbering engine: insertion-with-shift and move-with-shift.
//!
//! Both operations follow the same three phases:
//!
//! 1. Validate and preflight. Positions, names and every file the plan will
//!    touch are checked against the disk before anything is renamed.
//! 2. Execute the shift plan from [`crate::core::shift`] through
//!    [`Mirror::rename_pair`], then place the record at its slot.
//! 3. Apply the same change to the in-memory registry.
//!
//! A rename failing part-way is reported as `MirrorDesync` with the number of
//! file renames that already went through. Nothing is rolled back and the
//! registry is left untouched; `reconcile` rebuilds it from the trees.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::{debug, error, info, instrument};

use crate::core::naming::{TreeRole, validate_name};
use crate::core::shift::{
    Shift, check_insert_position, check_move_positions, insert_shifts, move_shifts, reposition,
};
use crate::error::{Result, TaskbaseError};
use crate::io::mirror::{Mirror, StagedFiles};
use crate::registry::{Registry, TaskRecord};

/// What an insert or move did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftReport {
    pub name: String,
    /// Final 1-based position of the record.
    pub position: usize,
    /// Number of other records whose ordinal changed.
    pub shifted: usize,
}

/// One record rename within a subsection.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PlannedRename {
    name: String,
    shift: Shift,
}

/// Insert `record` at 1-based `position`, moving `staged` files into the mirror.
///
/// The subsection must already exist in the registry.
#[instrument(skip_all, fields(section = %section, subsection = %subsection, position, name = %record.name))]
pub fn insert_at(
    registry: &mut Registry,
    mirror: &Mirror,
    section: &str,
    subsection: &str,
    position: usize,
    record: TaskRecord,
    staged: &StagedFiles,
) -> Result<ShiftReport> {
    let records = registry.subsection(section, subsection)?;
    check_insert_position(position, records.len())?;
    validate_name(&record.name)?;
    if records.iter().any(|existing| existing.name == record.name) {
        return Err(TaskbaseError::NameCollision {
            path: mirror.path_for(TreeRole::Task, section, subsection, position, &record.name),
        });
    }
    reject_stray_files(mirror, section, subsection, &record.name)?;

    let plan: Vec<PlannedRename> = insert_shifts(records.len(), position)
        .into_iter()
        .map(|shift| PlannedRename {
            name: records[shift.from - 1].name.clone(),
            shift,
        })
        .collect();
    preflight(mirror, section, subsection, &plan)?;
    for (role, source) in [
        (TreeRole::Task, &staged.task),
        (TreeRole::Solution, &staged.solution),
    ] {
        if !source.is_file() {
            return Err(TaskbaseError::io(
                source,
                std::io::Error::new(
                    ErrorKind::NotFound,
                    format!("staged {} file not found", role.as_str()),
                ),
            ));
        }
    }
    mirror.ensure_subsection(section, subsection)?;

    let mut journal = Journal::default();
    for step in &plan {
        journal.rename(mirror, section, subsection, step)?;
    }
    mirror
        .place_pair(section, subsection, &record.name, position, staged)
        .map_err(|err| journal.escalate(err))?;

    let name = record.name.clone();
    registry
        .subsection_mut(section, subsection)?
        .insert(position - 1, record);
    info!(shifted = plan.len(), "inserted task");
    Ok(ShiftReport {
        name,
        position,
        shifted: plan.len(),
    })
}

/// Move the record at `old` to `new` (both 1-based), shifting the records between.
#[instrument(skip_all, fields(section = %section, subsection = %subsection, old, new))]
pub fn move_to(
    registry: &mut Registry,
    mirror: &Mirror,
    section: &str,
    subsection: &str,
    old: usize,
    new: usize,
) -> Result<ShiftReport> {
    let records = registry.subsection(section, subsection)?;
    check_move_positions(old, new, records.len())?;
    let moved = records[old - 1].name.clone();

    let mut plan: Vec<PlannedRename> = move_shifts(old, new)
        .into_iter()
        .map(|shift| PlannedRename {
            name: records[shift.from - 1].name.clone(),
            shift,
        })
        .collect();
    let shifted = plan.len();
    // The moved record keeps its own file name until every other record is in
    // place, so its final rename always goes last.
    plan.push(PlannedRename {
        name: moved.clone(),
        shift: Shift { from: old, to: new },
    });
    preflight(mirror, section, subsection, &plan)?;

    let mut journal = Journal::default();
    for step in &plan {
        journal.rename(mirror, section, subsection, step)?;
    }

    reposition(registry.subsection_mut(section, subsection)?, old, new);
    info!(name = %moved, shifted, "moved task");
    Ok(ShiftReport {
        name: moved,
        position: new,
        shifted,
    })
}

/// Walk the plan against a simulated view of the disk.
///
/// Every source must exist when its step runs and every target must be free,
/// counting the effect of earlier steps. Failing here means nothing was renamed.
fn preflight(
    mirror: &Mirror,
    section: &str,
    subsection: &str,
    plan: &[PlannedRename],
) -> Result<()> {
    let mut overlay: HashMap<PathBuf, bool> = HashMap::new();
    let exists = |overlay: &HashMap<PathBuf, bool>, path: &PathBuf| {
        overlay.get(path).copied().unwrap_or_else(|| path.exists())
    };
    for step in plan {
        for role in TreeRole::BOTH {
            let from = mirror.path_for(role, section, subsection, step.shift.from, &step.name);
            let to = mirror.path_for(role, section, subsection, step.shift.to, &step.name);
            if !exists(&overlay, &from) {
                return Err(TaskbaseError::MissingMirrorFile { path: from });
            }
            if exists(&overlay, &to) {
                return Err(TaskbaseError::NameCollision { path: to });
            }
            overlay.insert(from, false);
            overlay.insert(to, true);
        }
    }
    debug!(steps = plan.len(), "preflight passed");
    Ok(())
}

/// Fail if any file in the subsection already carries `name`, whatever its ordinal.
fn reject_stray_files(mirror: &Mirror, section: &str, subsection: &str, name: &str) -> Result<()> {
    for role in TreeRole::BOTH {
        if let Some(stray) = mirror
            .list(role, section, subsection)?
            .into_iter()
            .find(|file| file.name == name)
        {
            return Err(TaskbaseError::NameCollision {
                path: mirror.subsection_dir(role, section, subsection).join(stray.file_name),
            });
        }
    }
    Ok(())
}

/// Counts completed file renames so a late failure can be reported as desync.
#[derive(Debug, Default)]
struct Journal {
    completed: usize,
}

impl Journal {
    fn rename(
        &mut self,
        mirror: &Mirror,
        section: &str,
        subsection: &str,
        step: &PlannedRename,
    ) -> Result<()> {
        mirror
            .rename_pair(section, subsection, &step.name, step.shift.from, step.shift.to)
            .map_err(|err| self.escalate(err))?;
        self.completed += 2;
        Ok(())
    }

    fn escalate(&self, err: TaskbaseError) -> TaskbaseError {
        let err = err.after_renames(self.completed);
        if err.is_desync() {
            error!(err = %err, "rename sequence aborted part-way");
        }
        err
    }
}
