//! Orchestration for `taskbase move`.

use anyhow::Result;
use tracing::info;

use crate::base::TaskBase;
use crate::engine::{ShiftReport, move_to};

/// Move the record at `old` to `new` within a subsection and persist the registry.
pub fn move_task(
    base: &TaskBase,
    section: &str,
    subsection: &str,
    old: usize,
    new: usize,
) -> Result<ShiftReport> {
    let mut registry = base.load_registry()?;
    let report = move_to(&mut registry, &base.mirror(), section, subsection, old, new)?;
    base.write_registry(&registry)?;
    info!(section, subsection, old, new, name = %report.name, "moved task");
    Ok(report)
}
