//! Orchestration for `taskbase attr`: integer attributes on a record.
//!
//! Attributes live only in the registry; no file is touched.

use anyhow::{Result, bail};
use tracing::info;

use crate::base::TaskBase;
use crate::error::TaskbaseError;
use crate::registry::{Registry, TaskRecord};

/// Set `key = value` on the record at `position`. Returns the previous value.
pub fn set_attribute(
    base: &TaskBase,
    section: &str,
    subsection: &str,
    position: usize,
    key: &str,
    value: i64,
) -> Result<Option<i64>> {
    if key.trim().is_empty() {
        bail!("attribute key must not be empty");
    }
    let mut registry = base.load_registry()?;
    let record = record_at(&mut registry, section, subsection, position)?;
    let previous = record.attributes.insert(key.to_string(), value);
    let name = record.name.clone();
    base.write_registry(&registry)?;
    info!(section, subsection, name = %name, key, value, "set attribute");
    Ok(previous)
}

/// Remove `key` from the record at `position`. Returns the removed value, if any.
pub fn remove_attribute(
    base: &TaskBase,
    section: &str,
    subsection: &str,
    position: usize,
    key: &str,
) -> Result<Option<i64>> {
    let mut registry = base.load_registry()?;
    let record = record_at(&mut registry, section, subsection, position)?;
    let removed = record.attributes.remove(key);
    if removed.is_some() {
        base.write_registry(&registry)?;
        info!(section, subsection, key, "removed attribute");
    }
    Ok(removed)
}

fn record_at<'a>(
    registry: &'a mut Registry,
    section: &str,
    subsection: &str,
    position: usize,
) -> crate::error::Result<&'a mut TaskRecord> {
    let records = registry.subsection_mut(section, subsection)?;
    let max = records.len();
    position
        .checked_sub(1)
        .and_then(|index| records.get_mut(index))
        .ok_or(TaskbaseError::PositionOutOfRange { position, max })
}
