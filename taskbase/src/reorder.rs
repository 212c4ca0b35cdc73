//! Orchestration for `taskbase reorder`: display order only, no file effect.

use anyhow::Result;
use tracing::{info, warn};

use crate::base::TaskBase;
use crate::core::ordering;

/// Move `subsection` to `position` in its section's display order.
///
/// Positions past the end clamp to last. On an unknown section or subsection
/// the failure is logged and returned, and the order file is not rewritten.
pub fn reorder_subsection(
    base: &TaskBase,
    section: &str,
    subsection: &str,
    position: usize,
) -> Result<usize> {
    let mut order = base.load_section_order()?;
    let placed = match ordering::reorder_subsection(&mut order, section, subsection, position) {
        Ok(placed) => placed,
        Err(err) => {
            warn!(section, subsection, position, err = %err, "reorder skipped");
            return Err(err.into());
        }
    };
    base.write_section_order(&order)?;
    info!(section, subsection, position = placed, "reordered subsection");
    Ok(placed)
}
