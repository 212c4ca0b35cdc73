//! Section-order load/save helpers.

use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::io::json_store::{load_validated, write_json_atomic};
use crate::registry::SectionOrder;

const SECTION_ORDER_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../schemas/section_order/v1.schema.json"
));

/// Load the section order (schema-validated).
pub fn load_section_order(path: &Path) -> Result<SectionOrder> {
    let order: SectionOrder = load_validated(path, SECTION_ORDER_SCHEMA)?;
    debug!(sections = order.sections.len(), "section order loaded");
    Ok(order)
}

pub fn load_section_order_or_default(path: &Path) -> Result<SectionOrder> {
    if !path.exists() {
        return Ok(SectionOrder::default());
    }
    load_section_order(path)
}

/// Replace the section order on disk wholesale.
pub fn write_section_order(path: &Path, order: &SectionOrder) -> Result<()> {
    write_json_atomic(path, order)
}
