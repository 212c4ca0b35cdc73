//! Registry load/save helpers with schema + invariant validation.

use std::path::Path;

use tracing::debug;

use crate::core::invariants::validate_registry;
use crate::error::Result;
use crate::io::json_store::{corrupt, load_validated, write_json_atomic};
use crate::registry::Registry;

const REGISTRY_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../schemas/registry/v1.schema.json"
));

/// Load and validate the registry from disk (schema + invariants).
pub fn load_registry(path: &Path) -> Result<Registry> {
    let registry: Registry = load_validated(path, REGISTRY_SCHEMA)?;
    let errors = validate_registry(&registry);
    if !errors.is_empty() {
        return Err(corrupt(
            path,
            format!("registry invariants failed: {}", errors.join("; ")),
        ));
    }
    debug!(
        sections = registry.sections.len(),
        records = registry.record_count(),
        "registry loaded"
    );
    Ok(registry)
}

/// Load the registry, or start empty if the file does not exist yet.
pub fn load_registry_or_default(path: &Path) -> Result<Registry> {
    if !path.exists() {
        debug!(path = %path.display(), "no registry yet, starting empty");
        return Ok(Registry::default());
    }
    load_registry(path)
}

/// Replace the registry on disk wholesale.
pub fn write_registry(path: &Path, registry: &Registry) -> Result<()> {
    write_json_atomic(path, registry)
}
