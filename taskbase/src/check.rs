//! Read-only consistency check of registry, section order and both trees.

use anyhow::Result;
use tracing::{debug, info};

use crate::base::TaskBase;
use crate::core::invariants::{validate_mirror_listing, validate_registry, validate_section_order};
use crate::core::naming::TreeRole;
use crate::registry::Registry;

/// Problems found by [`check_base`], one human-readable line each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub problems: Vec<String>,
}

impl CheckReport {
    pub fn is_consistent(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Compare registry, section order and mirror without changing anything.
///
/// Store files that fail to load are errors, not problems: there is nothing
/// to compare against.
pub fn check_base(base: &TaskBase) -> Result<CheckReport> {
    let registry = base.load_registry()?;
    let order = base.load_section_order()?;
    let mirror = base.mirror();

    let mut problems = validate_registry(&registry);
    problems.extend(validate_section_order(&registry, &order));
    for (section, subsections) in &registry.sections {
        for (subsection, records) in subsections {
            let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
            let location = format!("{section}/{subsection}");
            for role in TreeRole::BOTH {
                let found = mirror.list(role, section, subsection)?;
                problems.extend(validate_mirror_listing(role, &location, &names, &found));
            }
        }
    }
    for role in TreeRole::BOTH {
        problems.extend(unregistered_dirs(base, &registry, role)?);
    }

    debug!(problems = problems.len(), "check finished");
    if problems.is_empty() {
        info!(records = registry.record_count(), "task base is consistent");
    }
    Ok(CheckReport { problems })
}

/// Subsection directories holding mirror files that the registry does not know.
fn unregistered_dirs(base: &TaskBase, registry: &Registry, role: TreeRole) -> Result<Vec<String>> {
    let mirror = base.mirror();
    let mut problems = Vec::new();
    for section in mirror.list_sections(role)? {
        for subsection in mirror.list_subsections(role, &section)? {
            if registry.subsection(&section, &subsection).is_ok() {
                continue;
            }
            let files = mirror.list(role, &section, &subsection)?;
            if !files.is_empty() {
                problems.push(format!(
                    "{section}/{subsection}: {} {} file(s) not in registry",
                    files.len(),
                    role.as_str()
                ));
            }
        }
    }
    Ok(problems)
}
