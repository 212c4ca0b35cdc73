//! Display order of subsections within a section.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Result, TaskbaseError};
use crate::registry::{Registry, SectionOrder};

/// Move `subsection` to 1-based `position` within its section's display order.
///
/// Positions past the end clamp to "last". Nothing is mutated unless the section
/// and subsection are both listed. Returns the position actually taken.
pub fn reorder_subsection(
    order: &mut SectionOrder,
    section: &str,
    subsection: &str,
    position: usize,
) -> Result<usize> {
    let names = order
        .sections
        .get_mut(section)
        .ok_or_else(|| TaskbaseError::UnknownSection(section.to_string()))?;
    let current = names
        .iter()
        .position(|name| name == subsection)
        .ok_or_else(|| TaskbaseError::UnknownSubsection {
            section: section.to_string(),
            subsection: subsection.to_string(),
        })?;
    if position == 0 {
        return Err(TaskbaseError::PositionOutOfRange {
            position,
            max: names.len(),
        });
    }
    let name = names.remove(current);
    let index = (position - 1).min(names.len());
    names.insert(index, name);
    Ok(index + 1)
}

/// Subsection names of `section` in display order, checked against the registry.
///
/// The order must list exactly the registry's subsections; anything missing or
/// extra is reported rather than defaulted.
pub fn ordered_subsections<'a>(
    order: &'a SectionOrder,
    registry: &Registry,
    section: &str,
) -> Result<&'a [String]> {
    let subsections = registry.section(section)?;
    let listed = order
        .subsections(section)
        .ok_or_else(|| TaskbaseError::SectionOrderMismatch {
            section: section.to_string(),
            detail: "no order entry for section".to_string(),
        })?;
    if let Some(detail) = order_mismatch(listed, subsections.keys().map(String::as_str)) {
        return Err(TaskbaseError::SectionOrderMismatch {
            section: section.to_string(),
            detail,
        });
    }
    Ok(listed)
}

/// Rebuild the section order after the registry was re-derived from disk.
///
/// Surviving subsections keep their relative order, new ones are appended in
/// name order, and vanished subsections or sections are dropped.
pub fn sync_section_order(order: &SectionOrder, registry: &Registry) -> SectionOrder {
    let mut sections = BTreeMap::new();
    for (section, subsections) in &registry.sections {
        let previous = order.subsections(section).unwrap_or(&[]);
        let mut synced: Vec<String> = Vec::with_capacity(subsections.len());
        for name in previous {
            if subsections.contains_key(name) && !synced.contains(name) {
                synced.push(name.clone());
            }
        }
        for name in subsections.keys() {
            if !synced.contains(name) {
                synced.push(name.clone());
            }
        }
        sections.insert(section.clone(), synced);
    }
    SectionOrder { sections }
}

/// Describe how `listed` differs from the set `expected`, or `None` if they match.
pub(crate) fn order_mismatch<'a>(
    listed: &[String],
    expected: impl IntoIterator<Item = &'a str>,
) -> Option<String> {
    let expected: BTreeSet<&str> = expected.into_iter().collect();
    let mut seen = BTreeSet::new();
    let mut problems = Vec::new();
    for name in listed {
        if !seen.insert(name.as_str()) {
            problems.push(format!("'{name}' listed twice"));
        } else if !expected.contains(name.as_str()) {
            problems.push(format!("'{name}' is not a subsection"));
        }
    }
    for name in expected.difference(&seen) {
        problems.push(format!("'{name}' missing from order"));
    }
    if problems.is_empty() {
        None
    } else {
        Some(problems.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{order_with, registry_with};

    fn names(order: &SectionOrder, section: &str) -> Vec<String> {
        order.subsections(section).expect("section").to_vec()
    }

    #[test]
    fn reorder_moves_subsection_to_position() {
        let mut order = order_with("algebra", &["a", "b", "c"]);
        let taken = reorder_subsection(&mut order, "algebra", "c", 1).expect("reorder");
        assert_eq!(taken, 1);
        assert_eq!(names(&order, "algebra"), vec!["c", "a", "b"]);
    }

    #[test]
    fn reorder_past_the_end_clamps_to_last() {
        let mut order = order_with("algebra", &["a", "b", "c"]);
        let taken = reorder_subsection(&mut order, "algebra", "a", 99).expect("reorder");
        assert_eq!(taken, 3);
        assert_eq!(names(&order, "algebra"), vec!["b", "c", "a"]);
    }

    #[test]
    fn reorder_unknown_keys_leave_order_untouched() {
        let mut order = order_with("algebra", &["a", "b"]);
        let before = order.clone();
        assert!(matches!(
            reorder_subsection(&mut order, "geometry", "a", 1),
            Err(TaskbaseError::UnknownSection(_))
        ));
        assert!(matches!(
            reorder_subsection(&mut order, "algebra", "z", 1),
            Err(TaskbaseError::UnknownSubsection { .. })
        ));
        assert!(reorder_subsection(&mut order, "algebra", "a", 0).is_err());
        assert_eq!(order, before);
    }

    #[test]
    fn ordered_subsections_requires_exact_match() {
        let mut registry = registry_with("algebra", "a", &["x"]);
        registry.ensure_subsection("algebra", "b");

        let order = order_with("algebra", &["b", "a"]);
        let listed = ordered_subsections(&order, &registry, "algebra").expect("ordered");
        assert_eq!(listed, &["b".to_string(), "a".to_string()][..]);

        let order = order_with("algebra", &["a"]);
        let err = ordered_subsections(&order, &registry, "algebra").expect_err("mismatch");
        assert!(err.to_string().contains("'b' missing from order"));

        let err = ordered_subsections(&SectionOrder::default(), &registry, "algebra")
            .expect_err("missing entry");
        assert!(matches!(err, TaskbaseError::SectionOrderMismatch { .. }));
    }

    #[test]
    fn sync_keeps_existing_order_and_appends_new() {
        let mut registry = registry_with("algebra", "c", &["x"]);
        registry.ensure_subsection("algebra", "a");
        registry.ensure_subsection("algebra", "d");
        let mut order = order_with("algebra", &["c", "gone", "a"]);
        order.ensure_listed("vanished", "x");

        let synced = sync_section_order(&order, &registry);
        assert_eq!(names(&synced, "algebra"), vec!["c", "a", "d"]);
        assert!(synced.subsections("vanished").is_none());
    }
}
