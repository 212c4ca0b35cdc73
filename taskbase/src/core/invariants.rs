//! Semantic invariants not expressible via JSON Schema.

use std::collections::BTreeSet;

use crate::core::naming::{ParsedFileName, TreeRole, validate_name};
use crate::core::ordering::order_mismatch;
use crate::registry::{Registry, SectionOrder};

/// Check registry invariants:
/// - Record names are valid file-name components
/// - No duplicate names within a subsection
pub fn validate_registry(registry: &Registry) -> Vec<String> {
    let mut errors = Vec::new();
    for (section, subsections) in &registry.sections {
        for (subsection, records) in subsections {
            let mut seen = BTreeSet::new();
            for (index, record) in records.iter().enumerate() {
                let path = format!("{}/{}#{}", section, subsection, index + 1);
                if let Err(err) = validate_name(&record.name) {
                    errors.push(format!("{path}: {err}"));
                }
                if !seen.insert(record.name.as_str()) {
                    errors.push(format!("{path}: duplicate name '{}'", record.name));
                }
            }
        }
    }
    errors
}

/// Check that every section's display order lists exactly its subsections.
pub fn validate_section_order(registry: &Registry, order: &SectionOrder) -> Vec<String> {
    let mut errors = Vec::new();
    for (section, subsections) in &registry.sections {
        match order.subsections(section) {
            None => errors.push(format!("{section}: no section order entry")),
            Some(listed) => {
                if let Some(detail) = order_mismatch(listed, subsections.keys().map(String::as_str))
                {
                    errors.push(format!("{section}: {detail}"));
                }
            }
        }
    }
    for section in order.sections.keys() {
        if !registry.sections.contains_key(section) {
            errors.push(format!("{section}: ordered but not in registry"));
        }
    }
    errors
}

/// Compare one subsection directory listing against the registry's names.
///
/// The files must carry ordinals exactly `1..=N`, one per ordinal, and the name
/// at each ordinal must equal the registry record's name at the same index.
pub fn validate_mirror_listing(
    role: TreeRole,
    location: &str,
    expected: &[&str],
    found: &[ParsedFileName],
) -> Vec<String> {
    let mut errors = Vec::new();
    let mut by_ordinal: Vec<Vec<&ParsedFileName>> = vec![Vec::new(); expected.len()];
    for file in found {
        match file.ordinal {
            None => errors.push(format!(
                "{location}: {} file '{}' has no ordinal prefix",
                role.as_str(),
                file.file_name
            )),
            Some(ordinal) if ordinal == 0 || ordinal > expected.len() => errors.push(format!(
                "{location}: {} file '{}' is outside 1..={}",
                role.as_str(),
                file.file_name,
                expected.len()
            )),
            Some(ordinal) => by_ordinal[ordinal - 1].push(file),
        }
    }
    for (index, files) in by_ordinal.iter().enumerate() {
        let ordinal = index + 1;
        match files.as_slice() {
            [] => errors.push(format!(
                "{location}: missing {} file for #{ordinal} '{}'",
                role.as_str(),
                expected[index]
            )),
            [file] if file.name != expected[index] => errors.push(format!(
                "{location}: {} file '{}' does not match registry name '{}'",
                role.as_str(),
                file.file_name,
                expected[index]
            )),
            [_] => {}
            many => errors.push(format!(
                "{location}: {} {} files share ordinal {ordinal}",
                many.len(),
                role.as_str()
            )),
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::naming::{Extensions, parse_file_name};
    use crate::test_support::{order_with, record, registry_with};

    fn parsed(role: TreeRole, files: &[&str]) -> Vec<ParsedFileName> {
        let ext = Extensions {
            task: ".tex".to_string(),
            solution: ".pdf".to_string(),
        };
        files
            .iter()
            .filter_map(|f| parse_file_name(role, f, &ext))
            .collect()
    }

    #[test]
    fn registry_duplicates_are_reported() {
        let mut registry = registry_with("algebra", "fractions", &["a", "b"]);
        registry
            .subsection_mut("algebra", "fractions")
            .expect("subsection")
            .push(record("a"));
        let errors = validate_registry(&registry);
        assert_eq!(errors, vec!["algebra/fractions#3: duplicate name 'a'"]);
    }

    #[test]
    fn section_order_mismatches_are_reported() {
        let registry = registry_with("algebra", "fractions", &["a"]);
        assert!(validate_section_order(&registry, &order_with("algebra", &["fractions"])).is_empty());

        let errors = validate_section_order(&registry, &order_with("geometry", &["angles"]));
        assert!(errors.iter().any(|e| e.contains("algebra: no section order entry")));
        assert!(errors.iter().any(|e| e.contains("geometry: ordered but not in registry")));
    }

    #[test]
    fn contiguous_listing_passes() {
        let found = parsed(TreeRole::Task, &["2_b.tex", "1_a.tex", "3_c.tex"]);
        let errors = validate_mirror_listing(TreeRole::Task, "s/u", &["a", "b", "c"], &found);
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn gaps_duplicates_and_name_mismatches_are_reported() {
        let found = parsed(
            TreeRole::Solution,
            &["1_a-sol.pdf", "1_x-sol.pdf", "3_b-sol.pdf", "loose-sol.pdf"],
        );
        let errors = validate_mirror_listing(TreeRole::Solution, "s/u", &["a", "b"], &found);
        assert!(errors.iter().any(|e| e.contains("no ordinal prefix")));
        assert!(errors.iter().any(|e| e.contains("outside 1..=2")));
        assert!(errors.iter().any(|e| e.contains("2 solution files share ordinal 1")));
        assert!(errors.iter().any(|e| e.contains("missing solution file for #2 'b'")));
    }
}
