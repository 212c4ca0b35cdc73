//! In-memory registry and section-order model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TaskbaseError};

/// One problem statement paired with its solution artifact.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskRecord {
    pub content: Vec<String>,
    pub name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, i64>,
}

impl TaskRecord {
    pub fn new(name: impl Into<String>, content: Vec<String>) -> Self {
        Self {
            content,
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }
}

/// Ordered records; index `i` is ordinal `i + 1` on disk.
pub type Subsection = Vec<TaskRecord>;

/// Subsection name -> records. Display order lives in [`SectionOrder`].
pub type Section = BTreeMap<String, Subsection>;

/// Section name -> section. Persisted as `tasks.json`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Registry {
    pub sections: BTreeMap<String, Section>,
}

impl Registry {
    pub fn section(&self, section: &str) -> Result<&Section> {
        self.sections
            .get(section)
            .ok_or_else(|| TaskbaseError::UnknownSection(section.to_string()))
    }

    pub fn subsection(&self, section: &str, subsection: &str) -> Result<&Subsection> {
        self.section(section)?
            .get(subsection)
            .ok_or_else(|| unknown_subsection(section, subsection))
    }

    pub fn subsection_mut(&mut self, section: &str, subsection: &str) -> Result<&mut Subsection> {
        self.sections
            .get_mut(section)
            .ok_or_else(|| TaskbaseError::UnknownSection(section.to_string()))?
            .get_mut(subsection)
            .ok_or_else(|| unknown_subsection(section, subsection))
    }

    /// Get or create an empty subsection. Returns `true` when it was created.
    pub fn ensure_subsection(&mut self, section: &str, subsection: &str) -> bool {
        let entry = self.sections.entry(section.to_string()).or_default();
        if entry.contains_key(subsection) {
            return false;
        }
        entry.insert(subsection.to_string(), Vec::new());
        true
    }

    /// Total number of records across all subsections.
    pub fn record_count(&self) -> usize {
        self.sections
            .values()
            .flat_map(|section| section.values())
            .map(Vec::len)
            .sum()
    }

    /// Look up a record by name within a subsection, if both exist.
    pub fn find_record(&self, section: &str, subsection: &str, name: &str) -> Option<&TaskRecord> {
        self.sections
            .get(section)?
            .get(subsection)?
            .iter()
            .find(|record| record.name == name)
    }
}

/// Section name -> display order of its subsections. Persisted as `section_order.json`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct SectionOrder {
    pub sections: BTreeMap<String, Vec<String>>,
}

impl SectionOrder {
    pub fn subsections(&self, section: &str) -> Option<&[String]> {
        self.sections.get(section).map(Vec::as_slice)
    }

    /// Append `subsection` to the section's order unless already listed.
    pub fn ensure_listed(&mut self, section: &str, subsection: &str) -> bool {
        let order = self.sections.entry(section.to_string()).or_default();
        if order.iter().any(|name| name == subsection) {
            return false;
        }
        order.push(subsection.to_string());
        true
    }
}

fn unknown_subsection(section: &str, subsection: &str) -> TaskbaseError {
    TaskbaseError::UnknownSubsection {
        section: section.to_string(),
        subsection: subsection.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{record, registry_with};

    #[test]
    fn registry_serializes_as_nested_mapping() {
        let registry = registry_with("algebra", "fractions", &["a"]);
        let value = serde_json::to_value(&registry).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({
                "algebra": {
                    "fractions": [
                        { "content": ["a content"], "name": "a", "attributes": {} }
                    ]
                }
            })
        );
    }

    #[test]
    fn attributes_default_to_empty_when_absent() {
        let parsed: TaskRecord =
            serde_json::from_str(r#"{"content": ["x"], "name": "x"}"#).expect("parse");
        assert!(parsed.attributes.is_empty());
    }

    #[test]
    fn lookups_report_unknown_keys() {
        let registry = registry_with("algebra", "fractions", &["a"]);
        assert!(matches!(
            registry.subsection("geometry", "fractions"),
            Err(TaskbaseError::UnknownSection(name)) if name == "geometry"
        ));
        assert!(matches!(
            registry.subsection("algebra", "powers"),
            Err(TaskbaseError::UnknownSubsection { .. })
        ));
    }

    #[test]
    fn ensure_subsection_creates_once() {
        let mut registry = Registry::default();
        assert!(registry.ensure_subsection("algebra", "fractions"));
        assert!(!registry.ensure_subsection("algebra", "fractions"));
        registry
            .subsection_mut("algebra", "fractions")
            .expect("subsection")
            .push(record("a"));
        assert_eq!(registry.record_count(), 1);
        assert!(registry.find_record("algebra", "fractions", "a").is_some());
    }

    #[test]
    fn ensure_listed_appends_only_new_names() {
        let mut order = SectionOrder::default();
        assert!(order.ensure_listed("algebra", "fractions"));
        assert!(order.ensure_listed("algebra", "powers"));
        assert!(!order.ensure_listed("algebra", "fractions"));
        assert_eq!(
            order.subsections("algebra"),
            Some(&["fractions".to_string(), "powers".to_string()][..])
        );
    }
}
