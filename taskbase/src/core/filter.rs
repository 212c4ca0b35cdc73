//! Attribute filters used to select records for documents.

use std::str::FromStr;
use std::sync::LazyLock;

use anyhow::{Result, anyhow};
use regex::Regex;

use crate::registry::TaskRecord;

static FILTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([^<>=!\s]+)\s*(>=|<=|!=|=|<|>)\s*(-?\d+)\s*$")
        .expect("attribute filter regex is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// `key <op> value` over a record's integer attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeFilter {
    pub key: String,
    pub comparison: Comparison,
    pub value: i64,
}

impl AttributeFilter {
    /// Records without the attribute never match.
    pub fn matches(&self, record: &TaskRecord) -> bool {
        let Some(&actual) = record.attributes.get(&self.key) else {
            return false;
        };
        match self.comparison {
            Comparison::Eq => actual == self.value,
            Comparison::Ne => actual != self.value,
            Comparison::Lt => actual < self.value,
            Comparison::Le => actual <= self.value,
            Comparison::Gt => actual > self.value,
            Comparison::Ge => actual >= self.value,
        }
    }
}

impl FromStr for AttributeFilter {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let caps = FILTER_RE
            .captures(raw)
            .ok_or_else(|| anyhow!("invalid filter '{raw}' (expected e.g. difficulty>=2)"))?;
        let comparison = match &caps[2] {
            "=" => Comparison::Eq,
            "!=" => Comparison::Ne,
            "<" => Comparison::Lt,
            "<=" => Comparison::Le,
            ">" => Comparison::Gt,
            _ => Comparison::Ge,
        };
        let value = caps[3]
            .parse::<i64>()
            .map_err(|err| anyhow!("invalid filter value in '{raw}': {err}"))?;
        Ok(Self {
            key: caps[1].to_string(),
            comparison,
            value,
        })
    }
}

/// True when `record` satisfies every filter.
pub fn matches_all(filters: &[AttributeFilter], record: &TaskRecord) -> bool {
    filters.iter().all(|filter| filter.matches(record))
}
