//! File naming scheme for the task and solution trees.
//!
//! A record at ordinal `n` is stored as `{n}_{name}{task_ext}` in the task tree
//! and `{n}_{name}-sol{solution_ext}` in the solution tree. The ordinal is read
//! back by splitting on the first `_`.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Result, TaskbaseError};

/// Marker appended to the record name in solution file names.
pub const SOLUTION_SUFFIX: &str = "-sol";

static ORDINAL_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)_(.+)$").expect("ordinal prefix regex is valid"));

/// Which of the two parallel trees a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeRole {
    Task,
    Solution,
}

impl TreeRole {
    pub const BOTH: [TreeRole; 2] = [TreeRole::Task, TreeRole::Solution];

    pub fn as_str(self) -> &'static str {
        match self {
            TreeRole::Task => "task",
            TreeRole::Solution => "solution",
        }
    }
}

/// File extensions for each tree, including the leading dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extensions {
    pub task: String,
    pub solution: String,
}

impl Extensions {
    pub fn for_role(&self, role: TreeRole) -> &str {
        match role {
            TreeRole::Task => &self.task,
            TreeRole::Solution => &self.solution,
        }
    }
}

/// A mirror file name split into its ordinal prefix and record name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFileName {
    pub file_name: String,
    /// `None` when the file has no numeric prefix (e.g. dropped in by hand).
    pub ordinal: Option<usize>,
    pub name: String,
}

/// Render the file name for `name` at `ordinal` in the given tree.
pub fn file_name(role: TreeRole, ordinal: usize, name: &str, extensions: &Extensions) -> String {
    let ext = extensions.for_role(role);
    match role {
        TreeRole::Task => format!("{ordinal}_{name}{ext}"),
        TreeRole::Solution => format!("{ordinal}_{name}{SOLUTION_SUFFIX}{ext}"),
    }
}

/// Parse a mirror file name. Returns `None` if the extension does not belong to `role`.
pub fn parse_file_name(
    role: TreeRole,
    file_name: &str,
    extensions: &Extensions,
) -> Option<ParsedFileName> {
    let stem = file_name.strip_suffix(extensions.for_role(role))?;
    if stem.is_empty() {
        return None;
    }
    let (ordinal, rest) = match ORDINAL_PREFIX_RE.captures(stem) {
        Some(caps) => match caps[1].parse::<usize>() {
            Ok(ordinal) => (Some(ordinal), caps.get(2)?.as_str()),
            Err(_) => (None, stem),
        },
        None => (None, stem),
    };
    let name = match role {
        TreeRole::Task => rest,
        TreeRole::Solution => rest.strip_suffix(SOLUTION_SUFFIX).unwrap_or(rest),
    };
    if name.is_empty() {
        return None;
    }
    Some(ParsedFileName {
        file_name: file_name.to_string(),
        ordinal,
        name: name.to_string(),
    })
}

/// Order used when rebuilding a subsection from disk.
///
/// Numbered files come first by ordinal, unnumbered files after them; ties are
/// broken by record name so the result does not depend on directory listing order.
pub fn mirror_order(a: &ParsedFileName, b: &ParsedFileName) -> Ordering {
    match (a.ordinal, b.ordinal) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.name.cmp(&b.name)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.name.cmp(&b.name),
    }
}

/// Reject names that cannot round-trip through a file name.
pub fn validate_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        Some("must not be empty")
    } else if name == "." || name == ".." {
        Some("must not be a relative path component")
    } else if name.contains(['/', '\\']) {
        Some("must not contain path separators")
    } else if name.chars().any(char::is_control) {
        Some("must not contain control characters")
    } else if name.trim() != name {
        Some("must not start or end with whitespace")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(TaskbaseError::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}
