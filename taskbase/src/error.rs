//! Typed failures for registry and mirror operations.
//!
//! Orchestration code wraps these in `anyhow` context; the CLI recovers them with
//! `downcast_ref` to pick an exit code.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TaskbaseError>;

#[derive(Debug, Error)]
pub enum TaskbaseError {
    #[error("corrupt store {path}: {reason}")]
    CorruptStore { path: PathBuf, reason: String },

    #[error("unknown section '{0}'")]
    UnknownSection(String),

    #[error("unknown subsection '{subsection}' in section '{section}'")]
    UnknownSubsection { section: String, subsection: String },

    #[error("position {position} out of range 1..={max}")]
    PositionOutOfRange { position: usize, max: usize },

    #[error("task is already at position {0}")]
    NoOpMove(usize),

    #[error("invalid task name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("name collision: {path} already exists")]
    NameCollision { path: PathBuf },

    #[error("mirror file missing: {path} (run `taskbase reconcile`)")]
    MissingMirrorFile { path: PathBuf },

    #[error("section order for '{section}' does not match registry: {detail}")]
    SectionOrderMismatch { section: String, detail: String },

    #[error(
        "mirror desync after {completed} completed rename(s): {path}: {source} (run `taskbase reconcile`)"
    )]
    MirrorDesync {
        completed: usize,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TaskbaseError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Reclassify a failure that happened after `completed` file renames went through.
    ///
    /// A plain I/O failure becomes `MirrorDesync`; an inner desync adds its own count.
    pub fn after_renames(self, completed: usize) -> Self {
        match self {
            Self::Io { path, source } if completed > 0 => Self::MirrorDesync {
                completed,
                path,
                source,
            },
            Self::MirrorDesync {
                completed: inner,
                path,
                source,
            } => Self::MirrorDesync {
                completed: completed + inner,
                path,
                source,
            },
            other => other,
        }
    }

    /// True for the one failure that leaves the mirror half-renamed.
    pub fn is_desync(&self) -> bool {
        matches!(self, Self::MirrorDesync { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_display_human_readable_messages() {
        let err = TaskbaseError::UnknownSubsection {
            section: "algebra".to_string(),
            subsection: "fractions".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("fractions"));
        assert!(msg.contains("algebra"));

        let err = TaskbaseError::PositionOutOfRange {
            position: 7,
            max: 3,
        };
        assert_eq!(err.to_string(), "position 7 out of range 1..=3");
    }

    #[test]
    fn only_desync_is_flagged_as_desync() {
        let desync = TaskbaseError::MirrorDesync {
            completed: 2,
            path: PathBuf::from("tasks/a/b/3_x.tex"),
            source: std::io::Error::other("boom"),
        };
        assert!(desync.is_desync());
        assert!(!TaskbaseError::UnknownSection("a".to_string()).is_desync());
    }

    #[test]
    fn io_after_renames_becomes_desync() {
        let first = TaskbaseError::io("a", std::io::Error::other("boom")).after_renames(0);
        assert!(matches!(first, TaskbaseError::Io { .. }));

        let late = TaskbaseError::io("a", std::io::Error::other("boom")).after_renames(4);
        assert!(matches!(late, TaskbaseError::MirrorDesync { completed: 4, .. }));

        let nested = late.after_renames(2);
        assert!(matches!(nested, TaskbaseError::MirrorDesync { completed: 6, .. }));
    }
}
