//! Canonical paths for a base root.

use std::path::{Path, PathBuf};

use crate::io::config::BaseConfig;

/// Config file name, always directly under the base root.
pub const CONFIG_FILE: &str = "taskbase.toml";

/// All resolved paths for a base root and its config.
#[derive(Debug, Clone)]
pub struct BasePaths {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub task_root: PathBuf,
    pub solution_root: PathBuf,
    pub staging_dir: PathBuf,
    pub output_dir: PathBuf,
    pub registry_path: PathBuf,
    pub section_order_path: PathBuf,
}

impl BasePaths {
    pub fn new(root: impl Into<PathBuf>, config: &BaseConfig) -> Self {
        let root = root.into();
        Self {
            config_path: config_path(&root),
            task_root: root.join(&config.task_dir),
            solution_root: root.join(&config.solution_dir),
            staging_dir: root.join(&config.staging_dir),
            output_dir: root.join(&config.output_dir),
            registry_path: root.join(&config.registry_file),
            section_order_path: root.join(&config.section_order_file),
            root,
        }
    }
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_entries_resolve_under_root_and_absolute_ones_stay() {
        let cfg = BaseConfig {
            output_dir: PathBuf::from("/tmp/taskbase-out"),
            ..BaseConfig::default()
        };
        let paths = BasePaths::new("/srv/base", &cfg);
        assert_eq!(paths.task_root, PathBuf::from("/srv/base/tasks"));
        assert_eq!(paths.registry_path, PathBuf::from("/srv/base/tasks.json"));
        assert_eq!(paths.config_path, PathBuf::from("/srv/base/taskbase.toml"));
        assert_eq!(paths.output_dir, PathBuf::from("/tmp/taskbase-out"));
    }
}
