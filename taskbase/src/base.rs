//! An opened base root: config, resolved paths and store access.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::io::config::{BaseConfig, load_config};
use crate::io::mirror::Mirror;
use crate::io::order_store::{load_section_order, write_section_order};
use crate::io::paths::{BasePaths, config_path};
use crate::io::registry_store::{load_registry, write_registry};
use crate::registry::{Registry, SectionOrder};

#[derive(Debug, Clone)]
pub struct TaskBase {
    pub config: BaseConfig,
    pub paths: BasePaths,
}

impl TaskBase {
    /// Load `taskbase.toml` from `root` (defaults if absent) and resolve paths.
    pub fn open(root: &Path) -> Result<Self> {
        let config = load_config(&config_path(root))?;
        let paths = BasePaths::new(root, &config);
        debug!(root = %root.display(), "opened task base");
        Ok(Self { config, paths })
    }

    pub fn mirror(&self) -> Mirror {
        Mirror::new(
            &self.paths.task_root,
            &self.paths.solution_root,
            self.config.extensions(),
        )
    }

    pub fn load_registry(&self) -> Result<Registry> {
        load_registry(&self.paths.registry_path)
            .with_context(|| format!("load {}", self.paths.registry_path.display()))
    }

    pub fn load_section_order(&self) -> Result<SectionOrder> {
        load_section_order(&self.paths.section_order_path)
            .with_context(|| format!("load {}", self.paths.section_order_path.display()))
    }

    pub fn write_registry(&self, registry: &Registry) -> Result<()> {
        write_registry(&self.paths.registry_path, registry)
            .with_context(|| format!("write {}", self.paths.registry_path.display()))
    }

    pub fn write_section_order(&self, order: &SectionOrder) -> Result<()> {
        write_section_order(&self.paths.section_order_path, order)
            .with_context(|| format!("write {}", self.paths.section_order_path.display()))
    }
}
