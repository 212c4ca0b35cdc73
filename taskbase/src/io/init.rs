//! Scaffolding for a new base root.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing::info;

use crate::io::config::{BaseConfig, load_config, write_config};
use crate::io::order_store::write_section_order;
use crate::io::paths::{BasePaths, config_path};
use crate::io::registry_store::write_registry;
use crate::registry::{Registry, SectionOrder};

/// Options for `init_base`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, overwrite an existing config and empty both stores.
    pub force: bool,
}

/// Create the base layout in `root`: config, empty stores, and both trees.
///
/// Fails if `taskbase.toml` already exists unless `options.force` is set. With
/// `force`, an existing config is kept as-is (its paths are honoured) while the
/// registry and section order are reset; run `reconcile` afterwards to rebuild
/// them from the trees.
pub fn init_base(root: &Path, options: &InitOptions) -> Result<BasePaths> {
    let cfg_path = config_path(root);
    let config = if cfg_path.exists() {
        if !options.force {
            return Err(anyhow!(
                "taskbase init: {} already exists (use --force to overwrite)",
                cfg_path.display()
            ));
        }
        load_config(&cfg_path)?
    } else {
        let config = BaseConfig::default();
        write_config(&cfg_path, &config)?;
        config
    };

    let paths = BasePaths::new(root, &config);
    for dir in [
        &paths.task_root,
        &paths.solution_root,
        &paths.staging_dir,
        &paths.output_dir,
    ] {
        fs::create_dir_all(dir).with_context(|| format!("create directory {}", dir.display()))?;
    }
    write_registry(&paths.registry_path, &Registry::default())
        .context("write empty registry")?;
    write_section_order(&paths.section_order_path, &SectionOrder::default())
        .context("write empty section order")?;

    info!(root = %root.display(), "initialized task base");
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::order_store::load_section_order;
    use crate::io::registry_store::load_registry;

    /// Verifies init_base creates the config, both stores and every directory.
    #[test]
    fn init_creates_expected_layout() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = init_base(temp.path(), &InitOptions { force: false }).expect("init");

        assert!(paths.config_path.is_file());
        assert!(paths.task_root.is_dir());
        assert!(paths.solution_root.is_dir());
        assert!(paths.staging_dir.is_dir());
        assert!(paths.output_dir.is_dir());
        assert_eq!(
            load_registry(&paths.registry_path).expect("registry"),
            Registry::default()
        );
        assert_eq!(
            load_section_order(&paths.section_order_path).expect("order"),
            SectionOrder::default()
        );
        assert_eq!(
            fs::read_to_string(&paths.registry_path).expect("read"),
            "{}\n"
        );
    }

    #[test]
    fn init_without_force_refuses_existing_config() {
        let temp = tempfile::tempdir().expect("tempdir");
        init_base(temp.path(), &InitOptions { force: false }).expect("init");
        let err = init_base(temp.path(), &InitOptions { force: false }).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn init_with_force_keeps_custom_config_paths() {
        let temp = tempfile::tempdir().expect("tempdir");
        let custom = BaseConfig {
            task_dir: "zadania".into(),
            ..BaseConfig::default()
        };
        write_config(&config_path(temp.path()), &custom).expect("write config");

        let paths = init_base(temp.path(), &InitOptions { force: true }).expect("init");
        assert_eq!(paths.task_root, temp.path().join("zadania"));
        assert!(paths.task_root.is_dir());
    }
}
