//! Base configuration stored in `taskbase.toml` at the base root.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::naming::Extensions;

/// Base configuration (TOML).
///
/// Edited by hand. Every path is relative to the base root unless absolute.
/// Missing fields fall back to the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BaseConfig {
    /// Root of the task tree (`<task_dir>/<section>/<subsection>/`).
    pub task_dir: PathBuf,

    /// Root of the solution tree, shaped like the task tree.
    pub solution_dir: PathBuf,

    /// Where new task/solution files wait for `taskbase add`.
    pub staging_dir: PathBuf,

    /// Where generated documents and typesetter output land.
    pub output_dir: PathBuf,

    pub registry_file: PathBuf,
    pub section_order_file: PathBuf,

    /// Extension of task files, including the dot.
    pub task_extension: String,

    /// Extension of solution files, including the dot.
    pub solution_extension: String,

    pub typesetter: TypesetterConfig,
    pub document: DocumentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TypesetterConfig {
    /// Program and leading arguments; the output directory and input file are appended.
    pub command: Vec<String>,

    pub timeout_secs: u64,

    /// Auxiliary files removed from the output directory after every run.
    pub clean_extensions: Vec<String>,

    /// Truncate captured stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DocumentConfig {
    pub preamble: Vec<String>,
    pub end: Vec<String>,
    /// Label printed before each task number.
    pub task_label: String,
}

impl Default for TypesetterConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "pdflatex".to_string(),
                "-interaction=nonstopmode".to_string(),
            ],
            timeout_secs: 120,
            clean_extensions: [".aux", ".toc", ".out", ".snm", ".log"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            output_limit_bytes: 100_000,
        }
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            preamble: [
                r"\documentclass{article}",
                r"\usepackage[utf8]{inputenc}",
                r"\usepackage{graphicx}",
                r"\usepackage{amsmath}",
                r"\usepackage{geometry}",
                r"\newgeometry{tmargin=1.5cm, bmargin=1.5cm, lmargin=1.5cm, rmargin=1.5cm}",
                r"\begin{document}",
            ]
            .iter()
            .map(|line| line.to_string())
            .collect(),
            end: vec![r"\end{document}".to_string()],
            task_label: "Task".to_string(),
        }
    }
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            task_dir: PathBuf::from("tasks"),
            solution_dir: PathBuf::from("solutions"),
            staging_dir: PathBuf::from("staging"),
            output_dir: PathBuf::from("out"),
            registry_file: PathBuf::from("tasks.json"),
            section_order_file: PathBuf::from("section_order.json"),
            task_extension: ".tex".to_string(),
            solution_extension: ".pdf".to_string(),
            typesetter: TypesetterConfig::default(),
            document: DocumentConfig::default(),
        }
    }
}

impl BaseConfig {
    pub fn validate(&self) -> Result<()> {
        for (field, path) in [
            ("task_dir", &self.task_dir),
            ("solution_dir", &self.solution_dir),
            ("staging_dir", &self.staging_dir),
            ("output_dir", &self.output_dir),
            ("registry_file", &self.registry_file),
            ("section_order_file", &self.section_order_file),
        ] {
            if path.as_os_str().is_empty() {
                return Err(anyhow!("{field} must not be empty"));
            }
        }
        if self.task_dir == self.solution_dir {
            return Err(anyhow!("task_dir and solution_dir must differ"));
        }
        for (field, ext) in [
            ("task_extension", &self.task_extension),
            ("solution_extension", &self.solution_extension),
        ] {
            if ext.len() < 2 || !ext.starts_with('.') {
                return Err(anyhow!("{field} must look like '.ext' (got '{ext}')"));
            }
        }
        if self.typesetter.command.is_empty() || self.typesetter.command[0].trim().is_empty() {
            return Err(anyhow!("typesetter.command must be a non-empty array"));
        }
        if self.typesetter.timeout_secs == 0 {
            return Err(anyhow!("typesetter.timeout_secs must be > 0"));
        }
        if self.typesetter.output_limit_bytes == 0 {
            return Err(anyhow!("typesetter.output_limit_bytes must be > 0"));
        }
        Ok(())
    }

    pub fn extensions(&self) -> Extensions {
        Extensions {
            task: self.task_extension.clone(),
            solution: self.solution_extension.clone(),
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `BaseConfig::default()`.
pub fn load_config(path: &Path) -> Result<BaseConfig> {
    if !path.exists() {
        let cfg = BaseConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: BaseConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &BaseConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, buf)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, BaseConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("taskbase.toml");
        let cfg = BaseConfig {
            solution_extension: ".tex".to_string(),
            ..BaseConfig::default()
        };
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("taskbase.toml");
        fs::write(&path, "task_dir = \"zadania\"\n[typesetter]\ntimeout_secs = 5\n")
            .expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.task_dir, PathBuf::from("zadania"));
        assert_eq!(cfg.typesetter.timeout_secs, 5);
        assert_eq!(cfg.typesetter.command[0], "pdflatex");
        assert_eq!(cfg.solution_dir, PathBuf::from("solutions"));
    }

    #[test]
    fn rejects_bad_extensions() {
        let cfg = BaseConfig {
            task_extension: "tex".to_string(),
            ..BaseConfig::default()
        };
        let err = cfg.validate().expect_err("invalid");
        assert!(err.to_string().contains("task_extension"));
    }
}
