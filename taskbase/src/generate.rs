//! Orchestration for `taskbase generate`: render a document and typeset it.
//!
//! The generator reads a snapshot of the registry and section order and never
//! writes either. Sections appear in name order, subsections in display order,
//! and every task keeps its ordinal as its printed number.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::base::TaskBase;
use crate::core::filter::{AttributeFilter, matches_all};
use crate::core::ordering::ordered_subsections;
use crate::error::TaskbaseError;
use crate::io::document::{
    DocumentModel, DocumentSection, DocumentSubsection, DocumentTask, render_document,
};
use crate::io::process::run_with_timeout;
use crate::registry::{Registry, SectionOrder};

/// Ordinals picked per section and subsection, as read from a selection file.
pub type SelectedOrdinals = BTreeMap<String, BTreeMap<String, Vec<usize>>>;

/// Which records go into the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Section(String),
    Ordinals(SelectedOrdinals),
}

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub selection: Selection,
    pub filters: Vec<AttributeFilter>,
    /// Output file stem inside the output dir.
    pub name: String,
    /// Run the typesetter after writing the markup.
    pub typeset: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypesetOutcome {
    Succeeded,
    /// Exit code, or `None` when killed by a signal.
    Failed(Option<i32>),
    TimedOut,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOutcome {
    pub document: PathBuf,
    pub tasks: usize,
    pub typeset: TypesetOutcome,
}

/// Parse a selection file: `{"section": {"subsection": [1, 3]}}`.
pub fn load_selection(path: &Path) -> Result<Selection> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read selection {}", path.display()))?;
    let ordinals: SelectedOrdinals = serde_json::from_str(&raw)
        .with_context(|| format!("parse selection {}", path.display()))?;
    Ok(Selection::Ordinals(ordinals))
}

/// Project the registry onto a document model.
///
/// Subsections left without tasks after filtering are omitted, and so are
/// sections left without subsections.
pub fn build_model(
    registry: &Registry,
    order: &SectionOrder,
    selection: &Selection,
    filters: &[AttributeFilter],
) -> crate::error::Result<DocumentModel> {
    let mut sections = Vec::new();
    match selection {
        Selection::All => {
            for section in registry.sections.keys() {
                sections.extend(section_model(registry, order, section, None, filters)?);
            }
        }
        Selection::Section(section) => {
            sections.extend(section_model(registry, order, section, None, filters)?);
        }
        Selection::Ordinals(selected) => {
            for (section, picks) in selected {
                sections.extend(section_model(registry, order, section, Some(picks), filters)?);
            }
        }
    }
    Ok(DocumentModel { sections })
}

fn section_model(
    registry: &Registry,
    order: &SectionOrder,
    section: &str,
    picks: Option<&BTreeMap<String, Vec<usize>>>,
    filters: &[AttributeFilter],
) -> crate::error::Result<Option<DocumentSection>> {
    let mut subsections = Vec::new();
    if let Some(picks) = picks {
        for subsection in picks.keys() {
            registry.subsection(section, subsection)?;
        }
    }
    for subsection in ordered_subsections(order, registry, section)? {
        let records = registry.subsection(section, subsection)?;
        let ordinals: Vec<usize> = match picks {
            None => (1..=records.len()).collect(),
            Some(picks) => match picks.get(subsection) {
                None => continue,
                Some(ordinals) => ordinals.clone(),
            },
        };
        let mut tasks = Vec::with_capacity(ordinals.len());
        for ordinal in ordinals {
            let record = ordinal
                .checked_sub(1)
                .and_then(|index| records.get(index))
                .ok_or(TaskbaseError::PositionOutOfRange {
                    position: ordinal,
                    max: records.len(),
                })?;
            if matches_all(filters, record) {
                tasks.push(DocumentTask {
                    number: ordinal,
                    content: record.content.clone(),
                });
            }
        }
        if !tasks.is_empty() {
            subsections.push(DocumentSubsection {
                name: subsection.clone(),
                tasks,
            });
        }
    }
    Ok((!subsections.is_empty()).then(|| DocumentSection {
        name: section.to_string(),
        subsections,
    }))
}

/// Write `<output_dir>/<name><task_ext>` and optionally typeset it.
#[instrument(skip_all, fields(name = %request.name))]
pub fn generate(base: &TaskBase, request: &GenerateRequest) -> Result<GenerateOutcome> {
    let registry = base.load_registry()?;
    let order = base.load_section_order()?;
    let model = build_model(&registry, &order, &request.selection, &request.filters)?;
    let markup = render_document(&base.config.document, &model)?;

    let output_dir = &base.paths.output_dir;
    fs::create_dir_all(output_dir)
        .with_context(|| format!("create output dir {}", output_dir.display()))?;
    let document = output_dir.join(format!("{}{}", request.name, base.config.task_extension));
    fs::write(&document, markup).with_context(|| format!("write {}", document.display()))?;
    info!(document = %document.display(), tasks = model.task_count(), "wrote document");

    let typeset = if request.typeset {
        let outcome = typeset(base, &document);
        clean_auxiliary(output_dir, &request.name, &base.config.typesetter.clean_extensions);
        outcome?
    } else {
        TypesetOutcome::Skipped
    };
    Ok(GenerateOutcome {
        document,
        tasks: model.task_count(),
        typeset,
    })
}

fn typeset(base: &TaskBase, document: &Path) -> Result<TypesetOutcome> {
    let cfg = &base.config.typesetter;
    let (program, leading) = cfg
        .command
        .split_first()
        .ok_or_else(|| anyhow!("typesetter command is empty"))?;
    let mut args = leading.to_vec();
    args.push(format!(
        "-output-directory={}",
        base.paths.output_dir.display()
    ));
    args.push(document.display().to_string());

    let output = run_with_timeout(
        program,
        &args,
        &base.paths.output_dir,
        Duration::from_secs(cfg.timeout_secs),
        cfg.output_limit_bytes,
    )?;
    let outcome = if output.timed_out {
        TypesetOutcome::TimedOut
    } else if output.succeeded() {
        TypesetOutcome::Succeeded
    } else {
        TypesetOutcome::Failed(output.status.code())
    };
    if outcome != TypesetOutcome::Succeeded {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let lines: Vec<&str> = stdout.lines().collect();
        let tail = lines[lines.len().saturating_sub(20)..].join("\n");
        warn!(?outcome, output_tail = %tail, "typesetter did not succeed");
    }
    Ok(outcome)
}

/// Remove `<stem><ext>` from `dir` for every auxiliary extension. Best effort.
fn clean_auxiliary(dir: &Path, stem: &str, extensions: &[String]) {
    for ext in extensions {
        let path = dir.join(format!("{stem}{ext}"));
        match fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "removed auxiliary file"),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!(path = %path.display(), err = %err, "could not remove auxiliary file"),
        }
    }
}
