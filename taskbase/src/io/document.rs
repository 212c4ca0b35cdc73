//! Typesetting markup for generated task documents.

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use serde::Serialize;

use crate::io::config::DocumentConfig;

const DOCUMENT_TEMPLATE: &str = include_str!("templates/document.tex.j2");

/// Read-only projection of the registry handed to the template.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DocumentModel {
    pub sections: Vec<DocumentSection>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DocumentSection {
    pub name: String,
    pub subsections: Vec<DocumentSubsection>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DocumentSubsection {
    pub name: String,
    pub tasks: Vec<DocumentTask>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DocumentTask {
    /// Ordinal of the task within its subsection.
    pub number: usize,
    pub content: Vec<String>,
}

impl DocumentModel {
    pub fn task_count(&self) -> usize {
        self.sections
            .iter()
            .flat_map(|section| &section.subsections)
            .map(|subsection| subsection.tasks.len())
            .sum()
    }
}

/// Render the full document: preamble, one `\section` per section, one
/// `\subsection` per subsection, numbered tasks, closing lines.
pub fn render_document(config: &DocumentConfig, model: &DocumentModel) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("document", DOCUMENT_TEMPLATE)
        .context("load document template")?;
    let template = env.get_template("document")?;
    let rendered = template
        .render(context! {
            preamble => &config.preamble,
            end => &config.end,
            task_label => &config.task_label,
            sections => &model.sections,
        })
        .context("render document template")?;
    Ok(rendered)
}
