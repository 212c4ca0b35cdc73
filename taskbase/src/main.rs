//! `taskbase`: ordered task base with a registry mirrored onto two file trees.

mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use taskbase::error::TaskbaseError;
use taskbase::{exit_codes, logging};

#[derive(Parser)]
#[command(
    name = "taskbase",
    version,
    about = "Ordered task registry kept in sync with task and solution trees"
)]
struct Cli {
    /// Base root holding `taskbase.toml`, the stores and both trees.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the config, empty stores and directories.
    Init {
        /// Reset the stores even if `taskbase.toml` exists.
        #[arg(short, long)]
        force: bool,
    },
    /// Move a staged task into a subsection, shifting later tasks.
    Add {
        section: String,
        subsection: String,
        /// Staged file stem; also the task name.
        stem: String,
        /// Staged solution stem (defaults to `<stem>-sol`).
        #[arg(long)]
        solution: Option<String>,
        /// 1-based position (defaults to the end).
        #[arg(long)]
        position: Option<usize>,
    },
    /// Move a task to another position within its subsection.
    Move {
        section: String,
        subsection: String,
        old: usize,
        new: usize,
    },
    /// Change a subsection's display position within its section.
    Reorder {
        section: String,
        subsection: String,
        position: usize,
    },
    /// Rebuild the registry from the task tree and renumber both trees.
    Reconcile,
    /// Edit integer attributes of a task.
    Attr {
        #[command(subcommand)]
        action: AttrAction,
    },
    /// Report disagreements between registry, section order and trees.
    Check,
    /// Render (and typeset) a document of tasks.
    Generate {
        #[command(subcommand)]
        scope: GenerateScope,
        /// Attribute filter such as `difficulty>=2`; repeatable.
        #[arg(long = "where", global = true)]
        filters: Vec<String>,
        /// Output file stem.
        #[arg(long, global = true, default_value = "tasks")]
        name: String,
        /// Write the markup without running the typesetter.
        #[arg(long, global = true)]
        no_typeset: bool,
    },
}

#[derive(Subcommand)]
enum AttrAction {
    Set {
        section: String,
        subsection: String,
        position: usize,
        key: String,
        #[arg(allow_negative_numbers = true)]
        value: i64,
    },
    Unset {
        section: String,
        subsection: String,
        position: usize,
        key: String,
    },
}

#[derive(Subcommand)]
enum GenerateScope {
    /// Every section.
    All,
    /// One section.
    Section { section: String },
    /// Ordinals listed in a JSON file `{"section": {"subsection": [1, 2]}}`.
    Selection { file: PathBuf },
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            exit_code_for(&err)
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let args = Cli::parse();
    let root = args.root;
    match args.command {
        Command::Init { force } => cli::init(&root, force),
        Command::Add {
            section,
            subsection,
            stem,
            solution,
            position,
        } => cli::add(&root, section, subsection, stem, solution, position),
        Command::Move {
            section,
            subsection,
            old,
            new,
        } => cli::move_task(&root, &section, &subsection, old, new),
        Command::Reorder {
            section,
            subsection,
            position,
        } => cli::reorder(&root, &section, &subsection, position),
        Command::Reconcile => cli::reconcile(&root),
        Command::Attr { action } => match action {
            AttrAction::Set {
                section,
                subsection,
                position,
                key,
                value,
            } => cli::attr_set(&root, &section, &subsection, position, &key, value),
            AttrAction::Unset {
                section,
                subsection,
                position,
                key,
            } => cli::attr_unset(&root, &section, &subsection, position, &key),
        },
        Command::Check => cli::check(&root),
        Command::Generate {
            scope,
            filters,
            name,
            no_typeset,
        } => {
            let scope = match scope {
                GenerateScope::All => cli::Scope::All,
                GenerateScope::Section { section } => cli::Scope::Section(section),
                GenerateScope::Selection { file } => cli::Scope::Selection(file),
            };
            cli::generate(&root, scope, &filters, name, !no_typeset)
        }
    }
}

/// Desync gets its own code so scripts know to run `reconcile`.
fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<TaskbaseError>() {
        Some(typed) if typed.is_desync() => exit_codes::DESYNC,
        _ => exit_codes::INVALID,
    }
}
