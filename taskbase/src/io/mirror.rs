//! Filesystem mirror: the task tree and the solution tree.
//!
//! Both trees are shaped `<root>/<section>/<subsection>/`. Every record owns one
//! file in each tree; [`Mirror::rename_pair`] and [`Mirror::place_pair`] always
//! touch both so callers cannot update one tree and forget the other.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::naming::{Extensions, ParsedFileName, TreeRole, file_name, parse_file_name};
use crate::error::{Result, TaskbaseError};

/// Prefix of the hidden names reconcile moves files through between its two
/// rename phases. A file still carrying it was interrupted mid-reconcile.
pub const STAGING_PREFIX: &str = ".taskbase-tmp-";

/// Single-file move primitive. Swappable so tests can inject failures.
pub trait Renamer {
    /// Move `from` to `to`. Must fail with `AlreadyExists` instead of overwriting.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// `fs::rename`, falling back to copy + remove across filesystems.
pub struct FsRenamer;

impl Renamer for FsRenamer {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        if to.exists() {
            return Err(io::Error::new(
                ErrorKind::AlreadyExists,
                format!("refusing to overwrite {}", to.display()),
            ));
        }
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::CrossesDevices => {
                debug!(from = %from.display(), to = %to.display(), "cross-device move, copying");
                fs::copy(from, to)?;
                fs::remove_file(from)
            }
            Err(err) => Err(err),
        }
    }
}

/// Source files for a record entering the mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFiles {
    pub task: PathBuf,
    pub solution: PathBuf,
}

pub struct Mirror {
    task_root: PathBuf,
    solution_root: PathBuf,
    extensions: Extensions,
    renamer: Box<dyn Renamer>,
}

impl Mirror {
    pub fn new(
        task_root: impl Into<PathBuf>,
        solution_root: impl Into<PathBuf>,
        extensions: Extensions,
    ) -> Self {
        Self {
            task_root: task_root.into(),
            solution_root: solution_root.into(),
            extensions,
            renamer: Box::new(FsRenamer),
        }
    }

    pub fn with_renamer(mut self, renamer: Box<dyn Renamer>) -> Self {
        self.renamer = renamer;
        self
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn root(&self, role: TreeRole) -> &Path {
        match role {
            TreeRole::Task => &self.task_root,
            TreeRole::Solution => &self.solution_root,
        }
    }

    pub fn subsection_dir(&self, role: TreeRole, section: &str, subsection: &str) -> PathBuf {
        self.root(role).join(section).join(subsection)
    }

    /// Path of the file `name` would have at `ordinal`.
    pub fn path_for(
        &self,
        role: TreeRole,
        section: &str,
        subsection: &str,
        ordinal: usize,
        name: &str,
    ) -> PathBuf {
        self.subsection_dir(role, section, subsection)
            .join(file_name(role, ordinal, name, &self.extensions))
    }

    /// Find the file currently holding `ordinal`, reading the prefix back from disk.
    pub fn locate(
        &self,
        role: TreeRole,
        section: &str,
        subsection: &str,
        ordinal: usize,
    ) -> Result<Option<PathBuf>> {
        let dir = self.subsection_dir(role, section, subsection);
        let mut matches = self
            .list(role, section, subsection)?
            .into_iter()
            .filter(|file| file.ordinal == Some(ordinal));
        let Some(first) = matches.next() else {
            return Ok(None);
        };
        if let Some(second) = matches.next() {
            return Err(TaskbaseError::NameCollision {
                path: dir.join(second.file_name),
            });
        }
        Ok(Some(dir.join(first.file_name)))
    }

    /// Mirror files in one subsection directory, in directory order.
    ///
    /// A missing directory lists as empty. Files with a foreign extension are skipped.
    pub fn list(
        &self,
        role: TreeRole,
        section: &str,
        subsection: &str,
    ) -> Result<Vec<ParsedFileName>> {
        let dir = self.subsection_dir(role, section, subsection);
        let mut files = Vec::new();
        for file in read_dir_names(&dir, EntryKind::File)? {
            match parse_file_name(role, &file, &self.extensions) {
                Some(parsed) => files.push(parsed),
                None => debug!(dir = %dir.display(), file = %file, "skipping non-mirror file"),
            }
        }
        Ok(files)
    }

    /// Files left under [`STAGING_PREFIX`], parsed as the file they were headed for.
    ///
    /// `file_name` keeps the hidden on-disk name; ordinal and name come from the target.
    pub fn list_staged(
        &self,
        role: TreeRole,
        section: &str,
        subsection: &str,
    ) -> Result<Vec<ParsedFileName>> {
        let dir = self.subsection_dir(role, section, subsection);
        let mut files = Vec::new();
        for file in read_dir_names(&dir, EntryKind::StagedFile)? {
            let Some(target) = file.strip_prefix(STAGING_PREFIX) else {
                continue;
            };
            if let Some(mut parsed) = parse_file_name(role, target, &self.extensions) {
                parsed.file_name = file;
                files.push(parsed);
            }
        }
        Ok(files)
    }

    /// Section directory names in a tree, sorted.
    pub fn list_sections(&self, role: TreeRole) -> Result<Vec<String>> {
        read_dir_names(self.root(role), EntryKind::Dir)
    }

    /// Subsection directory names in a section, sorted.
    pub fn list_subsections(&self, role: TreeRole, section: &str) -> Result<Vec<String>> {
        read_dir_names(&self.root(role).join(section), EntryKind::Dir)
    }

    /// Create the subsection directory in both trees.
    pub fn ensure_subsection(&self, section: &str, subsection: &str) -> Result<()> {
        for role in TreeRole::BOTH {
            let dir = self.subsection_dir(role, section, subsection);
            fs::create_dir_all(&dir).map_err(|err| TaskbaseError::io(&dir, err))?;
        }
        Ok(())
    }

    /// Rename a record's task and solution files from `from` to `to`.
    ///
    /// A failed task rename leaves nothing changed and surfaces as `Io`. A failed
    /// solution rename after the task rename went through is `MirrorDesync`; the
    /// task file is not moved back.
    pub fn rename_pair(
        &self,
        section: &str,
        subsection: &str,
        name: &str,
        from: usize,
        to: usize,
    ) -> Result<()> {
        let task_from = self.path_for(TreeRole::Task, section, subsection, from, name);
        let task_to = self.path_for(TreeRole::Task, section, subsection, to, name);
        let solution_from = self.path_for(TreeRole::Solution, section, subsection, from, name);
        let solution_to = self.path_for(TreeRole::Solution, section, subsection, to, name);
        self.move_pair(&task_from, &task_to, &solution_from, &solution_to)
    }

    /// Move staged files into the mirror as `name` at `ordinal`.
    pub fn place_pair(
        &self,
        section: &str,
        subsection: &str,
        name: &str,
        ordinal: usize,
        staged: &StagedFiles,
    ) -> Result<()> {
        let task_to = self.path_for(TreeRole::Task, section, subsection, ordinal, name);
        let solution_to = self.path_for(TreeRole::Solution, section, subsection, ordinal, name);
        self.move_pair(&staged.task, &task_to, &staged.solution, &solution_to)
    }

    /// Rename one file inside a subsection directory of `role`.
    pub fn rename_in_dir(
        &self,
        role: TreeRole,
        section: &str,
        subsection: &str,
        from_file: &str,
        to_file: &str,
    ) -> Result<()> {
        let dir = self.subsection_dir(role, section, subsection);
        self.move_file(&dir.join(from_file), &dir.join(to_file))
    }

    fn move_pair(
        &self,
        task_from: &Path,
        task_to: &Path,
        solution_from: &Path,
        solution_to: &Path,
    ) -> Result<()> {
        self.move_file(task_from, task_to)?;
        self.move_file(solution_from, solution_to)
            .map_err(|err| match err {
                TaskbaseError::Io { path, source } => {
                    warn!(path = %path.display(), "solution rename failed after task rename");
                    TaskbaseError::MirrorDesync {
                        completed: 1,
                        path,
                        source,
                    }
                }
                other => other,
            })
    }

    fn move_file(&self, from: &Path, to: &Path) -> Result<()> {
        debug!(from = %from.display(), to = %to.display(), "rename");
        self.renamer
            .rename(from, to)
            .map_err(|err| TaskbaseError::io(from, err))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    File,
    Dir,
    /// Files under [`STAGING_PREFIX`], which the other kinds skip as hidden.
    StagedFile,
}

/// Sorted names of the entries of `kind` in `dir`; empty if `dir` does not exist.
fn read_dir_names(dir: &Path, kind: EntryKind) -> Result<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(TaskbaseError::io(dir, err)),
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| TaskbaseError::io(dir, err))?;
        let file_type = entry
            .file_type()
            .map_err(|err| TaskbaseError::io(entry.path(), err))?;
        let wanted = match kind {
            EntryKind::File | EntryKind::StagedFile => file_type.is_file(),
            EntryKind::Dir => file_type.is_dir(),
        };
        if !wanted {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) if kind == EntryKind::StagedFile => {
                if name.starts_with(STAGING_PREFIX) {
                    names.push(name);
                }
            }
            Ok(name) if !name.starts_with('.') => names.push(name),
            Ok(_) => {}
            Err(raw) => warn!(dir = %dir.display(), name = ?raw, "skipping non-utf8 entry"),
        }
    }
    names.sort();
    Ok(names)
}
