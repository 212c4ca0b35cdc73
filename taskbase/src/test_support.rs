//! Test-only helpers for building registries and on-disk task bases.

use std::cell::Cell;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use crate::base::TaskBase;
use crate::core::naming::{Extensions, TreeRole, file_name, mirror_order, parse_file_name};
use crate::io::init::{InitOptions, init_base};
use crate::io::mirror::{FsRenamer, Mirror, Renamer, StagedFiles};
use crate::registry::{Registry, SectionOrder, TaskRecord};

/// Create a deterministic record whose content is `"<name> content"`.
pub fn record(name: &str) -> TaskRecord {
    TaskRecord::new(name, vec![format!("{name} content")])
}

pub fn record_with_attributes(name: &str, attributes: &[(&str, i64)]) -> TaskRecord {
    let mut record = record(name);
    record.attributes = attributes
        .iter()
        .map(|(key, value)| (key.to_string(), *value))
        .collect();
    record
}

/// Registry holding one subsection with `names` in order.
pub fn registry_with(section: &str, subsection: &str, names: &[&str]) -> Registry {
    let mut registry = Registry::default();
    registry.ensure_subsection(section, subsection);
    if let Ok(records) = registry.subsection_mut(section, subsection) {
        records.extend(names.iter().map(|name| record(name)));
    }
    registry
}

pub fn order_with(section: &str, subsections: &[&str]) -> SectionOrder {
    let mut order = SectionOrder::default();
    order.sections.insert(
        section.to_string(),
        subsections.iter().map(|name| name.to_string()).collect(),
    );
    order
}

pub fn test_extensions() -> Extensions {
    Extensions {
        task: ".tex".to_string(),
        solution: ".pdf".to_string(),
    }
}

/// Renamer that performs `n` real renames and fails every one after that.
pub struct FailingRenamer {
    remaining: Cell<usize>,
}

impl FailingRenamer {
    pub fn after(n: usize) -> Self {
        Self {
            remaining: Cell::new(n),
        }
    }
}

impl Renamer for FailingRenamer {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let remaining = self.remaining.get();
        if remaining == 0 {
            return Err(io::Error::new(ErrorKind::PermissionDenied, "injected failure"));
        }
        self.remaining.set(remaining - 1);
        FsRenamer.rename(from, to)
    }
}

/// A default-config task base in a temp dir, seeded with consistent files,
/// registry and section order.
pub struct SeededBase {
    _temp: tempfile::TempDir,
    pub base: TaskBase,
    section: String,
    subsection: String,
}

impl SeededBase {
    /// Base with one subsection holding `names` at ordinals `1..=N`.
    pub fn new(section: &str, subsection: &str, names: &[&str]) -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        init_base(temp.path(), &InitOptions { force: false }).expect("init base");
        let base = TaskBase::open(temp.path()).expect("open base");
        let seeded = Self {
            _temp: temp,
            base,
            section: section.to_string(),
            subsection: subsection.to_string(),
        };
        seeded.seed(section, subsection, names);
        seeded
    }

    pub fn root(&self) -> &Path {
        &self.base.paths.root
    }

    /// Add (or replace) a subsection on disk and in both stores.
    pub fn seed(&self, section: &str, subsection: &str, names: &[&str]) {
        let mirror = self.mirror();
        mirror.ensure_subsection(section, subsection).expect("mkdir");
        let ext = test_extensions();
        for (index, name) in names.iter().enumerate() {
            let ordinal = index + 1;
            let task = mirror
                .subsection_dir(TreeRole::Task, section, subsection)
                .join(file_name(TreeRole::Task, ordinal, name, &ext));
            fs::write(task, format!("{name} content\n")).expect("write task");
            let solution = mirror
                .subsection_dir(TreeRole::Solution, section, subsection)
                .join(file_name(TreeRole::Solution, ordinal, name, &ext));
            fs::write(solution, format!("%PDF {name}\n")).expect("write solution");
        }

        let mut registry = self.base.load_registry().expect("load registry");
        registry
            .sections
            .entry(section.to_string())
            .or_default()
            .insert(
                subsection.to_string(),
                names.iter().map(|name| record(name)).collect(),
            );
        self.base.write_registry(&registry).expect("write registry");

        let mut order = self.base.load_section_order().expect("load order");
        order.ensure_listed(section, subsection);
        self.base.write_section_order(&order).expect("write order");
    }

    pub fn mirror(&self) -> Mirror {
        self.base.mirror()
    }

    pub fn registry(&self) -> Registry {
        self.base.load_registry().expect("load registry")
    }

    pub fn section_order(&self) -> SectionOrder {
        self.base.load_section_order().expect("load order")
    }

    /// Write `<name>.tex` and `<name>-sol.pdf` into the staging dir.
    pub fn stage(&self, name: &str) -> StagedFiles {
        let dir = &self.base.paths.staging_dir;
        fs::create_dir_all(dir).expect("mkdir staging");
        let task = dir.join(format!("{name}.tex"));
        let solution = dir.join(format!("{name}-sol.pdf"));
        fs::write(&task, format!("{name} content\n")).expect("write staged task");
        fs::write(&solution, format!("%PDF {name}\n")).expect("write staged solution");
        StagedFiles { task, solution }
    }

    pub fn task_dir(&self) -> PathBuf {
        self.dir_of(TreeRole::Task, &self.section, &self.subsection)
    }

    pub fn solution_dir(&self) -> PathBuf {
        self.dir_of(TreeRole::Solution, &self.section, &self.subsection)
    }

    pub fn dir_of(&self, role: TreeRole, section: &str, subsection: &str) -> PathBuf {
        self.mirror().subsection_dir(role, section, subsection)
    }

    /// Task file names of the seeded subsection, in ordinal order.
    pub fn task_files(&self) -> Vec<String> {
        self.files_in(TreeRole::Task, &self.section, &self.subsection)
    }

    /// Solution file names of the seeded subsection, in ordinal order.
    pub fn solution_files(&self) -> Vec<String> {
        self.files_in(TreeRole::Solution, &self.section, &self.subsection)
    }

    pub fn files_in(&self, role: TreeRole, section: &str, subsection: &str) -> Vec<String> {
        let ext = test_extensions();
        let dir = self.dir_of(role, section, subsection);
        let mut parsed: Vec<_> = fs::read_dir(&dir)
            .expect("read dir")
            .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
            .filter_map(|name| parse_file_name(role, &name, &ext))
            .collect();
        parsed.sort_by(mirror_order);
        parsed.into_iter().map(|file| file.file_name).collect()
    }

    pub fn write_task_file(&self, file: &str) {
        fs::write(self.task_dir().join(file), "stray content\n").expect("write task file");
    }

    pub fn write_solution_file(&self, file: &str) {
        fs::write(self.solution_dir().join(file), "%PDF stray\n").expect("write solution file");
    }

    pub fn remove_task_file(&self, file: &str) {
        fs::remove_file(self.task_dir().join(file)).expect("remove task file");
    }

    pub fn remove_solution_file(&self, file: &str) {
        fs::remove_file(self.solution_dir().join(file)).expect("remove solution file");
    }
}
