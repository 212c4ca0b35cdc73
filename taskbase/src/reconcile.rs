//! Rebuild the registry from the task tree and renumber both trees to match.
//!
//! The task tree is the source of truth for which records exist, their order
//! and their content. The previous registry contributes only attributes, looked
//! up by record name. Solution files follow their task by name.
//!
//! Every subsection is planned before the first rename, so collisions and
//! unreadable files abort with the mirror untouched. Renames then run in two
//! phases through hidden staging names, which lets any permutation of ordinals
//! go through without a target ever being occupied.

use std::collections::{BTreeMap, HashMap};
use std::fs;

use anyhow::{Context, Result};
use tracing::{debug, error, info, instrument, warn};

use crate::base::TaskBase;
use crate::core::naming::{ParsedFileName, TreeRole, file_name, mirror_order};
use crate::core::ordering::sync_section_order;
use crate::error::TaskbaseError;
use crate::io::mirror::{Mirror, STAGING_PREFIX};
use crate::io::order_store::load_section_order_or_default;
use crate::io::registry_store::load_registry_or_default;
use crate::registry::{Registry, TaskRecord};

/// Summary of a reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub sections: usize,
    pub subsections: usize,
    pub records: usize,
    /// Files whose name changed.
    pub renamed: usize,
    /// `section/subsection/name` of records without a solution file.
    pub missing_solutions: Vec<String>,
    /// Solution files matching no task, left in place.
    pub orphan_solutions: Vec<String>,
}

#[derive(Debug)]
struct SubsectionPlan {
    section: String,
    subsection: String,
    records: Vec<PlannedRecord>,
    renames: Vec<FileRename>,
}

#[derive(Debug)]
struct PlannedRecord {
    name: String,
    content: Vec<String>,
}

#[derive(Debug, Clone)]
struct FileRename {
    role: TreeRole,
    from: String,
    to: String,
}

/// Re-derive the registry and section order from the trees and persist both.
#[instrument(skip_all)]
pub fn reconcile_from_filesystem(base: &TaskBase) -> Result<ReconcileReport> {
    let previous = load_registry_or_default(&base.paths.registry_path)
        .with_context(|| format!("load {}", base.paths.registry_path.display()))?;
    let previous_order = load_section_order_or_default(&base.paths.section_order_path)
        .with_context(|| format!("load {}", base.paths.section_order_path.display()))?;
    let mirror = base.mirror();

    let mut report = ReconcileReport::default();
    let plans = plan_all(&mirror, &mut report)?;
    report.renamed = execute(&mirror, &plans)?;

    let registry = rebuild_registry(&previous, plans);
    let order = sync_section_order(&previous_order, &registry);
    report.sections = registry.sections.len();
    report.subsections = registry.sections.values().map(|s| s.len()).sum();
    report.records = registry.record_count();

    base.write_registry(&registry)?;
    base.write_section_order(&order)?;
    for missing in &report.missing_solutions {
        warn!(record = %missing, "no solution file");
    }
    for orphan in &report.orphan_solutions {
        warn!(file = %orphan, "solution file has no matching task");
    }
    info!(
        records = report.records,
        renamed = report.renamed,
        "reconciled registry from filesystem"
    );
    Ok(report)
}

fn plan_all(mirror: &Mirror, report: &mut ReconcileReport) -> Result<Vec<SubsectionPlan>> {
    let mut plans = Vec::new();
    for section in mirror.list_sections(TreeRole::Task)? {
        let subsections = mirror.list_subsections(TreeRole::Task, &section)?;
        for subsection in &subsections {
            plans.push(plan_subsection(mirror, &section, subsection, report)?);
        }
        for stray in mirror.list_subsections(TreeRole::Solution, &section)? {
            if !subsections.contains(&stray) {
                report_orphan_dir(mirror, &section, &stray, report)?;
            }
        }
    }
    let task_sections = mirror.list_sections(TreeRole::Task)?;
    for section in mirror.list_sections(TreeRole::Solution)? {
        if task_sections.contains(&section) {
            continue;
        }
        for subsection in mirror.list_subsections(TreeRole::Solution, &section)? {
            report_orphan_dir(mirror, &section, &subsection, report)?;
        }
    }
    Ok(plans)
}

fn plan_subsection(
    mirror: &Mirror,
    section: &str,
    subsection: &str,
    report: &mut ReconcileReport,
) -> crate::error::Result<SubsectionPlan> {
    let ext = mirror.extensions();
    let task_dir = mirror.subsection_dir(TreeRole::Task, section, subsection);
    let tasks = sorted_unique(mirror, TreeRole::Task, section, subsection)?;
    let solutions: HashMap<String, ParsedFileName> =
        sorted_unique(mirror, TreeRole::Solution, section, subsection)?
            .into_iter()
            .map(|file| (file.name.clone(), file))
            .collect();

    let mut records = Vec::with_capacity(tasks.len());
    let mut renames = Vec::new();
    for (index, task) in tasks.iter().enumerate() {
        let ordinal = index + 1;
        let path = task_dir.join(&task.file_name);
        let text = fs::read_to_string(&path).map_err(|err| TaskbaseError::io(&path, err))?;
        records.push(PlannedRecord {
            name: task.name.clone(),
            content: text.lines().map(str::to_string).collect(),
        });

        let target = file_name(TreeRole::Task, ordinal, &task.name, ext);
        if target != task.file_name {
            renames.push(FileRename {
                role: TreeRole::Task,
                from: task.file_name.clone(),
                to: target,
            });
        }
        match solutions.get(&task.name) {
            Some(solution) => {
                let target = file_name(TreeRole::Solution, ordinal, &task.name, ext);
                if target != solution.file_name {
                    renames.push(FileRename {
                        role: TreeRole::Solution,
                        from: solution.file_name.clone(),
                        to: target,
                    });
                }
            }
            None => report
                .missing_solutions
                .push(format!("{section}/{subsection}/{}", task.name)),
        }
    }

    let mut orphans: Vec<&ParsedFileName> = solutions
        .values()
        .filter(|solution| !tasks.iter().any(|task| task.name == solution.name))
        .collect();
    orphans.sort_by(|a, b| mirror_order(a, b));
    report.orphan_solutions.extend(
        orphans
            .into_iter()
            .map(|file| format!("{section}/{subsection}/{}", file.file_name)),
    );

    debug!(section, subsection, records = records.len(), renames = renames.len(), "planned subsection");
    Ok(SubsectionPlan {
        section: section.to_string(),
        subsection: subsection.to_string(),
        records,
        renames,
    })
}

/// List a subsection in mirror order, failing on two files that share a name.
///
/// Files left under the staging prefix by an interrupted run count as the file
/// they were headed for, so a second run picks them up instead of dropping them.
fn sorted_unique(
    mirror: &Mirror,
    role: TreeRole,
    section: &str,
    subsection: &str,
) -> crate::error::Result<Vec<ParsedFileName>> {
    let mut files = mirror.list(role, section, subsection)?;
    let staged = mirror.list_staged(role, section, subsection)?;
    if !staged.is_empty() {
        warn!(
            section,
            subsection,
            role = role.as_str(),
            count = staged.len(),
            "adopting files left by an interrupted reconcile"
        );
    }
    files.extend(staged);
    files.sort_by(mirror_order);
    let mut seen: HashMap<&str, &ParsedFileName> = HashMap::new();
    for file in &files {
        if seen.insert(file.name.as_str(), file).is_some() {
            return Err(TaskbaseError::NameCollision {
                path: mirror
                    .subsection_dir(role, section, subsection)
                    .join(&file.file_name),
            });
        }
    }
    Ok(files)
}

fn report_orphan_dir(
    mirror: &Mirror,
    section: &str,
    subsection: &str,
    report: &mut ReconcileReport,
) -> crate::error::Result<()> {
    let mut files = mirror.list(TreeRole::Solution, section, subsection)?;
    files.sort_by(mirror_order);
    report.orphan_solutions.extend(
        files
            .into_iter()
            .map(|file| format!("{section}/{subsection}/{}", file.file_name)),
    );
    Ok(())
}

/// Run every planned rename in two phases; returns the number of files renamed.
fn execute(mirror: &Mirror, plans: &[SubsectionPlan]) -> crate::error::Result<usize> {
    let steps: Vec<(&SubsectionPlan, &FileRename)> = plans
        .iter()
        .flat_map(|plan| plan.renames.iter().map(move |rename| (plan, rename)))
        .collect();
    let mut completed = 0usize;
    let mut run = |plan: &SubsectionPlan, role: TreeRole, from: &str, to: &str| {
        mirror
            .rename_in_dir(role, &plan.section, &plan.subsection, from, to)
            .map_err(|err| {
                let err = err.after_renames(completed);
                if err.is_desync() {
                    error!(err = %err, "reconcile aborted part-way");
                }
                err
            })?;
        completed += 1;
        Ok::<(), TaskbaseError>(())
    };

    for &(plan, rename) in &steps {
        let staged = staging_name(&rename.to);
        // Already sitting at its staging name from an interrupted run.
        if rename.from != staged {
            run(plan, rename.role, &rename.from, &staged)?;
        }
    }
    for &(plan, rename) in &steps {
        run(plan, rename.role, &staging_name(&rename.to), &rename.to)?;
    }
    Ok(steps.len())
}

fn staging_name(target: &str) -> String {
    format!("{STAGING_PREFIX}{target}")
}

fn rebuild_registry(previous: &Registry, plans: Vec<SubsectionPlan>) -> Registry {
    let mut unique_by_name: HashMap<&str, Option<&TaskRecord>> = HashMap::new();
    for record in previous
        .sections
        .values()
        .flat_map(|section| section.values())
        .flatten()
    {
        unique_by_name
            .entry(record.name.as_str())
            .and_modify(|slot| *slot = None)
            .or_insert(Some(record));
    }

    let mut registry = Registry::default();
    for plan in plans {
        let records = plan
            .records
            .into_iter()
            .map(|planned| {
                let attributes = previous
                    .find_record(&plan.section, &plan.subsection, &planned.name)
                    .or_else(|| unique_by_name.get(planned.name.as_str()).copied().flatten())
                    .map(|record| record.attributes.clone())
                    .unwrap_or_default();
                TaskRecord {
                    content: planned.content,
                    name: planned.name,
                    attributes,
                }
            })
            .collect();
        registry
            .sections
            .entry(plan.section)
            .or_insert_with(BTreeMap::new)
            .insert(plan.subsection, records);
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{SeededBase, record_with_attributes};

    fn names(registry: &Registry, section: &str, subsection: &str) -> Vec<String> {
        registry
            .subsection(section, subsection)
            .expect("subsection")
            .iter()
            .map(|r| r.name.clone())
            .collect()
    }

    #[test]
    fn rebuilds_order_from_prefixes_and_keeps_attributes() {
        let seeded = SeededBase::new("algebra", "fractions", &["x", "y"]);
        let mut registry = seeded.registry();
        *registry.subsection_mut("algebra", "fractions").expect("sub") = vec![
            record_with_attributes("x", &[("difficulty", 3)]),
            record_with_attributes("y", &[("difficulty", 1)]),
        ];
        seeded.base.write_registry(&registry).expect("write");
        // Swap the files behind the registry's back: y is now first on disk.
        seeded.remove_task_file("1_x.tex");
        seeded.remove_task_file("2_y.tex");
        seeded.write_task_file("2_x.tex");
        seeded.write_task_file("1_y.tex");

        let report = reconcile_from_filesystem(&seeded.base).expect("reconcile");

        let rebuilt = seeded.registry();
        assert_eq!(names(&rebuilt, "algebra", "fractions"), vec!["y", "x"]);
        let records = rebuilt.subsection("algebra", "fractions").expect("sub");
        assert_eq!(records[0].attributes.get("difficulty"), Some(&1));
        assert_eq!(records[1].attributes.get("difficulty"), Some(&3));
        assert_eq!(records[0].content, vec!["stray content"]);
        assert_eq!(seeded.solution_files(), vec!["1_y-sol.pdf", "2_x-sol.pdf"]);
        assert_eq!(report.renamed, 2);
    }

    #[test]
    fn closes_gaps_and_numbers_unprefixed_files_last() {
        let seeded = SeededBase::new("algebra", "fractions", &["A", "B", "C"]);
        seeded.remove_task_file("2_B.tex");
        seeded.remove_solution_file("2_B-sol.pdf");
        seeded.write_task_file("new.tex");
        seeded.write_solution_file("new-sol.pdf");

        let report = reconcile_from_filesystem(&seeded.base).expect("reconcile");

        assert_eq!(seeded.task_files(), vec!["1_A.tex", "2_C.tex", "3_new.tex"]);
        assert_eq!(
            seeded.solution_files(),
            vec!["1_A-sol.pdf", "2_C-sol.pdf", "3_new-sol.pdf"]
        );
        assert_eq!(report.records, 3);
        assert!(report.missing_solutions.is_empty());
    }

    #[test]
    fn reports_missing_and_orphan_solutions_without_deleting() {
        let seeded = SeededBase::new("algebra", "fractions", &["A", "B"]);
        seeded.remove_solution_file("2_B-sol.pdf");
        seeded.write_solution_file("7_ghost-sol.pdf");

        let report = reconcile_from_filesystem(&seeded.base).expect("reconcile");

        assert_eq!(report.missing_solutions, vec!["algebra/fractions/B"]);
        assert_eq!(report.orphan_solutions, vec!["algebra/fractions/7_ghost-sol.pdf"]);
        assert!(seeded.solution_dir().join("7_ghost-sol.pdf").is_file());
    }

    #[test]
    fn duplicate_task_names_abort_before_any_rename() {
        let seeded = SeededBase::new("algebra", "fractions", &["A", "B"]);
        seeded.write_task_file("A.tex");
        seeded.write_task_file("9_zzz.tex");
        let before = seeded.registry();

        let err = reconcile_from_filesystem(&seeded.base).expect_err("collision");

        assert!(matches!(
            err.downcast_ref::<TaskbaseError>(),
            Some(TaskbaseError::NameCollision { .. })
        ));
        assert_eq!(seeded.task_files(), vec!["1_A.tex", "2_B.tex", "9_zzz.tex", "A.tex"]);
        assert_eq!(seeded.registry(), before);
    }

    #[test]
    fn picks_up_new_subsections_and_drops_vanished_ones() {
        let seeded = SeededBase::new("algebra", "fractions", &["A"]);
        seeded.seed("algebra", "powers", &["P"]);
        seeded.seed("geometry", "angles", &["G"]);
        fs::remove_dir_all(seeded.dir_of(TreeRole::Task, "algebra", "powers")).expect("rm");
        fs::remove_dir_all(seeded.dir_of(TreeRole::Solution, "algebra", "powers")).expect("rm");
        seeded
            .mirror()
            .ensure_subsection("algebra", "roots")
            .expect("mkdir");

        let report = reconcile_from_filesystem(&seeded.base).expect("reconcile");

        let order = seeded.section_order();
        assert_eq!(
            order.subsections("algebra"),
            Some(&["fractions".to_string(), "roots".to_string()][..])
        );
        assert_eq!(order.subsections("geometry"), Some(&["angles".to_string()][..]));
        assert_eq!(report.sections, 2);
        assert_eq!(report.subsections, 3);
    }

    #[test]
    fn attributes_follow_a_record_moved_to_another_subsection() {
        let seeded = SeededBase::new("algebra", "fractions", &["A"]);
        seeded.seed("algebra", "powers", &[]);
        let mut registry = seeded.registry();
        registry.subsection_mut("algebra", "fractions").expect("sub")[0]
            .attributes
            .insert("level".to_string(), 2);
        seeded.base.write_registry(&registry).expect("write");
        for role in TreeRole::BOTH {
            let file = file_name(role, 1, "A", seeded.mirror().extensions());
            fs::rename(
                seeded.dir_of(role, "algebra", "fractions").join(&file),
                seeded.dir_of(role, "algebra", "powers").join(&file),
            )
            .expect("move");
        }

        reconcile_from_filesystem(&seeded.base).expect("reconcile");

        let rebuilt = seeded.registry();
        assert!(rebuilt.subsection("algebra", "fractions").expect("sub").is_empty());
        let moved = &rebuilt.subsection("algebra", "powers").expect("sub")[0];
        assert_eq!(moved.attributes.get("level"), Some(&2));
    }

    #[test]
    fn failure_after_first_phase_started_is_desync() {
        use crate::test_support::FailingRenamer;

        let seeded = SeededBase::new("algebra", "fractions", &["A", "B"]);
        seeded.remove_task_file("1_A.tex");
        seeded.remove_solution_file("1_A-sol.pdf");
        let mirror = seeded
            .mirror()
            .with_renamer(Box::new(FailingRenamer::after(1)));
        let mut report = ReconcileReport::default();
        let plans = plan_all(&mirror, &mut report).expect("plan");

        let err = execute(&mirror, &plans).expect_err("desync");
        assert!(matches!(err, TaskbaseError::MirrorDesync { completed: 1, .. }));
    }

    #[test]
    fn rerun_after_interrupted_second_phase_keeps_staged_records() {
        use crate::check::check_base;
        use crate::test_support::FailingRenamer;

        let seeded = SeededBase::new("algebra", "fractions", &["A", "B", "C"]);
        let mut registry = seeded.registry();
        registry.subsection_mut("algebra", "fractions").expect("sub")[2]
            .attributes
            .insert("difficulty".to_string(), 4);
        seeded.base.write_registry(&registry).expect("write");
        seeded.remove_task_file("1_A.tex");
        seeded.remove_solution_file("1_A-sol.pdf");

        // Four staging renames succeed, then one final rename, then it stops.
        let mirror = seeded
            .mirror()
            .with_renamer(Box::new(FailingRenamer::after(5)));
        let mut report = ReconcileReport::default();
        let plans = plan_all(&mirror, &mut report).expect("plan");
        let err = execute(&mirror, &plans).expect_err("interrupted");
        assert!(matches!(err, TaskbaseError::MirrorDesync { completed: 5, .. }));
        let leftovers = |role| {
            fs::read_dir(seeded.dir_of(role, "algebra", "fractions"))
                .expect("read dir")
                .filter_map(|entry| entry.expect("entry").file_name().into_string().ok())
                .filter(|name| name.starts_with(STAGING_PREFIX))
                .count()
        };
        assert!(leftovers(TreeRole::Task) + leftovers(TreeRole::Solution) > 0);

        let report = reconcile_from_filesystem(&seeded.base).expect("rerun");

        assert_eq!(report.records, 2);
        let rebuilt = seeded.registry();
        assert_eq!(names(&rebuilt, "algebra", "fractions"), vec!["B", "C"]);
        assert_eq!(
            rebuilt.subsection("algebra", "fractions").expect("sub")[1]
                .attributes
                .get("difficulty"),
            Some(&4)
        );
        assert_eq!(seeded.task_files(), vec!["1_B.tex", "2_C.tex"]);
        assert_eq!(seeded.solution_files(), vec!["1_B-sol.pdf", "2_C-sol.pdf"]);
        assert_eq!(leftovers(TreeRole::Task), 0);
        assert_eq!(leftovers(TreeRole::Solution), 0);
        assert!(check_base(&seeded.base).expect("check").is_consistent());
    }
}
