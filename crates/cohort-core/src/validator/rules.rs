//! Individual plan rules. Each check appends to a shared issue list.

use std::{
    collections::{HashMap, HashSet},
    sync::OnceLock,
};

use regex::Regex;

use super::{graph, Issue, Severity};
use crate::{
    config::ValidatorConfig,
    models::{PlanRecord, WorkorderId},
};

// Rule codes
pub const MALFORMED_DOCUMENT: &str = "malformed-document";
pub const INVALID_WORKORDER_ID: &str = "invalid-workorder-id";
pub const MISSING_SECTION: &str = "missing-section";
pub const DUPLICATE_TASK_ID: &str = "duplicate-task-id";
pub const UNKNOWN_DEPENDENCY: &str = "unknown-dependency";
pub const SELF_DEPENDENCY: &str = "self-dependency";
pub const DEPENDENCY_CYCLE: &str = "dependency-cycle";
pub const PLACEHOLDER_TEXT: &str = "placeholder-text";
pub const MISSING_ACCEPTANCE: &str = "missing-acceptance-criteria";
pub const EMPTY_PHASE: &str = "empty-phase";
pub const UNDECLARED_PHASE: &str = "undeclared-phase";
pub const NO_TASKS: &str = "no-tasks";
pub const SHORT_SECTION: &str = "short-section";
pub const INCONSISTENT_NAMING: &str = "inconsistent-naming";

fn placeholder_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"\b(?:TODO|TBD|FIXME|XXX)\b|\{\{[^}]*\}\}|\[(?i:insert|placeholder|fill in)[^\]]*\]|(?i:lorem ipsum)",
        )
        .expect("placeholder pattern is valid")
    })
}

fn snake_case_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("snake_case pattern is valid"))
}

/// First placeholder marker in `text`, if any.
pub fn find_placeholder(text: &str) -> Option<&str> {
    placeholder_regex().find(text).map(|m| m.as_str())
}

fn task_location(id: &str) -> String {
    format!("tasks[{id}]")
}

pub fn check_workorder(plan: &PlanRecord, issues: &mut Vec<Issue>) {
    if plan.workorder_id.trim().is_empty() {
        issues.push(Issue::new(
            Severity::Critical,
            INVALID_WORKORDER_ID,
            "workorder_id",
            "workorder_id is missing",
        ));
    } else if !WorkorderId::is_valid(&plan.workorder_id) {
        issues.push(Issue::new(
            Severity::Critical,
            INVALID_WORKORDER_ID,
            "workorder_id",
            format!(
                "workorder_id '{}' does not match WO-<SLUG>-<NNN>",
                plan.workorder_id
            ),
        ));
    }
}

pub fn check_sections(plan: &PlanRecord, config: &ValidatorConfig, issues: &mut Vec<Issue>) {
    for name in &config.required_sections {
        if !plan.sections.contains_key(name) {
            issues.push(Issue::new(
                Severity::Critical,
                MISSING_SECTION,
                format!("sections.{name}"),
                format!("required section '{name}' is missing"),
            ));
        }
    }

    for (name, body) in &plan.sections {
        let location = format!("sections.{name}");

        if let Some(marker) = find_placeholder(body) {
            issues.push(Issue::new(
                Severity::Major,
                PLACEHOLDER_TEXT,
                location.clone(),
                format!("section '{name}' contains unresolved placeholder '{marker}'"),
            ));
        }

        let length = body.trim().chars().count();
        if length < config.min_section_length {
            issues.push(Issue::new(
                Severity::Minor,
                SHORT_SECTION,
                location.clone(),
                format!(
                    "section '{name}' has {length} characters, minimum is {}",
                    config.min_section_length
                ),
            ));
        }

        let canonical = config.required_sections.iter().any(|s| s == name);
        if !canonical && !snake_case_regex().is_match(name) {
            issues.push(Issue::new(
                Severity::Minor,
                INCONSISTENT_NAMING,
                location,
                format!("section name '{name}' is not snake_case"),
            ));
        }
    }
}

pub fn check_tasks(plan: &PlanRecord, issues: &mut Vec<Issue>) {
    if plan.tasks.is_empty() {
        issues.push(Issue::new(
            Severity::Major,
            NO_TASKS,
            "tasks",
            "plan has no tasks",
        ));
        return;
    }

    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for task in &plan.tasks {
        if !seen.insert(task.id.as_str()) && reported.insert(task.id.as_str()) {
            issues.push(Issue::new(
                Severity::Critical,
                DUPLICATE_TASK_ID,
                task_location(&task.id),
                format!("task id '{}' is used more than once", task.id),
            ));
        }

        if task.completion_criterion().is_none() {
            issues.push(Issue::new(
                Severity::Major,
                MISSING_ACCEPTANCE,
                task_location(&task.id),
                format!("task '{}' has no measurable completion criterion", task.id),
            ));
        }
    }
}

pub fn check_phases(plan: &PlanRecord, issues: &mut Vec<Issue>) {
    if plan.phases.is_empty() {
        return;
    }

    for phase in &plan.phases {
        if plan.tasks_in_phase(phase).next().is_none() {
            issues.push(Issue::new(
                Severity::Major,
                EMPTY_PHASE,
                format!("phases.{phase}"),
                format!("phase '{phase}' has no tasks"),
            ));
        }
    }

    for task in &plan.tasks {
        if !plan.phases.contains(&task.phase) {
            issues.push(Issue::new(
                Severity::Major,
                UNDECLARED_PHASE,
                task_location(&task.id),
                format!("task '{}' uses undeclared phase '{}'", task.id, task.phase),
            ));
        }
    }
}

pub fn check_dependencies(plan: &PlanRecord, issues: &mut Vec<Issue>) {
    let ids: HashSet<&str> = plan.tasks.iter().map(|task| task.id.as_str()).collect();

    for task in &plan.tasks {
        for dependency in &task.dependencies {
            if dependency == &task.id {
                issues.push(Issue::new(
                    Severity::Critical,
                    SELF_DEPENDENCY,
                    task_location(&task.id),
                    format!("task '{}' depends on itself", task.id),
                ));
            } else if !ids.contains(dependency.as_str()) {
                issues.push(Issue::new(
                    Severity::Critical,
                    UNKNOWN_DEPENDENCY,
                    task_location(&task.id),
                    format!("task '{}' depends on unknown task '{dependency}'", task.id),
                ));
            }
        }
    }

    for cycle in graph::find_cycles(&plan.tasks) {
        let mut path = cycle.clone();
        path.push(cycle[0].clone());
        issues.push(Issue::new(
            Severity::Critical,
            DEPENDENCY_CYCLE,
            task_location(&cycle[0]),
            format!("dependency cycle: {}", path.join(" -> ")),
        ));
    }
}

/// Broad spelling families for task ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum IdStyle {
    /// `AUTH-001`, `SETUP_2`
    Upper,
    /// `auth-001`, `setup_2`
    Lower,
    /// `setupDatabase`, `Auth01a`
    Mixed,
}

fn id_style(id: &str) -> IdStyle {
    let has_upper = id.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = id.chars().any(|c| c.is_ascii_lowercase());
    match (has_upper, has_lower) {
        (true, false) => IdStyle::Upper,
        (false, _) => IdStyle::Lower,
        (true, true) => IdStyle::Mixed,
    }
}

pub fn check_naming(plan: &PlanRecord, issues: &mut Vec<Issue>) {
    let mut counts: HashMap<IdStyle, usize> = HashMap::new();
    let mut first_seen: Vec<IdStyle> = Vec::new();
    for task in &plan.tasks {
        let style = id_style(&task.id);
        *counts.entry(style).or_default() += 1;
        if !first_seen.contains(&style) {
            first_seen.push(style);
        }
    }
    if first_seen.len() < 2 {
        return;
    }

    // Ties go to the style that appears first.
    let majority = first_seen
        .iter()
        .copied()
        .fold(None::<(IdStyle, usize)>, |best, style| {
            let count = counts[&style];
            match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((style, count)),
            }
        })
        .map(|(style, _)| style);

    for task in &plan.tasks {
        if Some(id_style(&task.id)) != majority {
            issues.push(Issue::new(
                Severity::Minor,
                INCONSISTENT_NAMING,
                task_location(&task.id),
                format!(
                    "task id '{}' does not follow the naming style used by the other tasks",
                    task.id
                ),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_markers() {
        assert_eq!(find_placeholder("Scope: TODO: fill in"), Some("TODO"));
        assert_eq!(find_placeholder("owner is {{team}}"), Some("{{team}}"));
        assert_eq!(find_placeholder("see [Insert link here]"), Some("[Insert link here]"));
        assert_eq!(find_placeholder("Lorem ipsum dolor"), Some("Lorem ipsum"));
        assert_eq!(find_placeholder("a todo list feature is planned"), None);
        assert_eq!(find_placeholder("TODOS are tracked elsewhere"), None);
    }

    #[test]
    fn test_id_style() {
        assert_eq!(id_style("AUTH-001"), IdStyle::Upper);
        assert_eq!(id_style("auth-001"), IdStyle::Lower);
        assert_eq!(id_style("001"), IdStyle::Lower);
        assert_eq!(id_style("setupDb"), IdStyle::Mixed);
    }
}
