//! Bounded fix-and-revalidate loop for plans that need refinement.

use std::collections::HashSet;

use indexmap::IndexMap;
use log::{debug, info, warn};

use super::{GateDecision, PlanValidator, ValidationReport};
use crate::models::PlanRecord;

/// Produces a revised plan from a plan and its latest report.
///
/// Returning `None` means the fixer has nothing more to offer.
pub trait PlanFixer {
    fn fix(&mut self, plan: &PlanRecord, report: &ValidationReport) -> Option<PlanRecord>;
}

/// Result of running the refinement loop.
#[derive(Debug, Clone)]
pub struct RefinementOutcome {
    /// Best plan reached without dropping below the refinement floor
    pub plan: PlanRecord,
    /// Report for the initial plan followed by one per accepted iteration
    pub reports: Vec<ValidationReport>,
}

impl RefinementOutcome {
    /// Report for [`RefinementOutcome::plan`].
    pub fn final_report(&self) -> &ValidationReport {
        // Always holds at least the initial report.
        &self.reports[self.reports.len() - 1]
    }

    /// Fix iterations that were applied.
    pub fn iterations(&self) -> usize {
        self.reports.len() - 1
    }
}

impl PlanValidator {
    /// Runs up to `max_refine_iterations` fix/re-validate rounds.
    ///
    /// The loop only starts when the initial decision is
    /// [`GateDecision::NeedsRefinement`]. It stops as soon as the plan passes,
    /// the fixer returns nothing or an unchanged plan, or a fix would push the
    /// score below the refinement floor (that fix is discarded).
    pub fn refine<F: PlanFixer + ?Sized>(
        &self,
        plan: PlanRecord,
        fixer: &mut F,
    ) -> RefinementOutcome {
        let initial = self.validate(&plan);
        let mut outcome = RefinementOutcome {
            plan,
            reports: vec![initial],
        };

        if outcome.final_report().decision != GateDecision::NeedsRefinement {
            debug!(
                "Skipping refinement, decision is {}",
                outcome.final_report().decision.as_str()
            );
            return outcome;
        }

        for iteration in 1..=self.config().max_refine_iterations {
            let Some(candidate) = fixer.fix(&outcome.plan, outcome.final_report()) else {
                debug!("Fixer produced no candidate at iteration {iteration}");
                break;
            };
            if candidate == outcome.plan {
                debug!("Fixer made no changes at iteration {iteration}");
                break;
            }

            let report = self.validate(&candidate);
            info!(
                "Refinement iteration {iteration}: score {} -> {}",
                outcome.final_report().score,
                report.score
            );

            if report.decision == GateDecision::ManualRevision {
                warn!(
                    "Discarding refinement iteration {iteration}: score {} is below the floor",
                    report.score
                );
                break;
            }

            let decision = report.decision;
            outcome.plan = candidate;
            outcome.reports.push(report);
            if decision == GateDecision::Pass {
                break;
            }
        }

        outcome
    }
}

/// Applies fixes that need no judgement.
///
/// - drops self-dependencies, dependencies on unknown tasks and repeated
///   dependency entries
/// - drops declared phases without tasks and declares phases used by tasks
/// - rewrites non-canonical section names to snake_case, unless another
///   section already uses the new name
///
/// Placeholders, missing criteria and cycles are left for a human.
#[derive(Debug, Default, Clone, Copy)]
pub struct MechanicalFixer;

impl PlanFixer for MechanicalFixer {
    fn fix(&mut self, plan: &PlanRecord, _report: &ValidationReport) -> Option<PlanRecord> {
        let mut fixed = plan.clone();

        let ids: HashSet<String> = fixed.tasks.iter().map(|task| task.id.clone()).collect();
        for task in &mut fixed.tasks {
            let mut seen = HashSet::new();
            let own_id = task.id.clone();
            task.dependencies
                .retain(|dep| dep != &own_id && ids.contains(dep) && seen.insert(dep.clone()));
        }

        if !fixed.phases.is_empty() {
            let used: Vec<String> = fixed.tasks.iter().map(|task| task.phase.clone()).collect();
            fixed.phases.retain(|phase| used.contains(phase));
            for phase in used {
                if !fixed.phases.contains(&phase) {
                    fixed.phases.push(phase);
                }
            }
        }

        fixed.sections = rename_sections(&plan.sections);

        (fixed != *plan).then_some(fixed)
    }
}

/// Renames section keys to snake_case without merging any two bodies.
fn rename_sections(sections: &IndexMap<String, String>) -> IndexMap<String, String> {
    let mut renamed = IndexMap::with_capacity(sections.len());
    for (name, body) in sections {
        let target = snake_case(name);
        let keep = target.is_empty()
            || target == *name
            || sections.contains_key(&target)
            || renamed.contains_key(&target);
        let key = if keep { name.clone() } else { target };
        renamed.insert(key, body.clone());
    }
    renamed
}

fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut previous_lower = false;
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            if c.is_ascii_uppercase() && previous_lower {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            previous_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        } else {
            if !out.ends_with('_') && !out.is_empty() {
                out.push('_');
            }
            previous_lower = false;
        }
    }
    out.trim_end_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("Rollout Plan"), "rollout_plan");
        assert_eq!(snake_case("rolloutPlan"), "rollout_plan");
        assert_eq!(snake_case("already_snake"), "already_snake");
        assert_eq!(snake_case("Open Questions?"), "open_questions");
    }

    #[test]
    fn test_rename_never_merges_sections() {
        let mut sections = IndexMap::new();
        sections.insert("Risk Assessment".to_string(), "first".to_string());
        sections.insert("risk_assessment".to_string(), "second".to_string());
        sections.insert("Rollout Plan".to_string(), "third".to_string());
        sections.insert("rollout plan".to_string(), "fourth".to_string());

        let renamed = rename_sections(&sections);

        assert_eq!(renamed.len(), 4);
        assert_eq!(renamed["Risk Assessment"], "first");
        assert_eq!(renamed["risk_assessment"], "second");
        assert_eq!(renamed["rollout_plan"], "third");
        assert_eq!(renamed["rollout plan"], "fourth");
    }
}
