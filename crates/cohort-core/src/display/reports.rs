//! Display implementations for operation results.
//!
//! Validation, gate, audit and synthesis results are what agents and humans
//! act on, so each one leads with its verdict and then lists the details.

use std::fmt;

use super::datetime::{Elapsed, LocalDateTime};
use crate::{
    coordinator::{AgentAssignment, ArchiveOutcome, PhaseAdvance, PlanImport},
    gate::{Blocker, BlockerReason, GateOutcome},
    guard::{Conflict, ConflictReport},
    synthesis::SessionReport,
    validator::{Issue, RefinementOutcome, Severity, ValidationReport},
};

fn percent(ratio: f64) -> String {
    format!("{:.0}%", ratio * 100.0)
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] `{}` {}: {}",
            self.severity, self.code, self.location, self.message
        )
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.workorder_id.as_deref().unwrap_or("plan");
        writeln!(f, "# Validation: {name}")?;
        writeln!(f)?;
        writeln!(f, "- Score: {}/100", self.score)?;
        writeln!(f, "- Decision: {}", self.decision)?;
        writeln!(
            f,
            "- Issues: {} critical, {} major, {} minor",
            self.count(Severity::Critical),
            self.count(Severity::Major),
            self.count(Severity::Minor)
        )?;

        if !self.issues.is_empty() {
            writeln!(f, "\n## Issues")?;
            writeln!(f)?;
            for issue in &self.issues {
                writeln!(f, "- {issue}")?;
            }
        }

        Ok(())
    }
}

impl fmt::Display for RefinementOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scores: Vec<String> = self
            .reports
            .iter()
            .map(|report| report.score.to_string())
            .collect();
        writeln!(
            f,
            "Refined in {} iteration(s): {}",
            self.iterations(),
            scores.join(" → ")
        )?;
        writeln!(f)?;
        write!(f, "{}", self.final_report())
    }
}

impl fmt::Display for PlanImport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stored plan {}", self.plan.workorder_id)?;
        writeln!(f)?;
        write!(f, "{}", self.report)
    }
}

impl fmt::Display for Blocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let task = self.task_id.as_deref().unwrap_or("*");
        match self.reason {
            BlockerReason::Incomplete(status) => {
                write!(f, "{} / {task}: {}", self.agent_id, status.with_icon())
            }
            BlockerReason::Blocked => write!(f, "{} / {task}: ✗ Blocked", self.agent_id),
            BlockerReason::MissingRecord => {
                write!(f, "{}: no status record", self.agent_id)
            }
        }
    }
}

impl fmt::Display for GateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.advance { "open" } else { "closed" };
        writeln!(f, "# Gate {}: {verdict}", self.phase)?;
        writeln!(f)?;

        for warning in &self.warnings {
            writeln!(f, "> {warning}")?;
        }
        if !self.warnings.is_empty() {
            writeln!(f)?;
        }

        if !self.blockers.is_empty() {
            writeln!(f, "## Blockers")?;
            writeln!(f)?;
            for blocker in &self.blockers {
                writeln!(f, "- {blocker}")?;
            }
        }

        Ok(())
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} `{}` vs {} `{}`",
            self.kind, self.agent_id, self.path, self.other_agent_id, self.other_path
        )
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return writeln!(
                f,
                "No conflicts across {} agent(s).",
                self.agents_checked
            );
        }

        writeln!(
            f,
            "# {} conflict(s) across {} agent(s)",
            self.conflicts.len(),
            self.agents_checked
        )?;
        writeln!(f)?;
        for conflict in &self.conflicts {
            writeln!(f, "- {conflict}")?;
        }
        Ok(())
    }
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Session report: {}", self.session_id)?;
        writeln!(f)?;
        writeln!(f, "- Plan: {}", self.workorder_id)?;
        writeln!(
            f,
            "- Tasks: {}/{} ({})",
            self.completed_tasks,
            self.total_tasks,
            percent(self.completion_ratio)
        )?;
        writeln!(f, "- Elapsed: {}", Elapsed(self.elapsed_secs))?;
        if let Some(as_of) = &self.as_of {
            writeln!(f, "- As of: {}", LocalDateTime(as_of))?;
        }

        writeln!(f, "\n## Phases")?;
        writeln!(f)?;
        for phase in &self.phases {
            writeln!(
                f,
                "- **{}**: {}/{} tasks, {} agent(s)",
                phase.phase, phase.completed_tasks, phase.total_tasks, phase.agents
            )?;
        }

        writeln!(f, "\n## Agents")?;
        writeln!(f)?;
        for agent in &self.agents {
            write!(
                f,
                "- **{}** ({}): {}/{} in {}",
                agent.agent_id,
                agent.phase,
                agent.completed_tasks,
                agent.total_tasks,
                Elapsed(agent.elapsed_secs)
            )?;
            if agent.blocked_transitions > 0 {
                write!(f, ", blocked {} time(s)", agent.blocked_transitions)?;
            }
            writeln!(f)?;
        }

        if !self.criteria.is_empty() {
            writeln!(
                f,
                "\n## Success criteria ({}/{})",
                self.criteria_passed(),
                self.criteria.len()
            )?;
            writeln!(f)?;
            for criterion in &self.criteria {
                let icon = if criterion.passed { "✓" } else { "✗" };
                write!(f, "- {icon} {}", criterion.criterion)?;
                if let Some(evidence) = &criterion.evidence {
                    write!(f, " ({evidence})")?;
                }
                writeln!(f)?;
            }
        }

        Ok(())
    }
}

impl fmt::Display for AgentAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Assigned agent {} to phase {}",
            self.record.agent_id, self.record.phase
        )?;
        writeln!(f)?;
        writeln!(f, "- Owner token: `{}`", self.token)?;
        writeln!(f)?;
        write!(f, "{}", self.record)
    }
}

impl fmt::Display for PhaseAdvance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.authorized_phase {
            Some(next) => writeln!(
                f,
                "Phase {} passed; phase {next} is now authorized.",
                self.completed_phase
            ),
            None => writeln!(
                f,
                "Phase {} passed; session {} is {}.",
                self.completed_phase, self.session_id, self.status
            ),
        }
    }
}

impl fmt::Display for ArchiveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Archived session {}", self.session_id)?;
        if let Some(dir) = &self.export_dir {
            writeln!(f, "- Archive copy: {}", dir.display())?;
        }
        writeln!(f)?;
        write!(f, "{}", self.report)
    }
}
