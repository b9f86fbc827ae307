//! Display implementations for domain models.
//!
//! Every implementation writes markdown so the terminal renderer and MCP
//! responses share one format.

use std::fmt;

use super::datetime::LocalDateTime;
use crate::{
    models::{
        PlanRecord, SessionRecord, SessionStatus, SessionSummary, StatusRecord, StoredPlan,
        TaskStatus,
    },
    validator::{GateDecision, Severity},
};

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for GateDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for PlanRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# {}: {}", self.workorder_id, self.title)?;
        writeln!(f)?;
        writeln!(f, "- Phases: {}", self.phase_order().join(" → "))?;
        writeln!(f, "- Tasks: {}", self.tasks.len())?;

        for phase in self.phase_order() {
            writeln!(f, "\n## Phase: {phase}")?;
            writeln!(f)?;
            for task in self.tasks_in_phase(&phase) {
                write!(f, "- **{}** {}", task.id, task.description)?;
                if !task.dependencies.is_empty() {
                    write!(f, " (after {})", task.dependencies.join(", "))?;
                }
                writeln!(f)?;
            }
        }

        Ok(())
    }
}

impl fmt::Display for StoredPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.plan)?;
        writeln!(f, "\n## Validation")?;
        writeln!(f)?;
        match (self.last_score, self.last_decision) {
            (Some(score), Some(decision)) => {
                writeln!(f, "- Score: {score}/100")?;
                writeln!(f, "- Decision: {decision}")?;
            }
            _ => writeln!(f, "- Not validated")?,
        }
        writeln!(f, "- Locked: {}", if self.locked { "yes" } else { "no" })?;
        writeln!(f, "- Updated: {}", LocalDateTime(&self.updated_at))?;
        Ok(())
    }
}

impl fmt::Display for StatusRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "### Agent {} ({}/{} complete)",
            self.agent_id,
            self.completed_count(),
            self.tasks.len()
        )?;
        writeln!(f)?;
        writeln!(f, "- Phase: {}", self.phase)?;
        if !self.claimed_paths.is_empty() {
            writeln!(f, "- Claims: {}", self.claimed_paths.join(", "))?;
        }
        if !self.forbidden_paths.is_empty() {
            writeln!(f, "- Forbidden: {}", self.forbidden_paths.join(", "))?;
        }
        writeln!(f)?;

        for task in &self.tasks {
            write!(f, "- {} ({})", task.id, task.status.with_icon())?;
            if let Some(at) = &task.completed_at {
                write!(f, " at {}", LocalDateTime(at))?;
            }
            writeln!(f)?;
        }

        if !self.outputs.is_empty() {
            writeln!(f, "\n#### Outputs")?;
            writeln!(f)?;
            for output in &self.outputs {
                writeln!(f, "- {output}")?;
            }
        }
        writeln!(f)?;

        Ok(())
    }
}

impl fmt::Display for SessionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Session {}", self.session_id)?;
        writeln!(f)?;
        writeln!(f, "- Plan: {}", self.workorder_id)?;
        writeln!(f, "- Status: {}", self.status)?;
        if let Some(phase) = self.authorized_phase() {
            writeln!(f, "- Authorized phase: {phase}")?;
        }
        writeln!(f, "- Created: {}", LocalDateTime(&self.created_at))?;
        writeln!(f, "- Updated: {}", LocalDateTime(&self.updated_at))?;

        writeln!(f, "\n## Phases")?;
        writeln!(f)?;
        for roster in &self.phases {
            let marker = self
                .completed_phases
                .iter()
                .find(|marker| marker.phase == roster.phase);
            let agents = if roster.agents.is_empty() {
                "no agents".to_string()
            } else {
                roster.agents.join(", ")
            };
            match marker {
                Some(marker) => writeln!(
                    f,
                    "- ✓ **{}**: {agents} (passed {})",
                    roster.phase,
                    LocalDateTime(&marker.passed_at)
                )?,
                None => writeln!(f, "- ○ **{}**: {agents}", roster.phase)?,
            }
        }

        Ok(())
    }
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "## {} ({}) [{}/{} phases]",
            self.session_id, self.workorder_id, self.completed_phases, self.total_phases
        )?;
        writeln!(f)?;
        writeln!(f, "- **Status**: {}", self.status)?;
        writeln!(f, "- **Agents**: {}", self.agents)?;
        if let Some(phase) = &self.authorized_phase {
            writeln!(f, "- **Authorized phase**: {phase}")?;
        }
        writeln!(f, "- **Created**: {}", LocalDateTime(&self.created_at))?;
        writeln!(f)?;

        Ok(())
    }
}
