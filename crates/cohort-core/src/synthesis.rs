//! Post-completion aggregation of a session.
//!
//! Synthesis reads the session roster, the plan and every status record and
//! produces a [`SessionReport`]. It refuses to run until the final phase gate
//! passes. The report is derived only from record contents (no wall clock), so
//! synthesising an unchanged session twice gives identical reports.

use std::collections::{HashMap, HashSet};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::{
    error::{CohortError, Result},
    gate,
    models::{PlanRecord, SessionRecord, StatusRecord, TaskStatus, WorkorderId},
};

/// Words too common to count as evidence for a textual criterion.
const STOPWORDS: &[&str] = &[
    "been", "from", "have", "into", "must", "should", "that", "their", "there", "these", "this",
    "when", "will", "with",
];

/// Per-agent totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMetrics {
    pub agent_id: String,
    pub phase: String,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    /// Number of transitions into `blocked`
    pub blocked_transitions: usize,
    pub completion_ratio: f64,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
    /// Seconds between the first and last status transition
    pub elapsed_secs: i64,
}

/// Per-phase totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseMetrics {
    pub phase: String,
    pub agents: usize,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub completion_ratio: f64,
}

/// How a success criterion was evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    /// Criterion names task ids; all must be complete
    Structural,
    /// Criterion text or keywords found in outputs and notes
    Textual,
}

/// Verdict for one success criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionResult {
    pub criterion: String,
    pub passed: bool,
    pub method: MatchMethod,
    /// Output, note or task list supporting the verdict
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

/// Consolidated cross-agent report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: String,
    pub workorder_id: WorkorderId,
    /// Latest transition across all agents
    pub as_of: Option<Timestamp>,
    pub phases: Vec<PhaseMetrics>,
    pub agents: Vec<AgentMetrics>,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub completion_ratio: f64,
    /// Seconds between the first and last transition in the session
    pub elapsed_secs: i64,
    pub criteria: Vec<CriterionResult>,
}

impl SessionReport {
    /// Number of criteria that passed.
    pub fn criteria_passed(&self) -> usize {
        self.criteria.iter().filter(|c| c.passed).count()
    }
}

/// Aggregates a finished session.
///
/// # Errors
///
/// * [`CohortError::SessionState`] if the session has no phases
/// * [`CohortError::GateClosed`] if the final phase gate does not pass
pub fn synthesize(
    session: &SessionRecord,
    plan: &PlanRecord,
    records: &[StatusRecord],
) -> Result<SessionReport> {
    let final_phase = session
        .final_phase()
        .ok_or_else(|| CohortError::SessionState {
            session_id: session.session_id.clone(),
            status: session.status.as_str().to_string(),
            reason: "session has no phases".to_string(),
        })?;

    let outcome = gate::can_advance(session, records, final_phase);
    if !outcome.advance {
        return Err(CohortError::GateClosed {
            phase: final_phase.to_string(),
            blockers: outcome.blockers,
        });
    }

    let by_agent: HashMap<&str, &StatusRecord> = records
        .iter()
        .filter(|record| record.session_id == session.session_id)
        .map(|record| (record.agent_id.as_str(), record))
        .collect();

    let mut phases = Vec::with_capacity(session.phases.len());
    let mut agents = Vec::new();
    let mut roster_records = Vec::new();
    for roster in &session.phases {
        let mut phase_metrics = PhaseMetrics {
            phase: roster.phase.clone(),
            agents: roster.agents.len(),
            total_tasks: 0,
            completed_tasks: 0,
            completion_ratio: 1.0,
        };
        for agent_id in &roster.agents {
            let Some(record) = by_agent.get(agent_id.as_str()) else {
                continue;
            };
            let metrics = agent_metrics(&roster.phase, record);
            phase_metrics.total_tasks += metrics.total_tasks;
            phase_metrics.completed_tasks += metrics.completed_tasks;
            agents.push(metrics);
            roster_records.push(*record);
        }
        phase_metrics.completion_ratio = ratio(phase_metrics.completed_tasks, phase_metrics.total_tasks);
        phases.push(phase_metrics);
    }

    let total_tasks = agents.iter().map(|a| a.total_tasks).sum();
    let completed_tasks = agents.iter().map(|a| a.completed_tasks).sum();
    let started_at = agents.iter().filter_map(|a| a.started_at).min();
    let as_of = agents.iter().filter_map(|a| a.finished_at).max();

    Ok(SessionReport {
        session_id: session.session_id.clone(),
        workorder_id: session.workorder_id.clone(),
        as_of,
        phases,
        agents,
        total_tasks,
        completed_tasks,
        completion_ratio: ratio(completed_tasks, total_tasks),
        elapsed_secs: elapsed(started_at, as_of),
        criteria: evaluate_criteria(plan, &roster_records),
    })
}

fn agent_metrics(phase: &str, record: &StatusRecord) -> AgentMetrics {
    let started_at = record.history.first().map(|entry| entry.at);
    let finished_at = record.history.last().map(|entry| entry.at);
    AgentMetrics {
        agent_id: record.agent_id.clone(),
        phase: phase.to_string(),
        total_tasks: record.tasks.len(),
        completed_tasks: record.completed_count(),
        blocked_transitions: record
            .history
            .iter()
            .filter(|entry| entry.to == TaskStatus::Blocked)
            .count(),
        completion_ratio: record.completion_ratio(),
        started_at,
        finished_at,
        elapsed_secs: elapsed(started_at, finished_at),
    }
}

fn ratio(completed: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        completed as f64 / total as f64
    }
}

fn elapsed(start: Option<Timestamp>, end: Option<Timestamp>) -> i64 {
    match (start, end) {
        (Some(start), Some(end)) => end.as_second() - start.as_second(),
        _ => 0,
    }
}

fn evaluate_criteria(plan: &PlanRecord, records: &[&StatusRecord]) -> Vec<CriterionResult> {
    let task_ids: HashSet<&str> = plan.tasks.iter().map(|task| task.id.as_str()).collect();
    let completed: HashSet<&str> = records
        .iter()
        .flat_map(|record| record.tasks.iter())
        .filter(|task| task.status == TaskStatus::Complete)
        .map(|task| task.id.as_str())
        .collect();
    let evidence: Vec<&str> = records
        .iter()
        .flat_map(|record| {
            record
                .outputs
                .iter()
                .map(String::as_str)
                .chain(record.history.iter().filter_map(|entry| entry.note.as_deref()))
        })
        .collect();

    plan.success_criteria()
        .into_iter()
        .map(|criterion| {
            let referenced: Vec<String> = tokens(&criterion)
                .filter(|token| task_ids.contains(token))
                .map(String::from)
                .collect();

            if !referenced.is_empty() {
                let missing: Vec<&str> = referenced
                    .iter()
                    .map(String::as_str)
                    .filter(|id| !completed.contains(id))
                    .collect();
                let passed = missing.is_empty();
                let detail = if passed {
                    format!("complete: {}", referenced.join(", "))
                } else {
                    format!("incomplete: {}", missing.join(", "))
                };
                return CriterionResult {
                    criterion,
                    passed,
                    method: MatchMethod::Structural,
                    evidence: Some(detail),
                };
            }

            let found = textual_match(&criterion, &evidence);
            CriterionResult {
                passed: found.is_some(),
                criterion,
                method: MatchMethod::Textual,
                evidence: found.map(String::from),
            }
        })
        .collect()
}

/// First evidence line containing the whole criterion or all its keywords.
fn textual_match<'a>(criterion: &str, evidence: &[&'a str]) -> Option<&'a str> {
    let needle = criterion.to_lowercase();
    let keywords: Vec<String> = tokens(&needle)
        .filter(|word| word.len() >= 4 && !STOPWORDS.contains(word))
        .map(String::from)
        .collect();

    evidence.iter().copied().find(|text| {
        let haystack = text.to_lowercase();
        haystack.contains(&needle)
            || (!keywords.is_empty() && keywords.iter().all(|kw| haystack.contains(kw.as_str())))
    })
}

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
        .map(|token| token.trim_matches('-'))
        .filter(|token| !token.is_empty())
}
