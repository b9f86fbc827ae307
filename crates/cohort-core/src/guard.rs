//! Advisory path conflict checks between agents of one session.
//!
//! Each status record declares `forbidden_paths` (never touch) and
//! `claimed_paths` (intends to write). The guard compares these declarations
//! before execution starts. It is not a lock: nothing stops an agent from
//! writing a path at runtime.
//!
//! Paths match by component prefix, so `src` covers `src/lib.rs` but not
//! `src-old/lib.rs`. A trailing `/**` or `/*` means the directory itself.

use std::{
    fmt,
    path::{Component, Path, PathBuf},
};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::models::StatusRecord;

/// Kind of overlap found by [`ConflictGuard::audit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Two agents claim overlapping paths
    SharedClaim,
    /// An agent claims a path another agent declared forbidden
    ClaimsForbidden,
    /// An agent claims a path it forbids itself
    SelfContradiction,
}

impl ConflictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictKind::SharedClaim => "shared_claim",
            ConflictKind::ClaimsForbidden => "claims_forbidden",
            ConflictKind::SelfContradiction => "self_contradiction",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One overlapping declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    /// Agent whose claim causes the conflict
    pub agent_id: String,
    /// Claimed path as declared by `agent_id`
    pub path: String,
    /// Other party; equal to `agent_id` for a self-contradiction
    pub other_agent_id: String,
    /// Overlapping path as declared by `other_agent_id`
    pub other_path: String,
}

/// Result of a pre-flight audit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub agents_checked: usize,
    pub conflicts: Vec<Conflict>,
}

impl ConflictReport {
    /// No conflicts were found.
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// Why [`ConflictGuard::check`] refused a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// Inside the agent's own forbidden path
    Forbidden { path: String },
    /// Inside another agent's claimed path
    ClaimedBy { agent_id: String, path: String },
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Denial::Forbidden { path } => write!(f, "inside forbidden path '{path}'"),
            Denial::ClaimedBy { agent_id, path } => {
                write!(f, "inside '{path}' claimed by agent {agent_id}")
            }
        }
    }
}

#[derive(Debug, Clone)]
struct DeclaredPath {
    raw: String,
    normalized: PathBuf,
}

#[derive(Debug, Clone)]
struct AgentPaths {
    agent_id: String,
    forbidden: Vec<DeclaredPath>,
    claimed: Vec<DeclaredPath>,
}

/// Snapshot of every agent's path declarations in one session.
#[derive(Debug, Clone)]
pub struct ConflictGuard {
    agents: Vec<AgentPaths>,
}

impl ConflictGuard {
    /// Builds a guard from status record snapshots.
    pub fn new<'a>(records: impl IntoIterator<Item = &'a StatusRecord>) -> Self {
        let declare = |paths: &[String]| {
            paths
                .iter()
                .map(|raw| DeclaredPath {
                    raw: raw.clone(),
                    normalized: normalize_path(raw),
                })
                .collect()
        };

        let agents = records
            .into_iter()
            .map(|record| AgentPaths {
                agent_id: record.agent_id.clone(),
                forbidden: declare(&record.forbidden_paths),
                claimed: declare(&record.claimed_paths),
            })
            .collect();

        Self { agents }
    }

    /// Whether `agent_id` may write `path`.
    ///
    /// Unknown agents have no forbidden paths of their own but still respect
    /// everyone else's claims.
    pub fn check(&self, agent_id: &str, path: &str) -> bool {
        self.explain(agent_id, path).is_none()
    }

    /// The reason `agent_id` may not write `path`, if any.
    pub fn explain(&self, agent_id: &str, path: &str) -> Option<Denial> {
        let target = normalize_path(path);

        for agent in &self.agents {
            if agent.agent_id == agent_id {
                if let Some(forbidden) = agent.forbidden.iter().find(|f| covers(&f.normalized, &target)) {
                    return Some(Denial::Forbidden {
                        path: forbidden.raw.clone(),
                    });
                }
            } else if let Some(claimed) = agent.claimed.iter().find(|c| covers(&c.normalized, &target)) {
                return Some(Denial::ClaimedBy {
                    agent_id: agent.agent_id.clone(),
                    path: claimed.raw.clone(),
                });
            }
        }

        None
    }

    /// Cross-checks all declarations and lists every overlap.
    ///
    /// Each unordered pair of overlapping claims is reported once.
    pub fn audit(&self) -> ConflictReport {
        let mut conflicts = Vec::new();

        for (index, agent) in self.agents.iter().enumerate() {
            for claim in &agent.claimed {
                for forbidden in &agent.forbidden {
                    if overlaps(&claim.normalized, &forbidden.normalized) {
                        conflicts.push(Conflict {
                            kind: ConflictKind::SelfContradiction,
                            agent_id: agent.agent_id.clone(),
                            path: claim.raw.clone(),
                            other_agent_id: agent.agent_id.clone(),
                            other_path: forbidden.raw.clone(),
                        });
                    }
                }

                for (other_index, other) in self.agents.iter().enumerate() {
                    if other_index == index {
                        continue;
                    }
                    if other_index > index {
                        for other_claim in &other.claimed {
                            if overlaps(&claim.normalized, &other_claim.normalized) {
                                conflicts.push(Conflict {
                                    kind: ConflictKind::SharedClaim,
                                    agent_id: agent.agent_id.clone(),
                                    path: claim.raw.clone(),
                                    other_agent_id: other.agent_id.clone(),
                                    other_path: other_claim.raw.clone(),
                                });
                            }
                        }
                    }
                    for forbidden in &other.forbidden {
                        if overlaps(&claim.normalized, &forbidden.normalized) {
                            conflicts.push(Conflict {
                                kind: ConflictKind::ClaimsForbidden,
                                agent_id: agent.agent_id.clone(),
                                path: claim.raw.clone(),
                                other_agent_id: other.agent_id.clone(),
                                other_path: forbidden.raw.clone(),
                            });
                        }
                    }
                }
            }
        }

        if conflicts.is_empty() {
            debug!("Conflict audit of {} agents is clean", self.agents.len());
        } else {
            warn!(
                "Conflict audit of {} agents found {} overlaps",
                self.agents.len(),
                conflicts.len()
            );
        }

        ConflictReport {
            agents_checked: self.agents.len(),
            conflicts,
        }
    }
}

/// Normalizes a declared path without touching the filesystem.
///
/// Resolves `.` and `..`, strips a trailing glob (`/**`, `/*`) and trailing
/// separators. A `..` that climbs above the start of a relative path is kept.
pub fn normalize_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_suffix("/**")
        .or_else(|| trimmed.strip_suffix("/*"))
        .unwrap_or(trimmed);

    Path::new(trimmed)
        .components()
        .fold(PathBuf::new(), |mut acc, component| match component {
            Component::CurDir => acc,
            Component::ParentDir => {
                let can_pop = matches!(acc.components().next_back(), Some(Component::Normal(_)));
                if can_pop {
                    acc.pop();
                } else if !(acc.has_root() && acc.parent().is_none()) {
                    acc.push(component);
                }
                acc
            }
            _ => {
                acc.push(component);
                acc
            }
        })
}

/// `scope` equals `target` or is one of its ancestor directories.
fn covers(scope: &Path, target: &Path) -> bool {
    target.starts_with(scope)
}

fn overlaps(a: &Path, b: &Path) -> bool {
    covers(a, b) || covers(b, a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkorderId;

    fn record(agent: &str, forbidden: &[&str], claimed: &[&str]) -> StatusRecord {
        let workorder: WorkorderId = "WO-GUARD-001".parse().unwrap();
        let mut record = StatusRecord::new("sess-1", agent, workorder, "build", Vec::new());
        record.forbidden_paths = forbidden.iter().map(|p| p.to_string()).collect();
        record.claimed_paths = claimed.iter().map(|p| p.to_string()).collect();
        record
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("src/**"), PathBuf::from("src"));
        assert_eq!(normalize_path("./src/api/"), PathBuf::from("src/api"));
        assert_eq!(normalize_path("src/api/../db/*"), PathBuf::from("src/db"));
        assert_eq!(normalize_path("../secrets"), PathBuf::from("../secrets"));
        assert_eq!(normalize_path("src/../../secrets"), PathBuf::from("../secrets"));
        assert_eq!(normalize_path("/../etc"), PathBuf::from("/etc"));
    }

    #[test]
    fn test_component_prefix_matching() {
        assert!(covers(&normalize_path("src"), &normalize_path("src/lib.rs")));
        assert!(!covers(&normalize_path("src"), &normalize_path("src-old/lib.rs")));
        assert!(!overlaps(&normalize_path("secrets"), &normalize_path("../secrets")));
    }

    #[test]
    fn test_shared_claim_is_flagged() {
        let records = [
            record("A", &[], &["src/api/**"]),
            record("B", &[], &["src/api/routes.rs"]),
        ];

        let report = ConflictGuard::new(&records).audit();

        assert!(!report.is_clean());
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.conflicts[0].kind, ConflictKind::SharedClaim);
        assert_eq!(report.conflicts[0].agent_id, "A");
        assert_eq!(report.conflicts[0].other_agent_id, "B");
    }

    #[test]
    fn test_claim_inside_other_forbidden_path() {
        let records = [
            record("A", &["migrations"], &["src/api"]),
            record("B", &[], &["migrations/0001.sql"]),
        ];

        let report = ConflictGuard::new(&records).audit();

        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.conflicts[0].kind, ConflictKind::ClaimsForbidden);
        assert_eq!(report.conflicts[0].agent_id, "B");
    }

    #[test]
    fn test_self_contradiction() {
        let records = [record("A", &["docs"], &["docs/README.md"])];
        let report = ConflictGuard::new(&records).audit();
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.conflicts[0].kind, ConflictKind::SelfContradiction);
    }

    #[test]
    fn test_disjoint_declarations_are_clean() {
        let records = [
            record("A", &["src/db"], &["src/api"]),
            record("B", &["src/api"], &["src/db"]),
        ];
        let report = ConflictGuard::new(&records).audit();
        assert!(report.is_clean());
        assert_eq!(report.agents_checked, 2);
    }

    #[test]
    fn test_check() {
        let records = [
            record("A", &["secrets"], &["src/api"]),
            record("B", &[], &["src/db"]),
        ];
        let guard = ConflictGuard::new(&records);

        assert!(guard.check("A", "src/api/handlers.rs"));
        assert!(!guard.check("A", "secrets/key.pem"));
        assert!(!guard.check("A", "src/db/schema.rs"));
        assert!(guard.check("B", "src/db/schema.rs"));
        assert_eq!(
            guard.explain("B", "src/api/mod.rs"),
            Some(Denial::ClaimedBy {
                agent_id: "A".to_string(),
                path: "src/api".to_string(),
            })
        );
    }
}
