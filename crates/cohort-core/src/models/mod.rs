//! Data models for plans, sessions and agent status records.
//!
//! These are the records the components exchange. Nothing is shared in memory
//! between agents; every component re-derives its view by reading records.
//!
//! - [`PlanRecord`]: the structured plan scored by the validator
//! - [`StatusRecord`]: one agent's progress in one session, single writer
//! - [`SessionRecord`]: the roster of agents grouped by phase
//!
//! Display implementations live in [`crate::display::models`].
//!
//! # Examples
//!
//! ```rust
//! use cohort_core::models::{StatusRecord, TaskStatus, WorkorderId};
//!
//! let workorder: WorkorderId = "WO-AUTH-001".parse().unwrap();
//! let record = StatusRecord::new(
//!     "sess-1",
//!     "agent-a",
//!     workorder,
//!     "build",
//!     vec!["AUTH-001".to_string()],
//! );
//! assert_eq!(record.tasks[0].status, TaskStatus::NotStarted);
//! assert_eq!(record.completion_ratio(), 0.0);
//! ```

pub mod plan;
pub mod record;
pub mod session;
pub mod status;
pub mod summary;
pub mod workorder;

#[cfg(test)]
mod tests;

pub use plan::{PlanRecord, PlanTask, StoredPlan, CANONICAL_SECTIONS, SUCCESS_CRITERIA_SECTION};
pub use record::{HistoryEntry, OwnerToken, StatusRecord, TaskEntry};
pub use session::{PhaseMarker, PhaseRoster, SessionRecord};
pub use status::{SessionStatus, TaskStatus};
pub use summary::SessionSummary;
pub use workorder::{WorkorderId, WORKORDER_PATTERN};
