//! Core library for Cohort, a coordinator for multi-agent work sessions.
//!
//! A session executes one validated plan. Agents are assigned to the plan's
//! phases, each agent writes only its own status record, and a phase gate
//! decides when the next phase may start. When the final gate passes the
//! records are synthesised into a single report.
//!
//! The crate is organised around those steps:
//!
//! - [`validator`]: scores plan documents and drives the refinement loop
//! - [`guard`]: detects overlapping path claims between agents
//! - [`tracker`]: the task lifecycle applied to one status record
//! - [`agent`]: actors that own and persist one status record each
//! - [`gate`]: read-only phase completion checks
//! - [`synthesis`]: aggregates finished records into a [`SessionReport`]
//! - [`coordinator`]: the [`Coordinator`] tying the pieces to the store
//! - [`db`] and [`export`]: SQLite persistence and JSON snapshots
//!
//! Every model and result implements [`std::fmt::Display`] as markdown (see
//! [`display`]), which both the CLI and the MCP server print unchanged.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use cohort_core::{params::CreateSession, CoordinatorBuilder};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = CoordinatorBuilder::new()
//!     .with_database_path(Some("cohort.db"))
//!     .build()
//!     .await?;
//!
//! let source = std::fs::read_to_string("plan.json")?;
//! let imported = coordinator.import_plan(&source).await?;
//! println!("{}", imported.report);
//!
//! let session = coordinator
//!     .create_session(&CreateSession {
//!         workorder_id: imported.plan.workorder_id.to_string(),
//!         session_id: None,
//!     })
//!     .await?;
//! println!("{session}");
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod coordinator;
pub mod db;
pub mod display;
pub mod error;
pub mod export;
pub mod gate;
pub mod guard;
pub mod models;
pub mod params;
pub mod synthesis;
pub mod tracker;
pub mod validator;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export commonly used types
pub use agent::{AgentActor, AgentHandle};
pub use config::ValidatorConfig;
pub use coordinator::{Coordinator, CoordinatorBuilder};
pub use db::Database;
pub use display::{LocalDateTime, OperationStatus};
pub use error::{CohortError, Result};
pub use gate::GateOutcome;
pub use guard::{ConflictGuard, ConflictReport};
pub use models::{
    PlanRecord, SessionRecord, SessionStatus, StatusRecord, StoredPlan, TaskStatus, WorkorderId,
};
pub use synthesis::SessionReport;
pub use validator::{GateDecision, PlanValidator, ValidationReport};
