//! Coordinator: the session state machine and the only writer of sessions.
//!
//! The [`Coordinator`] validates and stores plans, creates sessions, spawns
//! one [`AgentActor`](crate::agent::AgentActor) per assigned agent and moves
//! each session through its lifecycle:
//!
//! ```text
//! planning ──audit ok──▶ audited ──start──▶ running ──final gate──▶ complete ──▶ archived
//!     ▲                     │
//!     └──audit conflicts────┘
//! ```
//!
//! It never writes an agent's status record; status changes go through the
//! owning actor. Phase gates are evaluated on demand (polling); there is no
//! push notification.
//!
//! # Examples
//!
//! ```rust,no_run
//! use cohort_core::{CoordinatorBuilder, params::CreateSession};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = CoordinatorBuilder::new()
//!     .with_database_path(Some("cohort.db"))
//!     .build()
//!     .await?;
//!
//! let source = std::fs::read_to_string("plan.json")?;
//! let imported = coordinator.import_plan(&source).await?;
//! if imported.report.passed() {
//!     let session = coordinator
//!         .create_session(&CreateSession {
//!             workorder_id: imported.plan.workorder_id.to_string(),
//!             session_id: None,
//!         })
//!         .await?;
//!     println!("created {}", session.session_id);
//! }
//! # Ok(())
//! # }
//! ```

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use tokio::{sync::Mutex, task};

use crate::{
    agent::AgentHandle,
    db::Database,
    error::{CohortError, Result},
    validator::PlanValidator,
};

pub mod builder;
pub mod plan_ops;
pub mod session_ops;

#[cfg(test)]
mod tests;

pub use builder::CoordinatorBuilder;
pub use plan_ops::PlanImport;
pub use session_ops::{AgentAssignment, ArchiveOutcome, PhaseAdvance};

type AgentKey = (String, String);

/// Main interface for plan gating and session coordination.
#[derive(Clone)]
pub struct Coordinator {
    pub(crate) db_path: PathBuf,
    pub(crate) validator: PlanValidator,
    pub(crate) mailbox_capacity: usize,
    agents: Arc<Mutex<HashMap<AgentKey, AgentHandle>>>,
}

impl Coordinator {
    pub(crate) fn new(db_path: PathBuf, validator: PlanValidator, mailbox_capacity: usize) -> Self {
        Self {
            db_path,
            validator,
            mailbox_capacity,
            agents: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Path of the record store.
    pub fn database_path(&self) -> &std::path::Path {
        &self.db_path
    }

    pub fn validator(&self) -> &PlanValidator {
        &self.validator
    }

    /// Runs `op` against a freshly opened store on the blocking pool.
    pub(crate) async fn with_db<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Database) -> Result<T> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        task::spawn_blocking(move || {
            let mut db = Database::new(&db_path)?;
            op(&mut db)
        })
        .await
        .map_err(CohortError::join)?
    }

    pub(crate) async fn register_handle(&self, handle: AgentHandle) {
        let key = (handle.session_id().to_string(), handle.agent_id().to_string());
        self.agents.lock().await.insert(key, handle);
    }

    /// Live handle for an agent started by this coordinator, if any.
    pub async fn agent(&self, session_id: &str, agent_id: &str) -> Option<AgentHandle> {
        let agents = self.agents.lock().await;
        agents
            .get(&(session_id.to_string(), agent_id.to_string()))
            .filter(|handle| !handle.is_closed())
            .cloned()
    }

    /// Removes and stops every actor of a session.
    pub(crate) async fn stop_agents(&self, session_id: &str) {
        let handles: Vec<AgentHandle> = {
            let mut agents = self.agents.lock().await;
            let keys: Vec<AgentKey> = agents
                .keys()
                .filter(|(session, _)| session == session_id)
                .cloned()
                .collect();
            keys.iter().filter_map(|key| agents.remove(key)).collect()
        };
        for handle in handles {
            // Already-stopped actors have nothing to flush.
            let _ = handle.shutdown().await;
        }
    }
}
