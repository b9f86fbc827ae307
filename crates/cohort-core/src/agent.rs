//! Agent actors: the single writer of each status record.
//!
//! An [`AgentActor`] runs as its own tokio task and owns one
//! [`TaskTracker`] plus the record's [`OwnerToken`]. Everyone else talks to
//! it through an [`AgentHandle`], which sends commands over a bounded mailbox
//! and awaits a oneshot reply. Updates are persisted before the reply is sent;
//! a failed write leaves the in-memory record unchanged. The store refuses
//! writes from a stale copy, so an actor that lost a race reloads and retries.

use std::path::PathBuf;

use log::{debug, info, warn};
use tokio::{
    sync::{mpsc, oneshot},
    task,
};

use crate::{
    db::Database,
    error::{CohortError, Result},
    models::{HistoryEntry, OwnerToken, StatusRecord, TaskStatus},
    tracker::TaskTracker,
};

/// Default mailbox size for agent actors.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 32;

enum AgentCommand {
    SetStatus {
        task_id: String,
        status: TaskStatus,
        note: Option<String>,
        reply: oneshot::Sender<Result<HistoryEntry>>,
    },
    RecordOutput {
        output: String,
        reply: oneshot::Sender<Result<()>>,
    },
    Snapshot {
        reply: oneshot::Sender<StatusRecord>,
    },
    Shutdown {
        reply: oneshot::Sender<StatusRecord>,
    },
}

/// Cloneable handle to a running agent actor.
#[derive(Debug, Clone)]
pub struct AgentHandle {
    session_id: String,
    agent_id: String,
    sender: mpsc::Sender<AgentCommand>,
}

impl std::fmt::Debug for AgentCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentCommand::SetStatus { task_id, status, .. } => f
                .debug_struct("SetStatus")
                .field("task_id", task_id)
                .field("status", status)
                .finish(),
            AgentCommand::RecordOutput { .. } => f.write_str("RecordOutput"),
            AgentCommand::Snapshot { .. } => f.write_str("Snapshot"),
            AgentCommand::Shutdown { .. } => f.write_str("Shutdown"),
        }
    }
}

impl AgentHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Whether the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Moves one of the agent's tasks to `status` and persists the record.
    pub async fn set_status(
        &self,
        task_id: impl Into<String>,
        status: TaskStatus,
        note: Option<String>,
    ) -> Result<HistoryEntry> {
        let (reply, response) = oneshot::channel();
        self.send(AgentCommand::SetStatus {
            task_id: task_id.into(),
            status,
            note,
            reply,
        })
        .await?;
        response.await.map_err(|_| self.stopped())?
    }

    /// Records a deliverable and persists the record.
    pub async fn record_output(&self, output: impl Into<String>) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.send(AgentCommand::RecordOutput {
            output: output.into(),
            reply,
        })
        .await?;
        response.await.map_err(|_| self.stopped())?
    }

    /// Point-in-time copy of the agent's record.
    pub async fn snapshot(&self) -> Result<StatusRecord> {
        let (reply, response) = oneshot::channel();
        self.send(AgentCommand::Snapshot { reply }).await?;
        response.await.map_err(|_| self.stopped())
    }

    /// Stops the actor and returns its final record.
    pub async fn shutdown(&self) -> Result<StatusRecord> {
        let (reply, response) = oneshot::channel();
        self.send(AgentCommand::Shutdown { reply }).await?;
        response.await.map_err(|_| self.stopped())
    }

    async fn send(&self, command: AgentCommand) -> Result<()> {
        self.sender.send(command).await.map_err(|_| self.stopped())
    }

    fn stopped(&self) -> CohortError {
        CohortError::AgentStopped {
            agent_id: self.agent_id.clone(),
        }
    }
}

/// Owns one status record and applies the commands sent to it.
pub struct AgentActor {
    tracker: TaskTracker,
    token: OwnerToken,
    db_path: PathBuf,
    receiver: mpsc::Receiver<AgentCommand>,
}

impl AgentActor {
    /// Starts an actor on the current tokio runtime.
    ///
    /// `record` must already be registered in the store under `token`.
    pub fn spawn(
        record: StatusRecord,
        token: OwnerToken,
        db_path: PathBuf,
        capacity: usize,
    ) -> AgentHandle {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let handle = AgentHandle {
            session_id: record.session_id.clone(),
            agent_id: record.agent_id.clone(),
            sender,
        };

        let actor = Self {
            tracker: TaskTracker::new(record),
            token,
            db_path,
            receiver,
        };
        info!(
            "Agent {} started in session {}",
            handle.agent_id, handle.session_id
        );
        tokio::spawn(actor.run());

        handle
    }

    async fn run(mut self) {
        while let Some(command) = self.receiver.recv().await {
            debug!("Agent {} received {command:?}", self.agent_id());
            match command {
                AgentCommand::SetStatus {
                    task_id,
                    status,
                    note,
                    reply,
                } => {
                    let result = self.apply_status(&task_id, status, note).await;
                    let _ = reply.send(result);
                }
                AgentCommand::RecordOutput { output, reply } => {
                    let result = self.apply_output(output).await;
                    let _ = reply.send(result);
                }
                AgentCommand::Snapshot { reply } => {
                    let _ = reply.send(self.tracker.record().clone());
                }
                AgentCommand::Shutdown { reply } => {
                    let _ = reply.send(self.tracker.record().clone());
                    break;
                }
            }
        }
        info!("Agent {} stopped", self.agent_id());
    }

    async fn apply_status(
        &mut self,
        task_id: &str,
        status: TaskStatus,
        note: Option<String>,
    ) -> Result<HistoryEntry> {
        self.apply(|tracker| tracker.set_status(task_id, status, note.clone()))
            .await
    }

    async fn apply_output(&mut self, output: String) -> Result<()> {
        self.apply(|tracker| tracker.record_output(output.clone()))
            .await
    }

    /// Applies `change` to a copy of the record and persists it.
    ///
    /// When another writer has moved the stored record on, the actor reloads
    /// it and applies `change` once more on top of the newer copy.
    async fn apply<T, F>(&mut self, mut change: F) -> Result<T>
    where
        F: FnMut(&mut TaskTracker) -> Result<T>,
    {
        let mut next = self.tracker.clone();
        let value = change(&mut next)?;
        match self.persist(next).await {
            Ok(()) => Ok(value),
            Err(CohortError::StaleRecord { .. }) => {
                self.reload().await?;
                let mut next = self.tracker.clone();
                let value = change(&mut next)?;
                self.persist(next).await?;
                Ok(value)
            }
            Err(e) => Err(e),
        }
    }

    /// Replaces the in-memory record with the stored one.
    async fn reload(&mut self) -> Result<()> {
        let db_path = self.db_path.clone();
        let session_id = self.tracker.record().session_id.clone();
        let agent_id = self.agent_id().to_string();

        let stored = task::spawn_blocking(move || {
            let db = Database::new(&db_path)?;
            db.get_status_record(&session_id, &agent_id)?
                .ok_or_else(|| CohortError::AgentNotFound {
                    session_id,
                    agent_id,
                })
        })
        .await
        .map_err(CohortError::join)??;

        info!("Agent {} reloaded its record after a concurrent write", self.agent_id());
        self.tracker = TaskTracker::new(stored);
        Ok(())
    }

    /// Writes `next` through the store and adopts it on success.
    async fn persist(&mut self, next: TaskTracker) -> Result<()> {
        let db_path = self.db_path.clone();
        let token = self.token;
        let record = next.record().clone();

        let saved = task::spawn_blocking(move || {
            let mut db = Database::new(&db_path)?;
            db.save_status_record(&record, &token)
        })
        .await
        .map_err(CohortError::join)?;

        match saved {
            Ok(()) => {
                self.tracker = next;
                Ok(())
            }
            Err(e @ CohortError::StaleRecord { .. }) => {
                debug!("Agent {} holds a stale record", self.agent_id());
                Err(e)
            }
            Err(e) => {
                warn!("Agent {} failed to persist its record: {e}", self.agent_id());
                Err(e)
            }
        }
    }

    fn agent_id(&self) -> &str {
        &self.tracker.record().agent_id
    }
}
