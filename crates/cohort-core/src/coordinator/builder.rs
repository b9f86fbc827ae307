//! Builder for creating and configuring Coordinator instances.

use std::path::{Path, PathBuf};

use tokio::task;

use super::Coordinator;
use crate::{
    agent::DEFAULT_MAILBOX_CAPACITY,
    config::ValidatorConfig,
    db::Database,
    error::{CohortError, IoResultExt, Result},
    validator::PlanValidator,
};

/// Builder for creating and configuring Coordinator instances.
#[derive(Debug, Clone)]
pub struct CoordinatorBuilder {
    database_path: Option<PathBuf>,
    validator_config: ValidatorConfig,
    mailbox_capacity: usize,
}

impl CoordinatorBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            database_path: None,
            validator_config: ValidatorConfig::default(),
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
        }
    }

    /// Sets a custom database file path.
    ///
    /// If not specified, uses XDG Base Directory specification:
    /// `$XDG_DATA_HOME/cohort/cohort.db` or `~/.local/share/cohort/cohort.db`
    pub fn with_database_path<P: AsRef<Path>>(mut self, path: Option<P>) -> Self {
        if let Some(path) = path {
            self.database_path = Some(path.as_ref().to_path_buf());
        }
        self
    }

    /// Sets the plan validator thresholds.
    pub fn with_validator_config(mut self, config: ValidatorConfig) -> Self {
        self.validator_config = config;
        self
    }

    /// Sets how many commands an agent actor queues before senders wait.
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity.max(1);
        self
    }

    /// Builds the configured coordinator instance.
    ///
    /// # Errors
    ///
    /// Returns `CohortError::FileSystem` if the database directory cannot be
    /// created.
    /// Returns `CohortError::Database` if database initialization fails
    pub async fn build(self) -> Result<Coordinator> {
        let db_path = if let Some(path) = self.database_path {
            path
        } else {
            Self::default_database_path()?
        };

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).fs_context(parent)?;
        }

        let db_path_clone = db_path.clone();
        task::spawn_blocking(move || {
            let _db = Database::new(&db_path_clone)?;
            Ok::<(), CohortError>(())
        })
        .await
        .map_err(CohortError::join)??;

        Ok(Coordinator::new(
            db_path,
            PlanValidator::new(self.validator_config),
            self.mailbox_capacity,
        ))
    }

    /// Returns the default database path following XDG Base Directory
    /// specification.
    fn default_database_path() -> Result<PathBuf> {
        xdg::BaseDirectories::with_prefix("cohort")
            .place_data_file("cohort.db")
            .map_err(|e| CohortError::XdgDirectory(e.to_string()))
    }
}

impl Default for CoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
