//! SQLite record store for plans, sessions and agent status records.
//!
//! Every record is stored as JSON next to the columns needed to index it.
//! Writes run inside a single transaction and validate the record first, so a
//! reader never observes a torn or schema-violating record.
//!
//! Status records are keyed by `(session_id, agent_id)` and carry an owner
//! token: [`Database::register_status_record`] issues it and
//! [`Database::save_status_record`] refuses writes that do not present it.

use std::{path::Path, time::Duration};

use jiff::Timestamp;
use rusqlite::{types::Type, Connection, Transaction, TransactionBehavior};

use crate::error::{DatabaseResultExt, Result};

pub mod migrations;
pub mod plan_queries;
pub mod session_queries;
pub mod status_queries;

pub use status_queries::TaskClaim;

/// How long a connection waits for another writer before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database connection and operations handler.
pub struct Database {
    connection: Connection,
}

impl Database {
    /// Opens or creates the store at `path` and initializes the schema.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let connection = Connection::open(path).db_context("Failed to open database connection")?;
        connection
            .busy_timeout(BUSY_TIMEOUT)
            .db_context("Failed to set busy timeout")?;

        let db = Self { connection };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Starts a write transaction that takes the write lock immediately.
    fn begin(&mut self) -> Result<Transaction<'_>> {
        self.connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .db_context("Failed to begin transaction")
    }
}

/// Reads an RFC 3339 timestamp column.
fn timestamp_column(row: &rusqlite::Row, index: usize) -> rusqlite::Result<Timestamp> {
    row.get::<_, String>(index)?
        .parse::<Timestamp>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

/// Reads a JSON document column.
fn json_column<T: serde::de::DeserializeOwned>(
    row: &rusqlite::Row,
    index: usize,
) -> rusqlite::Result<T> {
    let text: String = row.get(index)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

/// Reads a text column through `FromStr`.
fn parsed_column<T>(row: &rusqlite::Row, index: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let text: String = row.get(index)?;
    text.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            Type::Text,
            Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Invalid value '{text}': {e}"),
            )),
        )
    })
}
