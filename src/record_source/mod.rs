//! Record source contract
//!
//! The relational store and the process that writes snapshot rows belong to
//! other components; this crate consumes them through one narrow read
//! interface. The store has no subscribe capability, so the engine re-polls
//! on its cadence — the `since` cursor keeps steady-state pulls bounded by
//! the number of new rows instead of re-reading the whole window.

pub mod sqlite;

pub use sqlite::SqliteRecordSource;

use crate::broadcast_core::records::SignalRecord;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

#[derive(Debug)]
pub enum SourceError {
    Database(rusqlite::Error),
    Unavailable(String),
}

impl From<rusqlite::Error> for SourceError {
    fn from(err: rusqlite::Error) -> Self {
        SourceError::Database(err)
    }
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Database(e) => write!(f, "Database error: {}", e),
            SourceError::Unavailable(msg) => write!(f, "Store unavailable: {}", msg),
        }
    }
}

impl std::error::Error for SourceError {}

/// Read contract over the snapshot store.
///
/// Returns all rows for calendar day `dia` from time-of-day `hora_inicial`
/// onward, ascending by timestamp; `since` restricts the pull to rows
/// strictly newer than the given instant. No matching rows is an empty
/// sequence, never an error.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_records(
        &self,
        dia: NaiveDate,
        hora_inicial: NaiveTime,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<SignalRecord>, SourceError>;
}
