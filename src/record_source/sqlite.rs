//! SQLite-backed record source
//!
//! Reads the `grafico` snapshot table written by the ingestion side. The
//! connection is opened effectively read-only (`PRAGMA query_only`) so a
//! misbehaving query can never take write locks against the writer process.

use super::{RecordSource, SourceError};
use crate::broadcast_core::records::{SignalCounters, SignalRecord};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Mutex;

const SELECT_BASE: &str = "SELECT timestamp, alta, queda, neutro, \
     acumulado_alta, acumulado_queda, acumulado_neutro, \
     rastro_parcial, rastro_acumulado \
     FROM grafico \
     WHERE DATE(timestamp) = ?1 AND TIME(timestamp) >= ?2";

/// Record source over a SQLite `grafico` table
pub struct SqliteRecordSource {
    conn: Mutex<Connection>,
}

impl SqliteRecordSource {
    /// Open the snapshot database in query-only mode
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let conn = Connection::open(db_path)?;
        conn.execute("PRAGMA query_only = ON", [])?;

        log::info!("📥 Record source opened (query-only)");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<SignalRecord> {
        Ok(SignalRecord {
            timestamp: row.get(0)?,
            counters: SignalCounters {
                alta: row.get(1)?,
                queda: row.get(2)?,
                neutro: row.get(3)?,
                acumulado_alta: row.get(4)?,
                acumulado_queda: row.get(5)?,
                acumulado_neutro: row.get(6)?,
                rastro_parcial: row.get(7)?,
                rastro_acumulado: row.get(8)?,
            },
        })
    }

    fn fetch_sync(
        conn: &Connection,
        dia: NaiveDate,
        hora_inicial: NaiveTime,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<SignalRecord>, SourceError> {
        let mut records = Vec::new();

        if let Some(since) = since {
            let sql = format!("{} AND timestamp > ?3 ORDER BY timestamp ASC", SELECT_BASE);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![dia, hora_inicial, since], Self::map_row)?;
            for row in rows {
                records.push(row?);
            }
        } else {
            let sql = format!("{} ORDER BY timestamp ASC", SELECT_BASE);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![dia, hora_inicial], Self::map_row)?;
            for row in rows {
                records.push(row?);
            }
        }

        Ok(records)
    }
}

#[async_trait]
impl RecordSource for SqliteRecordSource {
    async fn fetch_records(
        &self,
        dia: NaiveDate,
        hora_inicial: NaiveTime,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<SignalRecord>, SourceError> {
        let conn = self.conn.lock().unwrap();
        Self::fetch_sync(&conn, dia, hora_inicial, since)
    }
}
