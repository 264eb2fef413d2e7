//! Persisting audit-trail entries.
//!
//! A [`LogRecorder`] is handed the open write transaction, so its entries
//! commit or roll back together with the change they describe. A recorder
//! error aborts the whole unit.

use chrono::Utc;
use iconry_core::{
  icon::{RepoId, UserId},
  log::{LogEntry, LogEvent},
};
use rusqlite::{Connection, Transaction, params};
use uuid::Uuid;

use crate::{
  Result,
  encode::{RawLog, encode_dt, encode_uuid},
};

pub trait LogRecorder: Send + Sync {
  fn record(
    &self,
    tx: &Transaction<'_>,
    actor: UserId,
    events: &[LogEvent],
  ) -> Result<()>;
}

/// Writes entries to the store's own `logs` table.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableLogRecorder;

impl LogRecorder for TableLogRecorder {
  fn record(
    &self,
    tx: &Transaction<'_>,
    actor: UserId,
    events: &[LogEvent],
  ) -> Result<()> {
    let now = encode_dt(Utc::now());
    let mut stmt = tx.prepare_cached(
      "INSERT INTO logs (log_id, logger_id, kind, params, subscribers, actor, recorded_at)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for event in events {
      stmt.execute(params![
        encode_uuid(Uuid::new_v4()),
        event.logger_id(),
        event.kind.to_string(),
        serde_json::to_string(&event.params)?,
        serde_json::to_string(&event.subscribers)?,
        actor.0,
        now,
      ])?;
    }
    Ok(())
  }
}

/// Entries of one logger, oldest first.
pub fn read_logs(conn: &Connection, repo_id: Option<RepoId>) -> Result<Vec<LogEntry>> {
  let mut stmt = conn.prepare(
    "SELECT log_id, logger_id, kind, params, subscribers, actor, recorded_at
     FROM logs WHERE logger_id = ?1 ORDER BY recorded_at, rowid",
  )?;
  let raws = stmt
    .query_map(params![repo_id.map_or(0, |r| r.0)], RawLog::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawLog::into_entry).collect()
}
