//! Code allocation against the live `icons` table.
//!
//! Free codes are computed from the rows that hold one at the moment the
//! allocating transaction runs. Two transactions must never compute the
//! free set concurrently, so every allocating unit holds the store's
//! [`AllocationLock`] and writes under `BEGIN IMMEDIATE`, which also
//! serialises writers in other processes sharing the database file.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use iconry_core::{
  code::{CodeRange, CodeSpace},
  icon::IconStatus,
};
use rusqlite::{Connection, params};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
  Result,
  encode::{decode_code, encode_dt, status_list},
};

/// Serialises allocating transactions within one process.
///
/// Cloning is cheap; clones share the same lock.
#[derive(Debug, Clone, Default)]
pub struct AllocationLock(Arc<Mutex<()>>);

impl AllocationLock {
  pub fn new() -> Self { Self::default() }

  /// Wait for exclusive use of the code space. The lease is released on
  /// drop.
  pub async fn acquire(&self) -> OwnedMutexGuard<()> {
    self.0.clone().lock_owned().await
  }
}

/// Codes currently held by RESOLVED and DISABLED rows.
pub fn occupied_codes(conn: &Connection) -> Result<Vec<u32>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT code FROM icons WHERE code IS NOT NULL AND status IN ({})",
    status_list(&IconStatus::CODE_HOLDERS)
  ))?;
  let raws = stmt
    .query_map([], |row| row.get::<_, i64>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(decode_code).collect()
}

pub fn code_space(conn: &Connection, range: CodeRange) -> Result<CodeSpace> {
  Ok(CodeSpace::new(range, occupied_codes(conn)?))
}

/// The code space with `reserved` treated as occupied as well.
pub fn code_space_excluding(
  conn: &Connection,
  range: CodeRange,
  reserved: impl IntoIterator<Item = u32>,
) -> Result<CodeSpace> {
  let mut occupied = occupied_codes(conn)?;
  occupied.extend(reserved);
  Ok(CodeSpace::new(range, occupied))
}

/// Drop codes left behind on deleted and rejected rows. Returns the number
/// of rows touched.
pub fn clear_stale_codes(conn: &Connection, now: DateTime<Utc>) -> Result<usize> {
  let cleared = conn.execute(
    &format!(
      "UPDATE icons SET code = NULL, apply_time = ?1
       WHERE code IS NOT NULL AND status IN ({})",
      status_list(&[IconStatus::Delete, IconStatus::Rejected])
    ),
    params![encode_dt(now)],
  )?;
  if cleared > 0 {
    tracing::debug!(cleared, "cleared codes of deleted and rejected icons");
  }
  Ok(cleared)
}
