//! Repository and project links.
//!
//! Links at [`PENDING_VERSION`] describe the unreleased contents of a
//! repository or project. When one icon row takes over from another, its
//! pending links move with it; released links keep pointing at the row that
//! was actually published.

use iconry_core::icon::{IconId, PENDING_VERSION, RepoId};
use rusqlite::{Connection, params};

use crate::Result;

/// Link `icon_id` to `repo_id` at the pending version, if not linked already.
pub fn link_pending(conn: &Connection, repo_id: RepoId, icon_id: IconId) -> Result<()> {
  conn.execute(
    "INSERT OR IGNORE INTO repo_versions (repository_id, icon_id, version)
     VALUES (?1, ?2, ?3)",
    params![repo_id.0, icon_id.0, PENDING_VERSION],
  )?;
  Ok(())
}

/// Remove every link between `icon_id` and `repo_id`.
pub fn unlink(conn: &Connection, repo_id: RepoId, icon_id: IconId) -> Result<usize> {
  Ok(conn.execute(
    "DELETE FROM repo_versions WHERE repository_id = ?1 AND icon_id = ?2",
    params![repo_id.0, icon_id.0],
  )?)
}

/// Remove the pending repository links of `icon_id`.
pub fn unlink_pending(conn: &Connection, icon_id: IconId) -> Result<usize> {
  Ok(conn.execute(
    "DELETE FROM repo_versions WHERE icon_id = ?1 AND version = ?2",
    params![icon_id.0, PENDING_VERSION],
  )?)
}

/// Counts of links moved by [`move_pending`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Moved {
  pub repos:    usize,
  pub projects: usize,
}

/// Point every pending repository and project link of `from` at `to`.
///
/// `to`'s own pending links are dropped first; whatever it should belong to
/// is exactly what `from` belonged to.
pub fn move_pending(conn: &Connection, from: IconId, to: IconId) -> Result<Moved> {
  unlink_pending(conn, to)?;
  conn.execute(
    "DELETE FROM project_versions WHERE icon_id = ?1 AND version = ?2",
    params![to.0, PENDING_VERSION],
  )?;

  let repos = conn.execute(
    "UPDATE repo_versions SET icon_id = ?2 WHERE icon_id = ?1 AND version = ?3",
    params![from.0, to.0, PENDING_VERSION],
  )?;
  let projects = conn.execute(
    "UPDATE project_versions SET icon_id = ?2 WHERE icon_id = ?1 AND version = ?3",
    params![from.0, to.0, PENDING_VERSION],
  )?;
  Ok(Moved { repos, projects })
}
