//! Synchronous row helpers shared by the transactional units and the read
//! side. Everything here takes a plain `&Connection`, so it runs equally
//! inside a write transaction or a read-only `call`.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use iconry_core::{
  code::parse_entity,
  icon::{
    CacheEntry, Icon, IconId, IconStatus, PENDING_VERSION, Project, ProjectId, Repo,
    RepoId, Role, User, UserId,
  },
  lifecycle::{Lineage, Replacement},
  permission::{Action, Stakeholders, authorize},
  store::{IconDetail, QueuedIcon, RepoHits, SearchResult},
};
use rusqlite::{Connection, OptionalExtension as _, params};

use crate::{
  Error, Result,
  encode::{
    ICON_SELECT, REPO_SELECT, RawIcon, RawRepo, USER_SELECT, encode_dt, encode_uuid,
    project_from_row, status_list, user_from_row,
  },
};

// ─── Lookups ─────────────────────────────────────────────────────────────────

pub fn fetch_user(conn: &Connection, id: UserId) -> Result<Option<User>> {
  Ok(
    conn
      .query_row(&format!("{USER_SELECT} WHERE id = ?1"), params![id.0], user_from_row)
      .optional()?,
  )
}

pub fn require_user(conn: &Connection, id: UserId) -> Result<User> {
  fetch_user(conn, id)?.ok_or(Error::Core(iconry_core::Error::UserNotFound(id)))
}

pub fn fetch_repo(conn: &Connection, id: RepoId) -> Result<Option<Repo>> {
  conn
    .query_row(&format!("{REPO_SELECT} WHERE r.id = ?1"), params![id.0], RawRepo::from_row)
    .optional()?
    .map(RawRepo::into_repo)
    .transpose()
}

pub fn require_repo(conn: &Connection, id: RepoId) -> Result<Repo> {
  fetch_repo(conn, id)?.ok_or(Error::Core(iconry_core::Error::RepoNotFound(id)))
}

pub fn fetch_project(conn: &Connection, id: ProjectId) -> Result<Option<Project>> {
  Ok(
    conn
      .query_row(
        "SELECT id, name, owner FROM projects WHERE id = ?1",
        params![id.0],
        project_from_row,
      )
      .optional()?,
  )
}

pub fn fetch_icon(conn: &Connection, id: IconId) -> Result<Option<Icon>> {
  conn
    .query_row(&format!("{ICON_SELECT} WHERE i.id = ?1"), params![id.0], RawIcon::from_row)
    .optional()?
    .map(RawIcon::into_icon)
    .transpose()
}

pub fn require_icon(conn: &Connection, id: IconId) -> Result<Icon> {
  fetch_icon(conn, id)?.ok_or(Error::Core(iconry_core::Error::IconNotFound(id)))
}

/// Run an icon query whose `WHERE`/`ORDER BY` tail is `tail`.
pub fn select_icons(
  conn: &Connection,
  tail: &str,
  params: impl rusqlite::Params,
) -> Result<Vec<Icon>> {
  let mut stmt = conn.prepare(&format!("{ICON_SELECT} {tail}"))?;
  let raws = stmt
    .query_map(params, RawIcon::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawIcon::into_icon).collect()
}

/// Repositories an icon is linked to at any version, by id.
pub fn icon_repos(conn: &Connection, icon_id: IconId) -> Result<Vec<Repo>> {
  let mut stmt = conn.prepare(&format!(
    "{REPO_SELECT}
     WHERE r.id IN (SELECT repository_id FROM repo_versions WHERE icon_id = ?1)
     ORDER BY r.id"
  ))?;
  let raws = stmt
    .query_map(params![icon_id.0], RawRepo::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawRepo::into_repo).collect()
}

/// The first repository an icon is linked to, or [`NoRepository`].
///
/// [`NoRepository`]: iconry_core::Error::NoRepository
pub fn owning_repo(conn: &Connection, icon: &Icon) -> Result<Repo> {
  icon_repos(conn, icon.id)?.into_iter().next().ok_or_else(|| {
    Error::Core(iconry_core::Error::NoRepository {
      id:   icon.id,
      name: icon.name.clone(),
    })
  })
}

pub fn cache_entry(conn: &Connection, icon_id: IconId) -> Result<Option<CacheEntry>> {
  Ok(
    conn
      .query_row(
        "SELECT icon_id, svg FROM caches WHERE icon_id = ?1",
        params![icon_id.0],
        |row| Ok(CacheEntry { icon_id: IconId(row.get(0)?), svg: row.get(1)? }),
      )
      .optional()?,
  )
}

// ─── Small writes ────────────────────────────────────────────────────────────

pub fn delete_cache(conn: &Connection, icon_id: IconId) -> Result<()> {
  conn.execute("DELETE FROM caches WHERE icon_id = ?1", params![icon_id.0])?;
  Ok(())
}

pub fn touch_repo(conn: &Connection, repo_id: RepoId, now: DateTime<Utc>) -> Result<()> {
  conn.execute(
    "UPDATE repositories SET updated_at = ?2 WHERE id = ?1",
    params![repo_id.0, encode_dt(now)],
  )?;
  Ok(())
}

pub fn set_status(
  conn: &Connection,
  id: IconId,
  status: IconStatus,
  now: DateTime<Utc>,
) -> Result<()> {
  conn.execute(
    "UPDATE icons SET status = ?2, apply_time = ?3 WHERE id = ?1",
    params![id.0, status.as_i64(), encode_dt(now)],
  )?;
  Ok(())
}

pub fn record_replacement(conn: &Connection, edge: &Replacement) -> Result<()> {
  conn.execute(
    "INSERT INTO replacements (replacement_id, old_icon_id, new_icon_id, kind, recorded_at)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    params![
      encode_uuid(edge.replacement_id),
      edge.old_icon_id.0,
      edge.new_icon_id.0,
      edge.kind.to_string(),
      encode_dt(edge.recorded_at),
    ],
  )?;
  Ok(())
}

/// Column values of an icon row about to be inserted.
pub struct NewIconRow<'a> {
  pub name:        &'a str,
  pub tags:        &'a str,
  pub font_class:  Option<&'a str>,
  pub path:        &'a str,
  pub uploader:    UserId,
  pub code:        Option<u32>,
  pub status:      IconStatus,
  pub description: Option<&'a str>,
  pub apply_time:  DateTime<Utc>,
  pub create_time: DateTime<Utc>,
}

pub fn insert_icon(conn: &Connection, row: &NewIconRow<'_>) -> Result<IconId> {
  conn.execute(
    "INSERT INTO icons (
       name, tags, font_class, path, uploader, code, status,
       description, apply_time, create_time
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    params![
      row.name,
      row.tags,
      row.font_class,
      row.path,
      row.uploader.0,
      row.code,
      row.status.as_i64(),
      row.description,
      encode_dt(row.apply_time),
      encode_dt(row.create_time),
    ],
  )?;
  Ok(IconId(conn.last_insert_rowid()))
}

// ─── Read models ─────────────────────────────────────────────────────────────

pub fn get_icons(conn: &Connection, ids: &[IconId]) -> Result<Vec<Icon>> {
  let mut icons = Vec::with_capacity(ids.len());
  for id in ids {
    if let Some(icon) = fetch_icon(conn, *id)? {
      icons.push(icon);
    }
  }
  icons.sort_by_key(|i| i.id);
  icons.dedup_by_key(|i| i.id);
  Ok(icons)
}

pub fn icon_detail(conn: &Connection, id: IconId) -> Result<Option<IconDetail>> {
  let Some(icon) = fetch_icon(conn, id)? else {
    return Ok(None);
  };
  let repo = icon_repos(conn, id)?.into_iter().next();
  let cache = cache_entry(conn, id)?;
  Ok(Some(IconDetail { icon, repo, cache }))
}

/// Walk the committed replace chain through `id` in both directions.
pub fn lineage(conn: &Connection, id: IconId) -> Result<Option<Lineage>> {
  if fetch_icon(conn, id)?.is_none() {
    return Ok(None);
  }

  let step = |sql: &str, from: IconId| -> Result<Option<IconId>> {
    Ok(
      conn
        .query_row(sql, params![from.0], |row| row.get::<_, i64>(0))
        .optional()?
        .map(IconId),
    )
  };

  let mut seen = HashSet::from([id]);
  let mut back = Vec::new();
  let mut cursor = id;
  while let Some(prev) =
    step("SELECT old_icon_id FROM replacements WHERE new_icon_id = ?1", cursor)?
  {
    if !seen.insert(prev) {
      return Err(Error::Corrupt(format!("replace chain through {id} loops")));
    }
    back.push(prev);
    cursor = prev;
  }

  let mut ids: Vec<IconId> = back.into_iter().rev().collect();
  ids.push(id);
  cursor = id;
  while let Some(next) =
    step("SELECT new_icon_id FROM replacements WHERE old_icon_id = ?1", cursor)?
  {
    if !seen.insert(next) {
      return Err(Error::Corrupt(format!("replace chain through {id} loops")));
    }
    ids.push(next);
    cursor = next;
  }

  let icons = ids
    .into_iter()
    .map(|i| require_icon(conn, i))
    .collect::<Result<Vec<_>>>()?;
  Ok(Some(Lineage { icons }))
}

pub fn uploaded_icons(conn: &Connection, uploader: UserId) -> Result<Vec<Icon>> {
  select_icons(
    conn,
    &format!(
      "WHERE i.uploader = ?1 AND i.status IN ({}) ORDER BY i.id",
      status_list(&[IconStatus::Uploaded, IconStatus::Replacing])
    ),
    params![uploader.0],
  )
}

/// Icons awaiting audit in repositories `actor` may audit.
pub fn audit_queue(conn: &Connection, actor: &User) -> Result<Vec<QueuedIcon>> {
  authorize(actor, Action::ViewAuditQueue, Stakeholders::default())?;

  let sql = format!(
    "SELECT i.id, rv.repository_id FROM icons i
     JOIN repo_versions rv ON rv.icon_id = i.id AND rv.version = ?1
     JOIN repositories  rp ON rp.id = rv.repository_id
     WHERE i.status IN ({}) AND (?2 OR rp.admin = ?3)
     ORDER BY rp.id, i.id",
    status_list(&[IconStatus::Pending, IconStatus::Replace])
  );
  let mut stmt = conn.prepare(&sql)?;
  let pairs = stmt
    .query_map(
      params![PENDING_VERSION, actor.role == Role::SuperAdmin, actor.id.0],
      |row| Ok((IconId(row.get(0)?), RepoId(row.get(1)?))),
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut repos: BTreeMap<RepoId, Repo> = BTreeMap::new();
  let mut users: BTreeMap<UserId, User> = BTreeMap::new();
  let mut out = Vec::with_capacity(pairs.len());
  for (icon_id, repo_id) in pairs {
    let icon = require_icon(conn, icon_id)?;
    let repo = match repos.get(&repo_id) {
      Some(repo) => repo.clone(),
      None => {
        let repo = require_repo(conn, repo_id)?;
        repos.insert(repo_id, repo.clone());
        repo
      }
    };
    let uploader = match users.get(&icon.uploader) {
      Some(user) => user.clone(),
      None => {
        let user = require_user(conn, icon.uploader)?;
        users.insert(user.id, user.clone());
        user
      }
    };
    out.push(QueuedIcon { icon, repo, uploader });
  }
  Ok(out)
}

/// Live icons matching `query`, grouped by repository.
pub fn search(conn: &Connection, query: &str) -> Result<SearchResult> {
  let statuses = status_list(&[IconStatus::Resolved, IconStatus::Replaced]);
  let query = query.trim();
  if query.is_empty() {
    return Err(Error::Core(iconry_core::Error::Empty("search query")));
  }

  let icons = match parse_entity(query) {
    Some(code) => select_icons(
      conn,
      &format!("WHERE i.code = ?1 AND i.status IN ({statuses}) ORDER BY i.id"),
      params![code],
    )?,
    None => {
      let pattern = format!("%{}%", query.replace('%', "\\%").replace('_', "\\_"));
      select_icons(
        conn,
        &format!(
          "WHERE (i.name LIKE ?1 ESCAPE '\\' OR i.tags LIKE ?1 ESCAPE '\\')
             AND i.status IN ({statuses})
           ORDER BY i.id"
        ),
        params![pattern],
      )?
    }
  };

  let mut grouped: BTreeMap<RepoId, RepoHits> = BTreeMap::new();
  let mut total_count = 0;
  for icon in icons {
    let Some(repo) = icon_repos(conn, icon.id)?.into_iter().next() else {
      continue;
    };
    total_count += 1;
    grouped
      .entry(repo.id)
      .or_insert_with(|| RepoHits { repo_id: repo.id, name: repo.name, icons: Vec::new() })
      .icons
      .push(icon);
  }

  Ok(SearchResult { repos: grouped.into_values().collect(), total_count })
}

pub fn list_disabled(conn: &Connection) -> Result<Vec<Icon>> {
  select_icons(
    conn,
    "WHERE i.status = ?1 ORDER BY i.code",
    params![IconStatus::Disabled.as_i64()],
  )
}
