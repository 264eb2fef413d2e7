//! Encoding and decoding helpers between Rust domain types and the plain
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, statuses and roles as their
//! integer values, log params and subscriber lists as compact JSON, UUIDs as
//! hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use iconry_core::{
  icon::{
    Icon, IconId, IconStatus, Project, ProjectId, ProjectVersion, Repo, RepoId,
    RepoVersion, Role, User, UserId,
  },
  log::{LogEntry, LogEvent, LogKind, LogParams},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_code(raw: i64) -> Result<u32> {
  u32::try_from(raw).map_err(|_| Error::Corrupt(format!("code {raw} out of u32 range")))
}

/// `IN (..)` list of statuses, for statements that cannot bind a list.
pub fn status_list(statuses: &[IconStatus]) -> String {
  statuses
    .iter()
    .map(|s| s.as_i64().to_string())
    .collect::<Vec<_>>()
    .join(", ")
}

// ─── Icons ───────────────────────────────────────────────────────────────────

/// Column list shared by every icon query. `old_id` falls back to the
/// pending replace target when no committed predecessor exists.
pub const ICON_SELECT: &str = "
SELECT
  i.id, i.name, i.tags, i.font_class, i.path, i.uploader, i.code, i.status,
  COALESCE(r_in.old_icon_id, i.replace_target) AS old_id,
  r_out.new_icon_id                            AS new_id,
  i.description, i.apply_time, i.create_time
FROM icons i
LEFT JOIN replacements r_in  ON r_in.new_icon_id  = i.id
LEFT JOIN replacements r_out ON r_out.old_icon_id = i.id";

/// Raw values read from an [`ICON_SELECT`] row.
pub struct RawIcon {
  pub id:          i64,
  pub name:        String,
  pub tags:        String,
  pub font_class:  Option<String>,
  pub path:        String,
  pub uploader:    i64,
  pub code:        Option<i64>,
  pub status:      i64,
  pub old_id:      Option<i64>,
  pub new_id:      Option<i64>,
  pub description: Option<String>,
  pub apply_time:  String,
  pub create_time: String,
}

impl RawIcon {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      name:        row.get(1)?,
      tags:        row.get(2)?,
      font_class:  row.get(3)?,
      path:        row.get(4)?,
      uploader:    row.get(5)?,
      code:        row.get(6)?,
      status:      row.get(7)?,
      old_id:      row.get(8)?,
      new_id:      row.get(9)?,
      description: row.get(10)?,
      apply_time:  row.get(11)?,
      create_time: row.get(12)?,
    })
  }

  pub fn into_icon(self) -> Result<Icon> {
    Ok(Icon {
      id:          IconId(self.id),
      name:        self.name,
      tags:        self.tags,
      font_class:  self.font_class,
      path:        self.path,
      uploader:    UserId(self.uploader),
      code:        self.code.map(decode_code).transpose()?,
      status:      IconStatus::from_i64(self.status)?,
      old_id:      self.old_id.map(IconId),
      new_id:      self.new_id.map(IconId),
      description: self.description,
      apply_time:  decode_dt(&self.apply_time)?,
      create_time: decode_dt(&self.create_time)?,
    })
  }
}

// ─── Users, repositories, projects ───────────────────────────────────────────

pub const USER_SELECT: &str = "SELECT id, name, role FROM users";

pub fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
  Ok(User {
    id:   UserId(row.get(0)?),
    name: row.get(1)?,
    role: Role::from_i64(row.get(2)?),
  })
}

pub const REPO_SELECT: &str =
  "SELECT r.id, r.name, r.alias, r.admin, r.updated_at FROM repositories r";

pub struct RawRepo {
  pub id:         i64,
  pub name:       String,
  pub alias:      String,
  pub admin:      i64,
  pub updated_at: String,
}

impl RawRepo {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      name:       row.get(1)?,
      alias:      row.get(2)?,
      admin:      row.get(3)?,
      updated_at: row.get(4)?,
    })
  }

  pub fn into_repo(self) -> Result<Repo> {
    Ok(Repo {
      id:         RepoId(self.id),
      name:       self.name,
      alias:      self.alias,
      admin:      UserId(self.admin),
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

pub fn project_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
  Ok(Project {
    id:    ProjectId(row.get(0)?),
    name:  row.get(1)?,
    owner: UserId(row.get(2)?),
  })
}

pub fn repo_version_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RepoVersion> {
  Ok(RepoVersion {
    repo_id: RepoId(row.get(0)?),
    icon_id: IconId(row.get(1)?),
    version: row.get(2)?,
  })
}

pub fn project_version_from_row(
  row: &rusqlite::Row<'_>,
) -> rusqlite::Result<ProjectVersion> {
  Ok(ProjectVersion {
    project_id: ProjectId(row.get(0)?),
    icon_id:    IconId(row.get(1)?),
    version:    row.get(2)?,
  })
}

// ─── Logs ────────────────────────────────────────────────────────────────────

pub struct RawLog {
  pub log_id:      String,
  pub logger_id:   i64,
  pub kind:        String,
  pub params:      String,
  pub subscribers: String,
  pub actor:       i64,
  pub recorded_at: String,
}

impl RawLog {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      log_id:      row.get(0)?,
      logger_id:   row.get(1)?,
      kind:        row.get(2)?,
      params:      row.get(3)?,
      subscribers: row.get(4)?,
      actor:       row.get(5)?,
      recorded_at: row.get(6)?,
    })
  }

  pub fn into_entry(self) -> Result<LogEntry> {
    let kind: LogKind = self
      .kind
      .parse()
      .map_err(|_| Error::Corrupt(format!("unknown log kind: {:?}", self.kind)))?;
    let params: LogParams = serde_json::from_str(&self.params)?;
    let subscribers: Vec<UserId> = serde_json::from_str(&self.subscribers)?;
    Ok(LogEntry {
      log_id:      decode_uuid(&self.log_id)?,
      actor:       UserId(self.actor),
      recorded_at: decode_dt(&self.recorded_at)?,
      event:       LogEvent {
        kind,
        repo_id: (self.logger_id != 0).then_some(RepoId(self.logger_id)),
        params,
        subscribers,
      },
    })
  }
}
