//! Icons, repositories, projects and the association rows between them.
//!
//! An [`Icon`] row is one physical version of an icon. When an icon is
//! replaced, a new row takes over its code and associations and the chain
//! between the two is recorded separately (see [`crate::lifecycle`]).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Version tag of an association that has not been released yet.
pub const PENDING_VERSION: &str = "0.0.0";

// ─── Identifiers ─────────────────────────────────────────────────────────────

macro_rules! id_type {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
      Deserialize,
    )]
    #[serde(transparent)]
    pub struct $name(pub i64);

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
      }
    }

    impl From<i64> for $name {
      fn from(v: i64) -> Self { Self(v) }
    }
  };
}

id_type!(
  /// Surrogate key of an icon row; never reused.
  IconId
);
id_type!(RepoId);
id_type!(ProjectId);
id_type!(UserId);

// ─── Status ──────────────────────────────────────────────────────────────────

/// Lifecycle status of an icon row. The discriminants are the values stored
/// in the database.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(i64)]
pub enum IconStatus {
  Delete    = -1,
  Uploaded  = 0,
  Replacing = 1,
  Rejected  = 5,
  Pending   = 10,
  Replace   = 11,
  Disabled  = 18,
  Resolved  = 20,
  Replaced  = 21,
}

impl IconStatus {
  /// Statuses whose rows occupy a code in the code space.
  pub const CODE_HOLDERS: [IconStatus; 2] =
    [IconStatus::Disabled, IconStatus::Resolved];

  pub const fn as_i64(self) -> i64 { self as i64 }

  pub fn from_i64(value: i64) -> Result<Self> {
    use strum::IntoEnumIterator as _;
    Self::iter()
      .find(|s| s.as_i64() == value)
      .ok_or(Error::UnknownStatus(value))
  }

  /// Whether a row in this status counts towards code occupancy.
  pub fn holds_code(self) -> bool { Self::CODE_HOLDERS.contains(&self) }

  /// Whether the icon is waiting for an auditor.
  pub fn awaits_audit(self) -> bool {
    matches!(self, Self::Pending | Self::Replace)
  }
}

// ─── Icon ────────────────────────────────────────────────────────────────────

/// One physical icon row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Icon {
  pub id:          IconId,
  pub name:        String,
  pub tags:        String,
  pub font_class:  Option<String>,
  /// Vector path data extracted from the uploaded SVG.
  pub path:        String,
  pub uploader:    UserId,
  pub code:        Option<u32>,
  pub status:      IconStatus,
  /// The icon this row replaced, or the icon it proposes to replace while
  /// its replacement is still waiting for audit.
  pub old_id:      Option<IconId>,
  /// The icon that replaced this row.
  pub new_id:      Option<IconId>,
  /// JSON-encoded [`crate::validate::CodeDescription`] for disabled codes.
  pub description: Option<String>,
  pub apply_time:  DateTime<Utc>,
  pub create_time: DateTime<Utc>,
}

impl Icon {
  pub fn to_ref(&self) -> IconRef {
    IconRef { id: self.id, name: self.name.clone() }
  }
}

/// Id and display name; the shape icons take inside audit-trail entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconRef {
  pub id:   IconId,
  pub name: String,
}

/// The raw SVG an icon was uploaded from, kept until the icon is audited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
  pub icon_id: IconId,
  pub svg:     Option<String>,
}

// ─── Users ───────────────────────────────────────────────────────────────────

/// The `actor` level of a user.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[repr(i64)]
pub enum Role {
  #[default]
  Member      = 0,
  /// Audits the repositories they administer.
  RepoAuditor = 1,
  SuperAdmin  = 2,
}

impl Role {
  pub const fn as_i64(self) -> i64 { self as i64 }

  pub fn from_i64(value: i64) -> Self {
    match value {
      2 => Self::SuperAdmin,
      1 => Self::RepoAuditor,
      _ => Self::Member,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub id:   UserId,
  pub name: String,
  pub role: Role,
}

// ─── Repositories and projects ───────────────────────────────────────────────

/// A public icon library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repo {
  pub id:         RepoId,
  pub name:       String,
  /// Short name used as the prefix of generated font classes.
  pub alias:      String,
  pub admin:      UserId,
  pub updated_at: DateTime<Utc>,
}

/// A user project that collects icons from any repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
  pub id:    ProjectId,
  pub name:  String,
  pub owner: UserId,
}

/// Links a repository to an icon at a version tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoVersion {
  pub repo_id: RepoId,
  pub icon_id: IconId,
  pub version: String,
}

impl RepoVersion {
  pub fn is_pending(&self) -> bool { self.version == PENDING_VERSION }
}

/// Links a project to an icon at a version tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectVersion {
  pub project_id: ProjectId,
  pub icon_id:    IconId,
  pub version:    String,
}

impl ProjectVersion {
  pub fn is_pending(&self) -> bool { self.version == PENDING_VERSION }
}
