//! Audit-trail events.
//!
//! Every state transition the engine commits is accompanied by one or more
//! [`LogEvent`]s. Stores persist them inside the same transaction as the
//! business rows they describe, so a trail entry exists exactly when its
//! change does.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::icon::{IconRef, RepoId, UserId};

/// The kind of an audit-trail entry.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LogKind {
  Upload,
  AuditOk,
  AuditFailed,
  Replace,
  DisabledCodeAdd,
}

/// Entry payload; its shape depends on the kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogParams {
  Icons { icon: Vec<IconRef> },
  Replace { icon_from: IconRef, icon_to: IconRef },
  Codes { code: Vec<u32> },
}

/// One entry to be recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
  pub kind:        LogKind,
  /// The repository the entry belongs to; `None` for system-wide entries.
  pub repo_id:     Option<RepoId>,
  pub params:      LogParams,
  /// Users to notify about the entry.
  pub subscribers: Vec<UserId>,
}

impl LogEvent {
  pub fn upload(repo_id: RepoId, icons: Vec<IconRef>, admin: UserId) -> Self {
    Self {
      kind:        LogKind::Upload,
      repo_id:     Some(repo_id),
      params:      LogParams::Icons { icon: icons },
      subscribers: vec![admin],
    }
  }

  pub fn audit_ok(repo_id: RepoId, icons: Vec<IconRef>, subscribers: Vec<UserId>) -> Self {
    Self {
      kind: LogKind::AuditOk,
      repo_id: Some(repo_id),
      params: LogParams::Icons { icon: icons },
      subscribers,
    }
  }

  pub fn audit_failed(
    repo_id: RepoId,
    icons: Vec<IconRef>,
    subscribers: Vec<UserId>,
  ) -> Self {
    Self {
      kind: LogKind::AuditFailed,
      repo_id: Some(repo_id),
      params: LogParams::Icons { icon: icons },
      subscribers,
    }
  }

  pub fn replace(repo_id: RepoId, from: IconRef, to: IconRef) -> Self {
    Self {
      kind:        LogKind::Replace,
      repo_id:     Some(repo_id),
      params:      LogParams::Replace { icon_from: from, icon_to: to },
      subscribers: Vec::new(),
    }
  }

  pub fn disabled_codes(codes: Vec<u32>) -> Self {
    Self {
      kind:        LogKind::DisabledCodeAdd,
      repo_id:     None,
      params:      LogParams::Codes { code: codes },
      subscribers: Vec::new(),
    }
  }

  /// The logger id as stored: the repository id, or 0 for system entries.
  pub fn logger_id(&self) -> i64 { self.repo_id.map_or(0, |r| r.0) }
}

/// A recorded entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
  pub log_id:      Uuid,
  pub actor:       UserId,
  pub recorded_at: DateTime<Utc>,
  #[serde(flatten)]
  pub event:       LogEvent,
}

/// Deduplicate user ids, keeping first-seen order.
pub fn unique_subscribers(ids: impl IntoIterator<Item = UserId>) -> Vec<UserId> {
  let mut out: Vec<UserId> = Vec::new();
  for id in ids {
    if !out.contains(&id) {
      out.push(id);
    }
  }
  out
}
