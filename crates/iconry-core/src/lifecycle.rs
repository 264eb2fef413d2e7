//! The icon state machine and replace chains.
//!
//! Every status-affecting write goes through [`transition`], which rejects
//! any (status, event) pair not listed below before the store touches a row.
//!
//! | From                  | Event               | To        |
//! |-----------------------|---------------------|-----------|
//! | —                     | `Upload`            | UPLOADED  |
//! | —                     | `UploadReplacement` | REPLACING |
//! | UPLOADED              | `Submit`            | PENDING   |
//! | REPLACING             | `SubmitReplacement` | REPLACE   |
//! | PENDING, REPLACE      | `AuditPass`         | RESOLVED  |
//! | PENDING, REPLACE      | `AuditFail`         | REJECTED  |
//! | REPLACING             | `Replace`           | RESOLVED  |
//! | RESOLVED              | `Supersede`         | REPLACED  |
//! | RESOLVED              | `Disable`           | DISABLED  |
//! | DISABLED              | `Restore`           | RESOLVED  |
//! | UPLOADED, REJECTED    | `Delete`            | DELETE    |
//! | REPLACE               | `Overwrite`         | DELETE    |
//!
//! Replace chains are not stored on the icon rows themselves. Each committed
//! supersession is an append-only [`Replacement`] record; an icon's
//! `old_id`/`new_id` are derived from those records on read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  icon::{Icon, IconId, IconStatus},
};

// ─── Events ──────────────────────────────────────────────────────────────────

/// Something that happens to an icon.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IconEvent {
  Upload,
  UploadReplacement,
  Submit,
  SubmitReplacement,
  AuditPass,
  AuditFail,
  /// The new side of a direct replace.
  Replace,
  /// The old side of any replace.
  Supersede,
  Disable,
  Restore,
  Delete,
  /// A pending replacement made obsolete by a newer one for the same icon.
  Overwrite,
}

impl IconEvent {
  /// The status a newly created row starts in, for creation events.
  pub fn initial_status(self) -> Option<IconStatus> {
    match self {
      Self::Upload => Some(IconStatus::Uploaded),
      Self::UploadReplacement => Some(IconStatus::Replacing),
      _ => None,
    }
  }
}

/// The status an icon in `from` moves to on `event`.
pub fn transition(from: IconStatus, event: IconEvent) -> Result<IconStatus> {
  use IconEvent as E;
  use IconStatus as S;

  let to = match (from, event) {
    (S::Uploaded, E::Submit) => S::Pending,
    (S::Replacing, E::SubmitReplacement) => S::Replace,
    (S::Pending | S::Replace, E::AuditPass) => S::Resolved,
    (S::Pending | S::Replace, E::AuditFail) => S::Rejected,
    (S::Replacing, E::Replace) => S::Resolved,
    (S::Resolved, E::Supersede) => S::Replaced,
    (S::Resolved, E::Disable) => S::Disabled,
    (S::Disabled, E::Restore) => S::Resolved,
    (S::Uploaded | S::Rejected, E::Delete) => S::Delete,
    (S::Replace, E::Overwrite) => S::Delete,
    _ => return Err(Error::InvalidTransition { from, event }),
  };
  Ok(to)
}

/// Guard that `icon` is exactly in `expected`.
pub fn ensure_status(icon: &Icon, expected: IconStatus) -> Result<()> {
  if icon.status == expected {
    Ok(())
  } else {
    Err(Error::UnexpectedStatus {
      id: icon.id,
      name: icon.name.clone(),
      expected,
      actual: icon.status,
    })
  }
}

// ─── Replace chains ──────────────────────────────────────────────────────────

/// Why one icon row took over from another.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReplacementKind {
  /// A new upload replaced a resolved icon.
  Replace,
  /// The old icon's code was disabled and the icon moved to a fresh code.
  Disable,
}

/// One committed edge of a replace chain. An icon is the old side of at most
/// one replacement and the new side of at most one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Replacement {
  pub replacement_id: Uuid,
  pub old_icon_id:    IconId,
  pub new_icon_id:    IconId,
  pub kind:           ReplacementKind,
  pub recorded_at:    DateTime<Utc>,
}

impl Replacement {
  pub fn new(old_icon_id: IconId, new_icon_id: IconId, kind: ReplacementKind) -> Self {
    Self {
      replacement_id: Uuid::new_v4(),
      old_icon_id,
      new_icon_id,
      kind,
      recorded_at: Utc::now(),
    }
  }
}

/// The physical rows of one logical icon, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lineage {
  pub icons: Vec<Icon>,
}

impl Lineage {
  /// The row currently standing for the logical icon.
  pub fn current(&self) -> Option<&Icon> { self.icons.last() }

  pub fn ids(&self) -> Vec<IconId> { self.icons.iter().map(|i| i.id).collect() }
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator as _;

  use super::*;

  #[test]
  fn audit_outcomes() {
    assert_eq!(
      transition(IconStatus::Pending, IconEvent::AuditPass).unwrap(),
      IconStatus::Resolved
    );
    assert_eq!(
      transition(IconStatus::Replace, IconEvent::AuditFail).unwrap(),
      IconStatus::Rejected
    );
  }

  #[test]
  fn replace_moves_both_sides() {
    assert_eq!(
      transition(IconStatus::Replacing, IconEvent::Replace).unwrap(),
      IconStatus::Resolved
    );
    assert_eq!(
      transition(IconStatus::Resolved, IconEvent::Supersede).unwrap(),
      IconStatus::Replaced
    );
  }

  #[test]
  fn pending_icon_cannot_be_superseded() {
    let err = transition(IconStatus::Pending, IconEvent::Supersede).unwrap_err();
    assert!(matches!(
      err,
      Error::InvalidTransition { from: IconStatus::Pending, event: IconEvent::Supersede }
    ));
  }

  #[test]
  fn resolved_icons_cannot_be_deleted() {
    assert!(transition(IconStatus::Resolved, IconEvent::Delete).is_err());
    assert!(transition(IconStatus::Pending, IconEvent::Delete).is_err());
    assert_eq!(
      transition(IconStatus::Rejected, IconEvent::Delete).unwrap(),
      IconStatus::Delete
    );
  }

  #[test]
  fn replaced_and_deleted_rows_are_terminal() {
    let events = [
      IconEvent::Submit,
      IconEvent::SubmitReplacement,
      IconEvent::AuditPass,
      IconEvent::AuditFail,
      IconEvent::Replace,
      IconEvent::Supersede,
      IconEvent::Disable,
      IconEvent::Restore,
      IconEvent::Delete,
      IconEvent::Overwrite,
    ];
    for event in events {
      assert!(transition(IconStatus::Replaced, event).is_err());
      assert!(transition(IconStatus::Delete, event).is_err());
    }
  }

  #[test]
  fn disable_round_trip() {
    let disabled = transition(IconStatus::Resolved, IconEvent::Disable).unwrap();
    assert_eq!(
      transition(disabled, IconEvent::Restore).unwrap(),
      IconStatus::Resolved
    );
  }

  #[test]
  fn creation_events_have_initial_status() {
    assert_eq!(IconEvent::Upload.initial_status(), Some(IconStatus::Uploaded));
    assert_eq!(
      IconEvent::UploadReplacement.initial_status(),
      Some(IconStatus::Replacing)
    );
    for status in IconStatus::iter() {
      assert!(transition(status, IconEvent::Upload).is_err());
    }
  }
}
