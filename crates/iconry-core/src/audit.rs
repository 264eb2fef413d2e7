//! The audit batch model.
//!
//! An audit submission is a list of explicitly tagged decisions. Fresh cases
//! (icons submitted from a plain upload) are processed together in one
//! transaction that allocates codes; replace cases (candidates submitted to
//! take over a resolved icon) are processed one transaction each. The outcome
//! is reported per icon, so a failed replace case does not hide the ones
//! that went through.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
  icon::{IconId, IconRef, RepoId, UserId},
  log::{LogEvent, unique_subscribers},
};

// ─── Input ───────────────────────────────────────────────────────────────────

/// Decision on an icon submitted from a plain upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreshCase {
  pub id:      IconId,
  pub repo_id: RepoId,
  pub passed:  bool,
}

/// Decision on a replacement candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceCase {
  pub id:      IconId,
  pub repo_id: RepoId,
  /// The resolved icon the candidate takes over from.
  pub old_id:  IconId,
  /// The code the candidate inherits.
  pub code:    u32,
  pub passed:  bool,
  /// Name and tags the candidate resolves with.
  pub name:    String,
  pub tags:    String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditCase {
  Fresh(FreshCase),
  Replace(ReplaceCase),
}

impl AuditCase {
  pub fn icon_id(&self) -> IconId {
    match self {
      Self::Fresh(c) => c.id,
      Self::Replace(c) => c.id,
    }
  }
}

/// A batch split by case kind, each half in submission order.
#[derive(Debug, Clone, Default)]
pub struct Partition {
  pub fresh:   Vec<FreshCase>,
  pub replace: Vec<ReplaceCase>,
}

pub fn partition(cases: Vec<AuditCase>) -> Partition {
  let mut out = Partition::default();
  for case in cases {
    match case {
      AuditCase::Fresh(c) => out.fresh.push(c),
      AuditCase::Replace(c) => out.replace.push(c),
    }
  }
  out
}

// ─── Output ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AuditOutcome {
  Resolved { code: u32, font_class: String },
  Rejected,
  /// The unit the icon belonged to was rolled back.
  Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditItem {
  pub icon_id: IconId,
  #[serde(flatten)]
  pub outcome: AuditOutcome,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditReport {
  pub items: Vec<AuditItem>,
}

impl AuditReport {
  pub fn push(&mut self, icon_id: IconId, outcome: AuditOutcome) {
    self.items.push(AuditItem { icon_id, outcome });
  }

  pub fn outcome(&self, icon_id: IconId) -> Option<&AuditOutcome> {
    self
      .items
      .iter()
      .find(|i| i.icon_id == icon_id)
      .map(|i| &i.outcome)
  }

  pub fn failures(&self) -> impl Iterator<Item = &AuditItem> {
    self
      .items
      .iter()
      .filter(|i| matches!(i.outcome, AuditOutcome::Failed { .. }))
  }

  pub fn all_succeeded(&self) -> bool { self.failures().next().is_none() }
}

// ─── Trail ───────────────────────────────────────────────────────────────────

/// A fresh-case icon after its decision was applied, as needed for the trail.
#[derive(Debug, Clone)]
pub struct AuditedIcon {
  pub id:       IconId,
  pub name:     String,
  pub repo_id:  RepoId,
  pub uploader: UserId,
  pub passed:   bool,
}

/// One AUDIT_OK and one AUDIT_FAILED entry per repository (each only when
/// non-empty), ordered by repository id, addressed to the distinct uploaders
/// of the icons they list.
pub fn audit_log_events(icons: &[AuditedIcon]) -> Vec<LogEvent> {
  let mut by_repo: BTreeMap<RepoId, Vec<&AuditedIcon>> = BTreeMap::new();
  for icon in icons {
    by_repo.entry(icon.repo_id).or_default().push(icon);
  }

  let mut events = Vec::new();
  for (repo_id, icons) in by_repo {
    let (ok, failed): (Vec<&AuditedIcon>, Vec<&AuditedIcon>) =
      icons.into_iter().partition(|i| i.passed);
    if !ok.is_empty() {
      events.push(LogEvent::audit_ok(repo_id, refs(&ok), uploaders(&ok)));
    }
    if !failed.is_empty() {
      events.push(LogEvent::audit_failed(repo_id, refs(&failed), uploaders(&failed)));
    }
  }
  events
}

fn refs(icons: &[&AuditedIcon]) -> Vec<IconRef> {
  icons
    .iter()
    .map(|i| IconRef { id: i.id, name: i.name.clone() })
    .collect()
}

fn uploaders(icons: &[&AuditedIcon]) -> Vec<UserId> {
  unique_subscribers(icons.iter().map(|i| i.uploader))
}
