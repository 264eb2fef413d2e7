//! Applying audit decisions.
//!
//! [`audit_fresh`] handles every fresh case of a batch in one transaction:
//! passed icons get the smallest free codes in submission order, rejected
//! ones drop out of their repository. [`audit_replacement`] handles a single
//! replace case in its own transaction.

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use iconry_core::{
  audit::{AuditOutcome, AuditedIcon, FreshCase, ReplaceCase, audit_log_events},
  icon::{Icon, IconId, IconRef, IconStatus, Repo, RepoId, User},
  lifecycle::{IconEvent, ensure_status, transition},
  log::LogEvent,
  naming,
  permission::{Action, Stakeholders, authorize},
  validate::{validate_name, validate_tags},
};
use rusqlite::{Transaction, params};

use crate::{
  Result, allocator, associations,
  encode::encode_dt,
  queries,
  replace::{self, Takeover},
  store::Engine,
};

/// Apply the fresh cases of a batch. Any error leaves every icon of the
/// batch untouched.
pub fn audit_fresh(
  tx: &Transaction<'_>,
  engine: &Engine,
  actor: &User,
  cases: &[FreshCase],
) -> Result<Vec<(IconId, AuditOutcome)>> {
  let now = Utc::now();
  let mut repos: BTreeMap<RepoId, Repo> = BTreeMap::new();
  let mut seen = HashSet::new();
  let mut loaded: Vec<(&FreshCase, Icon)> = Vec::with_capacity(cases.len());

  for case in cases {
    if !seen.insert(case.id) {
      return Err(iconry_core::Error::DuplicateIcon(case.id).into());
    }
    let icon = queries::require_icon(tx, case.id)?;
    ensure_status(&icon, IconStatus::Pending)?;
    if !repos.contains_key(&case.repo_id) {
      let repo = queries::require_repo(tx, case.repo_id)?;
      authorize(actor, Action::AuditUpload, Stakeholders::new(None, Some(repo.admin)))?;
      repos.insert(repo.id, repo);
    }
    loaded.push((case, icon));
  }

  allocator::clear_stale_codes(tx, now)?;
  let space = allocator::code_space(tx, engine.range)?;
  let (passed, rejected): (Vec<_>, Vec<_>) =
    loaded.into_iter().partition(|(case, _)| case.passed);
  let assigned = space.assign(passed)?;

  let mut outcomes = BTreeMap::new();
  let mut audited = Vec::with_capacity(cases.len());

  for ((case, icon), code) in assigned {
    let status = transition(icon.status, IconEvent::AuditPass)?;
    let Some(repo) = repos.get(&case.repo_id) else {
      return Err(iconry_core::Error::RepoNotFound(case.repo_id).into());
    };
    let font_class = naming::font_class(
      engine.transliterator.as_ref(),
      &repo.alias,
      &icon.name,
      code,
      icon.font_class.as_deref(),
    );
    tx.execute(
      "UPDATE icons SET code = ?2, font_class = ?3, status = ?4, apply_time = ?5
       WHERE id = ?1",
      params![icon.id.0, code, font_class, status.as_i64(), encode_dt(now)],
    )?;
    audited.push(audited_icon(case, &icon, true));
    outcomes.insert(icon.id, AuditOutcome::Resolved { code, font_class });
  }

  for (case, icon) in rejected {
    let status = transition(icon.status, IconEvent::AuditFail)?;
    tx.execute(
      "UPDATE icons SET code = NULL, status = ?2, apply_time = ?3 WHERE id = ?1",
      params![icon.id.0, status.as_i64(), encode_dt(now)],
    )?;
    associations::unlink(tx, case.repo_id, icon.id)?;
    audited.push(audited_icon(case, &icon, false));
    outcomes.insert(icon.id, AuditOutcome::Rejected);
  }

  for case in cases {
    queries::delete_cache(tx, case.id)?;
  }
  for repo_id in repos.keys() {
    queries::touch_repo(tx, *repo_id, now)?;
  }

  engine
    .recorder
    .record(tx, actor.id, &audit_log_events(&audited))?;

  Ok(
    cases
      .iter()
      .filter_map(|c| outcomes.remove(&c.id).map(|o| (c.id, o)))
      .collect(),
  )
}

fn audited_icon(case: &FreshCase, icon: &Icon, passed: bool) -> AuditedIcon {
  AuditedIcon {
    id: icon.id,
    name: icon.name.clone(),
    repo_id: case.repo_id,
    uploader: icon.uploader,
    passed,
  }
}

/// Apply one replace case.
pub fn audit_replacement(
  tx: &Transaction<'_>,
  engine: &Engine,
  actor: &User,
  case: &ReplaceCase,
) -> Result<AuditOutcome> {
  let to = queries::require_icon(tx, case.id)?;
  ensure_status(&to, IconStatus::Replace)?;
  if to.old_id != Some(case.old_id) {
    return Err(
      iconry_core::Error::ReplaceTargetMismatch { id: to.id, expected: case.old_id }.into(),
    );
  }

  if !case.passed {
    let repo = queries::require_repo(tx, case.repo_id)?;
    authorize(actor, Action::AuditReplacement, Stakeholders::new(None, Some(repo.admin)))?;
    let status = transition(to.status, IconEvent::AuditFail)?;
    tx.execute(
      "UPDATE icons
       SET code = NULL, replace_target = NULL, status = ?2, apply_time = ?3
       WHERE id = ?1",
      params![to.id.0, status.as_i64(), encode_dt(Utc::now())],
    )?;
    associations::unlink(tx, repo.id, to.id)?;
    queries::delete_cache(tx, to.id)?;
    engine.recorder.record(tx, actor.id, &[LogEvent::audit_failed(
      repo.id,
      vec![to.to_ref()],
      vec![to.uploader],
    )])?;
    return Ok(AuditOutcome::Rejected);
  }

  let from = queries::require_icon(tx, case.old_id)?;
  ensure_status(&from, IconStatus::Resolved)?;
  if let Some(actual) = from.code.filter(|c| *c != case.code) {
    return Err(
      iconry_core::Error::CodeMismatch { id: from.id, expected: case.code, actual }.into(),
    );
  }
  let repo = queries::owning_repo(tx, &from)?;
  validate_name(&case.name)?;
  validate_tags(&case.tags)?;
  authorize(actor, Action::AuditReplacement, Stakeholders::new(None, Some(repo.admin)))?;

  let code = replace::supersede(tx, &repo, &from, &to, IconEvent::AuditPass, &Takeover {
    name: &case.name,
    tags: &case.tags,
    path: None,
  })?;

  let resolved = IconRef { id: to.id, name: case.name.clone() };
  engine.recorder.record(tx, actor.id, &[
    replace::replace_event(&repo, &from, &to),
    LogEvent::audit_ok(case.repo_id, vec![resolved], vec![to.uploader]),
  ])?;

  Ok(AuditOutcome::Resolved {
    code,
    font_class: from.font_class.unwrap_or_default(),
  })
}
