//! Handing a resolved icon's identity over to a new row.
//!
//! Both the direct replace and an approved replace candidate end in
//! [`supersede`]: the old row becomes REPLACED, the new one RESOLVED with
//! the old code and font class, a chain edge is recorded and the pending
//! links move across.

use chrono::Utc;
use iconry_core::{
  icon::{Icon, IconRef, IconStatus, Repo, User},
  lifecycle::{IconEvent, Replacement, ReplacementKind, ensure_status, transition},
  log::LogEvent,
  permission::{Action, Stakeholders, authorize},
  store::ReplaceRequest,
  validate::{validate_name, validate_tags},
};
use rusqlite::{Transaction, params};

use crate::{
  Error, Result, associations,
  encode::encode_dt,
  queries,
  store::Engine,
};

/// What the new row resolves with.
pub struct Takeover<'a> {
  pub name: &'a str,
  pub tags: &'a str,
  pub path: Option<&'a str>,
}

/// Move `from`'s identity to `to`. `to_event` is the event that resolves
/// the new side. Returns the inherited code.
pub fn supersede(
  tx: &Transaction<'_>,
  repo: &Repo,
  from: &Icon,
  to: &Icon,
  to_event: IconEvent,
  takeover: &Takeover<'_>,
) -> Result<u32> {
  let old_status = transition(from.status, IconEvent::Supersede)?;
  let new_status = transition(to.status, to_event)?;
  let code = from
    .code
    .ok_or_else(|| Error::Corrupt(format!("resolved icon {} has no code", from.id)))?;
  let now = Utc::now();

  // The old row must leave RESOLVED before the new one takes its code.
  queries::set_status(tx, from.id, old_status, now)?;
  tx.execute(
    "UPDATE icons
     SET name = ?2, tags = ?3, path = COALESCE(?4, path), code = ?5,
         font_class = ?6, status = ?7, replace_target = NULL, apply_time = ?8
     WHERE id = ?1",
    params![
      to.id.0,
      takeover.name,
      takeover.tags,
      takeover.path,
      code,
      from.font_class,
      new_status.as_i64(),
      encode_dt(now),
    ],
  )?;

  queries::record_replacement(
    tx,
    &Replacement::new(from.id, to.id, ReplacementKind::Replace),
  )?;
  let moved = associations::move_pending(tx, from.id, to.id)?;
  queries::delete_cache(tx, to.id)?;
  queries::touch_repo(tx, repo.id, now)?;

  tracing::info!(
    from = %from.id,
    to = %to.id,
    code = format_args!("{code:#x}"),
    repos = moved.repos,
    projects = moved.projects,
    "icon replaced"
  );
  Ok(code)
}

/// Trail entry describing `from` being replaced by `to` under its name
/// before the takeover.
pub fn replace_event(repo: &Repo, from: &Icon, to: &Icon) -> LogEvent {
  LogEvent::replace(repo.id, from.to_ref(), to.to_ref())
}

pub fn replace_icon(
  tx: &Transaction<'_>,
  engine: &Engine,
  actor: &User,
  request: &ReplaceRequest,
) -> Result<Icon> {
  let from = queries::require_icon(tx, request.from_id)?;
  let to = queries::require_icon(tx, request.to_id)?;

  ensure_status(&from, IconStatus::Resolved)?;
  ensure_status(&to, IconStatus::Replacing)?;
  let repo = queries::owning_repo(tx, &from)?;
  validate_name(&request.name)?;
  validate_tags(&request.tags)?;
  authorize(
    actor,
    Action::ReplaceIcon,
    Stakeholders::new(Some(from.uploader), Some(repo.admin)),
  )?;

  supersede(tx, &repo, &from, &to, IconEvent::Replace, &Takeover {
    name: &request.name,
    tags: &request.tags,
    path: request.adjusted_path.as_deref(),
  })?;

  let resolved = IconRef { id: to.id, name: request.name.clone() };
  engine.recorder.record(tx, actor.id, &[
    replace_event(&repo, &from, &to),
    LogEvent::audit_ok(repo.id, vec![resolved], vec![to.uploader]),
  ])?;

  queries::require_icon(tx, to.id)
}
