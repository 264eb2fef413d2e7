//! Uploads, submissions and the edits an icon accepts before it is audited.

use chrono::Utc;
use iconry_core::{
  icon::{
    Icon, IconId, IconStatus, PENDING_VERSION, ProjectId, ProjectVersion, RepoId, User,
  },
  lifecycle::{IconEvent, ensure_status, transition},
  log::LogEvent,
  permission::{Action, Stakeholders, authorize},
  store::{IconInfoUpdate, ReplacementSubmission, SubmittedIcon, UploadedSvg},
  validate::{validate_name, validate_tags},
};
use rusqlite::{Transaction, params};

use crate::{
  Error, Result,
  associations,
  encode::{encode_dt, status_list},
  queries::{self, NewIconRow},
  store::Engine,
};

// ─── Upload ──────────────────────────────────────────────────────────────────

fn insert_upload(
  tx: &Transaction<'_>,
  uploader: &User,
  file: &UploadedSvg,
  event: IconEvent,
) -> Result<IconId> {
  let status = event
    .initial_status()
    .ok_or_else(|| Error::Corrupt(format!("{event} does not create icons")))?;
  let now = Utc::now();
  let id = queries::insert_icon(tx, &NewIconRow {
    name: &file.name,
    tags: &file.name,
    font_class: None,
    path: &file.path,
    uploader: uploader.id,
    code: None,
    status,
    description: None,
    apply_time: now,
    create_time: now,
  })?;
  tx.execute(
    "INSERT INTO caches (icon_id, svg) VALUES (?1, ?2)",
    params![id.0, file.svg],
  )?;
  Ok(id)
}

pub fn upload_icons(
  tx: &Transaction<'_>,
  uploader: &User,
  files: &[UploadedSvg],
) -> Result<Vec<Icon>> {
  if files.is_empty() {
    return Err(iconry_core::Error::Empty("upload").into());
  }
  for file in files {
    validate_name(&file.name)?;
  }

  let ids = files
    .iter()
    .map(|file| insert_upload(tx, uploader, file, IconEvent::Upload))
    .collect::<Result<Vec<_>>>()?;
  queries::get_icons(tx, &ids)
}

pub fn upload_replacement(
  tx: &Transaction<'_>,
  uploader: &User,
  file: &UploadedSvg,
) -> Result<Icon> {
  let id = insert_upload(tx, uploader, file, IconEvent::UploadReplacement)?;
  queries::require_icon(tx, id)
}

// ─── Submission ──────────────────────────────────────────────────────────────

/// Write the submitted fields of an icon and move it to `status`.
fn apply_submission(
  tx: &Transaction<'_>,
  id: IconId,
  name: &str,
  tags: &str,
  font_class: Option<&str>,
  adjusted_path: Option<&str>,
  status: IconStatus,
) -> Result<()> {
  tx.execute(
    "UPDATE icons
     SET name = ?2, tags = ?3, font_class = ?4, path = COALESCE(?5, path),
         status = ?6, apply_time = ?7
     WHERE id = ?1",
    params![
      id.0,
      name,
      tags,
      font_class,
      adjusted_path,
      status.as_i64(),
      encode_dt(Utc::now()),
    ],
  )?;
  Ok(())
}

pub fn submit_icons(
  tx: &Transaction<'_>,
  engine: &Engine,
  actor: &User,
  repo_id: RepoId,
  submitted: &[SubmittedIcon],
) -> Result<Vec<Icon>> {
  let repo = queries::require_repo(tx, repo_id)?;
  if submitted.is_empty() {
    return Err(iconry_core::Error::Empty("submission").into());
  }

  let mut planned = Vec::with_capacity(submitted.len());
  for item in submitted {
    let icon = queries::require_icon(tx, item.id)?;
    authorize(actor, Action::SubmitIcon, Stakeholders::new(Some(icon.uploader), None))?;
    validate_name(&item.name)?;
    validate_tags(&item.tags)?;
    let next = transition(icon.status, IconEvent::Submit)?;
    planned.push((item, next));
  }

  let mut ids = Vec::with_capacity(planned.len());
  for (item, next) in planned {
    apply_submission(
      tx,
      item.id,
      &item.name,
      &item.tags,
      item.font_class.as_deref(),
      item.adjusted_path.as_deref(),
      next,
    )?;
    associations::link_pending(tx, repo.id, item.id)?;
    ids.push(item.id);
  }

  let icons = queries::get_icons(tx, &ids)?;
  let refs = icons.iter().map(Icon::to_ref).collect();
  engine
    .recorder
    .record(tx, actor.id, &[LogEvent::upload(repo.id, refs, repo.admin)])?;
  Ok(icons)
}

pub fn submit_replacement(
  tx: &Transaction<'_>,
  engine: &Engine,
  actor: &User,
  repo_id: RepoId,
  sub: &ReplacementSubmission,
) -> Result<Icon> {
  let repo = queries::require_repo(tx, repo_id)?;
  let candidate = queries::require_icon(tx, sub.id)?;
  let old = queries::require_icon(tx, sub.old_id)?;

  authorize(
    actor,
    Action::SubmitIcon,
    Stakeholders::new(Some(candidate.uploader), None),
  )?;
  ensure_status(&old, IconStatus::Resolved)?;
  let next = transition(candidate.status, IconEvent::SubmitReplacement)?;
  validate_name(&sub.name)?;
  validate_tags(&sub.tags)?;
  let code = old
    .code
    .ok_or_else(|| Error::Corrupt(format!("resolved icon {} has no code", old.id)))?;

  // Earlier candidates for the same icon lose their place in the queue.
  let mut stmt = tx.prepare(
    "SELECT id FROM icons WHERE status = ?1 AND replace_target = ?2 AND id != ?3",
  )?;
  let overwritten = stmt
    .query_map(
      params![IconStatus::Replace.as_i64(), old.id.0, candidate.id.0],
      |row| Ok(IconId(row.get(0)?)),
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  for id in &overwritten {
    let status = transition(IconStatus::Replace, IconEvent::Overwrite)?;
    associations::unlink_pending(tx, *id)?;
    tx.execute(
      "UPDATE icons SET status = ?2, code = NULL, apply_time = ?3 WHERE id = ?1",
      params![id.0, status.as_i64(), encode_dt(Utc::now())],
    )?;
    queries::delete_cache(tx, *id)?;
  }
  if !overwritten.is_empty() {
    tracing::info!(
      target_icon = %old.id,
      overwritten = ?overwritten,
      "overwrote earlier replacement candidates"
    );
  }

  apply_submission(
    tx,
    candidate.id,
    &sub.name,
    &sub.tags,
    sub.font_class.as_deref(),
    sub.adjusted_path.as_deref(),
    next,
  )?;
  tx.execute(
    "UPDATE icons SET code = ?2, replace_target = ?3 WHERE id = ?1",
    params![candidate.id.0, code, old.id.0],
  )?;
  associations::link_pending(tx, repo.id, candidate.id)?;

  let icon = queries::require_icon(tx, candidate.id)?;
  engine.recorder.record(
    tx,
    actor.id,
    &[LogEvent::upload(repo.id, vec![icon.to_ref()], repo.admin)],
  )?;
  Ok(icon)
}

// ─── Edits ───────────────────────────────────────────────────────────────────

pub fn delete_icon(tx: &Transaction<'_>, actor: &User, id: IconId) -> Result<Icon> {
  let icon = queries::require_icon(tx, id)?;
  authorize(actor, Action::DeleteIcon, Stakeholders::new(Some(icon.uploader), None))?;
  let next = transition(icon.status, IconEvent::Delete)?;

  tx.execute(
    "UPDATE icons SET status = ?2, code = NULL, apply_time = ?3 WHERE id = ?1",
    params![id.0, next.as_i64(), encode_dt(Utc::now())],
  )?;
  queries::delete_cache(tx, id)?;
  queries::require_icon(tx, id)
}

pub fn update_icon_info(
  tx: &Transaction<'_>,
  actor: &User,
  id: IconId,
  update: &IconInfoUpdate,
) -> Result<Icon> {
  if update.name.is_none() && update.tags.is_none() {
    return Err(iconry_core::Error::Empty("icon info update").into());
  }
  let icon = queries::require_icon(tx, id)?;
  let admin = queries::icon_repos(tx, id)?.first().map(|r| r.admin);
  let parties = Stakeholders::new(Some(icon.uploader), admin);

  if let Some(tags) = &update.tags {
    authorize(actor, Action::RetagIcon, parties)?;
    validate_tags(tags)?;
  }
  if let Some(name) = &update.name {
    authorize(actor, Action::RenameIcon, parties)?;
    validate_name(name)?;
  }

  tx.execute(
    "UPDATE icons SET name = COALESCE(?2, name), tags = COALESCE(?3, tags) WHERE id = ?1",
    params![id.0, update.name, update.tags],
  )?;
  queries::require_icon(tx, id)
}

// ─── Projects and releases ───────────────────────────────────────────────────

pub fn add_project_icon(
  tx: &Transaction<'_>,
  project_id: ProjectId,
  icon_id: IconId,
) -> Result<ProjectVersion> {
  if queries::fetch_project(tx, project_id)?.is_none() {
    return Err(iconry_core::Error::ProjectNotFound(project_id).into());
  }
  queries::require_icon(tx, icon_id)?;
  tx.execute(
    "INSERT OR IGNORE INTO project_versions (project_id, icon_id, version)
     VALUES (?1, ?2, ?3)",
    params![project_id.0, icon_id.0, PENDING_VERSION],
  )?;
  Ok(ProjectVersion {
    project_id,
    icon_id,
    version: PENDING_VERSION.to_owned(),
  })
}

/// Copy the resolved pending links of a repository to `version`.
pub fn publish_repo_version(
  tx: &Transaction<'_>,
  actor: &User,
  repo_id: RepoId,
  version: &str,
) -> Result<usize> {
  let repo = queries::require_repo(tx, repo_id)?;
  authorize(actor, Action::PublishRepository, Stakeholders::new(None, Some(repo.admin)))?;
  let version = version.trim();
  if version.is_empty() || version == PENDING_VERSION {
    return Err(iconry_core::Error::InvalidVersion(version.to_owned()).into());
  }

  let released = tx.execute(
    &format!(
      "INSERT OR IGNORE INTO repo_versions (repository_id, icon_id, version)
       SELECT rv.repository_id, rv.icon_id, ?2
       FROM repo_versions rv JOIN icons i ON i.id = rv.icon_id
       WHERE rv.repository_id = ?1 AND rv.version = ?3 AND i.status IN ({})",
      status_list(&[IconStatus::Resolved])
    ),
    params![repo.id.0, version, PENDING_VERSION],
  )?;
  queries::touch_repo(tx, repo.id, Utc::now())?;
  Ok(released)
}
