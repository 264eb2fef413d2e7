//! Withholding codes from assignment.
//!
//! Disabling a code held by a resolved icon moves that icon to a fresh code:
//! the old row becomes DISABLED and keeps the code, and a new RESOLVED row
//! with the same name, tags, font class and path takes over. A code nobody
//! holds is withheld with a placeholder row carrying [`RESERVED_PATH`].

use std::collections::HashSet;

use chrono::Utc;
use iconry_core::{
  icon::{Icon, IconId, IconStatus, User},
  lifecycle::{IconEvent, Replacement, ReplacementKind, ensure_status, transition},
  log::LogEvent,
  permission::{Action, Stakeholders, authorize},
  store::DisableRequest,
  validate::CodeDescription,
};
use rusqlite::{Connection, OptionalExtension as _, Transaction, params};

use crate::{
  Result, allocator, associations,
  encode::{ICON_SELECT, RawIcon, encode_dt, status_list},
  queries::{self, NewIconRow},
  store::Engine,
};

/// Display name of placeholder rows.
pub const RESERVED_NAME: &str = "system-reserved";

/// Path data of placeholder rows: a crossed-out page glyph. Rows carrying it
/// exist only to hold a disabled code and are removed when it is released.
pub const RESERVED_PATH: &str = " M889 169L768 290V848C768 856.8 760.8 864 752 864H272C263.2 864 256 856.8 256 848V802L169 889C159.6 898.4 144.4 898.4 135 889C125.6 879.6 125.6 864.4 135 855L256 734V176C256 167.2 263.2 160 272 160H752C760.8 160 768 167.2 768 176V222L855 135C859.6 130.4 865.8 128 872 128S884.2 130.4 889 135C898.4 144.4 898.4 159.6 889 169zM288 832H736V322L288 770V832zM736 192H288V702L736 254V192z";

/// The live row holding `code`, if any.
fn holder(conn: &Connection, code: u32) -> Result<Option<Icon>> {
  conn
    .query_row(
      &format!(
        "{ICON_SELECT} WHERE i.code = ?1 AND i.status IN ({})",
        status_list(&IconStatus::CODE_HOLDERS)
      ),
      params![code],
      RawIcon::from_row,
    )
    .optional()?
    .map(RawIcon::into_icon)
    .transpose()
}

pub fn set_disabled_codes(
  tx: &Transaction<'_>,
  engine: &Engine,
  actor: &User,
  requests: &[DisableRequest],
) -> Result<Vec<Icon>> {
  authorize(actor, Action::ManageDisabledCodes, Stakeholders::default())?;
  if requests.is_empty() {
    return Err(iconry_core::Error::Empty("disabled code list").into());
  }

  let mut seen = HashSet::new();
  let mut held = Vec::new();
  let mut unheld = Vec::new();
  for request in requests {
    engine.range.ensure_contains(request.code)?;
    request.description.validate()?;
    if !seen.insert(request.code) {
      continue;
    }
    match holder(tx, request.code)? {
      Some(icon) if icon.status == IconStatus::Disabled => {}
      Some(icon) => held.push((request, icon)),
      None => unheld.push(request),
    }
  }

  let now = Utc::now();
  allocator::clear_stale_codes(tx, now)?;
  // Codes about to receive placeholders are not free for the moved icons.
  let space = allocator::code_space_excluding(
    tx,
    engine.range,
    unheld.iter().map(|r| r.code),
  )?;
  let moves = space.assign(held)?;

  let mut changed = Vec::with_capacity(moves.len() + unheld.len());

  for ((request, old), fresh) in moves {
    let disabled = transition(old.status, IconEvent::Disable)?;
    let description = request.description.to_json()?;
    tx.execute(
      "UPDATE icons SET status = ?2, description = ?3, apply_time = ?4 WHERE id = ?1",
      params![
        old.id.0,
        disabled.as_i64(),
        description,
        encode_dt(request.time.unwrap_or(now)),
      ],
    )?;

    let moved = queries::insert_icon(tx, &NewIconRow {
      name: &old.name,
      tags: &old.tags,
      font_class: old.font_class.as_deref(),
      path: &old.path,
      uploader: actor.id,
      code: Some(fresh),
      status: IconStatus::Resolved,
      description: None,
      apply_time: now,
      create_time: old.create_time,
    })?;
    queries::record_replacement(
      tx,
      &Replacement::new(old.id, moved, ReplacementKind::Disable),
    )?;
    associations::move_pending(tx, old.id, moved)?;

    tracing::info!(
      icon = %old.id,
      moved_to = %moved,
      code = format_args!("{:#x}", request.code),
      fresh = format_args!("{fresh:#x}"),
      "disabled code held by icon"
    );
    changed.push(request.code);
  }

  for request in unheld {
    let description = request.description.to_json()?;
    queries::insert_icon(tx, &NewIconRow {
      name: RESERVED_NAME,
      tags: RESERVED_NAME,
      font_class: None,
      path: RESERVED_PATH,
      uploader: actor.id,
      code: Some(request.code),
      status: IconStatus::Disabled,
      description: Some(&description),
      apply_time: request.time.unwrap_or(now),
      create_time: now,
    })?;
    tracing::info!(code = format_args!("{:#x}", request.code), "reserved free code");
    changed.push(request.code);
  }

  if !changed.is_empty() {
    engine
      .recorder
      .record(tx, actor.id, &[LogEvent::disabled_codes(changed)])?;
  }
  queries::list_disabled(tx)
}

/// Release a disabled code. Placeholders are removed; a real icon returns to
/// RESOLVED with its code and drops out of the chain of the row that took
/// its place.
pub fn unset_disabled_code(
  tx: &Transaction<'_>,
  actor: &User,
  id: IconId,
) -> Result<Vec<Icon>> {
  authorize(actor, Action::ManageDisabledCodes, Stakeholders::default())?;
  let icon = queries::require_icon(tx, id)?;
  ensure_status(&icon, IconStatus::Disabled)?;

  if icon.path == RESERVED_PATH {
    tx.execute("DELETE FROM icons WHERE id = ?1", params![id.0])?;
    tracing::info!(icon = %id, "removed code placeholder");
  } else {
    let restored = transition(icon.status, IconEvent::Restore)?;
    tx.execute(
      "UPDATE icons SET status = ?2, description = NULL, apply_time = ?3 WHERE id = ?1",
      params![id.0, restored.as_i64(), encode_dt(Utc::now())],
    )?;
    // The row is live again; the copy that took its place stands on its own.
    let detached = tx.execute(
      "DELETE FROM replacements WHERE old_icon_id = ?1 AND kind = ?2",
      params![id.0, ReplacementKind::Disable.to_string()],
    )?;
    tracing::info!(icon = %id, detached, "restored disabled icon");
  }
  queries::list_disabled(tx)
}

pub fn update_code_description(
  tx: &Transaction<'_>,
  actor: &User,
  id: IconId,
  description: &CodeDescription,
) -> Result<Vec<Icon>> {
  authorize(actor, Action::ManageDisabledCodes, Stakeholders::default())?;
  description.validate()?;
  let icon = queries::require_icon(tx, id)?;
  ensure_status(&icon, IconStatus::Disabled)?;

  tx.execute(
    "UPDATE icons SET description = ?2 WHERE id = ?1",
    params![id.0, description.to_json()?],
  )?;
  queries::list_disabled(tx)
}
