//! [`SqliteStore`]: the SQLite implementation of [`IconStore`].

use std::{path::Path, sync::Arc, time::Duration};

use chrono::Utc;
use iconry_core::{
  audit::{AuditCase, AuditOutcome, AuditReport, partition},
  code::CodeRange,
  icon::{
    CacheEntry, Icon, IconId, Project, ProjectId, ProjectVersion, Repo, RepoId,
    RepoVersion, User, UserId,
  },
  lifecycle::Lineage,
  log::LogEntry,
  naming::{AsciiSlug, Transliterate},
  store::{
    DisableRequest, IconDetail, IconInfoUpdate, IconStore, NewProject, NewRepo, NewUser,
    QueuedIcon, ReplaceRequest, ReplacementSubmission, SearchResult, SubmittedIcon,
    UploadedSvg,
  },
  validate::{CodeDescription, validate_name},
};
use rusqlite::{Connection, Transaction, TransactionBehavior, params};

use crate::{
  Error, Result,
  allocator::{self, AllocationLock},
  audit, disabled,
  encode::{encode_dt, project_version_from_row, repo_version_from_row},
  log::{LogRecorder, TableLogRecorder, read_logs},
  queries, replace,
  schema::SCHEMA,
  submit,
};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Engine ──────────────────────────────────────────────────────────────────

/// What a transactional unit needs besides the transaction itself.
#[derive(Clone)]
pub(crate) struct Engine {
  pub range:          CodeRange,
  pub transliterator: Arc<dyn Transliterate>,
  pub recorder:       Arc<dyn LogRecorder>,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Iconry store backed by a single SQLite file.
///
/// Cloning is cheap; clones share the connection and the allocation lock.
#[derive(Clone)]
pub struct SqliteStore {
  conn:       tokio_rusqlite::Connection,
  allocation: AllocationLock,
  engine:     Engine,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>, range: CodeRange) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn, range).await
  }

  /// Open an in-memory store; useful for testing.
  pub async fn open_in_memory(range: CodeRange) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn, range).await
  }

  async fn init(conn: tokio_rusqlite::Connection, range: CodeRange) -> Result<Self> {
    conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!(%range, "icon store opened");
    Ok(Self {
      conn,
      allocation: AllocationLock::new(),
      engine: Engine {
        range,
        transliterator: Arc::new(AsciiSlug),
        recorder: Arc::new(TableLogRecorder),
      },
    })
  }

  /// Use `transliterator` to build font class slugs.
  pub fn with_transliterator(mut self, transliterator: Arc<dyn Transliterate>) -> Self {
    self.engine.transliterator = transliterator;
    self
  }

  /// Record audit-trail entries through `recorder` instead of the `logs`
  /// table.
  pub fn with_log_recorder(mut self, recorder: Arc<dyn LogRecorder>) -> Self {
    self.engine.recorder = recorder;
    self
  }

  /// Share `lock` with other stores opened on the same database file.
  pub fn with_allocation_lock(mut self, lock: AllocationLock) -> Self {
    self.allocation = lock;
    self
  }

  pub fn code_range(&self) -> CodeRange { self.engine.range }

  /// Run `unit` inside one `BEGIN IMMEDIATE` transaction, committing only if
  /// it succeeds.
  async fn write<T, F>(&self, unit: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Transaction<'_>, &Engine) -> Result<T> + Send + 'static,
  {
    let engine = self.engine.clone();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = unit(&tx, &engine);
        if out.is_ok() {
          tx.commit()?;
        }
        Ok(out)
      })
      .await?
  }

  /// Like [`write`](Self::write), for units acting on behalf of `actor`.
  async fn write_as<T, F>(&self, actor: UserId, unit: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Transaction<'_>, &Engine, &User) -> Result<T> + Send + 'static,
  {
    self
      .write(move |tx, engine| {
        let user = queries::require_user(tx, actor)?;
        unit(tx, engine, &user)
      })
      .await
  }

  async fn read<T, F>(&self, query: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection, &Engine) -> Result<T> + Send + 'static,
  {
    let engine = self.engine.clone();
    self.conn.call(move |conn| Ok(query(conn, &engine))).await?
  }

  /// Record the result of one audit unit. A failed unit has rolled back, so
  /// each of `ids` is reported as `Failed` and the batch carries on.
  fn settle<T>(
    report: &mut AuditReport,
    ids: &[IconId],
    result: Result<T>,
    apply: impl FnOnce(&mut AuditReport, T),
  ) {
    let e = match result {
      Ok(value) => return apply(report, value),
      Err(e) => e,
    };
    if e.as_core().is_some() {
      tracing::warn!(icons = ?ids, error = %e, "audit unit rolled back");
    } else {
      tracing::error!(icons = ?ids, error = %e, "audit unit failed");
    }
    for id in ids {
      report.push(*id, AuditOutcome::Failed { reason: e.to_string() });
    }
  }
}

// ─── IconStore impl ──────────────────────────────────────────────────────────

impl IconStore for SqliteStore {
  type Error = Error;

  // ── Users, repositories, projects ─────────────────────────────────────────

  async fn create_user(&self, user: NewUser) -> Result<User> {
    self
      .write(move |tx, _| {
        tx.execute(
          "INSERT INTO users (name, role) VALUES (?1, ?2)",
          params![user.name, user.role.as_i64()],
        )?;
        Ok(User { id: UserId(tx.last_insert_rowid()), name: user.name, role: user.role })
      })
      .await
  }

  async fn get_user(&self, id: UserId) -> Result<Option<User>> {
    self.read(move |conn, _| queries::fetch_user(conn, id)).await
  }

  async fn create_repo(&self, repo: NewRepo) -> Result<Repo> {
    self
      .write(move |tx, _| {
        queries::require_user(tx, repo.admin)?;
        validate_name(&repo.alias)?;
        let now = Utc::now();
        tx.execute(
          "INSERT INTO repositories (name, alias, admin, updated_at) VALUES (?1, ?2, ?3, ?4)",
          params![repo.name, repo.alias, repo.admin.0, encode_dt(now)],
        )?;
        queries::require_repo(tx, RepoId(tx.last_insert_rowid()))
      })
      .await
  }

  async fn get_repo(&self, id: RepoId) -> Result<Option<Repo>> {
    self.read(move |conn, _| queries::fetch_repo(conn, id)).await
  }

  async fn create_project(&self, project: NewProject) -> Result<Project> {
    self
      .write(move |tx, _| {
        queries::require_user(tx, project.owner)?;
        tx.execute(
          "INSERT INTO projects (name, owner) VALUES (?1, ?2)",
          params![project.name, project.owner.0],
        )?;
        Ok(Project {
          id:    ProjectId(tx.last_insert_rowid()),
          name:  project.name,
          owner: project.owner,
        })
      })
      .await
  }

  async fn add_project_icon(
    &self,
    project_id: ProjectId,
    icon_id: IconId,
  ) -> Result<ProjectVersion> {
    self
      .write(move |tx, _| submit::add_project_icon(tx, project_id, icon_id))
      .await
  }

  async fn publish_repo_version(
    &self,
    actor: UserId,
    repo_id: RepoId,
    version: String,
  ) -> Result<usize> {
    let released = self
      .write_as(actor, move |tx, _, user| {
        submit::publish_repo_version(tx, user, repo_id, &version)
      })
      .await?;
    tracing::info!(repo = %repo_id, released, "repository version published");
    Ok(released)
  }

  async fn repo_versions(&self, repo_id: RepoId) -> Result<Vec<RepoVersion>> {
    self
      .read(move |conn, _| {
        let mut stmt = conn.prepare(
          "SELECT repository_id, icon_id, version FROM repo_versions
           WHERE repository_id = ?1 ORDER BY version, icon_id",
        )?;
        Ok(
          stmt
            .query_map(params![repo_id.0], repo_version_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        )
      })
      .await
  }

  async fn project_versions(&self, project_id: ProjectId) -> Result<Vec<ProjectVersion>> {
    self
      .read(move |conn, _| {
        let mut stmt = conn.prepare(
          "SELECT project_id, icon_id, version FROM project_versions
           WHERE project_id = ?1 ORDER BY version, icon_id",
        )?;
        Ok(
          stmt
            .query_map(params![project_id.0], project_version_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        )
      })
      .await
  }

  // ── Icon reads ────────────────────────────────────────────────────────────

  async fn get_icon(&self, id: IconId) -> Result<Option<Icon>> {
    self.read(move |conn, _| queries::fetch_icon(conn, id)).await
  }

  async fn get_icons(&self, ids: Vec<IconId>) -> Result<Vec<Icon>> {
    self.read(move |conn, _| queries::get_icons(conn, &ids)).await
  }

  async fn icon_detail(&self, id: IconId) -> Result<Option<IconDetail>> {
    self.read(move |conn, _| queries::icon_detail(conn, id)).await
  }

  async fn lineage(&self, id: IconId) -> Result<Option<Lineage>> {
    self.read(move |conn, _| queries::lineage(conn, id)).await
  }

  async fn uploaded_icons(&self, uploader: UserId) -> Result<Vec<Icon>> {
    self
      .read(move |conn, _| queries::uploaded_icons(conn, uploader))
      .await
  }

  async fn audit_queue(&self, actor: UserId) -> Result<Vec<QueuedIcon>> {
    self
      .read(move |conn, _| {
        let user = queries::require_user(conn, actor)?;
        queries::audit_queue(conn, &user)
      })
      .await
  }

  async fn search(&self, query: String) -> Result<SearchResult> {
    self.read(move |conn, _| queries::search(conn, &query)).await
  }

  async fn free_codes(&self) -> Result<Vec<u32>> {
    self
      .read(|conn, engine| {
        Ok(allocator::code_space(conn, engine.range)?.free().to_vec())
      })
      .await
  }

  async fn cache_entry(&self, icon_id: IconId) -> Result<Option<CacheEntry>> {
    self
      .read(move |conn, _| queries::cache_entry(conn, icon_id))
      .await
  }

  async fn logs(&self, repo_id: Option<RepoId>) -> Result<Vec<LogEntry>> {
    self.read(move |conn, _| read_logs(conn, repo_id)).await
  }

  // ── Upload and submission ─────────────────────────────────────────────────

  async fn upload_icons(&self, uploader: UserId, files: Vec<UploadedSvg>) -> Result<Vec<Icon>> {
    let icons = self
      .write_as(uploader, move |tx, _, user| submit::upload_icons(tx, user, &files))
      .await?;
    tracing::info!(uploader = %uploader, count = icons.len(), "icons uploaded");
    Ok(icons)
  }

  async fn upload_replacement(&self, uploader: UserId, file: UploadedSvg) -> Result<Icon> {
    let icon = self
      .write_as(uploader, move |tx, _, user| {
        submit::upload_replacement(tx, user, &file)
      })
      .await?;
    tracing::info!(uploader = %uploader, icon = %icon.id, "replacement uploaded");
    Ok(icon)
  }

  async fn submit_icons(
    &self,
    actor: UserId,
    repo_id: RepoId,
    icons: Vec<SubmittedIcon>,
  ) -> Result<Vec<Icon>> {
    let icons = self
      .write_as(actor, move |tx, engine, user| {
        submit::submit_icons(tx, engine, user, repo_id, &icons)
      })
      .await?;
    tracing::info!(repo = %repo_id, count = icons.len(), "icons submitted for audit");
    Ok(icons)
  }

  async fn submit_replacement(
    &self,
    actor: UserId,
    repo_id: RepoId,
    submission: ReplacementSubmission,
  ) -> Result<Icon> {
    let icon = self
      .write_as(actor, move |tx, engine, user| {
        submit::submit_replacement(tx, engine, user, repo_id, &submission)
      })
      .await?;
    tracing::info!(repo = %repo_id, icon = %icon.id, "replacement submitted for audit");
    Ok(icon)
  }

  async fn delete_icon(&self, actor: UserId, id: IconId) -> Result<Icon> {
    let icon = self
      .write_as(actor, move |tx, _, user| submit::delete_icon(tx, user, id))
      .await?;
    tracing::info!(icon = %id, "icon deleted");
    Ok(icon)
  }

  async fn update_icon_info(
    &self,
    actor: UserId,
    id: IconId,
    update: IconInfoUpdate,
  ) -> Result<Icon> {
    self
      .write_as(actor, move |tx, _, user| {
        submit::update_icon_info(tx, user, id, &update)
      })
      .await
  }

  // ── Lifecycle ─────────────────────────────────────────────────────────────

  async fn audit(&self, actor: UserId, cases: Vec<AuditCase>) -> Result<AuditReport> {
    let order: Vec<IconId> = cases.iter().map(AuditCase::icon_id).collect();
    let batch = partition(cases);
    let mut report = AuditReport::default();
    tracing::debug!(
      fresh = batch.fresh.len(),
      replace = batch.replace.len(),
      "audit batch started"
    );

    if !batch.fresh.is_empty() {
      let ids: Vec<IconId> = batch.fresh.iter().map(|c| c.id).collect();
      let fresh = batch.fresh;
      let _lease = self.allocation.acquire().await;
      let result = self
        .write_as(actor, move |tx, engine, user| {
          audit::audit_fresh(tx, engine, user, &fresh)
        })
        .await;
      Self::settle(&mut report, &ids, result, |report, outcomes| {
        for (id, outcome) in outcomes {
          if let AuditOutcome::Resolved { code, .. } = &outcome {
            tracing::info!(icon = %id, code = format_args!("{code:#x}"), "icon resolved");
          }
          report.push(id, outcome);
        }
      });
    }

    for case in batch.replace {
      let id = case.id;
      let result = self
        .write_as(actor, move |tx, engine, user| {
          audit::audit_replacement(tx, engine, user, &case)
        })
        .await;
      Self::settle(&mut report, &[id], result, |report, outcome| {
        report.push(id, outcome);
      });
    }

    report
      .items
      .sort_by_key(|item| order.iter().position(|id| *id == item.icon_id));
    tracing::info!(
      items = report.items.len(),
      failed = report.failures().count(),
      "audit batch finished"
    );
    Ok(report)
  }

  async fn replace_icon(&self, actor: UserId, request: ReplaceRequest) -> Result<Icon> {
    let (from, to) = (request.from_id, request.to_id);
    let icon = self
      .write_as(actor, move |tx, engine, user| {
        replace::replace_icon(tx, engine, user, &request)
      })
      .await?;
    tracing::info!(from = %from, to = %to, "direct replace committed");
    Ok(icon)
  }

  // ── Disabled codes ────────────────────────────────────────────────────────

  async fn disabled_codes(&self) -> Result<Vec<Icon>> {
    self.read(|conn, _| queries::list_disabled(conn)).await
  }

  async fn set_disabled_codes(
    &self,
    actor: UserId,
    requests: Vec<DisableRequest>,
  ) -> Result<Vec<Icon>> {
    let _lease = self.allocation.acquire().await;
    self
      .write_as(actor, move |tx, engine, user| {
        disabled::set_disabled_codes(tx, engine, user, &requests)
      })
      .await
  }

  async fn unset_disabled_code(&self, actor: UserId, id: IconId) -> Result<Vec<Icon>> {
    self
      .write_as(actor, move |tx, _, user| {
        disabled::unset_disabled_code(tx, user, id)
      })
      .await
  }

  async fn update_code_description(
    &self,
    actor: UserId,
    id: IconId,
    description: CodeDescription,
  ) -> Result<Vec<Icon>> {
    self
      .write_as(actor, move |tx, _, user| {
        disabled::update_code_description(tx, user, id, &description)
      })
      .await
  }
}
