//! The `IconStore` trait and its input and read-model types.
//!
//! The trait is implemented by storage backends (e.g. `iconry-store-sqlite`).
//! Every write operation is one atomic unit except [`IconStore::audit`],
//! whose replace cases commit independently of each other and of the fresh
//! cases (see [`crate::audit`]).

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{
  audit::{AuditCase, AuditReport},
  icon::{
    CacheEntry, Icon, IconId, Project, ProjectId, ProjectVersion, Repo, RepoId,
    RepoVersion, Role, User, UserId,
  },
  lifecycle::Lineage,
  log::LogEntry,
  validate::CodeDescription,
};

// ─── Inputs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
  pub name: String,
  #[serde(default)]
  pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRepo {
  pub name:  String,
  pub alias: String,
  pub admin: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProject {
  pub name:  String,
  pub owner: UserId,
}

/// An SVG file after the font collaborator extracted its path data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedSvg {
  /// File name without the `.svg` extension.
  pub name: String,
  pub path: String,
  /// The raw file, kept in the cache until the icon is audited.
  pub svg:  Option<String>,
}

/// An uploaded icon put forward for audit in a repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedIcon {
  pub id:            IconId,
  pub name:          String,
  pub tags:          String,
  /// Suffix appended to the generated font class.
  #[serde(default)]
  pub font_class:    Option<String>,
  /// Path data edited by the submitter, replacing the uploaded one.
  #[serde(default)]
  pub adjusted_path: Option<String>,
}

/// A replacement candidate put forward for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplacementSubmission {
  pub id:            IconId,
  pub old_id:        IconId,
  pub name:          String,
  pub tags:          String,
  #[serde(default)]
  pub font_class:    Option<String>,
  #[serde(default)]
  pub adjusted_path: Option<String>,
}

/// A direct replace of a resolved icon by a freshly uploaded one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceRequest {
  pub from_id:       IconId,
  pub to_id:         IconId,
  pub name:          String,
  pub tags:          String,
  #[serde(default)]
  pub adjusted_path: Option<String>,
}

/// Fields of an icon its owner or curators may edit after upload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IconInfoUpdate {
  pub name: Option<String>,
  pub tags: Option<String>,
}

/// One code to withhold from icon assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisableRequest {
  pub code:        u32,
  #[serde(default)]
  pub description: CodeDescription,
  /// When the problem was observed; defaults to now.
  #[serde(default)]
  pub time:        Option<chrono::DateTime<chrono::Utc>>,
}

// ─── Read models ─────────────────────────────────────────────────────────────

/// An icon with its pending repository and cached source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IconDetail {
  pub icon:  Icon,
  pub repo:  Option<Repo>,
  pub cache: Option<CacheEntry>,
}

/// An icon waiting for audit together with the repository it was submitted to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedIcon {
  pub icon:     Icon,
  pub repo:     Repo,
  pub uploader: User,
}

/// Search hits of one repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoHits {
  pub repo_id: RepoId,
  pub name:    String,
  pub icons:   Vec<Icon>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResult {
  pub repos:       Vec<RepoHits>,
  pub total_count: usize,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an Iconry store backend.
///
/// `actor` parameters name the user performing the operation; backends load
/// the user and check permissions themselves.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes.
pub trait IconStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users, repositories, projects ─────────────────────────────────────

  fn create_user(
    &self,
    user: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn create_repo(
    &self,
    repo: NewRepo,
  ) -> impl Future<Output = Result<Repo, Self::Error>> + Send + '_;

  fn get_repo(
    &self,
    id: RepoId,
  ) -> impl Future<Output = Result<Option<Repo>, Self::Error>> + Send + '_;

  fn create_project(
    &self,
    project: NewProject,
  ) -> impl Future<Output = Result<Project, Self::Error>> + Send + '_;

  /// Link an icon to a project at the pending version.
  fn add_project_icon(
    &self,
    project_id: ProjectId,
    icon_id: IconId,
  ) -> impl Future<Output = Result<ProjectVersion, Self::Error>> + Send + '_;

  /// Copy the repository's pending links to a released `version` tag.
  /// Returns the number of icons released.
  fn publish_repo_version(
    &self,
    actor: UserId,
    repo_id: RepoId,
    version: String,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  fn repo_versions(
    &self,
    repo_id: RepoId,
  ) -> impl Future<Output = Result<Vec<RepoVersion>, Self::Error>> + Send + '_;

  fn project_versions(
    &self,
    project_id: ProjectId,
  ) -> impl Future<Output = Result<Vec<ProjectVersion>, Self::Error>> + Send + '_;

  // ── Icon reads ────────────────────────────────────────────────────────

  fn get_icon(
    &self,
    id: IconId,
  ) -> impl Future<Output = Result<Option<Icon>, Self::Error>> + Send + '_;

  /// Icons by id, in id order; unknown ids are skipped.
  fn get_icons(
    &self,
    ids: Vec<IconId>,
  ) -> impl Future<Output = Result<Vec<Icon>, Self::Error>> + Send + '_;

  fn icon_detail(
    &self,
    id: IconId,
  ) -> impl Future<Output = Result<Option<IconDetail>, Self::Error>> + Send + '_;

  /// Every physical row of the logical icon `id` belongs to, oldest first.
  fn lineage(
    &self,
    id: IconId,
  ) -> impl Future<Output = Result<Option<Lineage>, Self::Error>> + Send + '_;

  /// Icons `uploader` has uploaded but not yet submitted.
  fn uploaded_icons(
    &self,
    uploader: UserId,
  ) -> impl Future<Output = Result<Vec<Icon>, Self::Error>> + Send + '_;

  /// PENDING and REPLACE icons the actor may audit.
  fn audit_queue(
    &self,
    actor: UserId,
  ) -> impl Future<Output = Result<Vec<QueuedIcon>, Self::Error>> + Send + '_;

  /// Search live icons by keyword, or by code when `query` is a character
  /// reference such as `&#xe61a;`.
  fn search(
    &self,
    query: String,
  ) -> impl Future<Output = Result<SearchResult, Self::Error>> + Send + '_;

  /// Codes not held by any RESOLVED or DISABLED icon, ascending.
  fn free_codes(&self) -> impl Future<Output = Result<Vec<u32>, Self::Error>> + Send + '_;

  fn cache_entry(
    &self,
    icon_id: IconId,
  ) -> impl Future<Output = Result<Option<CacheEntry>, Self::Error>> + Send + '_;

  /// Audit-trail entries of a repository, or system entries for `None`.
  fn logs(
    &self,
    repo_id: Option<RepoId>,
  ) -> impl Future<Output = Result<Vec<LogEntry>, Self::Error>> + Send + '_;

  // ── Upload and submission ─────────────────────────────────────────────

  fn upload_icons(
    &self,
    uploader: UserId,
    files: Vec<UploadedSvg>,
  ) -> impl Future<Output = Result<Vec<Icon>, Self::Error>> + Send + '_;

  fn upload_replacement(
    &self,
    uploader: UserId,
    file: UploadedSvg,
  ) -> impl Future<Output = Result<Icon, Self::Error>> + Send + '_;

  fn submit_icons(
    &self,
    actor: UserId,
    repo_id: RepoId,
    icons: Vec<SubmittedIcon>,
  ) -> impl Future<Output = Result<Vec<Icon>, Self::Error>> + Send + '_;

  /// Put a REPLACING icon forward to replace a resolved one. Earlier pending
  /// candidates for the same icon are overwritten.
  fn submit_replacement(
    &self,
    actor: UserId,
    repo_id: RepoId,
    submission: ReplacementSubmission,
  ) -> impl Future<Output = Result<Icon, Self::Error>> + Send + '_;

  fn delete_icon(
    &self,
    actor: UserId,
    id: IconId,
  ) -> impl Future<Output = Result<Icon, Self::Error>> + Send + '_;

  fn update_icon_info(
    &self,
    actor: UserId,
    id: IconId,
    update: IconInfoUpdate,
  ) -> impl Future<Output = Result<Icon, Self::Error>> + Send + '_;

  // ── Lifecycle ─────────────────────────────────────────────────────────

  fn audit(
    &self,
    actor: UserId,
    cases: Vec<AuditCase>,
  ) -> impl Future<Output = Result<AuditReport, Self::Error>> + Send + '_;

  fn replace_icon(
    &self,
    actor: UserId,
    request: ReplaceRequest,
  ) -> impl Future<Output = Result<Icon, Self::Error>> + Send + '_;

  // ── Disabled codes ────────────────────────────────────────────────────

  /// DISABLED icons ordered by code.
  fn disabled_codes(&self) -> impl Future<Output = Result<Vec<Icon>, Self::Error>> + Send + '_;

  fn set_disabled_codes(
    &self,
    actor: UserId,
    requests: Vec<DisableRequest>,
  ) -> impl Future<Output = Result<Vec<Icon>, Self::Error>> + Send + '_;

  fn unset_disabled_code(
    &self,
    actor: UserId,
    id: IconId,
  ) -> impl Future<Output = Result<Vec<Icon>, Self::Error>> + Send + '_;

  fn update_code_description(
    &self,
    actor: UserId,
    id: IconId,
    description: CodeDescription,
  ) -> impl Future<Output = Result<Vec<Icon>, Self::Error>> + Send + '_;
}
