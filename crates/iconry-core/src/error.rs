//! Error types for `iconry-core`.

use thiserror::Error;

use crate::{
  code::CodeRange,
  icon::{IconId, IconStatus, ProjectId, RepoId, UserId},
  lifecycle::IconEvent,
  permission::Action,
};

#[derive(Debug, Error)]
pub enum Error {
  #[error("icon not found: {0}")]
  IconNotFound(IconId),

  #[error("repository not found: {0}")]
  RepoNotFound(RepoId),

  #[error("project not found: {0}")]
  ProjectNotFound(ProjectId),

  #[error("user not found: {0}")]
  UserNotFound(UserId),

  #[error("icon {id} ({name}) is {actual}, expected {expected}")]
  UnexpectedStatus {
    id:       IconId,
    name:     String,
    expected: IconStatus,
    actual:   IconStatus,
  },

  #[error("icon status {from} does not accept event {event}")]
  InvalidTransition { from: IconStatus, event: IconEvent },

  #[error("icon {id} ({name}) does not belong to any repository")]
  NoRepository { id: IconId, name: String },

  #[error("icon {id} is not a pending replacement of icon {expected}")]
  ReplaceTargetMismatch { id: IconId, expected: IconId },

  #[error("icon {id} holds code {actual:#x}, not {expected:#x}")]
  CodeMismatch { id: IconId, expected: u32, actual: u32 },

  #[error("user {user} is not allowed to {action}")]
  PermissionDenied { user: UserId, action: Action },

  #[error("invalid icon name {name:?}: {rule}")]
  InvalidName { name: String, rule: &'static str },

  #[error("invalid icon tags {tags:?}: {rule}")]
  InvalidTags { tags: String, rule: &'static str },

  #[error("field {field} is too long ({len} characters, limit {limit})")]
  FieldTooLong {
    field: &'static str,
    len:   usize,
    limit: usize,
  },

  #[error("invalid code description: {0}")]
  InvalidDescription(String),

  #[error("code space exhausted: {requested} codes requested, {available} free")]
  CodeSpaceExhausted { requested: usize, available: usize },

  #[error("code {code:#x} is outside {range}")]
  CodeOutOfRange { code: u32, range: CodeRange },

  #[error("invalid code range: start {start:#x} is after end {end:#x}")]
  InvalidCodeRange { start: u32, end: u32 },

  #[error("icon {0} appears more than once in the batch")]
  DuplicateIcon(IconId),

  #[error("invalid version tag {0:?}")]
  InvalidVersion(String),

  #[error("{0} must not be empty")]
  Empty(&'static str),

  #[error("unknown icon status value: {0}")]
  UnknownStatus(i64),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
