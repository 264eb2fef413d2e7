//! Who may do what to an icon.
//!
//! | Action                | Uploader | Repo admin | Super-admin |
//! |-----------------------|:--------:|:----------:|:-----------:|
//! | `SubmitIcon`          | yes      |            |             |
//! | `ReplaceIcon`         | yes      | yes        | yes         |
//! | `AuditReplacement`    |          | yes        | yes         |
//! | `AuditUpload`         |          | yes        | yes         |
//! | `DeleteIcon`          | yes      |            |             |
//! | `RenameIcon`          |          | yes        | yes         |
//! | `RetagIcon`           | yes      | yes        | yes         |
//! | `ManageDisabledCodes` |          |            | yes         |
//! | `PublishRepository`   |          | yes        | yes         |
//! | `ViewAuditQueue`      |          | auditor    | yes         |

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  icon::{Role, User, UserId},
};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Action {
  #[strum(serialize = "submit this icon")]
  SubmitIcon,
  #[strum(serialize = "replace this icon")]
  ReplaceIcon,
  #[strum(serialize = "audit this replacement")]
  AuditReplacement,
  #[strum(serialize = "audit icons of this repository")]
  AuditUpload,
  #[strum(serialize = "delete this icon")]
  DeleteIcon,
  #[strum(serialize = "rename this icon")]
  RenameIcon,
  #[strum(serialize = "change the tags of this icon")]
  RetagIcon,
  #[strum(serialize = "manage disabled codes")]
  ManageDisabledCodes,
  #[strum(serialize = "publish this repository")]
  PublishRepository,
  #[strum(serialize = "view the audit queue")]
  ViewAuditQueue,
}

/// The parties an action is checked against.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stakeholders {
  pub uploader:   Option<UserId>,
  pub repo_admin: Option<UserId>,
}

impl Stakeholders {
  pub fn new(uploader: Option<UserId>, repo_admin: Option<UserId>) -> Self {
    Self { uploader, repo_admin }
  }
}

/// Check that `user` may perform `action` given its `stakeholders`.
pub fn authorize(user: &User, action: Action, stakeholders: Stakeholders) -> Result<()> {
  let is_super = user.role == Role::SuperAdmin;
  let is_uploader = stakeholders.uploader == Some(user.id);
  let is_admin = stakeholders.repo_admin == Some(user.id);

  let allowed = match action {
    Action::ReplaceIcon | Action::RetagIcon => is_uploader || is_admin || is_super,
    Action::AuditReplacement
    | Action::AuditUpload
    | Action::RenameIcon
    | Action::PublishRepository => is_admin || is_super,
    Action::SubmitIcon | Action::DeleteIcon => is_uploader,
    Action::ManageDisabledCodes => is_super,
    Action::ViewAuditQueue => is_super || user.role == Role::RepoAuditor,
  };

  if allowed {
    Ok(())
  } else {
    Err(Error::PermissionDenied { user: user.id, action })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn user(id: i64, role: Role) -> User {
    User { id: UserId(id), name: format!("user-{id}"), role }
  }

  const UPLOADER: i64 = 1;
  const ADMIN: i64 = 2;
  const STRANGER: i64 = 3;

  fn parties() -> Stakeholders {
    Stakeholders::new(Some(UserId(UPLOADER)), Some(UserId(ADMIN)))
  }

  #[test]
  fn replace_allows_uploader_admin_and_super() {
    for u in [
      user(UPLOADER, Role::Member),
      user(ADMIN, Role::RepoAuditor),
      user(STRANGER, Role::SuperAdmin),
    ] {
      authorize(&u, Action::ReplaceIcon, parties()).unwrap();
    }
    let err =
      authorize(&user(STRANGER, Role::Member), Action::ReplaceIcon, parties())
        .unwrap_err();
    assert!(matches!(
      err,
      Error::PermissionDenied { user: UserId(STRANGER), action: Action::ReplaceIcon }
    ));
  }

  #[test]
  fn uploader_cannot_audit_own_replacement() {
    assert!(
      authorize(&user(UPLOADER, Role::Member), Action::AuditReplacement, parties())
        .is_err()
    );
    authorize(&user(ADMIN, Role::Member), Action::AuditReplacement, parties())
      .unwrap();
  }

  #[test]
  fn only_uploader_deletes() {
    authorize(&user(UPLOADER, Role::Member), Action::DeleteIcon, parties()).unwrap();
    assert!(
      authorize(&user(STRANGER, Role::SuperAdmin), Action::DeleteIcon, parties())
        .is_err()
    );
  }

  #[test]
  fn disabled_codes_need_super_admin() {
    assert!(
      authorize(
        &user(ADMIN, Role::RepoAuditor),
        Action::ManageDisabledCodes,
        Stakeholders::default()
      )
      .is_err()
    );
    authorize(
      &user(STRANGER, Role::SuperAdmin),
      Action::ManageDisabledCodes,
      Stakeholders::default(),
    )
    .unwrap();
  }

  #[test]
  fn denial_message_names_the_action() {
    let err = authorize(&user(STRANGER, Role::Member), Action::RenameIcon, parties())
      .unwrap_err();
    assert_eq!(err.to_string(), "user 3 is not allowed to rename this icon");
  }
}
