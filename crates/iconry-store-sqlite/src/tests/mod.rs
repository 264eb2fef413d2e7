//! Integration tests for `SqliteStore` against in-memory databases.

mod concurrency;
mod disabled;
mod submit;

use iconry_core::{
  audit::{AuditCase, FreshCase},
  code::CodeRange,
  icon::{Icon, IconId, Repo, RepoId, Role, User},
  store::{DisableRequest, IconStore, NewRepo, NewUser, SubmittedIcon, UploadedSvg},
};

use crate::SqliteStore;

/// A store with one repository and a user for every role involved.
pub(super) struct Fixture {
  pub store:    SqliteStore,
  /// Super-admin.
  pub root:     User,
  /// Administrator of `repo`.
  pub admin:    User,
  pub uploader: User,
  pub stranger: User,
  pub repo:     Repo,
}

pub(super) async fn fixture() -> Fixture { fixture_in(CodeRange::PRIVATE_USE).await }

pub(super) async fn fixture_in(range: CodeRange) -> Fixture {
  let store = SqliteStore::open_in_memory(range)
    .await
    .expect("in-memory store");
  seed(store).await
}

pub(super) async fn seed(store: SqliteStore) -> Fixture {
  let root = user(&store, "root", Role::SuperAdmin).await;
  let admin = user(&store, "admin", Role::RepoAuditor).await;
  let uploader = user(&store, "uploader", Role::Member).await;
  let stranger = user(&store, "stranger", Role::Member).await;
  let repo = store
    .create_repo(NewRepo {
      name:  "Finance".into(),
      alias: "fin".into(),
      admin: admin.id,
    })
    .await
    .unwrap();
  Fixture { store, root, admin, uploader, stranger, repo }
}

async fn user(store: &SqliteStore, name: &str, role: Role) -> User {
  store
    .create_user(NewUser { name: name.into(), role })
    .await
    .unwrap()
}

pub(super) fn svg(name: &str) -> UploadedSvg {
  UploadedSvg {
    name: name.into(),
    path: format!("M0 0L{} 10z", name.len()),
    svg:  Some(format!("<svg><path d=\"M0 0\"/><!-- {name} --></svg>")),
  }
}

pub(super) fn fresh(id: IconId, repo_id: RepoId, passed: bool) -> AuditCase {
  AuditCase::Fresh(FreshCase { id, repo_id, passed })
}

pub(super) fn submission(icon: &Icon) -> SubmittedIcon {
  SubmittedIcon {
    id:            icon.id,
    name:          icon.name.clone(),
    tags:          icon.name.clone(),
    font_class:    None,
    adjusted_path: None,
  }
}

pub(super) fn disable(code: u32) -> DisableRequest {
  DisableRequest { code, description: Default::default(), time: None }
}

impl Fixture {
  pub async fn upload(&self, names: &[&str]) -> Vec<Icon> {
    self
      .store
      .upload_icons(self.uploader.id, names.iter().map(|n| svg(n)).collect())
      .await
      .unwrap()
  }

  /// Upload and submit `names` to the fixture repository.
  pub async fn submit(&self, names: &[&str]) -> Vec<Icon> {
    let icons = self.upload(names).await;
    self
      .store
      .submit_icons(
        self.uploader.id,
        self.repo.id,
        icons.iter().map(submission).collect(),
      )
      .await
      .unwrap()
  }

  /// Upload, submit and approve `names`.
  pub async fn resolve(&self, names: &[&str]) -> Vec<Icon> {
    let pending = self.submit(names).await;
    let cases = pending
      .iter()
      .map(|i| fresh(i.id, self.repo.id, true))
      .collect();
    let report = self.store.audit(self.admin.id, cases).await.unwrap();
    assert!(report.all_succeeded(), "{report:?}");
    self
      .store
      .get_icons(pending.iter().map(|i| i.id).collect())
      .await
      .unwrap()
  }

  pub async fn candidate(&self, name: &str) -> Icon {
    self
      .store
      .upload_replacement(self.uploader.id, svg(name))
      .await
      .unwrap()
  }

  pub async fn icon(&self, id: IconId) -> Icon {
    self.store.get_icon(id).await.unwrap().expect("icon exists")
  }

  /// Withhold `codes` with placeholder rows.
  pub async fn reserve(&self, codes: impl IntoIterator<Item = u32>) {
    self
      .store
      .set_disabled_codes(self.root.id, codes.into_iter().map(disable).collect())
      .await
      .unwrap();
  }
}
