use iconry_core::{
  Error as CoreError,
  icon::{IconStatus, PENDING_VERSION},
  log::{LogKind, LogParams},
  permission::Action,
  store::{IconInfoUpdate, IconStore, ReplacementSubmission},
};

use super::{fixture, submission, svg};
use crate::Error;

#[tokio::test]
async fn upload_creates_uploaded_icons_with_cache() {
  let f = fixture().await;
  let icons = f.upload(&["arrow", "bell"]).await;

  assert_eq!(icons.len(), 2);
  for icon in &icons {
    assert_eq!(icon.status, IconStatus::Uploaded);
    assert_eq!(icon.tags, icon.name);
    assert_eq!(icon.code, None);
    let cache = f.store.cache_entry(icon.id).await.unwrap();
    assert!(cache.and_then(|c| c.svg).is_some());
  }
  let listed = f.store.uploaded_icons(f.uploader.id).await.unwrap();
  assert_eq!(listed.len(), 2);
}

#[tokio::test]
async fn invalid_name_aborts_whole_upload() {
  let f = fixture().await;
  let err = f
    .store
    .upload_icons(f.uploader.id, vec![svg("arrow"), svg("bad name!")])
    .await
    .unwrap_err();

  assert!(matches!(err, Error::Core(CoreError::InvalidName { .. })));
  assert!(f.store.uploaded_icons(f.uploader.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn submit_moves_icons_to_pending_in_repo() {
  let f = fixture().await;
  let pending = f.submit(&["arrow", "bell"]).await;

  assert!(pending.iter().all(|i| i.status == IconStatus::Pending));
  let links = f.store.repo_versions(f.repo.id).await.unwrap();
  assert_eq!(links.len(), 2);
  assert!(links.iter().all(|l| l.version == PENDING_VERSION));

  let logs = f.store.logs(Some(f.repo.id)).await.unwrap();
  assert_eq!(logs.len(), 1);
  assert_eq!(logs[0].event.kind, LogKind::Upload);
  assert_eq!(logs[0].event.subscribers, vec![f.admin.id]);
  let LogParams::Icons { icon } = &logs[0].event.params else {
    panic!("expected icon params");
  };
  assert_eq!(icon.len(), 2);
}

#[tokio::test]
async fn only_uploader_submits() {
  let f = fixture().await;
  let icons = f.upload(&["arrow"]).await;

  let err = f
    .store
    .submit_icons(f.stranger.id, f.repo.id, vec![submission(&icons[0])])
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    Error::Core(CoreError::PermissionDenied { action: Action::SubmitIcon, .. })
  ));
  assert_eq!(f.icon(icons[0].id).await.status, IconStatus::Uploaded);
}

#[tokio::test]
async fn submitting_twice_is_an_invalid_transition() {
  let f = fixture().await;
  let pending = f.submit(&["arrow"]).await;

  let err = f
    .store
    .submit_icons(f.uploader.id, f.repo.id, vec![submission(&pending[0])])
    .await
    .unwrap_err();

  assert!(matches!(err, Error::Core(CoreError::InvalidTransition { .. })));
}

#[tokio::test]
async fn submission_applies_adjusted_path_and_suffix() {
  let f = fixture().await;
  let icons = f.upload(&["arrow"]).await;
  let mut item = submission(&icons[0]);
  item.adjusted_path = Some("M1 1L2 2z".into());
  item.font_class = Some("bold".into());

  let pending = f
    .store
    .submit_icons(f.uploader.id, f.repo.id, vec![item])
    .await
    .unwrap();

  assert_eq!(pending[0].path, "M1 1L2 2z");
  assert_eq!(pending[0].font_class.as_deref(), Some("bold"));
}

#[tokio::test]
async fn delete_clears_cache() {
  let f = fixture().await;
  let icons = f.upload(&["arrow"]).await;

  let deleted = f.store.delete_icon(f.uploader.id, icons[0].id).await.unwrap();

  assert_eq!(deleted.status, IconStatus::Delete);
  assert!(f.store.cache_entry(icons[0].id).await.unwrap().is_none());
  assert!(f.store.uploaded_icons(f.uploader.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn pending_icons_cannot_be_deleted() {
  let f = fixture().await;
  let pending = f.submit(&["arrow"]).await;

  let err = f.store.delete_icon(f.uploader.id, pending[0].id).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::InvalidTransition { .. })));
}

#[tokio::test]
async fn uploader_retags_but_only_curators_rename() {
  let f = fixture().await;
  let pending = f.submit(&["arrow"]).await;
  let id = pending[0].id;

  let retagged = f
    .store
    .update_icon_info(f.uploader.id, id, IconInfoUpdate {
      name: None,
      tags: Some("arrow,left".into()),
    })
    .await
    .unwrap();
  assert_eq!(retagged.tags, "arrow,left");

  let err = f
    .store
    .update_icon_info(f.uploader.id, id, IconInfoUpdate {
      name: Some("pointer".into()),
      tags: None,
    })
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::PermissionDenied { action: Action::RenameIcon, .. })
  ));

  let renamed = f
    .store
    .update_icon_info(f.admin.id, id, IconInfoUpdate {
      name: Some("pointer".into()),
      tags: None,
    })
    .await
    .unwrap();
  assert_eq!(renamed.name, "pointer");
}

#[tokio::test]
async fn newer_replacement_overwrites_pending_one() {
  let f = fixture().await;
  let resolved = f.resolve(&["arrow"]).await;
  let old = &resolved[0];
  let first = f.candidate("arrow2").await;
  let second = f.candidate("arrow3").await;

  let submit = |id| ReplacementSubmission {
    id,
    old_id: old.id,
    name: "arrow".into(),
    tags: "arrow".into(),
    font_class: None,
    adjusted_path: None,
  };

  let queued = f
    .store
    .submit_replacement(f.uploader.id, f.repo.id, submit(first.id))
    .await
    .unwrap();
  assert_eq!(queued.status, IconStatus::Replace);
  assert_eq!(queued.code, old.code);
  assert_eq!(queued.old_id, Some(old.id));

  f.store
    .submit_replacement(f.uploader.id, f.repo.id, submit(second.id))
    .await
    .unwrap();

  let first = f.icon(first.id).await;
  assert_eq!(first.status, IconStatus::Delete);
  assert_eq!(first.code, None);
  assert!(f.store.cache_entry(first.id).await.unwrap().is_none());

  let queue = f.store.audit_queue(f.admin.id).await.unwrap();
  let ids: Vec<_> = queue.iter().map(|q| q.icon.id).collect();
  assert_eq!(ids, vec![second.id]);
}
