use chrono::{TimeZone as _, Utc};
use iconry_core::{
  Error as CoreError,
  icon::IconStatus,
  log::{LogKind, LogParams},
  store::{DisableRequest, IconStore, ReplaceRequest},
  validate::CodeDescription,
};

use super::{disable, fixture};
use crate::{Error, disabled::RESERVED_PATH};

fn described(code: u32, mobile: &str) -> DisableRequest {
  DisableRequest {
    code,
    description: CodeDescription {
      mobile: mobile.into(),
      os:     "android 4".into(),
      other:  String::new(),
    },
    time: Some(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()),
  }
}

#[tokio::test]
async fn free_code_is_reserved_and_released() {
  let f = fixture().await;

  let listed = f
    .store
    .set_disabled_codes(f.root.id, vec![disable(0xE003)])
    .await
    .unwrap();
  assert_eq!(listed.len(), 1);
  let placeholder = &listed[0];
  assert_eq!(placeholder.code, Some(0xE003));
  assert_eq!(placeholder.path, RESERVED_PATH);
  assert!(!f.store.free_codes().await.unwrap().contains(&0xE003));

  let listed = f
    .store
    .unset_disabled_code(f.root.id, placeholder.id)
    .await
    .unwrap();
  assert!(listed.is_empty());
  assert!(f.store.get_icon(placeholder.id).await.unwrap().is_none());
  assert!(f.store.free_codes().await.unwrap().contains(&0xE003));
}

#[tokio::test]
async fn disabling_a_held_code_moves_the_icon() {
  let f = fixture().await;
  let icons = f.resolve(&["arrow", "bell"]).await;
  let old = icons[0].clone();
  assert_eq!(old.code, Some(0xE000));

  let listed = f
    .store
    .set_disabled_codes(f.root.id, vec![described(0xE000, "iphone 5")])
    .await
    .unwrap();

  assert_eq!(listed.len(), 1);
  let disabled = &listed[0];
  assert_eq!(disabled.id, old.id);
  assert_eq!(disabled.status, IconStatus::Disabled);
  assert_eq!(disabled.code, Some(0xE000));
  let description =
    CodeDescription::from_json(disabled.description.as_deref().unwrap()).unwrap();
  assert_eq!(description.mobile, "iphone 5");
  assert_eq!(
    disabled.apply_time,
    Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
  );

  let moved = f.icon(disabled.new_id.expect("successor")).await;
  assert_eq!(moved.status, IconStatus::Resolved);
  assert_eq!(moved.code, Some(0xE002));
  assert_eq!(moved.name, old.name);
  assert_eq!(moved.path, old.path);
  assert_eq!(moved.font_class, old.font_class);
  assert_eq!(moved.create_time, old.create_time);
  assert_eq!(moved.old_id, Some(old.id));

  let lineage = f.store.lineage(old.id).await.unwrap().unwrap();
  assert_eq!(lineage.ids(), vec![old.id, moved.id]);

  let links = f.store.repo_versions(f.repo.id).await.unwrap();
  assert!(links.iter().any(|l| l.icon_id == moved.id && l.is_pending()));
  assert!(links.iter().all(|l| l.icon_id != old.id));

  let logs = f.store.logs(None).await.unwrap();
  assert_eq!(logs.len(), 1);
  assert_eq!(logs[0].event.kind, LogKind::DisabledCodeAdd);
  assert_eq!(logs[0].event.params, LogParams::Codes { code: vec![0xE000] });
}

#[tokio::test]
async fn placeholders_are_not_handed_to_moved_icons() {
  let f = fixture().await;
  f.resolve(&["arrow"]).await;

  // 0xE001 is free but about to be reserved in the same request.
  f.store
    .set_disabled_codes(f.root.id, vec![disable(0xE000), disable(0xE001)])
    .await
    .unwrap();

  let codes: Vec<_> = f
    .store
    .disabled_codes()
    .await
    .unwrap()
    .into_iter()
    .map(|i| i.code)
    .collect();
  assert_eq!(codes, vec![Some(0xE000), Some(0xE001)]);
  assert_eq!(f.store.free_codes().await.unwrap()[0], 0xE003);
}

#[tokio::test]
async fn already_disabled_codes_are_skipped() {
  let f = fixture().await;
  f.reserve([0xE000]).await;

  let listed = f
    .store
    .set_disabled_codes(f.root.id, vec![disable(0xE000)])
    .await
    .unwrap();

  assert_eq!(listed.len(), 1);
  assert_eq!(f.store.logs(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn released_icon_returns_to_resolved() {
  let f = fixture().await;
  let old = f.resolve(&["arrow"]).await.remove(0);
  f.store
    .set_disabled_codes(f.root.id, vec![described(0xE000, "iphone 5")])
    .await
    .unwrap();

  let listed = f.store.unset_disabled_code(f.root.id, old.id).await.unwrap();

  assert!(listed.is_empty());
  let restored = f.icon(old.id).await;
  assert_eq!(restored.status, IconStatus::Resolved);
  assert_eq!(restored.code, Some(0xE000));
  assert_eq!(restored.description, None);
}

#[tokio::test]
async fn only_super_admins_manage_disabled_codes() {
  let f = fixture().await;

  let err = f
    .store
    .set_disabled_codes(f.admin.id, vec![disable(0xE000)])
    .await
    .unwrap_err();

  assert!(matches!(err, Error::Core(CoreError::PermissionDenied { .. })));
  assert!(f.store.disabled_codes().await.unwrap().is_empty());
}

#[tokio::test]
async fn codes_outside_the_range_are_refused() {
  let f = fixture().await;

  let err = f
    .store
    .set_disabled_codes(f.root.id, vec![disable(0xE000), disable(0x41)])
    .await
    .unwrap_err();

  assert!(matches!(err, Error::Core(CoreError::CodeOutOfRange { code: 0x41, .. })));
  assert!(f.store.disabled_codes().await.unwrap().is_empty());
}

#[tokio::test]
async fn overlong_description_is_refused() {
  let f = fixture().await;
  let too_long = "x".repeat(100);

  let err = f
    .store
    .set_disabled_codes(f.root.id, vec![described(0xE000, &too_long)])
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    Error::Core(CoreError::FieldTooLong { field: "mobile", limit: 100, .. })
  ));
}

#[tokio::test]
async fn description_can_be_edited() {
  let f = fixture().await;
  f.reserve([0xE000]).await;
  let id = f.store.disabled_codes().await.unwrap()[0].id;

  let listed = f
    .store
    .update_code_description(f.root.id, id, CodeDescription {
      mobile: "pixel".into(),
      ..Default::default()
    })
    .await
    .unwrap();

  let description =
    CodeDescription::from_json(listed[0].description.as_deref().unwrap()).unwrap();
  assert_eq!(description.mobile, "pixel");
}

#[tokio::test]
async fn restored_icon_can_be_disabled_again() {
  let f = fixture().await;
  let old = f.resolve(&["arrow"]).await.remove(0);
  let first = f
    .store
    .set_disabled_codes(f.root.id, vec![disable(0xE000)])
    .await
    .unwrap();
  let first_copy = first[0].new_id.expect("successor");
  f.store.unset_disabled_code(f.root.id, old.id).await.unwrap();

  let restored = f.icon(old.id).await;
  assert_eq!(restored.new_id, None);
  assert_eq!(f.store.lineage(old.id).await.unwrap().unwrap().ids(), vec![old.id]);
  assert_eq!(f.icon(first_copy).await.old_id, None);

  let listed = f
    .store
    .set_disabled_codes(f.root.id, vec![disable(0xE000)])
    .await
    .unwrap();

  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].id, old.id);
  let second_copy = f.icon(listed[0].new_id.expect("successor")).await;
  assert_eq!(second_copy.status, IconStatus::Resolved);
  assert_eq!(second_copy.code, Some(0xE002));
  assert_eq!(
    f.store.lineage(old.id).await.unwrap().unwrap().ids(),
    vec![old.id, second_copy.id]
  );
}

#[tokio::test]
async fn restored_icon_can_be_replaced() {
  let f = fixture().await;
  let old = f.resolve(&["arrow"]).await.remove(0);
  f.store
    .publish_repo_version(f.admin.id, f.repo.id, "1.0.0".into())
    .await
    .unwrap();
  f.store
    .set_disabled_codes(f.root.id, vec![disable(0xE000)])
    .await
    .unwrap();
  f.store.unset_disabled_code(f.root.id, old.id).await.unwrap();
  let to = f.candidate("arrow-v2").await;

  let new = f
    .store
    .replace_icon(f.uploader.id, ReplaceRequest {
      from_id:       old.id,
      to_id:         to.id,
      name:          "arrow".into(),
      tags:          "arrow".into(),
      adjusted_path: None,
    })
    .await
    .unwrap();

  assert_eq!(new.code, Some(0xE000));
  assert_eq!(f.icon(old.id).await.status, IconStatus::Replaced);
  assert_eq!(
    f.store.lineage(old.id).await.unwrap().unwrap().ids(),
    vec![old.id, new.id]
  );
}
