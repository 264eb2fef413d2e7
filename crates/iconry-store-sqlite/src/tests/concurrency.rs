//! Allocation under concurrent audits, including writers that do not share
//! an allocation lock and only meet at the database file.

use std::collections::BTreeSet;

use iconry_core::{
  audit::AuditOutcome,
  code::CodeRange,
  icon::Icon,
  store::IconStore,
};

use super::{Fixture, fresh, seed};
use crate::SqliteStore;

async fn approve_all(f: &Fixture, store: &SqliteStore, icons: &[Icon]) -> Vec<u32> {
  let report = store
    .audit(f.admin.id, icons.iter().map(|i| fresh(i.id, f.repo.id, true)).collect())
    .await
    .unwrap();
  report
    .items
    .into_iter()
    .map(|item| match item.outcome {
      AuditOutcome::Resolved { code, .. } => code,
      other => panic!("unexpected outcome {other:?}"),
    })
    .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_audits_never_share_a_code() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("icons.db");

  let first = SqliteStore::open(&path, CodeRange::PRIVATE_USE).await.unwrap();
  let second = SqliteStore::open(&path, CodeRange::PRIVATE_USE).await.unwrap();
  let f = seed(first).await;

  let names_a: Vec<String> = (0..8).map(|i| format!("a{i}")).collect();
  let names_b: Vec<String> = (0..8).map(|i| format!("b{i}")).collect();
  let a = f.submit(&names_a.iter().map(String::as_str).collect::<Vec<_>>()).await;
  let b = f.submit(&names_b.iter().map(String::as_str).collect::<Vec<_>>()).await;

  let (codes_a, codes_b) =
    tokio::join!(approve_all(&f, &f.store, &a), approve_all(&f, &second, &b));

  let all: BTreeSet<u32> = codes_a.iter().chain(&codes_b).copied().collect();
  assert_eq!(all.len(), 16);
  assert_eq!(all.iter().copied().collect::<Vec<_>>(), (0xE000..0xE010).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn clones_serialise_on_the_allocation_lock() {
  let store = SqliteStore::open_in_memory(CodeRange::PRIVATE_USE)
    .await
    .unwrap();
  let f = seed(store).await;

  let mut batches = Vec::new();
  for n in 0..4 {
    let names: Vec<String> = (0..5).map(|i| format!("n{n}x{i}")).collect();
    batches.push(f.submit(&names.iter().map(String::as_str).collect::<Vec<_>>()).await);
  }

  let (c0, c1, c2, c3) = tokio::join!(
    approve_all(&f, &f.store, &batches[0]),
    approve_all(&f, &f.store, &batches[1]),
    approve_all(&f, &f.store, &batches[2]),
    approve_all(&f, &f.store, &batches[3]),
  );

  let all: BTreeSet<u32> = [c0, c1, c2, c3].into_iter().flatten().collect();
  assert_eq!(all.len(), 20);
}
