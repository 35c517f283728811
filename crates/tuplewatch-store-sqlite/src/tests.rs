//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{DateTime, Utc};
use tuplewatch_core::{
  changelog::{
    ChangeOperation, ChangelogDatastore, ChangelogEntry, ChangelogIterator,
  },
  tuple::RelationTuple,
};

use crate::{Error, SqliteStore, encode::encode_dt};

// ─── Helpers ─────────────────────────────────────────────────────────────────

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory().await.expect("in-memory store")
}

fn micros(us: i64) -> DateTime<Utc> {
  DateTime::from_timestamp_micros(us).unwrap()
}

fn tuple(s: &str) -> RelationTuple {
  s.parse().unwrap()
}

fn all(names: &[&str]) -> Vec<String> {
  names.iter().map(|s| s.to_string()).collect()
}

async fn collect(
  store: &SqliteStore,
  namespaces: &[String],
  since: Option<DateTime<Utc>>,
) -> Vec<ChangelogEntry> {
  let mut iter = store.get_changes(namespaces, since).await.unwrap();
  let mut entries = Vec::new();
  while let Some(entry) = iter.next_entry().await.unwrap() {
    entries.push(entry);
  }
  entries
}

// ─── Replay ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn append_and_replay() {
  let s = store().await;
  let t1 = micros(1_000_000);
  let t2 = micros(2_000_000);

  s.append_change(ChangeOperation::Insert, &tuple("docs:1#viewer@alice"), t1)
    .await
    .unwrap();
  s.append_change(ChangeOperation::Delete, &tuple("docs:1#viewer@alice"), t2)
    .await
    .unwrap();

  let entries = collect(&s, &all(&["docs"]), None).await;
  assert_eq!(entries.len(), 2);

  assert_eq!(entries[0].namespace, "docs");
  assert_eq!(entries[0].operation, ChangeOperation::Insert);
  assert_eq!(entries[0].relation_tuple.to_string(), "docs:1#viewer@alice");
  assert_eq!(entries[0].timestamp, t1);

  assert_eq!(entries[1].operation, ChangeOperation::Delete);
  assert_eq!(entries[1].timestamp, t2);
}

#[tokio::test]
async fn orders_by_timestamp_regardless_of_insert_order() {
  let s = store().await;
  let t = tuple("docs:1#viewer@alice");

  // Rows appended out of chronological order.
  s.append_change(ChangeOperation::Insert, &t, micros(3_000_000))
    .await
    .unwrap();
  s.append_change(ChangeOperation::Insert, &t, micros(1_000_000))
    .await
    .unwrap();
  s.append_change(ChangeOperation::Insert, &t, micros(2_000_000))
    .await
    .unwrap();

  let entries = collect(&s, &all(&["docs"]), None).await;
  let timestamps: Vec<_> = entries.iter().map(|e| e.timestamp).collect();
  assert_eq!(
    timestamps,
    vec![micros(1_000_000), micros(2_000_000), micros(3_000_000)]
  );
}

#[tokio::test]
async fn since_is_inclusive_and_filters_older_entries() {
  let s = store().await;
  let t = tuple("docs:1#viewer@alice");
  for us in [1_000_000, 2_000_000, 3_000_000] {
    s.append_change(ChangeOperation::Insert, &t, micros(us))
      .await
      .unwrap();
  }

  let entries = collect(&s, &all(&["docs"]), Some(micros(2_000_000))).await;
  let timestamps: Vec<_> = entries.iter().map(|e| e.timestamp).collect();
  assert_eq!(timestamps, vec![micros(2_000_000), micros(3_000_000)]);
}

#[tokio::test]
async fn filters_by_namespace() {
  let s = store().await;
  s.append_change(
    ChangeOperation::Insert,
    &tuple("docs:1#viewer@alice"),
    micros(1),
  )
  .await
  .unwrap();
  s.append_change(
    ChangeOperation::Insert,
    &tuple("images:9#owner@bob"),
    micros(2),
  )
  .await
  .unwrap();

  let entries = collect(&s, &all(&["images"]), None).await;
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0].namespace, "images");

  let entries = collect(&s, &all(&["docs", "images"]), None).await;
  assert_eq!(entries.len(), 2);
}

#[tokio::test]
async fn empty_namespace_set_yields_nothing() {
  let s = store().await;
  s.append_change(
    ChangeOperation::Insert,
    &tuple("docs:1#viewer@alice"),
    micros(1),
  )
  .await
  .unwrap();

  let entries = collect(&s, &[], None).await;
  assert!(entries.is_empty());
}

#[tokio::test]
async fn replay_is_bounded_to_content_at_open_time() {
  let s = store().await;
  let t = tuple("docs:1#viewer@alice");
  s.append_change(ChangeOperation::Insert, &t, micros(1_000_000))
    .await
    .unwrap();

  let namespaces = all(&["docs"]);
  let mut iter = s.get_changes(&namespaces, None).await.unwrap();

  // Appended after the feed was opened; must not appear in this replay.
  s.append_change(ChangeOperation::Insert, &t, micros(2_000_000))
    .await
    .unwrap();

  let mut seen = Vec::new();
  while let Some(entry) = iter.next_entry().await.unwrap() {
    seen.push(entry.timestamp);
  }
  assert_eq!(seen, vec![micros(1_000_000)]);

  // A fresh replay picks it up.
  let entries = collect(&s, &namespaces, None).await;
  assert_eq!(entries.len(), 2);
}

// ─── Row decoding ────────────────────────────────────────────────────────────

#[tokio::test]
async fn poisoned_row_fails_at_its_position() {
  let s = store().await;
  s.append_change(
    ChangeOperation::Insert,
    &tuple("docs:1#viewer@alice"),
    micros(1_000_000),
  )
  .await
  .unwrap();
  s.append_raw("docs", "INSERT", "garbage", &encode_dt(micros(2_000_000)))
    .await
    .unwrap();

  let namespaces = all(&["docs"]);
  let mut iter = s.get_changes(&namespaces, None).await.unwrap();

  // The healthy prefix is delivered.
  assert!(iter.next_entry().await.unwrap().is_some());

  // The poisoned row surfaces as a tuple-grammar error.
  let err = iter.next_entry().await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(tuplewatch_core::Error::InvalidRelationTuple)
  ));
}

#[tokio::test]
async fn decode_failure_is_terminal_for_the_sequence() {
  let s = store().await;
  s.append_raw("docs", "INSERT", "garbage", &encode_dt(micros(1_000_000)))
    .await
    .unwrap();
  s.append_change(
    ChangeOperation::Insert,
    &tuple("docs:1#viewer@alice"),
    micros(2_000_000),
  )
  .await
  .unwrap();

  let namespaces = all(&["docs"]);
  let mut iter = s.get_changes(&namespaces, None).await.unwrap();

  assert!(iter.next_entry().await.is_err());

  // Pulling again must not skip past the poisoned row and hand out the
  // later entry; the sequence has ended.
  assert!(iter.next_entry().await.unwrap().is_none());
  assert!(iter.next_entry().await.unwrap().is_none());
}

#[tokio::test]
async fn unknown_operation_decodes_to_unspecified() {
  let s = store().await;
  s.append_raw(
    "docs",
    "UPSERT",
    "docs:1#viewer@alice",
    &encode_dt(micros(1_000_000)),
  )
  .await
  .unwrap();

  let entries = collect(&s, &all(&["docs"]), None).await;
  assert_eq!(entries[0].operation, ChangeOperation::Unspecified);
}

#[tokio::test]
async fn timestamps_survive_storage_at_microsecond_precision() {
  let s = store().await;
  let t = micros(1_700_000_000_123_456);
  s.append_change(ChangeOperation::Insert, &tuple("docs:1#viewer@alice"), t)
    .await
    .unwrap();

  let entries = collect(&s, &all(&["docs"]), None).await;
  assert_eq!(entries[0].timestamp, t);
}

#[tokio::test]
async fn replay_spans_multiple_batches() {
  let s = store().await;
  let t = tuple("docs:1#viewer@alice");

  // More rows than one fetch batch holds.
  for us in 0..600i64 {
    s.append_change(ChangeOperation::Insert, &t, micros(us))
      .await
      .unwrap();
  }

  let entries = collect(&s, &all(&["docs"]), None).await;
  assert_eq!(entries.len(), 600);
  assert!(entries.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}
