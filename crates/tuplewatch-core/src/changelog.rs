//! The changelog feed contract.
//!
//! The watcher consumes an ordered, lazy, forward-only sequence of
//! committed relation-tuple mutations through these traits. Storage
//! backends (e.g. `tuplewatch-store-sqlite`) implement them; the watcher
//! stays independently testable against an in-memory fake.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::tuple::RelationTuple;

// ─── Entries ─────────────────────────────────────────────────────────────────

/// The kind of mutation a changelog entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOperation {
  Insert,
  Delete,
  /// The store recorded an operation this version does not recognise.
  Unspecified,
}

/// One committed mutation of the relation-tuple graph.
///
/// Produced by the store and treated as a read-only fact by the core.
/// `timestamp` is the commit time and doubles as the entry's position in
/// the feed's ordering domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogEntry {
  pub namespace:      String,
  pub operation:      ChangeOperation,
  pub relation_tuple: RelationTuple,
  pub timestamp:      DateTime<Utc>,
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Abstraction over an ordered changelog feed.
///
/// Connection and session lifetime are the implementation's concern; the
/// watcher only pulls entries.
pub trait ChangelogDatastore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;
  type Iter: ChangelogIterator<Error = Self::Error>;

  /// Open a finite, ascending-by-timestamp sequence of entries with
  /// `namespace` in `namespaces` and `timestamp >= since` (`None` means
  /// the start of the feed). The sequence reflects store content at open
  /// time; an empty namespace set matches nothing.
  fn get_changes<'a>(
    &'a self,
    namespaces: &'a [String],
    since: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<Self::Iter, Self::Error>> + Send + 'a;
}

/// Forward-only iteration over changelog entries.
///
/// Pull-driven: nothing is fetched beyond the entry being asked for, and
/// dropping the iterator releases the feed. Each element access may fail
/// independently (e.g. a stored row that no longer decodes); such a
/// failure is terminal for the sequence.
pub trait ChangelogIterator: Send {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fetch the next entry, or `None` when the feed is exhausted.
  fn next_entry(
    &mut self,
  ) -> impl Future<Output = Result<Option<ChangelogEntry>, Self::Error>> + Send + '_;
}
