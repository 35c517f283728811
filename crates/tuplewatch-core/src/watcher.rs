//! The watcher — turns the changelog feed into a correctly filtered,
//! correctly ordered, resumable stream of deltas.
//!
//! A watch call is a bounded replay: every entry at or after the request
//! cursor that existed when the call was made, in feed order, then a clean
//! end. There is no live tailing; a client wanting continuous coverage
//! re-issues `watch` with the last event's snaptoken.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
  changelog::{
    ChangeOperation, ChangelogDatastore, ChangelogEntry, ChangelogIterator,
  },
  snaptoken,
  tuple::RelationTuple,
};

// ─── Events ──────────────────────────────────────────────────────────────────

/// The delta kind carried by a watch event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeltaAction {
  Insert,
  Delete,
  Unspecified,
}

impl From<ChangeOperation> for DeltaAction {
  fn from(op: ChangeOperation) -> Self {
    match op {
      ChangeOperation::Insert => Self::Insert,
      ChangeOperation::Delete => Self::Delete,
      ChangeOperation::Unspecified => Self::Unspecified,
    }
  }
}

/// One delta delivered to a watch client.
///
/// `snaptoken` encodes this event's source timestamp; a client that
/// persists it can resume the feed from this exact position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEvent {
  pub action:         DeltaAction,
  pub relation_tuple: RelationTuple,
  pub snaptoken:      String,
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// An error terminating a watch call, generic over the datastore's error
/// type. All variants are surfaced to the caller verbatim; the watcher
/// performs no retries and no local recovery.
#[derive(Debug, Error)]
pub enum WatchError<E: std::error::Error + Send + Sync + 'static> {
  /// The request cursor did not decode. Raised before any feed access.
  #[error(transparent)]
  InvalidSnaptoken(crate::Error),

  /// The feed contract could not produce a sequence at all.
  #[error("failed to open the changelog feed: {0}")]
  FeedUnavailable(#[source] E),

  /// A failure partway through the sequence. Events already delivered
  /// stand; nothing after the failing entry is delivered.
  #[error("failed to read from the changelog feed: {0}")]
  FeedRead(#[source] E),
}

// ─── Watcher ─────────────────────────────────────────────────────────────────

/// Stateless watch orchestration over a [`ChangelogDatastore`].
///
/// Holds no per-client session; concurrent watch calls share nothing but
/// the store handle. Resumption is the caller re-issuing [`Watcher::watch`]
/// with a previously emitted snaptoken.
#[derive(Clone)]
pub struct Watcher<S> {
  store: S,
}

impl<S: ChangelogDatastore> Watcher<S> {
  pub fn new(store: S) -> Self {
    Self { store }
  }

  /// Open a bounded replay of changes for `namespaces` at or after the
  /// position `snaptoken` encodes.
  ///
  /// The empty snaptoken is the "start of feed" sentinel and bypasses the
  /// codec. A non-empty snaptoken that fails to decode aborts the call
  /// before the feed is touched. An empty namespace set yields an empty
  /// stream — it is never interpreted as "all namespaces".
  pub async fn watch(
    &self,
    namespaces: &[String],
    snaptoken: &str,
  ) -> Result<WatchStream<S::Iter>, WatchError<S::Error>> {
    let since = if snaptoken.is_empty() {
      None
    } else {
      Some(snaptoken::decode(snaptoken).map_err(WatchError::InvalidSnaptoken)?)
    };

    let iter = self
      .store
      .get_changes(namespaces, since)
      .await
      .map_err(WatchError::FeedUnavailable)?;

    Ok(WatchStream { iter, fused: false })
  }
}

// ─── WatchStream ─────────────────────────────────────────────────────────────

/// The lazy event sequence produced by one watch call.
///
/// Pull-driven with one entry in flight; dropping the stream stops all
/// further feed access. After a read failure the stream is fused: the
/// error is yielded once and every later call returns `None`.
pub struct WatchStream<I> {
  iter:  I,
  fused: bool,
}

impl<I: ChangelogIterator> WatchStream<I> {
  /// Pull the next event; `None` once the replay is exhausted.
  pub async fn next_event(
    &mut self,
  ) -> Option<Result<WatchEvent, WatchError<I::Error>>> {
    if self.fused {
      return None;
    }

    match self.iter.next_entry().await {
      Ok(Some(entry)) => Some(Ok(to_watch_event(entry))),
      Ok(None) => {
        self.fused = true;
        None
      }
      Err(e) => {
        self.fused = true;
        Some(Err(WatchError::FeedRead(e)))
      }
    }
  }
}

fn to_watch_event(entry: ChangelogEntry) -> WatchEvent {
  WatchEvent {
    action:         entry.operation.into(),
    snaptoken:      snaptoken::encode(entry.timestamp),
    relation_tuple: entry.relation_tuple,
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
