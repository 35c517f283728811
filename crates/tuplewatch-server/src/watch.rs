//! Handler for the streaming `POST /watch` endpoint.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/watch` | Body: [`WatchBody`]; response is `application/x-ndjson`, one event per line |
//!
//! The response streams a bounded replay: every changelog entry for the
//! requested namespaces at or after the snaptoken's position, then EOF.
//! A client wanting continuous coverage re-issues the request with the
//! last event's snaptoken.

use axum::{
  Json,
  body::Body,
  extract::State,
  http::header,
  response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::{Stream, stream};
use serde::Deserialize;
use serde_json::json;
use tuplewatch_core::{
  changelog::{ChangelogDatastore, ChangelogIterator},
  watcher::{WatchError, WatchEvent, WatchStream},
};

use crate::{AppState, error::ApiError};

/// JSON body accepted by `POST /watch`.
#[derive(Debug, Deserialize)]
pub struct WatchBody {
  /// Namespaces to watch. An empty list yields an empty replay.
  #[serde(default)]
  pub namespaces: Vec<String>,
  /// Resumption cursor from a previous event; empty or absent means the
  /// start of the feed.
  #[serde(default)]
  pub snaptoken:  String,
}

/// `POST /watch`
///
/// An invalid snaptoken is a 400 and an unreachable feed a 500, both
/// before any event is sent. A read failure mid-replay emits a final
/// `{"error": ..}` line and closes the stream; events already sent stand.
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<WatchBody>,
) -> Result<Response, ApiError>
where
  S: ChangelogDatastore + Clone + Send + Sync + 'static,
  S::Iter: 'static,
{
  let events = state
    .watcher
    .watch(&body.namespaces, &body.snaptoken)
    .await
    .map_err(|e| match e {
      WatchError::InvalidSnaptoken(e) => ApiError::BadRequest(e.to_string()),
      WatchError::FeedUnavailable(e) => ApiError::Feed(Box::new(e)),
      WatchError::FeedRead(e) => ApiError::Feed(Box::new(e)),
    })?;

  Ok(
    (
      [(header::CONTENT_TYPE, "application/x-ndjson")],
      Body::from_stream(ndjson(events)),
    )
      .into_response(),
  )
}

/// Adapt a [`WatchStream`] into NDJSON frames, one event per line.
///
/// Dropping the response body (client disconnect) drops the inner stream,
/// which stops all further feed access.
fn ndjson<I>(
  events: WatchStream<I>,
) -> impl Stream<Item = Result<Bytes, std::convert::Infallible>>
where
  I: ChangelogIterator + 'static,
{
  stream::unfold(Some(events), |state| async move {
    let mut events = state?;
    match events.next_event().await {
      Some(Ok(event)) => Some((Ok(event_line(&event)), Some(events))),
      Some(Err(e)) => Some((Ok(error_line(&e.to_string())), None)),
      None => None,
    }
  })
}

fn event_line(event: &WatchEvent) -> Bytes {
  match serde_json::to_string(event) {
    Ok(line) => Bytes::from(line + "\n"),
    Err(e) => error_line(&e.to_string()),
  }
}

fn error_line(message: &str) -> Bytes {
  Bytes::from(json!({ "error": message }).to_string() + "\n")
}
