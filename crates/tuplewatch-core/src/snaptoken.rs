//! Snaptoken codec — the opaque resumption cursor.
//!
//! A snaptoken is `base64(standard, {"timestamp": "<RFC 3339>"})`. Encoding
//! and decoding are pure, local transformations; the store is never
//! consulted. The empty token is a reserved sentinel meaning "start of
//! feed" and is handled by the watcher — it never reaches this codec.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;

use crate::{Error, Result};

#[derive(Deserialize)]
struct Snapshot {
  timestamp: DateTime<Utc>,
}

/// Encode `timestamp` as a snaptoken.
///
/// Timestamps are rendered in UTC at fixed microsecond precision — the
/// precision the changelog stores — so `decode(encode(t)) == t` for every
/// timestamp the feed can produce.
pub fn encode(timestamp: DateTime<Utc>) -> String {
  let snapshot = serde_json::json!({
    "timestamp": timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
  });
  STANDARD.encode(snapshot.to_string())
}

/// Decode a snaptoken back into the timestamp it encodes.
///
/// Bad transport encoding, a malformed snapshot object, and a missing or
/// unparseable timestamp field all surface as [`Error::InvalidSnaptoken`].
pub fn decode(snaptoken: &str) -> Result<DateTime<Utc>> {
  let bytes = STANDARD.decode(snaptoken).map_err(|e| {
    Error::InvalidSnaptoken(format!("bad transport encoding: {e}"))
  })?;

  let snapshot: Snapshot = serde_json::from_slice(&bytes)
    .map_err(|e| Error::InvalidSnaptoken(format!("bad snapshot: {e}")))?;

  Ok(snapshot.timestamp)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
