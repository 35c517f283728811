//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.

use chrono::{DateTime, SecondsFormat, Utc};
use tuplewatch_core::{
  changelog::{ChangeOperation, ChangelogEntry},
  tuple::RelationTuple,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// Timestamps are stored at fixed microsecond precision so the TEXT column
/// sorts chronologically.
pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── ChangeOperation ─────────────────────────────────────────────────────────

pub fn encode_operation(op: ChangeOperation) -> &'static str {
  match op {
    ChangeOperation::Insert => "INSERT",
    ChangeOperation::Delete => "DELETE",
    ChangeOperation::Unspecified => "UNSPECIFIED",
  }
}

/// Unknown operation strings decode to `Unspecified` rather than failing;
/// the watcher forwards them as unspecified deltas.
pub fn decode_operation(s: &str) -> ChangeOperation {
  match s {
    "INSERT" => ChangeOperation::Insert,
    "DELETE" => ChangeOperation::Delete,
    _ => ChangeOperation::Unspecified,
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `changelog` row.
pub struct RawChangeRow {
  pub entry_id:      i64,
  pub namespace:     String,
  pub operation:     String,
  pub relationtuple: String,
  pub timestamp:     String,
}

impl RawChangeRow {
  /// Decode into a [`ChangelogEntry`]. Fails if the stored tuple text or
  /// timestamp no longer parses.
  pub fn into_entry(self) -> Result<ChangelogEntry> {
    let relation_tuple: RelationTuple = self.relationtuple.parse()?;
    let timestamp = decode_dt(&self.timestamp)?;

    Ok(ChangelogEntry {
      namespace: self.namespace,
      operation: decode_operation(&self.operation),
      relation_tuple,
      timestamp,
    })
  }
}
