//! [`SqliteStore`] — the SQLite implementation of [`ChangelogDatastore`].

use std::{collections::VecDeque, future::Future, path::Path};

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use tuplewatch_core::{
  changelog::{
    ChangeOperation, ChangelogDatastore, ChangelogEntry, ChangelogIterator,
  },
  tuple::RelationTuple,
};

use crate::{
  Error, Result,
  encode::{RawChangeRow, encode_dt, encode_operation},
  schema::SCHEMA,
};

/// Rows fetched per round-trip to the connection thread. Iteration stays
/// pull-driven from the consumer's perspective; batching only amortises
/// the channel hop.
const BATCH_SIZE: usize = 256;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A changelog store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Append one committed mutation to the changelog.
  ///
  /// Not part of the watch contract: this is the write path used by the
  /// process that maintains the relation-tuple graph, and by tests. The
  /// row's namespace is the tuple's namespace.
  pub async fn append_change(
    &self,
    operation: ChangeOperation,
    tuple: &RelationTuple,
    timestamp: DateTime<Utc>,
  ) -> Result<()> {
    let namespace = tuple.namespace.clone();
    let operation = encode_operation(operation).to_owned();
    let relationtuple = tuple.to_string();
    let timestamp = encode_dt(timestamp);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO changelog (namespace, operation, relationtuple, timestamp)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![namespace, operation, relationtuple, timestamp],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Insert a raw row, bypassing all domain encoding. Lets tests plant
  /// rows that fail decoding.
  #[cfg(test)]
  pub(crate) async fn append_raw(
    &self,
    namespace: &str,
    operation: &str,
    relationtuple: &str,
    timestamp: &str,
  ) -> Result<()> {
    let row = [namespace, operation, relationtuple, timestamp]
      .map(str::to_owned);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO changelog (namespace, operation, relationtuple, timestamp)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![row[0], row[1], row[2], row[3]],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── ChangelogDatastore ──────────────────────────────────────────────────────

impl ChangelogDatastore for SqliteStore {
  type Error = Error;
  type Iter = SqliteChangelogIterator;

  fn get_changes<'a>(
    &'a self,
    namespaces: &'a [String],
    since: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<Self::Iter>> + Send + 'a {
    async move {
      // An empty namespace set matches nothing; skip the store entirely.
      if namespaces.is_empty() {
        return Ok(SqliteChangelogIterator::empty(self.conn.clone()));
      }

      // High-water mark at open time: the replay is bounded to rows that
      // existed when the watch began, whatever gets appended afterwards.
      let high_water = self
        .conn
        .call(|conn| {
          let max: i64 = conn.query_row(
            "SELECT COALESCE(MAX(entry_id), 0) FROM changelog",
            [],
            |r| r.get(0),
          )?;
          Ok(max)
        })
        .await?;

      Ok(SqliteChangelogIterator {
        conn: self.conn.clone(),
        namespaces: namespaces.to_vec(),
        since: since.map(encode_dt),
        high_water,
        cursor: None,
        buffer: VecDeque::new(),
        exhausted: high_water == 0,
      })
    }
  }
}

// ─── Iterator ────────────────────────────────────────────────────────────────

/// Keyset-paginated iteration over the changelog.
///
/// Orders by `(timestamp, entry_id)` and resumes each batch from the last
/// row handed out, bounded by the high-water mark captured at open time.
/// Rows decode one at a time as they are yielded, so a poisoned row fails
/// at exactly its position in the sequence.
pub struct SqliteChangelogIterator {
  conn:       tokio_rusqlite::Connection,
  namespaces: Vec<String>,
  since:      Option<String>,
  high_water: i64,
  /// `(timestamp, entry_id)` of the last row handed out.
  cursor:     Option<(String, i64)>,
  buffer:     VecDeque<RawChangeRow>,
  exhausted:  bool,
}

impl SqliteChangelogIterator {
  fn empty(conn: tokio_rusqlite::Connection) -> Self {
    Self {
      conn,
      namespaces: Vec::new(),
      since: None,
      high_water: 0,
      cursor: None,
      buffer: VecDeque::new(),
      exhausted: true,
    }
  }

  async fn fetch_batch(&mut self) -> Result<()> {
    let placeholders = vec!["?"; self.namespaces.len()].join(", ");
    let mut sql = format!(
      "SELECT entry_id, namespace, operation, relationtuple, timestamp
       FROM changelog
       WHERE entry_id <= ? AND namespace IN ({placeholders})"
    );

    let mut params: Vec<Value> =
      Vec::with_capacity(self.namespaces.len() + 5);
    params.push(Value::from(self.high_water));
    params.extend(self.namespaces.iter().cloned().map(Value::from));

    if let Some(since) = &self.since {
      sql.push_str(" AND timestamp >= ?");
      params.push(Value::from(since.clone()));
    }

    if let Some((ts, id)) = &self.cursor {
      sql.push_str(
        " AND (timestamp > ? OR (timestamp = ? AND entry_id > ?))",
      );
      params.push(Value::from(ts.clone()));
      params.push(Value::from(ts.clone()));
      params.push(Value::from(*id));
    }

    sql.push_str(" ORDER BY timestamp ASC, entry_id ASC LIMIT ?");
    params.push(Value::from(BATCH_SIZE as i64));

    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), |r| {
            Ok(RawChangeRow {
              entry_id:      r.get(0)?,
              namespace:     r.get(1)?,
              operation:     r.get(2)?,
              relationtuple: r.get(3)?,
              timestamp:     r.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    self.buffer = rows.into();
    Ok(())
  }
}

impl ChangelogIterator for SqliteChangelogIterator {
  type Error = Error;

  fn next_entry(
    &mut self,
  ) -> impl Future<Output = Result<Option<ChangelogEntry>>> + Send + '_ {
    async move {
      if self.buffer.is_empty() && !self.exhausted {
        self.fetch_batch().await?;
        if self.buffer.is_empty() {
          self.exhausted = true;
        }
      }

      let Some(row) = self.buffer.pop_front() else {
        return Ok(None);
      };

      self.cursor = Some((row.timestamp.clone(), row.entry_id));
      match row.into_entry() {
        Ok(entry) => Ok(Some(entry)),
        Err(e) => {
          // A row that fails to decode is terminal for the sequence:
          // later pulls must not resume past it.
          self.exhausted = true;
          self.buffer.clear();
          Err(e)
        }
      }
    }
  }
}
