//! SQL schema for the tuplewatch SQLite changelog store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- The changelog is strictly append-only: one row per committed mutation
-- of the relation-tuple graph. Timestamps are fixed-precision RFC 3339
-- UTC text, so lexicographic order equals chronological order.
CREATE TABLE IF NOT EXISTS changelog (
    entry_id      INTEGER PRIMARY KEY AUTOINCREMENT,
    namespace     TEXT NOT NULL,
    operation     TEXT NOT NULL,   -- 'INSERT' | 'DELETE'
    relationtuple TEXT NOT NULL,   -- namespace:object#relation@subject
    timestamp     TEXT NOT NULL    -- ISO 8601 UTC, microsecond precision
);

CREATE INDEX IF NOT EXISTS changelog_namespace_ts_idx
    ON changelog(namespace, timestamp);

PRAGMA user_version = 1;
";
