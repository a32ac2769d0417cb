//! SQLite schema for snapshot storage.

use crate::error::Result;

/// Full DDL for every table and index in the steward SQLite schema.
///
/// All statements use `IF NOT EXISTS` so that [`run_migrations`] is
/// idempotent and safe to call on an already-initialised database.
pub const CREATE_TABLES: &str = "
-- -------------------------------------------------------------------------
-- configs
-- -------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS configs (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    name                TEXT    NOT NULL UNIQUE,
    caddyfile_path      TEXT,
    last_imported_at    TEXT,
    last_exported_at    TEXT,
    last_caddyfile_hash TEXT
);

-- -------------------------------------------------------------------------
-- config_snapshots: one per config per source kind
-- -------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS config_snapshots (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    config_id    INTEGER NOT NULL REFERENCES configs(id) ON DELETE CASCADE,
    source_kind  TEXT    NOT NULL,
    source_path  TEXT,
    source_hash  TEXT,
    collected_at TEXT    NOT NULL,
    UNIQUE (config_id, source_kind)
);

CREATE INDEX IF NOT EXISTS idx_config_snapshots_config_id
    ON config_snapshots (config_id);

-- -------------------------------------------------------------------------
-- server_blocks
-- -------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS server_blocks (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    snapshot_id INTEGER NOT NULL REFERENCES config_snapshots(id) ON DELETE CASCADE,
    block_index INTEGER NOT NULL,
    is_global   INTEGER NOT NULL DEFAULT 0,
    prelude     TEXT    NOT NULL DEFAULT '',
    postlude    TEXT    NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_server_blocks_snapshot_id
    ON server_blocks (snapshot_id);

-- -------------------------------------------------------------------------
-- block_sites: analyzed labels, one row per label
-- -------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS block_sites (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    block_id    INTEGER NOT NULL REFERENCES server_blocks(id) ON DELETE CASCADE,
    raw_label   TEXT    NOT NULL,
    host        TEXT,
    port        INTEGER,
    scheme      TEXT,
    is_ipv6     INTEGER NOT NULL DEFAULT 0,
    is_wildcard INTEGER NOT NULL DEFAULT 0,
    label_index INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_block_sites_block_id
    ON block_sites (block_id);

-- -------------------------------------------------------------------------
-- block_fragments
-- -------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS block_fragments (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    block_id       INTEGER NOT NULL REFERENCES server_blocks(id) ON DELETE CASCADE,
    fragment_index INTEGER NOT NULL,
    kind           TEXT    NOT NULL,
    content        TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_block_fragments_block_id
    ON block_fragments (block_id);

-- -------------------------------------------------------------------------
-- meta
-- -------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS meta (
    key        TEXT NOT NULL PRIMARY KEY,
    value      TEXT,
    updated_at TEXT NOT NULL
);
";

/// Initialise (or upgrade) the database schema.
///
/// This function is idempotent: it is safe to call on a database that has
/// already been initialised.
pub fn run_migrations(conn: &rusqlite::Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;

    // SQLite does not enforce foreign keys by default; every connection must
    // opt in, and clear-and-rebuild snapshot writes rely on cascade deletes.
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    conn.execute_batch(CREATE_TABLES)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().expect("in-memory db");
        run_migrations(&conn).expect("first migration");
        run_migrations(&conn).expect("second migration");
    }

    #[test]
    fn all_tables_exist_after_migration() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let expected = [
            "configs",
            "config_snapshots",
            "server_blocks",
            "block_sites",
            "block_fragments",
            "meta",
        ];
        for table in &expected {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    rusqlite::params![table],
                    |row| row.get(0),
                )
                .unwrap_or(0);
            assert_eq!(count, 1, "table '{table}' should exist");
        }
    }
}
