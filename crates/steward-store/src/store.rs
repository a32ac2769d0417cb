//! Snapshot persistence.
//!
//! Snapshots are stored relationally: configs → config_snapshots →
//! server_blocks → block_sites/block_fragments. A configuration owns at most
//! one snapshot per source kind; re-ingesting a kind replaces its rows
//! wholesale inside one transaction (clear-and-rebuild, not incremental
//! patching).

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use steward_config::{Block, Fragment, FragmentKind, SiteAddress, Snapshot, SourceKind};

use crate::error::{Error, Result};
use crate::schema::run_migrations;

/// Name of the single configuration record the tool manages.
pub const DEFAULT_CONFIG_NAME: &str = "default";

/// Meta key recording the crate version that last touched the database.
pub const META_APP_VERSION: &str = "app_version";

/// One row of the `configs` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRecord {
    pub id: i64,
    pub name: String,
    pub caddyfile_path: Option<String>,
    pub last_imported_at: Option<String>,
    pub last_exported_at: Option<String>,
    pub last_caddyfile_hash: Option<String>,
}

/// SQLite-backed snapshot store.
pub struct SnapshotStore {
    conn: Connection,
}

impl SnapshotStore {
    /// Open (creating and migrating as needed) the database at `path`.
    pub fn open(path: &Path) -> Result<SnapshotStore> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        run_migrations(&conn)?;
        Ok(SnapshotStore { conn })
    }

    /// Open an in-memory store, used by tests.
    pub fn open_in_memory() -> Result<SnapshotStore> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(SnapshotStore { conn })
    }

    /// The default configuration record, if one exists.
    pub fn default_config(&self) -> Result<Option<ConfigRecord>> {
        self.conn
            .query_row(
                "SELECT id, name, caddyfile_path, last_imported_at, last_exported_at,
                        last_caddyfile_hash
                   FROM configs
                  WHERE name = ?1",
                params![DEFAULT_CONFIG_NAME],
                row_to_config,
            )
            .optional()
            .map_err(Error::from)
    }

    /// Fetch the default configuration record, creating it when missing.
    /// A `Some` path also updates the stored Caddyfile path.
    pub fn ensure_config(&self, caddyfile_path: Option<&str>) -> Result<ConfigRecord> {
        match self.default_config()? {
            Some(record) => {
                if let Some(path) = caddyfile_path {
                    self.conn.execute(
                        "UPDATE configs SET caddyfile_path = ?2 WHERE id = ?1",
                        params![record.id, path],
                    )?;
                    return self
                        .default_config()?
                        .ok_or_else(|| Error::InvalidData("config vanished".to_string()));
                }
                Ok(record)
            }
            None => {
                self.conn.execute(
                    "INSERT INTO configs (name, caddyfile_path) VALUES (?1, ?2)",
                    params![DEFAULT_CONFIG_NAME, caddyfile_path],
                )?;
                self.default_config()?
                    .ok_or_else(|| Error::InvalidData("config vanished".to_string()))
            }
        }
    }

    /// Record a completed import of the managed snapshot.
    pub fn record_import(&self, config_id: i64, timestamp: &str, hash: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE configs SET last_imported_at = ?2, last_caddyfile_hash = ?3 WHERE id = ?1",
            params![config_id, timestamp, hash],
        )?;
        Ok(())
    }

    /// Record a completed export/generation.
    pub fn record_export(&self, config_id: i64, timestamp: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE configs SET last_exported_at = ?2 WHERE id = ?1",
            params![config_id, timestamp],
        )?;
        Ok(())
    }

    /// Replace the stored snapshot for `snapshot.kind` wholesale.
    pub fn write_snapshot(&mut self, config_id: i64, snapshot: &Snapshot) -> Result<()> {
        tracing::debug!(
            kind = snapshot.kind.as_str(),
            blocks = snapshot.blocks.len(),
            "replacing stored snapshot"
        );
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM config_snapshots WHERE config_id = ?1 AND source_kind = ?2",
            params![config_id, snapshot.kind.as_str()],
        )?;
        tx.execute(
            "INSERT INTO config_snapshots
                (config_id, source_kind, source_path, source_hash, collected_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                config_id,
                snapshot.kind.as_str(),
                snapshot.source_path,
                snapshot.source_hash,
                snapshot.collected_at.to_rfc3339(),
            ],
        )?;
        let snapshot_id = tx.last_insert_rowid();

        for (block_index, block) in snapshot.blocks.iter().enumerate() {
            tx.execute(
                "INSERT INTO server_blocks (snapshot_id, block_index, is_global, prelude, postlude)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    snapshot_id,
                    block_index as i64,
                    block.is_global as i64,
                    block.prelude,
                    block.postlude,
                ],
            )?;
            let block_id = tx.last_insert_rowid();

            for (label_index, label) in block.labels.iter().enumerate() {
                let site = SiteAddress::parse(label);
                tx.execute(
                    "INSERT INTO block_sites
                        (block_id, raw_label, host, port, scheme, is_ipv6, is_wildcard, label_index)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        block_id,
                        site.raw,
                        site.host,
                        site.port,
                        site.scheme,
                        site.is_ipv6 as i64,
                        site.is_wildcard as i64,
                        label_index as i64,
                    ],
                )?;
            }

            for (fragment_index, fragment) in block.fragments.iter().enumerate() {
                tx.execute(
                    "INSERT INTO block_fragments (block_id, fragment_index, kind, content)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        block_id,
                        fragment_index as i64,
                        fragment.kind.as_str(),
                        fragment.content,
                    ],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Load the stored snapshot of a source kind, if present.
    pub fn load_snapshot(&self, config_id: i64, kind: SourceKind) -> Result<Option<Snapshot>> {
        let header = self
            .conn
            .query_row(
                "SELECT id, source_path, source_hash, collected_at
                   FROM config_snapshots
                  WHERE config_id = ?1 AND source_kind = ?2",
                params![config_id, kind.as_str()],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((snapshot_id, source_path, source_hash, collected_at)) = header else {
            return Ok(None);
        };

        let collected_at = DateTime::parse_from_rfc3339(&collected_at)
            .map(|stamp| stamp.with_timezone(&Utc))
            .map_err(|err| Error::InvalidData(format!("bad collected_at: {err}")))?;

        let mut stmt = self.conn.prepare(
            "SELECT id, is_global, prelude, postlude
               FROM server_blocks
              WHERE snapshot_id = ?1
              ORDER BY block_index ASC",
        )?;
        let rows: Vec<(i64, bool, String, String)> = stmt
            .query_map(params![snapshot_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)? != 0,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut blocks = Vec::with_capacity(rows.len());
        for (block_id, is_global, prelude, postlude) in rows {
            blocks.push(Block {
                labels: self.block_labels(block_id)?,
                is_global,
                prelude,
                postlude,
                fragments: self.block_fragments(block_id)?,
            });
        }

        Ok(Some(Snapshot {
            kind,
            source_path,
            source_hash,
            collected_at,
            blocks,
        }))
    }

    /// `(block_count, site_count)` for a stored snapshot, if present.
    pub fn snapshot_counts(
        &self,
        config_id: i64,
        kind: SourceKind,
    ) -> Result<Option<(usize, usize)>> {
        let counts = self
            .conn
            .query_row(
                "SELECT
                    (SELECT COUNT(*) FROM server_blocks b WHERE b.snapshot_id = s.id),
                    (SELECT COUNT(*) FROM block_sites site
                       JOIN server_blocks b ON site.block_id = b.id
                      WHERE b.snapshot_id = s.id)
                   FROM config_snapshots s
                  WHERE s.config_id = ?1 AND s.source_kind = ?2",
                params![config_id, kind.as_str()],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;
        Ok(counts.map(|(blocks, sites)| (blocks as usize, sites as usize)))
    }

    /// Delete the stored snapshot of a source kind, if present.
    pub fn delete_snapshot(&self, config_id: i64, kind: SourceKind) -> Result<()> {
        self.conn.execute(
            "DELETE FROM config_snapshots WHERE config_id = ?1 AND source_kind = ?2",
            params![config_id, kind.as_str()],
        )?;
        Ok(())
    }

    /// Store a meta key/value pair.
    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO meta (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT (key) DO UPDATE SET value = ?2, updated_at = ?3",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Look up a meta value.
    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM meta WHERE key = ?1",
                params![key],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()
            .map(Option::flatten)
            .map_err(Error::from)
    }

    fn block_labels(&self, block_id: i64) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT raw_label FROM block_sites WHERE block_id = ?1 ORDER BY label_index ASC",
        )?;
        let labels = stmt
            .query_map(params![block_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(labels)
    }

    fn block_fragments(&self, block_id: i64) -> Result<Vec<Fragment>> {
        let mut stmt = self.conn.prepare(
            "SELECT kind, content FROM block_fragments
              WHERE block_id = ?1
              ORDER BY fragment_index ASC",
        )?;
        let rows = stmt
            .query_map(params![block_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut fragments = Vec::with_capacity(rows.len());
        for (kind, content) in rows {
            let kind = FragmentKind::parse(&kind)
                .ok_or_else(|| Error::InvalidData(format!("unknown fragment kind '{kind}'")))?;
            fragments.push(Fragment { kind, content });
        }
        Ok(fragments)
    }
}

fn row_to_config(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConfigRecord> {
    Ok(ConfigRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        caddyfile_path: row.get(2)?,
        last_imported_at: row.get(3)?,
        last_exported_at: row.get(4)?,
        last_caddyfile_hash: row.get(5)?,
    })
}
