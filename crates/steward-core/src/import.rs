//! Importing Caddy configuration into the store.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::Value;

use steward_config::{blocks_from_caddy_json, segment, Block, Snapshot, SourceKind};
use steward_engine::{sha256_hex, AdaptationOracle, PrivilegedCopy};
use steward_store::{ConfigRecord, SnapshotStore};

use crate::error::{Error, Result};

/// Well-known Caddyfile locations, searched when no path is given.
pub const DEFAULT_CADDYFILE_PATHS: [&str; 4] = [
    "/etc/caddy/Caddyfile",
    "/usr/local/etc/caddy/Caddyfile",
    "/etc/Caddyfile",
    "./Caddyfile",
];

const MAX_PARENT_SEARCH_DEPTH: usize = 5;

/// Result of a completed import.
#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub source_path: PathBuf,
    /// One label string per block, `"(global options)"` for label-less blocks.
    pub site_labels: Vec<String>,
    pub site_count: usize,
    pub snapshot_kind: SourceKind,
    pub mirrored_snapshots: Vec<SourceKind>,
}

/// Nearby paths that might hold a Caddyfile, given an explicit hint.
pub fn candidate_paths(explicit: &Path) -> Vec<PathBuf> {
    fn add(candidate: PathBuf, candidates: &mut Vec<PathBuf>) {
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }

    let mut candidates: Vec<PathBuf> = Vec::new();
    add(explicit.to_path_buf(), &mut candidates);

    let name_is_caddyfile = explicit
        .file_name()
        .map(|name| name.to_string_lossy().eq_ignore_ascii_case("caddyfile"))
        .unwrap_or(false);
    if !name_is_caddyfile {
        add(explicit.with_file_name("Caddyfile"), &mut candidates);
    }
    add(explicit.join("Caddyfile"), &mut candidates);

    let mut current = explicit.parent();
    for _ in 0..MAX_PARENT_SEARCH_DEPTH {
        let Some(dir) = current else { break };
        add(dir.join("Caddyfile"), &mut candidates);
        current = dir.parent();
    }

    candidates
}

/// Locate a Caddyfile to import.
///
/// An explicit hint is expanded to nearby candidates; otherwise the default
/// locations are tried in order.
pub fn find_caddyfile(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(explicit) = explicit {
        if let Some(found) = candidate_paths(explicit)
            .into_iter()
            .find(|candidate| candidate.is_file())
        {
            return Ok(found);
        }
    }
    for candidate in DEFAULT_CADDYFILE_PATHS {
        let candidate = PathBuf::from(candidate);
        if candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(Error::CaddyfileNotFound)
}

/// Import a Caddyfile from disk.
///
/// The file is validated through the adaptation oracle before anything is
/// written. Unreadable files go through the privileged-copy collaborator;
/// when that also fails the error carries a suggested elevated command.
/// Importing the managed kind mirrors to the on-disk kind unless an explicit
/// mirror list is given.
pub fn import_caddyfile(
    store: &mut SnapshotStore,
    oracle: &dyn AdaptationOracle,
    copier: &dyn PrivilegedCopy,
    path: Option<&Path>,
    target: SourceKind,
    mirror_to: Option<&[SourceKind]>,
) -> Result<ImportSummary> {
    let source = find_caddyfile(path)?;
    let (readable, text) = read_accessible(&source, copier)?;

    // Validation only; the adapted document is discarded.
    oracle
        .adapt(&readable)
        .map_err(|err| Error::Adapt(err.message))?;

    let blocks = segment(&text)?;
    if blocks.is_empty() {
        return Err(Error::EmptyCaddyfile);
    }

    let digest = sha256_hex(text.as_bytes());
    let collected_at = Utc::now();
    let labels = summarize_block_labels(&blocks);
    let kinds = unique_kinds(target, mirror_to);

    let config = store.ensure_config(Some(&source.display().to_string()))?;
    if target == SourceKind::Managed {
        store.record_import(config.id, &collected_at.to_rfc3339(), &digest)?;
    }
    write_snapshots(
        store,
        &config,
        &kinds,
        &blocks,
        &source.display().to_string(),
        &digest,
        collected_at,
    )?;

    Ok(ImportSummary {
        source_path: source,
        site_count: labels.len(),
        site_labels: labels,
        snapshot_kind: target,
        mirrored_snapshots: kinds.into_iter().filter(|kind| *kind != target).collect(),
    })
}

/// Import Caddyfile content already held in memory (admin API refresh,
/// editor save).
pub fn import_caddyfile_text(
    store: &mut SnapshotStore,
    text: &str,
    source_label: &str,
    target: SourceKind,
    mirror_to: Option<&[SourceKind]>,
    require_config: bool,
) -> Result<ImportSummary> {
    let blocks = segment(text)?;
    if blocks.is_empty() {
        return Err(Error::EmptyCaddyfile);
    }

    let digest = sha256_hex(text.as_bytes());
    let collected_at = Utc::now();
    let labels = summarize_block_labels(&blocks);
    let kinds = unique_kinds(target, mirror_to);

    let config = existing_or_new_config(store, require_config, source_label)?;
    write_snapshots(store, &config, &kinds, &blocks, source_label, &digest, collected_at)?;

    Ok(ImportSummary {
        source_path: PathBuf::from(source_label),
        site_count: labels.len(),
        site_labels: labels,
        snapshot_kind: target,
        mirrored_snapshots: kinds.into_iter().filter(|kind| *kind != target).collect(),
    })
}

/// Import a Caddy JSON payload (the admin API's native shape).
pub fn import_caddy_json(
    store: &mut SnapshotStore,
    payload: &Value,
    source_label: &str,
    target: SourceKind,
    mirror_to: Option<&[SourceKind]>,
    require_config: bool,
) -> Result<ImportSummary> {
    let blocks = blocks_from_caddy_json(payload);
    let normalized = serde_json::to_string(payload)?;
    let digest = sha256_hex(normalized.as_bytes());
    let collected_at = Utc::now();
    let labels = summarize_block_labels(&blocks);
    let kinds = unique_kinds(target, mirror_to);

    let config = existing_or_new_config(store, require_config, source_label)?;
    write_snapshots(store, &config, &kinds, &blocks, source_label, &digest, collected_at)?;

    Ok(ImportSummary {
        source_path: PathBuf::from(source_label),
        site_count: labels.len(),
        site_labels: labels,
        snapshot_kind: target,
        mirrored_snapshots: kinds.into_iter().filter(|kind| *kind != target).collect(),
    })
}

fn read_accessible(source: &Path, copier: &dyn PrivilegedCopy) -> Result<(PathBuf, String)> {
    match std::fs::read_to_string(source) {
        Ok(text) => Ok((source.to_path_buf(), text)),
        Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
            tracing::debug!(path = %source.display(), "permission denied, staging a copy");
            let staged = copier.stage_copy(source);
            match staged.staged {
                Some(staged_path) => {
                    let text = std::fs::read_to_string(&staged_path)?;
                    Ok((staged_path, text))
                }
                None => Err(Error::permission_denied(source, staged.command)),
            }
        }
        Err(err) => Err(err.into()),
    }
}

fn existing_or_new_config(
    store: &SnapshotStore,
    require_config: bool,
    source_label: &str,
) -> Result<ConfigRecord> {
    match store.default_config()? {
        Some(config) => Ok(config),
        None if require_config => Err(Error::NotInitialised),
        None => Ok(store.ensure_config(Some(source_label))?),
    }
}

fn write_snapshots(
    store: &mut SnapshotStore,
    config: &ConfigRecord,
    kinds: &[SourceKind],
    blocks: &[Block],
    source_path: &str,
    source_hash: &str,
    collected_at: chrono::DateTime<Utc>,
) -> Result<()> {
    for kind in kinds {
        let snapshot = Snapshot {
            kind: *kind,
            source_path: Some(source_path.to_string()),
            source_hash: Some(source_hash.to_string()),
            collected_at,
            blocks: blocks.to_vec(),
        };
        store.write_snapshot(config.id, &snapshot)?;
    }
    Ok(())
}

/// One display label per block.
pub fn summarize_block_labels(blocks: &[Block]) -> Vec<String> {
    blocks
        .iter()
        .map(|block| {
            if block.labels.is_empty() {
                "(global options)".to_string()
            } else {
                block.labels.join(", ")
            }
        })
        .collect()
}

/// Importing the managed kind mirrors to the on-disk kind by default.
fn unique_kinds(target: SourceKind, mirror_to: Option<&[SourceKind]>) -> Vec<SourceKind> {
    let requested: Vec<SourceKind> = match mirror_to {
        None if target == SourceKind::Managed => {
            vec![SourceKind::Managed, SourceKind::Caddyfile]
        }
        None => vec![target],
        Some(mirror) => {
            let mut kinds = vec![target];
            kinds.extend_from_slice(mirror);
            kinds
        }
    };
    let mut unique = Vec::new();
    for kind in requested {
        if !unique.contains(&kind) {
            unique.push(kind);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use serde_json::json;
    use steward_engine::{AdaptError, NoPrivilegedCopy};

    struct AcceptingOracle;

    impl AdaptationOracle for AcceptingOracle {
        fn adapt(&self, _path: &Path) -> std::result::Result<Value, AdaptError> {
            Ok(json!({"apps": {}}))
        }
    }

    struct RejectingOracle;

    impl AdaptationOracle for RejectingOracle {
        fn adapt(&self, _path: &Path) -> std::result::Result<Value, AdaptError> {
            Err(AdaptError::new("syntax error"))
        }
    }

    #[test]
    fn candidate_paths_cover_nearby_locations() {
        let candidates = candidate_paths(Path::new("/srv/site/config/caddy.conf"));
        assert_eq!(candidates[0], PathBuf::from("/srv/site/config/caddy.conf"));
        assert!(candidates.contains(&PathBuf::from("/srv/site/config/Caddyfile")));
        assert!(candidates.contains(&PathBuf::from("/srv/site/Caddyfile")));
        assert!(candidates.contains(&PathBuf::from("/srv/Caddyfile")));
    }

    #[test]
    fn managed_import_mirrors_to_the_caddyfile_kind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Caddyfile");
        std::fs::write(&path, "a.example {\n  respond \"ok\"\n}\n").unwrap();

        let mut store = SnapshotStore::open_in_memory().unwrap();
        let summary = import_caddyfile(
            &mut store,
            &AcceptingOracle,
            &NoPrivilegedCopy,
            Some(&path),
            SourceKind::Managed,
            None,
        )
        .unwrap();

        assert_eq!(summary.site_labels, vec!["a.example".to_string()]);
        assert_eq!(summary.mirrored_snapshots, vec![SourceKind::Caddyfile]);

        let config = store.default_config().unwrap().unwrap();
        assert!(config.last_imported_at.is_some());
        assert!(store
            .load_snapshot(config.id, SourceKind::Managed)
            .unwrap()
            .is_some());
        assert!(store
            .load_snapshot(config.id, SourceKind::Caddyfile)
            .unwrap()
            .is_some());
    }

    #[test]
    fn rejected_configuration_is_not_stored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Caddyfile");
        std::fs::write(&path, "a.example {\n").unwrap();

        let mut store = SnapshotStore::open_in_memory().unwrap();
        let err = import_caddyfile(
            &mut store,
            &RejectingOracle,
            &NoPrivilegedCopy,
            Some(&path),
            SourceKind::Managed,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Adapt(_)));
        assert!(store.default_config().unwrap().is_none());
    }

    #[test]
    fn text_import_requires_config_when_asked() {
        let mut store = SnapshotStore::open_in_memory().unwrap();
        let err = import_caddyfile_text(
            &mut store,
            "a.example {\n}\n",
            "caddy-admin",
            SourceKind::Live,
            Some(&[]),
            true,
        )
        .unwrap_err();
        assert!(matches!(err, Error::NotInitialised));
    }

    #[test]
    fn json_import_stores_one_block_per_route() {
        let mut store = SnapshotStore::open_in_memory().unwrap();
        let payload = json!({
            "apps": {"http": {"servers": {
                "srv0": {"routes": [
                    {"match": [{"host": ["a.example"]}]},
                    {"match": [{"host": ["b.example"]}]}
                ]}
            }}}
        });
        let summary = import_caddy_json(
            &mut store,
            &payload,
            "caddy-admin",
            SourceKind::Live,
            Some(&[]),
            false,
        )
        .unwrap();
        assert_eq!(summary.site_count, 2);

        let config = store.default_config().unwrap().unwrap();
        let snapshot = store
            .load_snapshot(config.id, SourceKind::Live)
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.blocks.len(), 2);
    }

    #[test]
    fn empty_text_is_rejected() {
        let mut store = SnapshotStore::open_in_memory().unwrap();
        let err = import_caddyfile_text(
            &mut store,
            "",
            "editor",
            SourceKind::Managed,
            Some(&[]),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, Error::EmptyCaddyfile));
    }
}
