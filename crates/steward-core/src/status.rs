//! Application status collection.
//!
//! Gathers everything the status surface reports: per-kind snapshot
//! availability and counts, pairwise comparisons, and live service state.
//! Every sub-step degrades to an error field instead of failing the whole
//! collection, because the status view must stay informative even when one
//! of the three sources is broken.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use steward_caddy::{
    check_service, fetch_live_status, HelperRunner, LiveStatus, ServiceState, ADMIN_TIMEOUT,
    DEFAULT_ADMIN_ENDPOINT,
};
use steward_config::{Snapshot, SourceKind};
use steward_engine::{compare_snapshots, AdaptationOracle, Comparison};
use steward_store::{AppPaths, Settings, SnapshotStore};

use crate::error::Error;
use crate::import::{import_caddy_json, import_caddyfile, import_caddyfile_text};

/// The three comparisons the status surface always reports.
pub const SNAPSHOT_PAIRINGS: [(SourceKind, SourceKind); 3] = [
    (SourceKind::Managed, SourceKind::Caddyfile),
    (SourceKind::Managed, SourceKind::Live),
    (SourceKind::Caddyfile, SourceKind::Live),
];

/// Availability and provenance of one stored snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotInfo {
    pub kind: SourceKind,
    pub label: String,
    pub available: bool,
    pub site_count: usize,
    pub block_count: usize,
    pub collected_at: Option<String>,
    pub source_path: Option<String>,
    pub source_hash: Option<String>,
    pub error: Option<String>,
}

impl SnapshotInfo {
    fn unavailable(kind: SourceKind) -> SnapshotInfo {
        SnapshotInfo {
            kind,
            label: kind.label().to_string(),
            available: false,
            site_count: 0,
            block_count: 0,
            collected_at: None,
            source_path: None,
            source_hash: None,
            error: None,
        }
    }
}

/// Live service health.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub state: String,
    pub detail: Option<String>,
    pub source: Option<String>,
    pub block_count: Option<usize>,
    pub error: Option<String>,
}

/// Everything the status surface reports.
#[derive(Debug)]
pub struct AppStatus {
    pub db_path: PathBuf,
    pub db_ready: bool,
    pub last_import_path: Option<String>,
    pub last_import_time: Option<String>,
    pub snapshots: Vec<SnapshotInfo>,
    pub comparisons: Vec<Comparison>,
    pub block_count: usize,
    pub service_status: Option<ServiceStatus>,
}

/// What to refresh before reporting.
#[derive(Debug, Clone)]
pub struct StatusOptions {
    /// Re-import the on-disk Caddyfile (and bootstrap a missing config).
    pub refresh_sources: bool,
    /// Re-fetch the live snapshot from the admin API.
    pub refresh_live: bool,
    /// Query the admin endpoint / service manager for health.
    pub check_service: bool,
}

impl Default for StatusOptions {
    fn default() -> Self {
        Self {
            refresh_sources: true,
            refresh_live: false,
            check_service: true,
        }
    }
}

/// Collect application status.
pub fn collect_app_status(
    paths: &AppPaths,
    settings: &Settings,
    oracle: &dyn AdaptationOracle,
    options: &StatusOptions,
) -> AppStatus {
    let db_path = paths.db_path.clone();
    let mut store = match SnapshotStore::open(&db_path) {
        Ok(store) => store,
        Err(err) => {
            tracing::warn!(path = %db_path.display(), error = %err, "unable to open snapshot store");
            return AppStatus {
                db_path,
                db_ready: false,
                last_import_path: None,
                last_import_time: None,
                snapshots: SourceKind::ALL.map(SnapshotInfo::unavailable).to_vec(),
                comparisons: Vec::new(),
                block_count: 0,
                service_status: None,
            };
        }
    };

    let endpoint = settings
        .admin_endpoint_override()
        .unwrap_or_else(|| DEFAULT_ADMIN_ENDPOINT.to_string());
    let live_api = if options.check_service {
        fetch_live_status(&endpoint, ADMIN_TIMEOUT)
    } else {
        None
    };

    let copier = HelperRunner::new(paths.cache_dir.clone());
    let mut refresh_errors: HashMap<SourceKind, String> = HashMap::new();
    let mut config = store.default_config().ok().flatten();

    if options.refresh_sources && config.is_none() {
        let hint = settings
            .caddyfile_path
            .clone()
            .or_else(|| settings.live_caddyfile.clone());
        match import_caddyfile(
            &mut store,
            oracle,
            &copier,
            hint.as_deref(),
            SourceKind::Managed,
            None,
        ) {
            Ok(_) => config = store.default_config().ok().flatten(),
            Err(Error::CaddyfileNotFound) => {
                refresh_errors.insert(
                    SourceKind::Managed,
                    "No Caddyfile found; run an import".to_string(),
                );
            }
            Err(err) => {
                refresh_errors.insert(SourceKind::Managed, err.to_string());
            }
        }
    }

    if options.refresh_sources {
        if let Some(path) = config.as_ref().and_then(|record| record.caddyfile_path.clone()) {
            if let Err(err) = import_caddyfile(
                &mut store,
                oracle,
                &copier,
                Some(Path::new(&path)),
                SourceKind::Caddyfile,
                Some(&[]),
            ) {
                refresh_errors.insert(SourceKind::Caddyfile, err.to_string());
            }
        }
    }

    if options.refresh_live {
        refresh_live(
            &mut store,
            oracle,
            &copier,
            live_api.as_ref(),
            settings,
            &endpoint,
            &mut refresh_errors,
        );
        config = store.default_config().ok().flatten();
    }

    let scrub_paths: Vec<String> = config
        .as_ref()
        .and_then(|record| record.caddyfile_path.as_deref())
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .map(|path| vec![path.to_string()])
        .unwrap_or_default();

    let mut snapshots = Vec::new();
    let mut comparisons = Vec::new();
    let mut block_count = 0;

    if let Some(record) = &config {
        let mut loaded: HashMap<SourceKind, Option<Snapshot>> = HashMap::new();
        for kind in SourceKind::ALL {
            let snapshot = store.load_snapshot(record.id, kind).ok().flatten();
            let info = match &snapshot {
                Some(snapshot) => SnapshotInfo {
                    kind,
                    label: kind.label().to_string(),
                    available: true,
                    site_count: snapshot.blocks.iter().map(|block| block.labels.len()).sum(),
                    block_count: snapshot.blocks.len(),
                    collected_at: Some(snapshot.collected_at.to_rfc3339()),
                    source_path: snapshot.source_path.clone(),
                    source_hash: snapshot.source_hash.clone(),
                    error: None,
                },
                None => SnapshotInfo::unavailable(kind),
            };
            if kind == SourceKind::Managed {
                block_count = info.block_count;
            }
            snapshots.push(info);
            loaded.insert(kind, snapshot);
        }

        for (left_kind, right_kind) in SNAPSHOT_PAIRINGS {
            comparisons.push(compare_snapshots(
                loaded.get(&left_kind).and_then(Option::as_ref),
                loaded.get(&right_kind).and_then(Option::as_ref),
                left_kind,
                right_kind,
                &scrub_paths,
                Some(oracle),
            ));
        }
    } else {
        snapshots.extend(SourceKind::ALL.map(SnapshotInfo::unavailable));
    }

    for info in &mut snapshots {
        if let Some(error) = refresh_errors.get(&info.kind) {
            info.error = Some(error.clone());
        }
    }

    let service_status = build_service_status(live_api, settings, &endpoint);

    AppStatus {
        db_path,
        db_ready: true,
        last_import_path: config.as_ref().and_then(|record| record.caddyfile_path.clone()),
        last_import_time: config.as_ref().and_then(|record| record.last_imported_at.clone()),
        snapshots,
        comparisons,
        block_count,
        service_status,
    }
}

/// Refresh only the live snapshot.
pub fn refresh_live_snapshot(
    paths: &AppPaths,
    settings: &Settings,
    oracle: &dyn AdaptationOracle,
) -> AppStatus {
    collect_app_status(
        paths,
        settings,
        oracle,
        &StatusOptions {
            refresh_sources: false,
            refresh_live: true,
            check_service: true,
        },
    )
}

fn refresh_live(
    store: &mut SnapshotStore,
    oracle: &dyn AdaptationOracle,
    copier: &HelperRunner,
    api: Option<&LiveStatus>,
    settings: &Settings,
    endpoint: &str,
    errors: &mut HashMap<SourceKind, String>,
) {
    if let Some(api) = api {
        if let Some(text) = &api.caddyfile_text {
            if let Err(err) = import_caddyfile_text(
                store,
                text,
                endpoint,
                SourceKind::Live,
                Some(&[]),
                false,
            ) {
                errors.insert(SourceKind::Live, err.to_string());
            }
            return;
        }
        if let Some(payload) = &api.json_payload {
            match serde_json::from_str(payload) {
                Ok(value) => {
                    if let Err(err) = import_caddy_json(
                        store,
                        &value,
                        endpoint,
                        SourceKind::Live,
                        Some(&[]),
                        false,
                    ) {
                        errors.insert(SourceKind::Live, err.to_string());
                    }
                }
                Err(err) => {
                    errors.insert(SourceKind::Live, err.to_string());
                }
            }
            return;
        }
    }

    match &settings.live_caddyfile {
        Some(path) => {
            if let Err(err) = import_caddyfile(
                store,
                oracle,
                copier,
                Some(path),
                SourceKind::Live,
                Some(&[]),
            ) {
                errors.insert(SourceKind::Live, err.to_string());
            }
        }
        None => {
            errors.insert(
                SourceKind::Live,
                "Live Caddyfile path not configured".to_string(),
            );
        }
    }
}

fn build_service_status(
    api: Option<LiveStatus>,
    settings: &Settings,
    endpoint: &str,
) -> Option<ServiceStatus> {
    if let Some(api) = api {
        return Some(ServiceStatus {
            state: api.state.as_str().to_string(),
            detail: Some(api.format),
            source: Some(endpoint.to_string()),
            block_count: api.block_count,
            error: api.error,
        });
    }
    settings.live_caddyfile.as_ref()?;
    let query = check_service(None);
    Some(match query.state {
        Some(raw) => ServiceStatus {
            state: ServiceState::normalize(&raw).as_str().to_string(),
            detail: Some(raw),
            source: query.command,
            block_count: None,
            error: query.error,
        },
        None => ServiceStatus {
            state: ServiceState::Unknown.as_str().to_string(),
            detail: None,
            source: query.command,
            block_count: None,
            error: query.error,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use steward_config::segment;
    use steward_engine::AdaptError;

    struct OfflineOracle;

    impl AdaptationOracle for OfflineOracle {
        fn adapt(&self, _path: &Path) -> Result<Value, AdaptError> {
            Ok(json!({"apps": {}}))
        }
    }

    fn seeded_paths(dir: &Path, text: &str) -> AppPaths {
        let paths = AppPaths::rooted_at(dir);
        let mut store = SnapshotStore::open(&paths.db_path).unwrap();
        let config = store.ensure_config(Some("/etc/caddy/Caddyfile")).unwrap();
        let snapshot = Snapshot::new(SourceKind::Managed, segment(text).unwrap());
        store.write_snapshot(config.id, &snapshot).unwrap();
        paths
    }

    #[test]
    fn status_reports_stored_snapshots_without_refreshing() {
        let dir = tempfile::tempdir().unwrap();
        let paths = seeded_paths(dir.path(), "a.example {\n  respond \"ok\"\n}\n");

        let status = collect_app_status(
            &paths,
            &Settings::default(),
            &OfflineOracle,
            &StatusOptions {
                refresh_sources: false,
                refresh_live: false,
                check_service: false,
            },
        );

        assert!(status.db_ready);
        assert_eq!(status.block_count, 1);
        assert_eq!(status.snapshots.len(), 3);
        let managed = status
            .snapshots
            .iter()
            .find(|info| info.kind == SourceKind::Managed)
            .unwrap();
        assert!(managed.available);
        assert_eq!(managed.site_count, 1);

        assert_eq!(status.comparisons.len(), SNAPSHOT_PAIRINGS.len());
        // Only the managed snapshot exists, so every pairing has a missing side.
        for comparison in &status.comparisons {
            assert_eq!(comparison.status.as_str(), "missing");
        }
    }

    #[test]
    fn status_survives_an_empty_database() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::rooted_at(dir.path());
        let status = collect_app_status(
            &paths,
            &Settings::default(),
            &OfflineOracle,
            &StatusOptions {
                refresh_sources: false,
                refresh_live: false,
                check_service: false,
            },
        );
        assert!(status.db_ready);
        assert!(status.snapshots.iter().all(|info| !info.available));
        assert!(status.comparisons.is_empty());
    }

    #[test]
    fn live_refresh_without_any_source_records_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let paths = seeded_paths(dir.path(), "a.example {\n}\n");
        let status = collect_app_status(
            &paths,
            &Settings::default(),
            &OfflineOracle,
            &StatusOptions {
                refresh_sources: false,
                refresh_live: true,
                check_service: false,
            },
        );
        let live = status
            .snapshots
            .iter()
            .find(|info| info.kind == SourceKind::Live)
            .unwrap();
        assert!(!live.available);
        assert_eq!(
            live.error.as_deref(),
            Some("Live Caddyfile path not configured")
        );
    }
}
