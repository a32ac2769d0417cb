//! Orchestration layer for steward.
//!
//! Wires the reconciliation engine to its collaborators: the snapshot store,
//! the caddy binary (adaptation oracle), the admin API, and the privileged
//! helper. Importing, exporting, status collection, block editing, and
//! version tracking all live here; the engine itself stays a pure library.

pub mod drift;
pub mod edit;
pub mod error;
pub mod export;
pub mod import;
pub mod status;
pub mod version;

pub use drift::compare_caddyfile;
pub use edit::{load_managed_blocks, save_managed_blocks, EDITOR_SOURCE_LABEL};
pub use error::{Error, Result};
pub use export::{generate_caddyfile, render_config_text};
pub use import::{
    candidate_paths, find_caddyfile, import_caddy_json, import_caddyfile, import_caddyfile_text,
    summarize_block_labels, ImportSummary, DEFAULT_CADDYFILE_PATHS,
};
pub use status::{
    collect_app_status, refresh_live_snapshot, AppStatus, ServiceStatus, SnapshotInfo,
    StatusOptions, SNAPSHOT_PAIRINGS,
};
pub use version::{store_current_version, stored_version, version_info, APP_VERSION};
