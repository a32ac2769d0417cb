//! Drift between the stored configuration and a target Caddyfile.

use std::path::Path;

use steward_config::SourceKind;
use steward_engine::{compare_file, DriftReport, PrivilegedCopy};
use steward_store::SnapshotStore;

use crate::export::render_config_text;

/// Compare the managed snapshot with the file at `target_path`.
///
/// Render failures are reported in the drift result rather than raised, so
/// the status view stays usable when the store is broken.
pub fn compare_caddyfile(
    store: &SnapshotStore,
    target_path: &Path,
    copier: &dyn PrivilegedCopy,
) -> DriftReport {
    let generated = match render_config_text(store, SourceKind::Managed) {
        Ok(text) => text,
        Err(err) => {
            return DriftReport {
                target_path: target_path.to_path_buf(),
                in_sync: None,
                generated_hash: None,
                target_hash: None,
                diff: None,
                error: Some(format!("Failed to render stored configuration: {err}")),
            };
        }
    };
    compare_file(&generated, target_path, copier)
}
