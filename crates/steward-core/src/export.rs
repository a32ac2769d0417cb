//! Rendering and generating configuration files from the store.

use std::path::{Path, PathBuf};

use chrono::Utc;

use steward_caddy::install_generated_file;
use steward_config::{Block, SourceKind};
use steward_store::{write_text_atomic, AppPaths, SnapshotStore};

use crate::error::{Error, Result};

/// Render the stored snapshot of a source kind back to Caddyfile text.
///
/// Blocks without fragments (created through the block editor with labels
/// only) are synthesized with a placeholder body. Returns an empty string
/// when no configuration or snapshot exists.
pub fn render_config_text(store: &SnapshotStore, kind: SourceKind) -> Result<String> {
    let Some(config) = store.default_config()? else {
        return Ok(String::new());
    };
    let Some(snapshot) = store.load_snapshot(config.id, kind)? else {
        return Ok(String::new());
    };

    let mut out = String::new();
    for block in &snapshot.blocks {
        out.push_str(&block.prelude);
        if block.fragments.is_empty() && !block.labels.is_empty() {
            out.push_str(&synthesize_block(block));
        } else {
            for fragment in &block.fragments {
                out.push_str(&fragment.content);
            }
        }
        out.push_str(&block.postlude);
    }
    Ok(out)
}

fn synthesize_block(block: &Block) -> String {
    let labels = block.labels.join(", ");
    let header = if labels.is_empty() {
        "{\n".to_string()
    } else {
        format!("{labels} {{\n")
    };
    format!("{header}    respond \"steward placeholder\"\n}}\n")
}

/// Generate a Caddyfile from the managed snapshot and write it to `target`.
///
/// Falls back to staging under the cache directory and installing through
/// the privileged helper when the direct write is denied.
pub fn generate_caddyfile(
    store: &SnapshotStore,
    paths: &AppPaths,
    target: &Path,
    kind: SourceKind,
) -> Result<PathBuf> {
    let text = render_config_text(store, kind)?;

    match write_text_atomic(target, &text) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
            tracing::debug!(path = %target.display(), "direct write denied, installing via helper");
            let staged_dir = paths.ensure_cache_dir()?.join("generated");
            std::fs::create_dir_all(&staged_dir)?;
            let staged = staged_dir.join(target.file_name().unwrap_or_default());
            write_text_atomic(&staged, &text)?;

            let outcome = install_generated_file(&staged, target, 0o644);
            if !outcome.success {
                return Err(Error::InstallFailed {
                    path: target.to_path_buf(),
                    detail: outcome
                        .error
                        .unwrap_or_else(|| "Helper install failed".to_string()),
                    hint: outcome
                        .command
                        .map(|command| format!("Run: {command}"))
                        .unwrap_or_else(|| "Run helper install manually".to_string()),
                });
            }
        }
        Err(err) => return Err(err.into()),
    }

    if let Some(config) = store.default_config()? {
        store.record_export(config.id, &Utc::now().to_rfc3339())?;
    }
    Ok(target.to_path_buf())
}
