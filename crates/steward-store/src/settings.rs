//! TOML settings file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::io::write_text_atomic;

/// Operator-editable settings stored in `settings.toml` under the app dir.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Path of the hand-maintained Caddyfile to track.
    pub caddyfile_path: Option<PathBuf>,
    /// Fallback file read when the admin endpoint is unreachable.
    pub live_caddyfile: Option<PathBuf>,
    /// Admin API endpoint serving the live configuration.
    pub admin_endpoint: Option<String>,
    /// Explicit caddy binary path.
    pub caddy_bin: Option<PathBuf>,
    /// How reloads are issued: `caddy` (binary) or `helper` (service manager).
    pub reload_mode: Option<String>,
}

impl Settings {
    /// Load settings; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Settings> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Settings::default()),
            Err(err) => Err(err.into()),
        }
    }

    /// Persist settings atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        write_text_atomic(path, &content)?;
        Ok(())
    }

    /// Admin endpoint with the `STEWARD_ADMIN_ENDPOINT` override applied.
    pub fn admin_endpoint_override(&self) -> Option<String> {
        std::env::var("STEWARD_ADMIN_ENDPOINT")
            .ok()
            .or_else(|| self.admin_endpoint.clone())
    }
}
