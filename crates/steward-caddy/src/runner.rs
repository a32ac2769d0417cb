//! Invoking the caddy binary for adapt/validate/reload.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;

use steward_engine::{AdaptError, AdaptationOracle};

use crate::error::{Error, Result};

/// Configuration syntax accepted by the caddy binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Caddyfile,
    Json,
}

impl ConfigFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigFormat::Caddyfile => "caddyfile",
            ConfigFormat::Json => "json",
        }
    }
}

/// Thin wrapper around the caddy executable.
///
/// Resolution order: explicit override, `STEWARD_CADDY_BIN`, then a `PATH`
/// search. Each invocation is a single synchronous subprocess call; a
/// non-zero exit surfaces the binary's stderr as the error message.
#[derive(Debug, Clone, Default)]
pub struct CaddyRunner {
    bin: Option<PathBuf>,
}

impl CaddyRunner {
    pub fn new(bin: Option<PathBuf>) -> Self {
        Self { bin }
    }

    /// Build a runner honoring the `STEWARD_CADDY_BIN` override.
    pub fn from_env() -> Self {
        Self {
            bin: std::env::var_os("STEWARD_CADDY_BIN").map(PathBuf::from),
        }
    }

    fn resolve_bin(&self) -> Result<PathBuf> {
        if let Some(bin) = &self.bin {
            return Ok(bin.clone());
        }
        find_in_path("caddy").ok_or(Error::BinaryNotFound)
    }

    /// Convert Caddyfile text to its JSON document form (the adaptation
    /// oracle used by the reconciliation engine).
    pub fn adapt_config(&self, config: &Path) -> Result<Value> {
        let stdout = self.run(&[
            "adapt",
            "--config",
            &config.display().to_string(),
            "--adapter",
            "caddyfile",
            "--pretty",
        ])?;
        Ok(serde_json::from_str(&stdout)?)
    }

    /// Validate a configuration file without loading it.
    pub fn validate(&self, config: &Path, format: ConfigFormat) -> Result<()> {
        let config = config.display().to_string();
        let mut args = vec!["validate", "--config", config.as_str()];
        if format == ConfigFormat::Caddyfile {
            args.extend(["--adapter", "caddyfile"]);
        }
        self.run(&args)?;
        Ok(())
    }

    /// Reload the running server with a configuration file.
    pub fn reload(&self, config: &Path, format: ConfigFormat) -> Result<()> {
        let config = config.display().to_string();
        let mut args = vec!["reload", "--config", config.as_str()];
        args.extend(["--adapter", format.as_str()]);
        self.run(&args)?;
        Ok(())
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let bin = self.resolve_bin()?;
        tracing::debug!(bin = %bin.display(), ?args, "invoking caddy");
        let output = Command::new(&bin).args(args).output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("caddy {} failed", args.first().unwrap_or(&""))
            } else {
                stderr
            };
            return Err(Error::Caddy(message));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl AdaptationOracle for CaddyRunner {
    fn adapt(&self, path: &Path) -> std::result::Result<Value, AdaptError> {
        self.adapt_config(path)
            .map_err(|err| AdaptError::new(err.to_string()))
    }
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}
