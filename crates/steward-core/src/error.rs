//! Error types for steward-core

use std::path::{Path, PathBuf};

/// Result type for steward-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in steward-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The imported document contained no server blocks
    #[error("No server blocks detected in Caddyfile")]
    EmptyCaddyfile,

    /// No Caddyfile could be located for import
    #[error("Unable to locate a Caddyfile to import")]
    CaddyfileNotFound,

    /// A text/JSON import required an existing configuration record
    #[error("Initialise the database with steward init before importing text")]
    NotInitialised,

    /// The source file is unreadable even via the privileged helper
    #[error("{0}")]
    PermissionDenied(String),

    /// The adaptation oracle rejected the configuration
    #[error("Adaptation failed: {0}")]
    Adapt(String),

    /// Writing a generated file failed, including the helper fallback
    #[error("Unable to write {path}: {detail}. {hint}")]
    InstallFailed {
        path: PathBuf,
        detail: String,
        hint: String,
    },

    // Transparent wrappers for underlying crate errors
    /// Configuration model error
    #[error(transparent)]
    Config(#[from] steward_config::Error),

    /// Store error
    #[error(transparent)]
    Store(#[from] steward_store::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Permission failure with an actionable hint for the operator.
    pub fn permission_denied(path: &Path, helper_command: Option<String>) -> Error {
        let mut message = format!(
            "Permission denied reading {}. Run the import with elevated permissions or copy the file to a readable location.",
            path.display()
        );
        let command = helper_command
            .unwrap_or_else(|| format!("sudo steward import --caddyfile {}", path.display()));
        message.push_str(&format!(" You can run: {command}"));
        Error::PermissionDenied(message)
    }
}
