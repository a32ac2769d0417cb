//! Error types for the steward CLI

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to the terminal
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Status was asked to compare but no target file is known
    #[error("Specify --caddyfile or run an import so the tool knows which file to compare")]
    NoComparisonTarget,

    /// A drift comparison could not be carried out
    #[error("{0}")]
    Drift(String),

    /// Reloading the service through the helper failed
    #[error("Service reload failed: {0}")]
    Reload(String),

    /// Core orchestration error
    #[error(transparent)]
    Core(#[from] steward_core::Error),

    /// Caddy integration error
    #[error(transparent)]
    Caddy(#[from] steward_caddy::Error),

    /// Store error
    #[error(transparent)]
    Store(#[from] steward_store::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
