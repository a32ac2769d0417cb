//! Error types for steward-caddy

/// Result type for steward-caddy operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving the caddy binary or admin API
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No caddy executable could be located
    #[error("Unable to locate caddy binary. Set STEWARD_CADDY_BIN.")]
    BinaryNotFound,

    /// A caddy subcommand exited non-zero; carries its stderr
    #[error("{0}")]
    Caddy(String),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// HTTP transport error from the admin endpoint
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
