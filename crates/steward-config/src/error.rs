//! Error types for steward-config

/// Result type for steward-config operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing or normalizing configuration
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The Caddyfile text could not be segmented into blocks
    #[error("Unbalanced braces in Caddyfile")]
    UnbalancedBraces,

    /// A single-block edit supplied text with the wrong number of blocks
    #[error("Expected exactly one server block, found {count}")]
    NotSingleBlock { count: usize },

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
