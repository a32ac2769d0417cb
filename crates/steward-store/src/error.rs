//! Error types for steward-store

/// Result type for steward-store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in steward-store operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A stored row could not be mapped back onto the model
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    /// Database error
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Settings file deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    /// Settings file serialization error
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
}
