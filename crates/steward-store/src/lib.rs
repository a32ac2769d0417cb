//! Persistence layer for steward.
//!
//! Snapshots live in a SQLite database (configs → config_snapshots →
//! server_blocks → block_sites/block_fragments, plus a meta key/value
//! table); operator settings live in a TOML file under the application
//! directory. The engine never touches storage directly — orchestration
//! loads snapshot values from here and passes them in.

pub mod error;
pub mod io;
pub mod paths;
pub mod schema;
pub mod settings;
pub mod store;

pub use error::{Error, Result};
pub use io::{write_atomic, write_text_atomic};
pub use paths::AppPaths;
pub use schema::run_migrations;
pub use settings::Settings;
pub use store::{ConfigRecord, SnapshotStore, DEFAULT_CONFIG_NAME, META_APP_VERSION};
