//! External collaborators for steward: the caddy binary (adaptation oracle,
//! validation, reload), the admin API client, the privileged helper runner,
//! and release lookup.

pub mod admin;
pub mod error;
pub mod helper;
pub mod releases;
pub mod runner;

pub use admin::{
    fetch_live_status, LiveStatus, ServiceState, ADMIN_TIMEOUT, DEFAULT_ADMIN_ENDPOINT,
};
pub use error::{Error, Result};
pub use helper::{
    check_service, install_generated_file, reload_service, stage_config_copy, HelperOutcome,
    HelperRunner, ServiceQuery,
};
pub use releases::{collect_version_info, fetch_latest_version, VersionInfo, DEFAULT_REPO};
pub use runner::{CaddyRunner, ConfigFormat};
