//! Version tracking.

use steward_caddy::{collect_version_info, VersionInfo};
use steward_store::{SnapshotStore, META_APP_VERSION};

use crate::error::Result;

/// The running crate version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Record the running version in the store's meta table.
pub fn store_current_version(store: &SnapshotStore) -> Result<()> {
    store.set_meta(META_APP_VERSION, APP_VERSION)?;
    Ok(())
}

/// The version recorded by the last invocation, if any.
pub fn stored_version(store: &SnapshotStore) -> Result<Option<String>> {
    Ok(store.get_meta(META_APP_VERSION)?)
}

/// Current and latest-known versions for the `version` command.
pub fn version_info(repo: Option<&str>) -> VersionInfo {
    collect_version_info(APP_VERSION, repo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_recorded_in_meta() {
        let store = SnapshotStore::open_in_memory().unwrap();
        assert_eq!(stored_version(&store).unwrap(), None);
        store_current_version(&store).unwrap();
        assert_eq!(stored_version(&store).unwrap().as_deref(), Some(APP_VERSION));
    }
}
