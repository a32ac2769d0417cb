//! Application directory layout.

use std::path::PathBuf;

/// Resolved filesystem locations for the steward application.
///
/// Every location honors an environment override so tests and packaging can
/// relocate state without touching the settings file.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub app_dir: PathBuf,
    pub db_path: PathBuf,
    pub cache_dir: PathBuf,
    pub generated_caddyfile: PathBuf,
    pub generated_json: PathBuf,
}

impl AppPaths {
    /// Resolve paths from the environment.
    ///
    /// Overrides: `STEWARD_HOME`, `STEWARD_DB`, `STEWARD_GENERATED_CADDYFILE`,
    /// `STEWARD_GENERATED_JSON`.
    pub fn from_env() -> AppPaths {
        let app_dir = std::env::var_os("STEWARD_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".steward")
            });
        let db_path = std::env::var_os("STEWARD_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|| app_dir.join("steward.db"));
        let cache_dir = app_dir.join("cache");
        let generated_caddyfile = std::env::var_os("STEWARD_GENERATED_CADDYFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/etc/caddy/Caddyfile.generated"));
        let generated_json = std::env::var_os("STEWARD_GENERATED_JSON")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/etc/caddy/steward.json"));

        AppPaths {
            app_dir,
            db_path,
            cache_dir,
            generated_caddyfile,
            generated_json,
        }
    }

    /// Paths rooted at an explicit application directory (used by tests).
    pub fn rooted_at(app_dir: impl Into<PathBuf>) -> AppPaths {
        let app_dir = app_dir.into();
        AppPaths {
            db_path: app_dir.join("steward.db"),
            cache_dir: app_dir.join("cache"),
            generated_caddyfile: app_dir.join("Caddyfile.generated"),
            generated_json: app_dir.join("steward.json"),
            app_dir,
        }
    }

    /// Location of the TOML settings file.
    pub fn settings_path(&self) -> PathBuf {
        self.app_dir.join("settings.toml")
    }

    /// Ensure the application directory exists.
    pub fn ensure_app_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.app_dir)
    }

    /// Ensure the cache directory exists and return it.
    pub fn ensure_cache_dir(&self) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.cache_dir)?;
        Ok(self.cache_dir.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rooted_paths_stay_under_the_root() {
        let paths = AppPaths::rooted_at("/tmp/steward-test");
        assert!(paths.db_path.starts_with(&paths.app_dir));
        assert!(paths.cache_dir.starts_with(&paths.app_dir));
        assert!(paths.settings_path().starts_with(&paths.app_dir));
    }
}
