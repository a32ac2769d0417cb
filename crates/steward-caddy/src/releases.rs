//! Release lookup and version comparison.

use std::time::Duration;

use semver::Version;
use serde::Serialize;
use serde_json::Value;

/// GitHub repository queried for release tags.
pub const DEFAULT_REPO: &str = "user/caddy-steward";

const RELEASE_TIMEOUT: Duration = Duration::from_secs(5);

/// Current vs. latest-known version.
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    pub current: String,
    pub latest: Option<String>,
    pub update_available: bool,
    pub source: String,
}

/// Query the GitHub releases API for the latest version tag.
///
/// Network or parse failures simply yield `None`; an update check must never
/// break the tool.
pub fn fetch_latest_version(repo: &str, timeout: Duration) -> Option<String> {
    let url = format!("https://api.github.com/repos/{repo}/releases/latest");
    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent("steward")
        .build()
        .ok()?;
    let payload: Value = client.get(url).send().ok()?.json().ok()?;
    let tag = payload
        .get("tag_name")
        .or_else(|| payload.get("name"))
        .and_then(Value::as_str)?;
    normalize_version(tag).map(|version| version.to_string())
}

/// Collect current/latest version info for the `version` command.
pub fn collect_version_info(current: &str, repo: Option<&str>) -> VersionInfo {
    let repository = repo
        .map(str::to_string)
        .or_else(|| std::env::var("STEWARD_REPO").ok())
        .unwrap_or_else(|| DEFAULT_REPO.to_string());
    let latest = fetch_latest_version(&repository, RELEASE_TIMEOUT);
    let update_available = match (normalize_version(current), latest.as_deref().and_then(normalize_version)) {
        (Some(current), Some(latest)) => latest > current,
        _ => false,
    };
    VersionInfo {
        current: current.to_string(),
        latest,
        update_available,
        source: repository,
    }
}

fn normalize_version(version: &str) -> Option<Version> {
    Version::parse(version.trim().trim_start_matches('v')).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_tags_may_carry_a_v_prefix() {
        assert_eq!(
            normalize_version("v1.2.3"),
            Some(Version::new(1, 2, 3))
        );
        assert_eq!(normalize_version("0.1.0"), Some(Version::new(0, 1, 0)));
        assert_eq!(normalize_version("not-a-version"), None);
    }

    #[test]
    fn newer_release_flags_an_update() {
        let newer = normalize_version("v0.2.0").unwrap();
        let current = normalize_version("0.1.0").unwrap();
        assert!(newer > current);
    }
}
