//! Cross-format adaptation.
//!
//! Text-origin snapshots are bridged onto the route-keyed representation by
//! reconstructing their full text, handing it to an external adaptation
//! oracle (in production: `caddy adapt`), and re-normalizing the resulting
//! JSON document. Oracle failure is non-fatal: callers fall back to literal
//! structural hashing.

use std::io::Write;
use std::path::Path;

use serde_json::Value;
use tempfile::NamedTempFile;

use steward_config::{blocks_from_caddy_json, Snapshot};

use crate::digest::normalize_route_json;

/// Failure reported by an adaptation oracle.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct AdaptError {
    pub message: String,
}

impl AdaptError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// External converter from Caddyfile syntax to the JSON document shape.
///
/// Treated as a black box: any validator that performs this conversion
/// satisfies the contract. The call is synchronous and fail-fast; callers
/// impose their own timeouts if needed.
pub trait AdaptationOracle {
    fn adapt(&self, path: &Path) -> Result<Value, AdaptError>;
}

impl<T: AdaptationOracle + ?Sized> AdaptationOracle for &T {
    fn adapt(&self, path: &Path) -> Result<Value, AdaptError> {
        (**self).adapt(path)
    }
}

/// Adapt a text-origin snapshot and return `(canonical key, normalized route
/// payload)` entries in adapter output order.
///
/// The temp file the oracle reads is added to the scrub path set so its own
/// path cannot leak into digests through `file_server` hide lists.
pub fn adapted_route_entries(
    snapshot: &Snapshot,
    scrub_paths: &[String],
    oracle: &dyn AdaptationOracle,
) -> Result<Vec<(Vec<String>, String)>, AdaptError> {
    let text = snapshot.text();
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut staged = NamedTempFile::new()
        .map_err(|err| AdaptError::new(format!("unable to stage config text: {err}")))?;
    staged
        .write_all(text.as_bytes())
        .map_err(|err| AdaptError::new(format!("unable to stage config text: {err}")))?;
    staged
        .flush()
        .map_err(|err| AdaptError::new(format!("unable to stage config text: {err}")))?;

    let adapted = oracle.adapt(staged.path())?;

    let mut scrub: Vec<String> = scrub_paths.to_vec();
    scrub.push(staged.path().display().to_string());

    let mut entries = Vec::new();
    for block in blocks_from_caddy_json(&adapted) {
        let Some(fragment) = block.first_json_route() else {
            continue;
        };
        if let Some(normalized) = normalize_route_json(&fragment.content, &scrub) {
            entries.push((block.canonical_key(), normalized));
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use steward_config::{segment, SourceKind};

    struct FixedOracle(Value);

    impl AdaptationOracle for FixedOracle {
        fn adapt(&self, _path: &Path) -> Result<Value, AdaptError> {
            Ok(self.0.clone())
        }
    }

    struct FailingOracle;

    impl AdaptationOracle for FailingOracle {
        fn adapt(&self, _path: &Path) -> Result<Value, AdaptError> {
            Err(AdaptError::new("caddy adapt failed"))
        }
    }

    fn text_snapshot(text: &str) -> Snapshot {
        Snapshot::new(SourceKind::Caddyfile, segment(text).unwrap())
    }

    #[test]
    fn entries_are_keyed_by_canonical_labels() {
        let oracle = FixedOracle(json!({
            "apps": {"http": {"servers": {
                "srv0": {"routes": [{"match": [{"host": ["a.example"]}], "handle": []}]}
            }}}
        }));
        let snapshot = text_snapshot("a.example {\n  respond \"ok\"\n}\n");
        let entries = adapted_route_entries(&snapshot, &[], &oracle).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, vec!["a.example".to_string()]);
        assert!(entries[0].1.contains("\"handle\""));
    }

    #[test]
    fn empty_snapshot_adapts_to_no_entries() {
        let snapshot = Snapshot::new(SourceKind::Caddyfile, Vec::new());
        let entries = adapted_route_entries(&snapshot, &[], &FailingOracle).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn oracle_failure_propagates() {
        let snapshot = text_snapshot("a.example {\n}\n");
        let err = adapted_route_entries(&snapshot, &[], &FailingOracle).unwrap_err();
        assert_eq!(err.message, "caddy adapt failed");
    }
}
