//! Structural digests for snapshot equality testing.
//!
//! Two snapshots digest equal iff they describe equivalent configuration.
//! When route-level normalization is available for a snapshot's source kind
//! the digest covers canonically-ordered, scrubbed route payloads, so
//! cosmetic formatting differences between syntaxes vanish. Otherwise the
//! digest is a literal structural hash of every block's fields.

use std::collections::BTreeMap;

use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use steward_config::{string_values, Block, SiteAddress, Snapshot, SourceKind};

use crate::adapter::{adapted_route_entries, AdaptationOracle};

/// Sentinel replacing a snapshot's own backing path inside `file_server`
/// hide lists, so two snapshots pointing at different absolute paths for the
/// same logical exclusion still digest equal.
pub const HIDE_SENTINEL: &str = "__caddyfile__";

/// Compute the order-stable structural digest of a snapshot.
pub fn structural_digest(
    snapshot: &Snapshot,
    scrub_paths: &[String],
    oracle: Option<&dyn AdaptationOracle>,
) -> String {
    if let Some(blobs) = route_blobs(snapshot, scrub_paths, oracle) {
        let serialized = serde_json::to_string(&blobs).unwrap_or_default();
        return sha256_hex(serialized.as_bytes());
    }
    let payload: Vec<Value> = snapshot
        .blocks
        .iter()
        .enumerate()
        .map(|(index, block)| literal_block_payload(block, index))
        .collect();
    let serialized = serde_json::to_string(&payload).unwrap_or_default();
    sha256_hex(serialized.as_bytes())
}

/// Per-block digests supporting mismatch counting.
///
/// Route mode keys by position in the canonically-ordered blob list; literal
/// mode keys by block index.
pub fn block_digests(
    snapshot: &Snapshot,
    scrub_paths: &[String],
    oracle: Option<&dyn AdaptationOracle>,
) -> BTreeMap<usize, String> {
    if let Some(blobs) = route_blobs(snapshot, scrub_paths, oracle) {
        return blobs
            .into_iter()
            .enumerate()
            .map(|(index, blob)| (index, sha256_hex(blob.as_bytes())))
            .collect();
    }
    snapshot
        .blocks
        .iter()
        .enumerate()
        .map(|(index, block)| {
            let serialized =
                serde_json::to_string(&literal_block_payload(block, index)).unwrap_or_default();
            (index, sha256_hex(serialized.as_bytes()))
        })
        .collect()
}

/// Route payloads in canonical order, or `None` when route-level
/// normalization is unavailable and literal hashing must be used.
fn route_blobs(
    snapshot: &Snapshot,
    scrub_paths: &[String],
    oracle: Option<&dyn AdaptationOracle>,
) -> Option<Vec<String>> {
    let mut map = route_map(snapshot, scrub_paths, oracle)?;
    map.sort_by(|(left, _), (right, _)| key_sort_value(left).cmp(&key_sort_value(right)));
    Some(map.into_iter().flat_map(|(_, blobs)| blobs).collect())
}

/// Group a snapshot's normalized route payloads by canonical block key, in
/// first-seen key order.
pub(crate) fn route_map(
    snapshot: &Snapshot,
    scrub_paths: &[String],
    oracle: Option<&dyn AdaptationOracle>,
) -> Option<Vec<(Vec<String>, Vec<String>)>> {
    match snapshot.kind {
        SourceKind::Live => live_route_map(snapshot, scrub_paths),
        SourceKind::Managed | SourceKind::Caddyfile => {
            let oracle = oracle?;
            match adapted_route_entries(snapshot, scrub_paths, oracle) {
                Ok(entries) => Some(group_entries(entries)),
                Err(err) => {
                    tracing::debug!(
                        kind = snapshot.kind.as_str(),
                        error = %err,
                        "adaptation unavailable, falling back to literal hashing"
                    );
                    None
                }
            }
        }
    }
}

fn live_route_map(
    snapshot: &Snapshot,
    scrub_paths: &[String],
) -> Option<Vec<(Vec<String>, Vec<String>)>> {
    let mut entries = Vec::new();
    for block in &snapshot.blocks {
        let payloads: Vec<String> = block
            .json_route_fragments()
            .filter_map(|fragment| normalize_route_json(&fragment.content, scrub_paths))
            .collect();
        if payloads.is_empty() {
            // A live block without a usable route payload means the snapshot
            // cannot be represented route-wise at all.
            return None;
        }
        for payload in payloads {
            entries.push((block.canonical_key(), payload));
        }
    }
    Some(group_entries(entries))
}

fn group_entries(entries: Vec<(Vec<String>, String)>) -> Vec<(Vec<String>, Vec<String>)> {
    let mut grouped: Vec<(Vec<String>, Vec<String>)> = Vec::new();
    for (key, payload) in entries {
        match grouped.iter().position(|(existing, _)| *existing == key) {
            Some(index) => grouped[index].1.push(payload),
            None => grouped.push((key, vec![payload])),
        }
    }
    grouped
}

fn key_sort_value(key: &[String]) -> (usize, String) {
    (key.len(), key.join(", ").to_lowercase())
}

/// Canonicalize one JSON route payload: parse, scrub `file_server` hide
/// entries that name a scrub path, and re-serialize compactly with sorted
/// keys. Returns `None` for malformed payloads.
pub fn normalize_route_json(content: &str, scrub_paths: &[String]) -> Option<String> {
    let mut data: Value = serde_json::from_str(content).ok()?;
    if !scrub_paths.is_empty() {
        scrub_file_server_hide(&mut data, scrub_paths);
    }
    serde_json::to_string(&data).ok()
}

fn scrub_file_server_hide(node: &mut Value, scrub_paths: &[String]) {
    match node {
        Value::Object(map) => {
            let is_file_server = map.get("handler").and_then(Value::as_str) == Some("file_server");
            if is_file_server {
                let entries = string_values(map.get("hide"));
                if !entries.is_empty() {
                    let replaced: Vec<Value> = entries
                        .into_iter()
                        .map(|entry| {
                            if scrub_paths.contains(&entry) {
                                Value::String(HIDE_SENTINEL.to_string())
                            } else {
                                Value::String(entry)
                            }
                        })
                        .collect();
                    map.insert("hide".to_string(), Value::Array(replaced));
                }
            }
            for value in map.values_mut() {
                scrub_file_server_hide(value, scrub_paths);
            }
        }
        Value::Array(items) => {
            for item in items {
                scrub_file_server_hide(item, scrub_paths);
            }
        }
        _ => {}
    }
}

fn literal_block_payload(block: &Block, index: usize) -> Value {
    let sites: Vec<Value> = block
        .labels
        .iter()
        .enumerate()
        .map(|(order, label)| {
            let site = SiteAddress::parse(label);
            json!({
                "label": site.raw,
                "host": site.host,
                "port": site.port,
                "scheme": site.scheme,
                "is_ipv6": site.is_ipv6,
                "is_wildcard": site.is_wildcard,
                "order": order,
            })
        })
        .collect();
    let fragments: Vec<Value> = block
        .fragments
        .iter()
        .enumerate()
        .map(|(order, fragment)| {
            json!({
                "kind": fragment.kind.as_str(),
                "content": fragment.content,
                "index": order,
            })
        })
        .collect();
    json!({
        "index": index,
        "is_global": block.is_global,
        "prelude": block.prelude,
        "postlude": block.postlude,
        "sites": sites,
        "fragments": fragments,
    })
}

/// Hex-encoded SHA-256 of raw bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use steward_config::{blocks_from_caddy_json, segment};

    fn live_snapshot(data: &Value) -> Snapshot {
        Snapshot::new(SourceKind::Live, blocks_from_caddy_json(data))
    }

    #[test]
    fn sha256_hex_matches_known_value() {
        assert_eq!(
            sha256_hex(b"hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn digest_is_deterministic_across_key_order() {
        let left = live_snapshot(&json!({
            "apps": {"http": {"servers": {"srv0": {"routes": [
                {"match": [{"host": ["a.example"]}], "handle": [{"handler": "encode", "encodings": {"gzip": {}}}]}
            ]}}}}
        }));
        let right = live_snapshot(&json!({
            "apps": {"http": {"servers": {"srv0": {"routes": [
                {"handle": [{"encodings": {"gzip": {}}, "handler": "encode"}], "match": [{"host": ["a.example"]}]}
            ]}}}}
        }));
        assert_eq!(
            structural_digest(&left, &[], None),
            structural_digest(&right, &[], None)
        );
    }

    #[test]
    fn hide_paths_scrub_to_sentinel() {
        let make = |hide: &str| {
            live_snapshot(&json!({
                "apps": {"http": {"servers": {"srv0": {"routes": [
                    {"match": [{"host": ["a.example"]}],
                     "handle": [{"handler": "file_server", "hide": [hide]}]}
                ]}}}}
            }))
        };
        let left = make("/etc/caddy/Caddyfile");
        let right = make("/srv/Caddyfile");
        let left_digest =
            structural_digest(&left, &["/etc/caddy/Caddyfile".to_string()], None);
        let right_digest = structural_digest(&right, &["/srv/Caddyfile".to_string()], None);
        assert_eq!(left_digest, right_digest);
    }

    #[test]
    fn unscrubbed_hide_paths_still_differ() {
        let make = |hide: &str| {
            live_snapshot(&json!({
                "apps": {"http": {"servers": {"srv0": {"routes": [
                    {"handle": [{"handler": "file_server", "hide": [hide]}]}
                ]}}}}
            }))
        };
        let left = make("/etc/a");
        let right = make("/etc/b");
        assert_ne!(
            structural_digest(&left, &[], None),
            structural_digest(&right, &[], None)
        );
    }

    #[test]
    fn text_snapshot_without_oracle_uses_literal_hashing() {
        let text = "a.example {\n  respond \"ok\"\n}\n";
        let snapshot = Snapshot::new(SourceKind::Caddyfile, segment(text).unwrap());
        let first = structural_digest(&snapshot, &[], None);
        let second = structural_digest(&snapshot, &[], None);
        assert_eq!(first, second);

        let other = Snapshot::new(
            SourceKind::Caddyfile,
            segment("a.example {\n  respond \"changed\"\n}\n").unwrap(),
        );
        assert_ne!(first, structural_digest(&other, &[], None));
    }

    #[test]
    fn literal_mode_is_sensitive_to_formatting() {
        let compact = Snapshot::new(
            SourceKind::Caddyfile,
            segment("a.example {\nrespond \"ok\"\n}\n").unwrap(),
        );
        let spaced = Snapshot::new(
            SourceKind::Caddyfile,
            segment("a.example {\n    respond \"ok\"\n}\n").unwrap(),
        );
        assert_ne!(
            structural_digest(&compact, &[], None),
            structural_digest(&spaced, &[], None)
        );
    }

    #[test]
    fn block_digests_key_by_position() {
        let snapshot = live_snapshot(&json!({
            "apps": {"http": {"servers": {"srv0": {"routes": [
                {"match": [{"host": ["a.example"]}], "handle": []},
                {"match": [{"host": ["b.example"]}], "handle": []}
            ]}}}}
        }));
        let digests = block_digests(&snapshot, &[], None);
        assert_eq!(digests.len(), 2);
        assert!(digests.contains_key(&0));
        assert!(digests.contains_key(&1));
    }

    #[test]
    fn empty_json_snapshot_falls_back_to_literal_mode() {
        // The synthetic global wrapper block has no route fragment, so route
        // mode is unavailable and the literal projection is hashed instead.
        let snapshot = live_snapshot(&json!({"apps": {}}));
        assert_eq!(snapshot.blocks.len(), 1);
        let digest = structural_digest(&snapshot, &[], None);
        assert_eq!(digest.len(), 64);
    }
}
