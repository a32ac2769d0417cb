//! Per-block display views.
//!
//! A [`BlockView`] bundles everything the status/display layer needs to show
//! one block: its canonical key, rendered text, content-derived metadata, and
//! normalized route payloads. Text-origin snapshots borrow their route
//! payloads from the adaptation oracle when it is available, so their views
//! line up with live ones.

use std::collections::{HashMap, VecDeque};

use steward_config::{render_live_block, Block, RouteMetadata, Snapshot, SourceKind};

use crate::adapter::{adapted_route_entries, AdaptationOracle};
use crate::digest::normalize_route_json;

/// Display-oriented projection of one snapshot block.
#[derive(Debug, Clone)]
pub struct BlockView {
    pub index: usize,
    pub key: Vec<String>,
    pub text: String,
    pub metadata: RouteMetadata,
    pub route_payloads: Vec<String>,
}

/// Build display views for every block of a snapshot, in block order.
pub fn snapshot_block_views(
    snapshot: &Snapshot,
    scrub_paths: &[String],
    oracle: Option<&dyn AdaptationOracle>,
) -> Vec<BlockView> {
    let mut route_lookup: HashMap<Vec<String>, VecDeque<String>> = HashMap::new();
    if matches!(snapshot.kind, SourceKind::Managed | SourceKind::Caddyfile) {
        if let Some(oracle) = oracle {
            match adapted_route_entries(snapshot, scrub_paths, oracle) {
                Ok(entries) => {
                    for (key, payload) in entries {
                        route_lookup.entry(key).or_default().push_back(payload);
                    }
                }
                Err(err) => {
                    tracing::debug!(error = %err, "adaptation unavailable for block views");
                }
            }
        }
    }

    snapshot
        .blocks
        .iter()
        .enumerate()
        .map(|(index, block)| {
            let key = block.canonical_key();
            let route_payloads = if snapshot.kind == SourceKind::Live {
                own_payloads(block, scrub_paths)
            } else {
                match route_lookup.get_mut(&key).and_then(VecDeque::pop_front) {
                    Some(payload) => vec![payload],
                    None => own_payloads(block, scrub_paths),
                }
            };
            BlockView {
                index,
                key,
                text: block_display_text(block, snapshot.kind),
                metadata: RouteMetadata::collect(block),
                route_payloads,
            }
        })
        .collect()
}

fn own_payloads(block: &Block, scrub_paths: &[String]) -> Vec<String> {
    block
        .json_route_fragments()
        .filter_map(|fragment| normalize_route_json(&fragment.content, scrub_paths))
        .collect()
}

fn block_display_text(block: &Block, kind: SourceKind) -> String {
    if kind == SourceKind::Live {
        if let Some(rendered) = render_live_block(block) {
            let trimmed = rendered.trim_matches('\n');
            return if trimmed.is_empty() {
                rendered
            } else {
                trimmed.to_string()
            };
        }
    }
    let combined = block.text();
    let trimmed = combined.trim_matches('\n');
    if trimmed.is_empty() {
        combined
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use steward_config::{blocks_from_caddy_json, segment};

    #[test]
    fn live_views_render_caddyfile_style_text() {
        let data = json!({
            "apps": {"http": {"servers": {"srv0": {"routes": [
                {"match": [{"host": ["a.example"]}],
                 "handle": [{"handler": "reverse_proxy", "upstreams": [{"dial": "127.0.0.1:9000"}]}]}
            ]}}}}
        });
        let snapshot = Snapshot::new(SourceKind::Live, blocks_from_caddy_json(&data));
        let views = snapshot_block_views(&snapshot, &[], None);
        assert_eq!(views.len(), 1);
        assert!(views[0].text.contains("reverse_proxy 127.0.0.1:9000"));
        assert_eq!(views[0].key, vec!["a.example".to_string()]);
        assert_eq!(views[0].route_payloads.len(), 1);
    }

    #[test]
    fn text_views_without_oracle_fall_back_to_raw_text() {
        let snapshot = Snapshot::new(
            SourceKind::Caddyfile,
            segment("a.example {\n  respond \"ok\"\n}\n").unwrap(),
        );
        let views = snapshot_block_views(&snapshot, &[], None);
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].text, "a.example {\n  respond \"ok\"\n}");
        assert!(views[0].route_payloads.is_empty());
    }
}
