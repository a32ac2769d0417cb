//! Normalize live Caddy JSON into the block abstraction.
//!
//! Every HTTP route becomes one [`Block`] keyed by labels derived from its
//! matchers, so JSON-origin snapshots can be compared and displayed alongside
//! Caddyfile-origin ones.

use serde_json::Value;

use crate::model::{dedupe_preserve_order, Block, Fragment, FragmentKind};

/// Convert a Caddy admin JSON document into ordered blocks.
///
/// Servers are visited in name order and routes in list order, so the result
/// is deterministic for a given document. A document without any HTTP routes
/// collapses into a single global block wrapping the whole payload, so
/// nothing is silently dropped.
pub fn blocks_from_caddy_json(data: &Value) -> Vec<Block> {
    let servers = data
        .get("apps")
        .and_then(|apps| apps.get("http"))
        .and_then(|http| http.get("servers"))
        .and_then(Value::as_object);

    let mut blocks = Vec::new();
    if let Some(servers) = servers {
        for (server_name, server) in servers {
            let Some(routes) = server.get("routes").and_then(Value::as_array) else {
                continue;
            };
            for (index, route) in routes.iter().enumerate() {
                let labels = labels_for_route(server_name, server, route, index);
                blocks.push(Block {
                    is_global: labels.is_empty(),
                    labels,
                    prelude: format!("# server: {server_name} route: {index}\n"),
                    postlude: String::new(),
                    fragments: vec![Fragment::new(FragmentKind::JsonRoute, pretty_json(route))],
                });
            }
        }
    }

    if blocks.is_empty() {
        blocks.push(Block {
            labels: Vec::new(),
            is_global: true,
            prelude: String::new(),
            postlude: String::new(),
            fragments: vec![Fragment::new(FragmentKind::JsonConfig, pretty_json(data))],
        });
    }

    blocks
}

/// Derive the label set for one route, in priority order: host matchers,
/// prefixed path/method matchers, the server's listen addresses, and finally
/// a synthetic `<server>::route<index>` identifier. Every block ends up with
/// at least one label.
fn labels_for_route(server_name: &str, server: &Value, route: &Value, index: usize) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    if let Some(matchers) = route.get("match").and_then(Value::as_array) {
        for matcher in matchers {
            labels.extend(extract_hosts(matcher));
            labels.extend(prefixed(matcher.get("path"), "path"));
            labels.extend(prefixed(matcher.get("paths"), "path"));
            labels.extend(prefixed(matcher.get("method"), "method"));
            labels.extend(prefixed(matcher.get("methods"), "method"));
        }
    }

    if labels.is_empty() {
        labels.extend(string_values(server.get("listen")));
    }

    if labels.is_empty() {
        labels.push(format!("{server_name}::route{index}"));
    }

    dedupe_preserve_order(labels)
}

fn extract_hosts(matcher: &Value) -> Vec<String> {
    let hosts = string_values(matcher.get("host"));
    if !hosts.is_empty() {
        return hosts;
    }
    string_values(matcher.get("hosts"))
}

fn prefixed(value: Option<&Value>, prefix: &str) -> Vec<String> {
    string_values(value)
        .into_iter()
        .map(|entry| format!("{prefix}:{entry}"))
        .collect()
}

/// Extract non-empty strings from a scalar-or-list JSON value.
pub fn string_values(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(text)) if !text.is_empty() => vec![text.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Pretty-print a JSON value with stable (sorted) object keys.
pub fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}
