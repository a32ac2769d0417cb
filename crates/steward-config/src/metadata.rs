//! Content-derived metadata for JSON route blocks.
//!
//! The matcher and handler values collected here feed block correlation and
//! display: hostnames, matched paths, route groups, filesystem roots,
//! upstream dial targets, redirect locations, content encodings, status
//! codes, and handler names.

use serde_json::Value;

use crate::json_routes::string_values;
use crate::model::Block;

/// Metadata extracted from a block's JSON route payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteMetadata {
    /// Handler chain entries as `<path>: <handler>` labels, in visit order.
    pub handles: Vec<String>,
    /// Unique handler names, in first-seen order.
    pub handlers: Vec<String>,
    pub hosts: Vec<String>,
    pub roots: Vec<String>,
    pub paths: Vec<String>,
    pub groups: Vec<String>,
    pub encodings: Vec<String>,
    pub locations: Vec<String>,
    pub dials: Vec<String>,
    pub status_codes: Vec<String>,
}

impl RouteMetadata {
    /// Collect metadata from every JSON route fragment of a block.
    ///
    /// Malformed fragments are skipped: metadata is a display aid, not an
    /// equality input, so it degrades rather than fails.
    pub fn collect(block: &Block) -> RouteMetadata {
        let mut meta = RouteMetadata::default();
        for fragment in block.json_route_fragments() {
            let Ok(route) = serde_json::from_str::<Value>(&fragment.content) else {
                continue;
            };
            if route.is_object() {
                collect_route(&route, &mut meta, &[]);
            }
        }
        meta
    }

    /// True when no metadata at all was extracted.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
            && self.handlers.is_empty()
            && self.hosts.is_empty()
            && self.roots.is_empty()
            && self.paths.is_empty()
            && self.groups.is_empty()
            && self.encodings.is_empty()
            && self.locations.is_empty()
            && self.dials.is_empty()
            && self.status_codes.is_empty()
    }
}

fn collect_route(node: &Value, meta: &mut RouteMetadata, prefix: &[String]) {
    if !node.is_object() {
        return;
    }
    extend_unique(&mut meta.hosts, hosts_from_matchers(node));
    extend_unique(&mut meta.paths, paths_from_matchers(node));
    extend_unique(&mut meta.groups, groups_from_matchers(node));

    for (idx, entry) in handle_entries(node).into_iter().enumerate() {
        let mut path_parts = prefix.to_vec();
        path_parts.push(format!("handle[{idx}]"));

        let raw_handler = entry.get("handler").and_then(Value::as_str);
        if let Some(handler_name) = normalize_handler_name(raw_handler) {
            extend_unique(&mut meta.roots, root_values(entry));
            extend_unique(&mut meta.encodings, encoding_values(entry));
            extend_unique(&mut meta.locations, string_values(entry.get("location")));
            extend_unique(&mut meta.dials, dial_values(entry));
            extend_unique(&mut meta.paths, handler_path_values(entry));
            extend_unique(&mut meta.status_codes, status_code_values(entry));

            meta.handles
                .push(format!("{}: {handler_name}", path_parts.join(".")));
            if !meta.handlers.contains(&handler_name) {
                meta.handlers.push(handler_name);
            }
        }

        recurse_nested_routes(entry, meta, &path_parts);
    }

    if let Some(nested) = node.get("routes").and_then(Value::as_array) {
        for (idx, route) in nested.iter().enumerate() {
            if route.is_object() {
                let mut child_prefix = prefix.to_vec();
                child_prefix.push(format!("routes[{idx}]"));
                collect_route(route, meta, &child_prefix);
            }
        }
    }
}

fn recurse_nested_routes(
    entry: &serde_json::Map<String, Value>,
    meta: &mut RouteMetadata,
    parent_path: &[String],
) {
    let Some(nested) = entry.get("routes").and_then(Value::as_array) else {
        return;
    };
    for (idx, route) in nested.iter().enumerate() {
        if route.is_object() {
            let mut child_prefix = parent_path.to_vec();
            child_prefix.push(format!("routes[{idx}]"));
            collect_route(route, meta, &child_prefix);
        }
    }
}

/// Entries of a route's handler chain, accepting both the `handle` and the
/// `handlers` spellings and both single-object and list shapes.
fn handle_entries(node: &Value) -> Vec<&serde_json::Map<String, Value>> {
    let candidate = match node.get("handle") {
        Some(value) if !is_empty_value(value) => Some(value),
        _ => node.get("handlers"),
    };
    match candidate {
        Some(Value::Object(entry)) => vec![entry],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).collect(),
        _ => Vec::new(),
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(entries) => entries.is_empty(),
        _ => false,
    }
}

fn hosts_from_matchers(node: &Value) -> Vec<String> {
    let Some(matchers) = node.get("match").and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut hosts = Vec::new();
    for matcher in matchers {
        hosts.extend(string_values(matcher.get("host")));
        hosts.extend(string_values(matcher.get("hosts")));
    }
    hosts
}

fn paths_from_matchers(node: &Value) -> Vec<String> {
    let Some(matchers) = node.get("match").and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut paths = Vec::new();
    for matcher in matchers {
        paths.extend(string_values(matcher.get("paths")));
        paths.extend(string_values(matcher.get("path")));
    }
    paths
}

fn groups_from_matchers(node: &Value) -> Vec<String> {
    let Some(matchers) = node.get("match").and_then(Value::as_array) else {
        return Vec::new();
    };
    matchers
        .iter()
        .filter_map(|matcher| matcher.get("group"))
        .filter_map(Value::as_str)
        .filter(|group| !group.is_empty())
        .map(str::to_string)
        .collect()
}

fn root_values(entry: &serde_json::Map<String, Value>) -> Vec<String> {
    string_values(entry.get("root"))
}

fn encoding_values(entry: &serde_json::Map<String, Value>) -> Vec<String> {
    match entry.get("encodings") {
        Some(Value::Object(encodings)) => encodings
            .keys()
            .filter(|key| !key.is_empty())
            .cloned()
            .collect(),
        other => string_values(other),
    }
}

fn dial_values(entry: &serde_json::Map<String, Value>) -> Vec<String> {
    let mut values = string_values(entry.get("dial"));
    if let Some(upstreams) = entry.get("upstreams").and_then(Value::as_array) {
        for upstream in upstreams {
            if let Some(dial) = upstream.get("dial").and_then(Value::as_str) {
                if !dial.is_empty() {
                    values.push(dial.to_string());
                }
            }
        }
    }
    values
}

fn handler_path_values(entry: &serde_json::Map<String, Value>) -> Vec<String> {
    let mut values = string_values(entry.get("path"));
    values.extend(string_values(entry.get("paths")));
    values
}

fn status_code_values(entry: &serde_json::Map<String, Value>) -> Vec<String> {
    match entry.get("status_code") {
        Some(Value::Number(code)) => vec![code.to_string()],
        Some(Value::String(code)) => {
            let trimmed = code.trim();
            if trimmed.is_empty() {
                Vec::new()
            } else {
                vec![trimmed.to_string()]
            }
        }
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::Number(code) => Some(code.to_string()),
                Value::String(code) => {
                    let trimmed = code.trim();
                    (!trimmed.is_empty()).then(|| trimmed.to_string())
                }
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Handler names that only wrap other routes carry no display signal of their
/// own and are skipped. The legacy `headers` spelling folds into `header`.
fn normalize_handler_name(name: Option<&str>) -> Option<String> {
    let lowered = name?.trim().to_lowercase();
    if lowered.is_empty() || matches!(lowered.as_str(), "subroute" | "log" | "rewrite") {
        return None;
    }
    if lowered == "headers" {
        return Some("header".to_string());
    }
    Some(lowered)
}

fn extend_unique(target: &mut Vec<String>, items: Vec<String>) {
    for item in items {
        if !item.is_empty() && !target.contains(&item) {
            target.push(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Fragment, FragmentKind};
    use serde_json::json;

    fn route_block(route: serde_json::Value) -> Block {
        Block {
            labels: vec!["a.example".into()],
            is_global: false,
            prelude: String::new(),
            postlude: String::new(),
            fragments: vec![Fragment::new(
                FragmentKind::JsonRoute,
                serde_json::to_string_pretty(&route).unwrap(),
            )],
        }
    }

    #[test]
    fn collects_hosts_and_dials() {
        let block = route_block(json!({
            "match": [{"host": ["a.example"]}],
            "handle": [{"handler": "reverse_proxy", "upstreams": [{"dial": "127.0.0.1:9000"}]}]
        }));
        let meta = RouteMetadata::collect(&block);
        assert_eq!(meta.hosts, vec!["a.example".to_string()]);
        assert_eq!(meta.dials, vec!["127.0.0.1:9000".to_string()]);
        assert_eq!(meta.handlers, vec!["reverse_proxy".to_string()]);
        assert_eq!(meta.handles, vec!["handle[0]: reverse_proxy".to_string()]);
    }

    #[test]
    fn recurses_into_subroute_routes() {
        let block = route_block(json!({
            "handle": [{
                "handler": "subroute",
                "routes": [{
                    "match": [{"path": ["/static/*"]}],
                    "handle": [{"handler": "file_server", "root": "/srv/www"}]
                }]
            }]
        }));
        let meta = RouteMetadata::collect(&block);
        assert_eq!(meta.paths, vec!["/static/*".to_string()]);
        assert_eq!(meta.roots, vec!["/srv/www".to_string()]);
        // Wrapper handlers carry no signal of their own.
        assert_eq!(meta.handlers, vec!["file_server".to_string()]);
        assert_eq!(
            meta.handles,
            vec!["handle[0].routes[0].handle[0]: file_server".to_string()]
        );
    }

    #[test]
    fn headers_spelling_folds_into_header() {
        let block = route_block(json!({
            "handle": [{"handler": "headers", "response": {"set": {"X-Test": ["1"]}}}]
        }));
        let meta = RouteMetadata::collect(&block);
        assert_eq!(meta.handlers, vec!["header".to_string()]);
    }

    #[test]
    fn encodings_come_from_object_keys() {
        let block = route_block(json!({
            "handle": [{"handler": "encode", "encodings": {"gzip": {}, "zstd": {}}}]
        }));
        let meta = RouteMetadata::collect(&block);
        assert_eq!(meta.encodings, vec!["gzip".to_string(), "zstd".to_string()]);
    }

    #[test]
    fn status_codes_accept_scalars_and_lists() {
        let block = route_block(json!({
            "handle": [
                {"handler": "static_response", "status_code": 308},
                {"handler": "static_response", "status_code": " 404 "}
            ]
        }));
        let meta = RouteMetadata::collect(&block);
        assert_eq!(meta.status_codes, vec!["308".to_string(), "404".to_string()]);
    }

    #[test]
    fn malformed_fragment_degrades_to_empty() {
        let block = Block {
            labels: Vec::new(),
            is_global: true,
            prelude: String::new(),
            postlude: String::new(),
            fragments: vec![Fragment::new(FragmentKind::JsonRoute, "{not json")],
        };
        assert!(RouteMetadata::collect(&block).is_empty());
    }
}
