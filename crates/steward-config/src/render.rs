//! Decompile JSON route payloads into Caddyfile-style text.
//!
//! Live configuration has no authored text counterpart, so this module
//! produces an indented pseudo-Caddyfile for human review. Rendering is total
//! over well-formed JSON: unrecognized handlers degrade to a comment line
//! instead of failing.

use serde_json::Value;

use crate::json_routes::string_values;
use crate::model::Block;

const INDENT_STEP: usize = 4;
const REDIRECT_CODES: [i64; 5] = [301, 302, 303, 307, 308];

/// Best-effort conversion of a JSON route block to Caddyfile-style text.
///
/// Returns `None` when the block carries no JSON route fragment or the
/// payload fails to parse; callers fall back to raw JSON display.
pub fn render_live_block(block: &Block) -> Option<String> {
    let fragment = block.first_json_route()?;
    let route: Value = serde_json::from_str(&fragment.content).ok()?;
    if !route.is_object() {
        return None;
    }

    let mut lines = vec![block_header_line(block)];
    let body = render_route_body(&route, INDENT_STEP);
    if body.is_empty() {
        lines.push(format!("{}# no handlers", indent(INDENT_STEP)));
    } else {
        lines.extend(body);
    }
    lines.push("}".to_string());

    let body_text = lines.join("\n") + "\n";
    Some(format!("{}{}{}", block.prelude, body_text, block.postlude))
}

fn block_header_line(block: &Block) -> String {
    let labels: Vec<&str> = block
        .labels
        .iter()
        .map(|label| label.trim())
        .filter(|label| !label.is_empty())
        .collect();
    if labels.is_empty() {
        "{".to_string()
    } else {
        format!("{} {{", labels.join(", "))
    }
}

fn render_route_body(route: &Value, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    lines.extend(match_comment_lines(route, width));
    if route.get("terminal").is_some_and(json_truthy) {
        lines.push(format!("{}# terminal", indent(width)));
    }

    let handles = handle_entries(route);
    if handles.is_empty() {
        // Implicit subroute: recurse into any nested route list directly.
        if let Some(nested) = route.get("routes").and_then(Value::as_array) {
            for nested_route in nested {
                lines.push(format!("{}handle {{", indent(width)));
                lines.extend(render_route_body(nested_route, width + INDENT_STEP));
                lines.push(format!("{}}}", indent(width)));
            }
        }
        return lines;
    }

    for entry in handles {
        lines.extend(render_handle_entry(entry, width));
    }
    lines
}

fn match_comment_lines(route: &Value, width: usize) -> Vec<String> {
    let Some(matchers) = route.get("match").and_then(Value::as_array) else {
        return Vec::new();
    };
    matchers
        .iter()
        .filter(|matcher| matcher.is_object())
        .filter_map(|matcher| {
            let desc = describe_matcher(matcher);
            (!desc.is_empty()).then(|| format!("{}# match {desc}", indent(width)))
        })
        .collect()
}

fn describe_matcher(matcher: &Value) -> String {
    let mut parts = Vec::new();

    let mut hosts = string_values(matcher.get("host"));
    if hosts.is_empty() {
        hosts = string_values(matcher.get("hosts"));
    }
    if !hosts.is_empty() {
        parts.push(format!("host {}", hosts.join(", ")));
    }

    let mut paths = string_values(matcher.get("path"));
    paths.extend(string_values(matcher.get("paths")));
    if !paths.is_empty() {
        parts.push(format!("path {}", paths.join(", ")));
    }

    let mut methods = string_values(matcher.get("method"));
    methods.extend(string_values(matcher.get("methods")));
    if !methods.is_empty() {
        parts.push(format!("method {}", methods.join(", ")));
    }

    if let Some(expression) = matcher.get("expression").and_then(Value::as_str) {
        if !expression.is_empty() {
            parts.push(format!("expr {expression}"));
        }
    }

    parts.join("; ")
}

fn handle_entries(node: &Value) -> Vec<&serde_json::Map<String, Value>> {
    let entries = match node.get("handle") {
        Some(value) if !value.is_null() => Some(value),
        _ => node.get("handlers"),
    };
    match entries {
        Some(Value::Object(entry)) => vec![entry],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).collect(),
        _ => Vec::new(),
    }
}

fn render_handle_entry(entry: &serde_json::Map<String, Value>, width: usize) -> Vec<String> {
    let handler = entry
        .get("handler")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_lowercase();
    match handler.as_str() {
        "subroute" => render_subroute(entry, width),
        "reverse_proxy" => vec![format!("{}{}", indent(width), render_reverse_proxy(entry))],
        "static_response" => render_static_response(entry, width),
        "encode" => vec![format!("{}{}", indent(width), render_encode(entry))],
        "file_server" => render_file_server(entry, width),
        "headers" | "header" => render_header(entry, width),
        "php_fastcgi" => render_php_fastcgi(entry, width),
        "handle_response" => render_handle_response(entry, width),
        "rewrite" => render_rewrite(entry, width),
        "copy_response_headers" => render_copy_response_headers(entry, width),
        "request_body" => render_request_body(entry, width),
        "" => vec![format!("{}# handler unknown", indent(width))],
        other => vec![format!("{}# handler {other}", indent(width))],
    }
}

fn render_subroute(entry: &serde_json::Map<String, Value>, width: usize) -> Vec<String> {
    let Some(routes) = entry.get("routes").and_then(Value::as_array) else {
        return vec![format!("{}handle {{}}", indent(width))];
    };
    let mut lines = Vec::new();
    for route in routes.iter().filter(|route| route.is_object()) {
        lines.push(format!("{}handle {{", indent(width)));
        let mut nested = render_route_body(route, width + INDENT_STEP);
        if nested.is_empty() {
            nested.push(format!("{}# no handlers", indent(width + INDENT_STEP)));
        }
        lines.extend(nested);
        lines.push(format!("{}}}", indent(width)));
    }
    if lines.is_empty() {
        lines.push(format!("{}handle {{}}", indent(width)));
    }
    lines
}

fn render_reverse_proxy(entry: &serde_json::Map<String, Value>) -> String {
    let mut targets = Vec::new();
    if let Some(upstreams) = entry.get("upstreams").and_then(Value::as_array) {
        for upstream in upstreams {
            if let Some(dial) = upstream.get("dial").and_then(Value::as_str) {
                if !dial.is_empty() {
                    targets.push(dial.to_string());
                }
            }
        }
    }
    targets.extend(string_values(entry.get("to")));

    if targets.is_empty() {
        "reverse_proxy".to_string()
    } else {
        format!("reverse_proxy {}", targets.join(" "))
    }
}

fn render_static_response(entry: &serde_json::Map<String, Value>, width: usize) -> Vec<String> {
    let location = entry
        .get("headers")
        .and_then(|headers| first_header_value(headers, "Location"));
    let status_code = entry.get("status_code");
    let body = entry
        .get("body")
        .or_else(|| entry.get("content"))
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty());

    if let (Some(location), Some(code)) = (&location, status_code.and_then(Value::as_i64)) {
        if REDIRECT_CODES.contains(&code) && body.is_none() {
            return vec![format!("{}redir {location} {code}", indent(width))];
        }
    }

    let mut pieces = vec!["respond".to_string()];
    if let Some(body) = body {
        pieces.push(quote(body));
    }
    match status_code {
        Some(Value::Number(code)) => pieces.push(code.to_string()),
        Some(Value::String(code)) if !code.is_empty() => pieces.push(code.clone()),
        _ => {}
    }
    vec![format!("{}{}", indent(width), pieces.join(" "))]
}

fn render_encode(entry: &serde_json::Map<String, Value>) -> String {
    let mut names: Vec<String> = match entry.get("encodings") {
        Some(Value::Object(encodings)) => encodings.keys().cloned().collect(),
        other => string_values(other),
    };
    if names.is_empty() {
        names = string_values(entry.get("formats"));
    }
    if names.is_empty() {
        "encode".to_string()
    } else {
        format!("encode {}", names.join(" "))
    }
}

fn render_file_server(entry: &serde_json::Map<String, Value>, width: usize) -> Vec<String> {
    let mut first = "file_server".to_string();
    if entry.get("browse").is_some_and(json_truthy) {
        first.push_str(" browse");
    }
    let mut lines = vec![format!("{}{first}", indent(width))];

    if let Some(root) = entry.get("root").and_then(Value::as_str) {
        if !root.is_empty() {
            lines.push(format!("{}root {root}", indent(width + INDENT_STEP)));
        }
    }
    match entry.get("index") {
        Some(Value::Array(items)) => {
            for item in items.iter().filter_map(Value::as_str) {
                lines.push(format!("{}index {item}", indent(width + INDENT_STEP)));
            }
        }
        Some(Value::String(index)) if !index.is_empty() => {
            lines.push(format!("{}index {index}", indent(width + INDENT_STEP)));
        }
        _ => {}
    }
    lines
}

fn render_header(entry: &serde_json::Map<String, Value>, width: usize) -> Vec<String> {
    let set_headers = entry
        .get("response")
        .and_then(|response| response.get("set"))
        .or_else(|| entry.get("set"))
        .and_then(Value::as_object);

    let mut lines = Vec::new();
    if let Some(set_headers) = set_headers {
        for (key, values) in set_headers {
            for value in string_values(Some(values)) {
                lines.push(format!("{}header {key} {}", indent(width), quote(&value)));
            }
        }
    }
    if lines.is_empty() {
        lines.push(format!("{}header /* configure headers */", indent(width)));
    }
    lines
}

fn render_php_fastcgi(entry: &serde_json::Map<String, Value>, width: usize) -> Vec<String> {
    let upstream = entry
        .get("upstream")
        .or_else(|| entry.get("address"))
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty());

    let first = match upstream {
        Some(upstream) => format!("php_fastcgi {upstream}"),
        None => "php_fastcgi".to_string(),
    };
    let mut lines = vec![format!("{}{first}", indent(width))];
    if let Some(root) = entry.get("root").and_then(Value::as_str) {
        if !root.is_empty() {
            lines.push(format!("{}root {root}", indent(width + INDENT_STEP)));
        }
    }
    lines
}

fn render_handle_response(entry: &serde_json::Map<String, Value>, width: usize) -> Vec<String> {
    let Some(routes) = entry.get("routes").and_then(Value::as_array) else {
        return vec![format!("{}handle_response {{}}", indent(width))];
    };
    let mut lines = Vec::new();
    for route in routes.iter().filter(|route| route.is_object()) {
        lines.push(format!("{}handle_response {{", indent(width)));
        lines.extend(render_route_body(route, width + INDENT_STEP));
        lines.push(format!("{}}}", indent(width)));
    }
    if lines.is_empty() {
        lines.push(format!("{}handle_response {{}}", indent(width)));
    }
    lines
}

fn render_rewrite(entry: &serde_json::Map<String, Value>, width: usize) -> Vec<String> {
    let destination = entry
        .get("to")
        .or_else(|| entry.get("uri"))
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty());
    match destination {
        Some(destination) => vec![format!("{}rewrite {destination}", indent(width))],
        None => vec![format!("{}rewrite", indent(width))],
    }
}

fn render_copy_response_headers(
    entry: &serde_json::Map<String, Value>,
    width: usize,
) -> Vec<String> {
    match entry.get("headers").and_then(Value::as_array) {
        Some(headers) => {
            let joined = headers
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" ");
            vec![format!("{}copy_response_headers {joined}", indent(width))]
        }
        None => vec![format!("{}copy_response_headers", indent(width))],
    }
}

fn render_request_body(entry: &serde_json::Map<String, Value>, width: usize) -> Vec<String> {
    if entry.get("action").and_then(Value::as_str) == Some("replace") {
        if let Some(value) = entry.get("value").and_then(Value::as_str) {
            return vec![format!(
                "{}request_body replace {}",
                indent(width),
                quote(value)
            )];
        }
    }
    vec![format!("{}request_body", indent(width))]
}

fn first_header_value(headers: &Value, key: &str) -> Option<String> {
    let candidates = headers
        .get(key)
        .or_else(|| headers.get(key.to_lowercase().as_str()))?;
    match candidates {
        Value::String(value) if !value.is_empty() => Some(value.clone()),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .find(|value| !value.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

/// Truthiness for option-style JSON values: absent, `false`, zero, and empty
/// containers all mean "not set".
fn json_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|value| value != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(entries) => !entries.is_empty(),
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\\\""))
}

fn indent(width: usize) -> String {
    " ".repeat(width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Fragment, FragmentKind};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn route_block(labels: &[&str], route: serde_json::Value) -> Block {
        Block {
            labels: labels.iter().map(|label| label.to_string()).collect(),
            is_global: labels.is_empty(),
            prelude: String::new(),
            postlude: String::new(),
            fragments: vec![Fragment::new(
                FragmentKind::JsonRoute,
                serde_json::to_string_pretty(&route).unwrap(),
            )],
        }
    }

    #[test]
    fn bare_location_redirect_collapses_to_redir() {
        let block = route_block(
            &["a.example"],
            json!({
                "handle": [{
                    "handler": "static_response",
                    "headers": {"Location": ["https://b.example"]},
                    "status_code": 308
                }]
            }),
        );
        let rendered = render_live_block(&block).unwrap();
        assert_eq!(
            rendered,
            "a.example {\n    redir https://b.example 308\n}\n"
        );
    }

    #[test]
    fn redirect_with_body_stays_a_respond() {
        let block = route_block(
            &["a.example"],
            json!({
                "handle": [{
                    "handler": "static_response",
                    "headers": {"Location": ["https://b.example"]},
                    "status_code": 308,
                    "body": "moved"
                }]
            }),
        );
        let rendered = render_live_block(&block).unwrap();
        assert!(rendered.contains("respond \"moved\" 308"));
        assert!(!rendered.contains("redir"));
    }

    #[test]
    fn non_redirect_status_stays_a_respond() {
        let block = route_block(
            &["a.example"],
            json!({
                "handle": [{
                    "handler": "static_response",
                    "headers": {"Location": ["https://b.example"]},
                    "status_code": 200
                }]
            }),
        );
        let rendered = render_live_block(&block).unwrap();
        assert!(rendered.contains("respond 200"));
    }

    #[test]
    fn matcher_and_terminal_comments_precede_handlers() {
        let block = route_block(
            &["a.example"],
            json!({
                "match": [{"host": ["a.example"], "path": ["/api/*"]}],
                "terminal": true,
                "handle": [{"handler": "reverse_proxy", "upstreams": [{"dial": "127.0.0.1:9000"}]}]
            }),
        );
        let rendered = render_live_block(&block).unwrap();
        assert_eq!(
            rendered,
            "a.example {\n    # match host a.example; path /api/*\n    # terminal\n    reverse_proxy 127.0.0.1:9000\n}\n"
        );
    }

    #[test]
    fn subroute_renders_nested_handle_blocks() {
        let block = route_block(
            &["a.example"],
            json!({
                "handle": [{
                    "handler": "subroute",
                    "routes": [{
                        "handle": [{"handler": "file_server", "root": "/srv/www", "browse": true}]
                    }]
                }]
            }),
        );
        let rendered = render_live_block(&block).unwrap();
        assert_eq!(
            rendered,
            "a.example {\n    handle {\n        file_server browse\n            root /srv/www\n    }\n}\n"
        );
    }

    #[test]
    fn unknown_handler_degrades_to_comment() {
        let block = route_block(
            &["a.example"],
            json!({"handle": [{"handler": "tracing_middleware"}]}),
        );
        let rendered = render_live_block(&block).unwrap();
        assert!(rendered.contains("# handler tracing_middleware"));
    }

    #[test]
    fn implicit_subroute_recurses_into_nested_routes() {
        let block = route_block(
            &["a.example"],
            json!({
                "routes": [{"handle": [{"handler": "encode", "encodings": {"gzip": {}}}]}]
            }),
        );
        let rendered = render_live_block(&block).unwrap();
        assert_eq!(
            rendered,
            "a.example {\n    handle {\n        encode gzip\n    }\n}\n"
        );
    }

    #[test]
    fn header_values_are_quoted() {
        let block = route_block(
            &["a.example"],
            json!({
                "handle": [{
                    "handler": "headers",
                    "response": {"set": {"X-Frame-Options": ["DENY"]}}
                }]
            }),
        );
        let rendered = render_live_block(&block).unwrap();
        assert!(rendered.contains("header X-Frame-Options \"DENY\""));
    }

    #[test]
    fn empty_route_renders_no_handlers_comment() {
        let block = route_block(&["a.example"], json!({}));
        let rendered = render_live_block(&block).unwrap();
        assert_eq!(rendered, "a.example {\n    # no handlers\n}\n");
    }

    #[test]
    fn block_without_route_fragment_is_unrenderable() {
        let block = Block {
            labels: vec!["a.example".into()],
            is_global: false,
            prelude: String::new(),
            postlude: String::new(),
            fragments: vec![Fragment::new(FragmentKind::Header, "a.example {")],
        };
        assert!(render_live_block(&block).is_none());
    }

    #[test]
    fn prelude_and_postlude_wrap_rendered_text() {
        let mut block = route_block(&["a.example"], json!({}));
        block.prelude = "# server: srv0 route: 0\n".into();
        block.postlude = "\n".into();
        let rendered = render_live_block(&block).unwrap();
        assert!(rendered.starts_with("# server: srv0 route: 0\n"));
        assert!(rendered.ends_with("}\n\n"));
    }
}
