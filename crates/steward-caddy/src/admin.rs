//! Querying the Caddy admin API for the live configuration.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use steward_config::segment;

/// Default admin endpoint exposed by a locally-running caddy.
pub const DEFAULT_ADMIN_ENDPOINT: &str = "http://127.0.0.1:2019/config/";

/// Admin requests are short and local; fail fast rather than hang the
/// status view.
pub const ADMIN_TIMEOUT: Duration = Duration::from_millis(2500);

/// Coarse service health derived from the admin API or the service manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Live,
    Down,
    Unknown,
}

impl ServiceState {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceState::Live => "live",
            ServiceState::Down => "down",
            ServiceState::Unknown => "unknown",
        }
    }

    /// Normalize a raw service-manager state string.
    pub fn normalize(raw: &str) -> ServiceState {
        match raw.trim().to_lowercase().as_str() {
            "active" | "running" | "live" | "ok" => ServiceState::Live,
            "inactive" | "failed" | "dead" | "stopped" | "down" => ServiceState::Down,
            _ => ServiceState::Unknown,
        }
    }
}

/// What the admin endpoint returned, in either syntax.
#[derive(Debug, Clone)]
pub struct LiveStatus {
    pub state: ServiceState,
    pub block_count: Option<usize>,
    /// Present when the endpoint served Caddyfile-syntax text.
    pub caddyfile_text: Option<String>,
    /// Which representation was negotiated: `caddyfile`, `json`, `http`, or
    /// `network` for transport failures.
    pub format: String,
    /// Present when the endpoint served JSON.
    pub json_payload: Option<String>,
    pub error: Option<String>,
}

impl LiveStatus {
    fn down(format: &str, error: String) -> LiveStatus {
        LiveStatus {
            state: ServiceState::Down,
            block_count: None,
            caddyfile_text: None,
            format: format.to_string(),
            json_payload: None,
            error: Some(error),
        }
    }
}

/// Fetch the live configuration from the admin endpoint.
///
/// Content negotiation is by `Content-Type` with a body-sniffing fallback: a
/// `{` prefix means JSON. Returns `None` when no endpoint is configured;
/// transport and HTTP failures come back as a `down` status rather than an
/// error, because the caller's status view must stay informative.
pub fn fetch_live_status(endpoint: &str, timeout: Duration) -> Option<LiveStatus> {
    if endpoint.is_empty() {
        return None;
    }

    let client = match reqwest::blocking::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(err) => return Some(LiveStatus::down("network", err.to_string())),
    };

    let response = client
        .get(endpoint)
        .header(
            reqwest::header::ACCEPT,
            "text/caddyfile, text/plain, application/json",
        )
        .send();

    let response = match response {
        Ok(response) => response,
        Err(err) => return Some(LiveStatus::down("network", err.to_string())),
    };

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_lowercase();
    let status = response.status();
    let raw = response.text().unwrap_or_default();

    if !status.is_success() {
        let detail = if raw.is_empty() {
            status.to_string()
        } else {
            raw
        };
        return Some(LiveStatus::down("http", detail));
    }

    if content_type.contains("caddyfile") || content_type.contains("text/plain") {
        return Some(from_caddyfile(raw));
    }
    if content_type.contains("json") {
        return Some(from_json(raw));
    }
    // Best effort: guess from the payload itself.
    if raw.trim_start().starts_with('{') {
        Some(from_json(raw))
    } else {
        Some(from_caddyfile(raw))
    }
}

fn from_caddyfile(text: String) -> LiveStatus {
    match segment(&text) {
        Ok(blocks) => LiveStatus {
            state: ServiceState::Live,
            block_count: Some(blocks.len()),
            caddyfile_text: Some(text),
            format: "caddyfile".to_string(),
            json_payload: None,
            error: None,
        },
        Err(err) => LiveStatus {
            state: ServiceState::Live,
            block_count: None,
            caddyfile_text: Some(text),
            format: "caddyfile".to_string(),
            json_payload: None,
            error: Some(err.to_string()),
        },
    }
}

fn from_json(payload: String) -> LiveStatus {
    match serde_json::from_str::<Value>(&payload) {
        Ok(data) => LiveStatus {
            state: ServiceState::Live,
            block_count: count_http_routes(&data),
            caddyfile_text: None,
            format: "json".to_string(),
            json_payload: Some(payload),
            error: None,
        },
        Err(err) => LiveStatus {
            state: ServiceState::Live,
            block_count: None,
            caddyfile_text: None,
            format: "json".to_string(),
            json_payload: Some(payload),
            error: Some(err.to_string()),
        },
    }
}

fn count_http_routes(data: &Value) -> Option<usize> {
    let servers = data
        .get("apps")?
        .get("http")?
        .get("servers")?
        .as_object()?;
    let mut total = 0;
    for server in servers.values() {
        if let Some(routes) = server.get("routes").and_then(Value::as_array) {
            total += routes.len();
        }
    }
    Some(total)
}
