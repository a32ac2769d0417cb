//! Value types shared by every configuration source.
//!
//! A [`Snapshot`] captures one configuration source at one point in time as an
//! ordered list of [`Block`]s. Blocks and their [`Fragment`]s are immutable
//! once produced; edits are expressed by parsing new content and replacing the
//! block list wholesale, never by mutating in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Key used for blocks that carry no labels (global option blocks).
pub const GLOBAL_KEY: &str = "(global)";

/// Which origin a snapshot was collected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// The tool-managed copy of the configuration.
    Managed,
    /// The hand-maintained Caddyfile on disk.
    Caddyfile,
    /// The running server's live configuration.
    Live,
}

impl SourceKind {
    /// All source kinds in display order.
    pub const ALL: [SourceKind; 3] = [SourceKind::Managed, SourceKind::Caddyfile, SourceKind::Live];

    /// Stable identifier used in storage and machine output.
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Managed => "managed",
            SourceKind::Caddyfile => "caddyfile",
            SourceKind::Live => "live",
        }
    }

    /// Human-facing label.
    pub fn label(self) -> &'static str {
        match self {
            SourceKind::Managed => "steward",
            SourceKind::Caddyfile => "caddyfile",
            SourceKind::Live => "caddy live",
        }
    }

    /// Parse a stored identifier back into a kind.
    pub fn parse(value: &str) -> Option<SourceKind> {
        match value {
            "managed" => Some(SourceKind::Managed),
            "caddyfile" => Some(SourceKind::Caddyfile),
            "live" => Some(SourceKind::Live),
            _ => None,
        }
    }
}

/// Syntax role of a fragment within its block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    /// The header line up to and including the opening brace.
    Header,
    /// The interior body text between the braces.
    Body,
    /// The closing brace line.
    Footer,
    /// A pretty-printed JSON route object from the live configuration.
    JsonRoute,
    /// An entire JSON document wrapped into a single global block.
    JsonConfig,
}

impl FragmentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FragmentKind::Header => "header",
            FragmentKind::Body => "body",
            FragmentKind::Footer => "footer",
            FragmentKind::JsonRoute => "json_route",
            FragmentKind::JsonConfig => "json_config",
        }
    }

    pub fn parse(value: &str) -> Option<FragmentKind> {
        match value {
            "header" => Some(FragmentKind::Header),
            "body" => Some(FragmentKind::Body),
            "footer" => Some(FragmentKind::Footer),
            "json_route" => Some(FragmentKind::JsonRoute),
            "json_config" => Some(FragmentKind::JsonConfig),
            _ => None,
        }
    }
}

/// A contiguous, syntax-tagged slice of original formatting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub kind: FragmentKind,
    pub content: String,
}

impl Fragment {
    pub fn new(kind: FragmentKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
        }
    }
}

/// One configuration unit: a server block, a live route, or a global block.
///
/// `prelude` and `postlude` hold the whitespace and `#` comments surrounding
/// the block so that concatenating `prelude` + fragments + `postlude` across
/// all blocks reproduces the source text byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub labels: Vec<String>,
    pub is_global: bool,
    pub prelude: String,
    pub postlude: String,
    pub fragments: Vec<Fragment>,
}

impl Block {
    /// Reassemble this block's exact source text.
    pub fn text(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.prelude);
        for fragment in &self.fragments {
            out.push_str(&fragment.content);
        }
        out.push_str(&self.postlude);
        out
    }

    /// The sorted, deduplicated label tuple identifying this block's logical
    /// identity across snapshots. Label-less blocks map to [`GLOBAL_KEY`].
    pub fn canonical_key(&self) -> Vec<String> {
        canonical_label_key(self.labels.iter().map(String::as_str))
    }

    /// The first fragment carrying a JSON route payload, if any.
    pub fn first_json_route(&self) -> Option<&Fragment> {
        self.fragments
            .iter()
            .find(|fragment| fragment.kind == FragmentKind::JsonRoute)
    }

    /// All fragments carrying JSON route payloads, in order.
    pub fn json_route_fragments(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments
            .iter()
            .filter(|fragment| fragment.kind == FragmentKind::JsonRoute)
    }
}

/// Build a canonical block key from raw labels: trimmed, non-empty, sorted,
/// deduplicated, with [`GLOBAL_KEY`] standing in when nothing remains.
pub fn canonical_label_key<'a>(labels: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut cleaned: Vec<String> = labels
        .into_iter()
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect();
    if cleaned.is_empty() {
        cleaned.push(GLOBAL_KEY.to_string());
    }
    cleaned.sort();
    cleaned.dedup();
    cleaned
}

/// An entire configuration captured from one source kind at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub kind: SourceKind,
    /// Origin path or label (admin endpoint, editor, file path).
    pub source_path: Option<String>,
    /// Content hash of the raw source this snapshot was built from.
    pub source_hash: Option<String>,
    pub collected_at: DateTime<Utc>,
    pub blocks: Vec<Block>,
}

impl Snapshot {
    pub fn new(kind: SourceKind, blocks: Vec<Block>) -> Self {
        Self {
            kind,
            source_path: None,
            source_hash: None,
            collected_at: Utc::now(),
            blocks,
        }
    }

    /// Reassemble the full source text of this snapshot, block by block.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            out.push_str(&block.text());
        }
        out
    }
}

/// Deduplicate strings preserving first-seen order.
pub fn dedupe_preserve_order(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut ordered = Vec::new();
    for item in items {
        if seen.insert(item.clone()) {
            ordered.push(item);
        }
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_key_sorts_and_dedupes() {
        let key = canonical_label_key(["b.example", "a.example", " b.example "]);
        assert_eq!(key, vec!["a.example".to_string(), "b.example".to_string()]);
    }

    #[test]
    fn canonical_key_defaults_to_global() {
        let key = canonical_label_key(["", "   "]);
        assert_eq!(key, vec![GLOBAL_KEY.to_string()]);
    }

    #[test]
    fn block_text_concatenates_in_order() {
        let block = Block {
            labels: vec!["a.example".into()],
            is_global: false,
            prelude: "# lead\n".into(),
            postlude: "\n".into(),
            fragments: vec![
                Fragment::new(FragmentKind::Header, "a.example {"),
                Fragment::new(FragmentKind::Body, "\n}"),
            ],
        };
        assert_eq!(block.text(), "# lead\na.example {\n}\n");
    }

    #[test]
    fn source_kind_round_trips_through_str() {
        for kind in SourceKind::ALL {
            assert_eq!(SourceKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let out = dedupe_preserve_order(["b".to_string(), "a".to_string(), "b".to_string()]);
        assert_eq!(out, vec!["b".to_string(), "a".to_string()]);
    }
}
