//! Configuration model and normalizers for steward.
//!
//! This crate defines the block abstraction shared by every configuration
//! source and the two normalizers that converge on it:
//!
//! - [`caddyfile`] segments Caddyfile text into blocks while preserving the
//!   exact surrounding formatting, so reconstruction is byte-identical.
//! - [`json_routes`] turns a live Caddy JSON document into the same block
//!   shape, one block per HTTP route.
//!
//! [`render`] goes the other way, decompiling JSON route payloads into
//! Caddyfile-style text for human review, and [`metadata`] extracts the
//! content-derived signals used to correlate blocks across sources.

pub mod caddyfile;
pub mod error;
pub mod json_routes;
pub mod metadata;
pub mod model;
pub mod render;
pub mod site;

pub use caddyfile::{parse_single_block, reconstruct, segment};
pub use error::{Error, Result};
pub use json_routes::{blocks_from_caddy_json, pretty_json, string_values};
pub use metadata::RouteMetadata;
pub use model::{
    canonical_label_key, dedupe_preserve_order, Block, Fragment, FragmentKind, Snapshot,
    SourceKind, GLOBAL_KEY,
};
pub use render::render_live_block;
pub use site::SiteAddress;
