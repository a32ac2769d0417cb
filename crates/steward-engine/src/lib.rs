//! Configuration reconciliation engine for steward.
//!
//! Pure, synchronous operations over snapshot values: structural digesting
//! and comparison across source kinds, cross-format adaptation through an
//! external oracle, token-overlap block matching for display, and drift
//! reporting against on-disk files. The engine owns no persistent state;
//! every call is a function of its explicit inputs.

pub mod adapter;
pub mod compare;
pub mod digest;
pub mod drift;
pub mod matcher;
pub mod view;

pub use adapter::{adapted_route_entries, AdaptError, AdaptationOracle};
pub use compare::{compare_snapshots, Comparison, ComparisonStatus};
pub use digest::{block_digests, normalize_route_json, sha256_hex, structural_digest, HIDE_SENTINEL};
pub use drift::{
    compare_file, summarize_drift, DriftReport, NoPrivilegedCopy, PrivilegedCopy, StagedCopy,
    MAX_DIFF_LINES,
};
pub use matcher::{block_tokens, match_blocks_by_tokens, MatchOutcome};
pub use view::{snapshot_block_views, BlockView};
