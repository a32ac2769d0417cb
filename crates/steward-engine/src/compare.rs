//! Pairwise snapshot comparison.

use serde::Serialize;
use std::collections::BTreeSet;

use steward_config::{Snapshot, SourceKind};

use crate::adapter::AdaptationOracle;
use crate::digest::{block_digests, structural_digest};

/// Outcome of comparing two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonStatus {
    /// Both snapshots digest equal.
    Match,
    /// Both snapshots exist but their digests differ.
    Different,
    /// At least one side is absent.
    Missing,
}

impl ComparisonStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ComparisonStatus::Match => "match",
            ComparisonStatus::Different => "different",
            ComparisonStatus::Missing => "missing",
        }
    }
}

/// The result of comparing two snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub left_kind: SourceKind,
    pub right_kind: SourceKind,
    pub status: ComparisonStatus,
    /// Number of per-block digest keys that disagree; `None` when a side is
    /// absent.
    pub mismatch_count: Option<usize>,
    pub left_digest: Option<String>,
    pub right_digest: Option<String>,
}

/// Compare two snapshots by structural digest.
///
/// `scrub_paths` and `oracle` parameterize digesting exactly as in
/// [`structural_digest`]; pass the same values for both sides so the digests
/// are computed on the same basis.
pub fn compare_snapshots(
    left: Option<&Snapshot>,
    right: Option<&Snapshot>,
    left_kind: SourceKind,
    right_kind: SourceKind,
    scrub_paths: &[String],
    oracle: Option<&dyn AdaptationOracle>,
) -> Comparison {
    let (Some(left), Some(right)) = (left, right) else {
        return Comparison {
            left_kind,
            right_kind,
            status: ComparisonStatus::Missing,
            mismatch_count: None,
            left_digest: left.map(|snapshot| structural_digest(snapshot, scrub_paths, oracle)),
            right_digest: right.map(|snapshot| structural_digest(snapshot, scrub_paths, oracle)),
        };
    };

    let left_blocks = block_digests(left, scrub_paths, oracle);
    let right_blocks = block_digests(right, scrub_paths, oracle);
    let keys: BTreeSet<usize> = left_blocks.keys().chain(right_blocks.keys()).copied().collect();
    let mismatch_count = keys
        .into_iter()
        .filter(|key| left_blocks.get(key) != right_blocks.get(key))
        .count();

    let left_digest = structural_digest(left, scrub_paths, oracle);
    let right_digest = structural_digest(right, scrub_paths, oracle);
    let status = if left_digest == right_digest {
        ComparisonStatus::Match
    } else {
        ComparisonStatus::Different
    };

    Comparison {
        left_kind,
        right_kind,
        status,
        mismatch_count: Some(mismatch_count),
        left_digest: Some(left_digest),
        right_digest: Some(right_digest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use steward_config::{blocks_from_caddy_json, segment};

    fn live_snapshot(data: &serde_json::Value) -> Snapshot {
        Snapshot::new(SourceKind::Live, blocks_from_caddy_json(data))
    }

    fn text_snapshot(text: &str) -> Snapshot {
        Snapshot::new(SourceKind::Caddyfile, segment(text).unwrap())
    }

    #[test]
    fn missing_when_either_side_is_absent() {
        let snapshot = text_snapshot("a.example {\n}\n");
        let comparison = compare_snapshots(
            Some(&snapshot),
            None,
            SourceKind::Caddyfile,
            SourceKind::Live,
            &[],
            None,
        );
        assert_eq!(comparison.status, ComparisonStatus::Missing);
        assert_eq!(comparison.mismatch_count, None);
        assert!(comparison.left_digest.is_some());
        assert!(comparison.right_digest.is_none());
    }

    #[test]
    fn identical_snapshots_match_with_zero_mismatches() {
        let left = text_snapshot("a.example {\n  respond \"ok\"\n}\n");
        let right = text_snapshot("a.example {\n  respond \"ok\"\n}\n");
        let comparison = compare_snapshots(
            Some(&left),
            Some(&right),
            SourceKind::Managed,
            SourceKind::Caddyfile,
            &[],
            None,
        );
        assert_eq!(comparison.status, ComparisonStatus::Match);
        assert_eq!(comparison.mismatch_count, Some(0));
    }

    #[test]
    fn differing_blocks_are_counted() {
        let left = text_snapshot("a.example {\n  respond \"ok\"\n}\nb.example {\n}\n");
        let right = text_snapshot("a.example {\n  respond \"changed\"\n}\nb.example {\n}\n");
        let comparison = compare_snapshots(
            Some(&left),
            Some(&right),
            SourceKind::Managed,
            SourceKind::Caddyfile,
            &[],
            None,
        );
        assert_eq!(comparison.status, ComparisonStatus::Different);
        assert_eq!(comparison.mismatch_count, Some(1));
    }

    #[test]
    fn block_count_difference_counts_as_mismatch() {
        let left = text_snapshot("a.example {\n}\n");
        let right = text_snapshot("a.example {\n}\nb.example {\n}\n");
        let comparison = compare_snapshots(
            Some(&left),
            Some(&right),
            SourceKind::Managed,
            SourceKind::Caddyfile,
            &[],
            None,
        );
        assert_eq!(comparison.status, ComparisonStatus::Different);
        assert_eq!(comparison.mismatch_count, Some(1));
    }

    #[test]
    fn comparison_status_is_symmetric() {
        let left = text_snapshot("a.example {\n  respond \"ok\"\n}\n");
        let right = live_snapshot(&json!({
            "apps": {"http": {"servers": {"srv0": {"routes": [
                {"match": [{"host": ["a.example"]}], "handle": []}
            ]}}}}
        }));
        let cases: [(Option<&Snapshot>, Option<&Snapshot>); 3] = [
            (Some(&left), Some(&right)),
            (Some(&left), None),
            (None, None),
        ];
        for (a, b) in cases {
            let forward =
                compare_snapshots(a, b, SourceKind::Managed, SourceKind::Live, &[], None);
            let backward =
                compare_snapshots(b, a, SourceKind::Live, SourceKind::Managed, &[], None);
            assert_eq!(forward.status, backward.status);
        }
    }
}
