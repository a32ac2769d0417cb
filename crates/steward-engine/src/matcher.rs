//! Token-overlap correlation of blocks across snapshots.
//!
//! Live snapshots carry one block per route while text snapshots carry one
//! per server block, so label keys do not align 1:1. This matcher scores
//! token overlap instead: a simple greedy one-to-one assignment, not a full
//! bipartite solver — the domain only needs a reasonable display-time
//! correlation, and equality decisions are made by the digest engine.

use std::collections::{BTreeMap, BTreeSet};

use crate::view::BlockView;

/// Result of matching a source block list against a target block list.
#[derive(Debug)]
pub struct MatchOutcome<'a> {
    /// Source block index → matched target block.
    pub matches: BTreeMap<usize, &'a BlockView>,
    /// Target blocks no source block claimed, in target order.
    pub leftovers: Vec<&'a BlockView>,
}

/// Greedily assign each source block the best-scoring unclaimed target.
///
/// Ties break toward the lower target block index, so the assignment is
/// stable under reordering of the candidate list. A claimed candidate is
/// removed from the pool; blocks whose best score is zero stay unmatched.
pub fn match_blocks_by_tokens<'a>(
    sources: &[BlockView],
    targets: &'a [BlockView],
) -> MatchOutcome<'a> {
    if sources.is_empty() || targets.is_empty() {
        return MatchOutcome {
            matches: BTreeMap::new(),
            leftovers: targets.iter().collect(),
        };
    }

    let mut available: Vec<(&'a BlockView, String)> = targets
        .iter()
        .map(|target| (target, search_blob(target)))
        .collect();
    let mut matches = BTreeMap::new();

    for source in sources {
        let tokens = block_tokens(source);
        if tokens.is_empty() {
            continue;
        }
        let mut best: Option<(usize, f64, usize)> = None;
        for (pos, (candidate, blob)) in available.iter().enumerate() {
            let score = token_overlap_score(&tokens, blob);
            if score <= 0.0 {
                continue;
            }
            let better = match best {
                None => true,
                Some((_, best_score, best_index)) => {
                    score > best_score || (score == best_score && candidate.index < best_index)
                }
            };
            if better {
                best = Some((pos, score, candidate.index));
            }
        }
        if let Some((pos, _, _)) = best {
            let (candidate, _) = available.remove(pos);
            matches.insert(source.index, candidate);
        }
    }

    MatchOutcome {
        matches,
        leftovers: available.into_iter().map(|(candidate, _)| candidate).collect(),
    }
}

/// Lower-cased, deduplicated token set for a block.
pub fn block_tokens(view: &BlockView) -> BTreeSet<String> {
    let mut tokens = BTreeSet::new();
    let meta = &view.metadata;
    for values in [
        &meta.hosts,
        &meta.paths,
        &meta.groups,
        &meta.roots,
        &meta.dials,
        &meta.locations,
        &meta.encodings,
        &meta.status_codes,
        &meta.handlers,
        &view.key,
    ] {
        for value in values {
            let trimmed = value.trim().to_lowercase();
            if !trimmed.is_empty() {
                tokens.insert(trimmed);
            }
        }
    }
    tokens
}

/// One searchable blob per candidate: the same token fields plus the block's
/// rendered text as a fallback signal.
fn search_blob(view: &BlockView) -> String {
    let meta = &view.metadata;
    let mut segments: Vec<String> = Vec::new();
    for values in [
        &meta.hosts,
        &meta.paths,
        &meta.groups,
        &meta.roots,
        &meta.dials,
        &meta.locations,
        &meta.encodings,
        &meta.status_codes,
        &meta.handlers,
        &view.key,
    ] {
        for value in values {
            let trimmed = value.trim().to_lowercase();
            if !trimmed.is_empty() {
                segments.push(trimmed);
            }
        }
    }
    if !view.text.is_empty() {
        segments.push(view.text.to_lowercase());
    }
    segments.join("\n")
}

/// Fraction of source tokens found as substrings of the candidate blob.
fn token_overlap_score(tokens: &BTreeSet<String>, blob: &str) -> f64 {
    if tokens.is_empty() || blob.is_empty() {
        return 0.0;
    }
    let found = tokens
        .iter()
        .filter(|token| blob.contains(token.as_str()))
        .count();
    found as f64 / tokens.len() as f64
}
