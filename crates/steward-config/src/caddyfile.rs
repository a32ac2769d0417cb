//! Caddyfile segmentation.
//!
//! The segmenter is intentionally conservative: it only tracks brace balance,
//! so it can capture the exact text of each server block while recording the
//! labels that appear in the header. Whitespace and `#` comments around blocks
//! are preserved through the per-block `prelude` and `postlude` fields, which
//! makes reconstruction byte-identical to the input.

use crate::error::{Error, Result};
use crate::model::{Block, Fragment, FragmentKind};

/// Segment Caddyfile text into ordered blocks.
///
/// Whitespace and comments between blocks attach to the preceding block's
/// `postlude`; text before the first block becomes that block's `prelude`. A
/// document without braces yields a single synthetic global block so its
/// content is retained. Unbalanced braces are fatal and produce no blocks.
pub fn segment(text: &str) -> Result<Vec<Block>> {
    let mut blocks: Vec<Block> = Vec::new();
    let (mut pos, mut pending) = consume_ws_and_comments(text, 0);

    while pos < text.len() {
        let Some(brace) = text[pos..].find('{').map(|offset| pos + offset) else {
            // No further blocks; the remainder stays with the preceding block.
            match blocks.last_mut() {
                Some(last) => last.postlude.push_str(&text[pos..]),
                None => pending.push_str(&text[pos..]),
            }
            break;
        };

        let labels = split_labels(&text[pos..brace]);
        let is_global = labels.is_empty();

        let closing = find_matching_brace(text, brace).ok_or(Error::UnbalancedBraces)?;

        let mut block = Block {
            labels,
            is_global,
            prelude: std::mem::take(&mut pending),
            postlude: String::new(),
            fragments: vec![
                Fragment::new(FragmentKind::Header, &text[pos..=brace]),
                Fragment::new(FragmentKind::Body, &text[brace + 1..closing]),
                Fragment::new(FragmentKind::Footer, &text[closing..=closing]),
            ],
        };

        pos = closing + 1;
        let (next, trailing) = consume_ws_and_comments(text, pos);
        pos = next;
        block.postlude = trailing;
        blocks.push(block);
    }

    if blocks.is_empty() && !pending.is_empty() {
        // Entire document is whitespace/comments (or brace-free text);
        // synthesize a block so the content is retained.
        blocks.push(Block {
            labels: Vec::new(),
            is_global: true,
            prelude: String::new(),
            postlude: pending,
            fragments: Vec::new(),
        });
    }

    Ok(blocks)
}

/// Reassemble segmented blocks back into source text.
pub fn reconstruct<'a>(blocks: impl IntoIterator<Item = &'a Block>) -> String {
    let mut out = String::new();
    for block in blocks {
        out.push_str(&block.text());
    }
    out
}

/// Parse text that must contain exactly one server block.
///
/// Synthetic whitespace-only blocks do not count, so trailing comments around
/// the edited block are accepted.
pub fn parse_single_block(text: &str) -> Result<Block> {
    let blocks = segment(text)?;
    let mut real: Vec<Block> = blocks
        .into_iter()
        .filter(|block| !block.fragments.is_empty())
        .collect();
    if real.len() != 1 {
        return Err(Error::NotSingleBlock { count: real.len() });
    }
    Ok(real.remove(0))
}

fn consume_ws_and_comments(text: &str, start: usize) -> (usize, String) {
    let bytes = text.as_bytes();
    let mut pos = start;
    let mut consumed = String::new();
    while pos < text.len() {
        match bytes[pos] {
            b' ' | b'\t' | b'\r' | b'\n' => {
                let run = pos;
                while pos < text.len() && matches!(bytes[pos], b' ' | b'\t' | b'\r' | b'\n') {
                    pos += 1;
                }
                consumed.push_str(&text[run..pos]);
            }
            b'#' => {
                let end = text[pos..]
                    .find('\n')
                    .map(|offset| pos + offset + 1)
                    .unwrap_or(text.len());
                consumed.push_str(&text[pos..end]);
                pos = end;
            }
            _ => break,
        }
    }
    (pos, consumed)
}

fn find_matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, ch) in text[open..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + idx);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_labels(header: &str) -> Vec<String> {
    header
        .split_whitespace()
        .flat_map(|part| part.split(','))
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn segments_single_block() {
        let text = "a.example {\n  respond \"ok\"\n}\n";
        let blocks = segment(text).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].labels, vec!["a.example".to_string()]);
        assert!(!blocks[0].is_global);
        assert_eq!(reconstruct(&blocks), text);
    }

    #[test]
    fn splits_labels_on_commas_and_whitespace() {
        let text = "a.example, b.example c.example {\n}\n";
        let blocks = segment(text).unwrap();
        assert_eq!(
            blocks[0].labels,
            vec![
                "a.example".to_string(),
                "b.example".to_string(),
                "c.example".to_string()
            ]
        );
    }

    #[test]
    fn global_block_has_no_labels() {
        let blocks = segment("{\n  debug\n}\n").unwrap();
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].is_global);
        assert!(blocks[0].labels.is_empty());
    }

    #[test]
    fn comments_between_blocks_attach_to_preceding_postlude() {
        let text = "a.example {\n}\n# note\n\nb.example {\n}\n";
        let blocks = segment(text).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].postlude, "\n# note\n\n");
        assert_eq!(blocks[1].prelude, "");
        assert_eq!(reconstruct(&blocks), text);
    }

    #[test]
    fn leading_comment_becomes_first_prelude() {
        let text = "# header comment\na.example {\n}\n";
        let blocks = segment(text).unwrap();
        assert_eq!(blocks[0].prelude, "# header comment\n");
        assert_eq!(reconstruct(&blocks), text);
    }

    #[test]
    fn nested_braces_stay_in_one_block() {
        let text = "a.example {\n  handle {\n    respond \"ok\"\n  }\n}\n";
        let blocks = segment(text).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(reconstruct(&blocks), text);
    }

    #[test]
    fn unbalanced_braces_fail() {
        let err = segment("a.example {\n  respond \"ok\"\n").unwrap_err();
        assert!(matches!(err, Error::UnbalancedBraces));
    }

    #[test]
    fn brace_free_document_becomes_synthetic_block() {
        let blocks = segment("# only a comment\n").unwrap();
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].is_global);
        assert!(blocks[0].fragments.is_empty());
        assert_eq!(blocks[0].postlude, "# only a comment\n");
    }

    #[test]
    fn empty_document_yields_no_blocks() {
        assert!(segment("").unwrap().is_empty());
    }

    #[test]
    fn parse_single_block_rejects_two_blocks() {
        let err = parse_single_block("a {\n}\nb {\n}\n").unwrap_err();
        assert!(matches!(err, Error::NotSingleBlock { count: 2 }));
    }

    #[test]
    fn parse_single_block_accepts_surrounding_comments() {
        let block = parse_single_block("# edited\na.example {\n}\n").unwrap();
        assert_eq!(block.labels, vec!["a.example".to_string()]);
    }
}
