//! Round-trip guarantees for the Caddyfile segmenter.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use steward_config::{reconstruct, segment};

#[test]
fn clean_import_scenario() {
    let text = "a.example {\n  respond \"ok\"\n}\n";
    let blocks = segment(text).unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].labels, vec!["a.example".to_string()]);
    assert!(!blocks[0].is_global);
    assert_eq!(reconstruct(&blocks), text);
}

#[test]
fn comments_and_blank_lines_survive_reconstruction() {
    let text = "# managed by steward\n\na.example, b.example {\n\tencode gzip\n}\n\n# trailing note\n{\n\tdebug\n}\n\n";
    let blocks = segment(text).unwrap();
    assert_eq!(blocks.len(), 2);
    assert_eq!(reconstruct(&blocks), text);
}

#[test]
fn segmenting_twice_is_stable() {
    let text = "# lead\na.example {\n  respond \"ok\"\n}\n# tail\n";
    let once = segment(text).unwrap();
    let twice = segment(&reconstruct(&once)).unwrap();
    assert_eq!(once, twice);
}

fn ws_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "",
        "\n",
        "\n\n",
        "  \n",
        "\t\n",
        "# comment\n",
        "\n# note\n\n",
    ])
    .prop_map(str::to_string)
}

fn block_strategy() -> impl Strategy<Value = String> {
    (
        prop::collection::vec("[a-z][a-z0-9.]{0,8}", 0..3),
        "[ a-z0-9\\n\\t_\"./:-]{0,40}",
        ws_strategy(),
    )
        .prop_map(|(labels, body, trailing)| {
            let header = if labels.is_empty() {
                "{".to_string()
            } else {
                format!("{} {{", labels.join(", "))
            };
            format!("{header}{body}}}{trailing}")
        })
}

proptest! {
    #[test]
    fn reconstruction_is_byte_identical(
        leading in ws_strategy(),
        blocks in prop::collection::vec(block_strategy(), 0..5),
    ) {
        let text = format!("{leading}{}", blocks.concat());
        let segmented = segment(&text).unwrap();
        prop_assert_eq!(reconstruct(&segmented), text);
    }

    #[test]
    fn reconstruction_handles_nested_braces(
        label in "[a-z][a-z0-9.]{0,8}",
        inner in "[ a-z0-9\\n\\t_\"./:-]{0,20}",
        outer in "[ a-z0-9\\n\\t_\"./:-]{0,20}",
    ) {
        let text = format!("{label} {{\n{outer}handle {{\n{inner}}}\n}}\n");
        let segmented = segment(&text).unwrap();
        prop_assert_eq!(segmented.len(), 1);
        prop_assert_eq!(reconstruct(&segmented), text);
    }
}
