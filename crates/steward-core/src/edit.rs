//! Block-level editing of the managed snapshot.
//!
//! Edits are expressed as parse → replace block list → re-serialize: the
//! edited text is segmented again and the managed snapshot is replaced
//! wholesale, so formatting invariants hold by construction.

use steward_config::{reconstruct, segment, Block, SourceKind};
use steward_store::SnapshotStore;

use crate::error::Result;
use crate::export::render_config_text;
use crate::import::import_caddyfile_text;

/// Source label recorded when blocks are saved through the editor.
pub const EDITOR_SOURCE_LABEL: &str = "steward editor";

/// Load the managed snapshot as parsed blocks.
pub fn load_managed_blocks(store: &SnapshotStore) -> Result<Vec<Block>> {
    let text = render_config_text(store, SourceKind::Managed)?;
    if text.is_empty() {
        return Ok(Vec::new());
    }
    Ok(segment(&text)?)
}

/// Persist an edited block list back to the managed snapshot.
pub fn save_managed_blocks(store: &mut SnapshotStore, blocks: &[Block]) -> Result<()> {
    let text = reconstruct(blocks);
    import_caddyfile_text(
        store,
        &text,
        EDITOR_SOURCE_LABEL,
        SourceKind::Managed,
        Some(&[]),
        true,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use steward_config::{parse_single_block, Snapshot};

    #[test]
    fn edit_cycle_replaces_one_block() {
        let mut store = SnapshotStore::open_in_memory().unwrap();
        let config = store.ensure_config(None).unwrap();
        let snapshot = Snapshot::new(
            SourceKind::Managed,
            segment("a.example {\n  respond \"ok\"\n}\nb.example {\n}\n").unwrap(),
        );
        store.write_snapshot(config.id, &snapshot).unwrap();

        let mut blocks = load_managed_blocks(&store).unwrap();
        assert_eq!(blocks.len(), 2);

        let edited = parse_single_block("a.example {\n  respond \"changed\"\n}\n").unwrap();
        blocks[0] = edited;
        save_managed_blocks(&mut store, &blocks).unwrap();

        let reloaded = load_managed_blocks(&store).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded[0].text().contains("changed"));
        assert_eq!(reloaded[1].labels, vec!["b.example".to_string()]);
    }
}
