//! Atomic file writes with advisory locking.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use fs2::FileExt;

/// Write content atomically via write-to-temp-then-rename.
///
/// The temp file lives in the target directory so the final rename stays on
/// one filesystem, and holds an advisory lock while being written.
pub fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = path.with_file_name(&temp_name);

    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)?;
    temp_file.lock_exclusive()?;
    temp_file.write_all(content)?;
    temp_file.sync_all()?;
    temp_file.unlock()?;

    fs::rename(&temp_path, path)
}

/// Write text content atomically.
pub fn write_text_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    write_atomic(path, content.as_bytes())
}
