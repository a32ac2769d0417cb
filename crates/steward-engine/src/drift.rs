//! Drift detection between generated configuration and an on-disk file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use similar::TextDiff;

use crate::digest::sha256_hex;

/// Unified diffs are bounded so a wildly divergent file cannot flood the
/// status output.
pub const MAX_DIFF_LINES: usize = 200;

const DIFF_TRUNCATION_MARKER: &str = "... diff truncated ...";

/// Staged-copy outcome from the privileged file collaborator.
#[derive(Debug, Clone, Default)]
pub struct StagedCopy {
    /// Path of a readable staged copy, when staging succeeded.
    pub staged: Option<PathBuf>,
    /// Printable command an operator could run by hand.
    pub command: Option<String>,
    /// Why staging failed, when it did.
    pub error: Option<String>,
}

/// External collaborator that can stage a readable copy of a root-owned file.
pub trait PrivilegedCopy {
    fn stage_copy(&self, source: &Path) -> StagedCopy;
}

/// A [`PrivilegedCopy`] that never stages anything. Permission failures then
/// surface directly in the drift report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrivilegedCopy;

impl PrivilegedCopy for NoPrivilegedCopy {
    fn stage_copy(&self, _source: &Path) -> StagedCopy {
        StagedCopy::default()
    }
}

/// Whether a target file matches the reconstructable configuration.
#[derive(Debug, Clone, Serialize)]
pub struct DriftReport {
    pub target_path: PathBuf,
    /// `Some(true)` in sync, `Some(false)` drifted, `None` unknown (an error
    /// prevented the comparison).
    pub in_sync: Option<bool>,
    pub generated_hash: Option<String>,
    pub target_hash: Option<String>,
    pub diff: Option<String>,
    pub error: Option<String>,
}

impl DriftReport {
    fn error_report(target_path: &Path, generated_hash: Option<String>, error: String) -> Self {
        Self {
            target_path: target_path.to_path_buf(),
            in_sync: None,
            generated_hash,
            target_hash: None,
            diff: None,
            error: Some(error),
        }
    }
}

/// Compare generated configuration text with the file at `target_path`.
///
/// Read failures never raise: not-found and other OS errors become report
/// errors with `in_sync` unknown, and permission-denied first tries the
/// privileged-copy collaborator before giving up with a remediation hint.
pub fn compare_file(
    generated_text: &str,
    target_path: &Path,
    helper: &dyn PrivilegedCopy,
) -> DriftReport {
    let generated_hash = sha256_hex(generated_text.as_bytes());

    let target_text = match std::fs::read_to_string(target_path) {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return DriftReport::error_report(
                target_path,
                Some(generated_hash),
                format!("No Caddyfile found at {}", target_path.display()),
            );
        }
        Err(err) if err.kind() == ErrorKind::PermissionDenied => {
            tracing::debug!(path = %target_path.display(), "permission denied, trying staged copy");
            let staged = helper.stage_copy(target_path);
            match staged.staged {
                Some(staged_path) => match std::fs::read_to_string(&staged_path) {
                    Ok(text) => text,
                    Err(err) => {
                        return DriftReport::error_report(
                            target_path,
                            Some(generated_hash),
                            format!("Unable to read {}: {err}", staged_path.display()),
                        );
                    }
                },
                None => {
                    let mut hint = staged.error.unwrap_or_else(|| {
                        format!("Permission denied reading {}", target_path.display())
                    });
                    if let Some(command) = staged.command {
                        hint = format!("{hint}. Run: {command}");
                    }
                    return DriftReport::error_report(target_path, Some(generated_hash), hint);
                }
            }
        }
        Err(err) => {
            return DriftReport::error_report(
                target_path,
                Some(generated_hash),
                format!("Unable to read {}: {err}", target_path.display()),
            );
        }
    };

    let target_hash = sha256_hex(target_text.as_bytes());

    if generated_hash == target_hash {
        return DriftReport {
            target_path: target_path.to_path_buf(),
            in_sync: Some(true),
            generated_hash: Some(generated_hash),
            target_hash: Some(target_hash),
            diff: None,
            error: None,
        };
    }

    let diff = unified_diff(&target_text, generated_text, target_path);

    DriftReport {
        target_path: target_path.to_path_buf(),
        in_sync: Some(false),
        generated_hash: Some(generated_hash),
        target_hash: Some(target_hash),
        diff: Some(diff),
        error: None,
    }
}

/// Unified line diff with the on-disk file as "before" and the generated
/// text as "after", truncated to [`MAX_DIFF_LINES`].
fn unified_diff(target_text: &str, generated_text: &str, target_path: &Path) -> String {
    let text_diff = TextDiff::from_lines(target_text, generated_text);
    let from = target_path.display().to_string();
    let full = text_diff
        .unified_diff()
        .context_radius(3)
        .header(&from, "generated")
        .to_string();

    let mut limited: Vec<&str> = Vec::new();
    for (index, line) in full.lines().enumerate() {
        if index >= MAX_DIFF_LINES {
            limited.push(DIFF_TRUNCATION_MARKER);
            break;
        }
        limited.push(line);
    }
    limited.join("\n")
}

/// One-line human summary of a drift report.
pub fn summarize_drift(report: &DriftReport) -> String {
    if let Some(error) = &report.error {
        return format!("Drift: {error}");
    }
    match report.in_sync {
        Some(true) => format!("Drift: {} matches the database", report.target_path.display()),
        Some(false) => format!(
            "Drift: differences detected for {}",
            report.target_path.display()
        ),
        None => "Drift: status unknown".to_string(),
    }
}
