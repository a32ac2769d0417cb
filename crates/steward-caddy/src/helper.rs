//! Privileged helper invocation.
//!
//! Elevated filesystem and service operations go through a small setuid-free
//! helper executable wrapped in sudo. Failures never raise: every operation
//! returns the printable command (so operators can re-run it by hand) plus
//! the error detail.

use std::path::{Path, PathBuf};
use std::process::Command;

use steward_engine::{PrivilegedCopy, StagedCopy};

const DEFAULT_HELPER_BIN: &str = "steward-helper";
const DEFAULT_SUDO_BIN: &str = "sudo";

/// Outcome of a helper operation that either succeeds or fails.
#[derive(Debug, Clone)]
pub struct HelperOutcome {
    pub success: bool,
    pub command: Option<String>,
    pub error: Option<String>,
}

/// Outcome of the service `status` query.
#[derive(Debug, Clone)]
pub struct ServiceQuery {
    /// Normalized lowercase state reported by the service manager.
    pub state: Option<String>,
    pub command: Option<String>,
    pub error: Option<String>,
}

/// Copy a root-owned configuration file into the cache via the helper.
pub fn stage_config_copy(source: &Path, cache_dir: &Path, interactive: bool) -> StagedCopy {
    let staged = cache_dir
        .join("mirrors")
        .join(format!(
            "{}.{}",
            source
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "config".to_string()),
            chrono::Utc::now().timestamp()
        ));
    if let Some(parent) = staged.parent() {
        if let Err(err) = std::fs::create_dir_all(parent) {
            return StagedCopy {
                staged: None,
                command: None,
                error: Some(format!("unable to create cache dir: {err}")),
            };
        }
    }

    let args = match base_command(!interactive) {
        Ok(mut args) => {
            args.extend([
                "mirror".to_string(),
                "--source".to_string(),
                source.display().to_string(),
                "--dest".to_string(),
                staged.display().to_string(),
            ]);
            args
        }
        Err(err) => {
            return StagedCopy {
                staged: None,
                command: None,
                error: Some(err),
            };
        }
    };

    match run_helper(&args) {
        Ok((command, _)) => StagedCopy {
            staged: Some(staged),
            command: Some(command),
            error: None,
        },
        Err((command, error)) => StagedCopy {
            staged: None,
            command: Some(command),
            error: Some(error),
        },
    }
}

/// A [`PrivilegedCopy`] collaborator backed by the sudo-wrapped helper.
#[derive(Debug, Clone)]
pub struct HelperRunner {
    cache_dir: PathBuf,
    interactive: bool,
}

impl HelperRunner {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            interactive: false,
        }
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }
}

impl PrivilegedCopy for HelperRunner {
    fn stage_copy(&self, source: &Path) -> StagedCopy {
        stage_config_copy(source, &self.cache_dir, self.interactive)
    }
}

/// Install a generated file at a privileged destination.
pub fn install_generated_file(source: &Path, dest: &Path, mode: u32) -> HelperOutcome {
    run_simple(&[
        "install".to_string(),
        "--source".to_string(),
        source.display().to_string(),
        "--dest".to_string(),
        dest.display().to_string(),
        "--mode".to_string(),
        format!("{mode:o}"),
    ])
}

/// Reload the caddy service through the helper.
pub fn reload_service(command_override: Option<&str>) -> HelperOutcome {
    run_simple(&service_args("reload", command_override))
}

/// Query the service manager for the caddy service state.
pub fn check_service(command_override: Option<&str>) -> ServiceQuery {
    let args = match base_command(true) {
        Ok(mut args) => {
            args.extend(service_args("status", command_override));
            args
        }
        Err(err) => {
            return ServiceQuery {
                state: None,
                command: None,
                error: Some(err),
            };
        }
    };
    match run_helper(&args) {
        Ok((command, output)) => {
            let normalized = output.to_lowercase();
            ServiceQuery {
                state: Some(if normalized.is_empty() {
                    "unknown".to_string()
                } else {
                    normalized
                }),
                command: Some(command),
                error: None,
            }
        }
        Err((command, error)) => ServiceQuery {
            state: None,
            command: Some(command),
            error: Some(error),
        },
    }
}

fn service_args(action: &str, command_override: Option<&str>) -> Vec<String> {
    let mut args = vec![action.to_string()];
    if let Some(command) = command_override {
        args.extend(["--command".to_string(), command.to_string()]);
    }
    args
}

fn run_simple(helper_args: &[String]) -> HelperOutcome {
    let args = match base_command(true) {
        Ok(mut args) => {
            args.extend(helper_args.iter().cloned());
            args
        }
        Err(err) => {
            return HelperOutcome {
                success: false,
                command: None,
                error: Some(err),
            };
        }
    };
    match run_helper(&args) {
        Ok((command, _)) => HelperOutcome {
            success: true,
            command: Some(command),
            error: None,
        },
        Err((command, error)) => HelperOutcome {
            success: false,
            command: Some(command),
            error: Some(error),
        },
    }
}

fn base_command(non_interactive: bool) -> Result<Vec<String>, String> {
    let sudo = std::env::var("STEWARD_SUDO_BIN").unwrap_or_else(|_| DEFAULT_SUDO_BIN.to_string());
    if find_in_path(&sudo).is_none() && !Path::new(&sudo).is_file() {
        return Err(format!("Unable to locate sudo executable '{sudo}'"));
    }
    let helper = resolve_helper_bin()?;
    let mut command = vec![sudo];
    if non_interactive {
        command.push("-n".to_string());
    }
    command.push(helper);
    Ok(command)
}

fn resolve_helper_bin() -> Result<String, String> {
    let helper =
        std::env::var("STEWARD_HELPER_BIN").unwrap_or_else(|_| DEFAULT_HELPER_BIN.to_string());
    let helper_path = Path::new(&helper);
    if helper_path.is_absolute() {
        if helper_path.exists() {
            return Ok(helper);
        }
        return Err(format!("Helper executable '{helper}' does not exist"));
    }
    match find_in_path(&helper) {
        Some(located) => Ok(located.display().to_string()),
        None => Err(format!("Unable to locate helper executable '{helper}' in PATH")),
    }
}

fn run_helper(args: &[String]) -> Result<(String, String), (String, String)> {
    let printable = printable_command(args);
    tracing::debug!(command = %printable, "invoking privileged helper");
    let output = Command::new(&args[0]).args(&args[1..]).output();
    match output {
        Err(err) => Err((printable, err.to_string())),
        Ok(output) if !output.status.success() => {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            let detail = if !stderr.is_empty() {
                stderr
            } else if !stdout.is_empty() {
                stdout
            } else {
                "helper command failed".to_string()
            };
            Err((printable, detail))
        }
        Ok(output) => Ok((
            printable,
            String::from_utf8_lossy(&output.stdout).trim().to_string(),
        )),
    }
}

/// Join arguments into a copy-pasteable shell command.
fn printable_command(args: &[String]) -> String {
    args.iter()
        .map(|arg| shell_quote(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || "-_./:=@%+,".contains(ch));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}
