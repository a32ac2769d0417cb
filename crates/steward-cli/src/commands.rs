//! Command implementations.
//!
//! Every command prints one JSON object on stdout so the output is
//! machine-readable; human-oriented detail goes through tracing.

use std::path::{Path, PathBuf};

use serde_json::json;

use steward_caddy::{reload_service, CaddyRunner, ConfigFormat, HelperRunner};
use steward_config::{pretty_json, SourceKind};
use steward_core::{
    collect_app_status, compare_caddyfile, generate_caddyfile, import_caddyfile,
    refresh_live_snapshot, render_config_text, store_current_version, version_info, StatusOptions,
};
use steward_engine::ComparisonStatus;
use steward_store::{write_text_atomic, AppPaths, Settings, SnapshotStore};

use crate::cli::OutputFormat;
use crate::error::{Error, Result};

struct AppContext {
    paths: AppPaths,
    settings: Settings,
    runner: CaddyRunner,
}

fn app_context() -> Result<AppContext> {
    let paths = AppPaths::from_env();
    paths.ensure_app_dir()?;
    let settings = Settings::load(&paths.settings_path())?;
    let runner = match &settings.caddy_bin {
        Some(bin) => CaddyRunner::new(Some(bin.clone())),
        None => CaddyRunner::from_env(),
    };
    Ok(AppContext {
        paths,
        settings,
        runner,
    })
}

fn emit(payload: serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string(&payload)?);
    Ok(())
}

pub fn run_init() -> Result<()> {
    let ctx = app_context()?;
    let store = SnapshotStore::open(&ctx.paths.db_path)?;
    store_current_version(&store)?;
    emit(json!({
        "status": "ok",
        "db_path": ctx.paths.db_path.display().to_string(),
    }))
}

pub fn run_import(caddyfile: Option<&Path>) -> Result<()> {
    let ctx = app_context()?;
    let mut store = SnapshotStore::open(&ctx.paths.db_path)?;
    let copier = HelperRunner::new(ctx.paths.cache_dir.clone());

    let summary = import_caddyfile(
        &mut store,
        &ctx.runner,
        &copier,
        caddyfile,
        SourceKind::Managed,
        None,
    )?;
    store_current_version(&store)?;
    emit(json!({
        "status": "ok",
        "source": summary.source_path.display().to_string(),
        "sites": summary.site_labels,
        "site_count": summary.site_count,
    }))?;
    drop(store);

    refresh_live_snapshot(&ctx.paths, &ctx.settings, &ctx.runner);
    Ok(())
}

pub fn run_apply(output: Option<&Path>, format: OutputFormat) -> Result<()> {
    let ctx = app_context()?;
    let store = SnapshotStore::open(&ctx.paths.db_path)?;

    let (target, config_format) = generate_output(&ctx, &store, output, format)?;
    ctx.runner.validate(&target, config_format)?;
    match ctx.settings.reload_mode.as_deref() {
        Some("helper") => {
            let outcome = reload_service(None);
            if !outcome.success {
                return Err(Error::Reload(
                    outcome
                        .error
                        .unwrap_or_else(|| "helper reload failed".to_string()),
                ));
            }
        }
        _ => ctx.runner.reload(&target, config_format)?,
    }
    store_current_version(&store)?;
    emit(json!({
        "status": "ok",
        "format": config_format.as_str(),
        "output": target.display().to_string(),
    }))?;
    drop(store);

    refresh_live_snapshot(&ctx.paths, &ctx.settings, &ctx.runner);
    Ok(())
}

pub fn run_validate(format: OutputFormat) -> Result<()> {
    let ctx = app_context()?;
    let store = SnapshotStore::open(&ctx.paths.db_path)?;

    let (target, config_format) = generate_output(&ctx, &store, None, format)?;
    ctx.runner.validate(&target, config_format)?;
    store_current_version(&store)?;
    emit(json!({
        "status": "ok",
        "format": config_format.as_str(),
        "output": target.display().to_string(),
    }))
}

fn generate_output(
    ctx: &AppContext,
    store: &SnapshotStore,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<(PathBuf, ConfigFormat)> {
    match format {
        OutputFormat::Caddyfile => {
            let target = output
                .map(Path::to_path_buf)
                .unwrap_or_else(|| ctx.paths.generated_caddyfile.clone());
            generate_caddyfile(store, &ctx.paths, &target, SourceKind::Managed)?;
            Ok((target, ConfigFormat::Caddyfile))
        }
        OutputFormat::Json => {
            let target = output
                .map(Path::to_path_buf)
                .unwrap_or_else(|| ctx.paths.generated_json.clone());
            let text = render_config_text(store, SourceKind::Managed)?;
            let document = if text.trim().is_empty() {
                json!({})
            } else {
                // The caddy binary itself is the Caddyfile-to-JSON converter.
                let staged = ctx.paths.ensure_cache_dir()?.join("adapt-input");
                write_text_atomic(&staged, &text)?;
                ctx.runner.adapt_config(&staged)?
            };
            write_text_atomic(&target, &format!("{}\n", pretty_json(&document)))?;
            Ok((target, ConfigFormat::Json))
        }
    }
}

pub fn run_status(caddyfile: Option<&Path>, diff: bool, refresh_live: bool) -> Result<()> {
    let ctx = app_context()?;

    if let Some(path) = caddyfile {
        let mut store = SnapshotStore::open(&ctx.paths.db_path)?;
        let copier = HelperRunner::new(ctx.paths.cache_dir.clone());
        import_caddyfile(
            &mut store,
            &ctx.runner,
            &copier,
            Some(path),
            SourceKind::Caddyfile,
            Some(&[]),
        )?;
    }

    let status = collect_app_status(
        &ctx.paths,
        &ctx.settings,
        &ctx.runner,
        &StatusOptions {
            refresh_sources: true,
            refresh_live,
            check_service: true,
        },
    );

    let target = caddyfile
        .map(Path::to_path_buf)
        .or_else(|| status.last_import_path.as_ref().map(PathBuf::from))
        .ok_or(Error::NoComparisonTarget)?;

    let mut payload = json!({
        "status": "ok",
        "db_ready": status.db_ready,
        "block_count": status.block_count,
        "service": &status.service_status,
        "snapshots": &status.snapshots,
        "comparisons": &status.comparisons,
        "target": target.display().to_string(),
    });

    let mut drift_in_sync = None;
    if diff {
        let store = SnapshotStore::open(&ctx.paths.db_path)?;
        let copier = HelperRunner::new(ctx.paths.cache_dir.clone());
        let report = compare_caddyfile(&store, &target, &copier);
        if let Some(error) = report.error {
            return Err(Error::Drift(error));
        }
        payload["in_sync"] = json!(report.in_sync);
        payload["generated_hash"] = json!(report.generated_hash);
        payload["target_hash"] = json!(report.target_hash);
        payload["diff_included"] = json!(report.diff.is_some());
        if let Some(diff_text) = report.diff {
            payload["diff"] = json!(diff_text);
        }
        drift_in_sync = report.in_sync;
    }

    let drift_detected = status.comparisons.iter().any(|comparison| {
        comparison.status == ComparisonStatus::Different
            && (comparison.left_kind == SourceKind::Managed
                || comparison.right_kind == SourceKind::Managed)
    });
    if !diff {
        payload["in_sync"] = json!(!drift_detected);
    }

    emit(payload)?;

    if drift_in_sync == Some(false) || (drift_in_sync.is_none() && drift_detected) {
        std::process::exit(1);
    }
    Ok(())
}

pub fn run_refresh_live() -> Result<()> {
    let ctx = app_context()?;
    let status = refresh_live_snapshot(&ctx.paths, &ctx.settings, &ctx.runner);

    let live = status
        .snapshots
        .iter()
        .find(|info| info.kind == SourceKind::Live);
    let mut payload = json!({
        "status": "ok",
        "live_available": live.map(|info| info.available).unwrap_or(false),
        "live_error": live.and_then(|info| info.error.clone()),
    });
    if let Some(service) = &status.service_status {
        payload["service_state"] = json!(service.state);
        payload["service_detail"] = json!(service.detail);
        payload["service_block_count"] = json!(service.block_count);
        payload["service_source"] = json!(service.source);
        payload["service_error"] = json!(service.error);
    }
    emit(payload)
}

pub fn run_version() -> Result<()> {
    let info = version_info(None);
    emit(json!({
        "status": "ok",
        "current_version": info.current,
        "latest_version": info.latest,
        "update_available": info.update_available,
        "source": info.source,
    }))
}
