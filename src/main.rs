use serde::Serialize;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gridcheck_core::config::{
    optional_path_from_env_value, path_from_env_value, remote_use_grid_from_env_value,
};
use gridcheck_core::constants::{
    CATALOG_ENV, DEFAULT_CATALOG_FILENAME, DEFAULT_GRID_ROOT, FEDERATED_GRID_ROOT_ENV,
    GRID_ROOT_ENV, REMOTE_USE_GRID_ENV,
};
use gridcheck_core::{CheckOptions, CheckService, CoreConfig, ResourceCatalog, RunSummary};

/// One-line outcome printed when the run finishes.
#[derive(Debug, Serialize)]
struct BatchOutcome<'a> {
    resources_checked: usize,
    total_errors: usize,
    affected: Vec<&'a str>,
    aborted: Vec<&'a str>,
    elapsed_ms: i64,
}

impl<'a> From<&'a RunSummary> for BatchOutcome<'a> {
    fn from(summary: &'a RunSummary) -> Self {
        Self {
            resources_checked: summary.resources_checked,
            total_errors: summary.total_errors,
            affected: summary.affected.iter().map(|id| id.as_str()).collect(),
            aborted: summary.aborted.iter().map(|id| id.as_str()).collect(),
            elapsed_ms: (summary.finished_at - summary.started_at).num_milliseconds(),
        }
    }
}

/// Resolve the core configuration from environment values.
fn config_from_env() -> anyhow::Result<CoreConfig> {
    let env = |key: &str| std::env::var(key).ok();

    Ok(CoreConfig::new(
        path_from_env_value(env(GRID_ROOT_ENV), DEFAULT_GRID_ROOT),
        optional_path_from_env_value(env(FEDERATED_GRID_ROOT_ENV)),
        remote_use_grid_from_env_value(env(REMOTE_USE_GRID_ENV))?,
        path_from_env_value(env(CATALOG_ENV), DEFAULT_CATALOG_FILENAME),
    )?)
}

/// Batch check of every resource in the catalog
///
/// Diagnostics go to the process log only. The process exits non-zero when any resource
/// diverges from the data grid, so the runner can be scheduled and alerted on.
///
/// # Environment Variables
/// - `GRIDCHECK_GRID_ROOT`: data-grid mount directory (default: "grid")
/// - `GRIDCHECK_FEDERATED_GRID_ROOT`: federated data-grid mount directory (optional)
/// - `GRIDCHECK_REMOTE_USE_GRID`: check federated resources too (default: false)
/// - `GRIDCHECK_CATALOG`: resource catalog file (default: "resources.yaml")
fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gridcheck=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Arc::new(config_from_env()?);
    tracing::info!("++ Checking catalog {}", cfg.catalog_path().display());
    tracing::info!("++ Data grid mounted at {}", cfg.grid_root().display());

    let catalog = ResourceCatalog::load(cfg.catalog_path())?;
    let service = CheckService::from_config(cfg)?;

    let options = CheckOptions {
        stop_on_error: false,
        log_errors: true,
        echo_errors: false,
        return_errors: false,
    };
    let summary = service.check_all(catalog.iter(), options)?;

    println!("{}", serde_json::to_string(&BatchOutcome::from(&summary))?);

    if summary.is_consistent() {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::error!(
            "{} errors in {} resources",
            summary.total_errors,
            summary.affected.len()
        );
        Ok(ExitCode::FAILURE)
    }
}
