//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into [`crate::CheckService`].
//! Nothing in the core reads environment variables; the binaries do that and hand the parsed
//! values to the helpers below.

use crate::{CheckError, CheckResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    grid_root: PathBuf,
    federated_grid_root: Option<PathBuf>,
    remote_use_grid: bool,
    catalog_path: PathBuf,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    pub fn new(
        grid_root: PathBuf,
        federated_grid_root: Option<PathBuf>,
        remote_use_grid: bool,
        catalog_path: PathBuf,
    ) -> CheckResult<Self> {
        if grid_root.as_os_str().is_empty() {
            return Err(CheckError::InvalidInput("grid_root cannot be empty".into()));
        }
        if catalog_path.as_os_str().is_empty() {
            return Err(CheckError::InvalidInput(
                "catalog_path cannot be empty".into(),
            ));
        }

        Ok(Self {
            grid_root,
            federated_grid_root,
            remote_use_grid,
            catalog_path,
        })
    }

    /// Mount directory of the default data grid.
    pub fn grid_root(&self) -> &Path {
        &self.grid_root
    }

    /// Mount directory of the federated data grid, if one is configured.
    pub fn federated_grid_root(&self) -> Option<&Path> {
        self.federated_grid_root.as_deref()
    }

    /// Whether federated resources are checked at all.
    pub fn remote_use_grid(&self) -> bool {
        self.remote_use_grid
    }

    pub fn catalog_path(&self) -> &Path {
        &self.catalog_path
    }
}

/// Parse the federated-check switch from an optional string value.
///
/// If `value` is `None` or empty/whitespace, federated resources are skipped.
pub fn remote_use_grid_from_env_value(value: Option<String>) -> CheckResult<bool> {
    let Some(value) = value.map(|v| v.trim().to_ascii_lowercase()) else {
        return Ok(false);
    };

    match value.as_str() {
        "" | "0" | "false" | "no" | "off" => Ok(false),
        "1" | "true" | "yes" | "on" => Ok(true),
        other => Err(CheckError::InvalidInput(format!(
            "remote_use_grid must be a boolean, got '{}'",
            other
        ))),
    }
}

/// Resolve a path setting, falling back to `default` when unset or blank.
pub fn path_from_env_value(value: Option<String>, default: &str) -> PathBuf {
    optional_path_from_env_value(value).unwrap_or_else(|| PathBuf::from(default))
}

/// Resolve an optional path setting; unset and blank values are both absent.
pub fn optional_path_from_env_value(value: Option<String>) -> Option<PathBuf> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
