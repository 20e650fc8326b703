//! # gridcheck Core
//!
//! Consistency checking between a repository database and the data grid that stores resource
//! files.
//!
//! This crate contains the checking logic only:
//! - resolution of legacy recorded names into canonical data-grid paths
//! - inference of each file record's effective path, with diagnostics
//! - the three-step reconciliation of a resource (records, storage, root)
//! - the resource catalog, dumps and reports
//!
//! **No I/O concerns beyond the grid**: where diagnostics go is decided by the caller through
//! a [`DiagnosticSink`], and grid access goes through [`gridcheck_storage::DataGrid`].

pub mod catalog;
pub mod config;
pub mod constants;
pub mod diagnostics;
pub mod dump;
mod error;
pub mod inference;
pub mod paths;
pub mod reconcile;
pub mod report;
pub mod resolver;
pub mod resource;

pub use catalog::ResourceCatalog;
pub use config::CoreConfig;
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticRouter, DiagnosticSink, Severity};
pub use error::{CheckError, CheckResult};
pub use reconcile::{CheckOptions, Reconciler};
pub use report::{CheckReport, RunSummary};
pub use resolver::{PathResolver, ResolveError};
pub use resource::{FileName, FileRecord, Resource};

use chrono::Utc;
use gridcheck_storage::{GridRegistry, LocalGrid, StorageError};
use std::io::Write;
use std::sync::Arc;

/// Checks resources against the data grid.
///
/// Cheap to clone and `Send + Sync`, so callers may check resources from several threads.
#[derive(Clone, Debug)]
pub struct CheckService {
    cfg: Arc<CoreConfig>,
    grids: GridRegistry,
}

impl CheckService {
    pub fn new(cfg: Arc<CoreConfig>, grids: GridRegistry) -> Self {
        Self { cfg, grids }
    }

    /// Builds a service over filesystem-mounted grids at the configured roots.
    ///
    /// # Errors
    ///
    /// Returns `CheckError::Storage` if a configured mount directory is invalid.
    pub fn from_config(cfg: Arc<CoreConfig>) -> CheckResult<Self> {
        let mut grids = GridRegistry::new(Arc::new(LocalGrid::new(cfg.grid_root())?));
        if let Some(federated_root) = cfg.federated_grid_root() {
            grids = grids.with_federated(Arc::new(LocalGrid::new(federated_root)?));
        }
        Ok(Self::new(cfg, grids))
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    /// Checks one resource, routing diagnostics as `options` select.
    ///
    /// # Errors
    ///
    /// Returns `CheckError::ValidationFailure` on the first counted error when
    /// `options.stop_on_error` is set.
    pub fn check(&self, resource: &Resource, options: CheckOptions) -> CheckResult<CheckReport> {
        let mut router = DiagnosticRouter::from_options(&options);
        let error_count = self.check_with_sink(resource, options.stop_on_error, &mut router)?;
        let diagnostics = router.into_collected();
        let errors = diagnostics
            .iter()
            .filter(|d| d.counted)
            .map(|d| d.message.clone())
            .collect();

        Ok(CheckReport {
            short_id: resource.short_id.clone(),
            error_count,
            errors,
            diagnostics,
            summary: (error_count > 0).then(|| reconcile::affected_summary(resource)),
            checked_at: Utc::now(),
        })
    }

    /// Checks one resource, emitting every diagnostic to `sink`. Returns the error count.
    pub fn check_with_sink(
        &self,
        resource: &Resource,
        stop_on_error: bool,
        sink: &mut dyn DiagnosticSink,
    ) -> CheckResult<usize> {
        let options = CheckOptions {
            stop_on_error,
            ..CheckOptions::default()
        };
        Reconciler::new(&self.cfg, &self.grids).check(resource, &options, sink)
    }

    /// Checks every resource in turn.
    ///
    /// A resource stopped by `stop_on_error` is recorded as aborted with one error and the run
    /// continues with the next resource.
    pub fn check_all<'r>(
        &self,
        resources: impl IntoIterator<Item = &'r Resource>,
        options: CheckOptions,
    ) -> CheckResult<RunSummary> {
        let started_at = Utc::now();
        let mut summary = RunSummary {
            resources_checked: 0,
            total_errors: 0,
            affected: Vec::new(),
            aborted: Vec::new(),
            reports: Vec::new(),
            started_at,
            finished_at: started_at,
        };

        for resource in resources {
            summary.resources_checked += 1;
            match self.check(resource, options) {
                Ok(report) => {
                    if report.error_count > 0 {
                        summary.affected.push(resource.short_id.clone());
                    }
                    summary.total_errors += report.error_count;
                    summary.reports.push(report);
                }
                Err(CheckError::ValidationFailure(msg)) => {
                    tracing::warn!("check of {} stopped: {}", resource.short_id, msg);
                    summary.total_errors += 1;
                    summary.affected.push(resource.short_id.clone());
                    summary.aborted.push(resource.short_id.clone());
                }
                Err(e) => return Err(e),
            }
        }

        summary.finished_at = Utc::now();
        tracing::info!(
            "checked {} resources, {} errors in {} resources",
            summary.resources_checked,
            summary.total_errors,
            summary.affected.len()
        );
        Ok(summary)
    }

    /// Whether the root collection of `resource` exists.
    pub fn root_exists(&self, resource: &Resource) -> Result<bool, StorageError> {
        self.grids
            .for_zone(resource.is_federated())
            .exists(&paths::root_path(resource))
    }

    /// Writes the database names and data-grid tree of `resource` to `out`.
    pub fn dump(&self, resource: &Resource, out: &mut dyn Write) -> CheckResult<()> {
        let grid = self.grids.for_zone(resource.is_federated());
        dump::dump_resource(resource, grid, out).map_err(CheckError::Output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridcheck_storage::MemoryGrid;
    use gridcheck_types::{FederationPath, ShortId};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn config() -> Arc<CoreConfig> {
        Arc::new(
            CoreConfig::new(
                PathBuf::from("grid"),
                None,
                false,
                PathBuf::from("resources.yaml"),
            )
            .unwrap(),
        )
    }

    fn service(grid: MemoryGrid) -> CheckService {
        CheckService::new(config(), GridRegistry::new(Arc::new(grid)))
    }

    fn resource(id: &str) -> Resource {
        Resource::new(ShortId::new(id).unwrap()).with_title("CompositeResource", "Rivers")
    }

    fn collecting() -> CheckOptions {
        CheckOptions {
            stop_on_error: false,
            log_errors: false,
            echo_errors: false,
            return_errors: true,
        }
    }

    #[test]
    fn returned_errors_match_the_count() {
        let grid = MemoryGrid::new()
            .with_file("abc/data/contents/a")
            .with_file("abc/data/contents/b/c");
        let resource = resource("abc")
            .with_file(FileRecord::local("a"))
            .with_file(FileRecord::local("missing"));

        let report = service(grid).check(&resource, collecting()).unwrap();

        assert_eq!(report.error_count, 2);
        assert_eq!(report.errors.len(), report.error_count);
        assert!(!report.is_consistent());
        assert_eq!(
            report.summary.as_deref(),
            Some("affected resource abc type is CompositeResource, title is 'Rivers'")
        );
        assert!(report
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::AffectedResource));
    }

    #[test]
    fn errors_are_not_returned_unless_requested() {
        let grid = MemoryGrid::new().with_file("abc/data/contents/stray");

        let report = service(grid)
            .check(
                &resource("abc"),
                CheckOptions {
                    log_errors: false,
                    ..CheckOptions::default()
                },
            )
            .unwrap();

        assert_eq!(report.error_count, 1);
        assert!(report.errors.is_empty());
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn consistent_resource_has_clean_report() {
        let grid = MemoryGrid::new().with_file("abc/data/contents/a");
        let resource = resource("abc").with_file(FileRecord::local("a"));

        let report = service(grid).check(&resource, collecting()).unwrap();

        assert!(report.is_consistent());
        assert!(report.errors.is_empty());
        assert_eq!(report.summary, None);
    }

    #[test]
    fn check_all_continues_past_aborted_resources() {
        let grid = MemoryGrid::new()
            .with_dir("good/data/contents")
            .with_dir("bad/data/contents")
            .with_file("bad/data/contents/one")
            .with_file("bad/data/contents/two");
        let resources = vec![resource("bad"), resource("good")];
        let options = CheckOptions {
            stop_on_error: true,
            ..collecting()
        };

        let summary = service(grid).check_all(&resources, options).unwrap();

        assert_eq!(summary.resources_checked, 2);
        assert_eq!(summary.total_errors, 1);
        assert_eq!(summary.aborted, vec![ShortId::new("bad").unwrap()]);
        assert_eq!(summary.affected, vec![ShortId::new("bad").unwrap()]);
        assert_eq!(summary.reports.len(), 1);
        assert_eq!(summary.reports[0].short_id.as_str(), "good");
        assert!(!summary.is_consistent());
    }

    #[test]
    fn root_exists_uses_the_resource_zone() {
        let default = MemoryGrid::new().with_dir("abc");
        let federated = MemoryGrid::new().with_dir("/zone/home/proxy/def");
        let service = CheckService::new(
            config(),
            GridRegistry::new(Arc::new(default)).with_federated(Arc::new(federated)),
        );
        let fed = resource("def")
            .with_federation_path(FederationPath::new("/zone/home/proxy").unwrap());

        assert!(service.root_exists(&resource("abc")).unwrap());
        assert!(!service.root_exists(&resource("xyz")).unwrap());
        assert!(service.root_exists(&fed).unwrap());
    }

    #[test]
    fn dump_writes_to_the_given_writer() {
        let grid = MemoryGrid::new().with_file("abc/data/contents/a");
        let mut out = Vec::new();

        service(grid).dump(&resource("abc"), &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("contents of abc\n"));
        assert!(text.contains("  a (file)\n"));
    }

    #[test]
    fn from_config_mounts_local_grids() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("abc").join("data").join("contents")).unwrap();
        fs::write(
            temp.path().join("abc").join("data").join("contents").join("a.txt"),
            b"a",
        )
        .unwrap();
        let cfg = Arc::new(
            CoreConfig::new(
                temp.path().to_path_buf(),
                None,
                false,
                temp.path().join("resources.yaml"),
            )
            .unwrap(),
        );

        let service = CheckService::from_config(cfg).unwrap();
        let resource = resource("abc").with_file(FileRecord::local("a.txt"));
        let report = service.check(&resource, collecting()).unwrap();

        assert_eq!(report.error_count, 0);
    }

    #[test]
    fn from_config_rejects_missing_mount() {
        let temp = TempDir::new().unwrap();
        let cfg = Arc::new(
            CoreConfig::new(
                temp.path().join("absent"),
                None,
                false,
                PathBuf::from("resources.yaml"),
            )
            .unwrap(),
        );

        assert!(matches!(
            CheckService::from_config(cfg),
            Err(CheckError::Storage(StorageError::InvalidRootDirectory(_)))
        ));
    }
}
