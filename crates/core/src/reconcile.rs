//! Reconciliation of a resource's file records against the data grid.
//!
//! A check runs three steps in order:
//!
//! 1. every file record must resolve to an existing data object
//! 2. every data object under the content root must be claimed by a record
//! 3. the resource's root collection must exist
//!
//! Each divergence is one counted error. Federated resources skip steps 1 and 2 unless the
//! configuration enables federated checks.

use crate::config::CoreConfig;
use crate::diagnostics::{Diagnostic, DiagnosticContext, DiagnosticKind, DiagnosticSink};
use crate::inference::{infer_effective_path, or_none};
use crate::paths;
use crate::resource::Resource;
use crate::{CheckError, CheckResult};
use gridcheck_storage::{DataGrid, GridRegistry};
use std::collections::HashSet;

/// How a check reports what it finds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOptions {
    /// Abort with [`CheckError::ValidationFailure`] on the first counted error.
    pub stop_on_error: bool,
    /// Send diagnostics to the process log.
    pub log_errors: bool,
    /// Print diagnostics on standard output.
    pub echo_errors: bool,
    /// Collect diagnostics into the returned report.
    pub return_errors: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            stop_on_error: false,
            log_errors: true,
            echo_errors: false,
            return_errors: false,
        }
    }
}

/// Summary line naming a resource that has errors.
pub fn affected_summary(resource: &Resource) -> String {
    format!(
        "affected resource {} type is {}, title is '{}'",
        resource.short_id, resource.resource_type, resource.title
    )
}

/// Runs the three-step check of single resources.
pub struct Reconciler<'a> {
    config: &'a CoreConfig,
    grids: &'a GridRegistry,
}

impl<'a> Reconciler<'a> {
    pub fn new(config: &'a CoreConfig, grids: &'a GridRegistry) -> Self {
        Self { config, grids }
    }

    /// Checks `resource`, emitting every finding to `sink`, and returns the error count.
    ///
    /// # Errors
    ///
    /// With `options.stop_on_error`, the first counted error is returned as
    /// [`CheckError::ValidationFailure`] after it has been emitted.
    pub fn check(
        &self,
        resource: &Resource,
        options: &CheckOptions,
        sink: &mut dyn DiagnosticSink,
    ) -> CheckResult<usize> {
        let grid = self.grids.for_zone(resource.is_federated());
        let mut tally = Tally {
            sink,
            ctx: DiagnosticContext::for_resource(resource),
            count: 0,
            stop_on_error: options.stop_on_error,
        };

        if let Some(prefix) = &resource.federation_path {
            tally.note(Diagnostic::info(
                DiagnosticKind::FederationPrefix,
                format!("federation prefix is {}", prefix),
                tally.ctx.clone(),
            ));
        }

        if resource.is_federated() && !self.config.remote_use_grid() {
            tally.note(Diagnostic::info(
                DiagnosticKind::SkippedFederated,
                format!("skipping check of federated resource {}", resource.short_id),
                tally.ctx.clone(),
            ));
        } else {
            let claimed = check_records(resource, grid, &mut tally)?;
            check_storage(resource, grid, &claimed, &mut tally)?;
        }

        check_root(resource, grid, &mut tally)?;

        if tally.count > 0 {
            tally.note(Diagnostic::error(
                DiagnosticKind::AffectedResource,
                affected_summary(resource),
                tally.ctx.clone(),
            ));
        }

        Ok(tally.count)
    }
}

struct Tally<'s> {
    sink: &'s mut dyn DiagnosticSink,
    ctx: DiagnosticContext,
    count: usize,
    stop_on_error: bool,
}

impl Tally<'_> {
    fn note(&mut self, diagnostic: Diagnostic) {
        self.sink.emit(&diagnostic);
    }

    fn fail(
        &mut self,
        kind: DiagnosticKind,
        message: String,
        file: Option<&str>,
    ) -> CheckResult<()> {
        debug_assert!(
            kind.counts_toward_total() || kind == DiagnosticKind::StorageUnreachable,
            "{} is never a counted error",
            kind.as_str()
        );
        let diagnostic = Diagnostic::counted_error(kind, message, self.ctx.with_file(file));
        self.sink.emit(&diagnostic);
        self.count += 1;
        if self.stop_on_error {
            return Err(CheckError::ValidationFailure(diagnostic.message));
        }
        Ok(())
    }
}

/// Step 1: every record must name an existing data object. Returns the claimed paths.
fn check_records(
    resource: &Resource,
    grid: &dyn DataGrid,
    tally: &mut Tally<'_>,
) -> CheckResult<HashSet<String>> {
    let mut claimed = HashSet::new();

    for record in &resource.files {
        let effective = infer_effective_path(resource, record, grid, &mut *tally.sink);
        if let Some(path) = &effective.path {
            claimed.insert(path.clone());
        }

        if effective.path.is_none() || !effective.exists {
            tally.fail(
                DiagnosticKind::DatabaseFileMissing,
                format!(
                    "database file {} in folder {}, resolved to {}, does not exist in the data grid",
                    or_none(effective.original.as_deref()),
                    or_none(effective.folder.as_deref()),
                    or_none(effective.path.as_deref()),
                ),
                effective.original.as_deref(),
            )?;
        }
    }

    Ok(claimed)
}

/// Step 2: every data object below the content root must be claimed.
fn check_storage(
    resource: &Resource,
    grid: &dyn DataGrid,
    claimed: &HashSet<String>,
    tally: &mut Tally<'_>,
) -> CheckResult<()> {
    let mut pending = vec![(paths::file_path(resource), 0usize)];

    while let Some((collection, depth)) = pending.pop() {
        let listing = match grid.listdir(&collection) {
            Ok(listing) => listing,
            Err(e) => {
                tally.fail(
                    DiagnosticKind::ListingFailed,
                    format!("listing of data grid collection {} failed: {}", collection, e),
                    None,
                )?;
                continue;
            }
        };

        tracing::debug!(
            depth,
            "checking {}: {} data objects, {} collections",
            collection,
            listing.files.len(),
            listing.directories.len()
        );

        for name in &listing.files {
            let full = paths::join(&collection, name);
            if !claimed.contains(&full) {
                tally.fail(
                    DiagnosticKind::StorageFileUnrecorded,
                    format!(
                        "file {} in the data grid does not exist in the database",
                        full
                    ),
                    Some(full.as_str()),
                )?;
            }
        }

        // reversed so the first listed subcollection is walked first
        for name in listing.directories.iter().rev() {
            pending.push((paths::join(&collection, name), depth + 1));
        }
    }

    Ok(())
}

/// Step 3: the resource root must exist.
fn check_root(resource: &Resource, grid: &dyn DataGrid, tally: &mut Tally<'_>) -> CheckResult<()> {
    let root = paths::root_path(resource);
    match grid.exists(&root) {
        Ok(true) => Ok(()),
        Ok(false) => tally.fail(
            DiagnosticKind::ResourceRootMissing,
            format!(
                "data grid collection for resource {} does not exist at all",
                resource.short_id
            ),
            None,
        ),
        Err(e) => tally.fail(
            DiagnosticKind::StorageUnreachable,
            format!(
                "data grid unreachable while checking root {} of resource {}: {}",
                root, resource.short_id, e
            ),
            None,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;
    use crate::resource::FileRecord;
    use gridcheck_storage::MemoryGrid;
    use gridcheck_types::{FederationPath, ShortId};
    use std::path::PathBuf;
    use std::sync::Arc;

    fn config(remote_use_grid: bool) -> CoreConfig {
        CoreConfig::new(
            PathBuf::from("grid"),
            None,
            remote_use_grid,
            PathBuf::from("resources.yaml"),
        )
        .unwrap()
    }

    fn resource() -> Resource {
        Resource::new(ShortId::new("abc").unwrap()).with_title("CompositeResource", "Rivers")
    }

    fn run(
        resource: &Resource,
        grid: MemoryGrid,
        options: CheckOptions,
    ) -> (CheckResult<usize>, CollectingSink) {
        run_with(resource, GridRegistry::new(Arc::new(grid)), config(false), options)
    }

    fn run_with(
        resource: &Resource,
        grids: GridRegistry,
        cfg: CoreConfig,
        options: CheckOptions,
    ) -> (CheckResult<usize>, CollectingSink) {
        let mut sink = CollectingSink::new();
        let result = Reconciler::new(&cfg, &grids).check(resource, &options, &mut sink);
        (result, sink)
    }

    #[test]
    fn empty_resource_with_existing_root_has_no_errors() {
        let grid = MemoryGrid::new().with_dir("abc/data/contents");

        let (result, sink) = run(&resource(), grid, CheckOptions::default());

        assert_eq!(result.unwrap(), 0);
        assert!(sink.counted_messages().is_empty());
        assert_eq!(sink.count_kind(DiagnosticKind::AffectedResource), 0);
    }

    #[test]
    fn unrecorded_file_is_reported_once() {
        let grid = MemoryGrid::new()
            .with_file("abc/data/contents/a")
            .with_file("abc/data/contents/b/c");
        let resource = resource().with_file(FileRecord::local("a"));

        let (result, sink) = run(&resource, grid, CheckOptions::default());

        assert_eq!(result.unwrap(), 1);
        assert_eq!(
            sink.counted_messages(),
            vec!["file abc/data/contents/b/c in the data grid does not exist in the database"]
        );
        assert_eq!(sink.count_kind(DiagnosticKind::AffectedResource), 1);
    }

    #[test]
    fn missing_record_target_is_counted() {
        let grid = MemoryGrid::new().with_dir("abc/data/contents");
        let resource = resource().with_file(FileRecord::local("gone.txt").in_folder("x"));

        let (result, sink) = run(&resource, grid, CheckOptions::default());

        assert_eq!(result.unwrap(), 1);
        assert_eq!(
            sink.counted_messages(),
            vec![
                "database file gone.txt in folder x, resolved to abc/data/contents/x/gone.txt, \
                 does not exist in the data grid"
            ]
        );
    }

    #[test]
    fn unresolvable_record_is_counted_with_none_placeholders() {
        let grid = MemoryGrid::new().with_dir("abc/data/contents");
        let resource = resource().with_file(FileRecord::default());

        let (result, sink) = run(&resource, grid, CheckOptions::default());

        assert_eq!(result.unwrap(), 1);
        assert_eq!(
            sink.counted_messages(),
            vec!["database file None in folder None, resolved to None, does not exist in the data grid"]
        );
        assert_eq!(sink.count_kind(DiagnosticKind::NoValidName), 1);
    }

    #[test]
    fn local_name_on_federated_resource_fails_step_one() {
        let grid = MemoryGrid::new().with_file("/zone/home/proxy/abc/data/contents/a.txt");
        let resource = resource()
            .with_federation_path(FederationPath::new("/zone/home/proxy").unwrap())
            .with_file(FileRecord::local("a.txt"));

        let (result, sink) = run_with(
            &resource,
            GridRegistry::new(Arc::new(grid)),
            config(true),
            CheckOptions::default(),
        );

        // the record is rejected and its data object is then unclaimed
        assert_eq!(result.unwrap(), 2);
        assert_eq!(sink.count_kind(DiagnosticKind::FederationMismatch), 1);
        assert_eq!(sink.count_kind(DiagnosticKind::DatabaseFileMissing), 1);
        assert_eq!(sink.count_kind(DiagnosticKind::StorageFileUnrecorded), 1);
    }

    #[test]
    fn federated_resources_are_skipped_unless_enabled() {
        let grid = MemoryGrid::new().with_file("/zone/home/proxy/abc/data/contents/stray.txt");
        let resource =
            resource().with_federation_path(FederationPath::new("/zone/home/proxy").unwrap());

        let (result, sink) = run(&resource, grid, CheckOptions::default());

        assert_eq!(result.unwrap(), 0);
        assert_eq!(sink.count_kind(DiagnosticKind::FederationPrefix), 1);
        assert_eq!(sink.count_kind(DiagnosticKind::SkippedFederated), 1);
        assert_eq!(sink.count_kind(DiagnosticKind::StorageFileUnrecorded), 0);
    }

    #[test]
    fn federated_resources_use_the_federated_grid() {
        let default = MemoryGrid::new().with_dir("abc");
        let federated = MemoryGrid::new().with_file("/zone/home/proxy/abc/data/contents/a.txt");
        let grids = GridRegistry::new(Arc::new(default)).with_federated(Arc::new(federated));
        let resource = resource()
            .with_federation_path(FederationPath::new("/zone/home/proxy").unwrap())
            .with_file(FileRecord::federated("a.txt"));

        let (result, _) = run_with(&resource, grids, config(true), CheckOptions::default());

        assert_eq!(result.unwrap(), 0);
    }

    #[test]
    fn missing_root_is_counted() {
        let (result, sink) = run(&resource(), MemoryGrid::new(), CheckOptions::default());

        // the content root cannot be listed and the root is absent
        assert_eq!(result.unwrap(), 2);
        assert_eq!(sink.count_kind(DiagnosticKind::ListingFailed), 1);
        assert_eq!(sink.count_kind(DiagnosticKind::ResourceRootMissing), 1);
    }

    #[test]
    fn unreachable_root_is_not_absence() {
        let grid = MemoryGrid::new()
            .with_dir("abc/data/contents")
            .fail_exists("abc");

        let (result, sink) = run(&resource(), grid, CheckOptions::default());

        assert_eq!(result.unwrap(), 1);
        assert_eq!(sink.count_kind(DiagnosticKind::ResourceRootMissing), 0);
        assert_eq!(sink.count_kind(DiagnosticKind::StorageUnreachable), 1);
        let unreachable = sink
            .diagnostics()
            .iter()
            .find(|d| d.kind == DiagnosticKind::StorageUnreachable)
            .unwrap();
        assert!(unreachable.counted);
        assert!(!unreachable.kind.counts_toward_total());
    }

    #[test]
    fn unreachable_record_target_is_counted_once() {
        let grid = MemoryGrid::new()
            .with_file("abc/data/contents/a.txt")
            .fail_exists("abc/data/contents/a.txt");
        let resource = resource().with_file(FileRecord::local("abc/data/contents/a.txt"));

        let (result, sink) = run(&resource, grid, CheckOptions::default());

        assert_eq!(result.unwrap(), 1);
        assert_eq!(sink.count_kind(DiagnosticKind::StorageFileUnrecorded), 0);
        assert_eq!(
            sink.counted_messages(),
            vec![
                "database file abc/data/contents/a.txt in folder None, resolved to \
                 abc/data/contents/a.txt, does not exist in the data grid"
            ]
        );
        // the gateway failure is reported but does not count on its own
        let unreachable: Vec<_> = sink
            .diagnostics()
            .iter()
            .filter(|d| d.kind == DiagnosticKind::StorageUnreachable)
            .collect();
        assert_eq!(unreachable.len(), 1);
        assert!(!unreachable[0].counted);
    }

    #[test]
    fn listing_failure_does_not_hide_siblings() {
        let grid = MemoryGrid::new()
            .with_file("abc/data/contents/a/x.txt")
            .with_file("abc/data/contents/b/y.txt")
            .with_file("abc/data/contents/c/z.txt")
            .fail_listing("abc/data/contents/b");

        let (result, sink) = run(&resource(), grid, CheckOptions::default());

        assert_eq!(result.unwrap(), 3);
        assert_eq!(sink.count_kind(DiagnosticKind::ListingFailed), 1);
        assert_eq!(
            sink.counted_messages()
                .into_iter()
                .filter(|m| m.starts_with("file "))
                .collect::<Vec<_>>(),
            vec![
                "file abc/data/contents/a/x.txt in the data grid does not exist in the database",
                "file abc/data/contents/c/z.txt in the data grid does not exist in the database",
            ]
        );
    }

    #[test]
    fn listing_failure_does_not_hide_deeper_collections() {
        let grid = MemoryGrid::new()
            .with_file("abc/data/contents/a/x.txt")
            .with_file("abc/data/contents/b/d/e.txt")
            .fail_listing("abc/data/contents/a");

        let (result, sink) = run(&resource(), grid, CheckOptions::default());

        assert_eq!(result.unwrap(), 2);
        assert_eq!(sink.count_kind(DiagnosticKind::ListingFailed), 1);
        assert_eq!(
            sink.counted_messages()
                .into_iter()
                .filter(|m| m.starts_with("file "))
                .collect::<Vec<_>>(),
            vec!["file abc/data/contents/b/d/e.txt in the data grid does not exist in the database"]
        );
    }

    #[test]
    fn walk_reports_files_before_subcollections() {
        let grid = MemoryGrid::new()
            .with_file("abc/data/contents/a/deep.txt")
            .with_file("abc/data/contents/top.txt")
            .with_file("abc/data/contents/b/other.txt");

        let (_, sink) = run(&resource(), grid, CheckOptions::default());

        let files: Vec<String> = sink
            .diagnostics()
            .iter()
            .filter(|d| d.kind == DiagnosticKind::StorageFileUnrecorded)
            .filter_map(|d| d.context.file.clone())
            .collect();
        assert_eq!(
            files,
            vec![
                "abc/data/contents/top.txt",
                "abc/data/contents/a/deep.txt",
                "abc/data/contents/b/other.txt",
            ]
        );
    }

    #[test]
    fn stop_on_error_aborts_after_first_error() {
        let grid = MemoryGrid::new().with_dir("abc/data/contents");
        let resource = resource()
            .with_file(FileRecord::local("one.txt"))
            .with_file(FileRecord::local("two.txt"));
        let options = CheckOptions {
            stop_on_error: true,
            ..CheckOptions::default()
        };

        let (result, sink) = run(&resource, grid, options);

        match result {
            Err(CheckError::ValidationFailure(msg)) => assert!(msg.contains("one.txt")),
            other => panic!("expected validation failure, got {:?}", other),
        }
        assert_eq!(sink.counted_messages().len(), 1);
        // the second record was never inferred
        assert!(sink
            .diagnostics()
            .iter()
            .all(|d| d.context.file.as_deref() != Some("two.txt")));
    }

    #[test]
    fn without_stop_every_record_is_processed() {
        let grid = MemoryGrid::new().with_dir("abc/data/contents");
        let resource = resource()
            .with_file(FileRecord::local("one.txt"))
            .with_file(FileRecord::local("two.txt"));

        let (result, sink) = run(&resource, grid, CheckOptions::default());

        assert_eq!(result.unwrap(), 2);
        assert_eq!(sink.counted_messages().len(), 2);
    }

    #[test]
    fn summary_names_the_resource_and_is_not_counted() {
        let grid = MemoryGrid::new().with_file("abc/data/contents/stray.txt");

        let (result, sink) = run(&resource(), grid, CheckOptions::default());

        assert_eq!(result.unwrap(), 1);
        let summary = sink
            .diagnostics()
            .iter()
            .find(|d| d.kind == DiagnosticKind::AffectedResource)
            .unwrap();
        assert!(!summary.counted);
        assert_eq!(
            summary.message,
            "affected resource abc type is CompositeResource, title is 'Rivers'"
        );
    }
}
