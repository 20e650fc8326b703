//! Effective-path inference for file records.
//!
//! Works out which canonical path a [`FileRecord`] refers to, whatever legacy column and
//! qualification style it was recorded with, and reports every irregularity on the way as a
//! diagnostic. Inference itself never fails: a record that cannot be resolved yields an
//! [`EffectivePath`] without a path, and the caller decides what that costs.

use crate::diagnostics::{Diagnostic, DiagnosticContext, DiagnosticKind, DiagnosticSink};
use crate::resolver::{CanonicalPath, PathForm, PathResolver, Resolution, ResolveError};
use crate::resource::{FileName, FileRecord, Resource};
use gridcheck_storage::DataGrid;

/// Result of inferring where a file record lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectivePath {
    /// Canonical path, if one could be inferred.
    pub path: Option<String>,
    /// Folder the file is taken to live in.
    pub folder: Option<String>,
    /// The name as recorded.
    pub original: Option<String>,
    /// Whether `path` was confirmed to exist.
    pub exists: bool,
}

/// Renders an optional value the way records display it.
pub(crate) fn or_none(value: Option<&str>) -> &str {
    value.unwrap_or("None")
}

/// Infers the canonical path of `record`, a file of `resource` stored in `grid`.
///
/// Every inferred path is checked for existence exactly once, either during resolution or by
/// a final check here.
pub fn infer_effective_path(
    resource: &Resource,
    record: &FileRecord,
    grid: &dyn DataGrid,
    sink: &mut dyn DiagnosticSink,
) -> EffectivePath {
    let ctx = DiagnosticContext::for_resource(resource);
    let recorded_folder = record.recorded_folder();

    let name = match record.file_name() {
        Ok(name) => name,
        Err(ambiguous) => {
            sink.emit(&Diagnostic::error(
                DiagnosticKind::MultipleNames,
                ambiguous.to_string(),
                ctx,
            ));
            return EffectivePath {
                path: None,
                folder: recorded_folder.map(str::to_owned),
                original: None,
                exists: false,
            };
        }
    };

    let mut inference = Inference {
        resource,
        resolver: PathResolver::new(resource, grid),
        ctx: ctx.with_file(name.raw()),
        sink,
    };

    let inferred = match &name {
        FileName::Local(raw) => inference.local(raw, recorded_folder),
        FileName::Federated(raw) => inference.federated(raw, recorded_folder),
        FileName::FederatedOrPath(raw) => inference.federated_or_path(raw, recorded_folder),
        FileName::Absent => {
            inference.error(
                DiagnosticKind::NoValidName,
                format!(
                    "no valid file name defined for {} ({})",
                    resource.short_id, resource.resource_type
                ),
            );
            None
        }
    };

    let original = name.raw().map(str::to_owned);
    match inferred {
        Some(found) => {
            let exists = match found.exists {
                Some(exists) => exists,
                None => inference.confirm(&found.canonical.path, &name),
            };
            EffectivePath {
                path: Some(found.canonical.path),
                folder: found.folder,
                original,
                exists,
            }
        }
        None => EffectivePath {
            path: None,
            folder: recorded_folder.map(str::to_owned),
            original,
            exists: false,
        },
    }
}

struct Inferred {
    canonical: CanonicalPath,
    /// Folder reported for the record.
    folder: Option<String>,
    /// Existence already established during resolution, if any.
    exists: Option<bool>,
}

impl From<Resolution> for Inferred {
    fn from(resolution: Resolution) -> Self {
        Self {
            folder: resolution.canonical.folder.clone(),
            canonical: resolution.canonical,
            exists: resolution.exists_checked.then_some(true),
        }
    }
}

struct Inference<'a, 's> {
    resource: &'a Resource,
    resolver: PathResolver<'a>,
    ctx: DiagnosticContext,
    sink: &'s mut dyn DiagnosticSink,
}

impl Inference<'_, '_> {
    fn local(&mut self, raw: &str, recorded_folder: Option<&str>) -> Option<Inferred> {
        if self.resource.is_federated() {
            self.error(
                DiagnosticKind::FederationMismatch,
                format!(
                    "unfederated file declared for federated resource {}: {}",
                    self.described(),
                    raw
                ),
            );
            return None;
        }

        let resolution = match self.resolve_qualified(raw, recorded_folder) {
            Ok(resolution) => resolution,
            Err(unconfirmed) => return unconfirmed,
        };

        if resolution.form == PathForm::PartiallyQualified {
            self.info(
                DiagnosticKind::HeaderStripped,
                format!("stripping data/contents/ from unfederated path {}", raw),
            );
        }
        self.report_conflict(&resolution, recorded_folder);
        Some(resolution.into())
    }

    fn federated(&mut self, raw: &str, recorded_folder: Option<&str>) -> Option<Inferred> {
        if !self.resource.is_federated() {
            self.error(
                DiagnosticKind::FederationMismatch,
                format!(
                    "federated file declared for unfederated resource {}: {}",
                    self.described(),
                    raw
                ),
            );
            return None;
        }

        let resolution = match self.resolve_qualified(raw, recorded_folder) {
            Ok(resolution) => resolution,
            Err(unconfirmed) => return unconfirmed,
        };

        if resolution.form == PathForm::PartiallyQualified {
            self.warning(
                DiagnosticKind::HeaderStripped,
                format!(
                    "path {} starts with extra data header for {}",
                    raw,
                    self.described()
                ),
            );
        }
        self.report_conflict(&resolution, recorded_folder);
        Some(resolution.into())
    }

    /// The hybrid column accepts either qualification, so federation only warns here.
    ///
    /// The folder inside the path places the file; the recorded folder is what is reported.
    fn federated_or_path(
        &mut self,
        raw: &str,
        recorded_folder: Option<&str>,
    ) -> Option<Inferred> {
        if !self.resource.is_federated() {
            self.warning(
                DiagnosticKind::FederationMismatch,
                format!(
                    "federated file name or path declared for unfederated resource {}: {}",
                    self.described(),
                    raw
                ),
            );
        }

        let path = match crate::paths::strip_content_header(raw) {
            Some(rest) => {
                self.info(
                    DiagnosticKind::HeaderStripped,
                    format!(
                        "data/contents/ stripped from federated name or path: {} for {}",
                        rest,
                        self.described()
                    ),
                );
                rest
            }
            None => raw,
        };

        let resolved = if self.resolver.is_fully_qualified(path) {
            self.resolver.resolve_storage_path(path, false)
        } else {
            self.resolver.resolve_short_path(path, false)
        };

        match resolved {
            Ok(canonical) => Some(Inferred {
                canonical,
                folder: recorded_folder.map(str::to_owned),
                exists: None,
            }),
            Err(e) => {
                self.resolve_failure(raw, &e);
                None
            }
        }
    }

    /// Resolves a name from the local or federated column, confirming qualified names.
    ///
    /// A qualified name whose existence check could not reach the grid keeps its canonical
    /// path, unconfirmed, so the data object stays claimed by this record.
    fn resolve_qualified(
        &mut self,
        raw: &str,
        recorded_folder: Option<&str>,
    ) -> Result<Resolution, Option<Inferred>> {
        let error = match self.resolver.resolve(raw, recorded_folder, true) {
            Ok(resolution) => return Ok(resolution),
            Err(error) => error,
        };
        self.resolve_failure(raw, &error);

        if !matches!(error, ResolveError::StorageUnreachable { .. }) {
            return Err(None);
        }
        match self.resolver.resolve_storage_path(raw, false) {
            Ok(canonical) => Err(Some(Inferred {
                folder: canonical.folder.clone(),
                canonical,
                exists: Some(false),
            })),
            Err(e) => {
                self.resolve_failure(raw, &e);
                Err(None)
            }
        }
    }

    fn report_conflict(&mut self, resolution: &Resolution, recorded_folder: Option<&str>) {
        let Some(conflict) = &resolution.folder_conflict else {
            return;
        };

        self.warning(
            DiagnosticKind::FolderMismatch,
            format!(
                "declared folder {} is not path folder {} for {}",
                or_none(conflict.recorded.as_deref()),
                conflict.derived,
                self.described()
            ),
        );
        if resolution.form != PathForm::FullyQualified {
            self.info(
                DiagnosticKind::FolderMismatch,
                format!("assuming folder is {}", or_none(recorded_folder)),
            );
        }
    }

    /// Checks that an inferred path exists, reporting the outcome.
    fn confirm(&mut self, path: &str, name: &FileName) -> bool {
        match self.resolver.exists(path) {
            Ok(true) => {
                self.info(
                    DiagnosticKind::Qualified,
                    format!(
                        "found {} name '{}' qualified to '{}'",
                        column_label(name),
                        name.raw().unwrap_or_default(),
                        path
                    ),
                );
                true
            }
            Ok(false) => {
                self.error(
                    DiagnosticKind::InferredPathMissing,
                    format!("inferred path {} does not exist", path),
                );
                false
            }
            Err(e) => {
                self.error(DiagnosticKind::StorageUnreachable, e.to_string());
                false
            }
        }
    }

    fn resolve_failure(&mut self, raw: &str, error: &ResolveError) {
        let (kind, message) = match error {
            ResolveError::FederationMismatch { reason, .. } => (
                DiagnosticKind::FederationMismatch,
                format!("{} {} for {}", reason, raw, self.described()),
            ),
            ResolveError::StorageUnreachable { .. } => {
                (DiagnosticKind::StorageUnreachable, error.to_string())
            }
            ResolveError::PathDoesNotExist { .. }
            | ResolveError::MalformedFederatedPath { .. }
            | ResolveError::MissingFileName { .. } => (
                DiagnosticKind::MalformedPath,
                format!(
                    "existing path {} is not conformant for {}: {}",
                    raw,
                    self.described(),
                    error
                ),
            ),
        };
        self.error(kind, message);
    }

    fn described(&self) -> String {
        format!("{} ({})", self.resource.short_id, self.resource.resource_type)
    }

    fn info(&mut self, kind: DiagnosticKind, message: String) {
        self.sink
            .emit(&Diagnostic::info(kind, message, self.ctx.clone()));
    }

    fn warning(&mut self, kind: DiagnosticKind, message: String) {
        self.sink
            .emit(&Diagnostic::warning(kind, message, self.ctx.clone()));
    }

    fn error(&mut self, kind: DiagnosticKind, message: String) {
        self.sink
            .emit(&Diagnostic::error(kind, message, self.ctx.clone()));
    }
}

fn column_label(name: &FileName) -> &'static str {
    match name {
        FileName::Local(_) => "unfederated",
        FileName::Federated(_) => "federated",
        FileName::FederatedOrPath(_) => "federated name or path",
        FileName::Absent => "absent",
    }
}
