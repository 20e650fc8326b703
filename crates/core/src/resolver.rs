//! Path resolution for recorded file references.
//!
//! A recorded name can take three forms:
//!
//! ```text
//! fully-qualified      [federation_path/]short_id/data/contents/[folder/]base
//! partially-qualified  data/contents/[folder/]base
//! bare                 [folder/]base
//! ```
//!
//! [`PathResolver`] turns any of them into the single [`CanonicalPath`] of the file, or
//! classifies why the reference cannot belong to the resource. The only I/O it performs is
//! existence checks, and only when asked to.

use crate::paths::{self, split, strip_content_header};
use crate::resource::Resource;
use gridcheck_storage::{DataGrid, GRID_SEPARATOR};

/// The canonical location of a file in the data grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalPath {
    pub path: String,
    pub folder: Option<String>,
    pub base: String,
}

/// Qualification style of a recorded name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathForm {
    FullyQualified,
    PartiallyQualified,
    Bare,
}

/// The folder derived from a name disagrees with the recorded folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderConflict {
    pub derived: String,
    pub recorded: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub canonical: CanonicalPath,
    pub form: PathForm,
    pub folder_conflict: Option<FolderConflict>,
    /// Whether `canonical.path` was confirmed to exist during resolution.
    pub exists_checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("path {path} does not exist in the data grid for resource {short_id}")]
    PathDoesNotExist { path: String, short_id: String },

    #[error("malformed federated resource path {path} for resource {short_id}")]
    MalformedFederatedPath { path: String, short_id: String },

    #[error("{reason}: {path} for resource {short_id}")]
    FederationMismatch {
        path: String,
        short_id: String,
        reason: &'static str,
    },

    #[error("data grid unreachable while checking {path} for resource {short_id}: {reason}")]
    StorageUnreachable {
        path: String,
        short_id: String,
        reason: String,
    },

    #[error("path {path} for resource {short_id} has no file name")]
    MissingFileName { path: String, short_id: String },
}

impl ResolveError {
    pub fn path(&self) -> &str {
        match self {
            ResolveError::PathDoesNotExist { path, .. }
            | ResolveError::MalformedFederatedPath { path, .. }
            | ResolveError::FederationMismatch { path, .. }
            | ResolveError::StorageUnreachable { path, .. }
            | ResolveError::MissingFileName { path, .. } => path,
        }
    }
}

/// Resolves recorded names against one resource and the grid holding it.
pub struct PathResolver<'a> {
    resource: &'a Resource,
    grid: &'a dyn DataGrid,
}

impl<'a> PathResolver<'a> {
    pub fn new(resource: &'a Resource, grid: &'a dyn DataGrid) -> Self {
        Self { resource, grid }
    }

    /// Whether `path` starts with the resource's content root.
    pub fn is_fully_qualified(&self, path: &str) -> bool {
        let content_root = paths::file_path(self.resource);
        path.strip_prefix(content_root.as_str())
            .is_some_and(|rest| rest.starts_with(GRID_SEPARATOR))
    }

    /// Resolves `raw` into its canonical path.
    ///
    /// Fully-qualified names keep the folder found in the name and, when `require_exists` is
    /// set, are confirmed in the grid. Partially-qualified and bare names are rebuilt from
    /// `recorded_folder` and are never checked here.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolveError`] classifying why `raw` cannot name a file of the resource.
    pub fn resolve(
        &self,
        raw: &str,
        recorded_folder: Option<&str>,
        require_exists: bool,
    ) -> Result<Resolution, ResolveError> {
        if self.is_fully_qualified(raw) {
            let canonical = self.resolve_storage_path(raw, require_exists)?;
            let folder_conflict = conflict(canonical.folder.as_deref(), recorded_folder);
            return Ok(Resolution {
                canonical,
                form: PathForm::FullyQualified,
                folder_conflict,
                exists_checked: require_exists,
            });
        }

        self.check_federation_style(raw)?;

        let (form, short) = match strip_content_header(raw) {
            Some(rest) => (PathForm::PartiallyQualified, rest),
            None => (PathForm::Bare, raw),
        };
        let (derived, base) = split(short);
        if base.is_empty() {
            return Err(self.missing_file_name(raw));
        }

        Ok(Resolution {
            canonical: CanonicalPath {
                path: paths::resource_file_path(self.resource, &base, recorded_folder),
                folder: recorded_folder.map(str::to_owned),
                base,
            },
            form,
            folder_conflict: conflict(derived.as_deref(), recorded_folder),
            exists_checked: false,
        })
    }

    /// Accepts any qualified path to a file of the resource and rebuilds its canonical path.
    ///
    /// The federation prefix and the `short_id/data/contents/` header are stripped when
    /// present. With `require_exists`, both the given path and the rebuilt one must exist.
    pub fn resolve_storage_path(
        &self,
        path: &str,
        require_exists: bool,
    ) -> Result<CanonicalPath, ResolveError> {
        let local_prefix = paths::local_content_prefix(self.resource);

        let relative = match self.strip_federation_prefix(path) {
            Some(rest) => {
                if require_exists {
                    self.require(path)?;
                }
                rest.strip_prefix(local_prefix.as_str())
                    .ok_or_else(|| ResolveError::MalformedFederatedPath {
                        path: path.to_owned(),
                        short_id: self.short_id(),
                    })?
            }
            None => match path.strip_prefix(local_prefix.as_str()) {
                Some(rest) => {
                    if require_exists {
                        self.require(path)?;
                    }
                    rest
                }
                None => path,
            },
        };

        let (folder, base) = split(relative);
        if base.is_empty() {
            return Err(self.missing_file_name(path));
        }

        let canonical = paths::resource_file_path(self.resource, &base, folder.as_deref());
        if require_exists && canonical != path {
            self.require(&canonical)?;
        }

        Ok(CanonicalPath {
            path: canonical,
            folder,
            base,
        })
    }

    /// Qualifies a path relative to the content root, taking the folder from the path itself.
    pub fn resolve_short_path(
        &self,
        path: &str,
        require_exists: bool,
    ) -> Result<CanonicalPath, ResolveError> {
        if path.starts_with(GRID_SEPARATOR) {
            return Err(ResolveError::FederationMismatch {
                path: path.to_owned(),
                short_id: self.short_id(),
                reason: "absolute path outside the resource content root",
            });
        }

        let (folder, base) = split(path);
        if base.is_empty() {
            return Err(self.missing_file_name(path));
        }

        let canonical = paths::resource_file_path(self.resource, &base, folder.as_deref());
        if require_exists {
            self.require(&canonical)?;
        }

        Ok(CanonicalPath {
            path: canonical,
            folder,
            base,
        })
    }

    /// Existence check with gateway failures classified.
    pub fn exists(&self, path: &str) -> Result<bool, ResolveError> {
        self.grid
            .exists(path)
            .map_err(|e| ResolveError::StorageUnreachable {
                path: path.to_owned(),
                short_id: self.short_id(),
                reason: e.to_string(),
            })
    }

    fn require(&self, path: &str) -> Result<(), ResolveError> {
        if self.exists(path)? {
            Ok(())
        } else {
            Err(ResolveError::PathDoesNotExist {
                path: path.to_owned(),
                short_id: self.short_id(),
            })
        }
    }

    /// Rejects qualified names that do not fit the resource's federation.
    fn check_federation_style(&self, raw: &str) -> Result<(), ResolveError> {
        if self.strip_federation_prefix(raw).is_some() {
            return Err(ResolveError::MalformedFederatedPath {
                path: raw.to_owned(),
                short_id: self.short_id(),
            });
        }

        let mismatch = |reason| ResolveError::FederationMismatch {
            path: raw.to_owned(),
            short_id: self.short_id(),
            reason,
        };

        if raw.starts_with(GRID_SEPARATOR) {
            return Err(mismatch(if self.resource.is_federated() {
                "non-conformant full path for federated resource"
            } else {
                "absolute path used for unfederated resource"
            }));
        }

        if self.resource.is_federated() {
            let local_root = format!("{}{GRID_SEPARATOR}", self.resource.short_id);
            if raw.starts_with(&local_root) {
                return Err(mismatch("unfederated path used for federated resource"));
            }
        }

        Ok(())
    }

    fn strip_federation_prefix<'p>(&self, path: &'p str) -> Option<&'p str> {
        let prefix = self.resource.federation_path.as_ref()?;
        path.strip_prefix(prefix.as_str())?
            .strip_prefix(GRID_SEPARATOR)
    }

    fn missing_file_name(&self, path: &str) -> ResolveError {
        ResolveError::MissingFileName {
            path: path.to_owned(),
            short_id: self.short_id(),
        }
    }

    fn short_id(&self) -> String {
        self.resource.short_id.to_string()
    }
}

fn conflict(derived: Option<&str>, recorded: Option<&str>) -> Option<FolderConflict> {
    let derived = derived?;
    (Some(derived) != recorded).then(|| FolderConflict {
        derived: derived.to_owned(),
        recorded: recorded.map(str::to_owned),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridcheck_storage::MemoryGrid;
    use gridcheck_types::{FederationPath, ShortId};

    fn local() -> Resource {
        Resource::new(ShortId::new("abc").unwrap())
    }

    fn federated() -> Resource {
        local().with_federation_path(FederationPath::new("/zone/home/proxy").unwrap())
    }

    fn grid() -> MemoryGrid {
        MemoryGrid::new()
            .with_file("abc/data/contents/a.txt")
            .with_file("abc/data/contents/x/b.txt")
            .with_file("/zone/home/proxy/abc/data/contents/c.txt")
    }

    #[test]
    fn fully_qualified_names_are_checked_and_keep_their_folder() {
        let resource = local();
        let grid = grid();
        let resolver = PathResolver::new(&resource, &grid);

        let resolution = resolver
            .resolve("abc/data/contents/x/b.txt", Some("y"), true)
            .unwrap();

        assert_eq!(resolution.form, PathForm::FullyQualified);
        assert!(resolution.exists_checked);
        assert_eq!(resolution.canonical.path, "abc/data/contents/x/b.txt");
        assert_eq!(resolution.canonical.folder.as_deref(), Some("x"));
        assert_eq!(
            resolution.folder_conflict,
            Some(FolderConflict {
                derived: "x".into(),
                recorded: Some("y".into())
            })
        );
    }

    #[test]
    fn missing_fully_qualified_name_is_an_error() {
        let resource = local();
        let grid = grid();
        let resolver = PathResolver::new(&resource, &grid);

        let err = resolver
            .resolve("abc/data/contents/gone.txt", None, true)
            .unwrap_err();

        assert!(matches!(err, ResolveError::PathDoesNotExist { .. }));
        assert_eq!(err.path(), "abc/data/contents/gone.txt");
    }

    #[test]
    fn bare_names_use_the_recorded_folder() {
        let resource = local();
        let grid = grid();
        let resolver = PathResolver::new(&resource, &grid);

        let resolution = resolver.resolve("z/b.txt", Some("x"), true).unwrap();

        assert_eq!(resolution.form, PathForm::Bare);
        assert!(!resolution.exists_checked);
        assert_eq!(resolution.canonical.path, "abc/data/contents/x/b.txt");
        assert_eq!(resolution.canonical.folder.as_deref(), Some("x"));
        assert_eq!(
            resolution.folder_conflict.map(|c| c.derived),
            Some("z".to_string())
        );

        let plain = resolver.resolve("a.txt", None, false).unwrap();
        assert_eq!(plain.canonical.path, "abc/data/contents/a.txt");
        assert_eq!(plain.folder_conflict, None);
    }

    #[test]
    fn partial_names_strip_the_header() {
        let resource = federated();
        let grid = grid();
        let resolver = PathResolver::new(&resource, &grid);

        let resolution = resolver.resolve("data/contents/c.txt", None, true).unwrap();

        assert_eq!(resolution.form, PathForm::PartiallyQualified);
        assert_eq!(
            resolution.canonical.path,
            "/zone/home/proxy/abc/data/contents/c.txt"
        );
    }

    #[test]
    fn federation_mismatches_are_classified() {
        let grid = grid();

        let fed = federated();
        let resolver = PathResolver::new(&fed, &grid);
        assert!(matches!(
            resolver.resolve("abc/data/contents/c.txt", None, false),
            Err(ResolveError::FederationMismatch { .. })
        ));
        assert!(matches!(
            resolver.resolve("/other/zone/abc/data/contents/c.txt", None, false),
            Err(ResolveError::FederationMismatch { .. })
        ));
        assert!(matches!(
            resolver.resolve("/zone/home/proxy/xyz/c.txt", None, false),
            Err(ResolveError::MalformedFederatedPath { .. })
        ));

        let unfed = local();
        let resolver = PathResolver::new(&unfed, &grid);
        assert!(matches!(
            resolver.resolve("/zone/home/proxy/abc/data/contents/c.txt", None, false),
            Err(ResolveError::FederationMismatch { .. })
        ));
    }

    #[test]
    fn empty_base_is_rejected() {
        let resource = local();
        let grid = grid();
        let resolver = PathResolver::new(&resource, &grid);

        assert!(matches!(
            resolver.resolve("x/", None, false),
            Err(ResolveError::MissingFileName { .. })
        ));
    }

    #[test]
    fn resolution_of_canonical_paths_is_idempotent() {
        let grid = grid();
        for (resource, raw, folder) in [
            (local(), "a.txt", None),
            (local(), "b.txt", Some("x")),
            (federated(), "c.txt", None),
        ] {
            let resolver = PathResolver::new(&resource, &grid);
            let first = resolver.resolve(raw, folder, false).unwrap().canonical;

            let again = resolver
                .resolve(&first.path, first.folder.as_deref(), true)
                .unwrap();

            assert_eq!(again.form, PathForm::FullyQualified);
            assert_eq!(again.canonical, first);
            assert_eq!(again.folder_conflict, None);
        }
    }

    #[test]
    fn storage_path_accepts_local_prefix_on_federated_resource() {
        let resource = federated();
        let grid = grid();
        let resolver = PathResolver::new(&resource, &grid);

        let canonical = resolver
            .resolve_storage_path("abc/data/contents/c.txt", false)
            .unwrap();

        assert_eq!(canonical.path, "/zone/home/proxy/abc/data/contents/c.txt");
        assert_eq!(canonical.folder, None);
    }

    #[test]
    fn short_path_takes_folder_from_path() {
        let resource = local();
        let grid = grid();
        let resolver = PathResolver::new(&resource, &grid);

        let canonical = resolver.resolve_short_path("x/b.txt", true).unwrap();
        assert_eq!(canonical.path, "abc/data/contents/x/b.txt");
        assert_eq!(canonical.folder.as_deref(), Some("x"));

        assert!(matches!(
            resolver.resolve_short_path("x/missing.txt", true),
            Err(ResolveError::PathDoesNotExist { .. })
        ));
        assert!(matches!(
            resolver.resolve_short_path("/abs/b.txt", false),
            Err(ResolveError::FederationMismatch { .. })
        ));
    }

    #[test]
    fn gateway_failures_are_not_absence() {
        let resource = local();
        let grid = grid().fail_exists("abc/data/contents/a.txt");
        let resolver = PathResolver::new(&resource, &grid);

        assert!(matches!(
            resolver.resolve("abc/data/contents/a.txt", None, true),
            Err(ResolveError::StorageUnreachable { .. })
        ));
    }
}
