//! In-memory data grid
//!
//! [`MemoryGrid`] holds a fixed set of data objects and collections. It is built once with
//! the builder methods and is read-only afterwards, which keeps it `Send + Sync` without
//! locking. Failures can be injected per path to exercise the engine's handling of broken
//! grid sessions.

use crate::{DataGrid, Listing, StorageError, StorageResult, GRID_SEPARATOR};
use std::collections::BTreeSet;

/// Read-only in-memory data grid with failure injection
#[derive(Debug, Clone, Default)]
pub struct MemoryGrid {
    files: BTreeSet<String>,
    directories: BTreeSet<String>,
    failing_listings: BTreeSet<String>,
    failing_exists: BTreeSet<String>,
}

impl MemoryGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a data object; every ancestor collection is created implicitly.
    #[must_use]
    pub fn with_file(mut self, path: &str) -> Self {
        let path = normalise(path);
        self.add_ancestors(&path);
        self.files.insert(path);
        self
    }

    /// Adds an (possibly empty) collection and its ancestors.
    #[must_use]
    pub fn with_dir(mut self, path: &str) -> Self {
        let path = normalise(path);
        self.add_ancestors(&path);
        self.directories.insert(path);
        self
    }

    /// Makes every `listdir` of `path` fail with [`StorageError::Listing`].
    #[must_use]
    pub fn fail_listing(mut self, path: &str) -> Self {
        self.failing_listings.insert(normalise(path));
        self
    }

    /// Makes every `exists` of `path` fail with [`StorageError::Unreachable`].
    #[must_use]
    pub fn fail_exists(mut self, path: &str) -> Self {
        self.failing_exists.insert(normalise(path));
        self
    }

    fn add_ancestors(&mut self, path: &str) {
        let mut current = path;
        while let Some(parent) = parent_of(current) {
            if parent.is_empty() {
                break;
            }
            self.directories.insert(parent.to_owned());
            current = parent;
        }
    }
}

impl DataGrid for MemoryGrid {
    fn exists(&self, path: &str) -> StorageResult<bool> {
        let path = normalise(path);
        if self.failing_exists.contains(&path) {
            return Err(StorageError::Unreachable {
                path,
                reason: "injected session failure".into(),
            });
        }
        Ok(self.files.contains(&path) || self.directories.contains(&path))
    }

    fn listdir(&self, path: &str) -> StorageResult<Listing> {
        let path = normalise(path);
        if self.failing_listings.contains(&path) {
            return Err(StorageError::Listing {
                path,
                reason: "injected session failure".into(),
            });
        }
        if !self.directories.contains(&path) {
            return Err(StorageError::Listing {
                path,
                reason: "no such collection".into(),
            });
        }

        let children = |set: &BTreeSet<String>| -> Vec<String> {
            set.iter()
                .filter(|candidate| parent_of(candidate) == Some(path.as_str()))
                .filter_map(|candidate| candidate.rsplit(GRID_SEPARATOR).next())
                .map(str::to_owned)
                .collect()
        };

        Ok(Listing {
            directories: children(&self.directories),
            files: children(&self.files),
        })
    }
}

fn normalise(path: &str) -> String {
    let trimmed = path.trim_end_matches(GRID_SEPARATOR);
    if trimmed.is_empty() {
        path.to_owned()
    } else {
        trimmed.to_owned()
    }
}

fn parent_of(path: &str) -> Option<&str> {
    path.rfind(GRID_SEPARATOR).map(|idx| &path[..idx])
}
