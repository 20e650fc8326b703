//! Filesystem-backed data grid
//!
//! [`LocalGrid`] serves a data grid that has been mounted (or mirrored) onto the local
//! filesystem. Every grid path, relative or absolute, is mapped below a single mount
//! directory:
//!
//! ```text
//! <mount>/
//! ├── abc123/                  # local resource root
//! │   └── data/contents/…
//! └── zone/home/proxy/         # federation prefix /zone/home/proxy
//!     └── def456/
//!         └── data/contents/…
//! ```
//!
//! # Security Model
//!
//! - The mount directory is canonicalised and validated at construction time
//! - `..` segments are rejected so no grid path escapes the mount
//! - Listings follow symlinks only to classify an entry as file or collection; a link whose
//!   target cannot be resolved is listed as a data object

use crate::{DataGrid, Listing, StorageError, StorageResult, GRID_SEPARATOR};
use std::fs;
use std::path::{Path, PathBuf};

/// Data grid served from a local mount directory
#[derive(Debug)]
pub struct LocalGrid {
    /// Canonicalised mount directory
    mount_root: PathBuf,
}

impl LocalGrid {
    /// Creates a new `LocalGrid` rooted at `mount_root`
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidRootDirectory` if:
    /// - The mount directory does not exist or is not a directory
    /// - Path canonicalisation fails
    pub fn new(mount_root: &Path) -> StorageResult<Self> {
        if !mount_root.exists() {
            return Err(StorageError::InvalidRootDirectory(format!(
                "Directory does not exist: {}",
                mount_root.display()
            )));
        }

        if !mount_root.is_dir() {
            return Err(StorageError::InvalidRootDirectory(format!(
                "Path is not a directory: {}",
                mount_root.display()
            )));
        }

        let mount_root = mount_root.canonicalize().map_err(|e| {
            StorageError::InvalidRootDirectory(format!(
                "Cannot canonicalize path {}: {}",
                mount_root.display(),
                e
            ))
        })?;

        Ok(Self { mount_root })
    }

    /// Returns the canonicalised mount directory
    #[must_use]
    pub fn mount_root(&self) -> &Path {
        &self.mount_root
    }

    /// Maps a grid path onto the local filesystem
    ///
    /// Leading separators are ignored, so `/zone/home/x` and `zone/home/x` map to the same
    /// place. Empty and `.` segments are skipped.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPath` if the path contains a `..` segment.
    fn local_path(&self, grid_path: &str) -> StorageResult<PathBuf> {
        let mut local = self.mount_root.clone();
        for segment in grid_path.split(GRID_SEPARATOR) {
            match segment {
                "" | "." => continue,
                ".." => {
                    return Err(StorageError::InvalidPath(format!(
                        "grid path escapes the mount: {}",
                        grid_path
                    )))
                }
                other => local.push(other),
            }
        }
        Ok(local)
    }
}

impl DataGrid for LocalGrid {
    fn exists(&self, path: &str) -> StorageResult<bool> {
        let local = self.local_path(path)?;
        local.try_exists().map_err(|e| StorageError::Unreachable {
            path: path.to_owned(),
            reason: e.to_string(),
        })
    }

    fn listdir(&self, path: &str) -> StorageResult<Listing> {
        let local = self.local_path(path)?;
        let listing_error = |reason: String| StorageError::Listing {
            path: path.to_owned(),
            reason,
        };

        let entries = fs::read_dir(&local).map_err(|e| listing_error(e.to_string()))?;

        let mut listing = Listing::default();
        for entry in entries {
            let entry = entry.map_err(|e| listing_error(e.to_string()))?;
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    let lossy = raw.to_string_lossy().into_owned();
                    tracing::warn!("entry name in {} is not valid UTF-8: {:?}", path, raw);
                    lossy
                }
            };

            let mut file_type = entry
                .file_type()
                .map_err(|e| listing_error(e.to_string()))?;
            if file_type.is_symlink() {
                match fs::metadata(entry.path()) {
                    Ok(target) => file_type = target.file_type(),
                    // a dangling link is still an object in the collection
                    Err(e) => tracing::warn!("unresolvable symlink {} in {}: {}", name, path, e),
                }
            }

            if file_type.is_dir() {
                listing.directories.push(name);
            } else {
                listing.files.push(name);
            }
        }

        listing.directories.sort();
        listing.files.sort();

        tracing::debug!(
            "listed {}: {} collections, {} data objects",
            path,
            listing.directories.len(),
            listing.files.len()
        );

        Ok(listing)
    }
}
