//! gridcheck Storage Gateway
//!
//! This crate is the boundary between the reconciliation engine and the data grid that holds
//! resource files. The engine only ever needs two capabilities from the grid:
//!
//! - `exists(path)`: whether a data object or collection is present
//! - `listdir(path)`: the immediate sub-collections and data objects of a collection
//!
//! Both may fail with a transient error when the grid session breaks. Failures are returned
//! as values so callers can tell "absent" apart from "could not ask".
//!
//! ## Grid paths
//!
//! Grid paths are `/`-separated strings, independent of the host platform. Local resources
//! live under a relative collection (`<short_id>/...`), federated resources under an absolute
//! federation prefix (`/zone/home/proxy/<short_id>/...`).
//!
//! ## Implementations
//!
//! - [`LocalGrid`]: a grid mounted (or copied) onto the local filesystem
//! - [`MemoryGrid`]: an in-memory grid with failure injection, for tests and embedding
//!
//! ## Example Usage
//!
//! ```no_run
//! use gridcheck_storage::{DataGrid, GridRegistry, LocalGrid};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let local = LocalGrid::new(Path::new("/mnt/grid"))?;
//! let grids = GridRegistry::new(Arc::new(local));
//!
//! let listing = grids.for_zone(false).listdir("abc123/data/contents")?;
//! println!("{} files", listing.files.len());
//! # Ok(())
//! # }
//! ```

mod constants;
mod local;
mod memory;

pub use constants::GRID_SEPARATOR;
pub use local::LocalGrid;
pub use memory::MemoryGrid;

use std::sync::Arc;

/// Errors that can occur while talking to the data grid
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Mount directory does not exist or is not a directory
    #[error("Invalid root directory: {0}")]
    InvalidRootDirectory(String),

    /// Grid path cannot be mapped safely (directory traversal or similar)
    #[error("Invalid grid path: {0}")]
    InvalidPath(String),

    /// A collection could not be listed
    #[error("listing of collection {path} failed: {reason}")]
    Listing { path: String, reason: String },

    /// The grid could not answer at all
    #[error("data grid unreachable while accessing {path}: {reason}")]
    Unreachable { path: String, reason: String },

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// The contents of one collection, as names relative to that collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// Names of sub-collections
    pub directories: Vec<String>,

    /// Names of data objects
    pub files: Vec<String>,
}

/// Remote filesystem capability consumed by the reconciliation engine.
///
/// Implementations perform blocking calls and apply their own timeout and retry policy; the
/// engine never retries.
pub trait DataGrid: Send + Sync + std::fmt::Debug {
    /// Returns whether `path` names an existing data object or collection.
    fn exists(&self, path: &str) -> StorageResult<bool>;

    /// Lists the immediate contents of the collection at `path`.
    fn listdir(&self, path: &str) -> StorageResult<Listing>;
}

/// Selects the gateway that serves a resource.
///
/// Federated resources are served by the federated gateway when one is registered and by the
/// default gateway otherwise.
#[derive(Debug, Clone)]
pub struct GridRegistry {
    default: Arc<dyn DataGrid>,
    federated: Option<Arc<dyn DataGrid>>,
}

impl GridRegistry {
    pub fn new(default: Arc<dyn DataGrid>) -> Self {
        Self {
            default,
            federated: None,
        }
    }

    /// Registers the gateway used for federated resources.
    #[must_use]
    pub fn with_federated(mut self, federated: Arc<dyn DataGrid>) -> Self {
        self.federated = Some(federated);
        self
    }

    /// Returns the gateway for a resource in the given zone.
    pub fn for_zone(&self, federated: bool) -> &dyn DataGrid {
        match (&self.federated, federated) {
            (Some(grid), true) => grid.as_ref(),
            _ => self.default.as_ref(),
        }
    }

    /// Whether a dedicated federated gateway has been registered.
    pub fn has_federated(&self) -> bool {
        self.federated.is_some()
    }
}
