//! Constants used throughout the gridcheck core crate.
//!
//! This module contains the data-grid layout names, legacy sentinels and configuration keys
//! so they are defined in exactly one place.

/// Collection below a resource root that holds the bag payload.
pub const DATA_DIR_NAME: &str = "data";

/// Collection below `data/` that holds the resource's content files.
pub const CONTENTS_DIR_NAME: &str = "contents";

/// Header that partially-qualified legacy names start with.
pub const CONTENT_HEADER: &str = "data/contents/";

/// Text stored by a historical bug in place of a missing file name.
pub const ABSENT_NAME_SENTINEL: &str = "None";

/// Resource type reported when the catalog does not record one.
pub const DEFAULT_RESOURCE_TYPE: &str = "GenericResource";

/// Default mount directory of the data grid.
pub const DEFAULT_GRID_ROOT: &str = "grid";

/// Default resource catalog exported from the database.
pub const DEFAULT_CATALOG_FILENAME: &str = "resources.yaml";

/// Environment variable naming the data-grid mount directory.
pub const GRID_ROOT_ENV: &str = "GRIDCHECK_GRID_ROOT";

/// Environment variable naming the federated data-grid mount directory.
pub const FEDERATED_GRID_ROOT_ENV: &str = "GRIDCHECK_FEDERATED_GRID_ROOT";

/// Environment variable enabling checks of federated resources.
pub const REMOTE_USE_GRID_ENV: &str = "GRIDCHECK_REMOTE_USE_GRID";

/// Environment variable naming the resource catalog.
pub const CATALOG_ENV: &str = "GRIDCHECK_CATALOG";
