//! Data-grid path construction for resources.
//!
//! This module contains **no I/O logic** - only the derivation of canonical paths:
//!
//! ```text
//! root(resource)     = [federation_path/]short_id
//! content root       = root(resource)/data/contents
//! canonical path     = root(resource)/data/contents/[folder/]filename
//! ```

use crate::constants::{CONTENTS_DIR_NAME, CONTENT_HEADER, DATA_DIR_NAME};
use crate::resource::Resource;
use gridcheck_storage::GRID_SEPARATOR;

/// Joins two grid path components.
///
/// An absolute `child` replaces `base`, and a separator is only inserted when `base` does not
/// already end with one.
pub fn join(base: &str, child: &str) -> String {
    if child.starts_with(GRID_SEPARATOR) || base.is_empty() {
        return child.to_owned();
    }
    if base.ends_with(GRID_SEPARATOR) {
        format!("{base}{child}")
    } else {
        format!("{base}{GRID_SEPARATOR}{child}")
    }
}

/// Splits a path into its folder and final component at the last separator.
///
/// An empty folder is returned as `None`. Trailing separators on the folder are dropped.
pub fn split(path: &str) -> (Option<String>, String) {
    match path.rfind(GRID_SEPARATOR) {
        Some(idx) => {
            let head = &path[..idx + 1];
            let trimmed = head.trim_end_matches(GRID_SEPARATOR);
            let folder = if trimmed.is_empty() { head } else { trimmed };
            (Some(folder.to_owned()), path[idx + 1..].to_owned())
        }
        None => (None, path.to_owned()),
    }
}

/// The root collection of a resource: `federation_path/short_id` or `short_id`.
pub fn root_path(resource: &Resource) -> String {
    match &resource.federation_path {
        Some(prefix) => join(prefix.as_str(), resource.short_id.as_str()),
        None => resource.short_id.as_str().to_owned(),
    }
}

/// The collection holding a resource's content files.
pub fn file_path(resource: &Resource) -> String {
    join(
        &join(&root_path(resource), DATA_DIR_NAME),
        CONTENTS_DIR_NAME,
    )
}

/// The canonical path of `base` in `folder` of `resource`.
pub fn resource_file_path(resource: &Resource, base: &str, folder: Option<&str>) -> String {
    let content_root = file_path(resource);
    match folder {
        Some(folder) => join(&join(&content_root, folder), base),
        None => join(&content_root, base),
    }
}

/// The content root of a resource when qualified without federation: `short_id/data/contents/`.
pub fn local_content_prefix(resource: &Resource) -> String {
    format!("{}{GRID_SEPARATOR}{CONTENT_HEADER}", resource.short_id)
}

/// Strips the `data/contents/` header from a partially-qualified name.
pub fn strip_content_header(path: &str) -> Option<&str> {
    path.strip_prefix(CONTENT_HEADER)
}
