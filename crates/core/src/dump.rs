//! Side-by-side print of what the database and the data grid hold for a resource.
//!
//! Purely a read: nothing is checked or counted, and a collection that cannot be listed is
//! printed with the failure instead of aborting the dump.

use crate::inference::or_none;
use crate::paths;
use crate::resource::Resource;
use gridcheck_storage::{DataGrid, GRID_SEPARATOR};
use std::io::{self, Write};

/// Writes the database view and the data-grid tree of `resource` to `out`.
pub fn dump_resource(
    resource: &Resource,
    grid: &dyn DataGrid,
    out: &mut dyn Write,
) -> io::Result<()> {
    writeln!(out, "contents of {}", resource.short_id)?;
    writeln!(out, "According to the database:")?;
    writeln!(
        out,
        " federation_path is {}",
        or_none(resource.federation_path.as_ref().map(|p| p.as_str()))
    )?;
    writeln!(out, " Files are:")?;
    for record in &resource.files {
        writeln!(out, "  local_name is {}", or_none(record.local_name.as_deref()))?;
        writeln!(
            out,
            "  federated_name is {}",
            or_none(record.federated_name.as_deref())
        )?;
        writeln!(
            out,
            "  federated_name_or_path is {}",
            or_none(record.federated_name_or_path.as_deref())
        )?;
        writeln!(out, "  folder is {}", or_none(record.folder.as_deref()))?;
    }
    writeln!(out, "According to the data grid, files are:")?;
    list_tree(grid, &paths::file_path(resource), 1, out)
}

/// Prints the collection tree below `root`, one space of indent per level.
pub fn list_tree(
    grid: &dyn DataGrid,
    root: &str,
    depth: usize,
    out: &mut dyn Write,
) -> io::Result<()> {
    let mut pending = vec![(root.trim_end_matches(GRID_SEPARATOR).to_owned(), depth)];

    while let Some((collection, depth)) = pending.pop() {
        let prefix = " ".repeat(depth);
        match grid.listdir(&collection) {
            Ok(listing) => {
                writeln!(out, "{}{}: (directory)", prefix, collection)?;
                for name in &listing.files {
                    writeln!(out, "{} {} (file)", prefix, name)?;
                }
                for name in listing.directories.iter().rev() {
                    pending.push((paths::join(&collection, name), depth + 1));
                }
            }
            Err(e) => {
                writeln!(out, "{}{}: (directory CANNOT BE LISTED)", prefix, collection)?;
                writeln!(out, "{}reason: {}", prefix, e)?;
            }
        }
    }

    Ok(())
}
