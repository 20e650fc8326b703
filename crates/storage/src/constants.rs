/// Separator between collections in a data-grid path, regardless of host platform.
pub const GRID_SEPARATOR: char = '/';
