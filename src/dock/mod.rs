mod prefs;
pub mod probe;

pub use prefs::{count_plist_entries, parse_tile_size};
pub use probe::{compute_dock_frame, DockGeometryProbe};
