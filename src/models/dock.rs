use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// Screen edge the dock is attached to.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DockEdge {
    #[default]
    Bottom,
    Left,
    Right,
}

/// Immutable dock sample. Replaced wholesale on every probe tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DockGeometry {
    pub edge: DockEdge,
    pub frame: Rect,
    /// Always > 0.
    pub tile_size: f64,
}

/// What the host knows about the display the dock lives on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DisplayInfo {
    /// Full screen frame, used for widget layout.
    pub frame: Rect,
    /// Frame minus menu bar and dock reservations, used to place the dock.
    pub visible_frame: Rect,
    pub scale_factor: f64,
}

impl Default for DisplayInfo {
    fn default() -> Self {
        let screen = Rect::new(0.0, 0.0, 1920.0, 1080.0);
        Self {
            frame: screen,
            visible_frame: screen,
            scale_factor: 1.0,
        }
    }
}
