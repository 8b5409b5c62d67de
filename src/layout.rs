//! Widget anchor placement around the dock.
//!
//! Pure geometry: no I/O and no stored state, so identical inputs always
//! produce identical anchors.

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};
use crate::models::DockEdge;
use crate::settings::LayoutSettings;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum WidgetId {
    Clock,
    Weather,
    Music,
}

/// Centre point of one widget, in screen coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WidgetAnchor {
    pub id: WidgetId,
    pub point: Point,
}

/// The three anchors, always replaced together.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WidgetLayout {
    pub clock: WidgetAnchor,
    pub weather: WidgetAnchor,
    pub music: WidgetAnchor,
}

impl WidgetLayout {
    pub fn anchors(&self) -> [WidgetAnchor; 3] {
        [self.clock, self.weather, self.music]
    }
}

/// Placement constants.
///
/// Bottom dock (the dock is first clamped into the screen's horizontal span):
///
/// ```text
/// clock.x      = screen.min_x + (dock.min_x - screen.min_x) * left_zone_fraction
/// right_center = dock.max_x + (screen.max_x - dock.max_x) * right_zone_fraction
/// right_zone   = screen.max_x - dock.max_x
/// spacing      = min(widget_spacing, right_zone / 2)
/// pair_center  = clamp(right_center, dock.max_x + spacing, screen.max_x - spacing)
/// weather.x    = pair_center - spacing / 2
/// music.x      = pair_center + spacing / 2
/// y            = dock.mid_y   (all three)
/// ```
///
/// The spacing shrinks and the pair centre is clamped so both anchors stay
/// right of the dock and on screen however wide the dock gets.
///
/// Side docks use the same horizontal zones, with the clock on the screen's
/// vertical centre and weather/music stacked `vertical_spacing` apart
/// around it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutPolicy {
    pub left_zone_fraction: f64,
    pub right_zone_fraction: f64,
    pub widget_spacing: f64,
    pub vertical_spacing: f64,
}

impl Default for LayoutPolicy {
    fn default() -> Self {
        Self::from(&LayoutSettings::default())
    }
}

impl From<&LayoutSettings> for LayoutPolicy {
    fn from(settings: &LayoutSettings) -> Self {
        Self {
            left_zone_fraction: unit_fraction(settings.left_zone_fraction),
            right_zone_fraction: unit_fraction(settings.right_zone_fraction),
            widget_spacing: non_negative(settings.widget_spacing),
            vertical_spacing: non_negative(settings.vertical_spacing),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayoutEngine {
    policy: LayoutPolicy,
}

impl LayoutEngine {
    pub fn new(policy: LayoutPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> LayoutPolicy {
        self.policy
    }

    pub fn compute(&self, screen: Rect, dock: Rect, edge: DockEdge) -> WidgetLayout {
        let dock = clamp_horizontally(dock, screen);
        let policy = &self.policy;

        let left_center = screen.min_x() + (dock.min_x() - screen.min_x()) * policy.left_zone_fraction;
        let right_center = dock.max_x() + (screen.max_x() - dock.max_x()) * policy.right_zone_fraction;

        let (clock, weather, music) = match edge {
            DockEdge::Bottom => {
                let y = dock.mid_y();
                let right_zone = screen.max_x() - dock.max_x();
                let spacing = policy.widget_spacing.min(right_zone / 2.0);
                let pair_center = right_center.clamp(dock.max_x() + spacing, screen.max_x() - spacing);
                let half = spacing / 2.0;
                (
                    Point::new(left_center, y),
                    Point::new(pair_center - half, y),
                    Point::new(pair_center + half, y),
                )
            }
            DockEdge::Left | DockEdge::Right => {
                let y = screen.mid_y();
                let half = policy.vertical_spacing / 2.0;
                (
                    Point::new(left_center, y),
                    Point::new(right_center, y - half),
                    Point::new(right_center, y + half),
                )
            }
        };

        WidgetLayout {
            clock: WidgetAnchor { id: WidgetId::Clock, point: clock },
            weather: WidgetAnchor { id: WidgetId::Weather, point: weather },
            music: WidgetAnchor { id: WidgetId::Music, point: music },
        }
    }
}

fn clamp_horizontally(dock: Rect, screen: Rect) -> Rect {
    let min_x = dock.min_x().clamp(screen.min_x(), screen.max_x());
    let max_x = dock.max_x().clamp(min_x, screen.max_x());
    Rect::new(min_x, dock.y, max_x - min_x, dock.height)
}

fn unit_fraction(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.5
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}
