use serde::Serialize;

use crate::layout::WidgetLayout;
use crate::models::{DockGeometry, MediaApp, NowPlayingSnapshot, WeatherReport};

/// Merged change notification fanned out to every subscriber.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum PollEvent {
    DockChanged(DockGeometry),
    NowPlayingChanged(NowPlayingSnapshot),
    /// Emitted once each time an application starts refusing automation.
    MediaPermissionDenied(MediaApp),
    WeatherUpdated(WeatherReport),
    LayoutChanged(WidgetLayout),
}

impl PollEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PollEvent::DockChanged(_) => "dock-changed",
            PollEvent::NowPlayingChanged(_) => "now-playing-changed",
            PollEvent::MediaPermissionDenied(_) => "media-permission-denied",
            PollEvent::WeatherUpdated(_) => "weather-updated",
            PollEvent::LayoutChanged(_) => "layout-changed",
        }
    }
}
