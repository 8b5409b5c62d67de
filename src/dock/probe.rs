use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::command_runner::CommandRunner;
use crate::geometry::Rect;
use crate::models::{DisplayInfo, DockEdge, DockGeometry};
use crate::notifier::ChangeNotifier;
use crate::settings::DockSettings;

use super::prefs::{count_plist_entries, parse_tile_size};

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "dock_probe";

use crate::{log_debug, log_info};

const DEFAULTS: &str = "/usr/bin/defaults";
const DOCK_DOMAIN: &str = "com.apple.dock";
const TILE_SIZE_KEY: &str = "tilesize";
const PERSISTENT_APPS_KEY: &str = "persistent-apps";
const PERSISTENT_OTHERS_KEY: &str = "persistent-others";
/// Used when the configured fallback is itself unusable.
const LAST_RESORT_TILE_POINTS: f64 = 60.0;

/// Samples dock preferences and turns them into a screen-space rectangle.
///
/// Every failure degrades to a fallback value, so a sample always yields a
/// usable geometry.
#[derive(Clone)]
pub struct DockGeometryProbe {
    runner: Arc<dyn CommandRunner>,
    settings: DockSettings,
    notifier: ChangeNotifier<DockGeometry>,
}

impl DockGeometryProbe {
    /// The baseline published before the first tick is the fallback geometry
    /// for `display`.
    pub fn new(runner: Arc<dyn CommandRunner>, settings: DockSettings, display: &DisplayInfo) -> Self {
        let baseline = fallback_geometry(&settings, display);
        Self {
            runner,
            settings,
            notifier: ChangeNotifier::new(baseline),
        }
    }

    pub fn current(&self) -> DockGeometry {
        self.notifier.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<DockGeometry> {
        self.notifier.subscribe()
    }

    pub async fn sample(&self, display: &DisplayInfo) -> DockGeometry {
        let (tile_points, apps, others) = tokio::join!(
            self.read_tile_size(),
            self.read_entry_count(PERSISTENT_APPS_KEY),
            self.read_entry_count(PERSISTENT_OTHERS_KEY),
        );

        let tile_points = match tile_points {
            Some(size) => size + self.settings.tile_padding,
            None => {
                log_debug!(
                    "tile size unavailable, using fallback {}pt",
                    self.settings.fallback_tile_size
                );
                self.settings.fallback_tile_size
            }
        };

        let icon_count = icon_count(apps, others, self.settings.icon_slot_offset);
        build_geometry(&self.settings, display, icon_count, tile_points)
    }

    /// Samples once and publishes on change. Returns whether observers were notified.
    pub async fn tick(&self, display: &DisplayInfo) -> bool {
        let geometry = self.sample(display).await;
        let changed = self.notifier.publish(geometry);
        if changed {
            log_debug!(
                "dock frame now {:?} (tile {})",
                geometry.frame,
                geometry.tile_size
            );
        }
        changed
    }

    pub async fn run(self, display_rx: watch::Receiver<DisplayInfo>, cancel_token: CancellationToken) {
        let mut ticker = tokio::time::interval(self.settings.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let display = *display_rx.borrow();
                    self.tick(&display).await;
                }
                _ = cancel_token.cancelled() => {
                    log_info!("dock probe shutting down");
                    break;
                }
            }
        }
    }

    async fn read_tile_size(&self) -> Option<f64> {
        self.read_default(TILE_SIZE_KEY)
            .await
            .and_then(|output| parse_tile_size(&output))
    }

    async fn read_entry_count(&self, key: &str) -> usize {
        self.read_default(key)
            .await
            .and_then(|output| count_plist_entries(&output))
            .unwrap_or(0)
    }

    async fn read_default(&self, key: &str) -> Option<String> {
        match self
            .runner
            .run(
                DEFAULTS,
                &["read", DOCK_DOMAIN, key],
                self.settings.command_timeout(),
            )
            .await
        {
            Ok(output) => Some(output),
            Err(err) => {
                log_debug!("defaults read {DOCK_DOMAIN} {key} failed: {err}");
                None
            }
        }
    }
}

/// Persisted icons plus the fixed slots, never less than one.
pub fn icon_count(apps: usize, others: usize, slot_offset: usize) -> usize {
    apps.saturating_add(others)
        .saturating_add(slot_offset)
        .max(1)
}

/// Bottom dock: `icon_count × tile` wide (clamped to the visible width),
/// horizontally centred on the visible frame, resting on its bottom edge.
pub fn compute_dock_frame(visible: Rect, icon_count: usize, tile_size: f64) -> Rect {
    let width = (icon_count as f64 * tile_size).min(visible.width);
    let x = visible.min_x() + (visible.width - width) / 2.0;
    Rect::new(x, visible.min_y(), width, tile_size)
}

fn fallback_geometry(settings: &DockSettings, display: &DisplayInfo) -> DockGeometry {
    let count = icon_count(0, 0, settings.icon_slot_offset);
    build_geometry(settings, display, count, settings.fallback_tile_size)
}

fn build_geometry(
    settings: &DockSettings,
    display: &DisplayInfo,
    icon_count: usize,
    tile_points: f64,
) -> DockGeometry {
    let scale = if display.scale_factor.is_finite() && display.scale_factor > 0.0 {
        display.scale_factor
    } else {
        1.0
    };

    let tile_points = if tile_points.is_finite() && tile_points > 0.0 {
        tile_points
    } else if settings.fallback_tile_size > 0.0 {
        settings.fallback_tile_size
    } else {
        LAST_RESORT_TILE_POINTS
    };
    let tile_size = tile_points * scale;

    let visible = if display.visible_frame.is_empty() {
        DisplayInfo::default().visible_frame
    } else {
        display.visible_frame
    };

    DockGeometry {
        edge: DockEdge::Bottom,
        frame: compute_dock_frame(visible, icon_count, tile_size),
        tile_size,
    }
}
