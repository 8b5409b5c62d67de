use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::{Coordinate, MediaApp};

const CONFIG_ENV: &str = "DOCKWIDGETS_CONFIG";
const API_KEY_ENV: &str = "DOCKWIDGETS_WEATHER_API_KEY";
const CITY_ENV: &str = "DOCKWIDGETS_CITY";
const DEBUG_ENV: &str = "DOCKWIDGETS_DEBUG";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub dock: DockSettings,
    pub media: MediaSettings,
    pub weather: WeatherSettings,
    pub layout: LayoutSettings,
    /// Lowers the default log level to debug.
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct DockSettings {
    pub interval_ms: u64,
    pub command_timeout_ms: u64,
    /// Added to the tile size read from preferences, in points.
    pub tile_padding: f64,
    /// Used when the tile size cannot be read, in points.
    pub fallback_tile_size: f64,
    /// Slots the dock shows beyond the persisted icons (trash, separator).
    pub icon_slot_offset: usize,
}

impl Default for DockSettings {
    fn default() -> Self {
        Self {
            interval_ms: 1_000,
            command_timeout_ms: 5_000,
            tile_padding: 4.0,
            fallback_tile_size: 60.0,
            icon_slot_offset: 2,
        }
    }
}

impl DockSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct MediaSettings {
    pub interval_ms: u64,
    /// Upper bound for one whole tick across every source.
    pub tick_timeout_ms: u64,
    pub script_timeout_ms: u64,
    /// First playing source in this order wins.
    pub priority: Vec<MediaApp>,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            interval_ms: 2_000,
            tick_timeout_ms: 10_000,
            script_timeout_ms: 5_000,
            priority: vec![MediaApp::Music, MediaApp::Spotify],
        }
    }
}

impl MediaSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    pub fn tick_timeout(&self) -> Duration {
        Duration::from_millis(self.tick_timeout_ms)
    }

    pub fn script_timeout(&self) -> Duration {
        Duration::from_millis(self.script_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct WeatherSettings {
    pub interval_secs: u64,
    pub base_url: String,
    pub api_key: String,
    pub request_timeout_ms: u64,
    pub max_retries: u8,
    pub retry_delay_ms: u64,
    pub fallback_city: String,
    pub location_timeout_ms: u64,
    /// Fixed coordinate used instead of a location service when both are set.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            interval_secs: 600,
            base_url: "https://api.openweathermap.org/data/2.5/weather".into(),
            api_key: String::new(),
            request_timeout_ms: 10_000,
            max_retries: 3,
            retry_delay_ms: 2_000,
            fallback_city: "New Delhi".into(),
            location_timeout_ms: 10_000,
            latitude: None,
            longitude: None,
        }
    }
}

impl WeatherSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn location_timeout(&self) -> Duration {
        Duration::from_millis(self.location_timeout_ms)
    }

    pub fn fixed_coordinate(&self) -> Option<Coordinate> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinate::new(latitude, longitude)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutSettings {
    /// Where the clock sits between the screen's left edge (0) and the dock's left edge (1).
    pub left_zone_fraction: f64,
    /// Where the weather/music pair is centred between the dock's right edge (0) and the screen's right edge (1).
    pub right_zone_fraction: f64,
    /// Horizontal distance between the weather and music anchors.
    pub widget_spacing: f64,
    /// Vertical distance between weather and music on a side dock.
    pub vertical_spacing: f64,
    /// Recompute anchors automatically whenever the dock geometry changes.
    /// Off by default: widgets keep their positions while the dock resizes.
    pub relayout_on_dock_change: bool,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            left_zone_fraction: 0.5,
            right_zone_fraction: 0.5,
            widget_spacing: 140.0,
            vertical_spacing: 80.0,
            relayout_on_dock_change: false,
        }
    }
}

impl Settings {
    /// Loads settings from `DOCKWIDGETS_CONFIG`, or the default config path,
    /// then applies environment overrides. A missing or unreadable file means
    /// defaults.
    pub fn load() -> Self {
        let path = env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .or_else(default_config_path);

        let mut settings = match path {
            Some(path) if path.exists() => Self::from_file(&path).unwrap_or_else(|err| {
                log::warn!("{err:#}; using defaults");
                Self::default()
            }),
            _ => Self::default(),
        };
        settings.apply_env_overrides(|key| env::var(key).ok());
        settings
    }

    /// Parses a settings file. Malformed JSON falls back to defaults with a
    /// warning; an unreadable file is an error.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;

        match serde_json::from_str(&contents) {
            Ok(settings) => Ok(settings),
            Err(err) => {
                log::warn!(
                    "Ignoring malformed settings file {}: {err}; using defaults",
                    path.display()
                );
                Ok(Self::default())
            }
        }
    }

    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(API_KEY_ENV).filter(|value| !value.trim().is_empty()) {
            self.weather.api_key = key;
        }
        if let Some(city) = lookup(CITY_ENV).filter(|value| !value.trim().is_empty()) {
            self.weather.fallback_city = city;
        }
        if let Some(debug) = lookup(DEBUG_ENV) {
            self.debug = debug == "1" || debug.eq_ignore_ascii_case("true");
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dockwidgets").join("settings.json"))
}
