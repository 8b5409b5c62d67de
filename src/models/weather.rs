use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PollError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Symbolic condition key. Resolving it to an image is the presentation
/// layer's job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WeatherIcon {
    Clear,
    Clouds,
    Rain,
    Snow,
    Thunderstorm,
    Mist,
    Unknown,
}

impl WeatherIcon {
    /// Maps the provider's condition group (`weather[0].main`).
    pub fn from_condition_group(group: &str) -> Self {
        match group.trim().to_ascii_lowercase().as_str() {
            "clear" => WeatherIcon::Clear,
            "clouds" => WeatherIcon::Clouds,
            "rain" | "drizzle" => WeatherIcon::Rain,
            "snow" => WeatherIcon::Snow,
            "thunderstorm" => WeatherIcon::Thunderstorm,
            "mist" | "fog" | "haze" | "smoke" => WeatherIcon::Mist,
            _ => WeatherIcon::Unknown,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            WeatherIcon::Clear => "clear",
            WeatherIcon::Clouds => "clouds",
            WeatherIcon::Rain => "rain",
            WeatherIcon::Snow => "snow",
            WeatherIcon::Thunderstorm => "thunderstorm",
            WeatherIcon::Mist => "mist",
            WeatherIcon::Unknown => "unknown",
        }
    }
}

/// Weather at one place. Temperatures are always Celsius.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    pub location: String,
    pub temperature_c: i32,
    pub condition: String,
    pub icon: WeatherIcon,
    pub feels_like_c: Option<i32>,
    pub humidity: Option<u8>,
    pub wind_speed_ms: Option<f64>,
}

impl WeatherSnapshot {
    pub fn display_temperature(&self, unit: TemperatureUnit) -> i32 {
        unit.convert(self.temperature_c)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn convert(&self, celsius: i32) -> i32 {
        match self {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => (f64::from(celsius) * 9.0 / 5.0 + 32.0).round() as i32,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }
}

/// Outcome of one weather refresh. On failure `snapshot` is `None` and the
/// presentation layer decides whether to keep showing older data.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    pub snapshot: Option<WeatherSnapshot>,
    pub error: Option<PollError>,
    pub fetched_at: DateTime<Utc>,
}

impl WeatherReport {
    pub fn from_result(result: Result<WeatherSnapshot, PollError>, fetched_at: DateTime<Utc>) -> Self {
        match result {
            Ok(snapshot) => Self {
                snapshot: Some(snapshot),
                error: None,
                fetched_at,
            },
            Err(error) => Self {
                snapshot: None,
                error: Some(error),
                fetched_at,
            },
        }
    }
}
