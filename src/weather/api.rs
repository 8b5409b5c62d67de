//! Wire types for the current-weather endpoint.

use serde::Deserialize;

use crate::error::{PollError, PollResult};
use crate::models::{WeatherIcon, WeatherSnapshot};

#[derive(Debug, Deserialize)]
pub struct CurrentWeatherResponse {
    #[serde(default)]
    pub name: String,
    pub main: MainBlock,
    #[serde(default)]
    pub weather: Vec<ConditionBlock>,
    pub wind: Option<WindBlock>,
}

#[derive(Debug, Deserialize)]
pub struct MainBlock {
    pub temp: f64,
    pub humidity: Option<f64>,
    pub feels_like: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ConditionBlock {
    #[serde(default)]
    pub main: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct WindBlock {
    pub speed: Option<f64>,
}

/// Body the provider sends with non-200 statuses. `cod` is sometimes a
/// string and sometimes a number, so it is not read.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub message: Option<String>,
}

impl CurrentWeatherResponse {
    pub fn into_snapshot(self) -> WeatherSnapshot {
        let condition = self.weather.first();
        let description = condition
            .map(|c| capitalize_words(&c.description))
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| "Unknown".to_string());
        let icon = condition
            .map(|c| WeatherIcon::from_condition_group(&c.main))
            .unwrap_or(WeatherIcon::Unknown);

        WeatherSnapshot {
            location: self.name,
            temperature_c: truncate_degrees(self.main.temp),
            condition: description,
            icon,
            feels_like_c: self.main.feels_like.map(truncate_degrees),
            humidity: self
                .main
                .humidity
                .filter(|h| h.is_finite())
                .map(|h| h.clamp(0.0, 100.0) as u8),
            wind_speed_ms: self.wind.and_then(|w| w.speed),
        }
    }
}

pub fn decode_snapshot(body: &str) -> PollResult<WeatherSnapshot> {
    let response: CurrentWeatherResponse = serde_json::from_str(body)?;
    if !response.main.temp.is_finite() {
        return Err(PollError::Decode("temperature is not a number".into()));
    }
    Ok(response.into_snapshot())
}

/// Provider message from an error body, if the body carried one.
pub fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.message)
        .filter(|message| !message.trim().is_empty())
}

fn truncate_degrees(value: f64) -> i32 {
    value.trunc() as i32
}

fn capitalize_words(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
