use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::{PollError, PollResult};
use crate::models::{Coordinate, WeatherSnapshot};
use crate::settings::WeatherSettings;

use super::api::{decode_snapshot, error_message};
use super::http::HttpBackend;

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "weather_client";

use crate::{log_debug, log_warn};

/// What to ask the provider about.
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherQuery {
    Coordinate(Coordinate),
    PlaceName(String),
}

impl std::fmt::Display for WeatherQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeatherQuery::Coordinate(c) => write!(f, "({:.2}, {:.2})", c.latitude, c.longitude),
            WeatherQuery::PlaceName(name) => write!(f, "'{name}'"),
        }
    }
}

/// Snapshots store Celsius, so the provider is always asked for metric.
const UNITS: &str = "metric";

/// Fetches current weather, retrying transport failures only.
#[derive(Clone)]
pub struct WeatherClient {
    backend: Arc<dyn HttpBackend>,
    base_url: String,
    api_key: String,
    timeout: Duration,
    max_retries: u8,
    retry_delay: Duration,
}

impl WeatherClient {
    pub fn new(backend: Arc<dyn HttpBackend>, settings: &WeatherSettings) -> Self {
        Self {
            backend,
            base_url: settings.base_url.clone(),
            api_key: settings.api_key.clone(),
            timeout: settings.request_timeout(),
            max_retries: settings.max_retries,
            retry_delay: settings.retry_delay(),
        }
    }

    pub fn request_url(&self, query: &WeatherQuery) -> PollResult<Url> {
        if self.api_key.trim().is_empty() {
            return Err(PollError::InvalidInput("weather API key is not configured".into()));
        }

        let mut params: Vec<(&str, String)> = match query {
            WeatherQuery::Coordinate(coordinate) => {
                if !coordinate.is_valid() {
                    return Err(PollError::InvalidInput(format!(
                        "coordinate out of range: {query}"
                    )));
                }
                vec![
                    ("lat", coordinate.latitude.to_string()),
                    ("lon", coordinate.longitude.to_string()),
                ]
            }
            WeatherQuery::PlaceName(name) => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(PollError::InvalidInput("place name is empty".into()));
                }
                vec![("q", name.to_string())]
            }
        };
        params.push(("appid", self.api_key.clone()));
        params.push(("units", UNITS.to_string()));

        Url::parse_with_params(&self.base_url, &params)
            .map_err(|err| PollError::InvalidInput(format!("bad base URL '{}': {err}", self.base_url)))
    }

    /// One request, no retry.
    pub async fn fetch_once(&self, url: &Url) -> PollResult<WeatherSnapshot> {
        let response = self.backend.get(url, self.timeout).await?;
        if response.status == 200 {
            return decode_snapshot(&response.body);
        }
        Err(PollError::HttpStatus {
            code: response.status,
            message: error_message(&response.body),
        })
    }

    /// Fetches with up to `max_retries` extra attempts on `Network` errors,
    /// `retry_delay` apart. Cancellation is checked before every attempt and
    /// interrupts both the request and the delay.
    pub async fn fetch(
        &self,
        query: &WeatherQuery,
        cancel_token: &CancellationToken,
    ) -> PollResult<WeatherSnapshot> {
        let url = self.request_url(query)?;
        let mut attempt: u8 = 0;

        loop {
            if cancel_token.is_cancelled() {
                return Err(PollError::Cancelled);
            }

            let result = tokio::select! {
                result = self.fetch_once(&url) => result,
                _ = cancel_token.cancelled() => return Err(PollError::Cancelled),
            };

            match result {
                Ok(snapshot) => {
                    log_debug!("weather for {query}: {}°C {}", snapshot.temperature_c, snapshot.condition);
                    return Ok(snapshot);
                }
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    log_warn!(
                        "weather fetch for {query} failed ({err}); retry {attempt}/{} in {}ms",
                        self.max_retries,
                        self.retry_delay.as_millis()
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(self.retry_delay) => {}
                        _ = cancel_token.cancelled() => return Err(PollError::Cancelled),
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::http::testing::FakeBackend;
    use crate::weather::http::HttpResponse;

    const BODY: &str = r#"{"name": "Delhi", "main": {"temp": 31.6}, "weather": [{"main": "Haze", "description": "haze"}]}"#;

    fn settings() -> WeatherSettings {
        WeatherSettings {
            api_key: "key".into(),
            retry_delay_ms: 1,
            ..WeatherSettings::default()
        }
    }

    fn client(backend: Arc<FakeBackend>) -> WeatherClient {
        WeatherClient::new(backend, &settings())
    }

    fn city(name: &str) -> WeatherQuery {
        WeatherQuery::PlaceName(name.into())
    }

    #[tokio::test]
    async fn test_success_decodes_snapshot() {
        let backend = Arc::new(FakeBackend::ok(200, BODY));
        let snapshot = client(backend.clone())
            .fetch(&city("Delhi"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(snapshot.temperature_c, 31);
        assert_eq!(snapshot.condition, "Haze");
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_network_failure_retries_three_times() {
        let backend = Arc::new(FakeBackend::failing("connection reset"));
        let result = client(backend.clone())
            .fetch(&city("Delhi"), &CancellationToken::new())
            .await;

        assert_eq!(result, Err(PollError::Network("connection reset".into())));
        assert_eq!(backend.call_count(), 4);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let backend = Arc::new(FakeBackend::ok(404, r#"{"cod": "404", "message": "city not found"}"#));
        let result = client(backend.clone())
            .fetch(&city("Atlantis"), &CancellationToken::new())
            .await;

        assert_eq!(
            result,
            Err(PollError::HttpStatus {
                code: 404,
                message: Some("city not found".into())
            })
        );
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let backend = Arc::new(FakeBackend::new(vec![
            Err(PollError::Network("timeout".into())),
            Ok(HttpResponse {
                status: 200,
                body: BODY.into(),
            }),
        ]));
        let result = client(backend.clone())
            .fetch(&city("Delhi"), &CancellationToken::new())
            .await;

        assert!(result.is_ok());
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let backend = Arc::new(FakeBackend::ok(200, "{\"main\": 3}"));
        let result = client(backend.clone())
            .fetch(&city("Delhi"), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(PollError::Decode(_))));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_input_never_hits_network() {
        let backend = Arc::new(FakeBackend::ok(200, BODY));
        let client = client(backend.clone());
        let token = CancellationToken::new();

        assert!(matches!(
            client.fetch(&city("   "), &token).await,
            Err(PollError::InvalidInput(_))
        ));
        assert!(matches!(
            client
                .fetch(&WeatherQuery::Coordinate(Coordinate::new(95.0, 0.0)), &token)
                .await,
            Err(PollError::InvalidInput(_))
        ));

        let keyless = WeatherClient::new(backend.clone(), &WeatherSettings::default());
        assert!(matches!(
            keyless.fetch(&city("Delhi"), &token).await,
            Err(PollError::InvalidInput(_))
        ));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_stops_retry_sequence() {
        let backend = Arc::new(FakeBackend::failing("unreachable"));
        let client = WeatherClient::new(
            backend.clone(),
            &WeatherSettings {
                retry_delay_ms: 60_000,
                ..settings()
            },
        );
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            client.fetch(&city("Delhi"), &token),
        )
        .await
        .unwrap();
        assert_eq!(result, Err(PollError::Cancelled));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_sends_nothing() {
        let backend = Arc::new(FakeBackend::ok(200, BODY));
        let token = CancellationToken::new();
        token.cancel();

        let result = client(backend.clone()).fetch(&city("Delhi"), &token).await;
        assert_eq!(result, Err(PollError::Cancelled));
        assert_eq!(backend.call_count(), 0);
    }

    #[test]
    fn test_request_url_parameters() {
        let backend = Arc::new(FakeBackend::ok(200, BODY));
        let client = client(backend);

        let url = client
            .request_url(&WeatherQuery::Coordinate(Coordinate::new(28.61, 77.2)))
            .unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("lat".to_string(), "28.61".to_string()),
                ("lon".to_string(), "77.2".to_string()),
                ("appid".to_string(), "key".to_string()),
                ("units".to_string(), "metric".to_string()),
            ]
        );

        let url = client.request_url(&city("New Delhi")).unwrap();
        assert!(url.as_str().contains("q=New+Delhi"));
    }

    #[test]
    fn test_units_setting_cannot_switch_to_imperial() {
        let settings: WeatherSettings =
            serde_json::from_str(r#"{"apiKey": "key", "units": "imperial"}"#).unwrap();
        let client = WeatherClient::new(Arc::new(FakeBackend::ok(200, BODY)), &settings);

        let url = client.request_url(&city("Boston")).unwrap();
        let units: Vec<String> = url
            .query_pairs()
            .filter(|(key, _)| key == "units")
            .map(|(_, value)| value.into_owned())
            .collect();
        assert_eq!(units, vec!["metric".to_string()]);
    }
}
