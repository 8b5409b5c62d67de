use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::models::{Coordinate, WeatherReport};
use crate::notifier::ChangeNotifier;
use crate::settings::WeatherSettings;

use super::client::{WeatherClient, WeatherQuery};

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "weather_service";

use crate::{log_debug, log_info, log_warn};

/// Source of the device position. `None` means "unknown", and the service
/// falls back to the configured city.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_location(&self) -> Option<Coordinate>;
}

/// Always unknown.
pub struct NoLocation;

#[async_trait]
impl LocationProvider for NoLocation {
    async fn current_location(&self) -> Option<Coordinate> {
        None
    }
}

/// A coordinate fixed in settings.
pub struct FixedLocation(pub Coordinate);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_location(&self) -> Option<Coordinate> {
        Some(self.0)
    }
}

/// Picks the provider settings ask for.
pub fn location_provider(settings: &WeatherSettings) -> Arc<dyn LocationProvider> {
    match settings.fixed_coordinate() {
        Some(coordinate) => Arc::new(FixedLocation(coordinate)),
        None => Arc::new(NoLocation),
    }
}

/// Refreshes weather on a slow timer and publishes every outcome.
///
/// Unlike the other probes every refresh is published, failures included,
/// because `fetched_at` always moves.
#[derive(Clone)]
pub struct WeatherService {
    client: WeatherClient,
    location: Arc<dyn LocationProvider>,
    fallback_city: String,
    location_timeout: Duration,
    reports: ChangeNotifier<Option<WeatherReport>>,
}

impl WeatherService {
    pub fn new(client: WeatherClient, location: Arc<dyn LocationProvider>, settings: &WeatherSettings) -> Self {
        Self {
            client,
            location,
            fallback_city: settings.fallback_city.clone(),
            location_timeout: settings.location_timeout(),
            reports: ChangeNotifier::new(None),
        }
    }

    pub fn current(&self) -> Option<WeatherReport> {
        self.reports.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<WeatherReport>> {
        self.reports.subscribe()
    }

    /// Location lookup is bounded by `location_timeout`; a missing or slow
    /// location means the fallback city.
    pub async fn resolve_query(&self) -> WeatherQuery {
        match tokio::time::timeout(self.location_timeout, self.location.current_location()).await {
            Ok(Some(coordinate)) => WeatherQuery::Coordinate(coordinate),
            Ok(None) => {
                log_debug!("no location available, using '{}'", self.fallback_city);
                WeatherQuery::PlaceName(self.fallback_city.clone())
            }
            Err(_) => {
                log_warn!(
                    "location lookup timed out after {}ms, using '{}'",
                    self.location_timeout.as_millis(),
                    self.fallback_city
                );
                WeatherQuery::PlaceName(self.fallback_city.clone())
            }
        }
    }

    /// Fetches once and publishes the report. Returns `None` when the refresh
    /// was cancelled, in which case nothing is published.
    pub async fn refresh(&self, cancel_token: &CancellationToken) -> Option<WeatherReport> {
        let query = self.resolve_query().await;
        let result = self.client.fetch(&query, cancel_token).await;
        if cancel_token.is_cancelled() {
            return None;
        }

        if let Err(err) = &result {
            log_warn!("weather refresh for {query} failed: {err}");
        }
        let report = WeatherReport::from_result(result, Utc::now());
        self.reports.publish(Some(report.clone()));
        Some(report)
    }

    pub async fn run(self, interval: Duration, cancel_token: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh(&cancel_token).await;
                }
                _ = cancel_token.cancelled() => {
                    log_info!("weather service shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PollError;
    use crate::weather::http::testing::FakeBackend;

    const BODY: &str = r#"{"name": "Oslo", "main": {"temp": 4.2}, "weather": [{"main": "Snow", "description": "light snow"}]}"#;

    struct SlowLocation;

    #[async_trait]
    impl LocationProvider for SlowLocation {
        async fn current_location(&self) -> Option<Coordinate> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Some(Coordinate::new(0.0, 0.0))
        }
    }

    fn settings() -> WeatherSettings {
        WeatherSettings {
            api_key: "key".into(),
            retry_delay_ms: 1,
            location_timeout_ms: 20,
            fallback_city: "Oslo".into(),
            ..WeatherSettings::default()
        }
    }

    fn service(backend: Arc<FakeBackend>, location: Arc<dyn LocationProvider>) -> WeatherService {
        let settings = settings();
        WeatherService::new(WeatherClient::new(backend, &settings), location, &settings)
    }

    #[tokio::test]
    async fn test_refresh_publishes_snapshot() {
        let backend = Arc::new(FakeBackend::ok(200, BODY));
        let service = service(backend, Arc::new(NoLocation));
        let mut rx = service.subscribe();

        let report = service.refresh(&CancellationToken::new()).await.unwrap();
        assert_eq!(report.snapshot.as_ref().unwrap().location, "Oslo");
        assert!(report.error.is_none());
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().clone(), Some(report));
    }

    #[tokio::test]
    async fn test_failure_is_published_with_error() {
        let backend = Arc::new(FakeBackend::ok(401, r#"{"message": "Invalid API key"}"#));
        let service = service(backend, Arc::new(NoLocation));

        let report = service.refresh(&CancellationToken::new()).await.unwrap();
        assert!(report.snapshot.is_none());
        assert_eq!(
            report.error,
            Some(PollError::HttpStatus {
                code: 401,
                message: Some("Invalid API key".into())
            })
        );
        assert_eq!(service.current(), Some(report));
    }

    #[tokio::test]
    async fn test_fixed_location_queries_by_coordinate() {
        let backend = Arc::new(FakeBackend::ok(200, BODY));
        let service = service(
            backend.clone(),
            Arc::new(FixedLocation(Coordinate::new(59.91, 10.75))),
        );

        service.refresh(&CancellationToken::new()).await;
        let url = backend.requests()[0].clone();
        assert!(url.query_pairs().any(|(k, v)| k == "lat" && v == "59.91"));
        assert!(!url.query_pairs().any(|(k, _)| k == "q"));
    }

    #[tokio::test]
    async fn test_slow_location_falls_back_to_city() {
        let service = service(Arc::new(FakeBackend::ok(200, BODY)), Arc::new(SlowLocation));
        assert_eq!(
            service.resolve_query().await,
            WeatherQuery::PlaceName("Oslo".into())
        );
    }

    #[tokio::test]
    async fn test_cancelled_refresh_publishes_nothing() {
        let backend = Arc::new(FakeBackend::ok(200, BODY));
        let service = service(backend, Arc::new(NoLocation));
        let token = CancellationToken::new();
        token.cancel();

        assert!(service.refresh(&token).await.is_none());
        assert_eq!(service.current(), None);
    }

    #[tokio::test]
    async fn test_location_provider_from_settings() {
        let settings = WeatherSettings {
            latitude: Some(1.0),
            longitude: Some(2.0),
            ..WeatherSettings::default()
        };
        assert_eq!(
            location_provider(&settings).current_location().await,
            Some(Coordinate::new(1.0, 2.0))
        );
        assert_eq!(
            location_provider(&WeatherSettings::default())
                .current_location()
                .await,
            None
        );
    }
}
