//! HTTP backend abstraction for the weather provider.
//!
//! The client only needs "GET this URL, give me status and body", so the
//! backend stays that small. Retries live in the client where the error
//! taxonomy is known.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::error::{PollError, PollResult};

/// Raw response. Non-success statuses are data, not errors, at this level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait HttpBackend: Send + Sync {
    /// Performs one GET. Transport failures (connect, timeout, broken body)
    /// are `PollError::Network`.
    async fn get(&self, url: &Url, timeout: Duration) -> PollResult<HttpResponse>;
}

/// Production backend on a shared `reqwest::Client`.
#[derive(Clone, Default)]
pub struct ReqwestBackend {
    client: reqwest::Client,
}

impl ReqwestBackend {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn get(&self, url: &Url, timeout: Duration) -> PollResult<HttpResponse> {
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|err| PollError::Network(err.without_url().to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| PollError::Network(err.without_url().to_string()))?;

        Ok(HttpResponse { status, body })
    }
}

// ============================================================================
// Fake Backend for Testing
// ============================================================================
