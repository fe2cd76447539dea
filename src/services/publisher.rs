//! AirMonitor publisher
//!
//! Responses are classified in this order: 200/201 success, 5xx retryable,
//! any other status a non-retryable rejection. Transport failures (refused
//! connection, DNS, timeout) are retried under the same policy as 5xx.

use crate::config::AirMonitorConfig;
use crate::error::{BridgeError, ErrorReporter, Result};
use crate::error_recovery::{RetryExecutor, RetryPolicy, RetryStats};
use crate::services::{Payload, ReadingSink};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::Serialize;
use tracing::{error, info, warn};

const COMPONENT: &str = "airmonitor";

/// Classification of a single publish attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishOutcome {
    Success,
    ClientRejected,
    RetryableFailure,
    TransportError,
}

impl PublishOutcome {
    /// Classify an HTTP status
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            200 | 201 => PublishOutcome::Success,
            500.. => PublishOutcome::RetryableFailure,
            _ => PublishOutcome::ClientRejected,
        }
    }

    /// Outcome that led to the given error
    fn from_error(error: &BridgeError) -> Self {
        match error {
            BridgeError::ServerError { .. } => PublishOutcome::RetryableFailure,
            BridgeError::Transport(_) => PublishOutcome::TransportError,
            _ => PublishOutcome::ClientRejected,
        }
    }
}

/// What one publish call did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    /// HTTP attempts made; zero when there was nothing to send
    pub attempts: u32,
    /// Classification of the final attempt
    pub outcome: Option<PublishOutcome>,
}

impl PublishReport {
    pub fn nothing_sent() -> Self {
        Self {
            attempts: 0,
            outcome: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Some(PublishOutcome::Success)
    }
}

/// HTTP publisher for the AirMonitor measurements API
#[derive(Debug)]
pub struct AirMonitorPublisher {
    client: Client,
    endpoint: String,
    executor: RetryExecutor,
}

impl AirMonitorPublisher {
    /// Create a new publisher with the API key attached to every request
    pub fn new(config: &AirMonitorConfig, policy: RetryPolicy) -> Result<Self> {
        let mut api_key = HeaderValue::from_str(config.api_key.trim())
            .map_err(|e| BridgeError::config(format!("Invalid AIRMONITOR_API_KEY: {e}")))?;
        api_key.set_sensitive(true);

        let mut default_headers = HeaderMap::new();
        default_headers.insert("X-Api-Key", api_key);

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .user_agent(format!("airmonitor-bridge/{}", env!("CARGO_PKG_VERSION")))
            .default_headers(default_headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.url.trim().to_string(),
            executor: RetryExecutor::new(policy),
        })
    }

    /// Retry statistics accumulated since startup
    pub fn retry_stats(&self) -> RetryStats {
        self.executor.stats()
    }

    /// Deliver a payload. `None` or an empty payload fails without any request.
    pub async fn send(&self, payload: Option<&Payload>) -> PublishReport {
        let Some(payload) = payload.filter(|p| !p.is_empty()) else {
            error!("No data to send to AirMonitor");
            return PublishReport::nothing_sent();
        };

        // Serialized once so every attempt carries the identical body
        let body = match serde_json::to_string(payload) {
            Ok(body) => body,
            Err(e) => {
                ErrorReporter::log_error(&e.into(), COMPONENT, "serialize");
                return PublishReport::nothing_sent();
            }
        };

        info!(sensor = %payload.sensor, "Sending data to AirMonitor API: {body}");

        let body = body.as_str();
        let attempted = self
            .executor
            .execute(move |attempt| self.post_once(body, attempt))
            .await;

        match attempted.result {
            Ok(()) => PublishReport {
                attempts: attempted.attempts,
                outcome: Some(PublishOutcome::Success),
            },
            Err(e) => {
                ErrorReporter::log_error(&e, COMPONENT, "publish");
                error!(
                    attempts = attempted.attempts,
                    "Failed to send data to AirMonitor"
                );
                PublishReport {
                    attempts: attempted.attempts,
                    outcome: Some(PublishOutcome::from_error(&e)),
                }
            }
        }
    }

    async fn post_once(&self, body: &str, attempt: u32) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_owned())
            .send()
            .await
            .map_err(|e| {
                warn!(attempt, "Request error: {e}");
                BridgeError::Transport(e)
            })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        match PublishOutcome::from_status(status) {
            PublishOutcome::Success => {
                info!(attempt, "Successfully sent data to AirMonitor: {text}");
                Ok(())
            }
            PublishOutcome::RetryableFailure => {
                warn!(attempt, status = status.as_u16(), "Server error");
                Err(BridgeError::server_error(status.as_u16(), text))
            }
            _ => {
                error!(
                    attempt,
                    status = status.as_u16(),
                    "Failed to send data to AirMonitor: {text}"
                );
                Err(BridgeError::client_error(status.as_u16(), text))
            }
        }
    }
}

#[async_trait]
impl ReadingSink for AirMonitorPublisher {
    async fn publish(&self, payload: &Payload) -> PublishReport {
        self.send(Some(payload)).await
    }
}
