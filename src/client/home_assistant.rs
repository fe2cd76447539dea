//! HTTP client for the Home Assistant REST API
//!
//! One `reqwest::Client` is built at startup and reused by every cycle. The
//! authentication probe is repeated at the start of each cycle, so a revoked
//! token stops forwarding on the next tick without restarting the process.

use crate::client::{RawState, StateSource, StateStatus};
use crate::config::registry::EntityMapping;
use crate::config::HomeAssistantConfig;
use crate::error::{BridgeError, ErrorReporter, Result};
use crate::services::ReadingSet;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

const COMPONENT: &str = "home_assistant";

/// Body of `GET /api/states/<entity_id>`; only `state` is used
#[derive(Debug, Deserialize)]
struct EntityStateResponse {
    #[serde(default)]
    state: Option<serde_json::Value>,
}

/// HTTP client for the Home Assistant state API
#[derive(Debug, Clone)]
pub struct HomeAssistantClient {
    client: Client,
    base_url: String,
    has_token: bool,
}

impl HomeAssistantClient {
    /// Create a new client with bearer authentication
    pub fn new(config: &HomeAssistantConfig) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let has_token = !config.token.trim().is_empty();
        if has_token {
            let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", config.token.trim()))
                .map_err(|e| BridgeError::config(format!("Invalid HA_TOKEN: {e}")))?;
            auth_value.set_sensitive(true);
            default_headers.insert(AUTHORIZATION, auth_value);
        }

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .user_agent(format!("airmonitor-bridge/{}", env!("CARGO_PKG_VERSION")))
            .default_headers(default_headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim().trim_end_matches('/').to_string(),
            has_token,
        })
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Probe the API root. Only a 200 lets the cycle continue.
    pub async fn probe(&self) -> Result<()> {
        info!("Testing Home Assistant API authentication...");

        let response = self.client.get(self.build_url("")).send().await?;
        let status = response.status();

        match status {
            StatusCode::OK => {
                info!("Authentication successful");
                Ok(())
            }
            StatusCode::UNAUTHORIZED => Err(BridgeError::authentication(
                "Invalid token or insufficient permissions; create a new long-lived access token in Home Assistant",
            )),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(BridgeError::authentication(format!(
                    "API test failed with status code {status}: {body}"
                )))
            }
        }
    }

    /// Read one entity. Never fails: problems are encoded in the returned status.
    pub async fn get_state(&self, entity_id: &str) -> RawState {
        let url = self.build_url(&format!("states/{entity_id}"));

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                error!(entity = entity_id, "Request error: {e}");
                return RawState::transport_error(entity_id);
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            error!(
                entity = entity_id,
                status = status.as_u16(),
                "Failed to get entity state: {body}"
            );
            return RawState::not_found(entity_id);
        }

        match response.json::<EntityStateResponse>().await {
            Ok(body) => RawState::from_state(entity_id, body.state.and_then(state_to_string)),
            Err(e) => {
                error!(entity = entity_id, "Invalid state response: {e}");
                RawState::transport_error(entity_id)
            }
        }
    }
}

/// Home Assistant always sends strings, but tolerate bare numbers
fn state_to_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl StateSource for HomeAssistantClient {
    async fn fetch_readings(&self, mappings: &[EntityMapping]) -> ReadingSet {
        let mut readings = ReadingSet::new();

        if !self.has_token {
            error!("Home Assistant token is not set");
            return readings;
        }
        if self.base_url.is_empty() {
            error!("Home Assistant URL is not set");
            return readings;
        }

        if let Err(e) = self.probe().await {
            ErrorReporter::log_error(&e, COMPONENT, "probe");
            return readings;
        }

        for mapping in mappings {
            let raw = self.get_state(mapping.source_name()).await;

            match raw.coerce() {
                Ok(value) => {
                    info!(entity = mapping.source_name(), "Retrieved {value}");
                    readings.insert(mapping.target_key().to_string(), value);
                }
                Err(e @ BridgeError::ValueCoercion(_)) => {
                    ErrorReporter::log_error(&e, COMPONENT, "coerce");
                }
                Err(_) => match raw.status {
                    StateStatus::NotFound | StateStatus::TransportError => {
                        debug!(
                            entity = mapping.source_name(),
                            status = %raw.status,
                            "Entity skipped this cycle"
                        );
                    }
                    _ => {
                        warn!(
                            entity = mapping.source_name(),
                            "Entity has state '{}', skipping",
                            raw.raw_value.as_deref().unwrap_or_default()
                        );
                    }
                },
            }
        }

        debug!(
            fetched = readings.len(),
            configured = mappings.len(),
            "Finished reading entity states"
        );

        readings
    }
}
