//! WireMock-based Home Assistant API mocking infrastructure
//!
//! Provides a mock REST API that answers the authentication probe and
//! per-entity state requests the bridge makes.

use airmonitor_bridge::config::HomeAssistantConfig;
use serde_json::json;
use std::time::Duration;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

pub const TEST_TOKEN: &str = "test-long-lived-token";

/// Mock Home Assistant instance
pub struct MockHomeAssistant {
    pub server: MockServer,
    pub base_url: String,
}

impl MockHomeAssistant {
    /// Start a server whose probe accepts the test token
    pub async fn start() -> Self {
        Self::start_with_probe_status(200).await
    }

    /// Start a server whose probe answers with the given status
    pub async fn start_with_probe_status(status: u16) -> Self {
        let server = MockServer::start().await;
        let base_url = format!("{}/api", server.uri());

        let mock_server = Self { server, base_url };
        mock_server.mock_probe(status).await;
        mock_server
    }

    async fn mock_probe(&self, status: u16) {
        let body = if status == 200 {
            json!({"message": "API running."})
        } else {
            json!({"message": "Unauthorized"})
        };

        Mock::given(method("GET"))
            .and(path("/api/"))
            .and(header("Authorization", format!("Bearer {TEST_TOKEN}").as_str()))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Serve a state string for one entity
    pub async fn mock_state(&self, entity_id: &str, state: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/api/states/{entity_id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "entity_id": entity_id,
                "state": state,
                "attributes": {
                    "unit_of_measurement": "µg/m³",
                    "device_class": "pm25"
                },
                "last_changed": "2024-01-01T12:00:00+00:00",
                "last_updated": "2024-01-01T12:00:00+00:00"
            })))
            .mount(&self.server)
            .await;
    }

    /// Serve an error status for one entity
    pub async fn mock_state_error(&self, entity_id: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(format!("/api/states/{entity_id}")))
            .respond_with(
                ResponseTemplate::new(status)
                    .set_body_json(json!({"message": "Entity not found."})),
            )
            .mount(&self.server)
            .await;
    }

    /// Number of per-entity requests received so far
    pub async fn state_request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path().starts_with("/api/states/"))
            .count()
    }

    /// Number of probe requests received so far
    pub async fn probe_request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == "/api/")
            .count()
    }

    pub fn config(&self) -> HomeAssistantConfig {
        HomeAssistantConfig {
            url: self.base_url.clone(),
            token: TEST_TOKEN.to_string(),
            timeout: Duration::from_secs(2),
        }
    }
}
