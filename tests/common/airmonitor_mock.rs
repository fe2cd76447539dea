//! WireMock-based AirMonitor measurements API

use airmonitor_bridge::config::AirMonitorConfig;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

pub const TEST_API_KEY: &str = "test-api-key";
pub const MEASUREMENTS_PATH: &str = "/prod/measurements";

/// Mock AirMonitor API
pub struct MockAirMonitor {
    pub server: MockServer,
    pub endpoint: String,
}

impl MockAirMonitor {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let endpoint = format!("{}{MEASUREMENTS_PATH}", server.uri());
        Self { server, endpoint }
    }

    /// Answer consecutive POSTs with the given statuses, one each, in order
    pub async fn respond_with_sequence(&self, statuses: &[u16]) {
        for status in statuses {
            Mock::given(method("POST"))
                .and(path(MEASUREMENTS_PATH))
                .respond_with(response(*status))
                .up_to_n_times(1)
                .mount(&self.server)
                .await;
        }
    }

    /// Answer every POST with the given status
    pub async fn always_respond_with(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path(MEASUREMENTS_PATH))
            .respond_with(response(status))
            .mount(&self.server)
            .await;
    }

    /// JSON bodies of every POST received so far
    pub async fn received_bodies(&self) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == MEASUREMENTS_PATH)
            .map(|r| serde_json::from_slice(&r.body).unwrap_or(Value::Null))
            .collect()
    }

    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .len()
    }

    pub fn config(&self) -> AirMonitorConfig {
        AirMonitorConfig {
            url: self.endpoint.clone(),
            api_key: TEST_API_KEY.to_string(),
            timeout: Duration::from_secs(2),
        }
    }
}

fn response(status: u16) -> ResponseTemplate {
    match status {
        200 | 201 => ResponseTemplate::new(status).set_body_json(json!({"status": "ok"})),
        500.. => ResponseTemplate::new(status).set_body_string("Internal Server Error"),
        _ => ResponseTemplate::new(status).set_body_json(json!({"message": "Forbidden"})),
    }
}
