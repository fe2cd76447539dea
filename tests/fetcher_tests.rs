//! State fetching against a mock Home Assistant API

mod common;

use airmonitor_bridge::config::HomeAssistantConfig;
use airmonitor_bridge::{EntityMapping, HomeAssistantClient, ReadingSet, StateSource};
use common::home_assistant_mock::MockHomeAssistant;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::time::Duration;

fn mappings(pairs: &[(&str, &str)]) -> Vec<EntityMapping> {
    pairs
        .iter()
        .map(|(source, target)| EntityMapping::new(*source, *target))
        .collect()
}

#[tokio::test]
async fn test_valid_states_are_keyed_by_target() {
    let ha = MockHomeAssistant::start().await;
    ha.mock_state("sensor.pm25", "12.4").await;
    ha.mock_state("sensor.temperature", "20.6").await;

    let client = HomeAssistantClient::new(&ha.config()).unwrap();
    let readings = client
        .fetch_readings(&mappings(&[
            ("sensor.pm25", "pm25"),
            ("sensor.temperature", "temperature"),
        ]))
        .await;

    assert_eq!(
        readings,
        ReadingSet::from([
            ("pm25".to_string(), 12.4),
            ("temperature".to_string(), 20.6),
        ])
    );
}

#[rstest]
#[case("unavailable")]
#[case("unknown")]
#[case("none")]
#[case("")]
#[tokio::test]
async fn test_rejected_state_excludes_entity(#[case] state: &str) {
    let ha = MockHomeAssistant::start().await;
    ha.mock_state("sensor.pm25", state).await;
    ha.mock_state("sensor.humidity", "45.2").await;

    let client = HomeAssistantClient::new(&ha.config()).unwrap();
    let readings = client
        .fetch_readings(&mappings(&[
            ("sensor.pm25", "pm25"),
            ("sensor.humidity", "humidity"),
        ]))
        .await;

    assert!(!readings.contains_key("pm25"));
    assert_eq!(readings.get("humidity"), Some(&45.2));
}

#[tokio::test]
async fn test_non_numeric_state_keeps_siblings() {
    let ha = MockHomeAssistant::start().await;
    ha.mock_state("sensor.pm25", "N/A").await;
    ha.mock_state("sensor.pm10", "15.1").await;
    ha.mock_state("sensor.pm1", "3").await;

    let client = HomeAssistantClient::new(&ha.config()).unwrap();
    let readings = client
        .fetch_readings(&mappings(&[
            ("sensor.pm25", "pm25"),
            ("sensor.pm10", "pm10"),
            ("sensor.pm1", "pm1"),
        ]))
        .await;

    assert_eq!(
        readings,
        ReadingSet::from([("pm1".to_string(), 3.0), ("pm10".to_string(), 15.1)])
    );
}

#[tokio::test]
async fn test_missing_entity_is_skipped() {
    let ha = MockHomeAssistant::start().await;
    ha.mock_state_error("sensor.gone", 404).await;
    ha.mock_state("sensor.pm10", "8").await;

    let client = HomeAssistantClient::new(&ha.config()).unwrap();
    let readings = client
        .fetch_readings(&mappings(&[("sensor.gone", "pm25"), ("sensor.pm10", "pm10")]))
        .await;

    assert_eq!(readings, ReadingSet::from([("pm10".to_string(), 8.0)]));
    assert_eq!(ha.state_request_count().await, 2);
}

#[rstest]
#[case(401)]
#[case(403)]
#[case(500)]
#[tokio::test]
async fn test_failed_probe_skips_every_entity(#[case] probe_status: u16) {
    let ha = MockHomeAssistant::start_with_probe_status(probe_status).await;
    ha.mock_state("sensor.pm25", "12.4").await;

    let client = HomeAssistantClient::new(&ha.config()).unwrap();
    let readings = client
        .fetch_readings(&mappings(&[("sensor.pm25", "pm25")]))
        .await;

    assert!(readings.is_empty());
    assert_eq!(ha.probe_request_count().await, 1);
    assert_eq!(ha.state_request_count().await, 0);
}

#[tokio::test]
async fn test_probe_sends_bearer_token() {
    let ha = MockHomeAssistant::start().await;
    ha.mock_state("sensor.pm25", "12.4").await;

    // The probe mock only matches the test token
    let config = HomeAssistantConfig {
        token: "some-other-token".to_string(),
        ..ha.config()
    };
    let client = HomeAssistantClient::new(&config).unwrap();
    let readings = client
        .fetch_readings(&mappings(&[("sensor.pm25", "pm25")]))
        .await;

    assert!(readings.is_empty());
    assert_eq!(ha.state_request_count().await, 0);

    let requests = ha.server.received_requests().await.unwrap();
    assert_eq!(
        requests[0]
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok()),
        Some("Bearer some-other-token")
    );
}

#[tokio::test]
async fn test_probe_runs_every_cycle() {
    let ha = MockHomeAssistant::start().await;
    ha.mock_state("sensor.pm25", "12.4").await;

    let client = HomeAssistantClient::new(&ha.config()).unwrap();
    let entities = mappings(&[("sensor.pm25", "pm25")]);
    client.fetch_readings(&entities).await;
    client.fetch_readings(&entities).await;

    assert_eq!(ha.probe_request_count().await, 2);
    assert_eq!(ha.state_request_count().await, 2);
}

#[tokio::test]
async fn test_unreachable_source_yields_empty_set() {
    let config = HomeAssistantConfig {
        url: "http://127.0.0.1:1/api".to_string(),
        token: "token".to_string(),
        timeout: Duration::from_secs(1),
    };
    let client = HomeAssistantClient::new(&config).unwrap();

    let readings = client
        .fetch_readings(&mappings(&[("sensor.pm25", "pm25")]))
        .await;
    assert!(readings.is_empty());
}

#[tokio::test]
async fn test_probe_result() {
    let ok = MockHomeAssistant::start().await;
    assert!(HomeAssistantClient::new(&ok.config())
        .unwrap()
        .probe()
        .await
        .is_ok());

    let unauthorized = MockHomeAssistant::start_with_probe_status(401).await;
    let error = HomeAssistantClient::new(&unauthorized.config())
        .unwrap()
        .probe()
        .await
        .unwrap_err();
    assert!(error.is_auth_error());
}
