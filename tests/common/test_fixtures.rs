//! Test fixtures and utilities for consistent test setup
//!
//! Provides reusable configuration, entity groups and environment helpers
//! using rstest fixtures.

use airmonitor_bridge::config::{
    AirMonitorConfig, BridgeConfig, GroupConfig, HomeAssistantConfig, Location, RetryConfig,
};
use airmonitor_bridge::error_recovery::RetryPolicy;
use airmonitor_bridge::{EntityGroup, EntityMapping};
use rstest::*;
use std::collections::BTreeMap;
use std::time::Duration;
use temp_env::with_vars;

/// Every environment variable the bridge reads
pub const BRIDGE_ENV_VARS: &[&str] = &[
    "HA_URL",
    "HA_TOKEN",
    "AIRMONITOR_API_KEY",
    "AIRMONITOR_API_URL",
    "LAT",
    "LONG",
    "SENSOR_MODEL",
    "GAS_SENSOR_MODEL",
    "SLEEP_INTERVAL",
    "RETRY_ATTEMPTS",
    "RETRY_BACKOFF",
    "PM1_ENTITY",
    "PM25_ENTITY",
    "PM10_ENTITY",
    "TEMPERATURE_ENTITY",
    "HUMIDITY_ENTITY",
    "AMMONIA_ENTITY",
    "CARBON_MONOXIDE_ENTITY",
    "HYDROGEN_ENTITY",
    "ETHANOL_ENTITY",
    "METHANE_ENTITY",
    "NITROGEN_DIOXIDE_ENTITY",
    "GAS_TEMPERATURE_ENTITY",
    "GAS_HUMIDITY_ENTITY",
];

/// Coordinates used across tests
#[fixture]
pub fn test_location() -> Location {
    Location {
        lat: "50.0614".to_string(),
        long: "19.9366".to_string(),
    }
}

/// Three attempts with a pause short enough for tests
#[fixture]
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::fixed(3, Duration::from_millis(10))
}

#[fixture]
pub fn particle_group() -> EntityGroup {
    EntityGroup::new(
        "particle",
        "SDS011",
        vec![
            EntityMapping::new("sensor.pm25", "pm25"),
            EntityMapping::new("sensor.temperature", "temperature"),
        ],
    )
}

/// Group configuration from (target key, source entity) pairs
pub fn group_config(name: &str, model: &str, entities: &[(&str, &str)]) -> GroupConfig {
    GroupConfig {
        name: name.to_string(),
        model: model.to_string(),
        entities: entities
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>(),
    }
}

/// Complete configuration pointing at the given mock servers
pub fn bridge_config(
    home_assistant: HomeAssistantConfig,
    airmonitor: AirMonitorConfig,
    groups: Vec<GroupConfig>,
) -> BridgeConfig {
    BridgeConfig {
        home_assistant,
        airmonitor,
        location: test_location(),
        retry: RetryConfig {
            attempts: 3,
            backoff: Duration::from_millis(10),
        },
        groups,
        ..Default::default()
    }
}

/// Minimal valid environment for the forwarder
pub fn base_env_vars() -> Vec<(&'static str, &'static str)> {
    vec![
        ("HA_URL", "http://homeassistant.local:8123/api"),
        ("HA_TOKEN", "test-token"),
        ("AIRMONITOR_API_KEY", "test-api-key"),
        ("LAT", "50.0614"),
        ("LONG", "19.9366"),
    ]
}

/// Run with exactly the given bridge variables set; every other one is unset
pub fn with_bridge_env<F, R>(vars: &[(&str, &str)], test_fn: F) -> R
where
    F: FnOnce() -> R,
{
    let kvs: Vec<(&str, Option<&str>)> = BRIDGE_ENV_VARS
        .iter()
        .map(|name| {
            let value = vars.iter().find(|(k, _)| k == name).map(|(_, v)| *v);
            (*name, value)
        })
        .collect();

    with_vars(kvs, test_fn)
}
