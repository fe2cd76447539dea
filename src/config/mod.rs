//! Configuration management for the AirMonitor bridge
//!
//! The configuration is built once at startup, validated, and then handed to
//! each component by reference. It can come from a TOML file, from the
//! forwarder environment variables (HA_URL, PM25_ENTITY, ...), or from
//! both (environment wins).

pub mod registry;

use crate::error::{BridgeError, Result};
use registry::{
    is_configured_source, CLIMATE_ENTITIES, GAS_CLIMATE_ENTITIES, GAS_ENTITIES, PARTICLE_ENTITIES,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::{env, fs, time::Duration};
use tracing::warn;
use url::Url;

/// Public AirMonitor measurements endpoint
pub const DEFAULT_AIRMONITOR_URL: &str = "https://airmonitor.pl/prod/measurements";

/// Upper bound for a single Home Assistant request
pub const MAX_SOURCE_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound for a single AirMonitor publish attempt
pub const MAX_TARGET_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_INTERVAL_SECS: u64 = 60;
const PARTICLE_GROUP: &str = "particle";
const GAS_GROUP: &str = "gas";
const COMBINED_GROUP: &str = "combined";
const REDACTED: &str = "***";

/// Bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BridgeConfig {
    /// Source state API
    pub home_assistant: HomeAssistantConfig,

    /// Target measurements API
    pub airmonitor: AirMonitorConfig,

    /// Coordinates attached to every publish
    pub location: Location,

    /// Publish retry policy
    pub retry: RetryConfig,

    /// Cycle timing
    pub schedule: ScheduleConfig,

    /// Entity groups, each published with its own sensor model
    pub groups: Vec<GroupConfig>,
}

/// Home Assistant REST API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HomeAssistantConfig {
    /// API base URL (e.g., "http://homeassistant.local:8123/api")
    pub url: String,

    /// Long-lived access token
    pub token: String,

    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

/// AirMonitor API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AirMonitorConfig {
    /// Measurements endpoint
    pub url: String,

    /// Value sent in the `X-Api-Key` header
    pub api_key: String,

    /// Per-attempt timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

/// Sensor location, forwarded verbatim
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Location {
    pub lat: String,
    pub long: String,
}

/// Publish retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub attempts: u32,

    /// Fixed pause between attempts
    #[serde(with = "humantime_serde")]
    pub backoff: Duration,
}

/// Scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Pause between the end of one cycle and the start of the next
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

/// One independently published entity group
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct GroupConfig {
    /// Group name used in logs
    pub name: String,

    /// Device model identifier sent as `sensor`
    pub model: String,

    /// AirMonitor key -> Home Assistant entity id
    pub entities: BTreeMap<String, String>,
}

impl Default for HomeAssistantConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            token: String::new(),
            timeout: MAX_SOURCE_TIMEOUT,
        }
    }
}

impl Default for AirMonitorConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_AIRMONITOR_URL.to_string(),
            api_key: String::new(),
            timeout: MAX_TARGET_TIMEOUT,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_secs(10),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
        }
    }
}

impl GroupConfig {
    /// Whether any entity of this group points at a real source
    pub fn has_entities(&self) -> bool {
        self.entities.values().any(|s| is_configured_source(s))
    }
}

impl BridgeConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_env_overlay(lookup)?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            BridgeError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Override fields with whatever the lookup provides
    pub fn apply_env_overlay<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = var("HA_URL") {
            self.home_assistant.url = url;
        }
        if let Some(token) = var("HA_TOKEN") {
            self.home_assistant.token = token;
        }
        if let Some(api_key) = var("AIRMONITOR_API_KEY") {
            self.airmonitor.api_key = api_key;
        }
        if let Some(url) = var("AIRMONITOR_API_URL") {
            self.airmonitor.url = url;
        }
        if let Some(lat) = var("LAT") {
            self.location.lat = lat;
        }
        if let Some(long) = var("LONG") {
            self.location.long = long;
        }

        if let Some(interval) = var("SLEEP_INTERVAL") {
            self.schedule.interval = match interval.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    warn!(
                        "Invalid SLEEP_INTERVAL '{interval}', using default of {DEFAULT_INTERVAL_SECS} seconds"
                    );
                    Duration::from_secs(DEFAULT_INTERVAL_SECS)
                }
            };
        }

        if let Some(attempts) = var("RETRY_ATTEMPTS") {
            self.retry.attempts = attempts
                .trim()
                .parse()
                .map_err(|e| BridgeError::config(format!("Invalid RETRY_ATTEMPTS: {e}")))?;
        }

        if let Some(backoff) = var("RETRY_BACKOFF") {
            self.retry.backoff = Duration::from_secs(
                backoff
                    .trim()
                    .parse()
                    .map_err(|e| BridgeError::config(format!("Invalid RETRY_BACKOFF: {e}")))?,
            );
        }

        match groups_from_env(&var) {
            Some(groups) => self.groups = groups,
            None => self.apply_model_overrides(&var),
        }

        Ok(())
    }

    /// Point existing groups at new models without touching their entities.
    ///
    /// `SENSOR_MODEL` applies to every group except `gas`, `GAS_SENSOR_MODEL`
    /// only to `gas`.
    fn apply_model_overrides<F>(&mut self, var: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let model = var("SENSOR_MODEL");
        let gas_model = var("GAS_SENSOR_MODEL");

        for group in &mut self.groups {
            let override_model = if group.name == GAS_GROUP {
                gas_model.as_ref()
            } else {
                model.as_ref()
            };
            if let Some(override_model) = override_model {
                group.model = override_model.clone();
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("HA_TOKEN", &self.home_assistant.token),
            ("HA_URL", &self.home_assistant.url),
            ("AIRMONITOR_API_KEY", &self.airmonitor.api_key),
            ("LAT", &self.location.lat),
            ("LONG", &self.location.long),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if !missing.is_empty() {
            return Err(BridgeError::missing_config(missing.join(", ")));
        }

        validate_http_url("HA_URL", &self.home_assistant.url)?;
        validate_http_url("AIRMONITOR_API_URL", &self.airmonitor.url)?;

        let configured: Vec<&GroupConfig> =
            self.groups.iter().filter(|g| g.has_entities()).collect();
        if configured.is_empty() {
            return Err(BridgeError::config(
                "No valid entities configured for forwarding",
            ));
        }
        if let Some(group) = configured.iter().find(|g| g.model.trim().is_empty()) {
            return Err(BridgeError::config(format!(
                "Group '{}' has entities but no sensor model",
                group.name
            )));
        }

        if self.retry.attempts == 0 {
            return Err(BridgeError::config("Retry attempts must be at least 1"));
        }

        if self.schedule.interval.is_zero() {
            return Err(BridgeError::config("Interval must be greater than zero"));
        }

        validate_timeout(
            "Home Assistant timeout",
            self.home_assistant.timeout,
            MAX_SOURCE_TIMEOUT,
        )?;
        validate_timeout(
            "AirMonitor timeout",
            self.airmonitor.timeout,
            MAX_TARGET_TIMEOUT,
        )?;

        Ok(())
    }

    /// Copy with secrets masked, suitable for logging
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.home_assistant.token.is_empty() {
            copy.home_assistant.token = REDACTED.to_string();
        }
        if !copy.airmonitor.api_key.is_empty() {
            copy.airmonitor.api_key = REDACTED.to_string();
        }
        copy
    }
}

/// Build entity groups from the forwarder's environment variables.
///
/// `GAS_SENSOR_MODEL` switches to split mode: gas channels get their own group.
/// Returns `None` when no entity variable is set; model variables alone leave
/// the existing groups in place.
fn groups_from_env<F>(var: &F) -> Option<Vec<GroupConfig>>
where
    F: Fn(&str) -> Option<String>,
{
    let tables = [
        PARTICLE_ENTITIES,
        CLIMATE_ENTITIES,
        GAS_ENTITIES,
        GAS_CLIMATE_ENTITIES,
    ];
    let model = var("SENSOR_MODEL");
    let gas_model = var("GAS_SENSOR_MODEL");
    let any_entity = tables
        .iter()
        .flat_map(|table| table.iter())
        .any(|(name, _)| var(*name).is_some());

    if !any_entity {
        return None;
    }

    let collect = |tables: &[&[(&str, &str)]]| -> BTreeMap<String, String> {
        tables
            .iter()
            .flat_map(|table| table.iter())
            .filter_map(|(name, key)| var(*name).map(|source| (key.to_string(), source)))
            .collect()
    };

    let groups = match gas_model {
        Some(gas_model) => vec![
            GroupConfig {
                name: PARTICLE_GROUP.to_string(),
                model: model.unwrap_or_default(),
                entities: collect(&[PARTICLE_ENTITIES, CLIMATE_ENTITIES]),
            },
            GroupConfig {
                name: GAS_GROUP.to_string(),
                model: gas_model,
                entities: collect(&[GAS_ENTITIES, GAS_CLIMATE_ENTITIES]),
            },
        ],
        None => vec![GroupConfig {
            name: COMBINED_GROUP.to_string(),
            model: model.unwrap_or_default(),
            entities: collect(&[PARTICLE_ENTITIES, CLIMATE_ENTITIES, GAS_ENTITIES]),
        }],
    };

    Some(groups)
}

fn validate_http_url(name: &str, value: &str) -> Result<()> {
    let url = Url::parse(value)
        .map_err(|e| BridgeError::config(format!("Invalid {name} '{value}': {e}")))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(BridgeError::config(format!(
            "{name} must use http or https scheme"
        )));
    }
    Ok(())
}

fn validate_timeout(name: &str, timeout: Duration, max: Duration) -> Result<()> {
    if timeout.is_zero() || timeout > max {
        return Err(BridgeError::config(format!(
            "{name} must be between 1ms and {}s",
            max.as_secs()
        )));
    }
    Ok(())
}
