//! Entity registry
//!
//! Maps Home Assistant entity ids to AirMonitor field names, partitioned into
//! groups that are fetched and published independently.

use crate::config::{BridgeConfig, GroupConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Particle sensor channels: (environment variable, AirMonitor key)
pub const PARTICLE_ENTITIES: &[(&str, &str)] = &[
    ("PM1_ENTITY", "pm1"),
    ("PM25_ENTITY", "pm25"),
    ("PM10_ENTITY", "pm10"),
];

/// Climate channels that accompany whichever group carries the model
pub const CLIMATE_ENTITIES: &[(&str, &str)] = &[
    ("TEMPERATURE_ENTITY", "temperature"),
    ("HUMIDITY_ENTITY", "humidity"),
];

/// Gas sensor channels
pub const GAS_ENTITIES: &[(&str, &str)] = &[
    ("AMMONIA_ENTITY", "nh3"),
    ("CARBON_MONOXIDE_ENTITY", "co"),
    ("HYDROGEN_ENTITY", "h2"),
    ("ETHANOL_ENTITY", "c2h5oh"),
    ("METHANE_ENTITY", "ch4"),
    ("NITROGEN_DIOXIDE_ENTITY", "no2"),
];

/// Climate channels of a standalone gas sensor in split mode
pub const GAS_CLIMATE_ENTITIES: &[(&str, &str)] = &[
    ("GAS_TEMPERATURE_ENTITY", "temperature"),
    ("GAS_HUMIDITY_ENTITY", "humidity"),
];

/// Immutable (source entity, target key) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMapping {
    source_name: String,
    target_key: String,
}

impl EntityMapping {
    pub fn new<S: Into<String>, T: Into<String>>(source_name: S, target_key: T) -> Self {
        Self {
            source_name: source_name.into(),
            target_key: target_key.into(),
        }
    }

    /// Build a mapping from an optional configured source name.
    ///
    /// Absent, blank and `null` (any case) sources yield `None`.
    pub fn from_source(source_name: Option<&str>, target_key: &str) -> Option<Self> {
        let source = source_name?.trim();
        if !is_configured_source(source) {
            return None;
        }
        Some(Self::new(source, target_key))
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn target_key(&self) -> &str {
        &self.target_key
    }
}

/// Whether a configured source name refers to a real entity
pub fn is_configured_source(source: &str) -> bool {
    let source = source.trim();
    !source.is_empty() && !source.eq_ignore_ascii_case("null")
}

/// Independently published partition of entities sharing one device model
#[derive(Debug, Clone, PartialEq)]
pub struct EntityGroup {
    name: String,
    model: String,
    mappings: Vec<EntityMapping>,
}

impl EntityGroup {
    pub fn new<N: Into<String>, M: Into<String>>(
        name: N,
        model: M,
        mappings: Vec<EntityMapping>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            mappings,
        }
    }

    /// Build a group from its configuration, dropping unset and duplicate sources
    pub fn from_config(config: &GroupConfig) -> Self {
        let mut mappings: Vec<EntityMapping> = Vec::new();

        for (target_key, source) in &config.entities {
            let Some(mapping) = EntityMapping::from_source(Some(source.as_str()), target_key)
            else {
                debug!(
                    group = %config.name,
                    target_key = %target_key,
                    "Entity not configured, skipping"
                );
                continue;
            };

            if mappings
                .iter()
                .any(|m| m.source_name() == mapping.source_name())
            {
                warn!(
                    group = %config.name,
                    entity = mapping.source_name(),
                    target_key = %target_key,
                    "Entity already mapped in this group, ignoring duplicate"
                );
                continue;
            }

            mappings.push(mapping);
        }

        Self::new(config.name.clone(), config.model.clone(), mappings)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn mappings(&self) -> &[EntityMapping] {
        &self.mappings
    }

    /// A group without mappings is skipped every cycle
    pub fn is_configured(&self) -> bool {
        !self.mappings.is_empty()
    }
}

/// All groups, built once at startup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityRegistry {
    groups: Vec<EntityGroup>,
}

impl EntityRegistry {
    pub fn new(groups: Vec<EntityGroup>) -> Self {
        Self { groups }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.groups.iter().map(EntityGroup::from_config).collect())
    }

    pub fn groups(&self) -> &[EntityGroup] {
        &self.groups
    }

    /// Total number of mapped entities across all groups
    pub fn entity_count(&self) -> usize {
        self.groups.iter().map(|g| g.mappings().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entity_count() == 0
    }
}
