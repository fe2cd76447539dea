//! Source-side client: reading entity states from Home Assistant

pub mod home_assistant;

pub use home_assistant::HomeAssistantClient;

use crate::config::registry::EntityMapping;
use crate::error::{BridgeError, Result};
use crate::services::ReadingSet;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// States that mean "no reading right now"
pub const REJECTED_STATES: &[&str] = &["unavailable", "unknown", "none", ""];

/// Classification of one fetched entity state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateStatus {
    Ok,
    Unavailable,
    Unknown,
    Empty,
    NotFound,
    TransportError,
}

impl fmt::Display for StateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StateStatus::Ok => "ok",
            StateStatus::Unavailable => "unavailable",
            StateStatus::Unknown => "unknown",
            StateStatus::Empty => "empty",
            StateStatus::NotFound => "not_found",
            StateStatus::TransportError => "transport_error",
        };
        f.write_str(name)
    }
}

/// One entity's state as returned by the source, before coercion
#[derive(Debug, Clone, PartialEq)]
pub struct RawState {
    pub source_name: String,
    pub raw_value: Option<String>,
    pub status: StateStatus,
}

impl RawState {
    /// Classify a state string. Matching is case-sensitive.
    pub fn from_state<S: Into<String>>(source_name: S, state: Option<String>) -> Self {
        let status = match state.as_deref() {
            None | Some("") => StateStatus::Empty,
            Some("unavailable") => StateStatus::Unavailable,
            Some("unknown") | Some("none") => StateStatus::Unknown,
            Some(_) => StateStatus::Ok,
        };

        Self {
            source_name: source_name.into(),
            raw_value: state,
            status,
        }
    }

    /// Non-200 answer for this entity
    pub fn not_found<S: Into<String>>(source_name: S) -> Self {
        Self {
            source_name: source_name.into(),
            raw_value: None,
            status: StateStatus::NotFound,
        }
    }

    /// Request for this entity never got a usable answer
    pub fn transport_error<S: Into<String>>(source_name: S) -> Self {
        Self {
            source_name: source_name.into(),
            raw_value: None,
            status: StateStatus::TransportError,
        }
    }

    /// Turn the raw state into a finite number.
    ///
    /// Rejected states yield `SourceUnavailable`, unparseable ones `ValueCoercion`.
    pub fn coerce(&self) -> Result<f64> {
        if self.status != StateStatus::Ok {
            return Err(BridgeError::source_unavailable(format!(
                "Entity {} has state {}",
                self.source_name,
                self.raw_value.as_deref().unwrap_or(&self.status.to_string())
            )));
        }

        let raw = self.raw_value.as_deref().unwrap_or_default();
        match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(BridgeError::value_coercion(format!(
                "Could not convert state '{raw}' to number for {}",
                self.source_name
            ))),
        }
    }
}

/// Anything that can produce a reading set for a list of mappings
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StateSource: Send + Sync {
    /// Fetch every mapping once. Per-entity failures are absorbed and logged.
    async fn fetch_readings(&self, mappings: &[EntityMapping]) -> ReadingSet;
}
