//! Home Assistant to AirMonitor bridge
//!
//! Periodically reads air-quality sensor states from the Home Assistant REST
//! API and republishes them to the AirMonitor measurements API.
//!
//! # Features
//!
//! - Per-cycle authentication probe against Home Assistant
//! - Tolerant per-entity fetching: unavailable or non-numeric states are skipped
//! - Half-to-even rounding into AirMonitor's integer schema
//! - Bounded fixed-backoff retries on 5xx and transport failures
//! - Independent particle and gas groups, each with its own sensor model

pub mod bridge;
pub mod client;
pub mod config;
pub mod error;
pub mod error_recovery;
pub mod logging;
pub mod services;

// Re-export main types for convenience
pub use bridge::{Bridge, CycleReport, GroupOutcome, GroupReport};
pub use client::{HomeAssistantClient, StateSource};
pub use config::registry::{EntityGroup, EntityMapping, EntityRegistry};
pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
pub use services::{AirMonitorPublisher, Payload, ReadingSet, ReadingSink};
