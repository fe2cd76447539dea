//! Cycle orchestration
//!
//! One cycle walks every group in order: fetch, normalize, publish. Groups
//! never affect each other and nothing inside a cycle runs concurrently.

use crate::client::{HomeAssistantClient, StateSource};
use crate::config::registry::{EntityGroup, EntityRegistry};
use crate::config::{BridgeConfig, Location};
use crate::error::{BridgeError, ErrorReporter, Result};
use crate::error_recovery::RetryPolicy;
use crate::services::{normalize, AirMonitorPublisher, ReadingSink};
use serde::Serialize;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// What happened to one group during a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GroupOutcome {
    /// No mappings; nothing fetched, nothing published
    Skipped,
    /// Fetch produced no valid readings; publisher not invoked
    NoData,
    Published { attempts: u32 },
    PublishFailed { attempts: u32 },
}

impl GroupOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            GroupOutcome::NoData | GroupOutcome::PublishFailed { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupReport {
    pub group: String,
    #[serde(flatten)]
    pub outcome: GroupOutcome,
}

/// Result of one fetch-transform-publish cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub groups: Vec<GroupReport>,
}

impl CycleReport {
    /// True when no configured group failed. Skipped groups do not count.
    pub fn all_succeeded(&self) -> bool {
        !self.groups.iter().any(|g| g.outcome.is_failure())
    }

    pub fn published(&self) -> usize {
        self.groups
            .iter()
            .filter(|g| matches!(g.outcome, GroupOutcome::Published { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.groups.iter().filter(|g| g.outcome.is_failure()).count()
    }

    pub fn skipped(&self) -> usize {
        self.groups
            .iter()
            .filter(|g| g.outcome == GroupOutcome::Skipped)
            .count()
    }
}

/// Polling bridge between a state source and a reading sink
pub struct Bridge<S, P> {
    registry: EntityRegistry,
    location: Location,
    source: S,
    sink: P,
    interval: Duration,
}

impl Bridge<HomeAssistantClient, AirMonitorPublisher> {
    /// Wire up the HTTP clients from a validated configuration
    pub fn from_config(config: &BridgeConfig) -> Result<Self> {
        let registry = EntityRegistry::from_config(config);
        if registry.is_empty() {
            return Err(BridgeError::config(
                "No valid entities configured for forwarding",
            ));
        }

        let source = HomeAssistantClient::new(&config.home_assistant)?;
        let sink = AirMonitorPublisher::new(&config.airmonitor, RetryPolicy::from(&config.retry))?;

        Ok(Self::new(
            registry,
            config.location.clone(),
            source,
            sink,
            config.schedule.interval,
        ))
    }
}

impl<S: StateSource, P: ReadingSink> Bridge<S, P> {
    pub fn new(
        registry: EntityRegistry,
        location: Location,
        source: S,
        sink: P,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            location,
            source,
            sink,
            interval,
        }
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }

    /// Fetch, normalize and publish a single group
    pub async fn run_group(&self, group: &EntityGroup) -> GroupOutcome {
        if !group.is_configured() {
            debug!(group = group.name(), "Group not configured, skipping");
            return GroupOutcome::Skipped;
        }

        let readings = self.source.fetch_readings(group.mappings()).await;

        let Some(payload) = normalize(&readings, &self.location, group.model()) else {
            ErrorReporter::log_error(
                &BridgeError::empty_result(format!(
                    "No valid readings for group '{}'",
                    group.name()
                )),
                "bridge",
                "fetch",
            );
            return GroupOutcome::NoData;
        };

        let report = self.sink.publish(&payload).await;
        if report.is_success() {
            info!(
                group = group.name(),
                attempts = report.attempts,
                "Data forwarded to AirMonitor"
            );
            GroupOutcome::Published {
                attempts: report.attempts,
            }
        } else {
            warn!(
                group = group.name(),
                attempts = report.attempts,
                "Failed to forward data to AirMonitor"
            );
            GroupOutcome::PublishFailed {
                attempts: report.attempts,
            }
        }
    }

    /// Run every group once, in registry order
    pub async fn run_cycle(&self) -> CycleReport {
        let started = Instant::now();
        let mut report = CycleReport::default();

        for group in self.registry.groups() {
            let outcome = self.run_group(group).await;
            report.groups.push(GroupReport {
                group: group.name().to_string(),
                outcome,
            });
        }

        info!(
            published = report.published(),
            failed = report.failed(),
            skipped = report.skipped(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Cycle complete"
        );

        report
    }

    /// Run cycles until `shutdown` resolves.
    ///
    /// Shutdown is only observed between cycles; a cycle in progress always
    /// finishes first.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!(
            groups = self.registry.groups().len(),
            entities = self.registry.entity_count(),
            interval_secs = self.interval.as_secs(),
            "Starting AirMonitor bridge"
        );

        loop {
            self.run_cycle().await;

            debug!("Sleeping for {:?}", self.interval);
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping bridge");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}
