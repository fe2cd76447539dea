//! Reading normalization
//!
//! AirMonitor accepts integer measurements only. Values are rounded half to
//! even (2.5 -> 2, 3.5 -> 4), then the fixed location and sensor model
//! metadata are attached.

use crate::config::Location;
use crate::services::ReadingSet;
use serde::Serialize;
use std::collections::BTreeMap;

/// Request body for the AirMonitor measurements endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payload {
    #[serde(flatten)]
    pub readings: BTreeMap<String, i64>,
    pub lat: String,
    pub long: String,
    pub sensor: String,
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

/// Round to the nearest integer, ties to even
pub fn round_half_even(value: f64) -> i64 {
    // `as` saturates at the i64 bounds
    value.round_ties_even() as i64
}

/// Build the payload for one group, or `None` when there is nothing to publish
pub fn normalize(readings: &ReadingSet, location: &Location, model: &str) -> Option<Payload> {
    if readings.is_empty() {
        return None;
    }

    Some(Payload {
        readings: readings
            .iter()
            .map(|(key, value)| (key.clone(), round_half_even(*value)))
            .collect(),
        lat: location.lat.clone(),
        long: location.long.clone(),
        sensor: model.to_string(),
    })
}
