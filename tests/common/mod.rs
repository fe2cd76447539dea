//! Common test utilities

#![allow(dead_code)]

pub mod airmonitor_mock;
pub mod home_assistant_mock;
pub mod test_fixtures;
