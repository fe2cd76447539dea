//! Error recovery for the publish path

pub mod retry_policy;

pub use retry_policy::{Attempted, RetryExecutor, RetryPolicy, RetryStats};
