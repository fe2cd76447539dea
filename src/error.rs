//! Error types for the AirMonitor bridge
//!
//! This module provides the crate-wide error enum with structured error codes,
//! retry classification, and severity-aware logging.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Error types raised while shuttling readings between the two APIs
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Home Assistant rejected the bearer token or the probe failed
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A single entity could not be read this cycle
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// A state string could not be turned into a number
    #[error("Value coercion failed: {0}")]
    ValueCoercion(String),

    /// Connection refused, DNS failure, timeout, body decode failure
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Target API answered with a 5xx status
    #[error("Server error {status}: {body}")]
    ServerError { status: u16, body: String },

    /// Target API rejected the request (4xx or unexpected status)
    #[error("Client error {status}: {body}")]
    ClientError { status: u16, body: String },

    /// Nothing to publish this cycle
    #[error("Empty result: {0}")]
    EmptyResult(String),

    /// Required settings absent at startup
    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// URL parsing errors
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration parsing errors
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Structured error code for machine-readable error handling
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Connection errors (1000-1099)
    ConnectionFailed,
    ConnectionTimeout,

    // Authentication errors (1100-1199)
    InvalidCredentials,

    // Configuration errors (1200-1299)
    ConfigurationMissing,
    ConfigurationInvalid,

    // Source errors (1300-1399)
    EntityUnavailable,

    // Data errors (1400-1499)
    ParsingFailed,
    NoData,

    // Target errors (1600-1699)
    UpstreamServerError,
    UpstreamRejected,

    // Internal errors (1900-1999)
    InternalError,
}

impl ErrorCode {
    /// Get numeric error code
    pub fn as_number(&self) -> u32 {
        match self {
            ErrorCode::ConnectionFailed => 1001,
            ErrorCode::ConnectionTimeout => 1002,

            ErrorCode::InvalidCredentials => 1101,

            ErrorCode::ConfigurationMissing => 1201,
            ErrorCode::ConfigurationInvalid => 1202,

            ErrorCode::EntityUnavailable => 1301,

            ErrorCode::ParsingFailed => 1401,
            ErrorCode::NoData => 1402,

            ErrorCode::UpstreamServerError => 1601,
            ErrorCode::UpstreamRejected => 1602,

            ErrorCode::InternalError => 1901,
        }
    }

    /// Get error category
    pub fn category(&self) -> &'static str {
        match self.as_number() {
            1000..=1099 => "connection",
            1100..=1199 => "authentication",
            1200..=1299 => "configuration",
            1300..=1399 => "source",
            1400..=1499 => "data",
            1600..=1699 => "target",
            1900..=1999 => "internal",
            _ => "unknown",
        }
    }
}

/// Error severity levels for logging
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorSeverity {
    Warning,
    Error,
    Critical,
}

impl BridgeError {
    /// Create an authentication error
    pub fn authentication<S: Into<String>>(msg: S) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a per-entity source error
    pub fn source_unavailable<S: Into<String>>(msg: S) -> Self {
        Self::SourceUnavailable(msg.into())
    }

    /// Create a value coercion error
    pub fn value_coercion<S: Into<String>>(msg: S) -> Self {
        Self::ValueCoercion(msg.into())
    }

    /// Create a 5xx error
    pub fn server_error<S: Into<String>>(status: u16, body: S) -> Self {
        Self::ServerError {
            status,
            body: body.into(),
        }
    }

    /// Create a non-retryable rejection error
    pub fn client_error<S: Into<String>>(status: u16, body: S) -> Self {
        Self::ClientError {
            status,
            body: body.into(),
        }
    }

    /// Create an empty result error
    pub fn empty_result<S: Into<String>>(msg: S) -> Self {
        Self::EmptyResult(msg.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a missing-configuration error listing the absent settings
    pub fn missing_config<S: Into<String>>(names: S) -> Self {
        Self::MissingConfig(names.into())
    }

    /// Map to structured error code
    pub fn error_code(&self) -> ErrorCode {
        match self {
            BridgeError::Authentication(_) => ErrorCode::InvalidCredentials,
            BridgeError::SourceUnavailable(_) => ErrorCode::EntityUnavailable,
            BridgeError::ValueCoercion(_) => ErrorCode::ParsingFailed,
            BridgeError::Transport(e) if e.is_timeout() => ErrorCode::ConnectionTimeout,
            BridgeError::Transport(_) => ErrorCode::ConnectionFailed,
            BridgeError::ServerError { .. } => ErrorCode::UpstreamServerError,
            BridgeError::ClientError { .. } => ErrorCode::UpstreamRejected,
            BridgeError::EmptyResult(_) => ErrorCode::NoData,
            BridgeError::MissingConfig(_) => ErrorCode::ConfigurationMissing,
            BridgeError::Config(_) => ErrorCode::ConfigurationInvalid,
            BridgeError::InvalidUrl(_) => ErrorCode::ConfigurationInvalid,
            BridgeError::Toml(_) => ErrorCode::ConfigurationInvalid,
            BridgeError::Json(_) => ErrorCode::ParsingFailed,
            BridgeError::Io(_) => ErrorCode::InternalError,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            BridgeError::Authentication(_) => ErrorSeverity::Critical,
            BridgeError::MissingConfig(_)
            | BridgeError::Config(_)
            | BridgeError::InvalidUrl(_)
            | BridgeError::Toml(_) => {
                ErrorSeverity::Critical
            }
            BridgeError::SourceUnavailable(_) | BridgeError::EmptyResult(_) => {
                ErrorSeverity::Warning
            }
            BridgeError::Transport(_) | BridgeError::ServerError { .. } => ErrorSeverity::Warning,
            BridgeError::ValueCoercion(_) | BridgeError::ClientError { .. } => ErrorSeverity::Error,
            BridgeError::Json(_) | BridgeError::Io(_) => ErrorSeverity::Error,
        }
    }

    /// Whether the publish retry loop may try again after this error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BridgeError::ServerError { .. } | BridgeError::Transport(_)
        )
    }

    /// Check if error indicates authentication issue
    pub fn is_auth_error(&self) -> bool {
        matches!(self, BridgeError::Authentication(_))
    }
}

/// Error logging utilities
pub struct ErrorReporter;

impl ErrorReporter {
    /// Log an error at the level implied by its severity
    pub fn log_error(error: &BridgeError, component: &str, operation: &str) {
        let code = error.error_code();

        match error.severity() {
            ErrorSeverity::Critical | ErrorSeverity::Error => {
                tracing::error!(
                    error_code = code.as_number(),
                    category = code.category(),
                    component,
                    operation,
                    "{error}"
                );
            }
            ErrorSeverity::Warning => {
                tracing::warn!(
                    error_code = code.as_number(),
                    category = code.category(),
                    component,
                    operation,
                    "{error}"
                );
            }
        }
    }
}
