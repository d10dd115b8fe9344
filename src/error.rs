use std::time::Duration;

use thiserror::Error;

use crate::sources::DataKind;

/// Why a single source adapter failed. Always recovered by the resolver.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("network error: {0}")]
    Network(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("rate limited")]
    RateLimit,

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("no {0} records returned")]
    Empty(DataKind),

    #[error("{0} not served by this source")]
    Unsupported(DataKind),
}

/// Coarse failure classes used in logs and source health.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    SourceUnavailable,
    MalformedPayload,
}

impl SourceError {
    pub fn class(&self) -> FailureClass {
        match self {
            SourceError::Network(_)
            | SourceError::Timeout(_)
            | SourceError::Status(_)
            | SourceError::RateLimit
            | SourceError::Unsupported(_) => FailureClass::SourceUnavailable,
            SourceError::Malformed(_) | SourceError::Empty(_) => FailureClass::MalformedPayload,
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            SourceError::Malformed(e.to_string())
        } else if let Some(status) = e.status() {
            SourceError::Status(status.as_u16())
        } else {
            SourceError::Network(e.to_string())
        }
    }
}

/// Errors surfaced to the caller of the aggregation operations.
#[derive(Error, Debug)]
pub enum AggregatorError {
    #[error("no data available for {0}: every source and the synthetic generator came back empty")]
    NoDataAvailable(DataKind),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

pub type Result<T, E = AggregatorError> = std::result::Result<T, E>;
