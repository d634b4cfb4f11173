// src/error.rs
//! Error taxonomy shared by the normalizer, the upstream client and the service.
//!
//! Every failure carries a [`ErrorKind`] so the HTTP boundary can switch on it
//! exhaustively, a human-readable message, and optionally the underlying cause.

use std::fmt;

use thiserror::Error;

/// Boxed underlying cause (reqwest / serde_json errors and the like).
pub type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = WeatherError> = std::result::Result<T, E>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Raw coordinate outside the valid range, unparsable or missing.
    InvalidInput,
    /// Upstream did not answer within the timeout (after retries).
    UpstreamTimeout,
    /// Upstream could not be reached at all.
    UpstreamUnavailable,
    /// Upstream answered with an HTTP error status.
    UpstreamServiceError,
    /// Upstream answered 200 but the payload is unusable.
    DataParsingError,
    /// Anything unanticipated.
    InternalError,
}

impl ErrorKind {
    /// Stable machine-readable code used in error bodies.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "INVALID_COORDINATES",
            ErrorKind::UpstreamTimeout => "UPSTREAM_TIMEOUT",
            ErrorKind::UpstreamUnavailable => "UPSTREAM_UNAVAILABLE",
            ErrorKind::UpstreamServiceError => "UPSTREAM_ERROR",
            ErrorKind::DataParsingError => "PARSING_ERROR",
            ErrorKind::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct WeatherError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<Cause>,
}

impl WeatherError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Attach the underlying cause.
    pub fn with_source(mut self, source: impl Into<Cause>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn upstream_timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UpstreamTimeout, message)
    }

    pub fn upstream_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UpstreamUnavailable, message)
    }

    pub fn upstream_service(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UpstreamServiceError, message)
    }

    pub fn data_parsing(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DataParsingError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalError, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
