//! Unified error handling for the trendwind crate
//!
//! This module provides a unified error type that consolidates all
//! domain-specific errors into a single `Error` enum, while maintaining the
//! ability to use domain-specific errors when needed.
//!
//! # Architecture
//!
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors

use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::client::fetcher::FetchError;
pub use crate::decode::DecodeError;
pub use crate::plan::PlanError;
pub use crate::timeframe::TimeframeError;

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout, rate limit)
    Network,
    /// Payload decoding and extraction errors
    Decoding,
    /// Request validation errors caught before any network traffic
    Validation,
    /// Configuration errors
    Config,
    /// Other/unknown errors
    Other,
}

/// Unified error type for the trendwind crate
///
/// This enum wraps all domain-specific errors, providing a single error type
/// that can be used across module boundaries while preserving the detailed
/// error information.
#[derive(Error, Debug)]
pub enum Error {
    /// Timeframe parsing and normalization errors
    #[error("Timeframe error: {0}")]
    Timeframe(#[from] TimeframeError),

    /// Request plan validation errors
    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),

    /// Payload decoding errors
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Transport-level fetch errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Check if this error is recoverable (can be retried)
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_recoverable(),
            Self::Http(_) => true,
            Self::Timeframe(_) | Self::Plan(_) | Self::Json(_) | Self::Config(_) => false,
            // Soft empty results are worth a retry with a wider request,
            // structural failures are not.
            Self::Decode(e) => e.is_empty_result(),
            Self::Other { .. } => false,
        }
    }

    /// Get the error category for handling strategies
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch(_) | Self::Http(_) => ErrorCategory::Network,
            Self::Decode(_) | Self::Json(_) => ErrorCategory::Decoding,
            Self::Timeframe(_) | Self::Plan(_) => ErrorCategory::Validation,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }

    /// Whether the error is a well-formed but data-less response
    #[must_use]
    pub fn is_empty_result(&self) -> bool {
        matches!(self, Self::Decode(e) if e.is_empty_result())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Conversion from anyhow::Error
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: err.to_string(),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
