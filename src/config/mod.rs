//! Configuration management for the trendwind client
//!
//! This module handles loading and validating client configuration from
//! environment variables.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Transport configuration
    pub transport: TransportConfig,

    /// Request defaults sent with every plan
    pub request: RequestConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Transport-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Rate limit (requests per second)
    pub rate_limit: f64,

    /// Maximum retry attempts per request
    pub max_retries: u32,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// User agent override; a rotating pool is used when unset
    pub user_agent: Option<String>,

    /// Enable cookie persistence
    pub enable_cookies: bool,
}

/// Request defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Interface language tag (e.g. "en-US")
    pub language: String,

    /// Timezone offset west of UTC in minutes
    pub tz_offset_minutes: i32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let rate_limit = std::env::var("TRENDWIND_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(1.0);

        let max_retries = std::env::var("TRENDWIND_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(3);

        let request_timeout_secs = std::env::var("TRENDWIND_REQUEST_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        let user_agent = std::env::var("TRENDWIND_USER_AGENT").ok();

        let enable_cookies = std::env::var("TRENDWIND_ENABLE_COOKIES")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(true);

        let language =
            std::env::var("TRENDWIND_LANGUAGE").unwrap_or_else(|_| String::from("en-US"));

        let tz_offset_minutes = std::env::var("TRENDWIND_TZ_OFFSET")
            .ok()
            .and_then(|v| v.parse::<i32>().ok())
            .unwrap_or(0);

        let log_level =
            std::env::var("TRENDWIND_LOG_LEVEL").unwrap_or_else(|_| String::from("info"));

        let log_format =
            std::env::var("TRENDWIND_LOG_FORMAT").unwrap_or_else(|_| String::from("text"));

        Ok(Self {
            transport: TransportConfig {
                rate_limit,
                max_retries,
                request_timeout_secs,
                user_agent,
                enable_cookies,
            },
            request: RequestConfig {
                language,
                tz_offset_minutes,
            },
            logging: LoggingConfig {
                level: log_level,
                format: log_format,
            },
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.transport.rate_limit <= 0.0 {
            anyhow::bail!("rate_limit must be positive");
        }

        if self.transport.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        // Offsets beyond a day have no meaning to the upstream.
        if self.request.tz_offset_minutes.abs() > 24 * 60 {
            anyhow::bail!("tz_offset_minutes must be within one day");
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.transport.request_timeout_secs)
    }
}

/// Initialize the global tracing subscriber from logging settings
///
/// Intended for binaries and examples embedding the client; libraries
/// should leave subscriber installation to their host application.
pub fn init_logging(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.level.clone()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: TransportConfig {
                rate_limit: 1.0,
                max_retries: 3,
                request_timeout_secs: 30,
                user_agent: None,
                enable_cookies: true,
            },
            request: RequestConfig {
                language: String::from("en-US"),
                tz_offset_minutes: 0,
            },
            logging: LoggingConfig {
                level: String::from("info"),
                format: String::from("text"),
            },
        }
    }
}
