//! Logging initialization
//!
//! Installs a `tracing` subscriber with an `EnvFilter` and either a
//! human-readable or JSON formatter. `RUST_LOG` always wins over the
//! configured default filter.

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Default filter directive when neither `RUST_LOG` nor a config filter is set
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Errors that can occur during logging initialization
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The filter directive could not be parsed
    #[error("invalid log filter '{filter}': {message}")]
    InvalidFilter {
        /// The rejected directive
        filter: String,
        /// Parser error
        message: String,
    },

    /// Failed to install the global subscriber
    #[error("failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),
}

/// Configuration for logging initialization
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Emit JSON lines instead of human-readable output
    pub json: bool,

    /// Filter directive used when `RUST_LOG` is unset (e.g. "bulwark_rbac=debug")
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            json: std::env::var("BULWARK_LOG_JSON")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

/// Build the filter for a config, preferring `RUST_LOG` when it is set
pub fn build_filter(config: &LogConfig) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.filter).map_err(|e| TelemetryError::InvalidFilter {
        filter: config.filter.clone(),
        message: e.to_string(),
    })
}

/// Install the global tracing subscriber
///
/// Fails if a global subscriber has already been installed.
pub fn init_logging(config: &LogConfig) -> Result<(), TelemetryError> {
    let filter = build_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };

    result.map_err(|e| TelemetryError::SubscriberInit(e.to_string()))
}
