//! # Relay Telemetry
//!
//! Logging and metrics for the message relay.
//!
//! ## Components
//!
//! - **Logs**: `tracing-subscriber` with env filter, pretty or JSON output
//! - **Metrics**: Prometheus counters for publish, handle and persist stages
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relay_telemetry::{TelemetryConfig, init_telemetry};
//!
//! let config = TelemetryConfig::from_env();
//! let _guard = init_telemetry(&config).expect("Failed to init telemetry");
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RELAY_SERVICE_NAME` | `message-relay` | Service name in logs |
//! | `RELAY_ROLE` | `relay` | producer / consumer / relay |
//! | `RELAY_LOG_LEVEL` | `info` | Log level filter |
//! | `RELAY_JSON_LOGS` | `false` | JSON log output |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{env_filter, init_logging};
pub use metrics::{
    encode_metrics, register_metrics, MetricsHandle, MESSAGES_DROPPED, MESSAGES_PUBLISHED,
    MESSAGES_RECEIVED, PERSIST_DURATION, PERSIST_FAILURES, PUBLISH_FAILURES, RECORDS_PERSISTED,
    UPSTREAM_SKIPPED,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that should be held for the lifetime of the application.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    // Metrics first so early log lines can already be counted
    let metrics_handle = register_metrics()?;
    init_logging(config)?;

    Ok(TelemetryGuard {
        _metrics: metrics_handle,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
