//! Prometheus metrics for the relay.
//!
//! All metrics follow the naming convention: `relay_<stage>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., messages_published_total)
//! - **Histogram**: Distribution of values (e.g., persist_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{exponential_buckets, Counter, CounterVec, Encoder, Histogram, Opts, Registry, TextEncoder};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // PRODUCER METRICS
    // =========================================================================

    /// Messages acknowledged by the broker
    pub static ref MESSAGES_PUBLISHED: CounterVec = CounterVec::new(
        Opts::new("relay_messages_published_total", "Messages acknowledged by the broker"),
        &["topic"]
    ).expect("metric creation failed");

    /// Asynchronous delivery failures reported by the broker
    pub static ref PUBLISH_FAILURES: CounterVec = CounterVec::new(
        Opts::new("relay_publish_failures_total", "Messages the broker failed to deliver"),
        &["topic"]
    ).expect("metric creation failed");

    /// Upstream events skipped before publishing (unformattable or filtered)
    pub static ref UPSTREAM_SKIPPED: CounterVec = CounterVec::new(
        Opts::new("relay_upstream_skipped_total", "Upstream events not forwarded"),
        &["reason"]  // reason: unformattable/filtered
    ).expect("metric creation failed");

    // =========================================================================
    // CONSUMER METRICS
    // =========================================================================

    /// Raw messages handed to the handler
    pub static ref MESSAGES_RECEIVED: Counter = Counter::new(
        "relay_messages_received_total",
        "Raw messages delivered to the handler"
    ).expect("metric creation failed");

    /// Messages dropped before persistence
    pub static ref MESSAGES_DROPPED: CounterVec = CounterVec::new(
        Opts::new("relay_messages_dropped_total", "Messages dropped by the handler"),
        &["reason"]  // reason: malformed/invalid/rejected
    ).expect("metric creation failed");

    /// Records confirmed by the sink
    pub static ref RECORDS_PERSISTED: Counter = Counter::new(
        "relay_records_persisted_total",
        "Records the sink confirmed as saved"
    ).expect("metric creation failed");

    /// Asynchronous sink failures
    pub static ref PERSIST_FAILURES: Counter = Counter::new(
        "relay_persist_failures_total",
        "Records the sink failed to save"
    ).expect("metric creation failed");

    /// Time from save call to sink completion
    pub static ref PERSIST_DURATION: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "relay_persist_duration_seconds",
            "Time between the save call and its completion"
        ).buckets(exponential_buckets(0.0001, 2.0, 14).expect("valid buckets"))
    ).expect("metric creation failed");
}

/// Handle for the registered metrics
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Producer
        Box::new(MESSAGES_PUBLISHED.clone()),
        Box::new(PUBLISH_FAILURES.clone()),
        Box::new(UPSTREAM_SKIPPED.clone()),
        // Consumer
        Box::new(MESSAGES_RECEIVED.clone()),
        Box::new(MESSAGES_DROPPED.clone()),
        Box::new(RECORDS_PERSISTED.clone()),
        Box::new(PERSIST_FAILURES.clone()),
        Box::new(PERSIST_DURATION.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}
