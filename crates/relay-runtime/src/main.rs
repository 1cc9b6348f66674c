//! # Message Relay
//!
//! Reads upstream events (one JSON object per line) from stdin, publishes
//! them to the broker and persists what the consumer side receives.
//!
//! ```text
//! echo '{"type":"status","id":1,"created_at":"...","user":{"id":2,"name":"a"},"text":"#java"}' \
//!     | RELAY_SINK_PATH=records.jsonl relay-runtime
//! ```

use anyhow::{Context, Result};
use relay_runtime::{RelayConfig, RelayRuntime};
use relay_telemetry::{encode_metrics, init_telemetry, TelemetryConfig};
use tokio::io::BufReader;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = TelemetryConfig::from_env();
    let _telemetry_guard = init_telemetry(&telemetry).context("failed to initialize telemetry")?;

    let config = RelayConfig::from_env().context("failed to load relay configuration")?;
    let runtime = RelayRuntime::new(config).context("failed to build relay runtime")?;
    runtime.start().context("failed to start consumer listener")?;

    info!("Relay is running. Reading events from stdin, Ctrl+C to stop.");

    let stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = runtime.ingest(stdin) => {
            let stats = result.context("failed to read upstream events")?;
            info!(published = stats.published, "Upstream input finished");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl+C")?;
            info!("Interrupt received");
        }
    }

    let handled = runtime.shutdown().await;
    info!(handled = handled, "Relay stopped");

    match encode_metrics() {
        Ok(text) => debug!("Final metrics:\n{}", text),
        Err(e) => warn!(error = %e, "Failed to encode metrics"),
    }

    Ok(())
}
