//! # Relay Runtime
//!
//! Wiring for the message relay binary.
//!
//! ## Modular Structure
//!
//! - `config` - `RelayConfig` with defaults and `RELAY_*` environment overrides
//! - `runtime` - `RelayRuntime`: builds the pipelines, runs the listener, shuts down
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry
//! 2. Load and validate configuration
//! 3. Build broker, sink, publisher, handler and forwarder
//! 4. Start the consumer listener
//! 5. Forward upstream events until input ends or Ctrl+C

pub mod config;
pub mod runtime;

pub use config::{BrokerConfig, RelayConfig, SinkConfig, SourceConfig, ValidationConfig, WireConfig};
pub use runtime::{IngestStats, RelayRuntime, RuntimeError};
