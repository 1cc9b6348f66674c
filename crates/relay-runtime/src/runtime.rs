//! # Relay Runtime
//!
//! Owns the long-lived handles (broker, sink) and the two pipelines that
//! share them:
//!
//! ```text
//! ingest(reader) ─→ StreamForwarder ─→ RecordPublisher ─→ InMemoryBroker
//!                                                              │
//!          RecordSink ←─ RecordHandler ←─ SubscriptionListener ┘
//! ```
//!
//! ## Shutdown Sequence
//!
//! 1. Close the broker so the listener drains what is buffered
//! 2. Wait for the listener (with timeout)
//! 3. Signal shutdown if it is still running
//! 4. Wait for the sink's pending writes (with timeout)

use crate::config::RelayConfig;
use parking_lot::Mutex;
use relay_bus::{BrokerSetupError, InMemoryBroker};
use relay_core::{
    ConfigError, InMemoryRecordSink, JsonLinesSink, MessageHandler, RecordHandler, RecordPublisher,
    RecordSink, RecordValidator, StatusListener, StreamEvent, StreamForwarder,
    SubscriptionListener, TrackFilter, WireCodec,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// How long `shutdown` waits for the listener to drain.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Runtime errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("broker refused subscription: {0}")]
    Subscribe(#[from] BrokerSetupError),

    #[error("runtime already started")]
    AlreadyStarted,

    #[error("failed to read upstream events: {0}")]
    Io(#[from] std::io::Error),
}

/// Counts from one `ingest` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Lines parsed into events.
    pub events: u64,
    /// Events handed to the broker.
    pub published: u64,
    /// Events logged but not published (notices, filtered, unformattable).
    pub skipped: u64,
    /// Lines that were not valid events.
    pub invalid: u64,
    /// Events the broker refused.
    pub refused: u64,
}

/// The main relay runtime.
pub struct RelayRuntime {
    config: RelayConfig,
    broker: Arc<InMemoryBroker>,
    sink: Arc<dyn RecordSink>,
    handler: Arc<RecordHandler<dyn RecordSink>>,
    forwarder: StreamForwarder<InMemoryBroker>,
    listener: Mutex<Option<JoinHandle<u64>>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl RelayRuntime {
    /// Build the runtime with the sink chosen by `config.sink`.
    pub fn new(config: RelayConfig) -> Result<Self, RuntimeError> {
        let sink: Arc<dyn RecordSink> = match &config.sink.path {
            Some(path) => {
                info!(path = %path.display(), "Persisting records to JSON lines file");
                Arc::new(JsonLinesSink::new(path.clone()))
            }
            None => {
                info!("Persisting records in memory");
                Arc::new(InMemoryRecordSink::new())
            }
        };
        Self::with_sink(config, sink)
    }

    /// Build the runtime around an existing sink.
    pub fn with_sink(config: RelayConfig, sink: Arc<dyn RecordSink>) -> Result<Self, RuntimeError> {
        config.validate()?;

        info!(
            bootstrap_servers = %config.broker.bootstrap_servers,
            topic = %config.broker.topic,
            group_id = %config.broker.group_id,
            client_id = %config.broker.client_id,
            "Creating relay runtime"
        );

        let broker = Arc::new(InMemoryBroker::with_limits(
            config.broker.channel_capacity,
            config.broker.max_payload_bytes,
        ));
        let codec = WireCodec::new(config.wire.delimiter);
        let validator = RecordValidator::new(config.validation.policy);

        let handler = Arc::new(RecordHandler::new(codec, validator, Arc::clone(&sink)));
        let publisher = RecordPublisher::new(Arc::clone(&broker), codec);
        let forwarder = StreamForwarder::new(
            publisher,
            config.broker.topic.clone(),
            TrackFilter::new(&config.source.track),
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            broker,
            sink,
            handler,
            forwarder,
            listener: Mutex::new(None),
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Subscribe to the topic and spawn the consumer listener.
    pub fn start(&self) -> Result<(), RuntimeError> {
        let mut listener = self.listener.lock();
        if listener.is_some() {
            return Err(RuntimeError::AlreadyStarted);
        }

        let subscription = self.broker.subscribe(&self.config.broker.topic)?;
        let handler: Arc<dyn MessageHandler> = self.handler.clone();
        let task = SubscriptionListener::new(subscription, handler);
        *listener = Some(tokio::spawn(task.run(self.shutdown_rx.clone())));

        info!(topic = %self.config.broker.topic, "Consumer listener started");
        Ok(())
    }

    /// Read newline-delimited JSON events and forward them until end of input.
    ///
    /// Bad lines and refused sends are logged and counted; only I/O errors
    /// on the reader end the run early.
    pub async fn ingest<R>(&self, reader: R) -> Result<IngestStats, RuntimeError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut stats = IngestStats::default();
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let event: StreamEvent = match serde_json::from_str(line) {
                Ok(event) => event,
                Err(e) => {
                    stats.invalid += 1;
                    self.forwarder.on_exception(&e);
                    continue;
                }
            };
            stats.events += 1;

            match self.forwarder.dispatch(&event) {
                Ok(true) => stats.published += 1,
                Ok(false) => stats.skipped += 1,
                Err(e) => {
                    stats.refused += 1;
                    error!(error = %e, "Upstream event not published");
                }
            }
        }

        info!(
            events = stats.events,
            published = stats.published,
            skipped = stats.skipped,
            invalid = stats.invalid,
            refused = stats.refused,
            "Upstream input exhausted"
        );
        Ok(stats)
    }

    /// Stop the relay. Returns how many messages the listener handled.
    ///
    /// Returns only after the sink has finished (or timed out on) every
    /// write the listener started.
    pub async fn shutdown(&self) -> u64 {
        info!("Initiating graceful shutdown...");
        self.broker.close();

        let handled = self.stop_listener().await;
        self.flush_sink().await;

        info!(handled = handled, "Shutdown complete");
        handled
    }

    async fn stop_listener(&self) -> u64 {
        let task = self.listener.lock().take();
        let Some(mut task) = task else {
            debug!("Listener never started");
            return 0;
        };

        let joined = match tokio::time::timeout(DRAIN_TIMEOUT, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!("Listener did not drain in time, signalling shutdown");
                if let Err(e) = self.shutdown_tx.send(true) {
                    error!("Failed to send shutdown signal: {}", e);
                }
                task.await
            }
        };

        joined.unwrap_or_else(|e| {
            error!(error = %e, "Listener task failed");
            0
        })
    }

    async fn flush_sink(&self) {
        match tokio::time::timeout(DRAIN_TIMEOUT, self.sink.flush()).await {
            Ok(()) => debug!("Sink flushed"),
            Err(_) => warn!("Sink still has pending writes after drain timeout"),
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn broker(&self) -> Arc<InMemoryBroker> {
        Arc::clone(&self.broker)
    }

    pub fn sink(&self) -> Arc<dyn RecordSink> {
        Arc::clone(&self.sink)
    }

    pub fn forwarder(&self) -> &StreamForwarder<InMemoryBroker> {
        &self.forwarder
    }
}

impl Drop for RelayRuntime {
    fn drop(&mut self) {
        if self.listener.get_mut().is_some() {
            debug!("Relay runtime dropped while listener running");
            if let Err(e) = self.shutdown_tx.send(true) {
                debug!("Listener already gone at drop: {}", e);
            }
        }
    }
}
