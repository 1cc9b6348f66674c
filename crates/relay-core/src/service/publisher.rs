//! # Record Publisher
//!
//! Hands encoded records to the broker and observes the acknowledgment
//! without waiting for it.
//!
//! ```text
//! publish(dest, payload)
//!     │
//!     ├── broker.send() ── Err ──→ PublishSetupError (caller)
//!     │
//!     └── Ok(deferred) ──→ return immediately
//!                │
//!                └── later, on the broker's thread:
//!                      Ok(receipt)  → info + relay_messages_published_total
//!                      Err(cause)   → error + relay_publish_failures_total
//! ```
//!
//! The publisher holds no mutable state, so concurrent calls need no locking.
//! Completions are not ordered relative to calls.

use crate::domain::codec::WireCodec;
use crate::domain::errors::{PublishDeliveryError, PublishSetupError};
use crate::domain::record::Record;
use crate::ports::outbound::PublishObserver;
use relay_bus::MessageBroker;
use relay_telemetry::{metric_inc, MESSAGES_PUBLISHED, PUBLISH_FAILURES};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Asynchronous, fire-and-observe publisher.
pub struct RecordPublisher<B: MessageBroker> {
    broker: Arc<B>,
    codec: WireCodec,
    observer: Option<Arc<dyn PublishObserver>>,
}

impl<B: MessageBroker> Clone for RecordPublisher<B> {
    fn clone(&self) -> Self {
        Self {
            broker: Arc::clone(&self.broker),
            codec: self.codec,
            observer: self.observer.clone(),
        }
    }
}

impl<B: MessageBroker> RecordPublisher<B> {
    pub fn new(broker: Arc<B>, codec: WireCodec) -> Self {
        Self {
            broker,
            codec,
            observer: None,
        }
    }

    /// Attach an observer that runs after the built-in logging.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn PublishObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    #[must_use]
    pub fn codec(&self) -> &WireCodec {
        &self.codec
    }

    /// Hand a payload to the broker and return without waiting.
    ///
    /// # Errors
    ///
    /// Returns `PublishSetupError` when the broker client refuses the send
    /// before any asynchronous work starts. Delivery failures after that are
    /// only logged.
    pub fn publish(
        &self,
        destination: &str,
        payload: impl Into<String>,
    ) -> Result<(), PublishSetupError> {
        let payload = payload.into();

        let pending = self
            .broker
            .send(destination, payload.clone())
            .map_err(|source| {
                error!(
                    destination = destination,
                    error = %source,
                    "unable to hand message to broker"
                );
                PublishSetupError {
                    destination: destination.to_string(),
                    source,
                }
            })?;

        debug!(destination = destination, "Message handed to broker");

        let destination = destination.to_string();
        let observer = self.observer.clone();
        pending.on_complete(move |result| match result {
            Ok(receipt) => {
                info!(
                    topic = %receipt.topic,
                    partition = receipt.partition,
                    "sent message='{}' with offset={}",
                    payload,
                    receipt.offset
                );
                metric_inc!(MESSAGES_PUBLISHED, &[destination.as_str()]);
                if let Some(observer) = observer {
                    observer.on_published(&receipt, &payload);
                }
            }
            Err(cause) => {
                let failure = PublishDeliveryError {
                    destination,
                    cause: cause.to_string(),
                    payload,
                };
                error!(
                    destination = %failure.destination,
                    error = %failure.cause,
                    "unable to send message='{}'",
                    failure.payload
                );
                metric_inc!(PUBLISH_FAILURES, &[failure.destination.as_str()]);
                if let Some(observer) = observer {
                    observer.on_failed(&failure);
                }
            }
        });

        Ok(())
    }

    /// Encode a record and publish it.
    ///
    /// A field holding the delimiter is logged and sent as is.
    pub fn publish_record(
        &self,
        destination: &str,
        record: &Record,
    ) -> Result<(), PublishSetupError> {
        if let Some(field) = self.codec.contains_delimiter(record) {
            warn!(
                destination = destination,
                field = %field,
                delimiter = %self.codec.delimiter(),
                "Record field contains the wire delimiter; message will not decode"
            );
        }
        self.publish(destination, self.codec.encode(record))
    }
}
