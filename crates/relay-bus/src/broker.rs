//! # Broker Port
//!
//! The capability set this relay needs from a message broker client:
//! hand off a payload for a topic and get back a deferred acknowledgment.
//!
//! ```text
//! caller ──send(topic, payload)──→ [Broker client]
//!    ↑             │                      │
//!    │   Err(BrokerSetupError)            │ (later, broker-owned thread)
//!    │   (synchronous, before any I/O)    ↓
//!    └──── Ok(Deferred) ─────────→ SendReceipt | DeliveryError
//! ```

use crate::deferred::{Canceled, Deferred};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Broker-assigned position of an acknowledged message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    /// Topic the message was appended to.
    pub topic: String,
    /// Partition within the topic.
    pub partition: u32,
    /// Offset within the partition.
    pub offset: u64,
}

impl fmt::Display for SendReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}@{}", self.topic, self.partition, self.offset)
    }
}

/// A message as delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMessage {
    /// Source topic.
    pub topic: String,
    /// Source partition.
    pub partition: u32,
    /// Offset within the partition.
    pub offset: u64,
    /// Message value. `None` models a null value (tombstone).
    pub payload: Option<String>,
}

/// Failures raised synchronously while handing a message to the broker client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BrokerSetupError {
    /// Topic name is empty or contains characters the broker rejects.
    #[error("invalid topic name: {0:?}")]
    InvalidTopic(String),

    /// Payload exceeds the configured maximum message size.
    #[error("payload of {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    /// The broker client has been shut down.
    #[error("broker client closed")]
    Closed,

    /// The broker client could not set up the send.
    #[error("broker unavailable: {0}")]
    Unavailable(String),
}

/// Failures reported asynchronously after a send was accepted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The broker reported a delivery failure.
    #[error("{cause}")]
    Failed { cause: String },

    /// The broker client dropped the send without reporting an outcome.
    #[error("send canceled before acknowledgment")]
    Canceled,
}

impl DeliveryError {
    /// Build a failure from any displayable cause.
    pub fn failed(cause: impl Into<String>) -> Self {
        DeliveryError::Failed {
            cause: cause.into(),
        }
    }
}

impl From<Canceled> for DeliveryError {
    fn from(_: Canceled) -> Self {
        DeliveryError::Canceled
    }
}

/// Trait for handing messages to a broker.
///
/// Implementations must be safe to call concurrently from many threads and
/// must never block on the network inside `send`.
pub trait MessageBroker: Send + Sync {
    /// Hand off a payload for `topic`.
    ///
    /// # Errors
    ///
    /// Returns `BrokerSetupError` if the send could not even be started.
    /// Once `Ok` is returned, the outcome arrives through the deferred.
    fn send(
        &self,
        topic: &str,
        payload: String,
    ) -> Result<Deferred<SendReceipt, DeliveryError>, BrokerSetupError>;
}

/// Trait for pulling delivered messages from a subscription.
#[async_trait]
pub trait MessageSource: Send {
    /// Wait for the next message. `None` means the source is exhausted.
    async fn next_message(&mut self) -> Option<BrokerMessage>;
}
