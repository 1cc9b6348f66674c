//! # In-Memory Broker
//!
//! Single-process broker used for development and tests. Each topic is an
//! append log with its own offset counter and a broadcast fan-out to
//! subscribers. A networked deployment would plug a real client in behind
//! the same `MessageBroker` trait.

use crate::broker::{BrokerMessage, BrokerSetupError, DeliveryError, MessageBroker, SendReceipt};
use crate::deferred::Deferred;
use crate::subscriber::{MessageStream, Subscription, SubscriptionGuard};
use crate::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_PAYLOAD_BYTES, MAX_TOPIC_NAME_LEN};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Only partition used by the in-memory broker.
const PARTITION: u32 = 0;

struct TopicLog {
    sender: broadcast::Sender<BrokerMessage>,
    next_offset: AtomicU64,
}

impl TopicLog {
    fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            next_offset: AtomicU64::new(0),
        }
    }
}

/// In-memory implementation of the broker.
///
/// Uses `tokio::sync::broadcast` per topic for multi-producer,
/// multi-consumer semantics.
pub struct InMemoryBroker {
    /// Topic logs by name.
    topics: RwLock<HashMap<String, Arc<TopicLog>>>,

    /// Active subscription count by topic.
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,

    /// Total messages accepted.
    messages_sent: AtomicU64,

    /// Set once `close` is called.
    closed: AtomicBool,

    /// Channel capacity per topic.
    capacity: usize,

    /// Largest accepted payload in bytes.
    max_payload_bytes: usize,
}

impl InMemoryBroker {
    /// Create a new in-memory broker with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_PAYLOAD_BYTES)
    }

    /// Create a new in-memory broker with the given channel capacity and payload limit.
    #[must_use]
    pub fn with_limits(capacity: usize, max_payload_bytes: usize) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            messages_sent: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            capacity: capacity.max(1),
            max_payload_bytes,
        }
    }

    /// Subscribe to a topic, creating it if needed.
    ///
    /// Only messages sent after this call are delivered.
    pub fn subscribe(&self, topic: &str) -> Result<Subscription, BrokerSetupError> {
        self.ensure_open()?;
        validate_topic(topic)?;

        let log = self.topic_log(topic)?;
        let receiver = log.sender.subscribe();

        if let Ok(mut subs) = self.subscriptions.write() {
            *subs.entry(topic.to_string()).or_insert(0) += 1;
        }

        debug!(topic = topic, "New subscription created");

        Ok(Subscription::new(
            receiver,
            SubscriptionGuard::new(topic.to_string(), self.subscriptions.clone()),
        ))
    }

    /// Subscribe and wrap the subscription as a `Stream`.
    pub fn message_stream(&self, topic: &str) -> Result<MessageStream, BrokerSetupError> {
        Ok(MessageStream::new(self.subscribe(topic)?))
    }

    /// Close the broker. Later sends fail and subscriptions drain to `None`.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Ok(mut topics) = self.topics.write() {
            topics.clear();
        }
        info!("In-memory broker closed");
    }

    /// Whether `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of live subscriptions on a topic.
    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.subscriptions
            .read()
            .ok()
            .and_then(|subs| subs.get(topic).copied())
            .unwrap_or(0)
    }

    /// Next offset that will be assigned on a topic.
    #[must_use]
    pub fn next_offset(&self, topic: &str) -> u64 {
        self.topics
            .read()
            .ok()
            .and_then(|topics| {
                topics
                    .get(topic)
                    .map(|log| log.next_offset.load(Ordering::SeqCst))
            })
            .unwrap_or(0)
    }

    /// Total messages accepted across all topics.
    #[must_use]
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    /// Channel capacity per topic.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Deliver a raw message (possibly with a null value) to a topic.
    ///
    /// Used to model tombstones and foreign producers.
    pub fn inject(
        &self,
        topic: &str,
        payload: Option<String>,
    ) -> Result<SendReceipt, BrokerSetupError> {
        self.ensure_open()?;
        validate_topic(topic)?;
        self.append(topic, payload)
    }

    fn ensure_open(&self) -> Result<(), BrokerSetupError> {
        if self.is_closed() {
            return Err(BrokerSetupError::Closed);
        }
        Ok(())
    }

    fn topic_log(&self, topic: &str) -> Result<Arc<TopicLog>, BrokerSetupError> {
        if let Some(log) = self
            .topics
            .read()
            .map_err(|_| BrokerSetupError::Unavailable("topic registry poisoned".to_string()))?
            .get(topic)
        {
            return Ok(Arc::clone(log));
        }

        let mut topics = self
            .topics
            .write()
            .map_err(|_| BrokerSetupError::Unavailable("topic registry poisoned".to_string()))?;
        // `close` clears the registry under this lock; never recreate a topic after it.
        self.ensure_open()?;
        let log = topics
            .entry(topic.to_string())
            .or_insert_with(|| Arc::new(TopicLog::new(self.capacity)));
        Ok(Arc::clone(log))
    }

    fn append(
        &self,
        topic: &str,
        payload: Option<String>,
    ) -> Result<SendReceipt, BrokerSetupError> {
        let log = self.topic_log(topic)?;
        let offset = log.next_offset.fetch_add(1, Ordering::SeqCst);
        self.messages_sent.fetch_add(1, Ordering::Relaxed);

        let message = BrokerMessage {
            topic: topic.to_string(),
            partition: PARTITION,
            offset,
            payload,
        };

        match log.sender.send(message) {
            Ok(receivers) => {
                debug!(topic = topic, offset = offset, receivers = receivers, "Message appended");
            }
            Err(_) => {
                // No live subscribers; the offset is still consumed.
                debug!(topic = topic, offset = offset, "Message appended with no subscribers");
            }
        }

        Ok(SendReceipt {
            topic: topic.to_string(),
            partition: PARTITION,
            offset,
        })
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBroker for InMemoryBroker {
    fn send(
        &self,
        topic: &str,
        payload: String,
    ) -> Result<Deferred<SendReceipt, DeliveryError>, BrokerSetupError> {
        self.ensure_open()?;
        validate_topic(topic)?;

        if payload.len() > self.max_payload_bytes {
            warn!(
                topic = topic,
                size = payload.len(),
                limit = self.max_payload_bytes,
                "Rejecting oversized payload"
            );
            return Err(BrokerSetupError::PayloadTooLarge {
                size: payload.len(),
                limit: self.max_payload_bytes,
            });
        }

        let receipt = self.append(topic, Some(payload))?;
        Ok(Deferred::ready(Ok(receipt)))
    }
}

/// Validate a topic name the way Kafka does: 1..=249 chars of `[A-Za-z0-9._-]`.
pub fn validate_topic(topic: &str) -> Result<(), BrokerSetupError> {
    let valid = !topic.is_empty()
        && topic.len() <= MAX_TOPIC_NAME_LEN
        && topic != "."
        && topic != ".."
        && topic
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

    if valid {
        Ok(())
    } else {
        Err(BrokerSetupError::InvalidTopic(topic.to_string()))
    }
}
