//! # Topic Subscriptions
//!
//! Defines the receiving side of the broker.

use crate::broker::{BrokerMessage, MessageSource};
use async_trait::async_trait;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::{debug, warn};

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The broker was closed.
    #[error("Broker closed")]
    Closed,
}

/// Decrements the per-topic subscription count on drop.
pub(crate) struct SubscriptionGuard {
    topic: String,
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,
}

impl SubscriptionGuard {
    pub(crate) fn new(topic: String, subscriptions: Arc<RwLock<HashMap<String, usize>>>) -> Self {
        Self {
            topic,
            subscriptions,
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        let Ok(mut subs) = self.subscriptions.write() else {
            return;
        };
        let Some(count) = subs.get_mut(&self.topic) else {
            debug!(topic = %self.topic, "Subscription dropped");
            return;
        };

        *count = count.saturating_sub(1);
        if *count == 0 {
            subs.remove(&self.topic);
        }
        debug!(topic = %self.topic, "Subscription dropped");
    }
}

/// A subscription handle for receiving messages from one topic.
///
/// When dropped, the subscription is automatically cleaned up.
pub struct Subscription {
    /// The broadcast receiver.
    receiver: broadcast::Receiver<BrokerMessage>,

    /// Subscription tracking (for cleanup).
    guard: SubscriptionGuard,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<BrokerMessage>, guard: SubscriptionGuard) -> Self {
        Self { receiver, guard }
    }

    /// Receive the next message.
    ///
    /// # Returns
    ///
    /// - `Some(message)` - The next message on the topic
    /// - `None` - The broker was closed
    pub async fn recv(&mut self) -> Option<BrokerMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(
                        topic = %self.guard.topic,
                        lagged = count,
                        "Subscriber lagged, some messages skipped"
                    );
                    continue;
                }
            }
        }
    }

    /// Try to receive the next message without waiting.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(message))` - A message was available
    /// - `Ok(None)` - No message available (would block)
    /// - `Err(SubscriptionError::Closed)` - The broker was closed
    pub fn try_recv(&mut self) -> Result<Option<BrokerMessage>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(message) => return Ok(Some(message)),
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            }
        }
    }

    /// Subscribed topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.guard.topic
    }
}

#[async_trait]
impl MessageSource for Subscription {
    async fn next_message(&mut self) -> Option<BrokerMessage> {
        self.recv().await
    }
}

/// A stream wrapper for subscriptions.
///
/// Implements `tokio_stream::Stream` for use with stream combinators.
/// Lagged gaps are logged and skipped.
pub struct MessageStream {
    inner: BroadcastStream<BrokerMessage>,
    guard: SubscriptionGuard,
}

impl MessageStream {
    /// Create a new message stream from a subscription.
    #[must_use]
    pub fn new(subscription: Subscription) -> Self {
        let Subscription { receiver, guard } = subscription;
        Self {
            inner: BroadcastStream::new(receiver),
            guard,
        }
    }

    /// Topic of this stream.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.guard.topic
    }
}

impl Stream for MessageStream {
    type Item = BrokerMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(message))) => return Poll::Ready(Some(message)),
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(count)))) => {
                    warn!(topic = %self.guard.topic, lagged = count, "Stream lagged, skipping");
                    continue;
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
