//! # Subscription Listener
//!
//! Pulls messages from a broker subscription and hands each payload to a
//! [`MessageHandler`], one at a time, in delivery order.

use crate::ports::inbound::MessageHandler;
use relay_bus::MessageSource;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

pub struct SubscriptionListener<M: MessageSource> {
    source: M,
    handler: Arc<dyn MessageHandler>,
}

impl<M: MessageSource> SubscriptionListener<M> {
    pub fn new(source: M, handler: Arc<dyn MessageHandler>) -> Self {
        Self { source, handler }
    }

    /// Run until the source is exhausted or `shutdown` flips to `true`
    /// (or its sender is dropped). Returns the number of messages handled.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> u64 {
        let mut handled = 0_u64;

        loop {
            if *shutdown.borrow() {
                info!(handled = handled, "Listener shutting down");
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        info!(handled = handled, "Shutdown sender dropped, listener stopping");
                        break;
                    }
                }
                message = self.source.next_message() => {
                    let Some(message) = message else {
                        info!(handled = handled, "Message source closed, listener stopping");
                        break;
                    };
                    debug!(
                        topic = %message.topic,
                        partition = message.partition,
                        offset = message.offset,
                        "Delivering message"
                    );
                    let outcome = self.handler.on_message(message.payload.as_deref());
                    debug!(offset = message.offset, outcome = outcome.as_str(), "Message handled");
                    handled += 1;
                }
            }
        }

        handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_sink::InMemoryRecordSink;
    use crate::domain::codec::WireCodec;
    use crate::domain::record::Record;
    use crate::domain::validator::RecordValidator;
    use crate::service::handler::RecordHandler;
    use relay_bus::{InMemoryBroker, MessageBroker};
    use std::time::Duration;
    use tokio::time::timeout;

    fn handler(sink: Arc<InMemoryRecordSink>) -> Arc<dyn MessageHandler> {
        Arc::new(RecordHandler::new(
            WireCodec::default(),
            RecordValidator::default(),
            sink,
        ))
    }

    #[tokio::test]
    async fn test_runs_until_broker_closes() {
        let broker = InMemoryBroker::new();
        let sink = Arc::new(InMemoryRecordSink::new());
        let (_tx, rx) = watch::channel(false);
        let listener = SubscriptionListener::new(broker.subscribe("tweets").unwrap(), handler(sink.clone()));
        let task = tokio::spawn(listener.run(rx));

        broker.send("tweets", "2023-10-26\u{1}testUser\u{1}Hello Kafka".into()).unwrap();
        broker.send("tweets", "date\u{1}user".into()).unwrap();
        broker.inject("tweets", None).unwrap();
        broker.send("tweets", "abc\u{1}\u{1}def".into()).unwrap();
        broker.send("tweets", "t\u{1}a\u{1}after".into()).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        broker.close();

        let handled = timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
        assert_eq!(handled, 5);
        assert_eq!(
            sink.records(),
            vec![
                Record::new("2023-10-26", "testUser", "Hello Kafka"),
                Record::new("t", "a", "after"),
            ]
        );
    }

    #[tokio::test]
    async fn test_stops_on_shutdown_signal() {
        let broker = InMemoryBroker::new();
        let sink = Arc::new(InMemoryRecordSink::new());
        let (tx, rx) = watch::channel(false);
        let listener = SubscriptionListener::new(broker.subscribe("tweets").unwrap(), handler(sink));
        let task = tokio::spawn(listener.run(rx));

        tx.send(true).unwrap();

        let handled = timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
        assert_eq!(handled, 0);
    }
}
