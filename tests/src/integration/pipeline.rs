//! # Pipeline Tests
//!
//! ```text
//! Record ─encode─→ RecordPublisher ─→ broker ─→ SubscriptionListener
//!                                                      │
//!                     sink.save ←─ validate ←─ decode ←┘
//! ```
//!
//! ## Test Categories
//!
//! 1. **Consumer path**: well-formed, malformed and invalid lines
//! 2. **Publish completions**: acknowledgment and delivery failure
//! 3. **Persistence failure**: logged once, never retried
//! 4. **Full relay**: publisher and handler sharing one broker

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use relay_bus::{DeliveryError, InMemoryBroker, MessageBroker, SendReceipt};
    use relay_core::{
        EmptinessPolicy, HandleOutcome, InMemoryRecordSink, MessageHandler, PersistError, Record,
        RecordHandler, RecordPublisher, RecordValidator, SubscriptionListener, WireCodec,
    };
    use tokio::sync::watch;
    use tokio::time::timeout;

    use crate::integration::support::{ManualBroker, ManualSink, RecordingObserver};

    fn handler<S: relay_core::RecordSink>(sink: Arc<S>) -> RecordHandler<S> {
        RecordHandler::new(WireCodec::default(), RecordValidator::default(), sink)
    }

    // =========================================================================
    // Consumer path
    // =========================================================================

    #[test]
    fn test_well_formed_line_saved_once() {
        let sink = Arc::new(ManualSink::new());
        let h = handler(sink.clone());

        let outcome = h.on_message(Some("2023-10-26\u{0001}testUser\u{0001}Hello Kafka"));

        assert_eq!(outcome, HandleOutcome::PersistPending);
        assert_eq!(
            sink.calls(),
            vec![Record::new("2023-10-26", "testUser", "Hello Kafka")]
        );
    }

    #[test]
    fn test_two_segment_line_never_saved() {
        let sink = Arc::new(ManualSink::new());
        let h = handler(sink.clone());

        let err = WireCodec::default().decode(Some("date\u{0001}user")).unwrap_err();
        assert_eq!((err.expected, err.got), (3, 2));

        assert_eq!(h.on_message(Some("date\u{0001}user")), HandleOutcome::DecodeFailed);
        assert!(sink.calls().is_empty());
    }

    #[test]
    fn test_empty_actor_never_saved_under_reject_empty() {
        let sink = Arc::new(ManualSink::new());
        let h = RecordHandler::new(
            WireCodec::default(),
            RecordValidator::new(EmptinessPolicy::RejectEmpty),
            sink.clone(),
        );

        let decoded = WireCodec::default().decode(Some("abc\u{0001}\u{0001}def")).unwrap();
        assert_eq!(decoded, Record::new("abc", "", "def"));

        assert_eq!(
            h.on_message(Some("abc\u{0001}\u{0001}def")),
            HandleOutcome::ValidationFailed
        );
        assert!(sink.calls().is_empty());
    }

    #[test]
    fn test_bad_message_does_not_affect_next() {
        let sink = Arc::new(ManualSink::new());
        let h = handler(sink.clone());

        h.on_message(None);
        h.on_message(Some("x\u{0001}\u{0001}"));
        h.on_message(Some("t\u{0001}a\u{0001}c"));

        assert_eq!(sink.calls(), vec![Record::new("t", "a", "c")]);
    }

    // =========================================================================
    // Publish completions
    // =========================================================================

    #[test]
    fn test_publish_acknowledged_with_offset() {
        let broker = Arc::new(ManualBroker::new());
        let observer = Arc::new(RecordingObserver::default());
        let publisher =
            RecordPublisher::new(broker.clone(), WireCodec::default()).with_observer(observer.clone());

        publisher.publish("topicX", "payload1").unwrap();

        // Returned before any acknowledgment.
        assert!(observer.published.lock().is_empty());

        let send = broker.next_pending().unwrap();
        assert_eq!(send.topic, "topicX");
        assert_eq!(send.payload, "payload1");
        send.ack.succeed(SendReceipt {
            topic: "topicX".to_string(),
            partition: 0,
            offset: 42,
        });

        let published = observer.published.lock();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].offset, 42);
        assert!(observer.failed.lock().is_empty());
    }

    #[test]
    fn test_publish_failure_carries_cause_and_payload() {
        let broker = Arc::new(ManualBroker::new());
        let observer = Arc::new(RecordingObserver::default());
        let publisher =
            RecordPublisher::new(broker.clone(), WireCodec::default()).with_observer(observer.clone());

        publisher.publish("topicX", "payload1").unwrap();
        let send = broker.next_pending().unwrap();

        std::thread::spawn(move || send.ack.fail(DeliveryError::failed("network timeout")))
            .join()
            .unwrap();

        let failed = observer.failed.lock();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].cause, "network timeout");
        assert_eq!(failed[0].payload, "payload1");
        assert!(observer.published.lock().is_empty());
    }

    #[test]
    fn test_publish_does_not_wait_for_acknowledgment() {
        let broker = Arc::new(ManualBroker::new());
        let publisher = RecordPublisher::new(broker.clone(), WireCodec::default());

        for i in 0..100 {
            publisher.publish("topicX", format!("payload{i}")).unwrap();
        }

        assert_eq!(broker.pending_count(), 100);
    }

    // =========================================================================
    // Persistence failure
    // =========================================================================

    #[test]
    fn test_failed_save_not_retried() {
        let sink = Arc::new(ManualSink::new());
        let h = handler(sink.clone());

        h.on_message(Some("t\u{0001}a\u{0001}c"));
        let completion = sink.next_pending().unwrap();
        completion.fail(PersistError::Write("replica set unavailable".to_string()));

        assert_eq!(sink.calls().len(), 1);
        assert!(sink.next_pending().is_none());
    }

    #[tokio::test]
    async fn test_failing_store_keeps_consumer_running() {
        let broker = InMemoryBroker::new();
        let sink = Arc::new(InMemoryRecordSink::failing("disk full"));
        let handler: Arc<dyn MessageHandler> = Arc::new(handler(sink.clone()));
        let (_tx, rx) = watch::channel(false);
        let listener = tokio::spawn(
            SubscriptionListener::new(broker.subscribe("tweets").unwrap(), handler).run(rx),
        );

        broker.send("tweets", "t\u{0001}a\u{0001}one".into()).unwrap();
        broker.send("tweets", "t\u{0001}a\u{0001}two".into()).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        broker.close();

        let handled = timeout(Duration::from_secs(1), listener).await.unwrap().unwrap();
        assert_eq!(handled, 2);
        assert_eq!(sink.attempts(), 2);
        assert!(sink.is_empty());
    }

    // =========================================================================
    // Full relay
    // =========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_publisher_to_sink_through_broker() {
        let broker = Arc::new(InMemoryBroker::new());
        let sink = Arc::new(InMemoryRecordSink::new());
        let handler: Arc<dyn MessageHandler> = Arc::new(handler(sink.clone()));
        let (_tx, rx) = watch::channel(false);
        let listener = tokio::spawn(
            SubscriptionListener::new(broker.subscribe("tweets").unwrap(), handler).run(rx),
        );

        let publisher = RecordPublisher::new(broker.clone(), WireCodec::default());
        let records: Vec<Record> = (0..20)
            .map(|i| Record::new(format!("2023-10-{:02}", i + 1), format!("user{i}"), format!("msg {i}")))
            .collect();
        for record in &records {
            publisher.publish_record("tweets", record).unwrap();
        }
        publisher.publish("tweets", "only\u{0001}two").unwrap();

        // Closing drains everything already buffered.
        broker.close();
        let handled = timeout(Duration::from_secs(1), listener).await.unwrap().unwrap();

        assert_eq!(handled, 21);
        assert_eq!(sink.records(), records);
    }
}
