//! # Test Doubles
//!
//! A broker and a sink whose completions the test triggers by hand, plus a
//! publish observer that records what it saw.

use parking_lot::Mutex;
use relay_bus::{
    deferred, BrokerSetupError, Completer, Deferred, DeliveryError, MessageBroker, SendReceipt,
};
use relay_core::{PersistError, PublishDeliveryError, PublishObserver, Record, RecordSink};

/// A send accepted by [`ManualBroker`] and not yet acknowledged.
pub struct PendingSend {
    pub topic: String,
    pub payload: String,
    pub ack: Completer<SendReceipt, DeliveryError>,
}

/// Broker that accepts every send and leaves acknowledgment to the test.
#[derive(Default)]
pub struct ManualBroker {
    pending: Mutex<Vec<PendingSend>>,
}

impl ManualBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Oldest unacknowledged send.
    pub fn next_pending(&self) -> Option<PendingSend> {
        let mut pending = self.pending.lock();
        if pending.is_empty() {
            None
        } else {
            Some(pending.remove(0))
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

impl MessageBroker for ManualBroker {
    fn send(
        &self,
        topic: &str,
        payload: String,
    ) -> Result<Deferred<SendReceipt, DeliveryError>, BrokerSetupError> {
        let (ack, pending) = deferred();
        self.pending.lock().push(PendingSend {
            topic: topic.to_string(),
            payload,
            ack,
        });
        Ok(pending)
    }
}

/// Observer that records every publish outcome.
#[derive(Default)]
pub struct RecordingObserver {
    pub published: Mutex<Vec<SendReceipt>>,
    pub failed: Mutex<Vec<PublishDeliveryError>>,
}

impl PublishObserver for RecordingObserver {
    fn on_published(&self, receipt: &SendReceipt, _payload: &str) {
        self.published.lock().push(receipt.clone());
    }

    fn on_failed(&self, error: &PublishDeliveryError) {
        self.failed.lock().push(error.clone());
    }
}

/// Sink that counts calls and leaves completion to the test.
#[derive(Default)]
pub struct ManualSink {
    saved: Mutex<Vec<Record>>,
    pending: Mutex<Vec<Completer<Record, PersistError>>>,
}

impl ManualSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record `save` was called with, in call order.
    pub fn calls(&self) -> Vec<Record> {
        self.saved.lock().clone()
    }

    pub fn next_pending(&self) -> Option<Completer<Record, PersistError>> {
        let mut pending = self.pending.lock();
        if pending.is_empty() {
            None
        } else {
            Some(pending.remove(0))
        }
    }
}

impl RecordSink for ManualSink {
    fn save(&self, record: Record) -> Result<Deferred<Record, PersistError>, PersistError> {
        self.saved.lock().push(record);
        let (completer, pending) = deferred();
        self.pending.lock().push(completer);
        Ok(pending)
    }
}
