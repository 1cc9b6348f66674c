//! # Outbound Ports (Driven Ports / SPI)
//!
//! Dependencies the relay needs. The broker port itself lives in
//! `relay_bus::MessageBroker`.

use crate::domain::errors::{PersistError, PublishDeliveryError};
use crate::domain::record::Record;
use async_trait::async_trait;
use relay_bus::{Deferred, SendReceipt};

/// Document store.
///
/// `save` must not block. The outer `Result` reports failures that happen
/// before the write is under way; everything after arrives through the
/// deferred result.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Start persisting a record.
    ///
    /// # Errors
    ///
    /// * `PersistError::Unavailable` - The store could not take the write
    fn save(&self, record: Record) -> Result<Deferred<Record, PersistError>, PersistError>;

    /// Wait until every write started by `save` has completed.
    ///
    /// Sinks that complete inside `save` keep the default.
    async fn flush(&self) {}
}

/// Extra reactions to publish completions, layered on by the caller.
///
/// Called on the broker client's completion thread after the publisher has
/// logged the outcome.
pub trait PublishObserver: Send + Sync {
    fn on_published(&self, receipt: &SendReceipt, payload: &str);

    fn on_failed(&self, error: &PublishDeliveryError);
}

#[async_trait]
impl<S: RecordSink + ?Sized> RecordSink for std::sync::Arc<S> {
    fn save(&self, record: Record) -> Result<Deferred<Record, PersistError>, PersistError> {
        (**self).save(record)
    }

    async fn flush(&self) {
        (**self).flush().await
    }
}
