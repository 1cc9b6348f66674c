//! In-memory document store.

use crate::domain::errors::PersistError;
use crate::domain::record::Record;
use crate::ports::outbound::RecordSink;
use parking_lot::RwLock;
use relay_bus::Deferred;

/// Keeps saved records in a vector. Completes every save immediately.
#[derive(Debug, Default)]
pub struct InMemoryRecordSink {
    records: RwLock<Vec<Record>>,
    attempts: RwLock<usize>,
    failure: Option<String>,
}

impl InMemoryRecordSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every save completes with `PersistError::Write(reason)`.
    #[must_use]
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Snapshot of everything saved so far.
    pub fn records(&self) -> Vec<Record> {
        self.records.read().clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Number of `save` calls, successful or not.
    pub fn attempts(&self) -> usize {
        *self.attempts.read()
    }
}

impl RecordSink for InMemoryRecordSink {
    fn save(&self, record: Record) -> Result<Deferred<Record, PersistError>, PersistError> {
        *self.attempts.write() += 1;

        if let Some(reason) = &self.failure {
            return Ok(Deferred::ready(Err(PersistError::Write(reason.clone()))));
        }

        self.records.write().push(record.clone());
        Ok(Deferred::ready(Ok(record)))
    }
}
