//! # Record Handler
//!
//! Consumer side of the relay. Every delivered message ends in exactly one
//! terminal state:
//!
//! ```text
//! RECEIVED ──decode──→ DECODE_FAILED                      (log + drop)
//!    │
//!    └──→ DECODED ──validate──→ VALIDATION_FAILED         (log + drop)
//!            │
//!            └──→ VALID ──save──→ PERSIST_PENDING
//!                                   ├── ok  ──→ PERSISTED       (log)
//!                                   └── err ──→ PERSIST_FAILED  (log, no retry)
//! ```
//!
//! Decode and validate run synchronously on the delivering thread, so
//! delivery order is kept up to the sink. Sink completions race freely.

use crate::domain::codec::WireCodec;
use crate::domain::record::Record;
use crate::domain::validator::RecordValidator;
use crate::ports::inbound::{HandleOutcome, MessageHandler};
use crate::ports::outbound::RecordSink;
use relay_telemetry::{
    metric_inc, time_histogram, MESSAGES_DROPPED, MESSAGES_RECEIVED, PERSIST_DURATION,
    PERSIST_FAILURES, RECORDS_PERSISTED,
};
use std::any::Any;
use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Step a message is in; a panic is attributed to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Decode,
    Validate,
    Persist,
}

impl Stage {
    fn as_str(self) -> &'static str {
        match self {
            Stage::Decode => "decode",
            Stage::Validate => "validate",
            Stage::Persist => "persist",
        }
    }

    fn failed_outcome(self) -> HandleOutcome {
        match self {
            Stage::Decode => HandleOutcome::DecodeFailed,
            Stage::Validate => HandleOutcome::ValidationFailed,
            Stage::Persist => HandleOutcome::PersistRejected,
        }
    }
}

/// Decodes, validates and persists delivered messages.
///
/// Stateless per call; the only shared field is the sink handle.
pub struct RecordHandler<S: RecordSink + ?Sized> {
    codec: WireCodec,
    validator: RecordValidator,
    sink: Arc<S>,
}

impl<S: RecordSink + ?Sized> Clone for RecordHandler<S> {
    fn clone(&self) -> Self {
        Self {
            codec: self.codec,
            validator: self.validator,
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<S: RecordSink + ?Sized> RecordHandler<S> {
    pub fn new(codec: WireCodec, validator: RecordValidator, sink: Arc<S>) -> Self {
        Self {
            codec,
            validator,
            sink,
        }
    }

    pub fn sink(&self) -> &Arc<S> {
        &self.sink
    }

    fn process(&self, raw: Option<&str>, stage: &Cell<Stage>) -> HandleOutcome {
        stage.set(Stage::Decode);
        let record = match self.codec.decode(raw) {
            Ok(record) => record,
            Err(e) => {
                error!(expected = e.expected, got = e.got, "{}", e);
                return self.drop_message(HandleOutcome::DecodeFailed);
            }
        };

        stage.set(Stage::Validate);
        if let Err(e) = self.validator.validate(&record) {
            warn!(
                field = %e.field,
                policy = %self.validator.policy(),
                "dropping record {:?}: {}",
                record,
                e
            );
            return self.drop_message(HandleOutcome::ValidationFailed);
        }

        stage.set(Stage::Persist);
        self.persist(record)
    }

    fn persist(&self, record: Record) -> HandleOutcome {
        let timer = time_histogram!(PERSIST_DURATION);
        let attempted = record.clone();

        let pending = match self.sink.save(record) {
            Ok(pending) => pending,
            Err(e) => {
                error!(error = %e, "failed to save record {:?}", attempted);
                metric_inc!(PERSIST_FAILURES);
                return self.drop_message(HandleOutcome::PersistRejected);
            }
        };

        debug!("record {:?} handed to sink", attempted);

        pending.on_complete(move |result| {
            drop(timer);
            match result {
                Ok(saved) => {
                    info!("record {:?} saved successfully", saved);
                    metric_inc!(RECORDS_PERSISTED);
                }
                Err(e) => {
                    error!(error = %e, "failed to save record {:?}", attempted);
                    metric_inc!(PERSIST_FAILURES);
                }
            }
        });

        HandleOutcome::PersistPending
    }

    fn contain_panic(&self, stage: Stage, panic: &(dyn Any + Send)) -> HandleOutcome {
        error!(
            stage = stage.as_str(),
            panic = %panic_message(panic),
            "panicked while handling message; message dropped"
        );
        if stage == Stage::Persist {
            metric_inc!(PERSIST_FAILURES);
        }
        self.drop_message(stage.failed_outcome())
    }

    fn drop_message(&self, outcome: HandleOutcome) -> HandleOutcome {
        metric_inc!(MESSAGES_DROPPED, &[outcome.as_str()]);
        outcome
    }
}

impl<S: RecordSink + ?Sized> MessageHandler for RecordHandler<S> {
    fn on_message(&self, raw: Option<&str>) -> HandleOutcome {
        metric_inc!(MESSAGES_RECEIVED);

        let stage = Cell::new(Stage::Decode);
        match catch_unwind(AssertUnwindSafe(|| self.process(raw, &stage))) {
            Ok(outcome) => outcome,
            Err(panic) => self.contain_panic(stage.get(), panic.as_ref()),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
