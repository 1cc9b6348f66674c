//! # Relay Errors
//!
//! One error type per failure stage. Only [`PublishSetupError`] ever reaches
//! a caller synchronously; the rest are logged and dropped where they occur.

use crate::domain::record::RecordField;
use relay_bus::{BrokerSetupError, Canceled};
use thiserror::Error;

/// Wire decode produced the wrong number of fields, or there was no input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Expected {expected} parts, but got {got}")]
pub struct MalformedMessageError {
    pub expected: usize,
    pub got: usize,
}

/// Why a field failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// Present but zero-length.
    Empty,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::Empty => f.write_str("must not be empty"),
        }
    }
}

/// A decoded record that the validation policy rejects.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid record: {field} {reason}")]
pub struct InvalidRecordError {
    pub field: RecordField,
    pub reason: Violation,
}

/// The broker client refused a send before any asynchronous work started.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to publish to {destination}: {source}")]
pub struct PublishSetupError {
    pub destination: String,
    #[source]
    pub source: BrokerSetupError,
}

/// The broker reported a failure after accepting a send.
///
/// Carries the original payload for diagnostics.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unable to send message='{payload}' to {destination}: {cause}")]
pub struct PublishDeliveryError {
    pub destination: String,
    pub cause: String,
    pub payload: String,
}

/// Document store failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistError {
    /// The store could not accept the write at all.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store accepted the write and then failed it.
    #[error("write failed: {0}")]
    Write(String),

    /// The store dropped the write without reporting an outcome.
    #[error("write canceled before completion")]
    Canceled,
}

impl From<Canceled> for PersistError {
    fn from(_: Canceled) -> Self {
        PersistError::Canceled
    }
}

/// Invalid relay configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("delimiter {0:?} is not a control character")]
    InvalidDelimiter(char),

    #[error("unknown emptiness policy {0:?} (expected \"reject-empty\" or \"allow-empty\")")]
    UnknownPolicy(String),

    #[error("topic must not be empty")]
    EmptyTopic,

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}
