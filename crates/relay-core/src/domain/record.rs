//! # Record
//!
//! The structured unit moving through the relay.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One event as it moves from upstream source to document store.
///
/// `timestamp` is kept verbatim in whatever format the source produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    /// Source timestamp, untouched.
    pub timestamp: String,
    /// Originating identity.
    pub actor: String,
    /// Free text.
    pub content: String,
}

impl Record {
    pub fn new(
        timestamp: impl Into<String>,
        actor: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            actor: actor.into(),
            content: content.into(),
        }
    }

    /// Value of one field.
    #[must_use]
    pub fn field(&self, field: RecordField) -> &str {
        match field {
            RecordField::Timestamp => &self.timestamp,
            RecordField::Actor => &self.actor,
            RecordField::Content => &self.content,
        }
    }
}

/// Names a field of a [`Record`]. Declaration order is wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordField {
    Timestamp,
    Actor,
    Content,
}

impl RecordField {
    /// All fields in wire order.
    pub const ALL: [RecordField; 3] = [
        RecordField::Timestamp,
        RecordField::Actor,
        RecordField::Content,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RecordField::Timestamp => "timestamp",
            RecordField::Actor => "actor",
            RecordField::Content => "content",
        }
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
