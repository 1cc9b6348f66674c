//! # Wire Codec
//!
//! A record travels as one text line with its fields joined by a reserved
//! control character:
//!
//! ```text
//! timestamp <DELIM> actor <DELIM> content
//! ```
//!
//! No length prefix, no escaping, no trailing delimiter. A field that itself
//! contains the delimiter corrupts the framing; producers can detect that with
//! [`WireCodec::contains_delimiter`] but the format does not repair it.

use crate::domain::errors::{ConfigError, MalformedMessageError};
use crate::domain::record::{Record, RecordField};
use std::fmt;

/// Number of fields in a wire message.
pub const EXPECTED_FIELDS: usize = 3;

/// Start of heading (U+0001).
pub const DEFAULT_DELIMITER: char = '\u{1}';

/// The reserved field separator. Always a control character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiter(char);

impl Delimiter {
    pub fn new(c: char) -> Result<Self, ConfigError> {
        if c.is_control() {
            Ok(Self(c))
        } else {
            Err(ConfigError::InvalidDelimiter(c))
        }
    }

    /// Parse a hex code point such as `01` or `0x1f`.
    pub fn from_hex(value: &str) -> Result<Self, ConfigError> {
        let digits = value
            .trim()
            .trim_start_matches("0x")
            .trim_start_matches("0X");
        let invalid = || ConfigError::InvalidValue {
            key: "delimiter".to_string(),
            value: value.to_string(),
        };
        let code = u32::from_str_radix(digits, 16).map_err(|_| invalid())?;
        let c = char::from_u32(code).ok_or_else(invalid)?;
        Self::new(c)
    }

    #[must_use]
    pub fn as_char(self) -> char {
        self.0
    }
}

impl Default for Delimiter {
    fn default() -> Self {
        Self(DEFAULT_DELIMITER)
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U+{:04X}", self.0 as u32)
    }
}

/// Encodes records to wire lines and back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WireCodec {
    delimiter: Delimiter,
}

impl WireCodec {
    #[must_use]
    pub fn new(delimiter: Delimiter) -> Self {
        Self { delimiter }
    }

    #[must_use]
    pub fn delimiter(&self) -> Delimiter {
        self.delimiter
    }

    /// Join the fields in wire order. Never fails.
    #[must_use]
    pub fn encode(&self, record: &Record) -> String {
        let d = self.delimiter.as_char();
        let mut line = String::with_capacity(
            record.timestamp.len() + record.actor.len() + record.content.len() + 2 * d.len_utf8(),
        );
        line.push_str(&record.timestamp);
        line.push(d);
        line.push_str(&record.actor);
        line.push(d);
        line.push_str(&record.content);
        line
    }

    /// Split a wire line back into a record.
    ///
    /// Absent input counts as zero segments, so callers have a single
    /// "nothing to process" branch.
    pub fn decode(&self, raw: Option<&str>) -> Result<Record, MalformedMessageError> {
        let Some(raw) = raw else {
            return Err(MalformedMessageError {
                expected: EXPECTED_FIELDS,
                got: 0,
            });
        };

        let mut parts = raw.split(self.delimiter.as_char());
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(timestamp), Some(actor), Some(content), None) => {
                Ok(Record::new(timestamp, actor, content))
            }
            _ => Err(MalformedMessageError {
                expected: EXPECTED_FIELDS,
                got: raw.split(self.delimiter.as_char()).count(),
            }),
        }
    }

    /// First field that holds the delimiter, if any.
    #[must_use]
    pub fn contains_delimiter(&self, record: &Record) -> Option<RecordField> {
        let d = self.delimiter.as_char();
        RecordField::ALL
            .into_iter()
            .find(|field| record.field(*field).contains(d))
    }
}
