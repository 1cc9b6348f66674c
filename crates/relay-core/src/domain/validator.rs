//! # Record Validator
//!
//! Checks fields left to right (timestamp, actor, content) and stops at the
//! first violation.

use crate::domain::errors::{ConfigError, InvalidRecordError, Violation};
use crate::domain::record::{Record, RecordField};
use std::fmt;
use std::str::FromStr;

/// Whether a present but empty field is acceptable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmptinessPolicy {
    #[default]
    RejectEmpty,
    AllowEmpty,
}

impl EmptinessPolicy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EmptinessPolicy::RejectEmpty => "reject-empty",
            EmptinessPolicy::AllowEmpty => "allow-empty",
        }
    }
}

impl FromStr for EmptinessPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject-empty" => Ok(EmptinessPolicy::RejectEmpty),
            "allow-empty" => Ok(EmptinessPolicy::AllowEmpty),
            _ => Err(ConfigError::UnknownPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for EmptinessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stateless field checker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordValidator {
    policy: EmptinessPolicy,
}

impl RecordValidator {
    #[must_use]
    pub fn new(policy: EmptinessPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub fn policy(&self) -> EmptinessPolicy {
        self.policy
    }

    /// Validate a record against the configured policy.
    ///
    /// # Errors
    ///
    /// Returns the first offending field in wire order.
    pub fn validate(&self, record: &Record) -> Result<(), InvalidRecordError> {
        if self.policy == EmptinessPolicy::AllowEmpty {
            return Ok(());
        }

        match RecordField::ALL
            .into_iter()
            .find(|field| record.field(*field).is_empty())
        {
            Some(field) => Err(InvalidRecordError {
                field,
                reason: Violation::Empty,
            }),
            None => Ok(()),
        }
    }
}
