//! # Inbound Ports (Driving Ports / API)
//!
//! How the outside world drives the relay: the broker client delivers raw
//! payloads to a [`MessageHandler`]; the upstream stream client reports
//! events to a [`StatusListener`].

use crate::domain::upstream::{DeletionNotice, StallWarning, TweetStatus};

/// Terminal state reached by one delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    /// Wrong field count or absent payload. The sink was not called.
    DecodeFailed,
    /// Decoded but rejected by the validation policy. The sink was not called.
    ValidationFailed,
    /// Handed to the sink; completion will be logged when it arrives.
    PersistPending,
    /// The sink failed synchronously (error or panic) before returning a deferred result.
    PersistRejected,
}

impl HandleOutcome {
    /// Label used for the dropped-message metric.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HandleOutcome::DecodeFailed => "malformed",
            HandleOutcome::ValidationFailed => "invalid",
            HandleOutcome::PersistPending => "pending",
            HandleOutcome::PersistRejected => "rejected",
        }
    }
}

/// Entry point invoked by the broker client once per delivered message.
///
/// Must be safe to call concurrently and must never panic or block. The
/// returned outcome is informational; broker adapters ignore it.
pub trait MessageHandler: Send + Sync {
    /// Process one delivered payload. `None` is a null value.
    fn on_message(&self, raw: Option<&str>) -> HandleOutcome;
}

/// Callbacks from the upstream tweet stream client.
pub trait StatusListener: Send + Sync {
    fn on_status(&self, status: &TweetStatus);

    fn on_deletion_notice(&self, notice: &DeletionNotice);

    fn on_track_limitation_notice(&self, limited: u64);

    fn on_stall_warning(&self, warning: &StallWarning);

    fn on_scrub_geo(&self, user_id: u64, up_to_status_id: u64);

    /// The stream client hit an error it could not handle itself.
    fn on_exception(&self, error: &(dyn std::error::Error + 'static));
}
