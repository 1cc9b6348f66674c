//! # Stream Forwarder
//!
//! Producer side of the relay: turns upstream events into records and
//! publishes them to the configured topic. Notices without a record
//! (deletions, stall warnings, ...) are only logged.

use crate::domain::errors::PublishSetupError;
use crate::domain::record::Record;
use crate::domain::upstream::{
    format_trade, format_tweet, DeletionNotice, StallWarning, StreamEvent, TrackFilter,
    TradeMessage, TweetStatus,
};
use crate::ports::inbound::StatusListener;
use crate::service::publisher::RecordPublisher;
use relay_bus::MessageBroker;
use relay_telemetry::{metric_inc, UPSTREAM_SKIPPED};
use tracing::{error, info, warn};

/// Publishes upstream events to one topic.
pub struct StreamForwarder<B: MessageBroker> {
    publisher: RecordPublisher<B>,
    topic: String,
    filter: TrackFilter,
}

impl<B: MessageBroker> StreamForwarder<B> {
    pub fn new(publisher: RecordPublisher<B>, topic: impl Into<String>, filter: TrackFilter) -> Self {
        Self {
            publisher,
            topic: topic.into(),
            filter,
        }
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Route one event. Returns whether a message was handed to the broker.
    ///
    /// # Errors
    ///
    /// Returns `PublishSetupError` if the broker refused the send.
    pub fn dispatch(&self, event: &StreamEvent) -> Result<bool, PublishSetupError> {
        match event {
            StreamEvent::Status(status) => self.forward_status(status),
            StreamEvent::Trade(trade) => self.forward_trade(trade).map(|()| true),
            StreamEvent::Deletion(notice) => {
                self.on_deletion_notice(notice);
                Ok(false)
            }
            StreamEvent::TrackLimitation { limited } => {
                self.on_track_limitation_notice(*limited);
                Ok(false)
            }
            StreamEvent::StallWarning(warning) => {
                self.on_stall_warning(warning);
                Ok(false)
            }
            StreamEvent::ScrubGeo {
                user_id,
                up_to_status_id,
            } => {
                self.on_scrub_geo(*user_id, *up_to_status_id);
                Ok(false)
            }
        }
    }

    /// Format and publish a status if it passes the track filter.
    pub fn forward_status(&self, status: &TweetStatus) -> Result<bool, PublishSetupError> {
        let Some(record) = format_tweet(status) else {
            warn!(
                status_id = status.id,
                "Skipping message for status due to formatting issues"
            );
            metric_inc!(UPSTREAM_SKIPPED, &["unformattable"]);
            return Ok(false);
        };

        if !self.filter.matches(&record.content) {
            metric_inc!(UPSTREAM_SKIPPED, &["filtered"]);
            return Ok(false);
        }

        self.send(record).map(|()| true)
    }

    /// Format and publish a trade. Trades are not track-filtered.
    pub fn forward_trade(&self, trade: &TradeMessage) -> Result<(), PublishSetupError> {
        self.send(format_trade(trade))
    }

    fn send(&self, record: Record) -> Result<(), PublishSetupError> {
        info!(topic = %self.topic, "Received event, formatted record {:?}", record);
        self.publisher.publish_record(&self.topic, &record)
    }
}

impl<B: MessageBroker> StatusListener for StreamForwarder<B> {
    fn on_status(&self, status: &TweetStatus) {
        if let Err(e) = self.forward_status(status) {
            error!(status_id = status.id, error = %e, "Failed to publish status");
        }
    }

    fn on_deletion_notice(&self, notice: &DeletionNotice) {
        info!(
            status_id = notice.status_id,
            user_id = notice.user_id,
            "Status deletion notice"
        );
    }

    fn on_track_limitation_notice(&self, limited: u64) {
        warn!(limited = limited, "Track limitation notice");
    }

    fn on_stall_warning(&self, warning: &StallWarning) {
        warn!("Stall warning: {}", warning);
    }

    fn on_scrub_geo(&self, user_id: u64, up_to_status_id: u64) {
        info!(
            user_id = user_id,
            up_to_status_id = up_to_status_id,
            "Scrub geo event"
        );
    }

    fn on_exception(&self, error: &(dyn std::error::Error + 'static)) {
        error!(error = %error, "Exception in upstream stream listener");
    }
}
