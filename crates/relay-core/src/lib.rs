//! # Relay Core
//!
//! Framing, validation and asynchronous failure handling for the message
//! relay.
//!
//! ## Architecture
//!
//! This crate follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): records, wire codec, validator, upstream events
//! - **Ports Layer** (`ports/`): handler and listener APIs, the sink SPI
//! - **Service Layer** (`service/`): publisher, forwarder, handler
//! - **Adapters Layer** (`adapters/`): sinks and the subscription listener
//!
//! ## Flow
//!
//! ```text
//! upstream ─→ StreamForwarder ─encode─→ RecordPublisher ─→ broker
//!                                                            │
//! RecordSink ←─save─ validate ←─decode─ RecordHandler ←──────┘
//! ```
//!
//! ## Failure Isolation
//!
//! - Only `PublishSetupError` is returned to a caller
//! - Malformed, invalid and unpersistable messages are logged and dropped
//! - No stage retries; a failed message never affects the next one

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export public API
pub use adapters::json_sink::JsonLinesSink;
pub use adapters::listener::SubscriptionListener;
pub use adapters::memory_sink::InMemoryRecordSink;
pub use domain::codec::{Delimiter, WireCodec, DEFAULT_DELIMITER, EXPECTED_FIELDS};
pub use domain::errors::{
    ConfigError, InvalidRecordError, MalformedMessageError, PersistError, PublishDeliveryError,
    PublishSetupError, Violation,
};
pub use domain::record::{Record, RecordField};
pub use domain::upstream::{
    format_trade, format_tweet, DeletionNotice, StallWarning, StreamEvent, TrackFilter,
    TradeMessage, TradeSide, TweetStatus, TweetUser, DEFAULT_TRACK_TERMS,
};
pub use domain::validator::{EmptinessPolicy, RecordValidator};
pub use ports::inbound::{HandleOutcome, MessageHandler, StatusListener};
pub use ports::outbound::{PublishObserver, RecordSink};
pub use service::forwarder::StreamForwarder;
pub use service::handler::RecordHandler;
pub use service::publisher::RecordPublisher;
