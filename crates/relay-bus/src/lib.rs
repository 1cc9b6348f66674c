//! # Relay Bus - Broker Boundary
//!
//! The broker side of the message relay: a non-blocking send with a deferred
//! acknowledgment, and topic subscriptions delivering raw payloads.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │  Publisher   │                    │   Handler    │
//! │              │   send(topic)      │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!        ↑               ▼                    ↑
//!   Deferred ack   ┌──────────────┐          │
//!        └──────── │    Broker    │ ─────────┘
//!                  │              │  subscribe(topic)
//!                  └──────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - `send` never blocks on I/O; setup failures are returned synchronously
//! - every accepted send resolves its `Deferred` exactly once
//! - completion order across sends is not guaranteed

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod broker;
pub mod deferred;
pub mod memory;
pub mod subscriber;

// Re-export main types
pub use broker::{
    BrokerMessage, BrokerSetupError, DeliveryError, MessageBroker, MessageSource, SendReceipt,
};
pub use deferred::{deferred, Canceled, Completer, Deferred};
pub use memory::{validate_topic, InMemoryBroker};
pub use subscriber::{MessageStream, Subscription, SubscriptionError};

/// Maximum messages to buffer per topic before slow subscribers lag.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Default maximum payload size (1 MiB, the usual broker default).
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

/// Longest topic name a broker accepts.
pub const MAX_TOPIC_NAME_LEN: usize = 249;
