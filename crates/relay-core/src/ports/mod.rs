//! # Ports Layer
//!
//! Trait definitions for the hexagonal architecture.
//! - **Inbound (Driving)**: what the broker and upstream clients call
//! - **Outbound (Driven)**: the document store and publish observers

pub mod inbound;
pub mod outbound;
