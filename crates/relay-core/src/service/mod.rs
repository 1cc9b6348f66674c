//! # Service Layer
//!
//! Wires the domain to the ports: publishing, stream forwarding and
//! message handling.

pub mod forwarder;
pub mod handler;
pub mod publisher;
