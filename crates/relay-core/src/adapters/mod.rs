//! # Adapters Module
//!
//! Infrastructure implementing the ports: document store sinks and the
//! broker subscription listener.

pub mod json_sink;
pub mod listener;
pub mod memory_sink;
