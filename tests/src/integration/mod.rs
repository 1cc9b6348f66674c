//! # Integration Tests
//!
//! Cross-crate flows through the real codec, validator, publisher, handler
//! and broker, with hand-driven doubles where a test needs to control
//! completion timing.

pub mod pipeline;
pub mod support;
