//! # Message Relay Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Codec, handler and publisher throughput
//! └── src/integration/  # Producer → broker → consumer → sink
//!     ├── support.rs    # Hand-driven broker and sink doubles
//!     └── pipeline.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p relay-tests
//! cargo bench -p relay-tests
//! ```

pub mod integration;
