//! # Domain Layer
//!
//! Records, the wire format and validation. No I/O.

pub mod codec;
pub mod errors;
pub mod record;
pub mod upstream;
pub mod validator;
