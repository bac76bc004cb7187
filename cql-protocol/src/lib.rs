//! Frame codec for the CQL native protocol.
//!
//! The crate turns logical requests into exact wire frames for a negotiated protocol version and
//! parses response frames back into typed bodies. It performs no I/O: every operation works on
//! caller-provided buffers. Fields which the negotiated version cannot express are rejected with
//! [`Error::UnsupportedFeature`] before any byte is produced.

pub mod consistency;
pub mod error;
pub mod frame;
pub mod query;
pub mod token;
pub mod types;

pub type Error = error::Error;
pub type Result<T> = error::Result<T>;
