// svdb-common - Shared types and wire protocol for the single-value database
//
// This crate defines the ASCII request/reply lines exchanged between
// svdb-server and svdb-client.

pub mod error;
pub mod protocol;

// Re-export for convenience
pub use error::*;
pub use protocol::*;
