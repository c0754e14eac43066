//! # Error Types
//!
//! Errors raised while interpreting protocol lines.

use thiserror::Error;

/// Result alias for protocol helpers.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors produced when a line cannot be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The frame was not valid ASCII/UTF-8 text.
    #[error("frame is not valid text")]
    NotText,
    /// A reply line did not hold a decimal integer.
    #[error("invalid reply `{0}`")]
    InvalidReply(String),
}
