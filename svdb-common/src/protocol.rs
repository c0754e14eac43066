//! # Line Protocol
//!
//! Purpose: Define the ASCII request/reply lines spoken between the server
//! and its clients, and the framing rule both sides use to cut a byte stream
//! into lines.
//!
//! ## Wire Format
//!
//! ```text
//! client -> server   "read"            return the current value
//! client -> server   "write <integer>" store <integer>, return it
//! server -> client   "<integer>"       value after applying the request
//! ```
//!
//! Every line ends with a single terminator byte, either NUL or `\n`
//! (a `\r` right before `\n` is dropped). The client sends NUL, the server
//! answers with whatever terminator the request used.
//!
//! ## Framing
//!
//! A frame carries at most `MAX_LINE` payload bytes. When more than that
//! arrives without a terminator, the first `MAX_LINE` bytes are delivered as
//! an unterminated frame so a peer can never make the reader buffer grow
//! without bound.

use std::fmt;

use crate::error::{ProtocolError, ProtocolResult};

/// Port used by both binaries when none is given.
pub const DEFAULT_PORT: u16 = 1234;

/// Maximum payload bytes in one frame.
pub const MAX_LINE: usize = 255;

/// The integer held by the database.
pub type Value = i64;

/// Byte that closes a frame on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Terminator {
    /// `\0`, as written by the client.
    #[default]
    Nul,
    /// `\n`, as written by line-oriented tools.
    Newline,
}

impl Terminator {
    /// Returns the on-wire bytes for this terminator.
    pub const fn as_bytes(self) -> &'static [u8] {
        match self {
            Terminator::Nul => b"\0",
            Terminator::Newline => b"\n",
        }
    }
}

/// Position of the first frame found in a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSplit {
    /// Number of payload bytes at the start of the buffer.
    pub payload: usize,
    /// Number of bytes to drop from the buffer, terminator included.
    pub consumed: usize,
    /// Terminator that closed the frame, `None` for an overlong chunk.
    pub terminator: Option<Terminator>,
}

/// Locates the first complete frame in `buf`.
///
/// Returns `None` when more bytes are needed.
pub fn split_frame(buf: &[u8]) -> Option<FrameSplit> {
    let window = &buf[..buf.len().min(MAX_LINE + 1)];
    if let Some(pos) = window.iter().position(|&b| b == 0 || b == b'\n') {
        let terminator = if window[pos] == 0 {
            Terminator::Nul
        } else {
            Terminator::Newline
        };
        let mut payload = pos;
        if terminator == Terminator::Newline && payload > 0 && buf[payload - 1] == b'\r' {
            payload -= 1;
        }
        return Some(FrameSplit {
            payload,
            consumed: pos + 1,
            terminator: Some(terminator),
        });
    }

    if buf.len() > MAX_LINE {
        return Some(FrameSplit {
            payload: MAX_LINE,
            consumed: MAX_LINE,
            terminator: None,
        });
    }
    None
}

/// A parsed client request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Return the current value unchanged.
    Read,
    /// Replace the value and return it.
    Write(Value),
}

impl Request {
    /// Parses one request line.
    ///
    /// `read` must match exactly. `write` must be followed by whitespace and
    /// a decimal integer; text after the integer is ignored. Anything else
    /// returns `None`.
    pub fn parse(line: &str) -> Option<Self> {
        if line == "read" {
            return Some(Request::Read);
        }

        let rest = line.strip_prefix("write")?;
        if !rest.starts_with(|c: char| c.is_ascii_whitespace()) {
            return None;
        }
        leading_integer(rest.trim_start()).map(Request::Write)
    }

    /// Appends the request line plus `terminator` to `out`.
    pub fn encode(&self, terminator: Terminator, out: &mut Vec<u8>) {
        match self {
            Request::Read => out.extend_from_slice(b"read"),
            Request::Write(value) => {
                out.extend_from_slice(b"write ");
                out.extend_from_slice(value.to_string().as_bytes());
            }
        }
        out.extend_from_slice(terminator.as_bytes());
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Read => write!(f, "read"),
            Request::Write(value) => write!(f, "write {}", value),
        }
    }
}

/// Parses the signed decimal run at the start of `text`.
///
/// Whatever follows the digits is ignored. Returns `None` without digits
/// or when the number does not fit in `Value`.
pub fn leading_integer(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits_start {
        return None;
    }
    text[..end].parse().ok()
}

/// Appends a reply line for `value` plus `terminator` to `out`.
pub fn encode_reply(value: Value, terminator: Terminator, out: &mut Vec<u8>) {
    out.extend_from_slice(value.to_string().as_bytes());
    out.extend_from_slice(terminator.as_bytes());
}

/// Parses the payload of a reply line.
pub fn parse_reply(line: &str) -> ProtocolResult<Value> {
    line.trim()
        .parse::<Value>()
        .map_err(|_| ProtocolError::InvalidReply(line.to_string()))
}

/// Interprets a frame payload as text.
pub fn frame_text(payload: &[u8]) -> ProtocolResult<&str> {
    std::str::from_utf8(payload).map_err(|_| ProtocolError::NotText)
}
