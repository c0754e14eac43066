//! # Reply Framing
//!
//! Read one NUL- or newline-terminated reply from a buffered reader,
//! tolerating replies split across several TCP segments.

use std::io::{BufRead, ErrorKind};

use svdb_common::MAX_LINE;

use crate::client::{ClientError, ClientResult};

/// Reads one frame payload into `buf`.
///
/// Stops at the first terminator, after `MAX_LINE` unterminated bytes, or at
/// EOF following some payload. EOF before any byte is `ClientError::Closed`.
pub fn read_frame<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> ClientResult<()> {
    buf.clear();
    loop {
        let available = match reader.fill_buf() {
            Ok(available) => available,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if available.is_empty() {
            if buf.is_empty() {
                return Err(ClientError::Closed);
            }
            return Ok(());
        }

        let room = MAX_LINE - buf.len();
        let window = &available[..available.len().min(room + 1)];
        match window.iter().position(|&b| b == 0 || b == b'\n') {
            Some(pos) => {
                let newline = window[pos] == b'\n';
                buf.extend_from_slice(&window[..pos]);
                reader.consume(pos + 1);
                if newline && buf.last() == Some(&b'\r') {
                    buf.pop();
                }
                return Ok(());
            }
            None if window.len() > room => {
                buf.extend_from_slice(&window[..room]);
                reader.consume(room);
                return Ok(());
            }
            None => {
                let taken = window.len();
                buf.extend_from_slice(window);
                reader.consume(taken);
            }
        }
    }
}
