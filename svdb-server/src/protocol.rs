//! # Request Framing
//!
//! Cut the bytes read from a connection into request frames without copying
//! the payloads out of the read buffer.

use bytes::{Bytes, BytesMut};

use svdb_common::{split_frame, Terminator};

/// One request line taken off the read buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Line payload without its terminator.
    pub payload: Bytes,
    /// Terminator the peer used, `None` for overlong or trailing data.
    pub terminator: Option<Terminator>,
}

impl Frame {
    /// Terminator to close the reply with.
    pub fn reply_terminator(&self) -> Terminator {
        self.terminator.unwrap_or_default()
    }
}

/// Removes the next complete frame from `buffer`, if any.
pub fn next_frame(buffer: &mut BytesMut) -> Option<Frame> {
    let split = split_frame(buffer)?;
    let mut line = buffer.split_to(split.consumed);
    line.truncate(split.payload);
    Some(Frame {
        payload: line.freeze(),
        terminator: split.terminator,
    })
}

/// Drains whatever is left after the peer stopped sending.
///
/// Returns `None` when nothing but an empty buffer remains.
pub fn take_remainder(buffer: &mut BytesMut) -> Option<Frame> {
    if buffer.is_empty() {
        return None;
    }
    Some(Frame {
        payload: buffer.split().freeze(),
        terminator: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use svdb_common::MAX_LINE;

    #[test]
    fn yields_frames_in_order() {
        let mut buffer = BytesMut::from(&b"read\0write 4\nre"[..]);

        let first = next_frame(&mut buffer).unwrap();
        assert_eq!(&first.payload[..], b"read");
        assert_eq!(first.terminator, Some(Terminator::Nul));

        let second = next_frame(&mut buffer).unwrap();
        assert_eq!(&second.payload[..], b"write 4");
        assert_eq!(second.reply_terminator(), Terminator::Newline);

        assert!(next_frame(&mut buffer).is_none());
        assert_eq!(&buffer[..], b"re");
    }

    #[test]
    fn completes_frame_split_across_reads() {
        let mut buffer = BytesMut::from(&b"wri"[..]);
        assert!(next_frame(&mut buffer).is_none());

        buffer.extend_from_slice(b"te 9\0");
        let frame = next_frame(&mut buffer).unwrap();
        assert_eq!(&frame.payload[..], b"write 9");
        assert!(buffer.is_empty());
    }

    #[test]
    fn chops_overlong_input() {
        let mut buffer = BytesMut::from(&vec![b'x'; MAX_LINE + 3][..]);
        let frame = next_frame(&mut buffer).unwrap();
        assert_eq!(frame.payload.len(), MAX_LINE);
        assert_eq!(frame.reply_terminator(), Terminator::Nul);
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn remainder_drains_buffer() {
        let mut buffer = BytesMut::from(&b"read"[..]);
        let frame = take_remainder(&mut buffer).unwrap();
        assert_eq!(&frame.payload[..], b"read");
        assert!(take_remainder(&mut buffer).is_none());
    }
}
