//! # NUL Framing
//!
//! Every document on the wire is followed by one NUL byte. A read may return
//! half a document, or the end of one and the start of the next; bytes past
//! a terminator are kept for the following frame.

use std::ops::Range;

use courier_core::Arena;

use super::{Transport, TransportResult};

/// Splits a byte stream into NUL-terminated frames.
#[derive(Debug, Default)]
pub struct FrameReader {
    /// Bytes received after the last returned frame's terminator.
    pending: Vec<u8>,
}

impl FrameReader {
    /// Creates a reader with nothing buffered.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Bytes buffered for the next frame.
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Reads the next frame into `into` and returns its byte range there,
    /// terminator excluded.
    ///
    /// The arena ends with the frame afterwards; anything received beyond
    /// the terminator is held back.
    ///
    /// # Errors
    ///
    /// Propagates the transport's error. Bytes of the incomplete frame are
    /// left in the arena.
    pub fn read_frame<T>(&mut self, transport: &mut T, into: &mut Arena) -> TransportResult<Range<usize>>
    where
        T: Transport + ?Sized,
    {
        let start = into.size();
        into.append(&self.pending);
        self.pending.clear();

        let mut scanned = start;
        loop {
            let received = &into.as_slice()[scanned..];
            if let Some(at) = received.iter().position(|&b| b == 0) {
                let end = scanned + at;
                self.pending.extend_from_slice(&into.as_slice()[end + 1..]);
                into.resize(end);
                return Ok(start..end);
            }
            scanned = into.size();
            transport.receive(into)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;

    #[test]
    fn test_frame_split_across_reads() {
        let mut transport = MemoryTransport::new();
        transport.push_inbound(b"<mess");
        transport.push_inbound(b"age/>");
        transport.push_inbound(b"\0");

        let mut reader = FrameReader::new();
        let mut arena = Arena::new();
        let range = reader.read_frame(&mut transport, &mut arena).unwrap();
        assert_eq!(&arena.as_slice()[range], b"<message/>");
        assert_eq!(arena.size(), 10);
        assert!(reader.pending().is_empty());
    }

    #[test]
    fn test_two_frames_in_one_read() {
        let mut transport = MemoryTransport::new();
        transport.push_inbound(b"<a/>\0<b/>\0<c");
        transport.push_inbound(b"/>\0");

        let mut reader = FrameReader::new();
        let mut arena = Arena::new();
        let first = reader.read_frame(&mut transport, &mut arena).unwrap();
        assert_eq!(&arena.as_slice()[first], b"<a/>");
        assert_eq!(reader.pending(), b"<b/>\0<c");

        arena.reset();
        let second = reader.read_frame(&mut transport, &mut arena).unwrap();
        assert_eq!(&arena.as_slice()[second], b"<b/>");

        arena.reset();
        let third = reader.read_frame(&mut transport, &mut arena).unwrap();
        assert_eq!(&arena.as_slice()[third], b"<c/>");
        assert!(reader.pending().is_empty());
    }

    #[test]
    fn test_frame_appends_after_existing_bytes() {
        let mut transport = MemoryTransport::new();
        transport.push_inbound(b"<x/>\0");
        let mut reader = FrameReader::new();
        let mut arena = Arena::new();
        arena.append(b"header");
        let range = reader.read_frame(&mut transport, &mut arena).unwrap();
        assert_eq!(range, 6..10);
    }

    #[test]
    fn test_closed_transport_mid_frame() {
        let mut transport = MemoryTransport::new();
        transport.push_inbound(b"<partial");
        let mut reader = FrameReader::new();
        let mut arena = Arena::new();
        assert!(reader.read_frame(&mut transport, &mut arena).is_err());
    }
}
