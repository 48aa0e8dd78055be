//! # In-Memory Transport
//!
//! Replays scripted inbound chunks and records everything sent. Used to
//! replay dumped sessions and to drive sessions in tests.

use std::collections::VecDeque;

use courier_core::Arena;

use super::{Transport, TransportError, TransportResult, TransportStats};

/// Scripted [`Transport`].
#[derive(Debug, Default)]
pub struct MemoryTransport {
    /// Chunks handed out by `receive`, one per call.
    inbound: VecDeque<Vec<u8>>,
    /// Every `send`, in order.
    sent: Vec<Vec<u8>>,
    /// Set once the script ran dry.
    closed: bool,
    stats: TransportStats,
}

impl MemoryTransport {
    /// Creates an empty transport. The first `receive` reports a close.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one chunk for `receive`.
    pub fn push_inbound(&mut self, chunk: &[u8]) {
        self.inbound.push_back(chunk.to_vec());
    }

    /// Queues a document followed by its NUL terminator.
    pub fn push_frame(&mut self, document: &str) {
        let mut chunk = Vec::with_capacity(document.len() + 1);
        chunk.extend_from_slice(document.as_bytes());
        chunk.push(0);
        self.inbound.push_back(chunk);
    }

    /// Everything sent so far.
    #[must_use]
    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }

    /// Sent payloads as text, terminators stripped.
    #[must_use]
    pub fn sent_documents(&self) -> Vec<String> {
        self.sent
            .iter()
            .map(|bytes| {
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                String::from_utf8_lossy(&bytes[..end]).into_owned()
            })
            .collect()
    }

    /// Returns true once a receive found the script empty.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Transport for MemoryTransport {
    fn send(&mut self, bytes: &[u8]) -> TransportResult<()> {
        if self.closed {
            return Err(TransportError::NotConnected);
        }
        self.sent.push(bytes.to_vec());
        self.stats.sends += 1;
        self.stats.bytes_sent += bytes.len() as u64;
        Ok(())
    }

    fn receive(&mut self, into: &mut Arena) -> TransportResult<usize> {
        if self.closed {
            return Err(TransportError::NotConnected);
        }
        match self.inbound.pop_front() {
            Some(chunk) => {
                into.append(&chunk);
                self.stats.receives += 1;
                self.stats.bytes_received += chunk.len() as u64;
                Ok(chunk.len())
            }
            None => {
                self.closed = true;
                Err(TransportError::Closed)
            }
        }
    }

    fn stats(&self) -> TransportStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_then_close() {
        let mut transport = MemoryTransport::new();
        transport.push_frame("<bye/>");
        let mut arena = Arena::new();
        assert_eq!(transport.receive(&mut arena).unwrap(), 7);
        assert_eq!(arena.as_slice(), b"<bye/>\0");
        assert!(matches!(transport.receive(&mut arena), Err(TransportError::Closed)));
        assert!(transport.is_closed());
        assert_eq!(transport.stats().receives, 1);
        assert_eq!(transport.stats().bytes_received, 7);
        assert!(matches!(transport.send(b"late"), Err(TransportError::NotConnected)));
    }

    #[test]
    fn test_records_sends() {
        let mut transport = MemoryTransport::new();
        transport.send(b"<a/>\0").unwrap();
        transport.send(b"<b/>\0").unwrap();
        assert_eq!(transport.sent().len(), 2);
        assert_eq!(transport.sent_documents(), vec!["<a/>".to_owned(), "<b/>".to_owned()]);
        assert_eq!(transport.stats().sends, 2);
        assert_eq!(transport.stats().bytes_sent, 10);
    }
}
