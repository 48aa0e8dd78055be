//! # Transport Layer
//!
//! Blocking byte-stream transport with NUL-terminated framing.
//!
//! ## Design
//!
//! - One stream socket per agent, no internal threads
//! - Received bytes land directly in an [`Arena`]
//! - A failure closes the stream and is reported, never retried here

mod frame;
mod memory;

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::ops::AddAssign;

use courier_core::Arena;
use thiserror::Error;
use tracing::{debug, warn};

pub use frame::FrameReader;
pub use memory::MemoryTransport;

/// Bytes requested from the stream per read.
pub const RECEIVE_CHUNK: usize = 16 * 1024;

/// Errors raised by a transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The underlying stream failed.
    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),

    /// The peer closed the stream.
    #[error("connection closed by peer")]
    Closed,

    /// The transport was already closed.
    #[error("transport is not connected")]
    NotConnected,
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// A bidirectional byte stream to the simulation server.
pub trait Transport {
    /// Sends all of `bytes`.
    ///
    /// # Errors
    ///
    /// Any failure; the transport is closed afterwards.
    fn send(&mut self, bytes: &[u8]) -> TransportResult<()>;

    /// Appends at least one received byte to `into` and returns how many.
    ///
    /// Blocks until data is available.
    ///
    /// # Errors
    ///
    /// Any failure, including an orderly close by the peer; the transport is
    /// closed afterwards.
    fn receive(&mut self, into: &mut Arena) -> TransportResult<usize>;

    /// Traffic counters since the transport was opened.
    fn stats(&self) -> TransportStats;
}

/// Transport statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Send calls that succeeded.
    pub sends: u64,
    /// Receive calls that returned data.
    pub receives: u64,
    /// Bytes sent.
    pub bytes_sent: u64,
    /// Bytes received.
    pub bytes_received: u64,
}

impl AddAssign for TransportStats {
    fn add_assign(&mut self, other: Self) {
        self.sends += other.sends;
        self.receives += other.receives;
        self.bytes_sent += other.bytes_sent;
        self.bytes_received += other.bytes_received;
    }
}

/// [`Transport`] over any blocking `Read + Write` stream.
#[derive(Debug)]
pub struct StreamTransport<S> {
    /// The stream, `None` once closed.
    stream: Option<S>,
    /// Statistics.
    stats: TransportStats,
}

impl StreamTransport<TcpStream> {
    /// Connects to `host:port`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if the connection cannot be made.
    pub fn connect(host: &str, port: u16) -> TransportResult<Self> {
        let stream = TcpStream::connect((host, port))?;
        stream.set_nodelay(true)?;
        debug!(host, port, "connected");
        Ok(Self::new(stream))
    }
}

impl<S: Read + Write> StreamTransport<S> {
    /// Wraps an open stream.
    #[must_use]
    pub fn new(stream: S) -> Self {
        Self {
            stream: Some(stream),
            stats: TransportStats::default(),
        }
    }

    /// Returns true until the transport is closed.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Drops the stream.
    pub fn close(&mut self) {
        self.stream = None;
    }

    fn fail(&mut self, err: TransportError) -> TransportError {
        warn!(error = %err, "closing transport");
        self.close();
        err
    }
}

impl<S: Read + Write> Transport for StreamTransport<S> {
    fn send(&mut self, bytes: &[u8]) -> TransportResult<()> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        let sent = stream.write_all(bytes).and_then(|()| stream.flush());
        if let Err(err) = sent {
            return Err(self.fail(err.into()));
        }
        self.stats.sends += 1;
        self.stats.bytes_sent += bytes.len() as u64;
        Ok(())
    }

    fn receive(&mut self, into: &mut Arena) -> TransportResult<usize> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        let start = into.size();
        into.add_size(RECEIVE_CHUNK);
        let read = loop {
            match stream.read(&mut into.as_mut_slice()[start..]) {
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                other => break other,
            }
        };
        match read {
            Ok(0) => {
                into.resize(start);
                Err(self.fail(TransportError::Closed))
            }
            Ok(n) => {
                into.resize(start + n);
                self.stats.receives += 1;
                self.stats.bytes_received += n as u64;
                Ok(n)
            }
            Err(err) => {
                into.resize(start);
                Err(self.fail(err.into()))
            }
        }
    }

    fn stats(&self) -> TransportStats {
        self.stats
    }
}
