//! # Client Error Types
//!
//! Everything that can end a session. None of these end the process.

use courier_protocol::{MessageKind, ProtocolError, TransportError};
use thiserror::Error;

use crate::config::ConfigError;
use crate::stats::StatsError;

/// Errors that end a session.
#[derive(Error, Debug)]
pub enum CourierError {
    /// The server sent a document the codec rejected.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A connection failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The statistics log could not be read or written.
    #[error(transparent)]
    Stats(#[from] StatsError),

    /// The configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The server refused an agent's credentials.
    #[error("authentication failed for agent {0}")]
    AuthenticationFailed(String),

    /// A message arrived that does not fit the session state.
    #[error("agent {agent}: expected {expected}, got {got}")]
    UnexpectedMessage {
        /// Agent name.
        agent: String,
        /// What the session was waiting for.
        expected: &'static str,
        /// The kind that arrived.
        got: &'static str,
    },

    /// The XML dump file failed.
    #[error("xml dump failed: {0}")]
    Dump(#[source] std::io::Error),
}

impl CourierError {
    pub(crate) fn unexpected(agent: &str, expected: &'static str, got: MessageKind) -> Self {
        Self::UnexpectedMessage {
            agent: agent.to_owned(),
            expected,
            got: got.as_str(),
        }
    }
}

/// Result type for client operations.
pub type CourierResult<T> = Result<T, CourierError>;
