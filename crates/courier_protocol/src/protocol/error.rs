//! # Protocol Error Types
//!
//! Everything that can be wrong with a document. None of these are retried:
//! the session that produced the document is abandoned.

use courier_core::InternError;
use thiserror::Error;

/// Errors raised while decoding or encoding protocol documents.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// The frame is not valid UTF-8.
    #[error("document is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// The frame is not a well-formed document.
    #[error("malformed document: {0}")]
    Xml(String),

    /// A required element is absent.
    #[error("missing element <{0}>")]
    MissingElement(&'static str),

    /// A required attribute is absent.
    #[error("missing attribute {attribute:?} on <{element}>")]
    MissingAttribute {
        /// Element that should carry the attribute.
        element: String,
        /// The attribute name.
        attribute: &'static str,
    },

    /// An attribute is not a number.
    #[error("attribute {attribute:?} is not a number: {value:?}")]
    InvalidNumber {
        /// The attribute name.
        attribute: &'static str,
        /// The offending text.
        value: String,
    },

    /// A number does not fit its record field.
    #[error("attribute {attribute:?} out of range: {value}")]
    OutOfRange {
        /// The attribute name.
        attribute: &'static str,
        /// The parsed value.
        value: i64,
    },

    /// The `type` of a `<message>` is not one we know.
    #[error("unknown message type {0:?}")]
    UnknownMessageType(String),

    /// An action name is not one we know.
    #[error("unknown action {0:?}")]
    UnknownAction(String),

    /// An action result name is not one we know.
    #[error("unknown action result {0:?}")]
    UnknownActionResult(String),

    /// A flag attribute is neither of its two accepted values.
    #[error("attribute {attribute:?} has invalid flag value {value:?}")]
    InvalidFlag {
        /// The attribute name.
        attribute: &'static str,
        /// The offending text.
        value: String,
    },

    /// More children than the record's count header can hold.
    #[error("<{element}> has {count} entries, at most {max} fit")]
    TooManyElements {
        /// Tag name of the repeated child.
        element: &'static str,
        /// Children present.
        count: usize,
        /// Counter capacity.
        max: usize,
    },

    /// The intern table overflowed.
    #[error(transparent)]
    Intern(#[from] InternError),

    /// An interned id has no string behind it.
    #[error("no string registered for id {0}")]
    UnknownId(u8),

    /// Rendering a document failed.
    #[error("failed to write document: {0}")]
    Write(String),

    /// A position was converted before any perception fixed the map bounds.
    #[error("grid bounds are not initialised yet")]
    GridUninitialized,
}

impl From<roxmltree::Error> for ProtocolError {
    fn from(err: roxmltree::Error) -> Self {
        Self::Xml(err.to_string())
    }
}

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
