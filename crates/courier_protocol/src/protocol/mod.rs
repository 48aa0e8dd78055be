//! # Simulation Protocol
//!
//! Inbound documents become packed records; actions become documents.
//!
//! ## Inbound Record Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ MessageHeader (16 bytes): timestamp (8) │ kind (1) │ pad (7) │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Body record (AuthResponse / Simulation / Perception / SimEnd) │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Nested FlatSeqs, in document order                           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Philosophy
//!
//! - One reservation per message, proven by the relocation trap
//! - Strings never stored: every name is a one-byte intern id
//! - Every document error aborts the session, never the process

mod action;
mod context;
mod decode;
mod document;
mod encode;
mod error;
mod grid;
mod records;

pub use action::{Action, ActionKind, ActionResult};
pub use context::ProtocolContext;
pub use decode::{decode_message, required_space, Decoded};
pub use document::{render_attributes, write_document, Element};
pub use encode::{action_document, action_param, auth_request_document};
pub use error::{ProtocolError, ProtocolResult};
pub use grid::{BoundingBox, GridMapper, GRID_PADDING};
pub use records::{
    AuctionJob, AuthResponse, ChargingStation, Entity, Facility, ItemStack, JobItem,
    MessageHeader, MessageKind, Perception, Pos, PricedJob, Product, Role, SelfStatus, SimEnd,
    Simulation, Team,
};
