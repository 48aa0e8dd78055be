//! # COURIER Protocol
//!
//! Maps the simulation server's tree documents onto packed records inside an
//! [`Arena`](courier_core::Arena), and actions back onto documents.
//!
//! ## Message Flow
//!
//! ```text
//! socket ─► FrameReader ─► decode_message ─► Perception (arena) ─► planner
//!                            (two passes)                            │
//! socket ◄─ NUL frame ◄─── write_document ◄── action_document ◄──────┘
//! ```
//!
//! ## Design Principles
//!
//! 1. **Measure, then fill** - every inbound record is sized exactly before
//!    a single byte of it is written
//! 2. **One-byte names** - every string on the wire becomes an interned id
//! 3. **Grid positions** - coordinates are 8-bit cells of a frozen bounding box

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::perf)]

pub mod protocol;
pub mod transport;

pub use protocol::{
    action_document, action_param, auth_request_document, decode_message, render_attributes,
    required_space, write_document, Action, ActionKind, ActionResult, AuctionJob, AuthResponse,
    BoundingBox, ChargingStation, Decoded, Element, Entity, Facility, GridMapper, ItemStack,
    JobItem, MessageHeader, MessageKind, Perception, Pos, PricedJob, Product, ProtocolContext,
    ProtocolError, ProtocolResult, Role, SelfStatus, SimEnd, Simulation, Team, GRID_PADDING,
};
pub use transport::{
    FrameReader, MemoryTransport, StreamTransport, Transport, TransportError, TransportResult,
    TransportStats, RECEIVE_CHUNK,
};
