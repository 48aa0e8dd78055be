//! # Memory Management
//!
//! The arena and the offset-addressed containers built on top of it.
//!
//! ## Design Philosophy
//!
//! Records are plain bytes in one reusable region:
//! - No per-message heap allocations once the arena has warmed up
//! - No pointers, only offsets that survive reallocation
//! - Whole records copy with a single `memcpy`

mod arena;
mod flat;
mod list;

pub use arena::Arena;
pub use flat::{Counter, FlatIter, FlatSeq};
pub use list::FlatList;
