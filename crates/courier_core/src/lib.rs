//! # COURIER Core
//!
//! The memory substrate of the agent client:
//! - [`Arena`]: one growable byte region with a debug relocation trap
//! - [`FlatSeq`] / [`FlatList`]: offset-addressed sequences inside an arena
//! - [`InternTable`]: stable one-byte ids for every string on the wire
//!
//! ## Architecture Rules
//!
//! 1. **Offsets, not pointers** - every record survives arena growth
//! 2. **Append only** - a sequence grows only while it is the arena tail
//! 3. **Plain bytes** - records are `Pod`, copied with `memcpy`
//!
//! ## Example
//!
//! ```rust
//! use courier_core::{Arena, FlatSeq};
//!
//! let mut arena = Arena::new();
//! let tools = FlatSeq::<u8>::init(&mut arena);
//! tools.push_back(&3, &mut arena);
//! tools.push_back(&4, &mut arena);
//! assert_eq!(tools.to_vec(&arena), vec![3, 4]);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::perf)]

pub mod intern;
pub mod memory;

pub use intern::{InternError, InternTable, INTERN_CAPACITY};
pub use memory::{Arena, Counter, FlatIter, FlatList, FlatSeq};
