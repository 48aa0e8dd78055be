//! # Intern Table
//!
//! Maps every distinct byte string seen on the wire (names, ids) to a stable
//! one-byte handle, with reverse lookup.
//!
//! ## Layout
//!
//! ```text
//! strings : Arena            raw bytes of every key, back to back
//! spans   : [Span; <=256]    id -> (offset, len) into `strings`
//! slots   : [u16; 512]       open addressing, id or EMPTY
//! ```
//!
//! Id 0 is the empty string and is registered first. Ids are handed out in
//! first-seen order and never change for the lifetime of the table.

use std::hash::Hasher;

use siphasher::sip::SipHasher13;
use thiserror::Error;

use crate::memory::Arena;

/// Maximum number of distinct strings, including the empty string.
pub const INTERN_CAPACITY: usize = 256;

/// Hash slots; twice the capacity keeps probe chains short.
const SLOT_COUNT: usize = INTERN_CAPACITY * 2;

/// Marker for an unused hash slot.
const EMPTY: u16 = u16::MAX;

/// Fixed keys: ids must be reproducible across runs, not DoS resistant.
const HASH_KEYS: (u64, u64) = (0x6a63_dc44_6a63_dc44, 0x0c0f_fee0_c0ff_ee00);

/// Errors raised by the intern table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InternError {
    /// Every one of the 256 ids is taken.
    #[error("intern table full: {capacity} ids in use, cannot add {key:?}")]
    TableFull {
        /// Table capacity.
        capacity: usize,
        /// The key that did not fit (lossy UTF-8).
        key: String,
    },
}

/// Location of one interned string inside the table's arena.
#[derive(Clone, Copy, Debug)]
struct Span {
    offset: u32,
    len: u32,
}

/// Byte string <-> `u8` id table.
///
/// # Example
///
/// ```rust
/// use courier_core::InternTable;
///
/// let mut table = InternTable::new();
/// let id = table.get_id(b"shop1").unwrap();
/// assert_eq!(table.get_id(b"shop1").unwrap(), id);
/// assert_eq!(table.get_value(id), Some(&b"shop1"[..]));
/// assert_eq!(table.get_id_readonly(b""), Some(0));
/// ```
#[derive(Debug)]
pub struct InternTable {
    strings: Arena,
    spans: Vec<Span>,
    slots: Box<[u16]>,
}

impl InternTable {
    /// Creates a table with the empty string registered as id 0.
    #[must_use]
    pub fn new() -> Self {
        let mut table = Self {
            strings: Arena::with_capacity(2048),
            spans: Vec::with_capacity(INTERN_CAPACITY),
            slots: vec![EMPTY; SLOT_COUNT].into_boxed_slice(),
        };
        table.seed();
        table
    }

    /// Number of registered strings, the empty string included.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Always false: the empty string is registered at construction.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Returns the id for `key`, registering it if it is new.
    ///
    /// # Errors
    ///
    /// Returns [`InternError::TableFull`] when a new key arrives and all 256
    /// ids are already taken.
    pub fn get_id(&mut self, key: &[u8]) -> Result<u8, InternError> {
        let mut slot = Self::home_slot(key);
        loop {
            match self.slots[slot] {
                EMPTY => break,
                id if self.value_of(id) == key => return Ok(Self::narrow(id)),
                _ => slot = (slot + 1) % SLOT_COUNT,
            }
        }

        if self.spans.len() == INTERN_CAPACITY {
            return Err(InternError::TableFull {
                capacity: INTERN_CAPACITY,
                key: String::from_utf8_lossy(key).into_owned(),
            });
        }

        let id = u16::try_from(self.spans.len()).unwrap_or(EMPTY);
        let offset = u32::try_from(self.strings.size()).unwrap_or(u32::MAX);
        let len = u32::try_from(key.len()).unwrap_or(u32::MAX);
        self.strings.append(key);
        self.spans.push(Span { offset, len });
        self.slots[slot] = id;
        Ok(Self::narrow(id))
    }

    /// Looks up `key` without registering it.
    #[must_use]
    pub fn get_id_readonly(&self, key: &[u8]) -> Option<u8> {
        let mut slot = Self::home_slot(key);
        loop {
            match self.slots[slot] {
                EMPTY => return None,
                id if self.value_of(id) == key => return Some(Self::narrow(id)),
                _ => slot = (slot + 1) % SLOT_COUNT,
            }
        }
    }

    /// Reverse lookup: the bytes registered under `id`.
    #[must_use]
    pub fn get_value(&self, id: u8) -> Option<&[u8]> {
        self.spans
            .get(usize::from(id))
            .map(|span| self.span_bytes(*span))
    }

    /// Reverse lookup as text. `None` for unknown ids or non-UTF-8 keys.
    #[must_use]
    pub fn get_str(&self, id: u8) -> Option<&str> {
        self.get_value(id)
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
    }

    /// Releases the string storage and forgets every id except the empty
    /// string, which is re-registered as id 0.
    pub fn free(&mut self) {
        self.strings.free();
        self.spans.clear();
        self.slots.fill(EMPTY);
        self.seed();
    }

    fn seed(&mut self) {
        let id = self.get_id(b"");
        debug_assert_eq!(id, Ok(0), "empty string must be id 0");
    }

    fn home_slot(key: &[u8]) -> usize {
        let mut hasher = SipHasher13::new_with_keys(HASH_KEYS.0, HASH_KEYS.1);
        hasher.write(key);
        // SLOT_COUNT is a power of two; the low bits are enough.
        (hasher.finish() as usize) & (SLOT_COUNT - 1)
    }

    fn value_of(&self, id: u16) -> &[u8] {
        self.span_bytes(self.spans[usize::from(id)])
    }

    fn span_bytes(&self, span: Span) -> &[u8] {
        let start = span.offset as usize;
        &self.strings.as_slice()[start..start + span.len as usize]
    }

    #[allow(clippy::cast_possible_truncation)]
    const fn narrow(id: u16) -> u8 {
        id as u8
    }
}

impl Default for InternTable {
    fn default() -> Self {
        Self::new()
    }
}
