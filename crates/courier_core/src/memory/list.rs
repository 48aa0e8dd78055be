//! # Flat Lists
//!
//! Same layout as [`FlatSeq`], built for records that grow across many
//! independent appends (the persisted statistics log). Every push re-confirms
//! arena capacity first, so a list is never appended to under the relocation
//! trap's pre-sizing assumptions.

use std::fmt;
use std::mem::size_of;

use bytemuck::Pod;

use super::{Arena, Counter, FlatIter, FlatSeq};

/// Length-prefixed list of `T` inside an [`Arena`], appended incrementally.
pub struct FlatList<T, C = u16> {
    seq: FlatSeq<T, C>,
}

impl<T: Pod, C: Counter> FlatList<T, C> {
    /// Size of the count header in bytes.
    pub const HEADER_SIZE: usize = FlatSeq::<T, C>::HEADER_SIZE;

    /// Writes an empty list header at the end of the arena.
    pub fn init(arena: &mut Arena) -> Self {
        Self {
            seq: FlatSeq::init(arena),
        }
    }

    /// Opens a list whose header sits at `offset`.
    ///
    /// Returns `None` unless the header fits and the list's elements end
    /// exactly at the end of the arena, which is what a well-formed list file
    /// looks like.
    #[must_use]
    pub fn open(arena: &Arena, offset: usize) -> Option<Self> {
        let raw = u32::try_from(offset).ok()?;
        let count = arena.try_get::<C>(offset)?.to_usize();
        let expected = offset + FlatSeq::<T, C>::space_for(count);
        (expected == arena.size()).then(|| Self {
            seq: FlatSeq::from_raw(raw),
        })
    }

    /// Header offset.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.seq.offset()
    }

    /// Number of elements.
    #[inline]
    #[must_use]
    pub fn len(&self, arena: &Arena) -> usize {
        self.seq.len(arena)
    }

    /// Returns true if the list has no elements.
    #[inline]
    #[must_use]
    pub fn is_empty(&self, arena: &Arena) -> bool {
        self.seq.is_empty(arena)
    }

    /// Appends one element, growing the arena if needed.
    ///
    /// # Panics
    ///
    /// Panics if the list is not the tail of the arena or its count would
    /// overflow.
    pub fn push_back(&self, value: &T, arena: &mut Arena) {
        arena.reserve_space(size_of::<T>());
        self.seq.push_back(value, arena);
    }

    /// Reads element `index`, bounds-checked.
    #[must_use]
    pub fn get(&self, arena: &Arena, index: usize) -> Option<T> {
        self.seq.get(arena, index)
    }

    /// Iterates over the elements by value.
    #[must_use]
    pub fn iter<'a>(&self, arena: &'a Arena) -> FlatIter<'a, T> {
        FlatIter::new(arena, self.seq.data_offset(), self.len(arena))
    }
}

impl<T, C> fmt::Debug for FlatList<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlatList").field("seq", &self.seq).finish()
    }
}
