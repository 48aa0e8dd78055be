//! # Flat Sequences
//!
//! A `FlatSeq<T, C>` is a count header of type `C` followed immediately by
//! `count` tightly packed `T`s, stored inside an [`Arena`].
//!
//! ```text
//! offset ──► ┌─────────┬──────┬──────┬─────┬──────┐
//!            │ count:C │ T[0] │ T[1] │ ... │ T[n] │
//!            └─────────┴──────┴──────┴─────┴──────┘
//! ```
//!
//! The handle is only the header offset. Every access recomputes addresses
//! from the arena's current base, so a sequence survives the arena being
//! reallocated as long as it is read back through the same arena.

use std::fmt;
use std::marker::PhantomData;
use std::mem::size_of;

use bytemuck::Pod;

use super::Arena;

/// Unsigned integer used as a sequence count header.
pub trait Counter: Pod + Default {
    /// Largest count this header can store.
    const MAX: usize;

    /// Widens the stored count.
    fn to_usize(self) -> usize;

    /// Narrows a count. The caller guarantees `count <= Self::MAX`.
    fn from_usize(count: usize) -> Self;
}

macro_rules! impl_counter {
    ($($ty:ty),*) => {
        $(
            impl Counter for $ty {
                const MAX: usize = <$ty>::MAX as usize;

                #[inline]
                fn to_usize(self) -> usize {
                    self as usize
                }

                #[inline]
                #[allow(clippy::cast_possible_truncation)]
                fn from_usize(count: usize) -> Self {
                    debug_assert!(count <= <Self as Counter>::MAX);
                    count as $ty
                }
            }
        )*
    };
}

impl_counter!(u8, u16, u32);

/// Offset-addressed, append-only sequence of `T` inside an [`Arena`].
///
/// Elements are appended strictly in order and only while the sequence is
/// the tail of the arena. Reads take the arena by shared reference; there is
/// no owning pointer.
pub struct FlatSeq<T, C = u8> {
    offset: u32,
    _marker: PhantomData<fn() -> (T, C)>,
}

impl<T: Pod, C: Counter> FlatSeq<T, C> {
    /// Size of the count header in bytes.
    pub const HEADER_SIZE: usize = size_of::<C>();

    /// Exact bytes a sequence of `count` elements occupies.
    #[inline]
    #[must_use]
    pub const fn space_for(count: usize) -> usize {
        Self::HEADER_SIZE + count * size_of::<T>()
    }

    /// Re-creates a handle from a stored header offset.
    #[inline]
    #[must_use]
    pub const fn from_raw(offset: u32) -> Self {
        Self {
            offset,
            _marker: PhantomData,
        }
    }

    /// Header offset, as stored inside parent records.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.offset
    }

    /// Header offset.
    #[inline]
    #[must_use]
    pub const fn offset(self) -> usize {
        self.offset as usize
    }

    /// Offset of the first element.
    #[inline]
    #[must_use]
    pub const fn data_offset(self) -> usize {
        self.offset() + Self::HEADER_SIZE
    }

    /// Writes an empty header at the end of the arena.
    ///
    /// # Panics
    ///
    /// Panics if the arena has outgrown 32-bit offsets.
    pub fn init(arena: &mut Arena) -> Self {
        let offset = u32::try_from(arena.size()).unwrap_or_else(|_| {
            panic!("arena offset {} exceeds 32 bits", arena.size())
        });
        arena.emplace_back(&C::default());
        Self::from_raw(offset)
    }

    /// Number of elements.
    #[inline]
    #[must_use]
    pub fn len(self, arena: &Arena) -> usize {
        arena.get::<C>(self.offset()).to_usize()
    }

    /// Returns true if the sequence has no elements.
    #[inline]
    #[must_use]
    pub fn is_empty(self, arena: &Arena) -> bool {
        self.len(arena) == 0
    }

    /// Offset one past the last element.
    #[inline]
    #[must_use]
    pub fn end_offset(self, arena: &Arena) -> usize {
        self.data_offset() + self.len(arena) * size_of::<T>()
    }

    /// Appends one element.
    ///
    /// Inside a pre-sized fill pass this never grows the arena; outside one it
    /// may, which is fine because nothing holds addresses across the call.
    ///
    /// # Panics
    ///
    /// Panics if the sequence is not the tail of the arena, or if the count
    /// header would overflow.
    pub fn push_back(self, value: &T, arena: &mut Arena) {
        let len = self.len(arena);
        assert_eq!(
            self.end_offset(arena),
            arena.size(),
            "flat sequence at {} is not the arena tail",
            self.offset
        );
        assert!(len < C::MAX, "flat sequence count overflow at {len}");
        arena.emplace_back(value);
        arena.emplace(self.offset(), &C::from_usize(len + 1));
    }

    /// Reads element `index`, bounds-checked.
    #[must_use]
    pub fn get(self, arena: &Arena, index: usize) -> Option<T> {
        if index >= self.len(arena) {
            return None;
        }
        Some(arena.get(self.data_offset() + index * size_of::<T>()))
    }

    /// Overwrites element `index` in place.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn set(self, arena: &mut Arena, index: usize, value: &T) {
        let len = self.len(arena);
        assert!(index < len, "index {index} out of bounds for flat sequence of {len}");
        arena.emplace(self.data_offset() + index * size_of::<T>(), value);
    }

    /// Reads element `index`, lets `f` modify the copy, and writes it back.
    ///
    /// Used to patch child offsets into parents pushed earlier.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn update<F: FnOnce(&mut T)>(self, arena: &mut Arena, index: usize, f: F) {
        let len = self.len(arena);
        assert!(index < len, "index {index} out of bounds for flat sequence of {len}");
        let offset = self.data_offset() + index * size_of::<T>();
        let mut value = arena.get::<T>(offset);
        f(&mut value);
        arena.emplace(offset, &value);
    }

    /// Iterates over the elements by value.
    #[must_use]
    pub fn iter(self, arena: &Arena) -> FlatIter<'_, T> {
        FlatIter::new(arena, self.data_offset(), self.len(arena))
    }

    /// Raw element bytes.
    #[must_use]
    pub fn element_bytes(self, arena: &Arena) -> &[u8] {
        &arena.as_slice()[self.data_offset()..self.end_offset(arena)]
    }

    /// Collects the elements into a `Vec`. Convenience for tests and tools.
    #[must_use]
    pub fn to_vec(self, arena: &Arena) -> Vec<T> {
        self.iter(arena).collect()
    }
}

impl<T, C> Clone for FlatSeq<T, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, C> Copy for FlatSeq<T, C> {}

impl<T, C> PartialEq for FlatSeq<T, C> {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset
    }
}

impl<T, C> Eq for FlatSeq<T, C> {}

impl<T, C> fmt::Debug for FlatSeq<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlatSeq").field("offset", &self.offset).finish()
    }
}

/// By-value iterator over a [`FlatSeq`] or [`FlatList`](super::FlatList).
pub struct FlatIter<'a, T> {
    arena: &'a Arena,
    next: usize,
    remaining: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T> FlatIter<'a, T> {
    pub(super) fn new(arena: &'a Arena, first: usize, count: usize) -> Self {
        Self {
            arena,
            next: first,
            remaining: count,
            _marker: PhantomData,
        }
    }
}

impl<T: Pod> Iterator for FlatIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.remaining == 0 {
            return None;
        }
        let value = self.arena.get(self.next);
        self.next += size_of::<T>();
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T: Pod> ExactSizeIterator for FlatIter<'_, T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use bytemuck::{Pod, Zeroable};

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
    #[repr(C)]
    struct Pair {
        a: u16,
        b: u8,
        c: u8,
    }

    #[test]
    fn test_push_and_read_back_in_order() {
        let mut arena = Arena::new();
        let seq = FlatSeq::<Pair>::init(&mut arena);
        for i in 0..10u8 {
            seq.push_back(&Pair { a: u16::from(i) * 300, b: i, c: !i }, &mut arena);
        }
        assert_eq!(seq.len(&arena), 10);
        let values = seq.to_vec(&arena);
        for (i, pair) in values.iter().enumerate() {
            let i = u8::try_from(i).unwrap();
            assert_eq!(*pair, Pair { a: u16::from(i) * 300, b: i, c: !i });
        }
    }

    #[test]
    fn test_layout_is_header_then_elements() {
        let mut arena = Arena::new();
        arena.append(&[0xFF; 3]);
        let seq = FlatSeq::<u16, u16>::init(&mut arena);
        seq.push_back(&0x0201, &mut arena);
        seq.push_back(&0x0403, &mut arena);
        assert_eq!(seq.offset(), 3);
        assert_eq!(&arena.as_slice()[3..], &[2, 0, 1, 2, 3, 4]);
        assert_eq!(arena.size() - seq.offset(), FlatSeq::<u16, u16>::space_for(2));
    }

    #[test]
    fn test_empty_sequence() {
        let mut arena = Arena::new();
        let seq = FlatSeq::<u32>::init(&mut arena);
        assert!(seq.is_empty(&arena));
        assert_eq!(seq.get(&arena, 0), None);
        assert_eq!(seq.iter(&arena).count(), 0);
        assert_eq!(arena.size(), 1);
    }

    #[test]
    fn test_bounds_checked_get() {
        let mut arena = Arena::new();
        let seq = FlatSeq::<u8>::init(&mut arena);
        seq.push_back(&5, &mut arena);
        assert_eq!(seq.get(&arena, 0), Some(5));
        assert_eq!(seq.get(&arena, 1), None);
    }

    #[test]
    fn test_survives_reallocation() {
        let mut arena = Arena::with_capacity(2);
        let seq = FlatSeq::<u32>::init(&mut arena);
        for i in 0..100 {
            seq.push_back(&i, &mut arena);
        }
        let handle = FlatSeq::<u32>::from_raw(seq.raw());
        assert_eq!(handle.iter(&arena).sum::<u32>(), (0..100).sum());
    }

    #[test]
    fn test_set_overwrites_element() {
        let mut arena = Arena::new();
        let seq = FlatSeq::<u16>::init(&mut arena);
        seq.push_back(&1, &mut arena);
        seq.push_back(&2, &mut arena);
        seq.set(&mut arena, 0, &9);
        assert_eq!(seq.to_vec(&arena), vec![9, 2]);
    }

    #[test]
    fn test_update_patches_after_siblings() {
        let mut arena = Arena::new();
        let parents = FlatSeq::<Pair>::init(&mut arena);
        parents.push_back(&Pair::default(), &mut arena);
        parents.push_back(&Pair::default(), &mut arena);
        let child = FlatSeq::<u8>::init(&mut arena);
        child.push_back(&1, &mut arena);

        let at = u16::try_from(child.offset()).unwrap();
        parents.update(&mut arena, 1, |pair| pair.a = at);
        assert_eq!(parents.get(&arena, 1).unwrap().a, at);
        assert_eq!(parents.get(&arena, 0).unwrap().a, 0);
        assert_eq!(child.to_vec(&arena), vec![1]);
    }

    #[test]
    #[should_panic(expected = "is not the arena tail")]
    fn test_push_after_sibling_panics() {
        let mut arena = Arena::new();
        let first = FlatSeq::<u8>::init(&mut arena);
        let _second = FlatSeq::<u8>::init(&mut arena);
        first.push_back(&1, &mut arena);
    }

    #[test]
    fn test_counter_widths() {
        assert_eq!(<u8 as Counter>::MAX, 255);
        assert_eq!(<u16 as Counter>::MAX, 65_535);
        assert_eq!(<u8 as Counter>::from_usize(255), 255u8);
        assert_eq!(<u16 as Counter>::from_usize(300).to_usize(), 300);
        assert_eq!(<u32 as Counter>::from_usize(70_000), 70_000u32);
    }

    #[test]
    #[should_panic(expected = "count overflow")]
    fn test_counter_overflow_panics() {
        let mut arena = Arena::new();
        let seq = FlatSeq::<u8, u8>::init(&mut arena);
        for _ in 0..256 {
            seq.push_back(&0u8, &mut arena);
        }
    }

    #[test]
    fn test_iterator_is_exact_size() {
        let mut arena = Arena::new();
        let seq = FlatSeq::<u8>::init(&mut arena);
        seq.push_back(&1, &mut arena);
        seq.push_back(&2, &mut arena);
        assert_eq!(seq.iter(&arena).len(), 2);
        assert_eq!(seq.element_bytes(&arena), &[1, 2]);
    }
}
