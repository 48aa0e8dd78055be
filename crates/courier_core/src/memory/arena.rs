//! # Arena
//!
//! A single growable, contiguous byte region with an explicit used-size.
//!
//! Everything decoded from the wire lives in an arena. Callers hold byte
//! offsets, never references, so the region may be reallocated freely between
//! records. While a record is being filled the arena can be *trapped*: any
//! operation that would grow the region then panics (debug builds only).

use std::io;

use bytemuck::{bytes_of, Pod};

/// A growable byte arena addressed by offset.
///
/// `size()` is the number of bytes in use and never exceeds `capacity()`.
/// Growth is geometric: a miss allocates at least twice the old capacity and
/// keeps every existing byte at the same offset.
///
/// # Thread Safety
///
/// Not shared between threads. There is one decode arena and one scratch
/// arena per process.
///
/// # Example
///
/// ```rust
/// use courier_core::Arena;
///
/// let mut arena = Arena::new();
/// let offset = arena.emplace_back(&7u32);
/// arena.append(b"tail");
/// assert_eq!(arena.get::<u32>(offset), 7);
/// arena.reset(); // size 0, allocation kept
/// ```
#[derive(Debug, Default)]
pub struct Arena {
    /// Backing bytes. `data.len()` is the used size.
    data: Vec<u8>,
    /// Relocation trap (always false in release builds).
    trapped: bool,
}

impl Arena {
    /// Creates an empty arena without allocating.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            data: Vec::new(),
            trapped: false,
        }
    }

    /// Creates an empty arena with at least `capacity` bytes allocated.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut arena = Self::new();
        arena.reserve(capacity);
        arena
    }

    /// Bytes in use.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Bytes allocated.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Bytes that can still be used without growing.
    #[inline]
    #[must_use]
    pub fn space(&self) -> usize {
        self.capacity() - self.size()
    }

    /// Returns true if no bytes are in use.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Ensures `capacity() >= capacity`.
    ///
    /// On a miss the region grows to `max(capacity, 2 * capacity())`.
    ///
    /// # Panics
    ///
    /// Panics if growth is needed while the relocation trap is engaged.
    pub fn reserve(&mut self, capacity: usize) {
        let current = self.capacity();
        if current >= capacity {
            return;
        }
        assert!(
            !self.trapped,
            "arena relocation while trapped: capacity {current}, requested {capacity}"
        );
        let target = capacity.max(current * 2);
        self.data.reserve_exact(target - self.data.len());
    }

    /// Ensures at least `extra` bytes are available past `size()`.
    #[inline]
    pub fn reserve_space(&mut self, extra: usize) {
        self.reserve(self.size() + extra);
    }

    /// Copies `bytes` to the end of the arena.
    pub fn append(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.reserve(self.size() + bytes.len());
        self.data.extend_from_slice(bytes);
    }

    /// Sets the used size directly. New bytes are zeroed.
    pub fn resize(&mut self, size: usize) {
        self.reserve(size);
        self.data.resize(size, 0);
    }

    /// Advances the used size by `delta` zeroed bytes.
    #[inline]
    pub fn add_size(&mut self, delta: usize) {
        self.resize(self.size() + delta);
    }

    /// Writes `value` at `offset`, extending the used size if needed.
    ///
    /// Returns `offset` for chaining.
    pub fn emplace<T: Pod>(&mut self, offset: usize, value: &T) -> usize {
        let bytes = bytes_of(value);
        let end = offset + bytes.len();
        self.reserve(end);
        if self.size() < end {
            self.resize(end);
        }
        self.data[offset..end].copy_from_slice(bytes);
        offset
    }

    /// Writes `value` at the current end and returns its offset.
    #[inline]
    pub fn emplace_back<T: Pod>(&mut self, value: &T) -> usize {
        self.emplace(self.size(), value)
    }

    /// Reads a `T` stored at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if `offset + size_of::<T>()` exceeds `size()`.
    #[inline]
    #[must_use]
    pub fn get<T: Pod>(&self, offset: usize) -> T {
        bytemuck::pod_read_unaligned(&self.data[offset..offset + std::mem::size_of::<T>()])
    }

    /// Reads a `T` at `offset`, or `None` if it does not fit.
    #[must_use]
    pub fn try_get<T: Pod>(&self, offset: usize) -> Option<T> {
        let end = offset.checked_add(std::mem::size_of::<T>())?;
        self.data
            .get(offset..end)
            .map(bytemuck::pod_read_unaligned)
    }

    /// The used bytes.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// The used bytes, mutably.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Sets the size to zero. Keeps the allocation.
    #[inline]
    pub fn reset(&mut self) {
        self.data.clear();
    }

    /// Releases the allocation. The arena stays valid and empty.
    ///
    /// # Panics
    ///
    /// Panics if the relocation trap is engaged.
    pub fn free(&mut self) {
        assert!(!self.trapped, "arena freed while trapped");
        self.data = Vec::new();
    }

    /// Arms or disarms the relocation trap and returns the new state.
    ///
    /// In release builds the trap never arms; the no-growth invariant is then
    /// upheld by the two-pass decoder alone.
    pub fn trap(&mut self, value: bool) -> bool {
        if cfg!(debug_assertions) {
            self.trapped = value;
        }
        self.trapped
    }

    /// Returns whether the relocation trap is engaged.
    #[inline]
    #[must_use]
    pub const fn is_trapped(&self) -> bool {
        self.trapped
    }
}

impl io::Write for Arena {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_arena_is_unallocated() {
        let arena = Arena::new();
        assert_eq!(arena.size(), 0);
        assert_eq!(arena.capacity(), 0);
        assert!(arena.is_empty());
    }

    #[test]
    fn test_append_preserves_content_across_growth() {
        let mut arena = Arena::new();
        let mut expected = Vec::new();
        for round in 0u8..200 {
            let chunk: Vec<u8> = (0..=round).collect();
            arena.append(&chunk);
            expected.extend_from_slice(&chunk);
            assert_eq!(arena.size(), expected.len());
            assert_eq!(arena.as_slice(), expected.as_slice());
        }
    }

    #[test]
    fn test_reserve_grows_geometrically() {
        let mut arena = Arena::with_capacity(64);
        assert!(arena.capacity() >= 64);
        let before = arena.capacity();
        arena.reserve(before + 1);
        assert!(arena.capacity() >= before * 2);
    }

    #[test]
    fn test_reserve_within_capacity_keeps_size() {
        let mut arena = Arena::with_capacity(32);
        arena.append(b"abc");
        arena.reserve(16);
        assert_eq!(arena.size(), 3);
    }

    #[test]
    fn test_emplace_extends_and_overwrites() {
        let mut arena = Arena::new();
        let first = arena.emplace_back(&0x0102_0304u32);
        let second = arena.emplace_back(&0xAAu8);
        assert_eq!(first, 0);
        assert_eq!(second, 4);
        assert_eq!(arena.size(), 5);

        arena.emplace(first, &0xDEAD_BEEFu32);
        assert_eq!(arena.get::<u32>(first), 0xDEAD_BEEF);
        assert_eq!(arena.get::<u8>(second), 0xAA);
        assert_eq!(arena.size(), 5);
    }

    #[test]
    fn test_emplace_past_end_zero_fills_gap() {
        let mut arena = Arena::new();
        arena.emplace(6, &1u16);
        assert_eq!(arena.size(), 8);
        assert_eq!(&arena.as_slice()[..6], &[0; 6]);
    }

    #[test]
    fn test_unaligned_reads() {
        let mut arena = Arena::new();
        arena.append(&[9]);
        let offset = arena.emplace_back(&0x1122_3344_5566_7788u64);
        assert_eq!(offset, 1);
        assert_eq!(arena.get::<u64>(offset), 0x1122_3344_5566_7788);
        assert_eq!(arena.try_get::<u64>(2), None);
    }

    #[test]
    fn test_resize_and_add_size() {
        let mut arena = Arena::new();
        arena.resize(10);
        arena.add_size(6);
        assert_eq!(arena.size(), 16);
        arena.resize(4);
        assert_eq!(arena.size(), 4);
    }

    #[test]
    fn test_reset_keeps_capacity() {
        let mut arena = Arena::new();
        arena.append(&[1; 100]);
        let capacity = arena.capacity();
        arena.reset();
        assert_eq!(arena.size(), 0);
        assert_eq!(arena.capacity(), capacity);
    }

    #[test]
    fn test_free_releases_allocation() {
        let mut arena = Arena::new();
        arena.append(&[1; 100]);
        arena.free();
        assert_eq!(arena.size(), 0);
        assert_eq!(arena.capacity(), 0);
        arena.append(b"again");
        assert_eq!(arena.as_slice(), b"again");
    }

    #[test]
    fn test_trapped_arena_allows_writes_within_capacity() {
        let mut arena = Arena::with_capacity(64);
        arena.trap(true);
        arena.append(&[7; 60]);
        arena.emplace_back(&0u32);
        arena.trap(false);
        assert_eq!(arena.size(), 64);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "arena relocation while trapped")]
    fn test_trapped_arena_panics_on_growth() {
        let mut arena = Arena::with_capacity(8);
        assert!(arena.trap(true));
        arena.append(&[0; 9]);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "arena relocation while trapped")]
    fn test_trapped_arena_panics_on_reserve() {
        let mut arena = Arena::new();
        arena.trap(true);
        arena.reserve(1);
    }

    #[test]
    fn test_trapped_arena_resizes_within_capacity() {
        let mut arena = Arena::with_capacity(32);
        arena.trap(true);
        arena.resize(8);
        arena.add_size(8);
        arena.emplace(24, &1u64);
        arena.resize(4);
        assert_eq!(arena.size(), 32);
        assert_eq!(arena.capacity(), 32);
        assert_eq!(arena.get::<u64>(24), 1);
        arena.trap(false);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "arena relocation while trapped")]
    fn test_trapped_arena_panics_on_emplace() {
        let mut arena = Arena::with_capacity(8);
        arena.trap(true);
        arena.emplace(4, &0u64);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "arena relocation while trapped")]
    fn test_trapped_arena_panics_on_emplace_back() {
        let mut arena = Arena::with_capacity(8);
        arena.append(&[1; 6]);
        arena.trap(true);
        arena.emplace_back(&0u32);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "arena relocation while trapped")]
    fn test_trapped_arena_panics_on_resize() {
        let mut arena = Arena::with_capacity(8);
        arena.trap(true);
        arena.resize(9);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "arena relocation while trapped")]
    fn test_trapped_arena_panics_on_add_size() {
        let mut arena = Arena::with_capacity(8);
        arena.resize(8);
        arena.trap(true);
        arena.add_size(1);
    }

    #[test]
    fn test_io_write_appends() {
        use std::io::Write;

        let mut arena = Arena::new();
        write!(arena, "<a x=\"{}\"/>", 5).unwrap();
        assert_eq!(arena.as_slice(), b"<a x=\"5\"/>");
    }
}
