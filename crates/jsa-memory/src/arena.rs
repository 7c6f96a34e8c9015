//! Arena allocation.
//!
//! [`BumpAllocator`] is the contract the bump-backed vector consumes: hand out
//! uninitialized arrays, grow the most recent allocation in place when there
//! is room, and take memory back only when it is the topmost allocation.
//! [`LinearArena`] is a chunked upward-bumping implementation of it.

#![allow(unsafe_code)]

use std::alloc::{self, Layout};
use std::cell::{Cell, RefCell};
use std::ptr::NonNull;

use jsa_common::limits::{ARENA_CHUNK_ALIGN, DEFAULT_ARENA_CHUNK_SIZE};
use tracing::trace;

/// Memory source for arena-backed containers.
///
/// Exhaustion is fatal: implementations abort (or panic on arithmetic
/// overflow) instead of returning an error.
///
/// # Safety
///
/// `allocate_uninitialized_array::<T>(len)` must return memory that is valid
/// for reads and writes of `len` values of `T`, aligned for `T`, and not
/// handed out again until it is deallocated or the arena is reset. When
/// `try_grow_array_in_place` returns `true`, the same holds for `new_len`
/// values at the unchanged address.
pub unsafe trait BumpAllocator {
    /// Memory for `len` values of `T`. The contents are uninitialized.
    fn allocate_uninitialized_array<T>(&self, len: usize) -> NonNull<T>;

    /// Try to extend the array at `array` from `old_len` to `new_len` values
    /// without moving it. Only the most recent allocation can grow.
    fn try_grow_array_in_place<T>(&self, array: NonNull<T>, old_len: usize, new_len: usize)
    -> bool;

    /// Release `size` bytes at `ptr`. Memory below the topmost allocation is
    /// reclaimed only when the whole arena is reset.
    fn deallocate(&self, ptr: NonNull<u8>, size: usize, align: usize);
}

/// Layout of `len` values of `T`, or a "capacity overflow" panic.
#[inline]
pub(crate) fn array_layout<T>(len: usize) -> Layout {
    match Layout::array::<T>(len) {
        Ok(layout) => layout,
        Err(_) => capacity_overflow(),
    }
}

#[cold]
#[inline(never)]
pub(crate) fn capacity_overflow() -> ! {
    panic!("capacity overflow");
}

/// One heap block owned by a [`LinearArena`].
struct ArenaChunk {
    base: NonNull<u8>,
    layout: Layout,
}

impl Drop for ArenaChunk {
    fn drop(&mut self) {
        // SAFETY: base was returned by alloc::alloc with exactly this layout.
        unsafe { alloc::dealloc(self.base.as_ptr(), self.layout) };
    }
}

/// A bump allocator that hands out memory upward from heap chunks.
///
/// Allocation is a pointer bump inside the current chunk. When a request does
/// not fit, a new chunk is started and the rest of the old one is abandoned
/// until [`reset`](LinearArena::reset). Only the topmost allocation can be
/// grown in place or given back.
pub struct LinearArena {
    chunks: RefCell<Vec<ArenaChunk>>,
    /// Base of the current chunk, if any
    current: Cell<Option<NonNull<u8>>>,
    /// Bytes used in the current chunk
    used: Cell<usize>,
    /// Size of the current chunk
    limit: Cell<usize>,
    chunk_size: usize,
}

impl LinearArena {
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_ARENA_CHUNK_SIZE)
    }

    /// Arena whose chunks hold at least `chunk_size` bytes. Larger requests
    /// get a chunk of their own size.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        LinearArena {
            chunks: RefCell::new(Vec::new()),
            current: Cell::new(None),
            used: Cell::new(0),
            limit: Cell::new(0),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Number of heap chunks the arena currently owns.
    pub fn chunk_count(&self) -> usize {
        self.chunks.borrow().len()
    }

    /// Total bytes held from the heap.
    pub fn allocated_bytes(&self) -> usize {
        self.chunks.borrow().iter().map(|c| c.layout.size()).sum()
    }

    /// Bytes in use in the current chunk.
    pub fn current_chunk_used(&self) -> usize {
        self.used.get()
    }

    /// Free every chunk. Requires exclusive access, so no container can still
    /// be borrowing the arena.
    pub fn reset(&mut self) {
        self.chunks.get_mut().clear();
        self.current.set(None);
        self.used.set(0);
        self.limit.set(0);
    }

    /// Bump-allocate `layout`.
    pub fn alloc_layout(&self, layout: Layout) -> NonNull<u8> {
        if layout.size() == 0 {
            return dangling_for(layout.align());
        }
        if let Some(ptr) = self.try_bump(layout) {
            return ptr;
        }
        self.start_chunk(layout);
        match self.try_bump(layout) {
            Some(ptr) => ptr,
            None => alloc::handle_alloc_error(layout),
        }
    }

    fn try_bump(&self, layout: Layout) -> Option<NonNull<u8>> {
        let base = self.current.get()?;
        let used = self.used.get();
        let address = (base.as_ptr() as usize).checked_add(used)?;
        let padding = address.wrapping_neg() & (layout.align() - 1);
        let start = used.checked_add(padding)?;
        let end = start.checked_add(layout.size())?;
        if end > self.limit.get() {
            return None;
        }
        self.used.set(end);
        // SAFETY: start < end <= limit, so base + start is inside the chunk.
        Some(unsafe { NonNull::new_unchecked(base.as_ptr().add(start)) })
    }

    #[cold]
    fn start_chunk(&self, request: Layout) {
        let needed = match request.size().checked_add(request.align()) {
            Some(needed) => needed,
            None => capacity_overflow(),
        };
        let size = self.chunk_size.max(needed);
        let layout = match Layout::from_size_align(size, ARENA_CHUNK_ALIGN) {
            Ok(layout) => layout,
            Err(_) => capacity_overflow(),
        };
        // SAFETY: layout has a non-zero size.
        let raw = unsafe { alloc::alloc(layout) };
        let Some(base) = NonNull::new(raw) else {
            alloc::handle_alloc_error(layout);
        };
        trace!(size, chunks = self.chunk_count() + 1, "arena: new chunk");

        self.chunks.borrow_mut().push(ArenaChunk { base, layout });
        self.current.set(Some(base));
        self.used.set(0);
        self.limit.set(size);
    }

    /// Offset of `ptr` inside the current chunk, if it points there.
    fn offset_in_current(&self, ptr: NonNull<u8>) -> Option<usize> {
        let base = self.current.get()?.as_ptr() as usize;
        let address = ptr.as_ptr() as usize;
        let offset = address.checked_sub(base)?;
        (offset <= self.limit.get()).then_some(offset)
    }
}

impl Default for LinearArena {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: alloc_layout returns fresh, suitably aligned memory inside a chunk
// that lives until reset/drop, and growth only claims bytes past the bump
// pointer of the current chunk.
unsafe impl BumpAllocator for LinearArena {
    fn allocate_uninitialized_array<T>(&self, len: usize) -> NonNull<T> {
        self.alloc_layout(array_layout::<T>(len)).cast()
    }

    fn try_grow_array_in_place<T>(
        &self,
        array: NonNull<T>,
        old_len: usize,
        new_len: usize,
    ) -> bool {
        let old_size = array_layout::<T>(old_len).size();
        let new_size = array_layout::<T>(new_len).size();
        if new_size <= old_size {
            return true;
        }
        let Some(start) = self.offset_in_current(array.cast()) else {
            return false;
        };
        if start + old_size != self.used.get() {
            // Not the topmost allocation.
            return false;
        }
        match start.checked_add(new_size) {
            Some(end) if end <= self.limit.get() => {
                self.used.set(end);
                true
            }
            _ => false,
        }
    }

    fn deallocate(&self, ptr: NonNull<u8>, size: usize, _align: usize) {
        if size == 0 {
            return;
        }
        if let Some(start) = self.offset_in_current(ptr) {
            if start + size == self.used.get() {
                self.used.set(start);
            }
        }
    }
}

/// A well-aligned non-null pointer for zero-sized allocations.
#[inline]
fn dangling_for(align: usize) -> NonNull<u8> {
    // SAFETY: alignments are non-zero powers of two.
    unsafe { NonNull::new_unchecked(std::ptr::without_provenance_mut(align)) }
}
