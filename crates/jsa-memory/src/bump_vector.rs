//! Growable arrays backed by a bump allocator.
//!
//! Tokens and AST nodes are pushed one at a time during parsing and thrown
//! away together with the arena, so the general-purpose heap is the wrong
//! tool. [`RawBumpVector`] keeps an owned region `[data, data + capacity)`
//! from a [`BumpAllocator`] and tracks how many slots are constructed. Every
//! construction, relocation, and destruction step is spelled out below.
//!
//! Element types must not need dropping. `clear` still runs the drop pass
//! over the live range; it compiles to nothing for such types.

#![allow(unsafe_code)]

use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::{self, NonNull};
use std::slice;

use jsa_common::limits::MIN_VECTOR_CAPACITY;
use tracing::trace;

use crate::arena::{BumpAllocator, LinearArena, array_layout, capacity_overflow};

/// A contiguous growable array whose storage comes from a bump allocator.
///
/// Invariant: `len <= capacity`; slots `[0, len)` hold live values and
/// `[len, capacity)` are uninitialized. `data` is `None` exactly when no
/// storage is held (`capacity == 0`).
pub struct RawBumpVector<'a, T, A: BumpAllocator = LinearArena> {
    data: Option<NonNull<T>>,
    len: usize,
    capacity: usize,
    allocator: &'a A,
    _owns: PhantomData<T>,
}

impl<'a, T, A: BumpAllocator> RawBumpVector<'a, T, A> {
    const NO_DROP_GLUE: () = assert!(
        !mem::needs_drop::<T>(),
        "RawBumpVector elements must not need dropping"
    );

    /// Empty vector. Nothing is allocated until the first push or reserve.
    pub fn new(allocator: &'a A) -> Self {
        let () = Self::NO_DROP_GLUE;
        RawBumpVector {
            data: None,
            len: 0,
            capacity: 0,
            allocator,
            _owns: PhantomData,
        }
    }

    pub fn allocator(&self) -> &'a A {
        self.allocator
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Address of the first slot, or null when nothing is allocated.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.data.map_or(ptr::null(), |data| data.as_ptr().cast_const())
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        match self.data {
            // SAFETY: the first `len` slots are initialized.
            Some(data) => unsafe { slice::from_raw_parts(data.as_ptr(), self.len) },
            None => &[],
        }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        match self.data {
            // SAFETY: the first `len` slots are initialized and we hold &mut self.
            Some(data) => unsafe { slice::from_raw_parts_mut(data.as_ptr(), self.len) },
            None => &mut [],
        }
    }

    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// First element. Panics when empty.
    #[inline]
    pub fn front(&self) -> &T {
        assert!(!self.is_empty(), "front() on an empty vector");
        &self.as_slice()[0]
    }

    /// Last element. Panics when empty.
    #[inline]
    pub fn back(&self) -> &T {
        assert!(!self.is_empty(), "back() on an empty vector");
        &self.as_slice()[self.len - 1]
    }

    #[inline]
    pub fn front_mut(&mut self) -> &mut T {
        assert!(!self.is_empty(), "front_mut() on an empty vector");
        &mut self.as_mut_slice()[0]
    }

    #[inline]
    pub fn back_mut(&mut self) -> &mut T {
        assert!(!self.is_empty(), "back_mut() on an empty vector");
        let last = self.len - 1;
        &mut self.as_mut_slice()[last]
    }

    /// Make room for at least `capacity` elements in total.
    pub fn reserve(&mut self, capacity: usize) {
        if self.capacity < capacity {
            self.reserve_grow(capacity);
        }
    }

    /// Grow storage to exactly `new_capacity` elements.
    ///
    /// Tries to extend the current allocation in place first; otherwise
    /// allocates a new range, relocates the live elements into it, and
    /// releases the old range.
    pub fn reserve_grow(&mut self, new_capacity: usize) {
        assert!(
            new_capacity > self.capacity,
            "reserve_grow({new_capacity}) does not exceed capacity {}",
            self.capacity
        );
        let Some(old_data) = self.data else {
            self.data = Some(self.allocator.allocate_uninitialized_array::<T>(new_capacity));
            self.capacity = new_capacity;
            return;
        };

        if self
            .allocator
            .try_grow_array_in_place(old_data, self.capacity, new_capacity)
        {
            trace!(
                from = self.capacity,
                to = new_capacity,
                "bump vector grew in place"
            );
            self.capacity = new_capacity;
            return;
        }

        let new_data = self.allocator.allocate_uninitialized_array::<T>(new_capacity);
        // SAFETY: both ranges hold at least `len` slots and do not overlap (the
        // new range was just handed out). The copy is the move: the old slots
        // are treated as uninitialized from here on and are never dropped.
        unsafe { ptr::copy_nonoverlapping(old_data.as_ptr(), new_data.as_ptr(), self.len) };
        trace!(
            from = self.capacity,
            to = new_capacity,
            moved = self.len,
            "bump vector relocated"
        );
        let len = self.len;
        self.release_storage();
        self.data = Some(new_data);
        self.len = len;
        self.capacity = new_capacity;
    }

    /// Append `value` and return a reference to it.
    #[inline]
    pub fn push(&mut self, value: T) -> &mut T {
        if self.len == self.capacity {
            self.reserve_grow_by_at_least(1);
        }
        let Some(data) = self.data else {
            unreachable!("storage is allocated after growth");
        };
        // SAFETY: len < capacity, so the slot is allocated and uninitialized.
        let slot = unsafe {
            let slot = data.as_ptr().add(self.len);
            slot.write(value);
            &mut *slot
        };
        self.len += 1;
        slot
    }

    /// Drop every element, give the storage back, and become unallocated.
    pub fn clear(&mut self) {
        let Some(data) = self.data else {
            return;
        };
        // SAFETY: the first `len` slots are initialized; `len` is reset below
        // so they are never observed again.
        unsafe { ptr::drop_in_place(ptr::slice_from_raw_parts_mut(data.as_ptr(), self.len)) };
        self.release_storage();
    }

    /// Move the contents into a new vector on the same allocator, leaving
    /// `self` empty and unallocated.
    pub fn take(&mut self) -> Self {
        let allocator = self.allocator;
        mem::replace(self, RawBumpVector::new(allocator))
    }

    /// Return the owned range to the allocator without touching elements.
    fn release_storage(&mut self) {
        if let Some(data) = self.data.take() {
            let size = array_layout::<T>(self.capacity).size();
            self.allocator
                .deallocate(data.cast(), size, mem::align_of::<T>());
        }
        self.len = 0;
        self.capacity = 0;
    }

    fn reserve_grow_by_at_least(&mut self, minimum_new_entries: usize) {
        let old_capacity = self.capacity;
        let Some(just_enough) = old_capacity.checked_add(minimum_new_entries) else {
            capacity_overflow()
        };
        let doubled = old_capacity.saturating_mul(2);
        let new_capacity = MIN_VECTOR_CAPACITY.max(just_enough).max(doubled);
        self.reserve_grow(new_capacity);
    }
}

impl<T, A: BumpAllocator> Drop for RawBumpVector<'_, T, A> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: fmt::Debug, A: BumpAllocator> fmt::Debug for RawBumpVector<'_, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'v, T, A: BumpAllocator> IntoIterator for &'v RawBumpVector<'_, T, A> {
    type Item = &'v T;
    type IntoIter = slice::Iter<'v, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
