//! Instrumented vectors.
//!
//! [`InstrumentedVector`] wraps any [`GrowableArray`] (bump-backed or heap
//! backed) and reports its lifecycle to an [`InstrumentationSink`] under an
//! owner label. With [`NoInstrumentation`] the wrapper adds no work at all;
//! the data operations run in the same order either way.

use std::fmt;
use std::ops::{Deref, DerefMut};

use smallvec::SmallVec;

use crate::arena::{BumpAllocator, LinearArena};
use crate::bump_vector::RawBumpVector;
use crate::instrumentation::{
    DefaultSink, InstrumentationEntry, InstrumentationSink, NoInstrumentation, VectorEvent,
    default_sink,
};

/// Operations shared by the vector implementations that can be instrumented.
pub trait GrowableArray {
    type Item;

    fn len(&self) -> usize;

    fn capacity(&self) -> usize;

    /// Address of the heap/arena storage, or 0 when none is held.
    fn storage_address(&self) -> usize;

    fn push(&mut self, value: Self::Item) -> &mut Self::Item;

    fn clear(&mut self);

    /// Ensure room for at least `capacity` elements in total.
    fn reserve(&mut self, capacity: usize);

    fn as_slice(&self) -> &[Self::Item];

    fn as_mut_slice(&mut self) -> &mut [Self::Item];

    /// Move the contents out, leaving `self` empty.
    fn take(&mut self) -> Self
    where
        Self: Sized;
}

impl<'a, T, A: BumpAllocator> GrowableArray for RawBumpVector<'a, T, A> {
    type Item = T;

    #[inline]
    fn len(&self) -> usize {
        RawBumpVector::len(self)
    }

    #[inline]
    fn capacity(&self) -> usize {
        RawBumpVector::capacity(self)
    }

    #[inline]
    fn storage_address(&self) -> usize {
        self.as_ptr() as usize
    }

    #[inline]
    fn push(&mut self, value: T) -> &mut T {
        RawBumpVector::push(self, value)
    }

    fn clear(&mut self) {
        RawBumpVector::clear(self);
    }

    fn reserve(&mut self, capacity: usize) {
        RawBumpVector::reserve(self, capacity);
    }

    #[inline]
    fn as_slice(&self) -> &[T] {
        RawBumpVector::as_slice(self)
    }

    #[inline]
    fn as_mut_slice(&mut self) -> &mut [T] {
        RawBumpVector::as_mut_slice(self)
    }

    fn take(&mut self) -> Self {
        RawBumpVector::take(self)
    }
}

impl<T> GrowableArray for Vec<T> {
    type Item = T;

    #[inline]
    fn len(&self) -> usize {
        Vec::len(self)
    }

    #[inline]
    fn capacity(&self) -> usize {
        Vec::capacity(self)
    }

    fn storage_address(&self) -> usize {
        if Vec::capacity(self) == 0 {
            0
        } else {
            self.as_ptr() as usize
        }
    }

    #[inline]
    fn push(&mut self, value: T) -> &mut T {
        Vec::push(self, value);
        let last = Vec::len(self) - 1;
        &mut self[last]
    }

    fn clear(&mut self) {
        Vec::clear(self);
    }

    fn reserve(&mut self, capacity: usize) {
        Vec::reserve(self, capacity.saturating_sub(Vec::len(self)));
    }

    #[inline]
    fn as_slice(&self) -> &[T] {
        self
    }

    #[inline]
    fn as_mut_slice(&mut self) -> &mut [T] {
        self
    }

    fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

/// Heap vector with `N` in-situ slots. Inline storage is reported as "no
/// storage" since its address moves with the vector.
impl<T, const N: usize> GrowableArray for SmallVec<[T; N]> {
    type Item = T;

    #[inline]
    fn len(&self) -> usize {
        SmallVec::len(self)
    }

    #[inline]
    fn capacity(&self) -> usize {
        SmallVec::capacity(self)
    }

    fn storage_address(&self) -> usize {
        if self.spilled() {
            self.as_ptr() as usize
        } else {
            0
        }
    }

    #[inline]
    fn push(&mut self, value: T) -> &mut T {
        SmallVec::push(self, value);
        let last = SmallVec::len(self) - 1;
        &mut self[last]
    }

    fn clear(&mut self) {
        SmallVec::clear(self);
    }

    fn reserve(&mut self, capacity: usize) {
        SmallVec::reserve(self, capacity.saturating_sub(SmallVec::len(self)));
    }

    #[inline]
    fn as_slice(&self) -> &[T] {
        self
    }

    #[inline]
    fn as_mut_slice(&mut self) -> &mut [T] {
        self
    }

    fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

/// A [`GrowableArray`] that reports its lifecycle to a sink.
pub struct InstrumentedVector<'s, V: GrowableArray, S: InstrumentationSink = NoInstrumentation> {
    inner: V,
    owner: &'static str,
    instance_id: u64,
    sink: &'s S,
}

/// Bump-allocated vector.
pub type BumpVector<'a, T, A = LinearArena, S = NoInstrumentation> =
    InstrumentedVector<'a, RawBumpVector<'a, T, A>, S>;

/// Heap vector with `N` in-situ slots.
pub type Vector<'s, T, const N: usize = 0, S = NoInstrumentation> =
    InstrumentedVector<'s, SmallVec<[T; N]>, S>;

impl<V: GrowableArray> InstrumentedVector<'static, V, NoInstrumentation> {
    /// Wrap `inner` without recording anything.
    pub fn new(owner: &'static str, inner: V) -> Self {
        InstrumentedVector::with_sink(owner, inner, &NoInstrumentation)
    }
}

impl<V: GrowableArray> InstrumentedVector<'static, V, DefaultSink> {
    /// Wrap `inner`, recording into the process-wide log when the
    /// `vector-profiling` feature is enabled.
    pub fn profiled(owner: &'static str, inner: V) -> Self {
        InstrumentedVector::with_sink(owner, inner, default_sink())
    }
}

impl<'s, V: GrowableArray, S: InstrumentationSink> InstrumentedVector<'s, V, S> {
    /// Wrap `inner`, recording into `sink`. Logs `create`.
    pub fn with_sink(owner: &'static str, inner: V, sink: &'s S) -> Self {
        let vector = InstrumentedVector {
            inner,
            owner,
            instance_id: sink.register_instance(),
            sink,
        };
        vector.record(VectorEvent::Create);
        vector
    }

    /// Take `other`'s contents into a new vector with a different owner.
    /// Logs `create` on the new vector and `clear` on `other`.
    pub fn take_with_owner(owner: &'static str, other: &mut Self) -> Self {
        let vector = InstrumentedVector::with_sink(owner, other.inner.take(), other.sink);
        other.record(VectorEvent::Clear);
        vector
    }

    /// Replace this vector's contents with `other`'s, leaving `other` empty.
    /// Logs `assign` here and `clear` on `other`.
    pub fn assign_from(&mut self, other: &mut Self) {
        self.inner = other.inner.take();
        self.record(VectorEvent::Assign);
        other.record(VectorEvent::Clear);
    }

    pub fn owner(&self) -> &'static str {
        self.owner
    }

    pub fn instance_id(&self) -> u64 {
        self.instance_id
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.len() == 0
    }

    /// First element. Panics when empty.
    pub fn front(&self) -> &V::Item {
        assert!(!self.is_empty(), "front() on an empty vector");
        &self.inner.as_slice()[0]
    }

    /// Last element. Panics when empty.
    pub fn back(&self) -> &V::Item {
        assert!(!self.is_empty(), "back() on an empty vector");
        &self.inner.as_slice()[self.inner.len() - 1]
    }

    pub fn front_mut(&mut self) -> &mut V::Item {
        assert!(!self.is_empty(), "front_mut() on an empty vector");
        &mut self.inner.as_mut_slice()[0]
    }

    pub fn back_mut(&mut self) -> &mut V::Item {
        assert!(!self.is_empty(), "back_mut() on an empty vector");
        let last = self.inner.len() - 1;
        &mut self.inner.as_mut_slice()[last]
    }

    /// Append `value`. Logs `append`.
    #[inline]
    pub fn push(&mut self, value: V::Item) -> &mut V::Item {
        self.inner.push(value);
        self.record(VectorEvent::Append);
        let last = self.inner.len() - 1;
        &mut self.inner.as_mut_slice()[last]
    }

    /// Remove every element. Logs `clear`.
    pub fn clear(&mut self) {
        self.inner.clear();
        self.record(VectorEvent::Clear);
    }

    pub fn reserve(&mut self, capacity: usize) {
        self.inner.reserve(capacity);
    }

    pub fn inner(&self) -> &V {
        &self.inner
    }

    #[inline(always)]
    fn record(&self, event: VectorEvent) {
        if S::ENABLED {
            self.sink.add_entry(InstrumentationEntry {
                instance_id: self.instance_id,
                owner: self.owner,
                event,
                storage_address: self.inner.storage_address(),
                size: self.inner.len(),
                capacity: self.inner.capacity(),
            });
        }
    }
}

impl<'a, T, A: BumpAllocator, S: InstrumentationSink> InstrumentedVector<'a, RawBumpVector<'a, T, A>, S> {
    /// Empty bump-allocated vector recording into `sink`.
    pub fn new_in(owner: &'static str, allocator: &'a A, sink: &'a S) -> Self {
        InstrumentedVector::with_sink(owner, RawBumpVector::new(allocator), sink)
    }
}

impl<V: GrowableArray, S: InstrumentationSink> Drop for InstrumentedVector<'_, V, S> {
    fn drop(&mut self) {
        self.record(VectorEvent::Destroy);
    }
}

impl<V: GrowableArray, S: InstrumentationSink> Deref for InstrumentedVector<'_, V, S> {
    type Target = [V::Item];

    #[inline]
    fn deref(&self) -> &[V::Item] {
        self.inner.as_slice()
    }
}

impl<V: GrowableArray, S: InstrumentationSink> DerefMut for InstrumentedVector<'_, V, S> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [V::Item] {
        self.inner.as_mut_slice()
    }
}

impl<V: GrowableArray, S: InstrumentationSink> fmt::Debug for InstrumentedVector<'_, V, S>
where
    V::Item: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentedVector")
            .field("owner", &self.owner)
            .field("items", &self.inner.as_slice())
            .finish()
    }
}
