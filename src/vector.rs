//! A contiguous growable array with explicit allocator control.

use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::iter::{self, FusedIterator};
use core::marker::PhantomData;
use core::mem::{self, ManuallyDrop};
use core::ops::{Bound, Deref, DerefMut, Index, IndexMut, RangeBounds};
use core::ptr::{self, NonNull};
use core::slice::{self, SliceIndex};

use crate::error::{Error, Result, unwrap_infallible};
use crate::iterator::{IterCategory, Traversal, classify, next_exact};
use crate::memory::{Allocator, Global, RawBuffer, allocate_array, deallocate_array, destroy_range, max_elements};

const NAME: &str = "Vector";

/// Factor by which capacity grows when a full vector needs more room.
pub const GROWTH_FACTOR: usize = 2;

/// A contiguous growable array type, written `Vector<T>`.
///
/// Storage is obtained from an [`Allocator`] (the global allocator by
/// default). Unlike `alloc::vec::Vec`, every operation that may allocate
/// returns a [`Result`], and a failed operation leaves the vector exactly as it
/// was: length, capacity and elements are all unchanged.
///
/// Indexing with `[]` goes through the slice and panics when out of bounds;
/// [`at`](Vector::at) is the checked accessor that reports
/// [`Error::OutOfRange`] instead.
///
/// # Examples
///
/// ```
/// use rb_collections::Vector;
///
/// let mut v = Vector::with_capacity(2)?;
/// for i in 1..=5 {
///     v.push_back(i)?;
/// }
/// assert_eq!(v.len(), 5);
/// assert!(v.capacity() >= 5);
/// assert_eq!(v[2], 3);
/// assert!(v.at(5).is_err());
/// # Ok::<(), rb_collections::Error>(())
/// ```
///
/// # Invalidation
///
/// Any operation that grows the buffer moves every element, so indices stay
/// meaningful but references obtained earlier cannot survive it; the borrow
/// checker enforces this.
pub struct Vector<T, A: Allocator = Global> {
    ptr: NonNull<T>,
    len: usize,
    cap: usize,
    alloc: A,
    _marker: PhantomData<T>,
}

// SAFETY: Vector owns its elements and allocator like `Vec<T, A>`.
unsafe impl<T: Send, A: Allocator + Send> Send for Vector<T, A> {}
// SAFETY: shared access only hands out `&T` and `&A`.
unsafe impl<T: Sync, A: Allocator + Sync> Sync for Vector<T, A> {}

impl<T> Vector<T> {
    /// Makes a new, empty `Vector`. Does not allocate.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub const fn new() -> Self {
        Self::new_in(Global)
    }

    /// Makes an empty `Vector` with room for `capacity` elements.
    ///
    /// # Errors
    ///
    /// [`Error::LengthError`] if `capacity > max_size()`, [`Error::AllocError`]
    /// if the allocation fails.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::with_capacity_in(capacity, Global)
    }

    /// Makes a `Vector` holding `n` clones of `value`.
    ///
    /// # Errors
    ///
    /// As for [`with_capacity`](Vector::with_capacity).
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::Vector;
    ///
    /// let v = Vector::from_elem(4, &100)?;
    /// assert_eq!(v.as_slice(), [100, 100, 100, 100]);
    /// assert_eq!(v.capacity(), 4);
    /// # Ok::<(), rb_collections::Error>(())
    /// ```
    pub fn from_elem(n: usize, value: &T) -> Result<Self>
    where
        T: Clone,
    {
        Self::from_elem_in(n, value, Global)
    }
}

impl<T, A: Allocator> Vector<T, A> {
    /// Makes a new, empty `Vector` that will allocate from `alloc`.
    #[must_use]
    pub const fn new_in(alloc: A) -> Self {
        Self {
            ptr: NonNull::dangling(),
            len: 0,
            cap: 0,
            alloc,
            _marker: PhantomData,
        }
    }

    /// Makes an empty `Vector` with room for `capacity` elements, allocated from `alloc`.
    ///
    /// # Errors
    ///
    /// [`Error::LengthError`] if `capacity > max_size()`, [`Error::AllocError`]
    /// if the allocation fails.
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Result<Self> {
        let ptr = allocate_array::<T, A>(&alloc, NAME, capacity)?;
        Ok(Self {
            ptr,
            len: 0,
            cap: capacity,
            alloc,
            _marker: PhantomData,
        })
    }

    /// Makes a `Vector` holding `n` clones of `value`, allocated from `alloc`.
    ///
    /// # Errors
    ///
    /// As for [`with_capacity_in`](Vector::with_capacity_in).
    pub fn from_elem_in(n: usize, value: &T, alloc: A) -> Result<Self>
    where
        T: Clone,
    {
        let mut vec = Self::with_capacity_in(n, alloc)?;
        vec.extend_within_capacity(n, || value.clone());
        Ok(vec)
    }

    /// Makes a `Vector` from the items of `iter`, allocated from `alloc`.
    ///
    /// When the iterator reports an exact length the buffer is allocated once;
    /// otherwise it grows as items arrive.
    ///
    /// # Errors
    ///
    /// [`Error::LengthError`] or [`Error::AllocError`] if storage cannot be obtained.
    pub fn from_iter_in<I: IntoIterator<Item = T>>(iter: I, alloc: A) -> Result<Self> {
        let mut iter = iter.into_iter();
        match classify(&iter) {
            IterCategory::Input => {
                let mut vec = Self::new_in(alloc);
                for item in iter {
                    vec.push_back(item)?;
                }
                Ok(vec)
            }
            _ => {
                let n = iter.size_hint().0;
                let mut vec = Self::with_capacity_in(n, alloc)?;
                vec.extend_within_capacity(n, || next_exact(&mut iter));
                Ok(vec)
            }
        }
    }

    /// Clones the vector into an exactly sized buffer.
    ///
    /// # Errors
    ///
    /// [`Error::AllocError`] if the allocation fails; `self` is not affected.
    pub fn try_clone(&self) -> Result<Self>
    where
        T: Clone,
        A: Clone,
    {
        let mut vec = Self::with_capacity_in(self.len, self.alloc.clone())?;
        let mut source = self.iter();
        vec.extend_within_capacity(self.len, || next_exact(&mut source).clone());
        Ok(vec)
    }

    /// Returns the number of elements.
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the vector holds no elements.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of elements the vector can hold without reallocating.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.cap
    }

    /// Returns the largest length any `Vector<T>` can reach.
    #[inline]
    pub const fn max_size(&self) -> usize {
        max_elements::<T>()
    }

    /// Returns a reference to the underlying allocator.
    #[inline]
    pub const fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Returns a raw pointer to the buffer.
    #[inline]
    pub const fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// Returns a raw mutable pointer to the buffer.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Extracts a slice of the whole vector.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: `[0, len)` is initialized and `ptr` is non-null and aligned.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Extracts a mutable slice of the whole vector.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: as for `as_slice`, and `&mut self` guarantees uniqueness.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Returns the element at `index`, or an error naming the vector.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] if `index >= len()`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::{Error, Vector};
    ///
    /// let v = Vector::from([1, 2]);
    /// assert_eq!(v.at(1), Ok(&2));
    /// assert_eq!(v.at(2), Err(Error::OutOfRange { container: "Vector", index: 2, len: 2 }));
    /// ```
    pub fn at(&self, index: usize) -> Result<&T> {
        let len = self.len;
        self.as_slice().get(index).ok_or(Error::out_of_range(NAME, index, len))
    }

    /// Mutable counterpart of [`at`](Vector::at).
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] if `index >= len()`.
    pub fn at_mut(&mut self, index: usize) -> Result<&mut T> {
        let len = self.len;
        self.as_mut_slice().get_mut(index).ok_or(Error::out_of_range(NAME, index, len))
    }

    /// Returns the first element, if any.
    pub fn front(&self) -> Option<&T> {
        self.as_slice().first()
    }

    /// Returns the first element mutably, if any.
    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.as_mut_slice().first_mut()
    }

    /// Returns the last element, if any.
    pub fn back(&self) -> Option<&T> {
        self.as_slice().last()
    }

    /// Returns the last element mutably, if any.
    pub fn back_mut(&mut self) -> Option<&mut T> {
        self.as_mut_slice().last_mut()
    }

    /// Capacity to grow to when `additional` more elements must fit.
    fn grown_capacity(&self, additional: usize) -> Result<usize> {
        let max = self.max_size();
        match self.len.checked_add(additional) {
            Some(required) if required <= max => Ok(self.cap.saturating_mul(GROWTH_FACTOR).max(required).min(max)),
            _ => Err(Error::length(NAME, self.len.saturating_add(additional), max)),
        }
    }

    /// Moves the elements into a fresh buffer of `new_cap` slots.
    fn reallocate(&mut self, new_cap: usize) -> Result<()> {
        debug_assert!(new_cap >= self.len);
        let new_ptr = allocate_array::<T, A>(&self.alloc, NAME, new_cap)?;
        log::trace!("{NAME}: reallocating {} -> {new_cap} slots", self.cap);
        // SAFETY: the buffers are distinct and the new one has room for `len` elements.
        // Moving is a bitwise copy, after which the old storage is released without
        // dropping anything.
        unsafe {
            ptr::copy_nonoverlapping(self.ptr.as_ptr(), new_ptr.as_ptr(), self.len);
            deallocate_array(&self.alloc, self.ptr, self.cap);
        }
        self.ptr = new_ptr;
        self.cap = new_cap;
        Ok(())
    }

    /// Ensures the capacity is at least `capacity`.
    ///
    /// Does nothing when the capacity already suffices. Unlike
    /// `Vec::reserve` the argument is a total, not an increment.
    ///
    /// # Errors
    ///
    /// [`Error::LengthError`] if `capacity > max_size()`, [`Error::AllocError`]
    /// if the allocation fails. Either way the vector is unchanged.
    ///
    /// # Complexity
    ///
    /// O(n) when it reallocates, O(1) otherwise.
    pub fn reserve(&mut self, capacity: usize) -> Result<()> {
        if capacity <= self.cap {
            return Ok(());
        }
        if capacity > self.max_size() {
            return Err(Error::length(NAME, capacity, self.max_size()));
        }
        self.reallocate(capacity)
    }

    /// Appends an element.
    ///
    /// # Errors
    ///
    /// [`Error::LengthError`] or [`Error::AllocError`] if the vector is full and
    /// cannot grow; the vector is unchanged and `value` is dropped.
    ///
    /// # Complexity
    ///
    /// Amortized O(1).
    pub fn push_back(&mut self, value: T) -> Result<()> {
        if self.len == self.cap {
            let new_cap = self.grown_capacity(1)?;
            self.reallocate(new_cap)?;
        }
        // SAFETY: `len < cap`, so the slot is in bounds and uninitialized.
        unsafe { self.ptr.as_ptr().add(self.len).write(value) };
        self.len += 1;
        Ok(())
    }

    /// Removes the last element and returns it.
    pub fn pop_back(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // SAFETY: the slot at the old `len - 1` was initialized and is now outside the live range.
        Some(unsafe { self.ptr.as_ptr().add(self.len).read() })
    }

    /// Writes `count` elements produced by `f` after the last one.
    fn extend_within_capacity(&mut self, count: usize, mut f: impl FnMut() -> T) {
        debug_assert!(self.cap - self.len >= count);
        for _ in 0..count {
            let value = f();
            // SAFETY: capacity was checked by the caller.
            unsafe { self.ptr.as_ptr().add(self.len).write(value) };
            self.len += 1;
        }
    }

    /// Inserts `count` elements produced by `f` at `index`.
    ///
    /// With spare capacity the tail is shifted in place; a guard shifts it back
    /// if `f` panics. Otherwise a new buffer is built around the gap: the new
    /// elements first, then the old ones moved across, so nothing in `self`
    /// changes until the new buffer is complete.
    fn insert_with(&mut self, index: usize, count: usize, mut f: impl FnMut() -> T) -> Result<usize> {
        assert!(index <= self.len, "insertion index (is {index}) should be <= len (is {})", self.len);
        if count == 0 {
            return Ok(index);
        }

        if self.cap - self.len >= count {
            let tail = self.len - index;
            let base = self.ptr.as_ptr();
            // SAFETY: `index + count + tail == len + count <= cap`; `ptr::copy` handles the overlap.
            unsafe { ptr::copy(base.add(index), base.add(index + count), tail) };
            let mut gap = GapGuard {
                base,
                index,
                count,
                tail,
                filled: 0,
            };
            while gap.filled < count {
                let value = f();
                // SAFETY: the slot lies inside the gap opened above.
                unsafe { base.add(index + gap.filled).write(value) };
                gap.filled += 1;
            }
            mem::forget(gap);
        } else {
            let new_cap = self.grown_capacity(count)?;
            let mut buffer = RawBuffer::allocate(&self.alloc, NAME, new_cap)?;
            buffer.fill(index, count, f);
            let new_base = buffer.as_ptr();
            // SAFETY: the new buffer holds `len + count` slots; the prefix and suffix
            // regions do not overlap the filled gap. Old storage is released without
            // dropping the moved elements.
            unsafe {
                let old_base = self.ptr.as_ptr();
                ptr::copy_nonoverlapping(old_base, new_base, index);
                ptr::copy_nonoverlapping(old_base.add(index), new_base.add(index + count), self.len - index);
            }
            let (new_ptr, new_cap) = buffer.into_raw();
            log::trace!("{NAME}: reallocating {} -> {new_cap} slots around insertion", self.cap);
            // SAFETY: every element was moved out above.
            unsafe { deallocate_array(&self.alloc, self.ptr, self.cap) };
            self.ptr = new_ptr;
            self.cap = new_cap;
        }
        self.len += count;
        Ok(index)
    }

    /// Inserts `value` at `index`, shifting later elements right.
    ///
    /// Returns `index`, the position of the new element.
    ///
    /// # Errors
    ///
    /// [`Error::LengthError`] or [`Error::AllocError`]; the vector is unchanged.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn insert(&mut self, index: usize, value: T) -> Result<usize> {
        let mut value = iter::once(value);
        self.insert_with(index, 1, || next_exact(&mut value))
    }

    /// Inserts `n` clones of `value` at `index`.
    ///
    /// # Errors
    ///
    /// [`Error::LengthError`] or [`Error::AllocError`]; the vector is unchanged.
    /// If a `clone` panics the vector is also left unchanged.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn insert_n(&mut self, index: usize, n: usize, value: &T) -> Result<usize>
    where
        T: Clone,
    {
        self.insert_with(index, n, || value.clone())
    }

    /// Inserts the items of `iter` at `index`, preserving their order.
    ///
    /// An iterator with an exact length is inserted directly with at most one
    /// reallocation. Other iterators are first collected into a scratch buffer
    /// from the same allocator, which is then spliced in.
    ///
    /// # Errors
    ///
    /// [`Error::LengthError`] or [`Error::AllocError`]; the vector is unchanged.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::Vector;
    ///
    /// let mut v = Vector::from([1, 5]);
    /// v.insert_iter(1, [2, 3, 4])?;
    /// v.insert_iter(5, (6..20).filter(|n| n % 6 == 0))?;
    /// assert_eq!(v.as_slice(), [1, 2, 3, 4, 5, 6, 12, 18]);
    /// # Ok::<(), rb_collections::Error>(())
    /// ```
    pub fn insert_iter<I: IntoIterator<Item = T>>(&mut self, index: usize, iter: I) -> Result<usize> {
        let mut iter = iter.into_iter();
        match classify(&iter) {
            IterCategory::Input => {
                assert!(index <= self.len, "insertion index (is {index}) should be <= len (is {})", self.len);
                let (buf, count, cap) = self.collect_scratch(iter)?;
                let mut moved = 0;
                // Failure happens before the first item is requested, so either
                // all of the scratch elements move or none do.
                let result = self.insert_with(index, count, || {
                    // SAFETY: `moved < count`; each scratch element is read exactly once.
                    let value = unsafe { buf.as_ptr().add(moved).read() };
                    moved += 1;
                    value
                });
                // SAFETY: `[moved, count)` still holds the elements that were not moved,
                // and the scratch buffer came from `self.alloc` with `cap` slots.
                unsafe {
                    destroy_range(buf.as_ptr().add(moved), count - moved);
                    deallocate_array(&self.alloc, buf, cap);
                }
                result
            }
            _ => {
                let n = iter.size_hint().0;
                self.insert_with(index, n, || next_exact(&mut iter))
            }
        }
    }

    /// Drains an input iterator into a fresh buffer from `self.alloc`.
    ///
    /// Returns the buffer, the number of elements and the capacity. The
    /// caller owns both the elements and the storage.
    fn collect_scratch(&self, iter: impl Iterator<Item = T>) -> Result<(NonNull<T>, usize, usize)> {
        let mut scratch = Vector::new_in(&self.alloc);
        for item in iter {
            scratch.push_back(item)?;
        }
        let scratch = ManuallyDrop::new(scratch);
        Ok((scratch.ptr, scratch.len, scratch.cap))
    }

    /// Removes and returns the element at `index`, shifting later elements left.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn remove(&mut self, index: usize) -> T {
        assert!(index < self.len, "removal index (is {index}) should be < len (is {})", self.len);
        // SAFETY: `index < len`; the hole is closed before `len` shrinks.
        unsafe {
            let slot = self.ptr.as_ptr().add(index);
            let value = slot.read();
            ptr::copy(slot.add(1), slot, self.len - index - 1);
            self.len -= 1;
            value
        }
    }

    /// Destroys the element at `index` and returns the index of the element
    /// that now follows the gap (which is `index`).
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn erase(&mut self, index: usize) -> usize {
        assert!(index < self.len, "erase index (is {index}) should be < len (is {})", self.len);
        self.erase_range(index..=index)
    }

    /// Destroys the elements in `range` and closes the gap.
    ///
    /// Returns the start of the range, where the first element after it now lives.
    ///
    /// # Panics
    ///
    /// Panics if the range is decreasing or extends past `len()`.
    pub fn erase_range<R: RangeBounds<usize>>(&mut self, range: R) -> usize {
        let start = match range.start_bound() {
            Bound::Included(&n) => n,
            Bound::Excluded(&n) => n + 1,
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&n) => n + 1,
            Bound::Excluded(&n) => n,
            Bound::Unbounded => self.len,
        };
        assert!(start <= end, "erase range starts at {start} but ends at {end}");
        assert!(end <= self.len, "erase range end (is {end}) should be <= len (is {})", self.len);

        let old_len = self.len;
        // SAFETY: `[start, end)` is initialized; shrinking `len` first means a panicking
        // destructor leaks the tail instead of double-dropping it.
        unsafe {
            let base = self.ptr.as_ptr();
            self.len = start;
            destroy_range(base.add(start), end - start);
            ptr::copy(base.add(end), base.add(start), old_len - end);
        }
        self.len = old_len - (end - start);
        start
    }

    /// Shortens the vector to `len` elements, dropping the rest. Capacity is kept.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }
        let tail = self.len - len;
        self.len = len;
        // SAFETY: the tail was initialized and is now outside the live range.
        unsafe { destroy_range(self.ptr.as_ptr().add(len), tail) };
    }

    /// Destroys every element. Capacity is kept.
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Resizes to `n` elements, appending clones of `value` or dropping the tail.
    ///
    /// # Errors
    ///
    /// [`Error::LengthError`] or [`Error::AllocError`] when growing; the vector is unchanged.
    pub fn resize(&mut self, n: usize, value: T) -> Result<()>
    where
        T: Clone,
    {
        if n <= self.len {
            self.truncate(n);
            return Ok(());
        }
        let len = self.len;
        self.insert_with(len, n - len, || value.clone()).map(|_| ())
    }

    /// Replaces the contents with `count` elements produced by `f`.
    fn assign_with(&mut self, count: usize, f: impl FnMut() -> T) -> Result<()> {
        if count <= self.cap {
            self.clear();
            self.extend_within_capacity(count, f);
            return Ok(());
        }
        let mut buffer = RawBuffer::allocate(&self.alloc, NAME, count)?;
        buffer.fill(0, count, f);
        let (new_ptr, new_cap) = buffer.into_raw();
        self.clear();
        // SAFETY: the old buffer is empty after `clear`.
        unsafe { deallocate_array(&self.alloc, self.ptr, self.cap) };
        self.ptr = new_ptr;
        self.cap = new_cap;
        self.len = count;
        Ok(())
    }

    /// Replaces the contents with `n` clones of `value`.
    ///
    /// Reuses the buffer when it is large enough; otherwise the replacement is
    /// built completely before the old contents are released.
    ///
    /// # Errors
    ///
    /// [`Error::LengthError`] or [`Error::AllocError`]; the vector is unchanged.
    pub fn assign_n(&mut self, n: usize, value: &T) -> Result<()>
    where
        T: Clone,
    {
        self.assign_with(n, || value.clone())
    }

    /// Replaces the contents with the items of `iter`.
    ///
    /// Items of an iterator without an exact length are collected into a
    /// scratch buffer first; the old contents are released only once it is
    /// complete.
    ///
    /// # Errors
    ///
    /// [`Error::LengthError`] or [`Error::AllocError`]; the vector is unchanged.
    pub fn assign_iter<I: IntoIterator<Item = T>>(&mut self, iter: I) -> Result<()> {
        let mut iter = iter.into_iter();
        match classify(&iter) {
            IterCategory::Input => {
                let (buf, count, cap) = self.collect_scratch(iter)?;
                self.clear();
                if count <= self.cap {
                    // SAFETY: the buffers are distinct and `self` has room for `count`.
                    // The scratch elements are moved, so its storage is released bare.
                    unsafe {
                        ptr::copy_nonoverlapping(buf.as_ptr(), self.ptr.as_ptr(), count);
                        deallocate_array(&self.alloc, buf, cap);
                    }
                } else {
                    // SAFETY: `self` is empty after `clear`; the scratch buffer is adopted whole.
                    unsafe { deallocate_array(&self.alloc, self.ptr, self.cap) };
                    self.ptr = buf;
                    self.cap = cap;
                }
                self.len = count;
                Ok(())
            }
            _ => {
                let n = iter.size_hint().0;
                self.assign_with(n, || next_exact(&mut iter))
            }
        }
    }

    /// Swaps the contents (and allocators) of two vectors in O(1).
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }
}

/// Restores a half-filled gap when a value constructor panics.
struct GapGuard<T> {
    base: *mut T,
    index: usize,
    count: usize,
    tail: usize,
    filled: usize,
}

impl<T> Drop for GapGuard<T> {
    fn drop(&mut self) {
        // SAFETY: `[index, index + filled)` holds the values written so far and
        // `[index + count, index + count + tail)` holds the shifted tail.
        unsafe {
            destroy_range(self.base.add(self.index), self.filled);
            ptr::copy(self.base.add(self.index + self.count), self.base.add(self.index), self.tail);
        }
    }
}

impl<T, A: Allocator> Drop for Vector<T, A> {
    fn drop(&mut self) {
        // SAFETY: `[0, len)` is initialized and the buffer came from `self.alloc`.
        unsafe {
            destroy_range(self.ptr.as_ptr(), self.len);
            deallocate_array(&self.alloc, self.ptr, self.cap);
        }
    }
}

impl<T, A: Allocator> Deref for Vector<T, A> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: Allocator> DerefMut for Vector<T, A> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T, I: SliceIndex<[T]>, A: Allocator> Index<I> for Vector<T, A> {
    type Output = I::Output;

    fn index(&self, index: I) -> &Self::Output {
        Index::index(self.as_slice(), index)
    }
}

impl<T, I: SliceIndex<[T]>, A: Allocator> IndexMut<I> for Vector<T, A> {
    fn index_mut(&mut self, index: I) -> &mut Self::Output {
        IndexMut::index_mut(self.as_mut_slice(), index)
    }
}

impl<T: Clone, A: Allocator + Clone> Clone for Vector<T, A> {
    fn clone(&self) -> Self {
        unwrap_infallible(self.try_clone())
    }
}

impl<T, U, A1: Allocator, A2: Allocator> PartialEq<Vector<U, A2>> for Vector<T, A1>
where
    T: PartialEq<U>,
{
    fn eq(&self, other: &Vector<U, A2>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq, A: Allocator> Eq for Vector<T, A> {}

impl<T: PartialOrd, A: Allocator> PartialOrd for Vector<T, A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.as_slice().partial_cmp(other.as_slice())
    }
}

impl<T: Ord, A: Allocator> Ord for Vector<T, A> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_slice().cmp(other.as_slice())
    }
}

impl<T: Hash, A: Allocator> Hash for Vector<T, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state);
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for Vector<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T, A: Allocator + Default> Default for Vector<T, A> {
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<T> FromIterator<T> for Vector<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        unwrap_infallible(Self::from_iter_in(iter, Global))
    }
}

impl<T, A: Allocator> Extend<T> for Vector<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let len = self.len;
        unwrap_infallible(self.insert_iter(len, iter));
    }
}

impl<'a, T: Copy + 'a, A: Allocator> Extend<&'a T> for Vector<T, A> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl<T, const N: usize> From<[T; N]> for Vector<T> {
    fn from(arr: [T; N]) -> Self {
        arr.into_iter().collect()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a Vector<T, A> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> slice::Iter<'a, T> {
        self.iter()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a mut Vector<T, A> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> slice::IterMut<'a, T> {
        self.iter_mut()
    }
}

impl<T, A: Allocator> IntoIterator for Vector<T, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    /// Moves the elements out; the buffer is released when the iterator is dropped.
    fn into_iter(self) -> IntoIter<T, A> {
        let this = ManuallyDrop::new(self);
        IntoIter {
            buf: this.ptr,
            cap: this.cap,
            front: 0,
            back: this.len,
            // SAFETY: `this` is never dropped, so the allocator is moved out exactly once.
            alloc: unsafe { ptr::read(&this.alloc) },
            _marker: PhantomData,
        }
    }
}

/// An owning iterator over the elements of a [`Vector`].
///
/// This `struct` is created by the `into_iter` method on [`Vector`]
/// (provided by the [`IntoIterator`] trait).
///
/// # Examples
///
/// ```
/// use rb_collections::Vector;
///
/// let v = Vector::from([1, 2, 3]);
/// let mut iter = v.into_iter();
/// assert_eq!(iter.next(), Some(1));
/// assert_eq!(iter.next_back(), Some(3));
/// assert_eq!(iter.as_slice(), [2]);
/// ```
pub struct IntoIter<T, A: Allocator = Global> {
    buf: NonNull<T>,
    cap: usize,
    front: usize,
    back: usize,
    alloc: A,
    _marker: PhantomData<T>,
}

// SAFETY: IntoIter owns its remaining elements like `Vector`.
unsafe impl<T: Send, A: Allocator + Send> Send for IntoIter<T, A> {}
// SAFETY: shared access only hands out `&T`.
unsafe impl<T: Sync, A: Allocator + Sync> Sync for IntoIter<T, A> {}

impl<T, A: Allocator> IntoIter<T, A> {
    /// Returns the elements not yet yielded.
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: `[front, back)` is still initialized.
        unsafe { slice::from_raw_parts(self.buf.as_ptr().add(self.front), self.back - self.front) }
    }
}

impl<T, A: Allocator> Iterator for IntoIter<T, A> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.front == self.back {
            return None;
        }
        // SAFETY: `front < back`, so the slot is initialized and is read exactly once.
        let value = unsafe { self.buf.as_ptr().add(self.front).read() };
        self.front += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.back - self.front;
        (len, Some(len))
    }
}

impl<T, A: Allocator> DoubleEndedIterator for IntoIter<T, A> {
    fn next_back(&mut self) -> Option<T> {
        if self.front == self.back {
            return None;
        }
        self.back -= 1;
        // SAFETY: as for `next`.
        Some(unsafe { self.buf.as_ptr().add(self.back).read() })
    }
}

impl<T, A: Allocator> ExactSizeIterator for IntoIter<T, A> {}

impl<T, A: Allocator> FusedIterator for IntoIter<T, A> {}

impl<T, A: Allocator> Traversal for IntoIter<T, A> {
    const CATEGORY: IterCategory = IterCategory::Bidirectional;
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for IntoIter<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntoIter").field(&self.as_slice()).finish()
    }
}

impl<T, A: Allocator> Drop for IntoIter<T, A> {
    fn drop(&mut self) {
        // SAFETY: the remaining window is initialized; the buffer came from `alloc`.
        unsafe {
            destroy_range(self.buf.as_ptr().add(self.front), self.back - self.front);
            deallocate_array(&self.alloc, self.buf, self.cap);
        }
    }
}
