//! Allocator plumbing shared by the array and tree engines.
//!
//! Storage is acquired and released through [`allocator_api2::alloc::Allocator`],
//! so every container can be given a custom allocator. The helpers here work in
//! terms of "`n` elements of `T`" rather than raw layouts, and [`RawBuffer`]
//! gives the engines a scoped buffer that tears itself down unless it is
//! explicitly committed.

use core::alloc::Layout;
use core::cell::Cell;
use core::mem::{self, ManuallyDrop};
use core::ptr::{self, NonNull};

pub use allocator_api2::alloc::{AllocError, Allocator, Global};

use crate::error::{Error, Result};

/// Largest number of `T` a single buffer can hold.
#[inline]
pub(crate) const fn max_elements<T>() -> usize {
    let size = mem::size_of::<T>();
    if size == 0 { usize::MAX } else { isize::MAX as usize / size }
}

/// Acquires uninitialized storage for `n` elements of `T`.
///
/// Zero-sized requests never reach the allocator and yield a dangling pointer.
pub(crate) fn allocate_array<T, A: Allocator + ?Sized>(
    alloc: &A,
    container: &'static str,
    n: usize,
) -> Result<NonNull<T>> {
    let layout = Layout::array::<T>(n).map_err(|_| Error::length(container, n, max_elements::<T>()))?;
    if layout.size() == 0 {
        return Ok(NonNull::dangling());
    }
    match alloc.allocate(layout) {
        Ok(ptr) => Ok(ptr.cast()),
        Err(AllocError) => {
            log::debug!("{container}: allocation of {n} elements ({} bytes) failed", layout.size());
            Err(Error::alloc(layout))
        }
    }
}

/// Releases storage obtained from [`allocate_array`].
///
/// # Safety
/// - `ptr` must come from `allocate_array::<T>(alloc, _, n)` with the same `alloc` and `n`.
/// - No live element may remain in the buffer.
pub(crate) unsafe fn deallocate_array<T, A: Allocator + ?Sized>(alloc: &A, ptr: NonNull<T>, n: usize) {
    let size = mem::size_of::<T>() * n;
    if size == 0 {
        return;
    }
    // SAFETY: the same layout was validated by `Layout::array` when the buffer was allocated.
    unsafe {
        let layout = Layout::from_size_align_unchecked(size, mem::align_of::<T>());
        alloc.deallocate(ptr.cast(), layout);
    }
}

/// Drops `len` initialized elements starting at `start`.
///
/// # Safety
/// `[start, start + len)` must hold initialized elements that are not used again.
#[inline]
pub(crate) unsafe fn destroy_range<T>(start: *mut T, len: usize) {
    // SAFETY: guaranteed by caller.
    unsafe { ptr::drop_in_place(ptr::slice_from_raw_parts_mut(start, len)) }
}

/// A freshly allocated buffer under construction.
///
/// Elements written through [`RawBuffer::fill`] are owned by the guard until
/// [`RawBuffer::into_raw`] commits the buffer; dropping the guard (including
/// during unwinding) destroys them and returns the storage to the allocator.
pub(crate) struct RawBuffer<'a, T, A: Allocator> {
    alloc: &'a A,
    ptr: NonNull<T>,
    cap: usize,
    init_start: usize,
    init_len: usize,
}

impl<'a, T, A: Allocator> RawBuffer<'a, T, A> {
    pub(crate) fn allocate(alloc: &'a A, container: &'static str, cap: usize) -> Result<Self> {
        let ptr = allocate_array::<T, A>(alloc, container, cap)?;
        Ok(Self {
            alloc,
            ptr,
            cap,
            init_start: 0,
            init_len: 0,
        })
    }

    #[inline]
    pub(crate) fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Constructs `count` elements at `start..start + count`, each produced by `f`.
    ///
    /// Only one window may be filled per buffer.
    pub(crate) fn fill(&mut self, start: usize, count: usize, mut f: impl FnMut() -> T) {
        assert!(start + count <= self.cap, "`RawBuffer::fill()` - window exceeds capacity!");
        debug_assert_eq!(self.init_len, 0);
        self.init_start = start;
        for i in 0..count {
            let value = f();
            // SAFETY: `start + i < cap` and the slot is uninitialized.
            unsafe { self.ptr.as_ptr().add(start + i).write(value) };
            self.init_len += 1;
        }
    }

    /// Commits the buffer, handing ownership of storage and elements to the caller.
    pub(crate) fn into_raw(self) -> (NonNull<T>, usize) {
        let this = ManuallyDrop::new(self);
        (this.ptr, this.cap)
    }
}

impl<T, A: Allocator> Drop for RawBuffer<'_, T, A> {
    fn drop(&mut self) {
        // SAFETY: the window holds exactly the elements written by `fill`, and the
        // storage was obtained from `allocate_array` with `self.cap`.
        unsafe {
            destroy_range(self.ptr.as_ptr().add(self.init_start), self.init_len);
            deallocate_array(self.alloc, self.ptr, self.cap);
        }
    }
}

/// An allocator that forwards to [`Global`] while counting calls.
///
/// An optional allocation budget makes it fail deterministically, which is how
/// the containers' rollback paths are exercised.
///
/// # Examples
///
/// ```
/// use rb_collections::{CountingAllocator, Vector};
///
/// let alloc = CountingAllocator::new();
/// let mut v = Vector::new_in(&alloc);
/// v.push_back(1)?;
/// assert_eq!(alloc.n_allocations(), 1);
///
/// alloc.set_budget(Some(0));
/// let err = v.reserve(100).unwrap_err();
/// assert!(matches!(err, rb_collections::Error::AllocError { .. }));
/// assert_eq!(v.capacity(), 1);
/// # Ok::<(), rb_collections::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct CountingAllocator {
    allocations: Cell<usize>,
    deallocations: Cell<usize>,
    bytes_allocated: Cell<usize>,
    budget: Cell<Option<usize>>,
}

impl CountingAllocator {
    /// Creates an allocator with no budget.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            allocations: Cell::new(0),
            deallocations: Cell::new(0),
            bytes_allocated: Cell::new(0),
            budget: Cell::new(None),
        }
    }

    /// Creates an allocator that succeeds `budget` more times, then fails.
    #[must_use]
    pub fn with_budget(budget: usize) -> Self {
        let alloc = Self::new();
        alloc.budget.set(Some(budget));
        alloc
    }

    /// Replaces the remaining budget. `None` removes the limit.
    pub fn set_budget(&self, budget: Option<usize>) {
        self.budget.set(budget);
    }

    /// Number of successful allocations.
    pub fn n_allocations(&self) -> usize {
        self.allocations.get()
    }

    /// Number of deallocations.
    pub fn n_deallocations(&self) -> usize {
        self.deallocations.get()
    }

    /// Allocations not yet returned.
    pub fn net_allocations(&self) -> usize {
        self.allocations.get() - self.deallocations.get()
    }

    /// Total bytes handed out over the allocator's lifetime.
    pub fn n_bytes_allocated(&self) -> usize {
        self.bytes_allocated.get()
    }
}

// SAFETY: every block is obtained from and returned to `Global` unchanged.
unsafe impl Allocator for CountingAllocator {
    fn allocate(&self, layout: Layout) -> core::result::Result<NonNull<[u8]>, AllocError> {
        let budget = self.budget.get();
        if budget == Some(0) {
            return Err(AllocError);
        }
        let block = Global.allocate(layout)?;
        self.budget.set(budget.map(|n| n - 1));
        self.allocations.set(self.allocations.get() + 1);
        self.bytes_allocated.set(self.bytes_allocated.get() + layout.size());
        Ok(block)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.deallocations.set(self.deallocations.get() + 1);
        // SAFETY: `ptr` was allocated by `Global` with `layout` in `allocate`.
        unsafe { Global.deallocate(ptr, layout) }
    }
}
