//! A last-in first-out adapter over a sequence container.

use alloc::vec::Vec;
use core::alloc::Layout;
use core::fmt;
use core::marker::PhantomData;

use crate::error::{Error, Result};
use crate::memory::Allocator;
use crate::vector::Vector;

/// A sequence that can grow and shrink at its back.
///
/// This is the interface [`Stack`] needs from its underlying container.
pub trait BackSequence {
    /// The element type.
    type Item;

    /// Appends an element.
    ///
    /// # Errors
    ///
    /// Whatever the container reports when it cannot grow. The container is
    /// unchanged on error.
    fn push_back(&mut self, value: Self::Item) -> Result<()>;

    /// Removes the last element and returns it, or `None` if empty.
    fn pop_back(&mut self) -> Option<Self::Item>;

    /// The last element.
    fn back(&self) -> Option<&Self::Item>;

    /// The last element, mutably.
    fn back_mut(&mut self) -> Option<&mut Self::Item>;

    /// The number of elements.
    fn len(&self) -> usize;

    /// Returns `true` if there are no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T, A: Allocator> BackSequence for Vector<T, A> {
    type Item = T;

    fn push_back(&mut self, value: T) -> Result<()> {
        Vector::push_back(self, value)
    }

    fn pop_back(&mut self) -> Option<T> {
        Vector::pop_back(self)
    }

    fn back(&self) -> Option<&T> {
        Vector::back(self)
    }

    fn back_mut(&mut self) -> Option<&mut T> {
        Vector::back_mut(self)
    }

    fn len(&self) -> usize {
        Vector::len(self)
    }
}

impl<T> BackSequence for Vec<T> {
    type Item = T;

    fn push_back(&mut self, value: T) -> Result<()> {
        // `TryReserveError` does not expose its cause on stable, so rebuild it from the layout.
        self.try_reserve(1).map_err(|_| {
            let requested = self.len().saturating_add(1);
            Layout::array::<T>(requested).map_or_else(
                |_| Error::length("Vec", requested, isize::MAX.unsigned_abs() / size_of::<T>().max(1)),
                Error::alloc,
            )
        })?;
        self.push(value);
        Ok(())
    }

    fn pop_back(&mut self) -> Option<T> {
        self.pop()
    }

    fn back(&self) -> Option<&T> {
        self.last()
    }

    fn back_mut(&mut self) -> Option<&mut T> {
        self.last_mut()
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }
}

/// A LIFO stack over a [`BackSequence`], [`Vector`] unless another is chosen.
///
/// # Examples
///
/// ```
/// use rb_collections::Stack;
///
/// let mut stack: Stack<char> = Stack::new();
/// stack.push('a')?;
/// stack.push('b')?;
/// assert_eq!(stack.top(), Some(&'b'));
/// assert_eq!(stack.pop(), Some('b'));
/// assert_eq!(stack.len(), 1);
///
/// // Any back sequence works, including `Vec`.
/// let mut over_vec = Stack::from_container(vec![1, 2]);
/// over_vec.push(3)?;
/// assert_eq!(over_vec.into_inner(), [1, 2, 3]);
/// # Ok::<(), rb_collections::Error>(())
/// ```
pub struct Stack<T, C = Vector<T>> {
    c: C,
    _marker: PhantomData<fn() -> T>,
}

impl<T, C: BackSequence<Item = T> + Default> Stack<T, C> {
    /// Makes an empty stack over a default-constructed container.
    #[must_use]
    pub fn new() -> Self {
        Self::from_container(C::default())
    }
}

impl<T, C: BackSequence<Item = T>> Stack<T, C> {
    /// Makes a stack whose elements, bottom to top, are those of `c`.
    pub const fn from_container(c: C) -> Self {
        Stack { c, _marker: PhantomData }
    }

    /// Pushes `value` on top.
    ///
    /// # Errors
    ///
    /// As reported by the container's `push_back`.
    pub fn push(&mut self, value: T) -> Result<()> {
        self.c.push_back(value)
    }

    /// Removes the top element and returns it, or `None` if the stack is empty.
    pub fn pop(&mut self) -> Option<T> {
        self.c.pop_back()
    }

    /// Returns the top element, or `None` if the stack is empty.
    #[must_use]
    pub fn top(&self) -> Option<&T> {
        self.c.back()
    }

    /// Returns the top element mutably, or `None` if the stack is empty.
    pub fn top_mut(&mut self) -> Option<&mut T> {
        self.c.back_mut()
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.c.len()
    }

    /// Returns `true` if the stack holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.c.is_empty()
    }

    /// Unwraps the underlying container.
    pub fn into_inner(self) -> C {
        self.c
    }
}

impl<T, C: BackSequence<Item = T> + Default> Default for Stack<T, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C: Clone> Clone for Stack<T, C> {
    fn clone(&self) -> Self {
        Stack {
            c: self.c.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T, C: PartialEq> PartialEq for Stack<T, C> {
    fn eq(&self, other: &Self) -> bool {
        self.c == other.c
    }
}

impl<T, C: Eq> Eq for Stack<T, C> {}

impl<T, C: PartialOrd> PartialOrd for Stack<T, C> {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        self.c.partial_cmp(&other.c)
    }
}

impl<T, C: Ord> Ord for Stack<T, C> {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.c.cmp(&other.c)
    }
}

impl<T, C: core::hash::Hash> core::hash::Hash for Stack<T, C> {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.c.hash(state);
    }
}

impl<T, C: fmt::Debug> fmt::Debug for Stack<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Stack").field(&self.c).finish()
    }
}
