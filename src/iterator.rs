//! Iterator categories.
//!
//! Containers need to know whether the length of an incoming sequence is known
//! up front: if it is, a range can be built with a single allocation; if not,
//! it has to be grown incrementally. [`IterCategory`] names the capability,
//! [`Traversal`] attaches it statically to the crate's own iterators, and
//! [`classify`] recovers it at runtime for arbitrary iterators.

/// The capabilities of an element cursor, weakest first.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum IterCategory {
    /// Single pass, length unknown until exhausted.
    Input,
    /// Multi-pass, length known without consuming the sequence.
    Forward,
    /// Forward plus stepping backwards.
    Bidirectional,
    /// Bidirectional plus O(1) jumps to any position.
    RandomAccess,
}

impl IterCategory {
    /// Returns `true` if the distance between the ends is known in O(1).
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::IterCategory;
    ///
    /// assert!(!IterCategory::Input.has_exact_distance());
    /// assert!(IterCategory::Bidirectional.has_exact_distance());
    /// ```
    #[must_use]
    pub const fn has_exact_distance(self) -> bool {
        !matches!(self, IterCategory::Input)
    }
}

/// An iterator with a statically known category.
pub trait Traversal: Iterator {
    /// The strongest category this iterator supports.
    const CATEGORY: IterCategory;
}

impl<T> Traversal for core::slice::Iter<'_, T> {
    const CATEGORY: IterCategory = IterCategory::RandomAccess;
}

impl<T> Traversal for core::slice::IterMut<'_, T> {
    const CATEGORY: IterCategory = IterCategory::RandomAccess;
}

/// Returns the category of `I` as declared by its [`Traversal`] impl.
#[must_use]
pub const fn category_of<I: Traversal>(_: &I) -> IterCategory {
    I::CATEGORY
}

/// Classifies an arbitrary iterator at runtime.
///
/// An iterator whose `size_hint` bounds agree is treated as [`IterCategory::Forward`];
/// anything else is [`IterCategory::Input`].
///
/// # Examples
///
/// ```
/// use rb_collections::iterator::{classify, IterCategory};
///
/// assert_eq!(classify(&[1, 2, 3].iter()), IterCategory::Forward);
/// assert_eq!(classify(&(0..10).filter(|n| n % 2 == 0)), IterCategory::Input);
/// ```
pub fn classify<I: Iterator>(iter: &I) -> IterCategory {
    if exact_len(iter).is_some() { IterCategory::Forward } else { IterCategory::Input }
}

/// Returns the exact number of remaining items, if the iterator reports one.
pub fn exact_len<I: Iterator>(iter: &I) -> Option<usize> {
    match iter.size_hint() {
        (lower, Some(upper)) if lower == upper => Some(lower),
        _ => None,
    }
}

/// Pulls the next item from an iterator that promised an exact length.
///
/// # Panics
///
/// Panics if the iterator ends early, which means its `size_hint` was wrong.
pub(crate) fn next_exact<I: Iterator>(iter: &mut I) -> I::Item {
    match iter.next() {
        Some(item) => item,
        None => panic!("iterator yielded fewer items than its size_hint reported"),
    }
}
