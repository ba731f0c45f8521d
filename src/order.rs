//! Key ordering and key projection strategies for the tree.

use core::marker::PhantomData;

/// A strict weak ordering over `K`.
///
/// `less(a, b)` must be irreflexive and transitive, and incomparability
/// (`!less(a, b) && !less(b, a)`) must be transitive. Two keys are considered
/// equal exactly when neither is less than the other.
///
/// Any `Fn(&K, &K) -> bool` closure is a comparator:
///
/// ```
/// use rb_collections::RBTreeMap;
///
/// let mut by_len = RBTreeMap::with_comparator(|a: &&str, b: &&str| a.len() < b.len());
/// by_len.insert("three", 3)?;
/// by_len.insert("one", 1)?;
/// by_len.insert("four", 4)?;
/// let keys: Vec<_> = by_len.keys().copied().collect();
/// assert_eq!(keys, ["one", "four", "three"]);
/// # Ok::<(), rb_collections::Error>(())
/// ```
pub trait Compare<K: ?Sized> {
    /// Returns `true` if `a` is ordered before `b`.
    fn less(&self, a: &K, b: &K) -> bool;
}

/// Orders keys by their [`Ord`] implementation.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct NaturalOrder;

impl<K: ?Sized + Ord> Compare<K> for NaturalOrder {
    #[inline]
    fn less(&self, a: &K, b: &K) -> bool {
        a < b
    }
}

/// Reverses another comparator.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct Reverse<C>(pub C);

impl<K: ?Sized, C: Compare<K>> Compare<K> for Reverse<C> {
    #[inline]
    fn less(&self, a: &K, b: &K) -> bool {
        self.0.less(b, a)
    }
}

impl<K: ?Sized, F: Fn(&K, &K) -> bool> Compare<K> for F {
    #[inline]
    fn less(&self, a: &K, b: &K) -> bool {
        self(a, b)
    }
}

/// Projects the ordering key out of a stored value.
pub trait KeyOfValue<T> {
    /// The key type the tree is ordered by.
    type Key: ?Sized;

    /// Returns the key of `value`.
    fn key(value: &T) -> &Self::Key;
}

/// Keys a `(K, V)` pair by its first field.
pub struct SelectFirst<K, V>(PhantomData<fn() -> (K, V)>);

impl<K, V> KeyOfValue<(K, V)> for SelectFirst<K, V> {
    type Key = K;

    #[inline]
    fn key(value: &(K, V)) -> &K {
        &value.0
    }
}
