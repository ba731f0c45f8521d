use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::ops::Index;

use crate::error::{Error, Result, unwrap_infallible};
use crate::iterator::{IterCategory, Traversal};
use crate::memory::{Allocator, Global};
use crate::order::{Compare, NaturalOrder, SelectFirst};
use crate::raw::{Arena, Handle, NAME, Node, RawRBTree, node};

pub use crate::raw::{InvariantViolation, Position};

mod positions;

type Tree<K, V, C, A> = RawRBTree<(K, V), SelectFirst<K, V>, C, A>;

/// An ordered map based on a [red-black tree].
///
/// Entries are kept in key order as defined by a comparator `C`. The default,
/// [`NaturalOrder`], uses the key's [`Ord`] implementation; any
/// `Fn(&K, &K) -> bool` strict weak ordering can be supplied instead through
/// [`with_comparator`](RBTreeMap::with_comparator). Two keys are the same key
/// when neither is less than the other, and each key appears at most once.
///
/// Insertion, lookup and removal take O(log n) comparisons. Iterators
/// produce entries in key order and are double ended.
///
/// Every operation that may allocate returns a [`Result`]. When one fails the
/// map is exactly as it was before the call.
///
/// Besides the usual `BTreeMap`-style interface the map offers
/// [`Position`]s: copyable handles to an element (or to the end) that remain
/// valid while other elements come and go. See [`find`](RBTreeMap::find),
/// [`lower_bound`](RBTreeMap::lower_bound) and
/// [`insert_hint`](RBTreeMap::insert_hint).
///
/// It is a logic error for a key to be modified in such a way that its ordering
/// relative to any other key changes while it is in the map. The behavior
/// resulting from such a logic error is not specified, but will be encapsulated
/// to the `RBTreeMap` that observed it and not result in undefined behavior.
///
/// # Examples
///
/// ```
/// use rb_collections::RBTreeMap;
///
/// let mut map = RBTreeMap::new();
/// map.insert(1, 'a')?;
/// map.insert(3, 'c')?;
/// map.insert(2, 'b')?;
/// assert_eq!(map.iter().collect::<Vec<_>>(), [(&1, &'a'), (&2, &'b'), (&3, &'c')]);
///
/// assert_eq!(map.erase(&2), 1);
/// assert_eq!(map.len(), 2);
///
/// // Indexing-style insertion: missing keys get a default value.
/// *map.get_or_insert_default(5)? = 'e';
/// assert_eq!(map[&5], 'e');
/// # Ok::<(), rb_collections::Error>(())
/// ```
///
/// A map with a known list of items can be initialized from an array:
///
/// ```
/// use rb_collections::RBTreeMap;
///
/// let solar_distance = RBTreeMap::from([
///     ("Mercury", 0.4),
///     ("Venus", 0.7),
///     ("Earth", 1.0),
///     ("Mars", 1.5),
/// ]);
/// assert_eq!(solar_distance.first_key_value(), Some((&"Earth", &1.0)));
/// ```
///
/// [red-black tree]: https://en.wikipedia.org/wiki/Red%E2%80%93black_tree
pub struct RBTreeMap<K, V, C = NaturalOrder, A: Allocator = Global> {
    raw: Tree<K, V, C, A>,
}

/// An iterator over the entries of an `RBTreeMap`.
///
/// This `struct` is created by the [`iter`] method on [`RBTreeMap`]. See its
/// documentation for more.
///
/// # Examples
///
/// ```
/// use rb_collections::RBTreeMap;
///
/// let map = RBTreeMap::from([(1, "a"), (2, "b")]);
/// let mut iter = map.iter();
/// assert_eq!(iter.next(), Some((&1, &"a")));
/// assert_eq!(iter.next_back(), Some((&2, &"b")));
/// assert_eq!(iter.next(), None);
/// ```
///
/// [`iter`]: RBTreeMap::iter
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, K, V, A: Allocator = Global> {
    nodes: &'a Arena<Node, A>,
    values: &'a Arena<(K, V), A>,
    front: Option<Handle>,
    back: Option<Handle>,
    remaining: usize,
}

/// A mutable iterator over the entries of an `RBTreeMap`.
///
/// This `struct` is created by the [`iter_mut`] method on [`RBTreeMap`]. See its
/// documentation for more.
///
/// # Examples
///
/// ```
/// use rb_collections::RBTreeMap;
///
/// let mut map = RBTreeMap::from([(1, 10), (2, 20)]);
/// for (_, value) in map.iter_mut() {
///     *value += 1;
/// }
/// let values: Vec<_> = map.values().copied().collect();
/// assert_eq!(values, [11, 21]);
/// ```
///
/// [`iter_mut`]: RBTreeMap::iter_mut
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct IterMut<'a, K, V, A: Allocator = Global> {
    nodes: &'a Arena<Node, A>,
    values: *mut Arena<(K, V), A>,
    front: Option<Handle>,
    back: Option<Handle>,
    remaining: usize,
    _marker: PhantomData<&'a mut (K, V)>,
}

// SAFETY: IterMut behaves as `&mut` to the values plus `&` to the links.
// It is not Sync, like the mutable iterators of the standard collections.
unsafe impl<K: Send, V: Send, A: Allocator + Send + Sync> Send for IterMut<'_, K, V, A> {}

/// An owning iterator over the entries of an `RBTreeMap`, sorted by key.
///
/// This `struct` is created by the [`into_iter`] method on [`RBTreeMap`]
/// (provided by the [`IntoIterator`] trait). See its documentation for more.
///
/// # Examples
///
/// ```
/// use rb_collections::RBTreeMap;
///
/// let map = RBTreeMap::from([(1, "a"), (2, "b")]);
/// let mut iter = map.into_iter();
/// assert_eq!(iter.next(), Some((1, "a")));
/// assert_eq!(iter.next_back(), Some((2, "b")));
/// assert_eq!(iter.next(), None);
/// ```
///
/// [`into_iter`]: IntoIterator::into_iter
pub struct IntoIter<K, V> {
    inner: alloc::vec::IntoIter<(K, V)>,
}

/// An iterator over the keys of an `RBTreeMap`.
///
/// This `struct` is created by the [`keys`] method on [`RBTreeMap`].
///
/// [`keys`]: RBTreeMap::keys
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Keys<'a, K, V, A: Allocator = Global> {
    inner: Iter<'a, K, V, A>,
}

/// An iterator over the values of an `RBTreeMap`.
///
/// This `struct` is created by the [`values`] method on [`RBTreeMap`].
///
/// [`values`]: RBTreeMap::values
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Values<'a, K, V, A: Allocator = Global> {
    inner: Iter<'a, K, V, A>,
}

/// A mutable iterator over the values of an `RBTreeMap`.
///
/// This `struct` is created by the [`values_mut`] method on [`RBTreeMap`].
///
/// # Examples
///
/// ```
/// use rb_collections::RBTreeMap;
///
/// let mut map = RBTreeMap::from([(1, String::from("hello")), (2, String::from("goodbye"))]);
/// for value in map.values_mut() {
///     value.push('!');
/// }
/// let values: Vec<_> = map.values().cloned().collect();
/// assert_eq!(values, [String::from("hello!"), String::from("goodbye!")]);
/// ```
///
/// [`values_mut`]: RBTreeMap::values_mut
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct ValuesMut<'a, K, V, A: Allocator = Global> {
    inner: IterMut<'a, K, V, A>,
}

impl<K, V> RBTreeMap<K, V> {
    /// Makes a new, empty `RBTreeMap` ordered by `K: Ord`.
    ///
    /// Does not allocate anything on its own.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let mut map = RBTreeMap::new();
    /// map.insert(1, "a")?;
    /// # Ok::<(), rb_collections::Error>(())
    /// ```
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub const fn new() -> Self {
        RBTreeMap {
            raw: RawRBTree::from_parts(NaturalOrder, Global, Global),
        }
    }
}

impl<K, V, C> RBTreeMap<K, V, C> {
    /// Makes a new, empty `RBTreeMap` ordered by `compare`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::{RBTreeMap, Reverse, NaturalOrder};
    ///
    /// let mut map = RBTreeMap::with_comparator(Reverse(NaturalOrder));
    /// map.insert(1, ())?;
    /// map.insert(2, ())?;
    /// assert_eq!(map.keys().copied().collect::<Vec<i32>>(), [2, 1]);
    /// # Ok::<(), rb_collections::Error>(())
    /// ```
    #[must_use]
    pub const fn with_comparator(compare: C) -> Self {
        RBTreeMap {
            raw: RawRBTree::from_parts(compare, Global, Global),
        }
    }
}

impl<K, V, A: Allocator + Clone> RBTreeMap<K, V, NaturalOrder, A> {
    /// Makes a new, empty `RBTreeMap` that allocates from `alloc`.
    #[must_use]
    pub fn new_in(alloc: A) -> Self {
        RBTreeMap {
            raw: RawRBTree::new_in(NaturalOrder, alloc),
        }
    }
}

impl<K, V, C, A: Allocator + Clone> RBTreeMap<K, V, C, A> {
    /// Makes a new, empty `RBTreeMap` ordered by `compare` that allocates from `alloc`.
    #[must_use]
    pub fn with_comparator_in(compare: C, alloc: A) -> Self {
        RBTreeMap {
            raw: RawRBTree::new_in(compare, alloc),
        }
    }
}

impl<K, V, C, A: Allocator> RBTreeMap<K, V, C, A> {
    /// Returns the number of elements in the map.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the map contains no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Returns the largest number of elements any `RBTreeMap` can hold.
    #[must_use]
    pub const fn max_size(&self) -> usize {
        Handle::SLOTS
    }

    /// Returns a reference to the comparator.
    #[must_use]
    pub const fn comparator(&self) -> &C {
        self.raw.comparator()
    }

    /// Returns a reference to the underlying allocator.
    #[must_use]
    pub const fn allocator(&self) -> &A {
        self.raw.allocator()
    }

    /// Clears the map, removing all elements.
    ///
    /// Node storage is kept for reuse.
    ///
    /// # Complexity
    ///
    /// O(n)
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Gets an iterator over the entries of the map, sorted by key.
    ///
    /// # Complexity
    ///
    /// O(1) to create, amortized O(1) per item.
    pub fn iter(&self) -> Iter<'_, K, V, A> {
        Iter {
            nodes: self.raw.nodes(),
            values: self.raw.values(),
            front: self.raw.leftmost(),
            back: self.raw.rightmost(),
            remaining: self.raw.len(),
        }
    }

    /// Gets a mutable iterator over the entries of the map, sorted by key.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V, A> {
        let front = self.raw.leftmost();
        let back = self.raw.rightmost();
        let remaining = self.raw.len();
        let (nodes, values) = self.raw.split_mut();
        IterMut {
            nodes,
            values,
            front,
            back,
            remaining,
            _marker: PhantomData,
        }
    }

    /// Gets an iterator over the keys of the map, in sorted order.
    pub fn keys(&self) -> Keys<'_, K, V, A> {
        Keys { inner: self.iter() }
    }

    /// Gets an iterator over the values of the map, in order by key.
    pub fn values(&self) -> Values<'_, K, V, A> {
        Values { inner: self.iter() }
    }

    /// Gets a mutable iterator over the values of the map, in order by key.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V, A> {
        ValuesMut { inner: self.iter_mut() }
    }

    /// Returns the first key-value pair in the map.
    ///
    /// # Complexity
    ///
    /// O(1), read from the cached leftmost node.
    #[must_use]
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.raw.leftmost().map(|h| {
            let (k, v) = self.raw.value(h);
            (k, v)
        })
    }

    /// Returns the last key-value pair in the map.
    ///
    /// # Complexity
    ///
    /// O(1), read from the cached rightmost node.
    #[must_use]
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.raw.rightmost().map(|h| {
            let (k, v) = self.raw.value(h);
            (k, v)
        })
    }

    /// Removes and returns the first element in the map.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let mut map = RBTreeMap::from([(1, "a"), (2, "b")]);
    /// assert_eq!(map.pop_first(), Some((1, "a")));
    /// assert_eq!(map.pop_first(), Some((2, "b")));
    /// assert_eq!(map.pop_first(), None);
    /// ```
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        self.raw.pop_first()
    }

    /// Removes and returns the last element in the map.
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        self.raw.pop_last()
    }

    /// Exchanges the contents, comparators and allocators of two maps.
    ///
    /// # Complexity
    ///
    /// O(1)
    pub fn swap(&mut self, other: &mut Self) {
        self.raw.swap(&mut other.raw);
    }

    /// Makes a deep copy of the map with the same shape and coloring.
    ///
    /// # Errors
    ///
    /// [`Error::AllocError`] if storage for the copy cannot be obtained. The
    /// partial copy is released and `self` is untouched.
    ///
    /// # Complexity
    ///
    /// O(n), with no comparisons.
    pub fn try_clone(&self) -> Result<Self>
    where
        K: Clone,
        V: Clone,
        C: Clone,
        A: Clone,
    {
        Ok(RBTreeMap {
            raw: self.raw.try_clone()?,
        })
    }
}

impl<K, V, C: Compare<K>, A: Allocator> RBTreeMap<K, V, C, A> {
    /// Returns a reference to the value corresponding to the key.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let map = RBTreeMap::from([(1, "a")]);
    /// assert_eq!(map.get(&1), Some(&"a"));
    /// assert_eq!(map.get(&2), None);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn get(&self, key: &K) -> Option<&V> {
        self.raw.find(key).map(|h| &self.raw.value(h).1)
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let handle = self.raw.find(key)?;
        Some(&mut self.raw.value_mut(handle).1)
    }

    /// Returns the key-value pair corresponding to the supplied key.
    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        self.raw.find(key).map(|h| {
            let (k, v) = self.raw.value(h);
            (k, v)
        })
    }

    /// Returns `true` if the map contains a value for the specified key.
    pub fn contains_key(&self, key: &K) -> bool {
        self.raw.find(key).is_some()
    }

    /// Returns the number of elements with the given key, which is 0 or 1.
    pub fn count(&self, key: &K) -> usize {
        usize::from(self.contains_key(key))
    }

    /// Checked lookup.
    ///
    /// # Errors
    ///
    /// [`Error::KeyNotFound`] if the key is absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::{Error, RBTreeMap};
    ///
    /// let map = RBTreeMap::from([(1, "a")]);
    /// assert_eq!(map.at(&1), Ok(&"a"));
    /// assert_eq!(map.at(&2), Err(Error::KeyNotFound { container: "RBTreeMap" }));
    /// ```
    pub fn at(&self, key: &K) -> Result<&V> {
        self.get(key).ok_or(Error::key_not_found(NAME))
    }

    /// Checked mutable lookup.
    ///
    /// # Errors
    ///
    /// [`Error::KeyNotFound`] if the key is absent.
    pub fn at_mut(&mut self, key: &K) -> Result<&mut V> {
        self.get_mut(key).ok_or(Error::key_not_found(NAME))
    }

    /// Inserts a key-value pair unless the key is already present.
    ///
    /// Returns the position of the element with this key and whether it was
    /// newly inserted. An existing entry is left untouched, value included.
    ///
    /// # Errors
    ///
    /// [`Error::LengthError`] if the map is at [`max_size`](RBTreeMap::max_size),
    /// [`Error::AllocError`] if node storage cannot grow. The map is unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let mut map = RBTreeMap::new();
    /// let (pos, inserted) = map.insert(37, "a")?;
    /// assert!(inserted);
    ///
    /// let (again, inserted) = map.insert(37, "b")?;
    /// assert!(!inserted);
    /// assert_eq!(again, pos);
    /// assert_eq!(map[&37], "a");
    /// # Ok::<(), rb_collections::Error>(())
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn insert(&mut self, key: K, value: V) -> Result<(Position, bool)> {
        let (handle, inserted) = self.raw.insert_unique((key, value))?;
        Ok((self.raw.position(Some(handle)), inserted))
    }

    /// Returns the value for `key`, inserting the result of `f` first if it is absent.
    ///
    /// # Errors
    ///
    /// As for [`insert`](RBTreeMap::insert).
    pub fn get_or_insert_with<F: FnOnce() -> V>(&mut self, key: K, f: F) -> Result<&mut V> {
        let bound = self.raw.lower_bound(&key);
        let handle = match bound {
            Some(h) if !self.raw.less(&key, self.raw.key_of(h)) => h,
            _ => self.raw.insert_unique_hint(bound, (key, f()))?,
        };
        Ok(&mut self.raw.value_mut(handle).1)
    }

    /// Returns the value for `key`, inserting `V::default()` first if it is absent.
    ///
    /// # Errors
    ///
    /// As for [`insert`](RBTreeMap::insert).
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let mut counts: RBTreeMap<&str, i32> = RBTreeMap::new();
    /// for word in ["a", "b", "a"] {
    ///     *counts.get_or_insert_default(word)? += 1;
    /// }
    /// assert_eq!(counts[&"a"], 2);
    /// assert_eq!(counts[&"b"], 1);
    /// # Ok::<(), rb_collections::Error>(())
    /// ```
    pub fn get_or_insert_default(&mut self, key: K) -> Result<&mut V>
    where
        V: Default,
    {
        self.get_or_insert_with(key, V::default)
    }

    /// Removes a key from the map, returning the value if the key was present.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Removes a key from the map, returning the stored key and value if present.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        let handle = self.raw.find(key)?;
        Some(self.raw.erase(handle))
    }

    /// Removes the element with the given key and returns how many were removed (0 or 1).
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn erase(&mut self, key: &K) -> usize {
        usize::from(self.remove_entry(key).is_some())
    }

    /// Retains only the elements specified by the predicate.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let mut map: RBTreeMap<i32, i32> = (0..8).map(|x| (x, x * 10)).collect();
    /// map.retain(|&k, _| k % 2 == 0);
    /// assert!(map.into_iter().eq(vec![(0, 0), (2, 20), (4, 40), (6, 60)]));
    /// ```
    pub fn retain<F: FnMut(&K, &mut V) -> bool>(&mut self, mut f: F) {
        let mut cursor = self.raw.leftmost();
        while let Some(handle) = cursor {
            cursor = self.raw.successor(handle);
            let (k, v) = self.raw.value_mut(handle);
            if !f(k, v) {
                drop(self.raw.erase(handle));
            }
        }
    }

    /// Inserts every pair from `iter`, keeping the first value seen for each key.
    ///
    /// # Errors
    ///
    /// As for [`insert`](RBTreeMap::insert). Pairs inserted before the error stay in the map.
    pub fn try_extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) -> Result<()> {
        for (key, value) in iter {
            // Sorted input lands after the rightmost node, where the end hint is exact.
            self.raw.insert_unique_hint(None, (key, value))?;
        }
        Ok(())
    }

    /// Verifies the red-black properties, key ordering and internal bookkeeping.
    ///
    /// Intended for tests and debugging; a correct map always returns `Ok`.
    ///
    /// # Errors
    ///
    /// The first [`InvariantViolation`] found.
    ///
    /// # Complexity
    ///
    /// O(n)
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        self.raw.check_invariants()
    }
}

impl<K: Clone, V: Clone, C: Clone, A: Allocator + Clone> Clone for RBTreeMap<K, V, C, A> {
    fn clone(&self) -> Self {
        unwrap_infallible(self.try_clone())
    }
}

impl<K: Hash, V: Hash, C, A: Allocator> Hash for RBTreeMap<K, V, C, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        for elt in self {
            elt.hash(state);
        }
    }
}

impl<K: PartialEq, V: PartialEq, C, A: Allocator> PartialEq for RBTreeMap<K, V, C, A> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a == b)
    }
}

impl<K: Eq, V: Eq, C, A: Allocator> Eq for RBTreeMap<K, V, C, A> {}

impl<K: PartialOrd, V: PartialOrd, C, A: Allocator> PartialOrd for RBTreeMap<K, V, C, A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<K: Ord, V: Ord, C, A: Allocator> Ord for RBTreeMap<K, V, C, A> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C, A: Allocator> fmt::Debug for RBTreeMap<K, V, C, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, C: Default> Default for RBTreeMap<K, V, C> {
    fn default() -> Self {
        RBTreeMap::with_comparator(C::default())
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for RBTreeMap<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = RBTreeMap::new();
        map.extend(iter);
        map
    }
}

impl<K, V, C: Compare<K>, A: Allocator> Extend<(K, V)> for RBTreeMap<K, V, C, A> {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        unwrap_infallible(self.try_extend(iter));
    }
}

impl<'a, K: Copy, V: Copy, C: Compare<K>, A: Allocator> Extend<(&'a K, &'a V)> for RBTreeMap<K, V, C, A> {
    fn extend<I: IntoIterator<Item = (&'a K, &'a V)>>(&mut self, iter: I) {
        self.extend(iter.into_iter().map(|(&key, &value)| (key, value)));
    }
}

impl<'a, K, V, C, A: Allocator> IntoIterator for &'a RBTreeMap<K, V, C, A> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, A>;

    fn into_iter(self) -> Iter<'a, K, V, A> {
        self.iter()
    }
}

impl<'a, K, V, C, A: Allocator> IntoIterator for &'a mut RBTreeMap<K, V, C, A> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V, A>;

    fn into_iter(self) -> IterMut<'a, K, V, A> {
        self.iter_mut()
    }
}

impl<K, V, C, A: Allocator> IntoIterator for RBTreeMap<K, V, C, A> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    /// Gets an owning iterator over the entries of the map, sorted by key.
    fn into_iter(mut self) -> IntoIter<K, V> {
        IntoIter {
            inner: self.raw.drain_to_vec().into_iter(),
        }
    }
}

impl<K, V, C: Compare<K>, A: Allocator> Index<&K> for RBTreeMap<K, V, C, A> {
    type Output = V;

    /// Returns a reference to the value corresponding to the supplied key.
    ///
    /// # Panics
    ///
    /// Panics if the key is not present in the `RBTreeMap`.
    #[inline]
    fn index(&self, key: &K) -> &V {
        self.get(key).expect("no entry found for key")
    }
}

impl<K: Ord, V, const N: usize> From<[(K, V); N]> for RBTreeMap<K, V> {
    fn from(arr: [(K, V); N]) -> Self {
        arr.into_iter().collect()
    }
}

// ─── Iterators ───────────────────────────────────────────────────────────────

impl<'a, K: 'a, V: 'a, A: Allocator> Iterator for Iter<'a, K, V, A> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let handle = self.front?;
        self.remaining -= 1;
        self.front = node::successor(self.nodes, handle);
        let (k, v) = self.values.get(self.nodes.get(handle).value);
        Some((k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }

    fn last(mut self) -> Option<Self::Item> {
        self.next_back()
    }
}

impl<'a, K: 'a, V: 'a, A: Allocator> DoubleEndedIterator for Iter<'a, K, V, A> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let handle = self.back?;
        self.remaining -= 1;
        self.back = node::predecessor(self.nodes, handle);
        let (k, v) = self.values.get(self.nodes.get(handle).value);
        Some((k, v))
    }
}

impl<K, V, A: Allocator> ExactSizeIterator for Iter<'_, K, V, A> {}

impl<K, V, A: Allocator> FusedIterator for Iter<'_, K, V, A> {}

impl<K, V, A: Allocator> Traversal for Iter<'_, K, V, A> {
    const CATEGORY: IterCategory = IterCategory::Bidirectional;
}

impl<K, V, A: Allocator> Clone for Iter<'_, K, V, A> {
    fn clone(&self) -> Self {
        Iter { ..*self }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, A: Allocator> fmt::Debug for Iter<'_, K, V, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<'a, K: 'a, V: 'a, A: Allocator> Iterator for IterMut<'a, K, V, A> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let handle = self.front?;
        self.remaining -= 1;
        self.front = node::successor(self.nodes, handle);
        // SAFETY: `values` is exclusively borrowed for 'a, and each node is yielded
        // at most once because `remaining` bounds the two ends from crossing.
        let (k, v) = unsafe { Arena::get_mut_ptr(self.values, self.nodes.get(handle).value) };
        Some((&*k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }

    fn last(mut self) -> Option<Self::Item> {
        self.next_back()
    }
}

impl<'a, K: 'a, V: 'a, A: Allocator> DoubleEndedIterator for IterMut<'a, K, V, A> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let handle = self.back?;
        self.remaining -= 1;
        self.back = node::predecessor(self.nodes, handle);
        // SAFETY: as in `next`.
        let (k, v) = unsafe { Arena::get_mut_ptr(self.values, self.nodes.get(handle).value) };
        Some((&*k, v))
    }
}

impl<K, V, A: Allocator> ExactSizeIterator for IterMut<'_, K, V, A> {}

impl<K, V, A: Allocator> FusedIterator for IterMut<'_, K, V, A> {}

impl<K, V, A: Allocator> Traversal for IterMut<'_, K, V, A> {
    const CATEGORY: IterCategory = IterCategory::Bidirectional;
}

impl<K: fmt::Debug, V: fmt::Debug, A: Allocator> fmt::Debug for IterMut<'_, K, V, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IterMut").field("remaining", &self.remaining).finish_non_exhaustive()
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IntoIter<K, V> {
    fn next_back(&mut self) -> Option<(K, V)> {
        self.inner.next_back()
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}

impl<K, V> FusedIterator for IntoIter<K, V> {}

impl<K, V> Traversal for IntoIter<K, V> {
    const CATEGORY: IterCategory = IterCategory::Bidirectional;
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for IntoIter<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.as_slice()).finish()
    }
}

impl<'a, K, V, A: Allocator> Iterator for Keys<'a, K, V, A> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, A: Allocator> DoubleEndedIterator for Keys<'_, K, V, A> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

impl<K, V, A: Allocator> ExactSizeIterator for Keys<'_, K, V, A> {}

impl<K, V, A: Allocator> FusedIterator for Keys<'_, K, V, A> {}

impl<K, V, A: Allocator> Traversal for Keys<'_, K, V, A> {
    const CATEGORY: IterCategory = IterCategory::Bidirectional;
}

impl<K, V, A: Allocator> Clone for Keys<'_, K, V, A> {
    fn clone(&self) -> Self {
        Keys {
            inner: self.inner.clone(),
        }
    }
}

impl<K: fmt::Debug, V, A: Allocator> fmt::Debug for Keys<'_, K, V, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<'a, K, V, A: Allocator> Iterator for Values<'a, K, V, A> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, A: Allocator> DoubleEndedIterator for Values<'_, K, V, A> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<K, V, A: Allocator> ExactSizeIterator for Values<'_, K, V, A> {}

impl<K, V, A: Allocator> FusedIterator for Values<'_, K, V, A> {}

impl<K, V, A: Allocator> Traversal for Values<'_, K, V, A> {
    const CATEGORY: IterCategory = IterCategory::Bidirectional;
}

impl<K, V, A: Allocator> Clone for Values<'_, K, V, A> {
    fn clone(&self) -> Self {
        Values {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V: fmt::Debug, A: Allocator> fmt::Debug for Values<'_, K, V, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<'a, K, V, A: Allocator> Iterator for ValuesMut<'a, K, V, A> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<&'a mut V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, A: Allocator> DoubleEndedIterator for ValuesMut<'_, K, V, A> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<K, V, A: Allocator> ExactSizeIterator for ValuesMut<'_, K, V, A> {}

impl<K, V, A: Allocator> FusedIterator for ValuesMut<'_, K, V, A> {}

impl<K, V, A: Allocator> Traversal for ValuesMut<'_, K, V, A> {
    const CATEGORY: IterCategory = IterCategory::Bidirectional;
}

impl<K, V, A: Allocator> fmt::Debug for ValuesMut<'_, K, V, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValuesMut").field("remaining", &self.inner.remaining).finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::iterator::category_of;
    use crate::memory::CountingAllocator;
    use alloc::rc::Rc;
    use alloc::string::{String, ToString};
    use alloc::vec::Vec;
    use core::cell::Cell;
    use core::panic::AssertUnwindSafe;
    use std::panic;

    #[test]
    fn scenario_insert_erase_default() {
        let mut map = RBTreeMap::new();
        map.insert(1, 'a').unwrap();
        map.insert(3, 'c').unwrap();
        map.insert(2, 'b').unwrap();
        assert_eq!(map.iter().collect::<Vec<_>>(), [(&1, &'a'), (&2, &'b'), (&3, &'c')]);

        assert_eq!(map.erase(&2), 1);
        assert_eq!(map.erase(&2), 0);
        assert_eq!(map.iter().collect::<Vec<_>>(), [(&1, &'a'), (&3, &'c')]);
        assert_eq!(map.len(), 2);

        let slot = map.get_or_insert_default(5).unwrap();
        assert_eq!(*slot, '\0');
        *slot = 'e';
        assert_eq!(map.get(&5), Some(&'e'));
        map.check_invariants().unwrap();
    }

    #[test]
    fn get_or_insert_keeps_existing() {
        let mut map = RBTreeMap::from([(1, 10)]);
        *map.get_or_insert_with(1, || 99).unwrap() += 1;
        assert_eq!(map[&1], 11);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn at_reports_missing_key() {
        let mut map: RBTreeMap<i32, i32> = RBTreeMap::new();
        assert_eq!(map.at(&0), Err(Error::key_not_found(NAME)));
        map.insert(0, 1).unwrap();
        *map.at_mut(&0).unwrap() = 2;
        assert_eq!(map.at(&0), Ok(&2));
    }

    #[test]
    fn custom_comparator() {
        let mut map = RBTreeMap::with_comparator(|a: &String, b: &String| a.len() < b.len());
        map.insert("ccc".to_string(), 3).unwrap();
        map.insert("a".to_string(), 1).unwrap();
        // Same length means same key under this comparator.
        let (_, inserted) = map.insert("b".to_string(), 2).unwrap();
        assert!(!inserted);
        assert_eq!(map.get(&"z".to_string()), Some(&1));
        assert_eq!(map.keys().cloned().collect::<Vec<_>>(), ["a", "ccc"]);
    }

    #[test]
    fn iterators_meet_in_the_middle() {
        let mut map: RBTreeMap<i32, i32> = (0..10).map(|k| (k, k)).collect();
        let mut iter = map.iter();
        assert_eq!(iter.len(), 10);
        for k in 0..5 {
            assert_eq!(iter.next(), Some((&k, &k)));
            assert_eq!(iter.next_back(), Some((&(9 - k), &(9 - k))));
        }
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next_back(), None);

        let mut iter = map.iter_mut();
        let (_, first) = iter.next().unwrap();
        let (_, last) = iter.next_back().unwrap();
        core::mem::swap(first, last);
        assert_eq!(map.first_key_value(), Some((&0, &9)));
        assert_eq!(map.last_key_value(), Some((&9, &0)));
        assert_eq!(category_of(&map.iter()), IterCategory::Bidirectional);
    }

    #[test]
    fn retain_and_pop() {
        let mut map: RBTreeMap<u32, u32> = (0..100).map(|k| (k, k)).collect();
        map.retain(|k, v| {
            *v += 1;
            k % 3 == 0
        });
        assert_eq!(map.len(), 34);
        assert_eq!(map.pop_first(), Some((0, 1)));
        assert_eq!(map.pop_last(), Some((99, 100)));
        map.check_invariants().unwrap();
    }

    #[test]
    fn equality_ordering_and_debug() {
        let a = RBTreeMap::from([(1, "x"), (2, "y")]);
        let b = a.clone();
        let c = RBTreeMap::from([(1, "x"), (3, "a")]);
        assert_eq!(a, b);
        assert!(a < c);
        assert_eq!(alloc::format!("{a:?}"), r#"{1: "x", 2: "y"}"#);
    }

    #[test]
    fn swap_exchanges_everything() {
        let mut a = RBTreeMap::from([(1, 1)]);
        let mut b = RBTreeMap::from([(2, 2), (3, 3)]);
        let pos = b.find(&3);
        a.swap(&mut b);
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 1);
        // Positions follow their elements.
        assert_eq!(a.get_at(pos), Some((&3, &3)));
        a.check_invariants().unwrap();
        b.check_invariants().unwrap();
    }

    #[test]
    fn allocation_failure_on_insert() {
        let alloc = CountingAllocator::new();
        let mut map = RBTreeMap::new_in(&alloc);
        map.insert(1, 1).unwrap();
        alloc.set_budget(Some(0));
        assert!(matches!(map.insert(2, 2), Err(Error::AllocError { .. })));
        assert!(matches!(map.try_clone(), Err(Error::AllocError { .. })));
        assert_eq!(map.len(), 1);
        assert_eq!(map.iter().collect::<Vec<_>>(), [(&1, &1)]);
        map.check_invariants().unwrap();
        alloc.set_budget(None);
        drop(map);
        assert_eq!(alloc.net_allocations(), 0);
    }

    /// Counts its drops and panics in the one marked `armed`.
    struct Tripwire {
        armed: bool,
        drops: Rc<Cell<usize>>,
    }

    impl Drop for Tripwire {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
            assert!(!self.armed, "tripwire");
        }
    }

    #[test]
    fn panicking_destructor_during_clear_leaves_empty_map() {
        let drops = Rc::new(Cell::new(0));
        let mut map = RBTreeMap::new();
        for k in 0..10 {
            let value = Tripwire {
                armed: k == 5,
                drops: Rc::clone(&drops),
            };
            map.insert(k, value).unwrap();
        }

        let result = panic::catch_unwind(AssertUnwindSafe(|| map.clear()));
        assert!(result.is_err());
        assert_eq!(drops.get(), 10);
        assert_eq!(map.len(), 0);
        assert_eq!(map.iter().count(), 0);
        assert_eq!(map.begin(), map.end());
        map.check_invariants().unwrap();

        let value = Tripwire {
            armed: false,
            drops: Rc::clone(&drops),
        };
        map.insert(3, value).unwrap();
        assert_eq!(map.len(), 1);
        map.check_invariants().unwrap();
    }
}
