use super::RBTreeMap;
use crate::error::Result;
use crate::memory::Allocator;
use crate::order::Compare;
use crate::raw::Position;

impl<K, V, C, A: Allocator> RBTreeMap<K, V, C, A> {
    /// Position of the first element, or [`end`](RBTreeMap::end) if the map is empty.
    #[must_use]
    pub fn begin(&self) -> Position {
        self.raw.position(self.raw.leftmost())
    }

    /// The past-the-end position.
    #[must_use]
    pub const fn end(&self) -> Position {
        Position::END
    }

    /// The position after `position`. Stepping past the last element gives
    /// [`end`](RBTreeMap::end), and stepping from the end wraps to the first element.
    ///
    /// # Panics
    ///
    /// Panics if `position` refers to an element that has been removed.
    ///
    /// # Complexity
    ///
    /// Amortized O(1), O(log n) worst case.
    #[must_use]
    pub fn next(&self, position: Position) -> Position {
        self.raw.next(position)
    }

    /// The position before `position`. Stepping back from the end gives the
    /// last element, and stepping back from the first element gives the end.
    ///
    /// # Panics
    ///
    /// Panics if `position` refers to an element that has been removed.
    #[must_use]
    pub fn prev(&self, position: Position) -> Position {
        self.raw.prev(position)
    }

    /// Returns the entry at `position`, or `None` for the end position.
    ///
    /// # Panics
    ///
    /// Panics if `position` refers to an element that has been removed.
    #[must_use]
    pub fn get_at(&self, position: Position) -> Option<(&K, &V)> {
        self.raw.resolve(position).map(|h| {
            let (k, v) = self.raw.value(h);
            (k, v)
        })
    }

    /// Returns the entry at `position` with a mutable value, or `None` for the end position.
    ///
    /// # Panics
    ///
    /// Panics if `position` refers to an element that has been removed.
    pub fn get_at_mut(&mut self, position: Position) -> Option<(&K, &mut V)> {
        let handle = self.raw.resolve(position)?;
        let (k, v) = self.raw.value_mut(handle);
        Some((&*k, v))
    }

    /// Removes the element at `position` and returns it.
    ///
    /// Positions of all other elements stay valid.
    ///
    /// # Panics
    ///
    /// Panics if `position` is the end position or refers to an element that
    /// has been removed.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let mut map = RBTreeMap::from([(1, 'a'), (2, 'b'), (3, 'c')]);
    /// let three = map.find(&3);
    /// assert_eq!(map.erase_at(map.find(&2)), (2, 'b'));
    /// assert_eq!(map.get_at(three), Some((&3, &'c')));
    /// ```
    ///
    /// # Complexity
    ///
    /// Amortized O(1) rebalancing after the O(1) lookup of the node.
    pub fn erase_at(&mut self, position: Position) -> (K, V) {
        let handle = self
            .raw
            .resolve(position)
            .expect("`RBTreeMap::erase_at()` - cannot erase the end position!");
        self.raw.erase(handle)
    }

    /// Removes the elements in `[first, last)` and returns how many were removed.
    ///
    /// Erasing from [`begin`](RBTreeMap::begin) to [`end`](RBTreeMap::end)
    /// clears the map in linear time without rebalancing.
    ///
    /// # Panics
    ///
    /// Panics if either position refers to an element that has been removed.
    /// `last` must not precede `first`; if it does, everything from `first` to
    /// the end is removed.
    pub fn erase_range(&mut self, first: Position, last: Position) -> usize {
        self.raw.erase_range(first, last)
    }
}

impl<K, V, C: Compare<K>, A: Allocator> RBTreeMap<K, V, C, A> {
    /// Position of the element with key `key`, or [`end`](RBTreeMap::end) if there is none.
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn find(&self, key: &K) -> Position {
        self.raw.position(self.raw.find(key))
    }

    /// Position of the first element whose key is not less than `key`.
    pub fn lower_bound(&self, key: &K) -> Position {
        self.raw.position(self.raw.lower_bound(key))
    }

    /// Position of the first element whose key is greater than `key`.
    pub fn upper_bound(&self, key: &K) -> Position {
        self.raw.position(self.raw.upper_bound(key))
    }

    /// The pair `(lower_bound(key), upper_bound(key))`, which spans at most one element.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let map = RBTreeMap::from([(1, ()), (3, ())]);
    /// let (first, last) = map.equal_range(&3);
    /// assert_eq!(map.get_at(first), Some((&3, &())));
    /// assert!(last.is_end());
    ///
    /// let (first, last) = map.equal_range(&2);
    /// assert_eq!(first, last);
    /// ```
    pub fn equal_range(&self, key: &K) -> (Position, Position) {
        let lower = self.raw.lower_bound(key);
        let upper = match lower {
            Some(h) if !self.raw.less(key, self.raw.key_of(h)) => self.raw.successor(h),
            _ => lower,
        };
        (self.raw.position(lower), self.raw.position(upper))
    }

    /// Inserts a key-value pair, using `hint` as a guess at the position of the
    /// element the new one should precede.
    ///
    /// A correct hint makes the insertion amortized O(1); any other hint falls
    /// back to a regular insertion. If the key is already present nothing is
    /// inserted and the existing element's position is returned.
    ///
    /// # Errors
    ///
    /// As for [`insert`](RBTreeMap::insert).
    ///
    /// # Panics
    ///
    /// Panics if `hint` refers to an element that has been removed.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_collections::RBTreeMap;
    ///
    /// let mut map = RBTreeMap::new();
    /// let mut pos = map.end();
    /// for key in (0..10).rev() {
    ///     // Each key goes right before the previous one.
    ///     pos = map.insert_hint(pos, key, key * key)?;
    /// }
    /// assert_eq!(map.begin(), pos);
    /// assert_eq!(map.len(), 10);
    /// # Ok::<(), rb_collections::Error>(())
    /// ```
    pub fn insert_hint(&mut self, hint: Position, key: K, value: V) -> Result<Position> {
        let hint = self.raw.resolve(hint);
        let handle = self.raw.insert_unique_hint(hint, (key, value))?;
        Ok(self.raw.position(Some(handle)))
    }
}
