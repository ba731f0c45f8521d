use super::handle::Handle;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub(crate) enum Cursor {
    End,
    Node { handle: Handle, generation: u32 },
}

/// A position in an [`RBTreeMap`](crate::RBTreeMap): an element, or the end.
///
/// Positions are plain `Copy` values. They stay valid across insertions and
/// across removal of *other* elements. Passing a position whose element has
/// been removed to the map it came from is a logic error that panics.
///
/// The end position sits one past the largest key. Stepping forward from the
/// end wraps to the first element, and stepping backward from it yields the
/// last element.
///
/// # Examples
///
/// ```
/// use rb_collections::RBTreeMap;
///
/// let map = RBTreeMap::from([(1, 'a'), (3, 'c')]);
/// let pos = map.lower_bound(&2);
/// assert_eq!(map.get_at(pos), Some((&3, &'c')));
/// assert!(map.next(pos).is_end());
/// assert_eq!(map.prev(map.end()), pos);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Position(pub(crate) Cursor);

impl Position {
    pub(crate) const END: Self = Position(Cursor::End);

    /// Returns `true` for the past-the-end position.
    #[must_use]
    pub const fn is_end(self) -> bool {
        matches!(self.0, Cursor::End)
    }
}
