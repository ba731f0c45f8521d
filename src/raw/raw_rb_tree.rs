use alloc::vec::Vec;
use core::marker::PhantomData;
use core::mem;

use smallvec::SmallVec;
use thiserror::Error;

use super::arena::Arena;
use super::handle::Handle;
use super::node::{self, Color, Header, Node, Side};
use super::position::{Cursor, Position};
use crate::error::Result;
use crate::memory::{Allocator, Global};
use crate::order::{Compare, KeyOfValue};

pub(crate) const NAME: &str = "RBTreeMap";

/// A structural defect found by [`RBTreeMap::check_invariants`](crate::RBTreeMap::check_invariants).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantViolation {
    /// The root node is red.
    #[error("the root is red")]
    RedRoot,
    /// A red node has a red child.
    #[error("a red node has a red child")]
    RedChildOfRed,
    /// Two root-to-leaf paths pass through different numbers of black nodes.
    #[error("root-to-leaf paths contain different numbers of black nodes")]
    BlackHeight,
    /// A child's parent link does not point back at its parent, or the root has a parent.
    #[error("a parent link does not match the tree structure")]
    ParentLink,
    /// In-order traversal is not strictly increasing under the comparator.
    #[error("in-order traversal is not strictly increasing")]
    Order,
    /// The cached leftmost or rightmost node is not the tree's extreme.
    #[error("leftmost or rightmost does not match the tree's extremes")]
    Extremes,
    /// The number of reachable nodes differs from the recorded length.
    #[error("{actual} nodes are reachable but the length is {expected}")]
    Length {
        /// The recorded length.
        expected: usize,
        /// Nodes reachable from the root.
        actual: usize,
    },
}

/// Red-black tree over values of type `T`, ordered by the key `S` projects
/// out of each value and compared with `C`.
///
/// Links live in one arena and values in another, both addressed by
/// [`Handle`]. Keeping them apart lets mutable iteration hand out `&mut T`
/// while it keeps reading links.
pub(crate) struct RawRBTree<T, S, C, A: Allocator = Global> {
    nodes: Arena<Node, A>,
    values: Arena<T, A>,
    header: Header,
    compare: C,
    _select: PhantomData<fn() -> S>,
}

impl<T, S, C, A: Allocator> RawRBTree<T, S, C, A> {
    pub(crate) const fn from_parts(compare: C, nodes_alloc: A, values_alloc: A) -> Self {
        Self {
            nodes: Arena::new_in(nodes_alloc),
            values: Arena::new_in(values_alloc),
            header: Header {
                root: None,
                leftmost: None,
                rightmost: None,
            },
            compare,
            _select: PhantomData,
        }
    }

    pub(crate) fn new_in(compare: C, alloc: A) -> Self
    where
        A: Clone,
    {
        Self::from_parts(compare, alloc.clone(), alloc)
    }

    #[inline]
    pub(crate) const fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub(crate) const fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) const fn comparator(&self) -> &C {
        &self.compare
    }

    pub(crate) const fn allocator(&self) -> &A {
        self.values.allocator()
    }

    pub(crate) const fn nodes(&self) -> &Arena<Node, A> {
        &self.nodes
    }

    pub(crate) const fn values(&self) -> &Arena<T, A> {
        &self.values
    }

    /// Borrows the links immutably and the values mutably at the same time.
    pub(crate) fn split_mut(&mut self) -> (&Arena<Node, A>, &mut Arena<T, A>) {
        (&self.nodes, &mut self.values)
    }

    pub(crate) const fn leftmost(&self) -> Option<Handle> {
        self.header.leftmost
    }

    pub(crate) const fn rightmost(&self) -> Option<Handle> {
        self.header.rightmost
    }

    #[inline]
    fn node(&self, handle: Handle) -> &Node {
        self.nodes.get(handle)
    }

    #[inline]
    fn node_mut(&mut self, handle: Handle) -> &mut Node {
        self.nodes.get_mut(handle)
    }

    #[inline]
    fn parent_of(&self, handle: Handle) -> Handle {
        self.node(handle).parent.expect("`RawRBTree::parent_of()` - node has no parent!")
    }

    #[inline]
    fn is_red(&self, handle: Option<Handle>) -> bool {
        handle.is_some_and(|h| self.node(h).color == Color::Red)
    }

    #[inline]
    fn child(&self, handle: Handle, side: Side) -> Option<Handle> {
        match side {
            Side::Left => self.node(handle).left,
            Side::Right => self.node(handle).right,
        }
    }

    #[inline]
    fn set_child(&mut self, handle: Handle, side: Side, child: Option<Handle>) {
        match side {
            Side::Left => self.node_mut(handle).left = child,
            Side::Right => self.node_mut(handle).right = child,
        }
    }

    #[inline]
    pub(crate) fn value(&self, handle: Handle) -> &T {
        self.values.get(self.node(handle).value)
    }

    #[inline]
    pub(crate) fn value_mut(&mut self, handle: Handle) -> &mut T {
        let value = self.node(handle).value;
        self.values.get_mut(value)
    }

    pub(crate) fn successor(&self, handle: Handle) -> Option<Handle> {
        node::successor(&self.nodes, handle)
    }

    pub(crate) fn predecessor(&self, handle: Handle) -> Option<Handle> {
        node::predecessor(&self.nodes, handle)
    }

    // ─── Positions ───────────────────────────────────────────────────────────

    /// Position of `handle`, or the end position for `None`.
    pub(crate) fn position(&self, handle: Option<Handle>) -> Position {
        match handle {
            None => Position::END,
            Some(handle) => Position(Cursor::Node {
                handle,
                generation: self.nodes.generation(handle),
            }),
        }
    }

    /// Turns a position back into a handle; `None` for the end position.
    ///
    /// # Panics
    ///
    /// Panics if the position's element has been removed.
    pub(crate) fn resolve(&self, position: Position) -> Option<Handle> {
        match position.0 {
            Cursor::End => None,
            Cursor::Node { handle, generation } => {
                assert!(
                    self.nodes.is_live(handle, generation),
                    "`RBTreeMap` - position does not refer to a live element!"
                );
                Some(handle)
            }
        }
    }

    pub(crate) fn next(&self, position: Position) -> Position {
        let next = match self.resolve(position) {
            None => self.header.leftmost,
            Some(handle) => self.successor(handle),
        };
        self.position(next)
    }

    pub(crate) fn prev(&self, position: Position) -> Position {
        let prev = match self.resolve(position) {
            None => self.header.rightmost,
            Some(handle) => self.predecessor(handle),
        };
        self.position(prev)
    }

    // ─── Structure ───────────────────────────────────────────────────────────

    /// Points whichever link referred to `old` (a child link of `parent`, or the root) at `new`.
    fn replace_child(&mut self, parent: Option<Handle>, old: Handle, new: Option<Handle>) {
        match parent {
            None => self.header.root = new,
            Some(p) if self.node(p).left == Some(old) => self.node_mut(p).left = new,
            Some(p) => self.node_mut(p).right = new,
        }
    }

    /// Rotates `x` down towards `side`; its child on the other side takes its place.
    fn rotate(&mut self, x: Handle, side: Side) {
        let up = side.opposite();
        let y = self.child(x, up).expect("`RawRBTree::rotate()` - no child to rotate up!");
        let inner = self.child(y, side);
        self.set_child(x, up, inner);
        if let Some(inner) = inner {
            self.node_mut(inner).parent = Some(x);
        }
        let parent = self.node(x).parent;
        self.node_mut(y).parent = parent;
        self.replace_child(parent, x, Some(y));
        self.set_child(y, side, Some(x));
        self.node_mut(x).parent = Some(y);
    }

    /// Allocates a red node for `value` and links it as the `side` child of `parent`
    /// (or as the root), then restores the red-black properties.
    ///
    /// Both arena slots are acquired before any link changes, so on error the
    /// tree is untouched and `value` is dropped.
    fn link_new(&mut self, parent: Option<Handle>, side: Side, value: T) -> Result<Handle> {
        let value = self.values.alloc(NAME, value)?;
        let handle = match self.nodes.alloc(NAME, Node::new(parent, value)) {
            Ok(handle) => handle,
            Err(err) => {
                self.values.free(value);
                return Err(err);
            }
        };

        match (parent, side) {
            (None, _) => {
                self.header = Header {
                    root: Some(handle),
                    leftmost: Some(handle),
                    rightmost: Some(handle),
                };
            }
            (Some(p), Side::Left) => {
                self.node_mut(p).left = Some(handle);
                if self.header.leftmost == Some(p) {
                    self.header.leftmost = Some(handle);
                }
            }
            (Some(p), Side::Right) => {
                self.node_mut(p).right = Some(handle);
                if self.header.rightmost == Some(p) {
                    self.header.rightmost = Some(handle);
                }
            }
        }

        self.rebalance_after_insert(handle);
        Ok(handle)
    }

    fn rebalance_after_insert(&mut self, mut x: Handle) {
        while let Some(p) = self.node(x).parent.filter(|&p| self.is_red(Some(p))) {
            // A red node is never the root, so `p` has a parent.
            let g = self.parent_of(p);
            let side = if self.node(g).left == Some(p) { Side::Left } else { Side::Right };
            let uncle = self.child(g, side.opposite());

            if self.is_red(uncle) {
                self.node_mut(p).color = Color::Black;
                if let Some(uncle) = uncle {
                    self.node_mut(uncle).color = Color::Black;
                }
                self.node_mut(g).color = Color::Red;
                x = g;
            } else {
                if self.child(p, side.opposite()) == Some(x) {
                    x = p;
                    self.rotate(x, side);
                }
                let p = self.parent_of(x);
                let g = self.parent_of(p);
                self.node_mut(p).color = Color::Black;
                self.node_mut(g).color = Color::Red;
                self.rotate(g, side.opposite());
            }
        }
        if let Some(root) = self.header.root {
            self.node_mut(root).color = Color::Black;
        }
    }

    /// Detaches `z` from the tree and rebalances. `z` itself is left allocated.
    ///
    /// A node with two children is replaced by its in-order successor, which is
    /// moved into `z`'s place and takes `z`'s color; no values are moved, so
    /// handles to every other node stay valid.
    fn unlink(&mut self, z: Handle) {
        let Node {
            color: z_color,
            parent: z_parent,
            left: z_left,
            right: z_right,
            ..
        } = *self.node(z);

        let (x, x_parent, removed_color) = match (z_left, z_right) {
            (Some(zl), Some(zr)) => {
                let y = node::minimum(&self.nodes, zr);
                let x = self.node(y).right;
                self.node_mut(zl).parent = Some(y);
                self.node_mut(y).left = Some(zl);
                let x_parent = if y == zr {
                    y
                } else {
                    let yp = self.parent_of(y);
                    if let Some(x) = x {
                        self.node_mut(x).parent = Some(yp);
                    }
                    self.node_mut(yp).left = x;
                    self.node_mut(y).right = Some(zr);
                    self.node_mut(zr).parent = Some(y);
                    yp
                };
                self.replace_child(z_parent, z, Some(y));
                self.node_mut(y).parent = z_parent;
                let y_color = mem::replace(&mut self.node_mut(y).color, z_color);
                (x, Some(x_parent), y_color)
            }
            _ => {
                let x = z_left.or(z_right);
                if let Some(x) = x {
                    self.node_mut(x).parent = z_parent;
                }
                self.replace_child(z_parent, z, x);
                if self.header.leftmost == Some(z) {
                    // `z` had no left child, so `x` is its right subtree.
                    self.header.leftmost = match x {
                        None => z_parent,
                        Some(x) => Some(node::minimum(&self.nodes, x)),
                    };
                }
                if self.header.rightmost == Some(z) {
                    self.header.rightmost = match x {
                        None => z_parent,
                        Some(x) => Some(node::maximum(&self.nodes, x)),
                    };
                }
                (x, z_parent, z_color)
            }
        };

        if removed_color == Color::Black {
            self.rebalance_after_erase(x, x_parent);
        }
    }

    /// Removes the extra black carried by `x` (which may be an empty link under `x_parent`).
    fn rebalance_after_erase(&mut self, mut x: Option<Handle>, mut x_parent: Option<Handle>) {
        while x != self.header.root && !self.is_red(x) {
            let Some(xp) = x_parent else { break };
            let side = if self.node(xp).left == x { Side::Left } else { Side::Right };
            let other = side.opposite();
            let mut w = self
                .child(xp, other)
                .expect("`RawRBTree::rebalance_after_erase()` - doubly black node has no sibling!");

            if self.node(w).color == Color::Red {
                self.node_mut(w).color = Color::Black;
                self.node_mut(xp).color = Color::Red;
                self.rotate(xp, side);
                w = self.child(xp, other).expect("`RawRBTree::rebalance_after_erase()` - sibling vanished!");
            }

            if !self.is_red(self.child(w, side)) && !self.is_red(self.child(w, other)) {
                self.node_mut(w).color = Color::Red;
                x = Some(xp);
                x_parent = self.node(xp).parent;
            } else {
                if !self.is_red(self.child(w, other)) {
                    if let Some(inner) = self.child(w, side) {
                        self.node_mut(inner).color = Color::Black;
                    }
                    self.node_mut(w).color = Color::Red;
                    self.rotate(w, other);
                    w = self.child(xp, other).expect("`RawRBTree::rebalance_after_erase()` - sibling vanished!");
                }
                self.node_mut(w).color = self.node(xp).color;
                self.node_mut(xp).color = Color::Black;
                if let Some(outer) = self.child(w, other) {
                    self.node_mut(outer).color = Color::Black;
                }
                self.rotate(xp, side);
                break;
            }
        }
        if let Some(x) = x {
            self.node_mut(x).color = Color::Black;
        }
    }

    /// Removes the element at `handle` and returns it.
    pub(crate) fn erase(&mut self, handle: Handle) -> T {
        self.unlink(handle);
        let node = self.nodes.take(handle);
        self.values.take(node.value)
    }

    pub(crate) fn pop_first(&mut self) -> Option<T> {
        self.header.leftmost.map(|h| self.erase(h))
    }

    pub(crate) fn pop_last(&mut self) -> Option<T> {
        self.header.rightmost.map(|h| self.erase(h))
    }

    /// Removes `[first, last)` and returns the number of elements removed.
    pub(crate) fn erase_range(&mut self, first: Position, last: Position) -> usize {
        if self.position(self.header.leftmost) == first && last.is_end() {
            let len = self.len();
            self.clear();
            return len;
        }
        let stop = self.resolve(last);
        let mut cursor = self.resolve(first);
        let mut removed = 0;
        while let Some(h) = cursor {
            if Some(h) == stop {
                break;
            }
            cursor = self.successor(h);
            drop(self.erase(h));
            removed += 1;
        }
        removed
    }

    /// Frees every node without rebalancing, then every remaining value.
    ///
    /// Nodes go first and cannot panic. Values are freed by a sweep that
    /// keeps going if a destructor panics, so an unwinding `clear` still
    /// leaves an empty tree.
    fn teardown(&mut self) -> usize {
        let root = mem::take(&mut self.header).root;
        // Holds at most one pending sibling per level.
        let mut stack: SmallVec<[Handle; 64]> = SmallVec::new();
        stack.extend(root);
        let mut freed = 0;
        while let Some(handle) = stack.pop() {
            let node = self.nodes.take(handle);
            stack.extend(node.left);
            stack.extend(node.right);
            freed += 1;
        }
        self.values.clear();
        freed
    }

    pub(crate) fn clear(&mut self) {
        let freed = self.teardown();
        log::trace!("{NAME}: cleared {freed} nodes");
    }

    /// Moves every value out in order, leaving the tree empty.
    pub(crate) fn drain_to_vec(&mut self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len());
        let mut cursor = self.header.leftmost;
        while let Some(handle) = cursor {
            let value = self.node(handle).value;
            out.push(self.values.take(value));
            cursor = self.successor(handle);
        }
        self.teardown();
        out
    }

    pub(crate) fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// Copies the tree node for node, preserving shape and colors.
    ///
    /// # Errors
    ///
    /// Allocation errors; `self` is unaffected and the partial copy is released.
    pub(crate) fn try_clone(&self) -> Result<Self>
    where
        T: Clone,
        C: Clone,
        A: Clone,
    {
        let alloc = self.values.allocator().clone();
        let mut nodes = Arena::with_capacity_in(self.len(), alloc.clone())?;
        let mut values = Arena::with_capacity_in(self.len(), alloc)?;
        let header = match self.header.root {
            None => Header::default(),
            Some(root) => {
                let root = self.copy_subtree(&mut nodes, &mut values, root, None)?;
                Header {
                    root: Some(root),
                    leftmost: Some(node::minimum(&nodes, root)),
                    rightmost: Some(node::maximum(&nodes, root)),
                }
            }
        };
        Ok(Self {
            nodes,
            values,
            header,
            compare: self.compare.clone(),
            _select: PhantomData,
        })
    }

    /// Recurses down right children and iterates down left ones, so the depth
    /// of recursion is bounded by the tree height.
    fn copy_subtree(
        &self,
        nodes: &mut Arena<Node, A>,
        values: &mut Arena<T, A>,
        source: Handle,
        parent: Option<Handle>,
    ) -> Result<Handle>
    where
        T: Clone,
    {
        let top = self.copy_node(nodes, values, source, parent)?;
        if let Some(right) = self.node(source).right {
            let copy = self.copy_subtree(nodes, values, right, Some(top))?;
            nodes.get_mut(top).right = Some(copy);
        }

        let mut parent = top;
        let mut cursor = self.node(source).left;
        while let Some(source) = cursor {
            let copy = self.copy_node(nodes, values, source, Some(parent))?;
            nodes.get_mut(parent).left = Some(copy);
            if let Some(right) = self.node(source).right {
                let sub = self.copy_subtree(nodes, values, right, Some(copy))?;
                nodes.get_mut(copy).right = Some(sub);
            }
            parent = copy;
            cursor = self.node(source).left;
        }
        Ok(top)
    }

    fn copy_node(
        &self,
        nodes: &mut Arena<Node, A>,
        values: &mut Arena<T, A>,
        source: Handle,
        parent: Option<Handle>,
    ) -> Result<Handle>
    where
        T: Clone,
    {
        let src = self.node(source);
        let value = values.alloc(NAME, self.values.get(src.value).clone())?;
        nodes.alloc(NAME, Node {
            color: src.color,
            parent,
            left: None,
            right: None,
            value,
        })
    }
}

impl<T, S, C, A> RawRBTree<T, S, C, A>
where
    S: KeyOfValue<T>,
    C: Compare<S::Key>,
    A: Allocator,
{
    #[inline]
    pub(crate) fn key_of(&self, handle: Handle) -> &S::Key {
        S::key(self.value(handle))
    }

    #[inline]
    pub(crate) fn less(&self, a: &S::Key, b: &S::Key) -> bool {
        self.compare.less(a, b)
    }

    /// First node whose key is not less than `key`.
    pub(crate) fn lower_bound(&self, key: &S::Key) -> Option<Handle> {
        let mut result = None;
        let mut cursor = self.header.root;
        while let Some(h) = cursor {
            if self.less(self.key_of(h), key) {
                cursor = self.node(h).right;
            } else {
                result = Some(h);
                cursor = self.node(h).left;
            }
        }
        result
    }

    /// First node whose key is greater than `key`.
    pub(crate) fn upper_bound(&self, key: &S::Key) -> Option<Handle> {
        let mut result = None;
        let mut cursor = self.header.root;
        while let Some(h) = cursor {
            if self.less(key, self.key_of(h)) {
                result = Some(h);
                cursor = self.node(h).left;
            } else {
                cursor = self.node(h).right;
            }
        }
        result
    }

    pub(crate) fn find(&self, key: &S::Key) -> Option<Handle> {
        self.lower_bound(key).filter(|&h| !self.less(key, self.key_of(h)))
    }

    /// Inserts `value` unless an equivalent key is present.
    ///
    /// Returns the handle of the new node, or of the existing one with `false`.
    pub(crate) fn insert_unique(&mut self, value: T) -> Result<(Handle, bool)> {
        let (parent, side, existing) = {
            let key = S::key(&value);
            let mut parent = None;
            let mut went_left = true;
            let mut cursor = self.header.root;
            while let Some(h) = cursor {
                parent = Some(h);
                went_left = self.less(key, self.key_of(h));
                cursor = if went_left { self.node(h).left } else { self.node(h).right };
            }

            // Only the in-order predecessor of the insertion point can be equivalent.
            let candidate = if !went_left {
                parent
            } else if parent == self.header.leftmost {
                None
            } else {
                parent.and_then(|p| self.predecessor(p))
            };
            let existing = candidate.filter(|&c| !self.less(self.key_of(c), key));
            (parent, if went_left { Side::Left } else { Side::Right }, existing)
        };

        if let Some(existing) = existing {
            return Ok((existing, false));
        }
        self.link_new(parent, side, value).map(|h| (h, true))
    }

    /// Inserts `value` using `hint` (the node it should precede, `None` for the end)
    /// to skip the search when the hint is right.
    pub(crate) fn insert_unique_hint(&mut self, hint: Option<Handle>, value: T) -> Result<Handle> {
        let slot = {
            let key = S::key(&value);
            match hint {
                None => self
                    .header
                    .rightmost
                    .filter(|&last| self.less(self.key_of(last), key))
                    .map(|last| (last, Side::Right)),
                Some(pos) if Some(pos) == self.header.leftmost => {
                    self.less(key, self.key_of(pos)).then_some((pos, Side::Left))
                }
                Some(pos) => self
                    .predecessor(pos)
                    .filter(|&before| self.less(self.key_of(before), key) && self.less(key, self.key_of(pos)))
                    .map(|before| {
                        if self.node(before).right.is_none() {
                            (before, Side::Right)
                        } else {
                            (pos, Side::Left)
                        }
                    }),
            }
        };

        match slot {
            Some((parent, side)) => self.link_new(Some(parent), side, value),
            None => self.insert_unique(value).map(|(handle, _)| handle),
        }
    }

    /// Verifies the red-black, ordering and bookkeeping properties.
    pub(crate) fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let Some(root) = self.header.root else {
            if self.header.leftmost.is_some() || self.header.rightmost.is_some() {
                return Err(InvariantViolation::Extremes);
            }
            if self.len() != 0 {
                return Err(InvariantViolation::Length {
                    expected: self.len(),
                    actual: 0,
                });
            }
            return Ok(());
        };

        if self.node(root).color == Color::Red {
            return Err(InvariantViolation::RedRoot);
        }
        if self.node(root).parent.is_some() {
            return Err(InvariantViolation::ParentLink);
        }

        let mut reachable = 0;
        self.check_subtree(root, &mut reachable)?;
        if reachable != self.len() || self.nodes.len() != self.len() {
            return Err(InvariantViolation::Length {
                expected: self.len(),
                actual: reachable,
            });
        }

        if self.header.leftmost != Some(node::minimum(&self.nodes, root))
            || self.header.rightmost != Some(node::maximum(&self.nodes, root))
        {
            return Err(InvariantViolation::Extremes);
        }

        let mut previous = None;
        let mut cursor = self.header.leftmost;
        while let Some(h) = cursor {
            if previous.is_some_and(|p| !self.less(self.key_of(p), self.key_of(h))) {
                return Err(InvariantViolation::Order);
            }
            previous = Some(h);
            cursor = self.successor(h);
        }
        Ok(())
    }

    /// Returns the black height of the subtree at `handle`, counting the empty leaves.
    fn check_subtree(&self, handle: Handle, reachable: &mut usize) -> Result<usize, InvariantViolation> {
        *reachable += 1;
        let node = *self.node(handle);
        let mut heights = [1; 2];
        for (height, child) in heights.iter_mut().zip([node.left, node.right]) {
            if let Some(child) = child {
                let child_node = self.node(child);
                if child_node.parent != Some(handle) {
                    return Err(InvariantViolation::ParentLink);
                }
                if node.color == Color::Red && child_node.color == Color::Red {
                    return Err(InvariantViolation::RedChildOfRed);
                }
                *height = self.check_subtree(child, reachable)?;
            }
        }
        if heights[0] != heights[1] {
            return Err(InvariantViolation::BlackHeight);
        }
        Ok(heights[0] + usize::from(node.color == Color::Black))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::memory::CountingAllocator;
    use crate::order::{NaturalOrder, SelectFirst};
    use alloc::vec::Vec;
    use proptest::prelude::*;

    type Tree<A = Global> = RawRBTree<(u32, u32), SelectFirst<u32, u32>, NaturalOrder, A>;

    fn tree() -> Tree {
        RawRBTree::new_in(NaturalOrder, Global)
    }

    fn keys<A: Allocator>(tree: &Tree<A>) -> Vec<u32> {
        let mut out = Vec::new();
        let mut cursor = tree.leftmost();
        while let Some(h) = cursor {
            out.push(tree.value(h).0);
            cursor = tree.successor(h);
        }
        out
    }

    /// Preorder `(key, color)` list, which pins down shape and coloring.
    fn shape(tree: &Tree) -> Vec<(u32, Color)> {
        fn walk(tree: &Tree, handle: Option<Handle>, out: &mut Vec<(u32, Color)>) {
            if let Some(h) = handle {
                out.push((tree.value(h).0, tree.node(h).color));
                walk(tree, tree.node(h).left, out);
                walk(tree, tree.node(h).right, out);
            }
        }
        let mut out = Vec::new();
        walk(tree, tree.header.root, &mut out);
        out
    }

    #[test]
    fn ascending_inserts_stay_balanced() {
        let mut tree = tree();
        for k in 0..1000 {
            let (_, inserted) = tree.insert_unique((k, k)).unwrap();
            assert!(inserted);
        }
        tree.check_invariants().unwrap();
        assert_eq!(keys(&tree), (0..1000).collect::<Vec<_>>());

        // Height is at most 2 * log2(n + 1).
        let mut height = 0;
        let mut cursor = tree.header.leftmost;
        while let Some(h) = cursor {
            height += 1;
            cursor = tree.node(h).parent;
        }
        assert!(height <= 20, "leftmost path has {height} nodes");
    }

    #[test]
    fn duplicate_returns_existing() {
        let mut tree = tree();
        let (first, _) = tree.insert_unique((5, 1)).unwrap();
        tree.insert_unique((3, 0)).unwrap();
        let (again, inserted) = tree.insert_unique((5, 2)).unwrap();
        assert!(!inserted);
        assert_eq!(first, again);
        assert_eq!(tree.value(first).1, 1);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn small_insert_shapes() {
        let mut tree = tree();
        for k in [10, 20, 30] {
            tree.insert_unique((k, 0)).unwrap();
        }
        assert_eq!(shape(&tree), [(20, Color::Black), (10, Color::Red), (30, Color::Red)]);

        tree.insert_unique((25, 0)).unwrap();
        assert_eq!(
            shape(&tree),
            [(20, Color::Black), (10, Color::Black), (30, Color::Black), (25, Color::Red)]
        );
    }

    #[test]
    fn hinted_inserts() {
        let mut tree = tree();
        for k in (1..=100).map(|k| k * 2) {
            tree.insert_unique_hint(None, (k, k)).unwrap();
        }
        tree.check_invariants().unwrap();

        // Correct hint: 51 goes right before 52.
        let at_52 = tree.find(&52).unwrap();
        let h = tree.insert_unique_hint(Some(at_52), (51, 0)).unwrap();
        assert_eq!(tree.successor(h), Some(at_52));

        // Hint at the leftmost node.
        let first = tree.leftmost().unwrap();
        let h = tree.insert_unique_hint(Some(first), (1, 0));
        assert_eq!(tree.successor(h.unwrap()).map(|h| tree.value(h).0), Some(2));

        // Wrong hint falls back to a full search; duplicates are not inserted.
        let before = tree.len();
        let h = tree.insert_unique_hint(Some(first), (40, 7)).unwrap();
        assert_eq!(tree.value(h), &(40, 40));
        assert_eq!(tree.len(), before);
        let h = tree.insert_unique_hint(None, (3, 3)).unwrap();
        assert_eq!(tree.value(h).0, 3);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn bounds() {
        let mut tree = tree();
        for k in [10, 20, 30] {
            tree.insert_unique((k, 0)).unwrap();
        }
        let key = |h: Option<Handle>| h.map(|h| tree.value(h).0);
        assert_eq!(key(tree.lower_bound(&20)), Some(20));
        assert_eq!(key(tree.upper_bound(&20)), Some(30));
        assert_eq!(key(tree.lower_bound(&21)), Some(30));
        assert_eq!(key(tree.lower_bound(&31)), None);
        assert_eq!(key(tree.upper_bound(&5)), Some(10));
        assert_eq!(key(tree.find(&15)), None);
    }

    #[test]
    fn erase_every_position() {
        for victim in 0..64 {
            let mut tree = tree();
            for k in 0..64 {
                tree.insert_unique((k * 7 % 64, k)).unwrap();
            }
            let h = tree.find(&victim).unwrap();
            assert_eq!(tree.erase(h).0, victim);
            tree.check_invariants().unwrap();
            assert_eq!(tree.len(), 63);
            assert!(tree.find(&victim).is_none());
        }
    }

    #[test]
    fn erase_keeps_other_handles() {
        let mut tree = tree();
        let handles: Vec<_> = (0..32).map(|k| tree.insert_unique((k, k)).unwrap().0).collect();
        // Erasing may relocate the successor node; its handle must survive.
        let successor = tree.successor(handles[8]).unwrap();
        tree.erase(handles[8]);
        assert_eq!(tree.value(successor).0, 9);
        for (k, &h) in handles.iter().enumerate() {
            if k != 8 {
                assert_eq!(tree.value(h).0, u32::try_from(k).unwrap());
            }
        }
    }

    #[test]
    fn positions_go_stale() {
        let mut tree = tree();
        let (h, _) = tree.insert_unique((1, 1)).unwrap();
        let pos = tree.position(Some(h));
        assert_eq!(tree.resolve(pos), Some(h));
        assert!(tree.next(pos).is_end());
        assert_eq!(tree.next(Position::END), pos);
        assert_eq!(tree.prev(Position::END), pos);
        tree.erase(h);
        tree.insert_unique((2, 2)).unwrap();
        assert!(!tree.nodes.is_live(h, tree.nodes.generation(h).wrapping_sub(1)));
    }

    #[test]
    #[should_panic(expected = "`RBTreeMap` - position does not refer to a live element!")]
    fn stale_position_panics() {
        let mut tree = tree();
        let (h, _) = tree.insert_unique((1, 1)).unwrap();
        let pos = tree.position(Some(h));
        tree.erase(h);
        tree.insert_unique((1, 1)).unwrap();
        let _ = tree.resolve(pos);
    }

    #[test]
    fn clone_preserves_shape() {
        let mut tree = tree();
        for k in (0..200).rev() {
            tree.insert_unique((k * 13 % 200, k)).unwrap();
        }
        for k in (0..200).step_by(3) {
            if let Some(h) = tree.find(&k) {
                tree.erase(h);
            }
        }
        let copy = tree.try_clone().unwrap();
        copy.check_invariants().unwrap();
        assert_eq!(shape(&copy), shape(&tree));
        assert_eq!(keys(&copy), keys(&tree));
    }

    #[test]
    fn clear_and_drain() {
        let mut tree = tree();
        for k in [5, 1, 9, 3] {
            tree.insert_unique((k, k * 10)).unwrap();
        }
        assert_eq!(tree.drain_to_vec(), [(1, 10), (3, 30), (5, 50), (9, 90)]);
        assert!(tree.is_empty());
        tree.check_invariants().unwrap();

        for k in 0..10 {
            tree.insert_unique((k, k)).unwrap();
        }
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.nodes.len(), 0);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn erase_range_middle() {
        let mut tree = tree();
        for k in 0..10 {
            tree.insert_unique((k, k)).unwrap();
        }
        let first = tree.position(tree.find(&3));
        let last = tree.position(tree.find(&7));
        assert_eq!(tree.erase_range(first, last), 4);
        assert_eq!(keys(&tree), [0, 1, 2, 7, 8, 9]);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn failed_node_allocation_leaves_tree_unchanged() {
        let alloc = CountingAllocator::new();
        let mut tree: Tree<&CountingAllocator> = RawRBTree::new_in(NaturalOrder, &alloc);
        tree.insert_unique((1, 1)).unwrap();

        // The value arena may grow, then the node arena cannot.
        alloc.set_budget(Some(1));
        assert!(matches!(tree.insert_unique((2, 2)), Err(Error::AllocError { .. })));
        assert_eq!(tree.len(), 1);
        assert_eq!(keys(&tree), [1]);
        tree.check_invariants().unwrap();

        alloc.set_budget(None);
        tree.insert_unique((2, 2)).unwrap();
        assert_eq!(keys(&tree), [1, 2]);
        drop(tree);
        assert_eq!(alloc.net_allocations(), 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn random_inserts_and_erases(ops in prop::collection::vec((any::<bool>(), 0..64u32), 0..400)) {
            let mut tree = tree();
            let mut model = alloc::collections::BTreeMap::new();
            for (insert, key) in ops {
                if insert {
                    let (_, inserted) = tree.insert_unique((key, key)).unwrap();
                    prop_assert_eq!(inserted, model.insert(key, key).is_none());
                } else {
                    let erased = tree.find(&key).map(|h| tree.erase(h));
                    prop_assert_eq!(erased.map(|(k, _)| k), model.remove(&key).map(|_| key));
                }
                prop_assert_eq!(tree.check_invariants(), Ok(()));
            }
            prop_assert_eq!(keys(&tree), model.keys().copied().collect::<Vec<_>>());
        }
    }
}
