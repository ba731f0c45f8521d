use super::arena::Arena;
use super::handle::Handle;
use crate::memory::Allocator;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Color {
    Red,
    Black,
}

/// Which child slot of a parent a new node is linked into.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Side {
    Left,
    Right,
}

impl Side {
    pub(crate) const fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

// Links only; the element lives in the value arena under `value`.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Node {
    pub(crate) color: Color,
    pub(crate) parent: Option<Handle>,
    pub(crate) left: Option<Handle>,
    pub(crate) right: Option<Handle>,
    pub(crate) value: Handle,
}

impl Node {
    /// A detached red node, the color every inserted node starts with.
    pub(crate) const fn new(parent: Option<Handle>, value: Handle) -> Self {
        Self {
            color: Color::Red,
            parent,
            left: None,
            right: None,
            value,
        }
    }
}

/// Root and extreme nodes of a tree. All three are `None` exactly when the tree is empty.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct Header {
    pub(crate) root: Option<Handle>,
    pub(crate) leftmost: Option<Handle>,
    pub(crate) rightmost: Option<Handle>,
}

// Navigation works on the node arena alone so that iterators can walk the
// tree without borrowing the values.

pub(crate) fn minimum<A: Allocator>(nodes: &Arena<Node, A>, mut handle: Handle) -> Handle {
    while let Some(left) = nodes.get(handle).left {
        handle = left;
    }
    handle
}

pub(crate) fn maximum<A: Allocator>(nodes: &Arena<Node, A>, mut handle: Handle) -> Handle {
    while let Some(right) = nodes.get(handle).right {
        handle = right;
    }
    handle
}

/// In-order successor, or `None` after the rightmost node.
pub(crate) fn successor<A: Allocator>(nodes: &Arena<Node, A>, handle: Handle) -> Option<Handle> {
    if let Some(right) = nodes.get(handle).right {
        return Some(minimum(nodes, right));
    }
    let mut child = handle;
    let mut parent = nodes.get(handle).parent;
    while let Some(p) = parent {
        if nodes.get(p).right != Some(child) {
            break;
        }
        child = p;
        parent = nodes.get(p).parent;
    }
    parent
}

/// In-order predecessor, or `None` before the leftmost node.
pub(crate) fn predecessor<A: Allocator>(nodes: &Arena<Node, A>, handle: Handle) -> Option<Handle> {
    if let Some(left) = nodes.get(handle).left {
        return Some(maximum(nodes, left));
    }
    let mut child = handle;
    let mut parent = nodes.get(handle).parent;
    while let Some(p) = parent {
        if nodes.get(p).left != Some(child) {
            break;
        }
        child = p;
        parent = nodes.get(p).parent;
    }
    parent
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::memory::Global;
    use alloc::vec::Vec;

    fn link(nodes: &mut Arena<Node, Global>, parent: Handle, child: Handle, side: Side) {
        nodes.get_mut(child).parent = Some(parent);
        match side {
            Side::Left => nodes.get_mut(parent).left = Some(child),
            Side::Right => nodes.get_mut(parent).right = Some(child),
        }
    }

    #[test]
    fn walks_in_order() {
        // Shape:     d
        //          b   f
        //         a c   g
        let mut nodes = Arena::new_in(Global);
        let dummy = Handle::from_index(0);
        let [a, b, c, d, f, g] = [0; 6].map(|_| nodes.alloc("test", Node::new(None, dummy)).unwrap());
        link(&mut nodes, d, b, Side::Left);
        link(&mut nodes, d, f, Side::Right);
        link(&mut nodes, b, a, Side::Left);
        link(&mut nodes, b, c, Side::Right);
        link(&mut nodes, f, g, Side::Right);

        assert_eq!(minimum(&nodes, d), a);
        assert_eq!(maximum(&nodes, d), g);

        let mut forward = Vec::new();
        let mut cursor = Some(a);
        while let Some(h) = cursor {
            forward.push(h);
            cursor = successor(&nodes, h);
        }
        assert_eq!(forward, [a, b, c, d, f, g]);

        let mut backward = Vec::new();
        let mut cursor = Some(g);
        while let Some(h) = cursor {
            backward.push(h);
            cursor = predecessor(&nodes, h);
        }
        assert_eq!(backward, [g, f, d, c, b, a]);
    }
}
