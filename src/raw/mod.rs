mod arena;
mod handle;
pub(crate) mod node;
mod position;
mod raw_rb_tree;

pub(crate) use arena::Arena;
pub(crate) use handle::Handle;
pub(crate) use node::Node;
pub(crate) use raw_rb_tree::{NAME, RawRBTree};

pub use position::Position;
pub use raw_rb_tree::InvariantViolation;
