//! Allocator-aware sequence and ordered-map containers for Rust.
//!
//! This crate provides three containers, each of which reports allocation
//! failure through a [`Result`] instead of aborting:
//!
//! - [`Vector`] - a contiguous growable array with geometric growth, checked
//!   access and a strong guarantee on every growing operation
//! - [`RBTreeMap`] - an ordered map with unique keys, backed by a red-black
//!   tree, with stable [`Position`]s and hinted insertion
//! - [`Stack`] - a LIFO adapter over any [`BackSequence`], [`Vector`] by default
//!
//! # Example
//!
//! ```
//! use rb_collections::{RBTreeMap, Stack, Vector};
//!
//! let mut scores = RBTreeMap::new();
//! scores.insert("Carol", 92)?;
//! scores.insert("Alice", 100)?;
//! scores.insert("Bob", 85)?;
//!
//! // Iteration is in key order.
//! let names: Vector<&str> = scores.keys().copied().collect();
//! assert_eq!(names.as_slice(), ["Alice", "Bob", "Carol"]);
//!
//! // Checked access reports errors instead of panicking.
//! assert!(names.at(3).is_err());
//!
//! let mut stack: Stack<i32> = Stack::new();
//! stack.push(1)?;
//! stack.push(2)?;
//! assert_eq!(stack.pop(), Some(2));
//! # Ok::<(), rb_collections::Error>(())
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Only requires `alloc`, no standard library dependency
//! - **Explicit allocators** - Every container is generic over an
//!   [`allocator_api2`] [`Allocator`]; [`CountingAllocator`] can impose a budget
//!   to exercise the failure paths
//! - **Strong guarantee** - A growing operation that fails leaves its container untouched
//!
//! # Implementation
//!
//! The map keeps its nodes in a generational arena: links and colors in one
//! slot array, entries in another. Nodes refer to each other by 32-bit
//! handles, and a [`Position`] carries the slot generation so that a
//! position whose element has been removed is detected rather than silently
//! pointing at a reused slot.

#![no_std]
// These forbid rules and lint groups are meant to be very restrictive.
// NOTE: We have to allow unsafe code to manage uninitialized storage in `Vector`.
// #![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;
#[cfg(test)]
extern crate std;

mod error;
mod raw;

pub mod iterator;
pub mod memory;
pub mod order;
pub mod rb_tree_map;
pub mod stack;
pub mod vector;

pub use error::{Error, Result};
pub use iterator::{IterCategory, Traversal};
pub use memory::{Allocator, CountingAllocator, Global};
pub use order::{Compare, NaturalOrder, Reverse};
pub use rb_tree_map::{InvariantViolation, Position, RBTreeMap};
pub use stack::{BackSequence, Stack};
pub use vector::Vector;
