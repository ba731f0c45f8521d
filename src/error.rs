//! Error type shared by every container in the crate.

use core::alloc::Layout;

use thiserror::Error;

/// Errors reported by fallible container operations.
///
/// Every fallible operation either fully succeeds or returns one of these
/// with the container left exactly as it was before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Checked element access with an index outside `0..len`.
    #[error("{container}: index {index} is out of range for length {len}")]
    OutOfRange {
        /// The container that rejected the access.
        container: &'static str,
        /// The requested index.
        index: usize,
        /// The container's length at the time of the call.
        len: usize,
    },

    /// Checked keyed access with a key that is not present.
    #[error("{container}: key not found")]
    KeyNotFound {
        /// The container that rejected the access.
        container: &'static str,
    },

    /// A requested size or capacity exceeds the container's maximum.
    #[error("{container}: requested {requested} elements, maximum is {max}")]
    LengthError {
        /// The container that rejected the request.
        container: &'static str,
        /// The requested number of elements.
        requested: usize,
        /// The container's `max_size()`.
        max: usize,
    },

    /// The allocator could not satisfy a request.
    #[error("memory allocation of {} bytes failed", layout.size())]
    AllocError {
        /// The layout that could not be allocated.
        layout: Layout,
    },
}

impl Error {
    pub(crate) const fn out_of_range(container: &'static str, index: usize, len: usize) -> Self {
        Self::OutOfRange { container, index, len }
    }

    pub(crate) const fn key_not_found(container: &'static str) -> Self {
        Self::KeyNotFound { container }
    }

    pub(crate) const fn length(container: &'static str, requested: usize, max: usize) -> Self {
        Self::LengthError { container, requested, max }
    }

    pub(crate) const fn alloc(layout: Layout) -> Self {
        Self::AllocError { layout }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Unwraps `result`, diverting allocation failures to [`handle_alloc_error`].
///
/// Used by infallible trait impls (`Clone`, `Extend`, `FromIterator`) which
/// have no way to report an error, matching the standard collections.
///
/// [`handle_alloc_error`]: alloc::alloc::handle_alloc_error
pub(crate) fn unwrap_infallible<T>(result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(Error::AllocError { layout }) => alloc::alloc::handle_alloc_error(layout),
        Err(err) => panic!("{err}"),
    }
}
