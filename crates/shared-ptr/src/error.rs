//! Error types.

use std::fmt;
use std::ptr::NonNull;
use thiserror::Error;

/// Failures reported by handle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// The handle owns no resource.
    #[error("dereferenced an empty shared pointer")]
    Empty,
}

/// A control block could not be allocated.
///
/// Returned by [`SharedPtr::try_from_raw_with`](crate::SharedPtr::try_from_raw_with).
/// The resource was never adopted: [`into_parts`](Self::into_parts) gives the
/// pointer and the deleter back to the caller.
#[derive(Error)]
#[error("failed to allocate a {size}-byte control block")]
pub struct AllocError<T: ?Sized, D> {
    ptr: NonNull<T>,
    deleter: D,
    size: usize,
}

impl<T: ?Sized, D> AllocError<T, D> {
    pub(crate) fn new(ptr: NonNull<T>, deleter: D, size: usize) -> Self {
        Self { ptr, deleter, size }
    }

    /// Size in bytes of the block that could not be allocated.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Reclaim the resource pointer and the deleter.
    pub fn into_parts(self) -> (NonNull<T>, D) {
        (self.ptr, self.deleter)
    }
}

impl<T: ?Sized, D> fmt::Debug for AllocError<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllocError")
            .field("ptr", &self.ptr)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Error::Empty.to_string(),
            "dereferenced an empty shared pointer"
        );

        let mut value = 9;
        let err = AllocError::new(NonNull::from(&mut value), (), 24);
        assert_eq!(err.to_string(), "failed to allocate a 24-byte control block");
        assert_eq!(err.size(), 24);
    }

    #[test]
    fn test_into_parts_returns_ownership() {
        let raw = Box::into_raw(Box::new(String::from("kept")));
        let ptr = NonNull::new(raw).unwrap();
        let err = AllocError::new(ptr, "deleter", 32);

        let (back, deleter) = err.into_parts();
        assert_eq!(back, ptr);
        assert_eq!(deleter, "deleter");
        assert_eq!(*unsafe { Box::from_raw(back.as_ptr()) }, "kept");
    }
}
