//! Destruction policies.
//!
//! A [`Deleter`] finalizes the resource owned by a control block. It runs at
//! most once, when the last handle sharing the block is released.

use std::fmt;
use std::ptr::NonNull;

/// Finalizes a resource given its pointer.
///
/// Implemented by [`DefaultDelete`], by every `FnMut(NonNull<T>)` (free
/// functions and capturing closures), and by [`DynDeleter`]. Stateful
/// functors implement it directly.
///
/// # Example
///
/// ```
/// use shared_ptr::{Deleter, SharedPtr};
/// use std::ptr::NonNull;
///
/// struct Announce(&'static str);
///
/// impl Deleter<i32> for Announce {
///     fn delete(&mut self, ptr: NonNull<i32>) {
///         println!("{}", self.0);
///         drop(unsafe { Box::from_raw(ptr.as_ptr()) });
///     }
/// }
///
/// let raw = Box::into_raw(Box::new(7));
/// let handle = unsafe { SharedPtr::from_raw_with(raw, Announce("bye")) };
/// assert_eq!(*handle, 7);
/// ```
pub trait Deleter<T: ?Sized> {
    /// Finalize the resource at `ptr`.
    ///
    /// `ptr` is the pointer the owning handle was constructed with.
    fn delete(&mut self, ptr: NonNull<T>);
}

/// Reclaims a resource allocated with `Box`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultDelete;

impl<T: ?Sized> Deleter<T> for DefaultDelete {
    #[inline]
    fn delete(&mut self, ptr: NonNull<T>) {
        // SAFETY: handles using `DefaultDelete` only adopt pointers produced
        // by `Box::into_raw`, and the control block calls this exactly once.
        drop(unsafe { Box::from_raw(ptr.as_ptr()) });
    }
}

impl<T: ?Sized, F> Deleter<T> for F
where
    F: FnMut(NonNull<T>),
{
    #[inline]
    fn delete(&mut self, ptr: NonNull<T>) {
        self(ptr)
    }
}

/// A type-erased deleter.
///
/// Any `'static` deleter fits behind this one concrete type, so handles
/// with different destruction policies share the type
/// [`DynSharedPtr<T>`](crate::DynSharedPtr).
pub struct DynDeleter<T: ?Sized> {
    inner: Box<dyn Deleter<T>>,
}

impl<T: ?Sized> DynDeleter<T> {
    /// Erase the type of `deleter`.
    pub fn new<D>(deleter: D) -> Self
    where
        D: Deleter<T> + 'static,
    {
        Self {
            inner: Box::new(deleter),
        }
    }
}

impl<T: ?Sized> Default for DynDeleter<T> {
    fn default() -> Self {
        Self::new(DefaultDelete)
    }
}

impl<T: ?Sized> Deleter<T> for DynDeleter<T> {
    #[inline]
    fn delete(&mut self, ptr: NonNull<T>) {
        (*self.inner).delete(ptr)
    }
}

impl<T: ?Sized> fmt::Debug for DynDeleter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynDeleter").finish_non_exhaustive()
    }
}
