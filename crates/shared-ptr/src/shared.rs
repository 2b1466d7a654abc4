//! Reference-counted shared-ownership handle.

use crate::control::ControlBlock;
use crate::deleter::{DefaultDelete, Deleter, DynDeleter};
use crate::error::{AllocError, Error};
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::ptr::NonNull;

/// A shared-ownership pointer with a pluggable destruction policy.
///
/// A handle is either *empty* or shares a control block with every other
/// handle cloned from it. The resource is finalized by the block's deleter
/// exactly once, when the last of those handles is dropped or reset.
///
/// Counting is not atomic: `SharedPtr` is neither `Send` nor `Sync`.
///
/// # Example
///
/// ```
/// use shared_ptr::SharedPtr;
///
/// let data = SharedPtr::new(vec![1, 2, 3]);
/// let shared = data.clone();
///
/// // Both point to the same data
/// assert!(SharedPtr::ptr_eq(&data, &shared));
/// assert_eq!(data.use_count(), 2);
/// assert_eq!(*shared, vec![1, 2, 3]);
/// ```
pub struct SharedPtr<T: ?Sized, D: Deleter<T> = DefaultDelete> {
    block: Option<NonNull<ControlBlock<T, D>>>,
    _marker: PhantomData<ControlBlock<T, D>>,
}

/// A handle whose deleter is type-erased.
///
/// Handles built with different destruction policies share this one type.
pub type DynSharedPtr<T> = SharedPtr<T, DynDeleter<T>>;

impl<T> SharedPtr<T, DefaultDelete> {
    /// Move `value` to the heap and own it.
    pub fn new(value: T) -> Self {
        Self::from(Box::new(value))
    }

    /// Release the current resource, then own `value`.
    pub fn reset_value(&mut self, value: T) {
        self.reset();
        *self = Self::new(value);
    }
}

impl<T: ?Sized> From<Box<T>> for SharedPtr<T, DefaultDelete> {
    fn from(value: Box<T>) -> Self {
        let ptr = NonNull::from(Box::leak(value));
        Self::adopt(ControlBlock::allocate(ptr, DefaultDelete))
    }
}

impl<T: ?Sized> From<Box<T>> for DynSharedPtr<T> {
    fn from(value: Box<T>) -> Self {
        let ptr = NonNull::from(Box::leak(value));
        Self::adopt(ControlBlock::allocate(ptr, DynDeleter::new(DefaultDelete)))
    }
}

impl<T: ?Sized, D: Deleter<T>> SharedPtr<T, D> {
    /// Create an empty handle. Does not allocate.
    #[inline]
    pub const fn empty() -> Self {
        Self {
            block: None,
            _marker: PhantomData,
        }
    }

    #[inline]
    fn adopt(block: NonNull<ControlBlock<T, D>>) -> Self {
        Self {
            block: Some(block),
            _marker: PhantomData,
        }
    }

    /// Take ownership of `ptr` with a default-constructed deleter.
    ///
    /// A null `ptr` yields an empty handle and allocates nothing.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must be valid for reads and writes until the deleter
    /// runs and uniquely owned by the new handle, as if it came from
    /// `Box::into_raw`: nothing else may access, free or mutate it meanwhile.
    /// `D::default()` must be able to finalize it. For [`DefaultDelete`]
    /// this means `ptr` did come from `Box::into_raw`.
    pub unsafe fn from_raw(ptr: *mut T) -> Self
    where
        D: Default,
    {
        unsafe { Self::from_raw_with(ptr, D::default()) }
    }

    /// Take ownership of `ptr`, finalizing it with `deleter`.
    ///
    /// A null `ptr` yields an empty handle; the deleter is dropped unused.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must be valid for reads and writes until the deleter
    /// runs and uniquely owned by the new handle, as if it came from
    /// `Box::into_raw`: nothing else may access, free or mutate it meanwhile,
    /// since [`get_mut`](Self::get_mut) hands out `&mut T` through it.
    /// `deleter` must be able to finalize it.
    pub unsafe fn from_raw_with(ptr: *mut T, deleter: D) -> Self {
        match NonNull::new(ptr) {
            Some(ptr) => Self::adopt(ControlBlock::allocate(ptr, deleter)),
            None => Self::empty(),
        }
    }

    /// Like [`from_raw_with`](Self::from_raw_with), but reports allocation
    /// failure instead of aborting.
    ///
    /// On failure the resource has not been adopted; the error returns both
    /// the pointer and the deleter.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must be valid for reads and writes and uniquely
    /// owned, as if it came from `Box::into_raw`. Same contract as
    /// [`from_raw_with`](Self::from_raw_with).
    pub unsafe fn try_from_raw_with(ptr: *mut T, deleter: D) -> Result<Self, AllocError<T, D>> {
        let Some(ptr) = NonNull::new(ptr) else {
            return Ok(Self::empty());
        };
        ControlBlock::try_allocate(ptr, deleter)
            .map(Self::adopt)
            .map_err(|deleter| AllocError::new(ptr, deleter, ControlBlock::<T, D>::layout().size()))
    }

    #[inline]
    fn control(&self) -> Option<&ControlBlock<T, D>> {
        // SAFETY: a held block stays allocated while this handle counts in it.
        self.block.map(|block| unsafe { &*block.as_ptr() })
    }

    /// Get a shared reference to the resource, or `None` if empty.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.as_ptr().map(|ptr| unsafe { &*ptr.as_ptr() })
    }

    /// Get the raw resource pointer, or `None` if empty.
    #[inline]
    pub fn as_ptr(&self) -> Option<NonNull<T>> {
        self.control().map(ControlBlock::resource)
    }

    /// Dereference, reporting [`Error::Empty`] instead of panicking.
    #[inline]
    pub fn try_deref(&self) -> Result<&T, Error> {
        self.get().ok_or(Error::Empty)
    }

    /// Returns true if the handle owns nothing.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.block.is_none()
    }

    /// Number of handles sharing this resource; 0 when empty.
    #[inline]
    pub fn use_count(&self) -> usize {
        self.control().map_or(0, ControlBlock::count)
    }

    /// Returns true if this is the only handle to its resource.
    #[inline]
    pub fn is_unique(&self) -> bool {
        self.use_count() == 1
    }

    /// Mutable access to the resource when this handle is its sole owner.
    ///
    /// Returns `None` when empty or shared. Relies on every adopted
    /// pointer being uniquely owned and writable (see [`from_raw_with`](Self::from_raw_with)).
    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut T> {
        if self.is_unique() {
            self.as_ptr().map(|ptr| unsafe { &mut *ptr.as_ptr() })
        } else {
            None
        }
    }

    /// Returns true if both handles share one control block.
    ///
    /// Two empty handles compare equal.
    #[inline]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        this.block == other.block
    }

    /// Move the reference out, leaving this handle empty.
    ///
    /// The count is unchanged.
    #[inline]
    pub fn take(&mut self) -> Self {
        Self {
            block: self.block.take(),
            _marker: PhantomData,
        }
    }

    /// Release the held reference, if any, and become empty.
    pub fn reset(&mut self) {
        // Emptied before releasing so an unwinding deleter cannot leave
        // this handle pointing at a freed block.
        if let Some(block) = self.block.take() {
            unsafe { ControlBlock::release(block) };
        }
    }

    /// Release the current resource, then own `ptr` with a
    /// default-constructed deleter.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must be valid for reads and writes and uniquely
    /// owned, as if it came from `Box::into_raw`. Same contract as
    /// [`from_raw`](Self::from_raw).
    pub unsafe fn reset_raw(&mut self, ptr: *mut T)
    where
        D: Default,
    {
        unsafe { self.reset_raw_with(ptr, D::default()) }
    }

    /// Release the current resource, then own `ptr` with `deleter`.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must be valid for reads and writes and uniquely
    /// owned, as if it came from `Box::into_raw`. Same contract as
    /// [`from_raw_with`](Self::from_raw_with).
    pub unsafe fn reset_raw_with(&mut self, ptr: *mut T, deleter: D) {
        self.reset();
        *self = unsafe { Self::from_raw_with(ptr, deleter) };
    }
}

impl<T: ?Sized, D: Deleter<T>> Clone for SharedPtr<T, D> {
    #[inline]
    fn clone(&self) -> Self {
        if let Some(cb) = self.control() {
            cb.acquire();
        }
        Self {
            block: self.block,
            _marker: PhantomData,
        }
    }

    /// Share `source`'s resource, releasing the previous one.
    ///
    /// A no-op when both already share a block, so assigning a handle to
    /// itself never drops the count to zero.
    fn clone_from(&mut self, source: &Self) {
        if Self::ptr_eq(self, source) {
            return;
        }
        self.reset();
        *self = source.clone();
    }
}

impl<T: ?Sized, D: Deleter<T>> Drop for SharedPtr<T, D> {
    #[inline]
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T: ?Sized, D: Deleter<T>> Default for SharedPtr<T, D> {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: ?Sized, D: Deleter<T>> Deref for SharedPtr<T, D> {
    type Target = T;

    /// # Panics
    ///
    /// Panics if the handle is empty. Use [`SharedPtr::try_deref`] or
    /// [`SharedPtr::get`] to check instead.
    #[inline]
    #[allow(clippy::panic)]
    fn deref(&self) -> &Self::Target {
        match self.get() {
            Some(value) => value,
            None => panic!("{}", Error::Empty),
        }
    }
}

impl<T: ?Sized + fmt::Debug, D: Deleter<T>> fmt::Debug for SharedPtr<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) => f
                .debug_struct("SharedPtr")
                .field("value", &value)
                .field("use_count", &self.use_count())
                .finish(),
            None => f.write_str("SharedPtr(empty)"),
        }
    }
}

impl<T: ?Sized, D: Deleter<T>> fmt::Pointer for SharedPtr<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_ptr() {
            Some(ptr) => fmt::Pointer::fmt(&ptr, f),
            None => fmt::Pointer::fmt(&std::ptr::null::<u8>(), f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Tracker(Rc<Cell<usize>>);

    impl Drop for Tracker {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_new_and_get() {
        let p = SharedPtr::new(42);
        assert_eq!(p.get(), Some(&42));
        assert_eq!(*p, 42);
        assert_eq!(p.use_count(), 1);
        assert!(!p.is_empty());
    }

    #[test]
    fn test_empty_handle() {
        let p: SharedPtr<i32> = SharedPtr::empty();
        assert!(p.is_empty());
        assert_eq!(p.get(), None);
        assert_eq!(p.as_ptr(), None);
        assert_eq!(p.use_count(), 0);
        assert_eq!(p.try_deref(), Err(Error::Empty));
    }

    #[test]
    fn test_default_is_empty() {
        let p: SharedPtr<String> = SharedPtr::default();
        assert!(p.is_empty());
    }

    #[test]
    fn test_from_null_is_empty() {
        let p: SharedPtr<i32> = unsafe { SharedPtr::from_raw(std::ptr::null_mut()) };
        assert!(p.is_empty());
        assert_eq!(p.get(), None);
    }

    #[test]
    fn test_clone_shares_block() {
        let p1 = SharedPtr::new(String::from("shared"));
        let p2 = p1.clone();

        assert!(SharedPtr::ptr_eq(&p1, &p2));
        assert_eq!(p1.use_count(), 2);
        assert_eq!(p1.as_ptr(), p2.as_ptr());
    }

    #[test]
    fn test_take_leaves_source_empty() {
        let mut p1 = SharedPtr::new(5);
        let p2 = p1.clone();
        let p3 = p1.take();

        assert!(p1.is_empty());
        assert_eq!(p2.use_count(), 2);
        assert_eq!(*p3, 5);
    }

    #[test]
    fn test_reset_releases_once() {
        let drops = Rc::new(Cell::new(0));
        let mut p = SharedPtr::new(Tracker(drops.clone()));

        p.reset();
        assert!(p.is_empty());
        assert_eq!(drops.get(), 1);

        p.reset();
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn test_reset_value_replaces() {
        let drops = Rc::new(Cell::new(0));
        let mut p = SharedPtr::new(Tracker(drops.clone()));
        p.reset_value(Tracker(drops.clone()));

        assert_eq!(drops.get(), 1);
        assert!(p.is_unique());
        drop(p);
        assert_eq!(drops.get(), 2);
    }

    #[test]
    fn test_clone_from_same_block_is_noop() {
        let drops = Rc::new(Cell::new(0));
        let mut p1 = SharedPtr::new(Tracker(drops.clone()));
        let p2 = p1.clone();

        p1.clone_from(&p2);
        assert_eq!(p1.use_count(), 2);
        assert_eq!(drops.get(), 0);
    }

    #[test]
    fn test_clone_from_switches_resource() {
        let drops = Rc::new(Cell::new(0));
        let mut p1 = SharedPtr::new(Tracker(drops.clone()));
        let p2 = SharedPtr::new(Tracker(drops.clone()));

        p1.clone_from(&p2);
        assert_eq!(drops.get(), 1);
        assert!(SharedPtr::ptr_eq(&p1, &p2));
        assert_eq!(p2.use_count(), 2);
    }

    #[test]
    fn test_get_mut_only_when_unique() {
        let mut p = SharedPtr::new(vec![1, 2, 3]);
        p.get_mut().unwrap().push(4);
        assert_eq!(*p, vec![1, 2, 3, 4]);

        let _q = p.clone();
        assert!(p.get_mut().is_none());
    }

    #[test]
    fn test_unsized_from_box() {
        let p: SharedPtr<str> = SharedPtr::from(Box::<str>::from("text"));
        assert_eq!(&*p, "text");

        let q: SharedPtr<[u8]> = SharedPtr::from(vec![1u8, 2, 3].into_boxed_slice());
        assert_eq!(q.len(), 3);
    }

    #[test]
    fn test_try_deref_ok() {
        let p = SharedPtr::new(String::from("value"));
        assert_eq!(p.try_deref().map(String::as_str), Ok("value"));
    }

    #[test]
    fn test_pointer_format() {
        let p = SharedPtr::new(1u64);
        let expected = format!("{:p}", p.as_ptr().unwrap());
        assert_eq!(format!("{:p}", p), expected);

        let e: SharedPtr<u64> = SharedPtr::empty();
        assert_eq!(format!("{:p}", e), format!("{:p}", std::ptr::null::<u8>()));
    }

    #[test]
    fn test_debug_format() {
        let p = SharedPtr::new(7);
        assert_eq!(format!("{:?}", p), "SharedPtr { value: 7, use_count: 1 }");

        let e: SharedPtr<i32> = SharedPtr::empty();
        assert_eq!(format!("{:?}", e), "SharedPtr(empty)");
    }

    #[test]
    #[should_panic(expected = "dereferenced an empty shared pointer")]
    fn test_deref_empty_panics() {
        let p: SharedPtr<i32> = SharedPtr::empty();
        let _value: i32 = *p;
    }
}
