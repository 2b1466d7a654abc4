//! Control block: the heap record behind every owning handle.
//!
//! One block exists per resource acquisition. It owns the resource pointer,
//! the strong count and the deleter, and it frees itself on the count's
//! 1 -> 0 transition.

use crate::deleter::Deleter;
use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::cell::Cell;
use std::ptr::{self, NonNull};

pub(crate) struct ControlBlock<T: ?Sized, D> {
    ptr: NonNull<T>,
    count: Cell<usize>,
    deleter: D,
}

impl<T: ?Sized, D: Deleter<T>> ControlBlock<T, D> {
    #[inline]
    pub(crate) fn layout() -> Layout {
        Layout::new::<Self>()
    }

    /// Allocate a block with a count of 1.
    ///
    /// On allocation failure the deleter is handed back untouched, and the
    /// caller still owns `ptr`.
    pub(crate) fn try_allocate(ptr: NonNull<T>, deleter: D) -> Result<NonNull<Self>, D> {
        // The block always holds a pointer and a counter, so it is never
        // zero-sized.
        let raw = unsafe { alloc(Self::layout()) }.cast::<Self>();
        let Some(block) = NonNull::new(raw) else {
            log::debug!(
                "control block allocation of {} bytes failed",
                Self::layout().size()
            );
            return Err(deleter);
        };
        unsafe {
            block.as_ptr().write(Self {
                ptr,
                count: Cell::new(1),
                deleter,
            });
        }
        log::trace!("control block {:p} allocated", block);
        Ok(block)
    }

    /// Allocate a block, aborting through `handle_alloc_error` on failure.
    pub(crate) fn allocate(ptr: NonNull<T>, deleter: D) -> NonNull<Self> {
        match Self::try_allocate(ptr, deleter) {
            Ok(block) => block,
            Err(_) => handle_alloc_error(Self::layout()),
        }
    }

    #[inline]
    pub(crate) fn resource(&self) -> NonNull<T> {
        self.ptr
    }

    #[inline]
    pub(crate) fn count(&self) -> usize {
        self.count.get()
    }

    /// Register one more handle. Returns the new count.
    #[inline]
    pub(crate) fn acquire(&self) -> usize {
        let val = self.count.get();
        // Wrapping would let a later release free a block that is still
        // shared; abort like `std::rc::Rc` does.
        let Some(next) = val.checked_add(1) else {
            std::process::abort();
        };
        self.count.set(next);
        next
    }

    /// Drop one handle's reference to `block`.
    ///
    /// On the 1 -> 0 transition the deleter runs on the resource and the block
    /// is deallocated. Deallocation happens even if the deleter unwinds.
    ///
    /// # Safety
    ///
    /// `block` must come from [`allocate`](Self::allocate) or
    /// [`try_allocate`](Self::try_allocate), and the caller must give up one
    /// reference it acquired and never use it again.
    pub(crate) unsafe fn release(block: NonNull<Self>) {
        let remaining = {
            let cb = unsafe { block.as_ref() };
            let val = cb.count.get();
            debug_assert!(val > 0, "Decrementing zero reference count");
            cb.count.set(val - 1);
            val - 1
        };
        if remaining != 0 {
            return;
        }

        let guard = Deallocate(block);
        let cb = unsafe { &mut *block.as_ptr() };
        log::trace!("control block {:p} reached zero, running deleter", block);
        cb.deleter.delete(cb.ptr);
        drop(guard);
    }
}

/// Frees a control block on drop, including during unwinding.
struct Deallocate<T: ?Sized, D>(NonNull<ControlBlock<T, D>>);

impl<T: ?Sized, D> Drop for Deallocate<T, D> {
    fn drop(&mut self) {
        // Armed before the fields drop so a panicking deleter destructor
        // still returns the memory.
        let _free = FreeMemory(self.0);
        unsafe { ptr::drop_in_place(self.0.as_ptr()) };
    }
}

/// Returns a control block's memory to the allocator without dropping it.
struct FreeMemory<T: ?Sized, D>(NonNull<ControlBlock<T, D>>);

impl<T: ?Sized, D> Drop for FreeMemory<T, D> {
    fn drop(&mut self) {
        let block = self.0;
        unsafe {
            dealloc(
                block.as_ptr().cast::<u8>(),
                Layout::new::<ControlBlock<T, D>>(),
            );
        }
        log::trace!("control block {:p} deallocated", block);
    }
}
