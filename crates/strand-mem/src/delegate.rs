//! The delegate allocator seam.
//!
//! [`DelegateAlloc`] is the boundary between the policy layer and the
//! platform's raw memory primitives. Production code uses
//! [`SystemAlloc`]; tests substitute exhaustion-injecting delegates
//! to exercise the failure paths without consuming real memory.

#![allow(unsafe_code)]

use std::alloc::Layout;
use std::ptr::NonNull;

/// Raw allocate/resize/free primitives wrapped by the policy layer.
///
/// # Contract
///
/// Returned memory must be obtained from the global allocator with the
/// exact `Layout` passed in, because a [`Block`](crate::Block) releases
/// its memory through `std::alloc::dealloc` when dropped. Delegates
/// that inject failures must do so by *refusing* requests, never by
/// handing out memory from anywhere else.
pub trait DelegateAlloc {
    /// Allocate `layout.size()` bytes of uninitialised memory, or
    /// `None` on exhaustion.
    fn alloc(&mut self, layout: Layout) -> Option<NonNull<u8>>;

    /// Allocate `layout.size()` bytes of zero-initialised memory, or
    /// `None` on exhaustion.
    fn alloc_zeroed(&mut self, layout: Layout) -> Option<NonNull<u8>>;

    /// Grow or shrink the region at `ptr` to `new_size` bytes,
    /// preserving the first `min(old, new)` bytes and possibly
    /// relocating. `None` on exhaustion, in which case the old region
    /// is untouched and still owned by the caller.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this delegate with
    /// `old_layout`, and `new_size` must be non-zero.
    unsafe fn realloc(
        &mut self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_size: usize,
    ) -> Option<NonNull<u8>>;

    /// Release the region at `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this delegate with `layout`
    /// and not yet released.
    unsafe fn dealloc(&mut self, ptr: NonNull<u8>, layout: Layout);
}

/// The production delegate: a thin pass-through to `std::alloc`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemAlloc;

impl DelegateAlloc for SystemAlloc {
    fn alloc(&mut self, layout: Layout) -> Option<NonNull<u8>> {
        // SAFETY: the policy layer never builds a zero-size layout.
        NonNull::new(unsafe { std::alloc::alloc(layout) })
    }

    fn alloc_zeroed(&mut self, layout: Layout) -> Option<NonNull<u8>> {
        // SAFETY: as above, layout.size() >= 1.
        NonNull::new(unsafe { std::alloc::alloc_zeroed(layout) })
    }

    unsafe fn realloc(
        &mut self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        // SAFETY: caller guarantees ptr/old_layout come from this
        // delegate and new_size >= 1.
        NonNull::new(unsafe { std::alloc::realloc(ptr.as_ptr(), old_layout, new_size) })
    }

    unsafe fn dealloc(&mut self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: caller guarantees ptr/layout come from this delegate.
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
    }
}
