//! Owned heap blocks.
//!
//! A [`Block`] is a contiguous, byte-aligned heap region owned by
//! exactly one caller at a time. "Absent" is spelled `Option<Block>`
//! = `None` throughout the crate. Dropping a block releases its
//! memory; releasing through [`Heap::free`](crate::Heap::free) is
//! preferred because it also keeps the statistics ledger truthful.
//!
//! All `unsafe` interaction between blocks and the delegate allocator
//! lives in this module's crate-private helpers, so the policy layer
//! in [`heap`](crate::heap) stays safe.

#![allow(unsafe_code)]

use std::alloc::Layout;
use std::mem::ManuallyDrop;
use std::ptr::NonNull;
use std::slice;

use crate::delegate::DelegateAlloc;

/// An owned heap region of at least one byte.
///
/// Content is uninitialised after a plain allocation or past the old
/// length after a non-zeroing resize; callers must write before
/// reading those ranges. The zeroing primitives return fully
/// initialised blocks.
pub struct Block {
    ptr: NonNull<u8>,
    len: usize,
}

impl Block {
    /// Wrap a delegate-provided region.
    ///
    /// # Safety
    ///
    /// `ptr` must point to `len >= 1` bytes obtained from the global
    /// allocator with `byte_layout(len)`, exclusively owned by the
    /// new block.
    unsafe fn from_raw(ptr: NonNull<u8>, len: usize) -> Self {
        debug_assert!(len >= 1);
        Self { ptr, len }
    }

    /// Disassemble without releasing; the caller takes ownership of
    /// the raw region.
    fn into_raw(self) -> (NonNull<u8>, usize) {
        let this = ManuallyDrop::new(self);
        (this.ptr, this.len)
    }

    /// Length in bytes. Always at least 1.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`; blocks are never zero-length. Present for
    /// clippy's `len_without_is_empty` convention.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Raw read pointer to the first byte.
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Raw write pointer to the first byte.
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    pub(crate) fn addr(&self) -> NonNull<u8> {
        self.ptr
    }

    /// The whole region as a byte slice.
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: ptr/len describe an owned live region.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// The whole region as a mutable byte slice.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: ptr/len describe an owned live region, borrowed
        // mutably through self.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        // SAFETY: ptr was allocated from the global allocator with
        // exactly this layout (the DelegateAlloc contract), and drop
        // runs at most once.
        unsafe {
            std::alloc::dealloc(
                self.ptr.as_ptr(),
                Layout::from_size_align_unchecked(self.len, 1),
            );
        }
    }
}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Block")
            .field("addr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

/// Byte-aligned layout for `len` bytes; `None` when `len` overflows
/// the platform's layout limits (treated as exhaustion upstream).
fn byte_layout(len: usize) -> Option<Layout> {
    Layout::from_size_align(len, 1).ok()
}

/// Obtain `len` bytes from the delegate. `None` on exhaustion.
pub(crate) fn acquire<D: DelegateAlloc>(
    delegate: &mut D,
    len: usize,
    zeroed: bool,
) -> Option<Block> {
    let layout = byte_layout(len)?;
    let ptr = if zeroed {
        delegate.alloc_zeroed(layout)?
    } else {
        delegate.alloc(layout)?
    };
    // SAFETY: ptr was just obtained from the delegate for this layout.
    Some(unsafe { Block::from_raw(ptr, len) })
}

/// Return `block` to the delegate.
pub(crate) fn release<D: DelegateAlloc>(delegate: &mut D, block: Block) {
    let (ptr, len) = block.into_raw();
    // SAFETY: ptr/len came out of a live block, so they match the
    // layout the delegate originally produced.
    unsafe {
        delegate.dealloc(ptr, Layout::from_size_align_unchecked(len, 1));
    }
}

/// Resize `block` to `new_len` bytes through the delegate, preserving
/// the first `min(old, new)` bytes.
///
/// Ownership of `block` transfers in: on success the (possibly
/// relocated) region comes back as a fresh block; on exhaustion the
/// old region is released and `None` returned — the caller's
/// reference is invalid either way.
pub(crate) fn regrow<D: DelegateAlloc>(
    delegate: &mut D,
    block: Block,
    new_len: usize,
) -> Option<Block> {
    let (ptr, old_len) = block.into_raw();
    // SAFETY: ptr/old_len come from a live block.
    let old_layout = unsafe { Layout::from_size_align_unchecked(old_len, 1) };
    if byte_layout(new_len).is_none() {
        // SAFETY: old region still owned here; release it before
        // reporting exhaustion.
        unsafe { delegate.dealloc(ptr, old_layout) };
        return None;
    }
    // SAFETY: ptr was produced by this delegate with old_layout and
    // new_len >= 1 (normalised by the policy layer).
    match unsafe { delegate.realloc(ptr, old_layout, new_len) } {
        // SAFETY: realloc handed back a region of new_len bytes.
        Some(moved) => Some(unsafe { Block::from_raw(moved, new_len) }),
        None => {
            // Old region untouched on realloc failure; release it so
            // the invalidated reference does not leak.
            // SAFETY: ptr still owns the old region.
            unsafe { delegate.dealloc(ptr, old_layout) };
            None
        }
    }
}
