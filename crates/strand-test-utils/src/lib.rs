//! Test doubles for Strand development.
//!
//! Provides mock implementations of the allocation layer's trait
//! seams: an exhaustion-injecting [`DelegateAlloc`] and a scripted
//! [`HeapChecker`]. The buffering report sink lives in `strand-core`
//! ([`strand_core::BufferSink`]) because production code also uses
//! the sink abstraction.

#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::alloc::Layout;
use std::collections::VecDeque;
use std::ptr::NonNull;

use strand_mem::{DelegateAlloc, HeapChecker, ProbeStatus, SystemAlloc};

/// Delegate that satisfies a budget of requests through the real
/// allocator, then refuses everything.
///
/// Frees always pass through, so blocks obtained before exhaustion
/// can still be released.
#[derive(Clone, Copy, Debug)]
pub struct FlakyAlloc {
    inner: SystemAlloc,
    remaining: usize,
}

impl FlakyAlloc {
    /// Succeed for the next `budget` fallible requests, then refuse.
    pub fn after(budget: usize) -> Self {
        Self {
            inner: SystemAlloc,
            remaining: budget,
        }
    }

    /// Refuse every request from the start.
    pub fn exhausted() -> Self {
        Self::after(0)
    }

    fn permit(&mut self) -> bool {
        if self.remaining > 0 {
            self.remaining -= 1;
            true
        } else {
            false
        }
    }
}

impl DelegateAlloc for FlakyAlloc {
    fn alloc(&mut self, layout: Layout) -> Option<NonNull<u8>> {
        if self.permit() {
            self.inner.alloc(layout)
        } else {
            None
        }
    }

    fn alloc_zeroed(&mut self, layout: Layout) -> Option<NonNull<u8>> {
        if self.permit() {
            self.inner.alloc_zeroed(layout)
        } else {
            None
        }
    }

    unsafe fn realloc(
        &mut self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        if self.permit() {
            // SAFETY: forwarded verbatim; the caller upholds the
            // DelegateAlloc contract for ptr/old_layout/new_size.
            unsafe { self.inner.realloc(ptr, old_layout, new_size) }
        } else {
            None
        }
    }

    unsafe fn dealloc(&mut self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded verbatim.
        unsafe { self.inner.dealloc(ptr, layout) }
    }
}

/// Consistency checker that replays a scripted sequence of verdicts,
/// then reports [`ProbeStatus::Ok`] once the script runs out.
#[derive(Clone, Debug, Default)]
pub struct ScriptedChecker {
    verdicts: VecDeque<ProbeStatus>,
}

impl ScriptedChecker {
    pub fn new(verdicts: impl IntoIterator<Item = ProbeStatus>) -> Self {
        Self {
            verdicts: verdicts.into_iter().collect(),
        }
    }

    /// A checker that always reports `Ok`.
    pub fn always_ok() -> Self {
        Self::default()
    }
}

impl HeapChecker for ScriptedChecker {
    fn inspect(&mut self, _address: NonNull<u8>) -> ProbeStatus {
        self.verdicts.pop_front().unwrap_or(ProbeStatus::Ok)
    }
}
