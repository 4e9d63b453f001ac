//! Diagnostic heap allocation layer for the Strand sequence toolkit.
//!
//! Wraps the platform allocator with policy, not mechanism: every
//! allocation, resize, and free goes through a [`Heap`], which rejects
//! zero-byte requests, converts exhaustion into a catchable fault (or
//! an absent result, per call), and — when instrumented — accumulates
//! process-wide statistics and supports heap-corruption probing. It is
//! not an allocator itself: no free lists, no size classes, no
//! alignment management. The actual memory comes from the delegate
//! ([`DelegateAlloc`], backed by `std::alloc` in production).
//!
//! # Architecture
//!
//! ```text
//! Heap (policy + bookkeeping)
//! ├── DelegateAlloc        platform alloc/realloc/dealloc seam
//! ├── Box<dyn FaultChannel> raises BadCount / AllocationFailed
//! ├── Box<dyn ReportSink>   statistics + probe status lines
//! ├── Box<dyn HeapChecker>  heap-consistency probe seam
//! ├── Ledger                byte/count accumulators + per-site table
//! └── ProbeState            single-slot armed probe
//! ```
//!
//! # Safety
//!
//! This is the one crate in the workspace permitted to contain
//! `unsafe` code. It is confined to [`block`] and [`delegate`]; the
//! policy layer in [`heap`] is entirely safe.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod block;
pub mod config;
pub mod delegate;
pub mod heap;
pub mod ledger;
pub mod probe;

pub use block::Block;
pub use config::HeapConfig;
pub use delegate::{DelegateAlloc, SystemAlloc};
pub use heap::Heap;
pub use ledger::{Ledger, LedgerReport, LedgerTotals, SiteStats};
pub use probe::{DisabledChecker, HeapChecker, ProbeStatus};

// The policy surface re-exports its collaborators so callers need a
// single `use strand_mem::...` for the common path.
pub use strand_core::{FailurePolicy, Fault};
