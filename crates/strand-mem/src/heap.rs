//! The allocation primitives.
//!
//! [`Heap`] is the policy layer callers go through for every
//! allocation, resize, and free. Each public primitive captures its
//! caller's source location via `#[track_caller]` (replacing the
//! original toolkit's file/line macro arguments) and forwards to an
//! internal variant that takes the location explicitly, so locations
//! attribute to the real call site rather than to this module.
//!
//! Failure handling follows one shape everywhere: the delegate path
//! produces a block or exhaustion, and a single adapter converts
//! exhaustion into either an absent result
//! ([`FailurePolicy::ReturnNull`]) or a fault-channel raise
//! ([`FailurePolicy::Fail`]). Bad counts bypass the policy entirely —
//! they are caller bugs, raised unconditionally.

use std::panic::Location;

use strand_core::{
    FailurePolicy, Fault, FaultChannel, PanicChannel, ReportLevel, ReportSink, StderrSink,
};

use crate::block::{self, Block};
use crate::config::HeapConfig;
use crate::delegate::{DelegateAlloc, SystemAlloc};
use crate::ledger::{Ledger, LedgerReport};
use crate::probe::{ArmedProbe, DisabledChecker, HeapChecker, ProbeState, ProbeStatus};

/// Diagnostic wrapper around the platform allocator.
///
/// Owns the statistics ledger and probe state (no process-wide
/// globals); all mutation goes through `&mut self`, which also
/// serialises the single-threaded-by-design bookkeeping.
pub struct Heap<D: DelegateAlloc = SystemAlloc> {
    delegate: D,
    config: HeapConfig,
    faults: Box<dyn FaultChannel>,
    sink: Box<dyn ReportSink>,
    checker: Box<dyn HeapChecker>,
    ledger: Ledger,
    probe: ProbeState,
}

impl Heap<SystemAlloc> {
    /// A heap over the platform allocator with the default fault
    /// channel (panic) and sink (stderr).
    pub fn new(config: HeapConfig) -> Self {
        Self::with_delegate(config, SystemAlloc)
    }
}

impl<D: DelegateAlloc> Heap<D> {
    /// A heap over a caller-supplied delegate allocator.
    pub fn with_delegate(config: HeapConfig, delegate: D) -> Self {
        Self {
            delegate,
            config,
            faults: Box::new(PanicChannel),
            sink: Box::new(StderrSink),
            checker: Box::new(DisabledChecker),
            ledger: Ledger::new(),
            probe: ProbeState::default(),
        }
    }

    /// Replace the fault channel.
    pub fn with_fault_channel(mut self, faults: Box<dyn FaultChannel>) -> Self {
        self.faults = faults;
        self
    }

    /// Replace the report sink.
    pub fn with_sink(mut self, sink: Box<dyn ReportSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replace the heap-consistency checker.
    pub fn with_checker(mut self, checker: Box<dyn HeapChecker>) -> Self {
        self.checker = checker;
        self
    }

    /// The configuration this heap was built with.
    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    /// The statistics ledger. All-zero when stats are disabled.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Probe failures recorded so far.
    pub fn probe_failures(&self) -> u32 {
        self.probe.failures
    }

    // ---- allocation primitives ----------------------------------------

    /// Allocate `nbytes` uninitialised bytes.
    ///
    /// A zero `nbytes` raises [`Fault::BadCount`] regardless of
    /// `policy`. On exhaustion, faults or returns `None` per `policy`.
    #[track_caller]
    pub fn alloc(&mut self, nbytes: usize, policy: FailurePolicy) -> Option<Block> {
        self.alloc_at(nbytes, policy, Location::caller())
    }

    /// Allocate a zero-initialised array of `count` elements of
    /// `elem_size` bytes.
    ///
    /// A zero `count` raises [`Fault::BadCount`]; a zero `elem_size`
    /// is normalised to 1 so the delegate never sees an empty request.
    #[track_caller]
    pub fn alloc_zeroed(
        &mut self,
        count: usize,
        elem_size: usize,
        policy: FailurePolicy,
    ) -> Option<Block> {
        self.alloc_zeroed_at(count, elem_size, policy, Location::caller(), false)
    }

    /// As [`Heap::alloc_zeroed`], but re-zeroes the region after the
    /// delegate returns it, for delegates whose zero-fill guarantee
    /// is not trusted.
    #[track_caller]
    pub fn alloc_zeroed_checked(
        &mut self,
        count: usize,
        elem_size: usize,
        policy: FailurePolicy,
    ) -> Option<Block> {
        self.alloc_zeroed_at(count, elem_size, policy, Location::caller(), true)
    }

    /// Allocate a zero-initialised array of `count` values of `T`,
    /// sized with `size_of::<T>()`.
    #[track_caller]
    pub fn alloc_array<T>(&mut self, count: usize, policy: FailurePolicy) -> Option<Block> {
        self.alloc_zeroed_at(count, std::mem::size_of::<T>(), policy, Location::caller(), false)
    }

    /// Zero `count * elem_size` bytes of `block`, clamped to the
    /// block's length. No-op on an absent block or a zero count or
    /// element size. Never allocates or frees.
    pub fn zero_fill(&mut self, block: Option<&mut Block>, count: usize, elem_size: usize) {
        let Some(block) = block else { return };
        if count == 0 || elem_size == 0 {
            return;
        }
        let span = count.saturating_mul(elem_size).min(block.len());
        block.as_mut_slice()[..span].fill(0);
        if self.config.stats {
            self.ledger.on_zero(span);
        }
    }

    /// Release the block in `slot` and clear the slot. No-op when the
    /// slot is already empty, so a second call never faults.
    pub fn free(&mut self, slot: &mut Option<Block>) {
        let Some(taken) = slot.take() else { return };
        block::release(&mut self.delegate, taken);
        if self.config.stats {
            self.ledger.on_free();
        }
    }

    /// Resize the block in `slot` to `nbytes` (normalised to at least
    /// 1), preserving the first `min(old, new)` bytes. Content beyond
    /// the old length is uninitialised. An empty slot behaves as a
    /// fresh zero-initialised allocation of `nbytes`.
    ///
    /// Returns whether `slot` holds a block afterwards (`false` only
    /// under [`FailurePolicy::ReturnNull`] exhaustion, which leaves
    /// the slot empty — the old region is released, never dangling).
    #[track_caller]
    pub fn resize(&mut self, slot: &mut Option<Block>, nbytes: usize, policy: FailurePolicy) -> bool {
        self.resize_at(slot, nbytes, policy, Location::caller(), None)
    }

    /// As [`Heap::resize`], but `[oldbytes, new)` is explicitly
    /// zero-filled when growing, compensating for the delegate's
    /// realloc not zeroing the tail. `oldbytes` must be the block's
    /// size before the call.
    #[track_caller]
    pub fn resize_zeroed(
        &mut self,
        slot: &mut Option<Block>,
        oldbytes: usize,
        nbytes: usize,
        policy: FailurePolicy,
    ) -> bool {
        self.resize_at(slot, nbytes, policy, Location::caller(), Some(oldbytes))
    }

    fn alloc_at(
        &mut self,
        nbytes: usize,
        policy: FailurePolicy,
        location: &'static Location<'static>,
    ) -> Option<Block> {
        if nbytes == 0 {
            self.faults.raise(Fault::BadCount, location);
        }
        let got = block::acquire(&mut self.delegate, nbytes, false);
        let taken = self.settle(got, policy, location)?;
        if self.config.stats {
            self.ledger.on_alloc(nbytes, (location.file(), location.line()));
        }
        Some(taken)
    }

    fn alloc_zeroed_at(
        &mut self,
        count: usize,
        elem_size: usize,
        policy: FailurePolicy,
        location: &'static Location<'static>,
        re_zero: bool,
    ) -> Option<Block> {
        if count == 0 {
            self.faults.raise(Fault::BadCount, location);
        }
        let elem_size = elem_size.max(1);
        // A volume that overflows usize can never be satisfied; treat
        // it as exhaustion rather than a usage fault.
        let got = count
            .checked_mul(elem_size)
            .and_then(|volume| block::acquire(&mut self.delegate, volume, true));
        let mut taken = self.settle(got, policy, location)?;
        if re_zero {
            taken.as_mut_slice().fill(0);
        }
        if self.config.stats {
            self.ledger
                .on_alloc(taken.len(), (location.file(), location.line()));
            self.ledger.on_zero(taken.len());
        }
        Some(taken)
    }

    fn resize_at(
        &mut self,
        slot: &mut Option<Block>,
        nbytes: usize,
        policy: FailurePolicy,
        location: &'static Location<'static>,
        zero_from: Option<usize>,
    ) -> bool {
        let target = nbytes.max(1);
        let Some(current) = slot.take() else {
            // First resize of an optional buffer: equivalent to a
            // fresh zero-initialised allocation.
            *slot = self.alloc_zeroed_at(target, 1, policy, location, false);
            return slot.is_some();
        };

        let got = block::regrow(&mut self.delegate, current, target);
        let Some(mut moved) = self.settle(got, policy, location) else {
            return false;
        };
        if let Some(old) = zero_from {
            if target > old {
                moved.as_mut_slice()[old..].fill(0);
            }
        }
        *slot = Some(moved);
        if self.config.stats {
            self.ledger.on_resize(target, zero_from);
        }
        true
    }

    /// The one adapter between delegate exhaustion and the per-call
    /// failure policy.
    fn settle(
        &mut self,
        got: Option<Block>,
        policy: FailurePolicy,
        location: &'static Location<'static>,
    ) -> Option<Block> {
        match got {
            Some(taken) => Some(taken),
            None => match policy {
                FailurePolicy::ReturnNull => None,
                FailurePolicy::Fail => self.faults.raise(Fault::AllocationFailed, location),
            },
        }
    }

    // ---- statistics reporting -----------------------------------------

    /// Emit and return the deltas since the previous report, then
    /// reset the baseline. `None` when statistics are disabled.
    pub fn report_since(&mut self, title: &str) -> Option<LedgerReport> {
        if !self.config.stats {
            return None;
        }
        let report = self.ledger.report_since(title);
        self.sink
            .emit(ReportLevel::Debug, format_args!("{title}: {}", report.bytes_line()));
        self.sink
            .emit(ReportLevel::Debug, format_args!("{title}: {}", report.counts_line()));
        Some(report)
    }

    /// Emit and return the lifetime totals without resetting the
    /// baseline; intended for process teardown. `None` when
    /// statistics are disabled.
    pub fn report_total(&mut self) -> Option<LedgerReport> {
        if !self.config.stats {
            return None;
        }
        let report = self.ledger.report_total();
        self.sink
            .emit(ReportLevel::Debug, format_args!("{}", report.bytes_line()));
        self.sink
            .emit(ReportLevel::Debug, format_args!("{}", report.counts_line()));
        Some(report)
    }

    // ---- probe subsystem ----------------------------------------------

    /// Probe a block for heap corruption: arm on its address and call
    /// site, run the consistency checker synchronously, and feed the
    /// verdict to [`Heap::check_status`]. An absent block only warns.
    ///
    /// No-op when probing is disabled in the configuration.
    #[track_caller]
    pub fn probe(&mut self, block: Option<&Block>) {
        if !self.config.probe {
            return;
        }
        let location = Location::caller();
        let Some(block) = block else {
            self.sink.emit(
                ReportLevel::Warn,
                format_args!("probe of absent block at {location}"),
            );
            return;
        };
        let address = block.addr();
        self.probe.armed = Some(ArmedProbe {
            address: address.as_ptr() as usize,
            location,
        });
        let status = self.checker.inspect(address);
        self.check_status_at(status, location);
    }

    /// Feed a consistency-check verdict into the probe state machine.
    ///
    /// While armed, a failure verdict counts against the failure
    /// limit and escalates to a hard fault; unarmed failures only
    /// count, faulting once the configured limit is reached. Consumes
    /// the armed state either way.
    #[track_caller]
    pub fn check_status(&mut self, status: ProbeStatus) {
        if !self.config.probe {
            return;
        }
        self.check_status_at(status, Location::caller());
    }

    /// Cap the number of tolerated probe failures. Raises
    /// [`Fault::ProbeLimitReached`] immediately if the recorded
    /// failures already meet or exceed `max_failures`.
    #[track_caller]
    pub fn set_probe_limit(&mut self, max_failures: u32) {
        if !self.config.probe {
            return;
        }
        if self.probe.failures >= max_failures {
            self.faults
                .raise(Fault::ProbeLimitReached, Location::caller());
        }
        self.probe.max_failures = Some(max_failures);
    }

    fn check_status_at(&mut self, status: ProbeStatus, location: &'static Location<'static>) {
        let armed = self.probe.armed.take();
        match armed {
            Some(probe) => {
                let level = if status == ProbeStatus::Ok {
                    ReportLevel::Warn
                } else {
                    ReportLevel::Error
                };
                self.sink.emit(
                    level,
                    format_args!(
                        "probe of {:#x} from {}: {}",
                        probe.address,
                        probe.location,
                        status.describe()
                    ),
                );
            }
            None => {
                self.sink
                    .emit(ReportLevel::Info, format_args!("{}", status.describe()));
            }
        }

        if !status.is_failure() {
            return;
        }
        self.probe.failures += 1;
        if let Some(probe) = armed {
            self.faults.raise(Fault::ProbeCorrupted, probe.location);
        }
        if let Some(max) = self.probe.max_failures {
            if self.probe.failures >= max {
                self.faults.raise(Fault::ProbeLimitReached, location);
            }
        }
    }
}
