//! Heap-corruption probing.
//!
//! A probe is an active assertion on a single live block: the heap
//! records the address and call site, runs the delegate consistency
//! check synchronously, and escalates any non-OK verdict to a hard
//! fault while armed. The state machine is single-slot — Idle, then
//! Armed for the duration of one check, then Idle again — and is not
//! safe for concurrent probing.

use std::panic::Location;
use std::ptr::NonNull;

/// Verdict of a delegate heap-consistency check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeStatus {
    /// The platform provides no consistency checking.
    Disabled,
    /// The block's bookkeeping looks intact.
    Ok,
    /// Bytes before the block were modified.
    CorruptedBefore,
    /// Bytes after the block were modified.
    CorruptedAfter,
    /// The block was already released.
    AlreadyFreed,
    /// The delegate reported something unrecognised.
    Unknown,
}

impl ProbeStatus {
    /// Whether this verdict counts against the probe failure limit.
    ///
    /// `Disabled` is not a failure: an unavailable checker says
    /// nothing about the heap.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Self::CorruptedBefore | Self::CorruptedAfter | Self::AlreadyFreed | Self::Unknown
        )
    }

    pub(crate) fn describe(self) -> &'static str {
        match self {
            Self::Disabled => "heap check is disabled",
            Self::Ok => "heap check ok",
            Self::CorruptedBefore => "heap check: data before the block was modified",
            Self::CorruptedAfter => "heap check: data after the block was modified",
            Self::AlreadyFreed => "heap check: block was already freed",
            Self::Unknown => "heap check: unrecognised status",
        }
    }
}

/// The delegate heap-consistency check seam.
///
/// Production builds on platforms without a checker use
/// [`DisabledChecker`]; tests script verdicts to drive the probe
/// state machine.
pub trait HeapChecker {
    /// Inspect the allocation at `address` and report a verdict.
    fn inspect(&mut self, address: NonNull<u8>) -> ProbeStatus;
}

/// Always reports [`ProbeStatus::Disabled`].
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledChecker;

impl HeapChecker for DisabledChecker {
    fn inspect(&mut self, _address: NonNull<u8>) -> ProbeStatus {
        ProbeStatus::Disabled
    }
}

/// A probe in flight: the address under inspection and the probing
/// call site, held only for the duration of one check.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ArmedProbe {
    pub(crate) address: usize,
    pub(crate) location: &'static Location<'static>,
}

/// Single-slot probe state owned by the heap.
#[derive(Debug, Default)]
pub(crate) struct ProbeState {
    pub(crate) armed: Option<ArmedProbe>,
    pub(crate) failures: u32,
    pub(crate) max_failures: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_corruption_verdicts_are_failures() {
        assert!(!ProbeStatus::Disabled.is_failure());
        assert!(!ProbeStatus::Ok.is_failure());
        assert!(ProbeStatus::CorruptedBefore.is_failure());
        assert!(ProbeStatus::CorruptedAfter.is_failure());
        assert!(ProbeStatus::AlreadyFreed.is_failure());
        assert!(ProbeStatus::Unknown.is_failure());
    }

    #[test]
    fn disabled_checker_reports_disabled() {
        let mut checker = DisabledChecker;
        let mut byte = 0u8;
        let addr = NonNull::from(&mut byte).cast::<u8>();
        assert_eq!(checker.inspect(addr), ProbeStatus::Disabled);
    }
}
