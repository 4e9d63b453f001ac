//! Fault taxonomy and the channel that raises faults.
//!
//! A fault is an unrecoverable condition: either a programming error
//! (a bad byte count) or resource exhaustion the caller did not opt
//! to handle. Raising a fault never returns; the default channel
//! panics (unwind-catchable at a recovery boundary), the alternate
//! channel prints to stderr and terminates the process.

use std::error::Error;
use std::fmt;
use std::panic::Location;

/// Per-call choice of behaviour when the platform allocator is exhausted.
///
/// Usage faults ([`Fault::BadCount`]) are raised regardless of policy;
/// only exhaustion is suppressible.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Raise [`Fault::AllocationFailed`] through the fault channel.
    Fail,
    /// Absorb the failure and hand back an absent block.
    ReturnNull,
}

/// Unrecoverable conditions reported by the allocation layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    /// The platform allocator reported exhaustion.
    AllocationFailed,
    /// A zero byte or element count — a caller bug, never suppressible.
    BadCount,
    /// A heap probe found corruption while armed.
    ProbeCorrupted,
    /// The configured maximum number of probe failures was reached.
    ProbeLimitReached,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocationFailed => {
                write!(f, "Allocation failed, insufficient memory available")
            }
            Self::BadCount => write!(f, "Allocation bad byte count"),
            Self::ProbeCorrupted => write!(f, "Heap probe detected corruption"),
            Self::ProbeLimitReached => write!(f, "Maximum heap probe failures reached"),
        }
    }
}

impl Error for Fault {}

/// Destination for raised faults.
///
/// `raise` never returns. Implementations decide how control flow
/// ends: unwinding, or terminating the process.
pub trait FaultChannel {
    /// Raise `fault`, attributed to the source `location` of the
    /// offending call.
    fn raise(&self, fault: Fault, location: &'static Location<'static>) -> !;
}

/// Default channel: panics with the fault message and source location.
///
/// The panic unwinds, so a recovery boundary (`catch_unwind`) above
/// the allocation layer can treat the fault as a catchable exception.
#[derive(Clone, Copy, Debug, Default)]
pub struct PanicChannel;

impl FaultChannel for PanicChannel {
    fn raise(&self, fault: Fault, location: &'static Location<'static>) -> ! {
        panic!("{fault} (raised at {location})");
    }
}

/// Hosted-runtime channel: prints the fault to stderr and exits
/// with a non-zero status instead of unwinding.
///
/// Used when the toolkit runs embedded under a host that cannot
/// survive an unwind crossing its boundary.
#[derive(Clone, Copy, Debug, Default)]
pub struct AbortChannel;

impl FaultChannel for AbortChannel {
    fn raise(&self, fault: Fault, location: &'static Location<'static>) -> ! {
        eprintln!("{fault} (raised at {location})");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_messages_are_stable() {
        assert_eq!(
            Fault::AllocationFailed.to_string(),
            "Allocation failed, insufficient memory available"
        );
        assert_eq!(Fault::BadCount.to_string(), "Allocation bad byte count");
    }

    #[test]
    fn panic_channel_unwinds_with_fault_message() {
        let outcome = std::panic::catch_unwind(|| {
            PanicChannel.raise(Fault::BadCount, Location::caller());
        });
        let payload = outcome.unwrap_err();
        let message = payload.downcast_ref::<String>().unwrap();
        assert!(message.contains("Allocation bad byte count"));
        assert!(message.contains("fault.rs"));
    }

    #[test]
    fn abort_channel_is_constructible() {
        // The exit path cannot be exercised in-process; construction and
        // trait-object coercion are what the allocation layer relies on.
        let _boxed: Box<dyn FaultChannel> = Box::new(AbortChannel);
    }
}
