//! Heap configuration parameters.

/// Configuration for a [`Heap`](crate::Heap).
///
/// Fixed at construction; the toggles mirror the toolkit's build-time
/// instrumentation switches and are never flipped at runtime.
#[derive(Clone, Copy, Debug)]
pub struct HeapConfig {
    /// Accumulate allocation statistics in the ledger.
    ///
    /// Default: off. The primitives skip all ledger mutation when
    /// disabled, so an uninstrumented heap carries no bookkeeping
    /// cost beyond the delegate call.
    pub stats: bool,

    /// Enable the heap-corruption probe subsystem.
    ///
    /// Default: off. When disabled, `probe`, `check_status`, and
    /// `set_probe_limit` are no-ops.
    pub probe: bool,
}

impl HeapConfig {
    /// Uninstrumented configuration: both subsystems off.
    pub fn new() -> Self {
        Self {
            stats: false,
            probe: false,
        }
    }

    /// Diagnostic configuration: statistics and probing on.
    pub fn instrumented() -> Self {
        Self {
            stats: true,
            probe: true,
        }
    }
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_uninstrumented() {
        let config = HeapConfig::default();
        assert!(!config.stats);
        assert!(!config.probe);
    }

    #[test]
    fn instrumented_enables_both() {
        let config = HeapConfig::instrumented();
        assert!(config.stats);
        assert!(config.probe);
    }
}
