//! Allocation statistics ledger.
//!
//! Passive accumulators mutated only by the [`Heap`](crate::Heap)
//! primitives. Two reporting operations exist: a delta snapshot that
//! resets its baseline (periodic reporting) and a lifetime summary
//! (process teardown). Counters are signed so a mismatched free shows
//! up as a negative outstanding count instead of a wrap.

use std::fmt;

use indexmap::IndexMap;

/// Identifies an allocating call site: source file and line.
pub type SiteKey = (&'static str, u32);

/// Per-call-site accumulation, for leak triage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SiteStats {
    /// Allocations attributed to this site.
    pub allocs: i64,
    /// Byte volume attributed to this site.
    pub bytes: i64,
}

/// The monotonically-evolving counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LedgerTotals {
    /// Bytes handed out by `alloc`/`alloc_zeroed`.
    pub allocated_bytes: i64,
    /// Effective target bytes of every resize.
    pub resized_bytes: i64,
    /// Previous sizes surrendered to `resize_zeroed`, so a snapshot
    /// can compute net growth.
    pub resized_old_bytes: i64,
    /// Bytes zero-filled by the zeroing primitives.
    pub zeroed_bytes: i64,
    /// Live allocations: incremented on alloc, decremented on free.
    pub outstanding: i64,
    /// Cumulative frees.
    pub free_count: i64,
    /// Cumulative resize operations.
    pub resize_count: i64,
    /// Cumulative allocations over the heap's lifetime.
    pub lifetime_allocs: i64,
}

impl LedgerTotals {
    /// Field-wise deltas relative to `baseline`.
    fn since(&self, baseline: &LedgerTotals) -> LedgerTotals {
        LedgerTotals {
            allocated_bytes: self.allocated_bytes - baseline.allocated_bytes,
            resized_bytes: self.resized_bytes - baseline.resized_bytes,
            resized_old_bytes: self.resized_old_bytes - baseline.resized_old_bytes,
            zeroed_bytes: self.zeroed_bytes - baseline.zeroed_bytes,
            outstanding: self.outstanding - baseline.outstanding,
            free_count: self.free_count - baseline.free_count,
            resize_count: self.resize_count - baseline.resize_count,
            lifetime_allocs: self.lifetime_allocs - baseline.lifetime_allocs,
        }
    }
}

/// One rendered snapshot, either deltas-since-baseline or lifetime.
#[derive(Clone, Debug)]
pub struct LedgerReport {
    /// Caller-supplied label for the snapshot.
    pub title: String,
    /// The counter values covered by this report.
    pub totals: LedgerTotals,
    /// Per-site attribution at snapshot time, in first-seen order.
    pub sites: Vec<(SiteKey, SiteStats)>,
    /// Whether this is a lifetime summary rather than a delta report.
    pub cumulative: bool,
}

impl LedgerReport {
    /// The byte-volume line of the report.
    pub fn bytes_line(&self) -> String {
        format!(
            "memory usage (bytes): {} allocated, {} reallocated, {} returned, {} zeroed",
            self.totals.allocated_bytes,
            self.totals.resized_bytes,
            self.totals.resized_old_bytes,
            self.totals.zeroed_bytes,
        )
    }

    /// The operation-count line of the report.
    pub fn counts_line(&self) -> String {
        format!(
            "memory usage (number): {} allocates, {} frees, {} resizes, {} in use",
            self.totals.lifetime_allocs,
            self.totals.free_count,
            self.totals.resize_count,
            self.totals.outstanding,
        )
    }
}

impl fmt::Display for LedgerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = if self.cumulative {
            "lifetime"
        } else {
            "since last report"
        };
        writeln!(f, "memory usage {scope} {}:", self.title)?;
        writeln!(f, "{}", self.bytes_line())?;
        write!(f, "{}", self.counts_line())
    }
}

/// The accumulator. One per [`Heap`](crate::Heap); zeroed at
/// construction, never reset except for the delta baseline.
#[derive(Clone, Debug, Default)]
pub struct Ledger {
    totals: LedgerTotals,
    baseline: LedgerTotals,
    sites: IndexMap<SiteKey, SiteStats>,
}

impl Ledger {
    /// A fresh, all-zero ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current counter values.
    pub fn totals(&self) -> &LedgerTotals {
        &self.totals
    }

    /// Per-site attribution in first-seen order.
    pub fn sites(&self) -> impl Iterator<Item = (&SiteKey, &SiteStats)> {
        self.sites.iter()
    }

    pub(crate) fn on_alloc(&mut self, bytes: usize, site: SiteKey) {
        self.totals.allocated_bytes += bytes as i64;
        self.totals.outstanding += 1;
        self.totals.lifetime_allocs += 1;
        let entry = self.sites.entry(site).or_default();
        entry.allocs += 1;
        entry.bytes += bytes as i64;
    }

    pub(crate) fn on_zero(&mut self, bytes: usize) {
        self.totals.zeroed_bytes += bytes as i64;
    }

    pub(crate) fn on_free(&mut self) {
        self.totals.outstanding -= 1;
        self.totals.free_count += 1;
    }

    pub(crate) fn on_resize(&mut self, new_bytes: usize, old_bytes: Option<usize>) {
        self.totals.resized_bytes += new_bytes as i64;
        self.totals.resize_count += 1;
        if let Some(old) = old_bytes {
            self.totals.resized_old_bytes += old as i64;
        }
    }

    /// Deltas since the previous call (or since construction), then
    /// advance the baseline to the current totals.
    pub fn report_since(&mut self, title: &str) -> LedgerReport {
        let deltas = self.totals.since(&self.baseline);
        self.baseline = self.totals;
        LedgerReport {
            title: title.to_string(),
            totals: deltas,
            sites: self.sites.iter().map(|(k, v)| (*k, *v)).collect(),
            cumulative: false,
        }
    }

    /// Lifetime totals. Does not touch the baseline.
    pub fn report_total(&self) -> LedgerReport {
        LedgerReport {
            title: "at exit".to_string(),
            totals: self.totals,
            sites: self.sites.iter().map(|(k, v)| (*k, *v)).collect(),
            cumulative: true,
        }
    }
}
