//! Statistics and probe behaviour of an instrumented heap.

use std::panic::{catch_unwind, AssertUnwindSafe};

use strand_core::{BufferSink, ReportLevel};
use strand_mem::{FailurePolicy, Heap, HeapConfig, ProbeStatus};
use strand_test_utils::ScriptedChecker;

fn instrumented(sink: &BufferSink) -> Heap {
    Heap::new(HeapConfig::instrumented()).with_sink(Box::new(sink.clone()))
}

#[test]
fn alloc_free_cycle_reports_expected_deltas() {
    let sink = BufferSink::new();
    let mut heap = instrumented(&sink);

    let mut slot = heap.alloc(100, FailurePolicy::Fail);
    heap.free(&mut slot);

    let report = heap.report_since("cycle").unwrap();
    assert_eq!(report.totals.allocated_bytes, 100);
    assert_eq!(report.totals.outstanding, 0);
    assert_eq!(report.totals.lifetime_allocs, 1);
    assert_eq!(report.totals.free_count, 1);

    // The snapshot is also rendered into the sink.
    assert!(sink.contains(ReportLevel::Debug, "100 allocated"));
    assert!(sink.contains(ReportLevel::Debug, "1 allocates"));
}

#[test]
fn free_of_empty_slot_leaves_ledger_untouched() {
    let sink = BufferSink::new();
    let mut heap = instrumented(&sink);
    let mut slot = None;
    heap.free(&mut slot);

    let totals = heap.ledger().totals();
    assert_eq!(totals.free_count, 0);
    assert_eq!(totals.outstanding, 0);
}

#[test]
fn second_delta_report_is_all_zero() {
    let sink = BufferSink::new();
    let mut heap = instrumented(&sink);
    let mut slot = heap.alloc(64, FailurePolicy::Fail);
    heap.free(&mut slot);

    heap.report_since("first").unwrap();
    let second = heap.report_since("second").unwrap();
    assert_eq!(second.totals.allocated_bytes, 0);
    assert_eq!(second.totals.lifetime_allocs, 0);
}

#[test]
fn lifetime_report_survives_delta_snapshots() {
    let sink = BufferSink::new();
    let mut heap = instrumented(&sink);
    let mut slot = heap.alloc(64, FailurePolicy::Fail);
    heap.report_since("mid-run").unwrap();
    heap.free(&mut slot);

    let total = heap.report_total().unwrap();
    assert!(total.cumulative);
    assert_eq!(total.totals.allocated_bytes, 64);
    assert_eq!(total.totals.free_count, 1);
}

#[test]
fn site_table_attributes_volume_to_call_sites() {
    let sink = BufferSink::new();
    let mut heap = instrumented(&sink);

    let mut a = heap.alloc(10, FailurePolicy::Fail);
    let mut b = heap.alloc(20, FailurePolicy::Fail);

    let report = heap.report_since("sites").unwrap();
    assert_eq!(report.sites.len(), 2);
    assert!(report.sites.iter().all(|((file, _), _)| file.ends_with("instrumentation.rs")));
    let volumes: Vec<i64> = report.sites.iter().map(|(_, s)| s.bytes).collect();
    assert_eq!(volumes, vec![10, 20]);

    heap.free(&mut a);
    heap.free(&mut b);
}

#[test]
fn probe_with_ok_verdict_neither_counts_nor_escalates() {
    let sink = BufferSink::new();
    let mut heap = instrumented(&sink).with_checker(Box::new(ScriptedChecker::always_ok()));

    let mut slot = heap.alloc(16, FailurePolicy::Fail);
    heap.probe(slot.as_ref());

    assert_eq!(heap.probe_failures(), 0);
    // An armed OK still leaves a trace that the probe ran.
    assert!(sink.contains(ReportLevel::Warn, "heap check ok"));
    heap.free(&mut slot);
}

#[test]
fn corrupted_verdict_while_armed_escalates_and_counts_once() {
    let sink = BufferSink::new();
    let mut heap = instrumented(&sink)
        .with_checker(Box::new(ScriptedChecker::new([ProbeStatus::CorruptedAfter])));

    let mut slot = heap.alloc(16, FailurePolicy::Fail);
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        heap.probe(slot.as_ref());
    }));

    let payload = outcome.unwrap_err();
    let message = payload.downcast_ref::<String>().unwrap();
    assert!(message.contains("Heap probe detected corruption"));
    assert_eq!(heap.probe_failures(), 1);
    assert!(sink.contains(ReportLevel::Error, "data after the block was modified"));

    heap.free(&mut slot);
}

#[test]
fn probe_of_absent_block_warns_without_arming() {
    let sink = BufferSink::new();
    let mut heap = instrumented(&sink);

    heap.probe(None);

    assert_eq!(heap.probe_failures(), 0);
    assert!(sink.contains(ReportLevel::Warn, "absent block"));
    // Nothing is armed, so a later failure verdict only counts.
    heap.check_status(ProbeStatus::CorruptedBefore);
    assert_eq!(heap.probe_failures(), 1);
}

#[test]
fn unarmed_failures_accumulate_until_the_limit_trips() {
    let sink = BufferSink::new();
    let mut heap = instrumented(&sink);
    heap.set_probe_limit(2);

    heap.check_status(ProbeStatus::AlreadyFreed);
    assert_eq!(heap.probe_failures(), 1);

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        heap.check_status(ProbeStatus::CorruptedBefore);
    }));
    let payload = outcome.unwrap_err();
    let message = payload.downcast_ref::<String>().unwrap();
    assert!(message.contains("Maximum heap probe failures reached"));
    assert_eq!(heap.probe_failures(), 2);
}

#[test]
fn raising_the_limit_past_recorded_failures_is_refused() {
    let sink = BufferSink::new();
    let mut heap = instrumented(&sink);
    heap.check_status(ProbeStatus::Unknown);
    assert_eq!(heap.probe_failures(), 1);

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        heap.set_probe_limit(1);
    }));
    assert!(outcome.is_err());
}

#[test]
fn disabled_and_ok_verdicts_never_count() {
    let sink = BufferSink::new();
    let mut heap = instrumented(&sink);
    heap.check_status(ProbeStatus::Disabled);
    heap.check_status(ProbeStatus::Ok);
    assert_eq!(heap.probe_failures(), 0);
    assert!(sink.contains(ReportLevel::Info, "heap check is disabled"));
}

#[test]
fn probe_subsystem_is_inert_when_disabled_in_config() {
    let sink = BufferSink::new();
    let mut heap = Heap::new(HeapConfig::new()).with_sink(Box::new(sink.clone()));

    let mut slot = heap.alloc(8, FailurePolicy::Fail);
    heap.probe(slot.as_ref());
    heap.check_status(ProbeStatus::CorruptedAfter);
    heap.set_probe_limit(0);

    assert_eq!(heap.probe_failures(), 0);
    assert!(sink.is_empty());
    heap.free(&mut slot);
}
