//! Overhead of the policy layer around the platform allocator.

use criterion::{criterion_group, criterion_main, Criterion};
use strand_mem::{FailurePolicy, Heap, HeapConfig};

fn bench_alloc_free(c: &mut Criterion) {
    let mut group = c.benchmark_group("alloc_free_256");

    group.bench_function("quiet", |b| {
        let mut heap = Heap::new(HeapConfig::new());
        b.iter(|| {
            let mut slot = heap.alloc(256, FailurePolicy::Fail);
            heap.free(&mut slot);
        });
    });

    group.bench_function("instrumented", |b| {
        let mut heap = Heap::new(HeapConfig::instrumented());
        b.iter(|| {
            let mut slot = heap.alloc(256, FailurePolicy::Fail);
            heap.free(&mut slot);
        });
    });

    group.finish();
}

fn bench_resize_chain(c: &mut Criterion) {
    c.bench_function("resize_chain", |b| {
        let mut heap = Heap::new(HeapConfig::new());
        b.iter(|| {
            let mut slot = None;
            for size in [16usize, 64, 256, 64, 16] {
                let old = slot.as_ref().map_or(0, |blk: &strand_mem::Block| blk.len());
                heap.resize_zeroed(&mut slot, old, size, FailurePolicy::Fail);
            }
            heap.free(&mut slot);
        });
    });
}

criterion_group!(benches, bench_alloc_free, bench_resize_chain);
criterion_main!(benches);
