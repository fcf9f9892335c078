//! Benchmarks for the bump-style heap allocator: allocate/free churn and the
//! stack-reclaim fast path under contention.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rowheap::Heap;

const HEAP_SIZE: u32 = 64 * 1024 * 1024;

fn alloc_free_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("alloc_free_churn");
    for block_size in [64u32, 1024, 16 * 1024] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(block_size), &block_size, |b, &block_size| {
            let heap = Heap::new(HEAP_SIZE).unwrap();
            b.iter(|| {
                let block = heap.allocate(block_size).unwrap();
                heap.free(&block).unwrap();
            });
        });
    }
    group.finish();
}

fn concurrent_allocation(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_allocation");
    for workers in [1usize, 2, 4, 8] {
        group.throughput(Throughput::Elements(workers as u64));
        group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, &workers| {
            let heap = Heap::new(HEAP_SIZE).unwrap();
            b.iter(|| {
                std::thread::scope(|scope| {
                    for _ in 0..workers {
                        let heap = &heap;
                        scope.spawn(move || {
                            for _ in 0..64 {
                                let block = heap.allocate(256).unwrap();
                                heap.free(&block).unwrap();
                            }
                        });
                    }
                });
            });
        });
    }
    group.finish();
}

criterion_group!(benches, alloc_free_churn, concurrent_allocation);
criterion_main!(benches);
