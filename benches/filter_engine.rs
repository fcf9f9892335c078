//! Benchmarks for the parallel filter engine: a synthetic wide table scanned under
//! varying worker counts and selectivities.

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use rowheap::filter::expr::{Expression, Mode};
use rowheap::filter::{FilterEngine, ResultSpec};
use rowheap::{ColumnSpec, EngineConfig, Heap, Table, TypeId};

const ROW_COUNT: u32 = 200_000;
// Each row-index-only run writes at most ROW_COUNT * 4 bytes; give every iteration its
// own fresh output heap so a bench group's runs don't exhaust the source table's heap.
const OUTPUT_HEAP_SIZE: u32 = 16 * 1024 * 1024;

fn build_table() -> Table {
    let heap = Heap::new(64 * 1024 * 1024).unwrap();
    let table = Table::create(
        &heap,
        vec![
            ColumnSpec::numeric("n", TypeId::U32).unwrap(),
            ColumnSpec::bstr("tag", 8),
        ],
        32 * 1024 * 1024,
        rowheap::table::Layout::RowMajor,
    )
    .unwrap();
    table.add_rows(ROW_COUNT).unwrap();
    for i in 0..ROW_COUNT {
        unsafe {
            let n = table.column("n").unwrap().clone();
            let tag = table.column("tag").unwrap().clone();
            table.field_mut(&n, i).copy_from_slice(&i.to_le_bytes());
            let label = if i % 2 == 0 { b"even".as_slice() } else { b"odd".as_slice() };
            rowheap::bstr::write_field_checked(table.field_mut(&tag, i), label).unwrap();
        }
    }
    table
}

fn expression_for_selectivity(percent: u32) -> Expression {
    let threshold = ROW_COUNT * percent / 100;
    serde_json::from_str(&format!(
        r#"[[{{"field": "n", "operation": "LESS_THAN", "value": {threshold}}}]]"#
    ))
    .unwrap()
}

fn worker_scaling(c: &mut Criterion) {
    let table = build_table();
    let expr = expression_for_selectivity(50);

    let mut group = c.benchmark_group("filter_worker_scaling");
    group.throughput(Throughput::Elements(ROW_COUNT as u64));
    for workers in [1usize, 2, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, &workers| {
            let config = EngineConfig::default().with_workers(workers);
            b.iter_batched(
                || Heap::new(OUTPUT_HEAP_SIZE).unwrap(),
                |output_heap| {
                    FilterEngine::new(config.clone())
                        .with_output_heap(output_heap)
                        .run(&table, &ResultSpec::row_index_only(), &expr, Mode::Dnf)
                        .unwrap();
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn selectivity_scaling(c: &mut Criterion) {
    let table = build_table();
    let config = EngineConfig::default();

    let mut group = c.benchmark_group("filter_selectivity_scaling");
    group.throughput(Throughput::Elements(ROW_COUNT as u64));
    for percent in [1u32, 10, 50, 90] {
        let expr = expression_for_selectivity(percent);
        group.bench_with_input(BenchmarkId::from_parameter(percent), &expr, |b, expr| {
            b.iter_batched(
                || Heap::new(OUTPUT_HEAP_SIZE).unwrap(),
                |output_heap| {
                    FilterEngine::new(config.clone())
                        .with_output_heap(output_heap)
                        .run(&table, &ResultSpec::row_index_only(), expr, Mode::Dnf)
                        .unwrap();
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, worker_scaling, selectivity_scaling);
criterion_main!(benches);
