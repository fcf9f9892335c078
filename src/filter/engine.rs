//! The parallel filter engine: compiles an expression once, then scans a source table
//! across a pool of worker threads, reserving both input batches and output row slots
//! with plain atomic adds.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crossbeam_queue::SegQueue;
use tracing::{error, warn};

use crate::config::EngineConfig;
use crate::cursor::RowCursor;
use crate::error::{EngineError, Result};
use crate::filter::compile::{compile_expression, CompiledExpression};
use crate::filter::expr::{Expression, Mode};
use crate::heap::Heap;
use crate::proxy::ProxyTable;
use crate::table::{ColumnSpec, Layout, Table};
use crate::types::TypeId;

const ROW_INDEX_COLUMN: &str = "row_index";

/// One field of a filter run's output schema.
#[derive(Debug, Clone)]
pub enum ResultField {
    /// The matching row's index in the source table, as a `U32` column.
    RowIndex,
    /// The value of `column` in the source table, projected under `alias`.
    Column { column: String, alias: String },
}

#[derive(Debug, Clone, Default)]
pub struct ResultSpec {
    pub fields: Vec<ResultField>,
}

impl ResultSpec {
    pub fn row_index_only() -> Self {
        Self {
            fields: vec![ResultField::RowIndex],
        }
    }

    fn is_proxy_eligible(&self) -> bool {
        matches!(self.fields.as_slice(), [ResultField::RowIndex])
    }
}

/// Either a fully materialized result table, or (when the caller only asked for row
/// indices) a [`ProxyTable`] over the source's unmodified rows.
pub enum FilterOutcome {
    Table(Table),
    Proxy(ProxyTable),
}

enum ResultAccessor {
    RowIndex { result: crate::table::ColumnLayout },
    Column { source_index: usize, result: crate::table::ColumnLayout },
}

pub struct FilterEngine {
    config: EngineConfig,
    output_heap: Option<Arc<Heap>>,
}

impl FilterEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config, output_heap: None }
    }

    /// Directs the result table's allocation to `heap` instead of the source table's own
    /// heap.
    pub fn with_output_heap(mut self, heap: Arc<Heap>) -> Self {
        self.output_heap = Some(heap);
        self
    }

    pub fn run(&self, source: &Table, spec: &ResultSpec, expression: &Expression, mode: Mode) -> Result<FilterOutcome> {
        let compiled = compile_expression(source, expression, mode)?;
        let output_heap = self.output_heap.clone().unwrap_or_else(|| Arc::clone(source.block().heap()));

        let result_columns = self.resolve_result_columns(source, spec)?;
        let row_length: u32 = result_columns.iter().map(|c| c.size).sum();
        let row_step = (row_length + 3) & !3;
        let memory_length = row_step.saturating_mul(source.row_count());

        let mut result_table = Table::create(&output_heap, result_columns, memory_length, Layout::RowMajor)?;
        let (accessors, cursor_columns) = self.build_accessors(source, spec, &compiled, &result_table)?;

        let scratch = source.block().heap().allocate_zeroed(8)?;
        // SAFETY: fixed, in-bounds, 4-aligned offsets into a freshly allocated 8-byte block.
        let next_row_to_scan = unsafe { scratch.atomic_u32_at(0) };
        let next_result_slot = unsafe { scratch.atomic_u32_at(4) };

        let errors: SegQueue<EngineError> = SegQueue::new();
        let row_count = source.row_count();
        let batch_size = self.config.batch_size();
        let workers = self.config.workers();

        std::thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workers);
            for _ in 0..workers {
                let next_row_to_scan = &next_row_to_scan;
                let next_result_slot = &next_result_slot;
                let errors = &errors;
                let compiled = &compiled;
                let accessors = &accessors;
                let result_table = &result_table;
                let cursor_columns = &cursor_columns;
                handles.push(scope.spawn(move || {
                    run_worker(
                        source,
                        cursor_columns,
                        compiled,
                        accessors,
                        result_table,
                        row_count,
                        batch_size,
                        next_row_to_scan,
                        next_result_slot,
                        errors,
                    );
                }));
            }
            for handle in handles {
                if handle.join().is_err() {
                    error!("filter worker thread panicked outside its own catch_unwind boundary");
                }
            }
        });

        if let Some(err) = errors.pop() {
            warn!(error = %err, "filter run failed, freeing partial result allocation");
            scratch.free()?;
            result_table.into_block().free()?;
            return Err(err.into_worker_failure());
        }

        let result_count = next_result_slot.load(Ordering::SeqCst);
        scratch.free()?;
        result_table.add_rows(result_count)?;
        result_table.shrink_to_fit()?;

        if spec.is_proxy_eligible() {
            Ok(FilterOutcome::Proxy(ProxyTable::new(source.clone(), result_table)))
        } else {
            Ok(FilterOutcome::Table(result_table))
        }
    }

    fn resolve_result_columns(&self, source: &Table, spec: &ResultSpec) -> Result<Vec<ColumnSpec>> {
        let mut columns = Vec::with_capacity(spec.fields.len());
        for field in &spec.fields {
            match field {
                ResultField::RowIndex => columns.push(ColumnSpec::numeric(ROW_INDEX_COLUMN, TypeId::U32)?),
                ResultField::Column { column, alias } => {
                    let layout = source
                        .column(column)
                        .ok_or_else(|| EngineError::unknown_column(column))?;
                    columns.push(ColumnSpec {
                        name: alias.clone(),
                        ty: layout.ty,
                        size: layout.size,
                    });
                }
            }
        }
        Ok(columns)
    }

    /// Returns the result-writing accessors plus the full set of source columns a
    /// worker's cursor must be bound against — the predicate's columns plus whatever
    /// extra columns are only needed for projection, in one fixed order every worker
    /// agrees on.
    fn build_accessors(
        &self,
        source: &Table,
        spec: &ResultSpec,
        compiled: &CompiledExpression,
        result_table: &Table,
    ) -> Result<(Vec<ResultAccessor>, Vec<String>)> {
        let mut cursor_columns: Vec<String> = compiled.columns().to_vec();
        let mut accessors = Vec::with_capacity(spec.fields.len());
        for field in &spec.fields {
            match field {
                ResultField::RowIndex => {
                    let result = result_table.column(ROW_INDEX_COLUMN).unwrap().clone();
                    accessors.push(ResultAccessor::RowIndex { result });
                }
                ResultField::Column { column, alias } => {
                    source
                        .column(column)
                        .ok_or_else(|| EngineError::unknown_column(column))?;
                    let source_index = match cursor_columns.iter().position(|c| c == column) {
                        Some(idx) => idx,
                        None => {
                            cursor_columns.push(column.clone());
                            cursor_columns.len() - 1
                        }
                    };
                    let result = result_table.column(alias).unwrap().clone();
                    accessors.push(ResultAccessor::Column { source_index, result });
                }
            }
        }
        Ok((accessors, cursor_columns))
    }
}

#[allow(clippy::too_many_arguments)]
fn run_worker(
    source: &Table,
    cursor_columns: &[String],
    compiled: &CompiledExpression,
    accessors: &[ResultAccessor],
    result_table: &Table,
    row_count: u32,
    batch_size: u32,
    next_row_to_scan: &AtomicU32,
    next_result_slot: &AtomicU32,
    errors: &SegQueue<EngineError>,
) {
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let column_names: Vec<&str> = cursor_columns.iter().map(|s| s.as_str()).collect();
        let mut cursor = RowCursor::new(source, &column_names).expect("engine-resolved columns are always valid");

        loop {
            let start = next_row_to_scan.fetch_add(batch_size, Ordering::SeqCst);
            if start >= row_count {
                break;
            }
            let end = (start + batch_size).min(row_count);
            for row in start..end {
                cursor.seek(row);
                if compiled.eval(&cursor) {
                    let slot = next_result_slot.fetch_add(1, Ordering::SeqCst);
                    write_result_row(&cursor, accessors, result_table, row, slot);
                }
            }
        }
    }));

    if let Err(payload) = outcome {
        let message = panic_message(&payload);
        error!(error = %message, "filter worker panicked, cancelling remaining batches");
        next_row_to_scan.store(u32::MAX, Ordering::SeqCst);
        errors.push(EngineError::malformed_table(message));
    }
}

fn write_result_row(cursor: &RowCursor, accessors: &[ResultAccessor], result_table: &Table, row: u32, slot: u32) {
    for accessor in accessors {
        match accessor {
            ResultAccessor::RowIndex { result } => {
                // SAFETY: `slot` was reserved uniquely for this worker via `fetch_add`, so
                // no other thread writes this row concurrently.
                let bytes = unsafe { result_table.field_mut(result, slot) };
                bytes.copy_from_slice(&row.to_le_bytes());
            }
            ResultAccessor::Column { source_index, result } => {
                // SAFETY: same slot-uniqueness argument as above.
                let bytes = unsafe { result_table.field_mut(result, slot) };
                if result.ty == TypeId::Bstr {
                    // The result column was built from the source column's own `ty`/`size`
                    // (see `resolve_result_columns`), so the two fields share the same
                    // length-prefixed storage layout — copy it verbatim rather than feeding
                    // it through `write_field_truncating`, which expects a bare string value
                    // and would re-wrap the already-length-prefixed bytes.
                    bytes.copy_from_slice(cursor.raw_bytes(*source_index));
                } else {
                    crate::types::write_le(result.ty, bytes, cursor.number(*source_index));
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "filter worker panicked with a non-string payload".to_string()
    }
}
