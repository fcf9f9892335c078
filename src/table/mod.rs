//! The table abstraction: a `Block` plus the parsed header that describes how to read
//! and write its rows.

mod header;

use std::sync::atomic::Ordering;
use std::sync::Arc;

pub use header::{ColumnLayout, ColumnSpec, Layout, ParsedHeader};

use crate::block::Block;
use crate::error::{EngineError, Result};
use crate::heap::Heap;

const ROW_COUNT_OFFSET: u32 = 8;
const DATA_LENGTH_OFFSET: u32 = 20;

/// A self-describing table: a header (column layout, row geometry) followed by a data
/// region holding the rows themselves.
///
/// Cloning a `Table` clones the handle, not the data — both copies address the same
/// bytes in the same heap, the same way cloning a `Block` does.
#[derive(Clone)]
pub struct Table {
    block: Block,
    header: ParsedHeader,
}

impl Table {
    /// Builds a brand-new table with zero rows, allocating `memory_length` bytes of data
    /// region from `heap` in addition to the header.
    pub fn create(heap: &Arc<Heap>, columns: Vec<ColumnSpec>, memory_length: u32, layout: Layout) -> Result<Self> {
        let (header_bytes, parsed) = header::build(columns, memory_length, layout)?;
        let total = parsed.header_length + memory_length;
        let block = heap.allocate_zeroed(total)?;
        // SAFETY: nothing else can observe this block until `create` returns it.
        let storage = unsafe { block.slice_mut(0, parsed.header_length) };
        storage.copy_from_slice(&header_bytes);
        Ok(Self { block, header: parsed })
    }

    /// Opens an existing table whose header and row bytes are already present in `block`.
    pub fn open(block: Block) -> Result<Self> {
        let header = header::parse(block.as_slice())?;
        if header.header_length as u64 + header.data_length as u64 > block.payload_size() as u64 {
            return Err(EngineError::malformed_table(
                "table header claims more data than its block holds",
            ));
        }
        Ok(Self { block, header })
    }

    pub fn block(&self) -> &Block {
        &self.block
    }

    pub fn header(&self) -> &ParsedHeader {
        &self.header
    }

    pub fn layout(&self) -> Layout {
        self.header.layout
    }

    pub fn row_length(&self) -> u32 {
        self.header.row_length
    }

    pub fn row_step(&self) -> u32 {
        self.header.row_step
    }

    pub fn columns(&self) -> &[ColumnLayout] {
        &self.header.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnLayout> {
        self.header.column(name)
    }

    /// The live row count. Mutated atomically by [`Table::add_rows`]; read with `SeqCst`
    /// so a reader always observes a count whose rows have finished being written.
    pub fn row_count(&self) -> u32 {
        // SAFETY: ROW_COUNT_OFFSET is a fixed, in-bounds, 4-aligned offset into the header.
        unsafe { self.block.atomic_u32_at(ROW_COUNT_OFFSET) }.load(Ordering::SeqCst)
    }

    fn data_length(&self) -> u32 {
        // SAFETY: DATA_LENGTH_OFFSET is a fixed, in-bounds, 4-aligned offset into the header.
        unsafe { self.block.atomic_u32_at(DATA_LENGTH_OFFSET) }.load(Ordering::SeqCst)
    }

    /// Reserves room for `count` more rows and returns the starting row index.
    ///
    /// For row-major tables this bumps `row_count` and `data_length` by `count * row_step`.
    /// For column-major tables, every column's stripe is pre-sized at creation time for
    /// the table's full row capacity (the stripe geometry doesn't grow with `row_count`),
    /// so as soon as the table holds any rows the whole stripe region counts as live data;
    /// this bumps `data_length` to the full region in one step rather than incrementally.
    pub fn add_rows(&self, count: u32) -> Result<u32> {
        if count == 0 {
            return Ok(self.row_count());
        }
        // SAFETY: fixed, in-bounds, 4-aligned offsets.
        let row_count_word = unsafe { self.block.atomic_u32_at(ROW_COUNT_OFFSET) };
        let previous = row_count_word.fetch_add(count, Ordering::SeqCst);

        let data_length_word = unsafe { self.block.atomic_u32_at(DATA_LENGTH_OFFSET) };
        match self.header.layout {
            Layout::RowMajor => {
                let added_bytes = count as u64 * self.header.row_step as u64;
                data_length_word.fetch_add(added_bytes as u32, Ordering::SeqCst);
            }
            Layout::ColumnMajor => {
                data_length_word.store(self.data_region_size(), Ordering::SeqCst);
            }
        }

        let capacity = self.row_capacity();
        if previous + count > capacity {
            return Err(EngineError::out_of_bounds(format!(
                "add_rows({count}) at row {previous} exceeds table capacity {capacity}"
            )));
        }
        Ok(previous)
    }

    fn data_region_size(&self) -> u32 {
        self.block.payload_size() - self.header.header_length
    }

    fn row_capacity(&self) -> u32 {
        let region = self.data_region_size();
        match self.header.layout {
            Layout::RowMajor => region / self.header.row_step.max(1),
            Layout::ColumnMajor => {
                // Every column's stripe is `size * row_count` bytes wide; the first
                // column's stripe starts at offset 0, so its own width (bounded by where
                // the next stripe begins, or the region's end for the last column) yields
                // the row count every stripe in this table was sized against.
                let first = &self.header.columns[0];
                if first.size == 0 {
                    return 0;
                }
                let stripe_end = self
                    .header
                    .columns
                    .get(1)
                    .map(|c| c.data_offset)
                    .unwrap_or(region);
                stripe_end / first.size
            }
        }
    }

    /// The byte offset, from the start of the data region, of row `row_index`'s storage
    /// for `column`.
    pub fn row_field_offset(&self, column: &ColumnLayout, row_index: u32) -> u32 {
        match self.header.layout {
            Layout::RowMajor => row_index * self.header.row_step + column.field_offset,
            Layout::ColumnMajor => column.data_offset + row_index * column.size,
        }
    }

    /// A read view over `column`'s storage for `row_index`.
    pub fn field(&self, column: &ColumnLayout, row_index: u32) -> &[u8] {
        let offset = self.header.header_length + self.row_field_offset(column, row_index);
        self.block.slice(offset, column.size)
    }

    /// A mutable view over `column`'s storage for `row_index`.
    ///
    /// # Safety
    /// The caller must hold exclusive (or atomically-partitioned) write access to this
    /// row; the filter engine satisfies this by handing each worker a disjoint, reserved
    /// row-index range before it ever calls this method.
    pub unsafe fn field_mut(&self, column: &ColumnLayout, row_index: u32) -> &mut [u8] {
        let offset = self.header.header_length + self.row_field_offset(column, row_index);
        // SAFETY: delegated to caller.
        unsafe { self.block.slice_mut(offset, column.size) }
    }

    pub fn used_bytes(&self) -> u32 {
        self.header.header_length + self.data_length()
    }

    /// Shrinks the table's backing block down to exactly its header plus its current
    /// data, releasing any reserved-but-unused capacity back to the heap.
    pub fn shrink_to_fit(&mut self) -> Result<()> {
        let target = self.used_bytes();
        self.block.shrink(target)
    }

    pub fn into_block(self) -> Block {
        self.block
    }
}
