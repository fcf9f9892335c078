//! A row cursor: a resolved, positionable view over a fixed set of a table's columns.
//!
//! Resolving a column by name is a linear scan over the header's column list, so code
//! that walks every row of a table resolves its columns once up front (here) rather than
//! repeating that lookup per row per column — the same amortization a query plan gets
//! from binding column references once at compile time instead of at each row.

use crate::bstr::Bstr;
use crate::error::{EngineError, Result};
use crate::table::{ColumnLayout, Table};
use crate::types::{self, Number, TypeId};

/// One column bound into a cursor: its layout plus its position in the bound set.
#[derive(Clone)]
pub struct BoundColumn {
    pub layout: ColumnLayout,
}

/// A cursor over `table`, positioned at a single row, with a fixed set of columns
/// resolved once at construction time.
pub struct RowCursor<'t> {
    table: &'t Table,
    columns: Vec<BoundColumn>,
    row_index: u32,
}

impl<'t> RowCursor<'t> {
    /// Binds `column_names` against `table`'s header. Fails if any name is unknown.
    pub fn new(table: &'t Table, column_names: &[&str]) -> Result<Self> {
        let mut columns = Vec::with_capacity(column_names.len());
        for name in column_names {
            let layout = table
                .column(name)
                .cloned()
                .ok_or_else(|| EngineError::unknown_column(name))?;
            columns.push(BoundColumn { layout });
        }
        Ok(Self {
            table,
            columns,
            row_index: 0,
        })
    }

    /// Binds every column in `table`'s header, in header order.
    pub fn over_all_columns(table: &'t Table) -> Self {
        let columns = table
            .columns()
            .iter()
            .cloned()
            .map(|layout| BoundColumn { layout })
            .collect();
        Self {
            table,
            columns,
            row_index: 0,
        }
    }

    pub fn table(&self) -> &'t Table {
        self.table
    }

    pub fn bound_columns(&self) -> &[BoundColumn] {
        &self.columns
    }

    pub fn row_index(&self) -> u32 {
        self.row_index
    }

    pub fn has_row(&self) -> bool {
        self.row_index < self.table.row_count()
    }

    /// Repositions the cursor at `row_index` without checking bounds; out-of-range reads
    /// surface as an error from the accessor methods below via [`Table::row_count`]
    /// at the call site, the same contract a bare index has.
    pub fn seek(&mut self, row_index: u32) {
        self.row_index = row_index;
    }

    /// Advances to the next row, returning `false` once past the last live row.
    pub fn advance(&mut self) -> bool {
        if self.row_index + 1 < self.table.row_count() {
            self.row_index += 1;
            true
        } else {
            self.row_index = self.table.row_count();
            false
        }
    }

    fn column(&self, index: usize) -> &ColumnLayout {
        &self.columns[index].layout
    }

    pub fn raw_bytes(&self, index: usize) -> &'t [u8] {
        self.table.field(self.column(index), self.row_index)
    }

    /// Reads column `index` as a [`Number`]. Panics if the column isn't a numeric type —
    /// callers resolve types once against the header before building a scan plan.
    pub fn number(&self, index: usize) -> Number {
        let column = self.column(index);
        debug_assert!(column.ty.is_numeric(), "number() called on a non-numeric column");
        types::read_le(column.ty, self.raw_bytes(index))
    }

    pub fn bstr(&self, index: usize) -> Bstr<'t> {
        let column = self.column(index);
        debug_assert_eq!(column.ty, TypeId::Bstr, "bstr() called on a non-BSTR column");
        Bstr::from_field(self.raw_bytes(index))
    }

    /// Writes `value` into column `index` of the current row.
    ///
    /// # Safety
    /// The caller must have exclusive (or atomically-partitioned) write access to this
    /// row — the same contract as [`Table::field_mut`].
    pub unsafe fn set_number(&self, index: usize, value: Number) {
        let column = self.column(index).clone();
        // SAFETY: delegated to caller.
        let bytes = unsafe { self.table.field_mut(&column, self.row_index) };
        types::write_le(column.ty, bytes, value);
    }

    /// # Safety
    /// Same contract as [`RowCursor::set_number`].
    pub unsafe fn set_bstr(&self, index: usize, value: &[u8]) -> Result<()> {
        let column = self.column(index).clone();
        // SAFETY: delegated to caller.
        let bytes = unsafe { self.table.field_mut(&column, self.row_index) };
        crate::bstr::write_field_checked(bytes, value)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::table::{ColumnSpec, Layout};
    use std::sync::Arc;

    #[test]
    fn cursor_walks_rows_in_order() {
        let heap = crate::heap::Heap::new(64 * 1024).unwrap();
        let table = Table::create(
            &heap,
            vec![ColumnSpec::numeric("n", TypeId::U32).unwrap()],
            4096,
            Layout::RowMajor,
        )
        .unwrap();
        table.add_rows(3).unwrap();
        for i in 0..3u32 {
            unsafe {
                let col = table.column("n").unwrap().clone();
                let bytes = table.field_mut(&col, i);
                bytes.copy_from_slice(&(i * 10).to_le_bytes());
            }
        }
        let mut cursor = RowCursor::new(&table, &["n"]).unwrap();
        let mut seen = Vec::new();
        loop {
            seen.push(cursor.number(0));
            if !cursor.advance() {
                break;
            }
        }
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[2].as_f64(), 20.0);
        let _ = Arc::strong_count(&heap);
    }

    #[test]
    fn binding_unknown_column_fails() {
        let heap = crate::heap::Heap::new(64 * 1024).unwrap();
        let table = Table::create(
            &heap,
            vec![ColumnSpec::numeric("n", TypeId::U32).unwrap()],
            4096,
            Layout::RowMajor,
        )
        .unwrap();
        assert!(RowCursor::new(&table, &["missing"]).is_err());
    }
}
