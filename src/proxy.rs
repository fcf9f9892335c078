//! A proxy table: a source table plus a row-index table, together presenting a view
//! over a subset of the source's rows without copying any of its data.

use crate::bstr::Bstr;
use crate::cursor::RowCursor;
use crate::error::Result;
use crate::table::{ColumnLayout, Table};
use crate::types::Number;

const INDEX_COLUMN_NAME: &str = "row_index";

/// `(source_table, index_table)` where `index_table` holds exactly one `U32` column
/// (named [`INDEX_COLUMN_NAME`]) whose values are row indices into `source_table`.
pub struct ProxyTable {
    source: Table,
    index_table: Table,
}

impl ProxyTable {
    pub fn new(source: Table, index_table: Table) -> Self {
        Self { source, index_table }
    }

    pub fn source(&self) -> &Table {
        &self.source
    }

    pub fn index_table(&self) -> &Table {
        &self.index_table
    }

    pub fn row_count(&self) -> u32 {
        self.index_table.row_count()
    }

    pub fn columns(&self) -> &[ColumnLayout] {
        self.source.columns()
    }
}

/// A cursor over a [`ProxyTable`]: an inner cursor on the index table, positioned by the
/// proxy row index, and an inner cursor on the source table, kept synced to whatever row
/// the index cursor currently points at.
pub struct ProxyRowCursor<'p> {
    index_cursor: RowCursor<'p>,
    source_cursor: RowCursor<'p>,
}

impl<'p> ProxyRowCursor<'p> {
    pub fn new(proxy: &'p ProxyTable, source_columns: &[&str]) -> Result<Self> {
        let index_cursor = RowCursor::new(&proxy.index_table, &[INDEX_COLUMN_NAME])?;
        let source_cursor = RowCursor::new(&proxy.source, source_columns)?;
        let mut cursor = Self {
            index_cursor,
            source_cursor,
        };
        cursor.sync();
        Ok(cursor)
    }

    fn sync(&mut self) {
        if self.index_cursor.has_row() {
            let row = match self.index_cursor.number(0) {
                Number::U32(v) => v,
                other => unreachable!("row_index column holds a non-U32 value: {other:?}"),
            };
            self.source_cursor.seek(row);
        }
    }

    pub fn has_row(&self) -> bool {
        self.index_cursor.has_row()
    }

    pub fn row_index(&self) -> u32 {
        self.index_cursor.row_index()
    }

    pub fn source_row_index(&self) -> u32 {
        self.source_cursor.row_index()
    }

    pub fn advance(&mut self) -> bool {
        let more = self.index_cursor.advance();
        if more {
            self.sync();
        }
        more
    }

    pub fn number(&self, column_index: usize) -> Number {
        self.source_cursor.number(column_index)
    }

    pub fn bstr(&self, column_index: usize) -> Bstr<'p> {
        self.source_cursor.bstr(column_index)
    }
}
