//! Table header construction and parsing: the self-describing prefix that tells a
//! reader how to walk a table's rows without any side-channel schema.
//!
//! Grounded on `mem_arch_datastore/table.rs`'s `Table::new`, generalized from a
//! page-manager-backed row type to a flat row-major/column-major byte layout.

use crate::error::{EngineError, Result};
use crate::types::TypeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    RowMajor = 0,
    ColumnMajor = 1,
}

impl Layout {
    fn from_code(code: u32) -> Result<Self> {
        match code {
            0 => Ok(Self::RowMajor),
            1 => Ok(Self::ColumnMajor),
            other => Err(EngineError::malformed_table(format!("unknown layout code {other}"))),
        }
    }

    fn code(self) -> u32 {
        self as u32
    }
}

/// A column as supplied by a schema builder: name, type, and declared field width.
/// For `BSTR` columns, `size` is the bound (storage size), not a type-intrinsic width.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: String,
    pub ty: TypeId,
    pub size: u32,
}

impl ColumnSpec {
    pub fn numeric(name: impl Into<String>, ty: TypeId) -> Result<Self> {
        let size = ty
            .fixed_byte_size()
            .ok_or_else(|| EngineError::schema_mismatch(format!("{ty} requires an explicit field size")))?;
        Ok(Self {
            name: name.into(),
            ty,
            size,
        })
    }

    pub fn bstr(name: impl Into<String>, max_len: u8) -> Self {
        Self {
            name: name.into(),
            ty: TypeId::Bstr,
            size: crate::bstr::field_storage_size(max_len),
        }
    }
}

/// A column as resolved into its physical position within a table's data region.
#[derive(Debug, Clone)]
pub struct ColumnLayout {
    pub name: String,
    pub ty: TypeId,
    pub size: u32,
    pub data_offset: u32,
    pub field_offset: u32,
}

#[derive(Debug, Clone)]
pub struct ParsedHeader {
    pub header_length: u32,
    pub row_length: u32,
    pub row_step: u32,
    pub layout: Layout,
    pub row_count: u32,
    pub data_length: u32,
    pub columns: Vec<ColumnLayout>,
}

impl ParsedHeader {
    pub fn column(&self, name: &str) -> Option<&ColumnLayout> {
        self.columns.iter().find(|c| c.name == name)
    }
}

fn sort_columns(mut columns: Vec<ColumnSpec>) -> Result<Vec<ColumnSpec>> {
    let mut names = std::collections::HashSet::new();
    for c in &columns {
        if !names.insert(c.name.clone()) {
            return Err(EngineError::malformed_table(format!("duplicate column name `{}`", c.name)));
        }
    }
    columns.sort_by_key(|c| c.ty.index());
    Ok(columns)
}

fn pad4(n: u32) -> u32 {
    (n + 3) & !3
}

/// Builds a fresh header (zero rows) for `columns` laid out over a data region of
/// `memory_length` bytes. Returns the serialized header bytes and the parsed layout.
pub fn build(columns: Vec<ColumnSpec>, memory_length: u32, layout: Layout) -> Result<(Vec<u8>, ParsedHeader)> {
    let columns = sort_columns(columns)?;
    if columns.is_empty() {
        return Err(EngineError::malformed_table("a table needs at least one column"));
    }
    let row_length: u32 = columns.iter().map(|c| c.size).sum();
    if row_length == 0 {
        return Err(EngineError::malformed_table("row length cannot be zero"));
    }

    let resolved = match layout {
        Layout::RowMajor => {
            let mut offset = 0u32;
            let mut out = Vec::with_capacity(columns.len());
            for c in &columns {
                out.push(ColumnLayout {
                    name: c.name.clone(),
                    ty: c.ty,
                    size: c.size,
                    data_offset: 0,
                    field_offset: offset,
                });
                offset += c.size;
            }
            out
        }
        Layout::ColumnMajor => {
            let row_count = memory_length / row_length;
            if row_count == 0 {
                return Err(EngineError::malformed_table(
                    "column-major table's memory region is too small for even one row",
                ));
            }
            let mut stripe_offset = 0u32;
            let mut out = Vec::with_capacity(columns.len());
            for c in &columns {
                out.push(ColumnLayout {
                    name: c.name.clone(),
                    ty: c.ty,
                    size: c.size,
                    data_offset: stripe_offset,
                    field_offset: 0,
                });
                stripe_offset += c.size * row_count;
            }
            out
        }
    };

    let row_step = match layout {
        Layout::RowMajor => pad4(row_length),
        Layout::ColumnMajor => resolved[0].size,
    };

    let header_length = pad4(fixed_header_bytes(resolved.len() as u32) + name_table_bytes(&resolved));
    let bytes = serialize(header_length, row_length, row_step, layout, 0, 0, &resolved);

    Ok((
        bytes,
        ParsedHeader {
            header_length,
            row_length,
            row_step,
            layout,
            row_count: 0,
            data_length: 0,
            columns: resolved,
        },
    ))
}

fn fixed_header_bytes(column_count: u32) -> u32 {
    // 7 leading u32 fields + 4 u32 fields per column descriptor.
    4 * 7 + 4 * 4 * column_count
}

fn name_table_bytes(columns: &[ColumnLayout]) -> u32 {
    columns.iter().map(|c| 1 + c.name.len() as u32).sum()
}

fn serialize(
    header_length: u32,
    row_length: u32,
    row_step: u32,
    layout: Layout,
    row_count: u32,
    data_length: u32,
    columns: &[ColumnLayout],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(header_length as usize);
    out.extend_from_slice(&header_length.to_le_bytes());
    out.extend_from_slice(&(columns.len() as u32).to_le_bytes());
    out.extend_from_slice(&row_count.to_le_bytes());
    out.extend_from_slice(&row_length.to_le_bytes());
    out.extend_from_slice(&row_step.to_le_bytes());
    out.extend_from_slice(&data_length.to_le_bytes());
    out.extend_from_slice(&layout.code().to_le_bytes());
    for c in columns {
        out.extend_from_slice(&c.size.to_le_bytes());
        out.extend_from_slice(&c.data_offset.to_le_bytes());
        out.extend_from_slice(&c.field_offset.to_le_bytes());
        out.extend_from_slice(&c.ty.index().to_le_bytes());
    }
    for c in columns {
        let name_len = c.name.len().min(255) as u8;
        out.push(name_len);
        out.extend_from_slice(&c.name.as_bytes()[..name_len as usize]);
    }
    while out.len() % 4 != 0 {
        out.push(0);
    }
    out.resize(header_length as usize, 0);
    out
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32> {
    let slice = bytes
        .get(offset..offset + 4)
        .ok_or_else(|| EngineError::malformed_table("header truncated"))?;
    Ok(u32::from_le_bytes(slice.try_into().unwrap()))
}

/// Parses a header out of `bytes`, the start of a table's memory block.
pub fn parse(bytes: &[u8]) -> Result<ParsedHeader> {
    let header_length = read_u32(bytes, 0)?;
    let column_count = read_u32(bytes, 4)?;
    let row_count = read_u32(bytes, 8)?;
    let row_length = read_u32(bytes, 12)?;
    let row_step = read_u32(bytes, 16)?;
    let data_length = read_u32(bytes, 20)?;
    let layout = Layout::from_code(read_u32(bytes, 24)?)?;

    if header_length % 4 != 0 || header_length as usize > bytes.len() {
        return Err(EngineError::malformed_table("header_length is inconsistent with block size"));
    }

    let mut descriptors = Vec::with_capacity(column_count as usize);
    let mut cursor = 28usize;
    for _ in 0..column_count {
        let size = read_u32(bytes, cursor)?;
        let data_offset = read_u32(bytes, cursor + 4)?;
        let field_offset = read_u32(bytes, cursor + 8)?;
        let type_index = read_u32(bytes, cursor + 12)?;
        let ty = TypeId::from_index(type_index).ok_or_else(|| EngineError::unknown_type_index(type_index))?;
        if layout == Layout::ColumnMajor && field_offset != 0 {
            return Err(EngineError::malformed_table(
                "column-major table has a nonzero in-row field_offset",
            ));
        }
        descriptors.push((size, data_offset, field_offset, ty));
        cursor += 16;
    }

    let mut names = Vec::with_capacity(column_count as usize);
    for _ in 0..column_count {
        let name_len = *bytes
            .get(cursor)
            .ok_or_else(|| EngineError::malformed_table("header truncated reading column name"))? as usize;
        cursor += 1;
        let name_bytes = bytes
            .get(cursor..cursor + name_len)
            .ok_or_else(|| EngineError::malformed_table("header truncated reading column name"))?;
        names.push(String::from_utf8_lossy(name_bytes).into_owned());
        cursor += name_len;
    }

    let mut seen = std::collections::HashSet::new();
    let mut columns = Vec::with_capacity(column_count as usize);
    let mut computed_row_length = 0u32;
    for ((size, data_offset, field_offset, ty), name) in descriptors.into_iter().zip(names) {
        if !seen.insert(name.clone()) {
            return Err(EngineError::malformed_table(format!("duplicate column name `{name}`")));
        }
        if ty != TypeId::Bstr {
            if let Some(expected) = ty.fixed_byte_size() {
                if expected != size {
                    return Err(EngineError::malformed_table(format!(
                        "column `{name}` declares size {size} but type {ty} is {expected} bytes"
                    )));
                }
            }
        } else if size > 256 || size % 4 != 0 {
            return Err(EngineError::malformed_table(format!(
                "BSTR column `{name}` has invalid storage size {size}"
            )));
        }
        computed_row_length += size;
        columns.push(ColumnLayout {
            name,
            ty,
            size,
            data_offset,
            field_offset,
        });
    }

    if computed_row_length != row_length {
        return Err(EngineError::malformed_table(format!(
            "row_length {row_length} does not match the sum of column sizes {computed_row_length}"
        )));
    }
    for c in &columns {
        if c.field_offset + c.size > row_length {
            return Err(EngineError::malformed_table(format!(
                "column `{}` extends past row_length", c.name
            )));
        }
    }

    Ok(ParsedHeader {
        header_length,
        row_length,
        row_step,
        layout,
        row_count,
        data_length,
        columns,
    })
}
