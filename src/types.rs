//! The primitive type registry.
//!
//! The type set is closed and small: `TypeId` is a plain fixed enum rather than a
//! runtime-registered table — there is nothing to "register", only nine wire-stable
//! cases to dispatch on. The wire indices below are load-bearing and must never be
//! reordered; they are what lets a table header be self-describing.

use std::fmt;

/// A column's physical type, tagged with its wire-format type index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum TypeId {
    U32 = 0,
    I32 = 1,
    F32 = 2,
    U16 = 3,
    I16 = 4,
    U8 = 5,
    I8 = 6,
    Bstr = 7,
    Void = 8,
}

impl TypeId {
    pub fn from_index(idx: u32) -> Option<Self> {
        Some(match idx {
            0 => Self::U32,
            1 => Self::I32,
            2 => Self::F32,
            3 => Self::U16,
            4 => Self::I16,
            5 => Self::U8,
            6 => Self::I8,
            7 => Self::Bstr,
            8 => Self::Void,
            _ => return None,
        })
    }

    pub const fn index(self) -> u32 {
        self as u32
    }

    /// Fixed byte width for every type except `Bstr`, whose storage width is the
    /// column's declared bound, not a property of the type itself.
    pub const fn fixed_byte_size(self) -> Option<u32> {
        Some(match self {
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U16 | Self::I16 => 2,
            Self::U8 | Self::I8 => 1,
            Self::Void => 1,
            Self::Bstr => return None,
        })
    }

    pub const fn bit_size(self) -> Option<u32> {
        match self.fixed_byte_size() {
            Some(bytes) => Some(bytes * 8),
            None => None,
        }
    }

    pub const fn is_primitive(self) -> bool {
        !matches!(self, Self::Void)
    }

    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::U32 | Self::I32 | Self::F32 | Self::U16 | Self::I16 | Self::U8 | Self::I8
        )
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::U32 => "U32",
            Self::I32 => "I32",
            Self::F32 => "F32",
            Self::U16 => "U16",
            Self::I16 => "I16",
            Self::U8 => "U8",
            Self::I8 => "I8",
            Self::Bstr => "BSTR",
            Self::Void => "VOID",
        }
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reads `bytes[..ty.fixed_byte_size()]` as a little-endian value of `ty`.
///
/// Panics if `ty` is `Bstr` or `Void`, or if `bytes` is shorter than the type's width;
/// callers (the row cursor, the filter engine) always slice to the exact column width
/// first, so this is an internal contract rather than a user-facing API.
pub fn read_le(ty: TypeId, bytes: &[u8]) -> Number {
    match ty {
        TypeId::U32 => Number::U32(u32::from_le_bytes(bytes[..4].try_into().unwrap())),
        TypeId::I32 => Number::I32(i32::from_le_bytes(bytes[..4].try_into().unwrap())),
        TypeId::F32 => Number::F32(f32::from_le_bytes(bytes[..4].try_into().unwrap())),
        TypeId::U16 => Number::U32(u16::from_le_bytes(bytes[..2].try_into().unwrap()) as u32),
        TypeId::I16 => Number::I32(i16::from_le_bytes(bytes[..2].try_into().unwrap()) as i32),
        TypeId::U8 => Number::U32(bytes[0] as u32),
        TypeId::I8 => Number::I32(bytes[0] as i8 as i32),
        TypeId::Bstr | TypeId::Void => panic!("{ty} has no numeric representation"),
    }
}

/// Writes the low bytes of `value` at `bytes[..ty.fixed_byte_size()]`, little-endian.
pub fn write_le(ty: TypeId, bytes: &mut [u8], value: Number) {
    match (ty, value) {
        (TypeId::U32, Number::U32(v)) => bytes[..4].copy_from_slice(&v.to_le_bytes()),
        (TypeId::I32, Number::I32(v)) => bytes[..4].copy_from_slice(&v.to_le_bytes()),
        (TypeId::F32, Number::F32(v)) => bytes[..4].copy_from_slice(&v.to_le_bytes()),
        (TypeId::U16, Number::U32(v)) => bytes[..2].copy_from_slice(&(v as u16).to_le_bytes()),
        (TypeId::I16, Number::I32(v)) => bytes[..2].copy_from_slice(&(v as i16).to_le_bytes()),
        (TypeId::U8, Number::U32(v)) => bytes[0] = v as u8,
        (TypeId::I8, Number::I32(v)) => bytes[0] = v as i8 as u8,
        (ty, value) => panic!("cannot write {value:?} into a column of type {ty}"),
    }
}

/// A numeric value widened to a common runtime representation, used by the filter
/// engine's predicate closures and by `RowCursor`'s numeric getters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    U32(u32),
    I32(i32),
    F32(f32),
}

impl Number {
    /// Total ordering on `F32` via `decorum`, so filter comparisons never have to
    /// handle `partial_cmp` returning `None` on the hot path.
    pub fn total_cmp(&self, other: &Number) -> Option<std::cmp::Ordering> {
        use decorum::Total;
        match (self, other) {
            (Number::U32(a), Number::U32(b)) => Some(a.cmp(b)),
            (Number::I32(a), Number::I32(b)) => Some(a.cmp(b)),
            (Number::F32(a), Number::F32(b)) => Some(Total::from(*a).cmp(&Total::from(*b))),
            _ => None,
        }
    }

    /// Widens a literal scalar to the runtime representation `ty`'s getters return,
    /// so a rule's comparison value can be pre-parsed once at compile time instead of
    /// re-widened on every row.
    pub fn from_f64(ty: TypeId, value: f64) -> Option<Number> {
        match ty {
            TypeId::U32 | TypeId::U16 | TypeId::U8 => Some(Number::U32(value as u32)),
            TypeId::I32 | TypeId::I16 | TypeId::I8 => Some(Number::I32(value as i32)),
            TypeId::F32 => Some(Number::F32(value as f32)),
            TypeId::Bstr | TypeId::Void => None,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::U32(v) => v as f64,
            Number::I32(v) => v as f64,
            Number::F32(v) => v as f64,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips_wire_indices() {
        for idx in 0..=8u32 {
            let ty = TypeId::from_index(idx).unwrap();
            assert_eq!(ty.index(), idx);
        }
        assert!(TypeId::from_index(9).is_none());
    }

    #[test]
    fn fixed_sizes_match_known_widths() {
        assert_eq!(TypeId::U32.fixed_byte_size(), Some(4));
        assert_eq!(TypeId::I16.fixed_byte_size(), Some(2));
        assert_eq!(TypeId::U8.fixed_byte_size(), Some(1));
        assert_eq!(TypeId::Void.fixed_byte_size(), Some(1));
        assert_eq!(TypeId::Bstr.fixed_byte_size(), None);
    }
}
