//! Metric value types and their wire names.
//!
//! The wire format names each primitive type with a short string (`"u32"`,
//! `"d64"`, …); fixed arrays are spelled as `{"type": "array", "items":
//! <element name>}` so array variants never appear in the name table
//! themselves. The table below is the single source of truth for what is
//! representable on the wire.

use std::fmt;

use crate::error::RegistryError;

/// The type of a single field in a schema or record definition.
///
/// Discriminants follow the metric engine's numbering; they are hashed into
/// schema digests and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ValueType {
    /// A single character.
    Char = 1,
    /// Unsigned 8-bit integer.
    U8 = 2,
    /// Signed 8-bit integer.
    S8 = 3,
    /// Unsigned 16-bit integer.
    U16 = 4,
    /// Signed 16-bit integer.
    S16 = 5,
    /// Unsigned 32-bit integer.
    U32 = 6,
    /// Signed 32-bit integer.
    S32 = 7,
    /// Unsigned 64-bit integer.
    U64 = 8,
    /// Signed 64-bit integer.
    S64 = 9,
    /// 32-bit float.
    F32 = 10,
    /// 64-bit float.
    D64 = 11,

    /// Fixed-length array of [`Char`](ValueType::Char).
    CharArray = 12,
    /// Fixed-length array of [`U8`](ValueType::U8).
    U8Array = 13,
    /// Fixed-length array of [`S8`](ValueType::S8).
    S8Array = 14,
    /// Fixed-length array of [`U16`](ValueType::U16).
    U16Array = 15,
    /// Fixed-length array of [`S16`](ValueType::S16).
    S16Array = 16,
    /// Fixed-length array of [`U32`](ValueType::U32).
    U32Array = 17,
    /// Fixed-length array of [`S32`](ValueType::S32).
    S32Array = 18,
    /// Fixed-length array of [`U64`](ValueType::U64).
    U64Array = 19,
    /// Fixed-length array of [`S64`](ValueType::S64).
    S64Array = 20,
    /// Fixed-length array of [`F32`](ValueType::F32).
    F32Array = 21,
    /// Fixed-length array of [`D64`](ValueType::D64).
    D64Array = 22,

    /// Heap-backed list of values.
    List = 23,
    /// An entry inside a list; never wire-representable.
    ListEntry = 24,
    /// A named record type definition.
    RecordType = 25,
    /// An instance of a record; never wire-representable.
    RecordInst = 26,
    /// Fixed-length array of record instances.
    RecordArray = 27,
    /// A transaction timestamp; never wire-representable.
    Timestamp = 28,
}

/// Wire-name lookup table. Must stay sorted by name: lookups use binary
/// search.
const WIRE_NAMES: &[(&str, ValueType)] = &[
    ("char", ValueType::Char),
    ("d64", ValueType::D64),
    ("double", ValueType::D64),
    ("f32", ValueType::F32),
    ("float", ValueType::F32),
    ("list", ValueType::List),
    ("long", ValueType::S64),
    ("record", ValueType::RecordType),
    ("s16", ValueType::S16),
    ("s32", ValueType::S32),
    ("s64", ValueType::S64),
    ("s8", ValueType::S8),
    ("u16", ValueType::U16),
    ("u32", ValueType::U32),
    ("u64", ValueType::U64),
    ("u8", ValueType::U8),
];

impl ValueType {
    /// Resolve a wire name to a value type.
    ///
    /// Accepts the canonical scalar names along with `list` and `record`,
    /// plus the aliases `double`, `float` and `long`. Array variants are not
    /// named directly on the wire; resolve the element name and
    /// [`promote_to_array`](ValueType::promote_to_array).
    pub fn from_wire(name: &str) -> Result<Self, RegistryError> {
        WIRE_NAMES
            .binary_search_by(|(entry, _)| (*entry).cmp(name))
            .map(|idx| WIRE_NAMES[idx].1)
            .map_err(|_| RegistryError::InvalidType(name.to_owned()))
    }

    /// The canonical wire name for this type.
    ///
    /// Array variants answer their element's name (the `[]` suffix never
    /// reaches the wire). Types that cannot be represented on the wire
    /// (`ListEntry`, `RecordInst`, `Timestamp`) and record arrays (which are
    /// named after their referenced record) fail with `InvalidType`.
    pub fn wire_name(self) -> Result<&'static str, RegistryError> {
        use ValueType::*;
        let name = match self {
            Char => "char",
            U8 => "u8",
            S8 => "s8",
            U16 => "u16",
            S16 => "s16",
            U32 => "u32",
            S32 => "s32",
            U64 => "u64",
            S64 => "s64",
            F32 => "f32",
            D64 => "d64",
            List => "list",
            RecordType => "record",
            CharArray | U8Array | S8Array | U16Array | S16Array | U32Array | S32Array
            | U64Array | S64Array | F32Array | D64Array => {
                return self
                    .element_type()
                    .expect("array variants have an element type")
                    .wire_name()
            }
            ListEntry | RecordInst | RecordArray | Timestamp => {
                return Err(RegistryError::InvalidType(self.to_string()))
            }
        };
        Ok(name)
    }

    /// The array variant of a scalar type, or `RecordArray` for
    /// `RecordType`. `None` for types with no array form.
    pub fn promote_to_array(self) -> Option<Self> {
        use ValueType::*;
        match self {
            Char => Some(CharArray),
            U8 => Some(U8Array),
            S8 => Some(S8Array),
            U16 => Some(U16Array),
            S16 => Some(S16Array),
            U32 => Some(U32Array),
            S32 => Some(S32Array),
            U64 => Some(U64Array),
            S64 => Some(S64Array),
            F32 => Some(F32Array),
            D64 => Some(D64Array),
            RecordType => Some(RecordArray),
            _ => None,
        }
    }

    /// The element type of an array variant.
    pub fn element_type(self) -> Option<Self> {
        use ValueType::*;
        match self {
            CharArray => Some(Char),
            U8Array => Some(U8),
            S8Array => Some(S8),
            U16Array => Some(U16),
            S16Array => Some(S16),
            U32Array => Some(U32),
            S32Array => Some(S32),
            U64Array => Some(U64),
            S64Array => Some(S64),
            F32Array => Some(F32),
            D64Array => Some(D64),
            RecordArray => Some(RecordType),
            _ => None,
        }
    }

    /// Whether this is a primitive scalar type.
    pub fn is_scalar(self) -> bool {
        (ValueType::Char as u32..=ValueType::D64 as u32).contains(&(self as u32))
    }

    /// Whether this is a fixed array of a primitive scalar type.
    pub fn is_scalar_array(self) -> bool {
        (ValueType::CharArray as u32..=ValueType::D64Array as u32).contains(&(self as u32))
    }

    /// Stable numeric tag, used in digest computation.
    pub fn code(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ValueType::*;
        match self {
            ListEntry => f.write_str("list_entry"),
            RecordInst => f.write_str("record_inst"),
            RecordArray => f.write_str("record[]"),
            Timestamp => f.write_str("timestamp"),
            other if other.is_scalar_array() => {
                let element = other.element_type().expect("scalar array");
                write!(f, "{}[]", element)
            }
            other => f.write_str(other.wire_name().expect("scalar, list or record")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCALARS: &[ValueType] = &[
        ValueType::Char,
        ValueType::U8,
        ValueType::S8,
        ValueType::U16,
        ValueType::S16,
        ValueType::U32,
        ValueType::S32,
        ValueType::U64,
        ValueType::S64,
        ValueType::F32,
        ValueType::D64,
    ];

    #[test]
    fn table_is_sorted() {
        for pair in WIRE_NAMES.windows(2) {
            assert!(pair[0].0 < pair[1].0, "{} >= {}", pair[0].0, pair[1].0);
        }
    }

    #[test]
    fn scalar_names_round_trip() {
        for &vt in SCALARS {
            let name = vt.wire_name().unwrap();
            assert_eq!(ValueType::from_wire(name).unwrap(), vt);
        }
        assert_eq!(
            ValueType::from_wire(ValueType::List.wire_name().unwrap()).unwrap(),
            ValueType::List
        );
        assert_eq!(
            ValueType::from_wire(ValueType::RecordType.wire_name().unwrap()).unwrap(),
            ValueType::RecordType
        );
    }

    #[test]
    fn array_names_round_trip_through_promotion() {
        for &vt in SCALARS {
            let array = vt.promote_to_array().unwrap();
            let element_name = array.wire_name().unwrap();
            let resolved = ValueType::from_wire(element_name)
                .unwrap()
                .promote_to_array()
                .unwrap();
            assert_eq!(resolved, array);
        }
    }

    #[test]
    fn aliases_resolve() {
        assert_eq!(ValueType::from_wire("double").unwrap(), ValueType::D64);
        assert_eq!(ValueType::from_wire("float").unwrap(), ValueType::F32);
        assert_eq!(ValueType::from_wire("long").unwrap(), ValueType::S64);
    }

    #[test]
    fn unknown_names_fail() {
        assert!(matches!(
            ValueType::from_wire("quaternion"),
            Err(RegistryError::InvalidType(_))
        ));
        assert!(matches!(
            ValueType::from_wire(""),
            Err(RegistryError::InvalidType(_))
        ));
    }

    #[test]
    fn non_representable_types_have_no_wire_name() {
        for vt in [
            ValueType::ListEntry,
            ValueType::RecordInst,
            ValueType::RecordArray,
            ValueType::Timestamp,
        ] {
            assert!(matches!(
                vt.wire_name(),
                Err(RegistryError::InvalidType(_))
            ));
        }
    }

    #[test]
    fn display_marks_arrays() {
        assert_eq!(ValueType::U32Array.to_string(), "u32[]");
        assert_eq!(ValueType::D64.to_string(), "d64");
        assert_eq!(ValueType::List.to_string(), "list");
    }
}
