//! Field codec: interpret one field's bytes according to its base type.
//!
//! Pure data transformation. The declared field size is authoritative for
//! how many bytes a field occupies; the base type only selects how those
//! bytes are read. Multi-byte integers are little-endian.

use std::fmt;

/// Base type codes understood by the codec.
pub mod base_type {
    pub const ENUM: u8 = 0x00;
    pub const SINT8: u8 = 0x01;
    pub const UINT8: u8 = 0x02;
    pub const STRING: u8 = 0x07;
    pub const SINT16: u8 = 0x83;
    pub const UINT16: u8 = 0x84;
    pub const SINT32: u8 = 0x85;
    pub const UINT32: u8 = 0x86;
    pub const UINT32Z: u8 = 0x8C;
}

/// One decoded field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedValue {
    Enum(u8),
    SInt8(i8),
    UInt8(u8),
    Text(String),
    SInt16(i16),
    UInt16(u16),
    SInt32(i32),
    UInt32(u32),
    /// A base type the codec does not interpret. The field's bytes are still
    /// consumed so the stream stays framed.
    Unsupported { base_type: u8, len: usize },
}

impl DecodedValue {
    /// Integer view of the value; `None` for text and unsupported types.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Enum(v) | Self::UInt8(v) => Some(i64::from(v)),
            Self::SInt8(v) => Some(i64::from(v)),
            Self::SInt16(v) => Some(i64::from(v)),
            Self::UInt16(v) => Some(i64::from(v)),
            Self::SInt32(v) => Some(i64::from(v)),
            Self::UInt32(v) => Some(i64::from(v)),
            Self::Text(_) | Self::Unsupported { .. } => None,
        }
    }

    /// Short type label used in record dumps.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Enum(_) => "enum",
            Self::SInt8(_) => "s8",
            Self::UInt8(_) => "u8",
            Self::Text(_) => "string",
            Self::SInt16(_) => "s16",
            Self::UInt16(_) => "u16",
            Self::SInt32(_) => "s32",
            Self::UInt32(_) => "u32",
            Self::Unsupported { .. } => "unknown",
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported { .. })
    }
}

/// Dump form: type, decimal value, and zero-padded hex of the integer width.
impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enum(v) => write!(f, "(enum){v} {v:02X}"),
            Self::SInt8(v) => write!(f, "(s8){v} {:02X}", *v as u8),
            Self::UInt8(v) => write!(f, "(u8){v} {v:02X}"),
            Self::Text(s) => write!(f, "(string){s}"),
            Self::SInt16(v) => write!(f, "(s16){v} {:04X}", *v as u16),
            Self::UInt16(v) => write!(f, "(u16){v} {v:04X}"),
            Self::SInt32(v) => write!(f, "(s32){v} {:08X}", *v as u32),
            Self::UInt32(v) => write!(f, "(u32){v} {v:08X}"),
            Self::Unsupported { base_type, len } => {
                write!(f, "unknown type {base_type} {base_type:X} ({len} bytes)")
            }
        }
    }
}

/// Decode one field.
///
/// `bytes` must hold at least `size` bytes; only the first `size` are read.
/// A size shorter than the type's natural width is zero-extended, a longer
/// one (an array field) yields its first element. Never panics.
pub fn decode(base_type: u8, size: usize, bytes: &[u8]) -> DecodedValue {
    let field = &bytes[..size.min(bytes.len())];

    match base_type {
        base_type::ENUM => DecodedValue::Enum(le_bytes::<1>(field)[0]),
        base_type::SINT8 => DecodedValue::SInt8(le_bytes::<1>(field)[0] as i8),
        base_type::UINT8 => DecodedValue::UInt8(le_bytes::<1>(field)[0]),
        base_type::STRING => DecodedValue::Text(decode_text(field)),
        base_type::SINT16 => DecodedValue::SInt16(i16::from_le_bytes(le_bytes(field))),
        base_type::UINT16 => DecodedValue::UInt16(u16::from_le_bytes(le_bytes(field))),
        base_type::SINT32 => DecodedValue::SInt32(i32::from_le_bytes(le_bytes(field))),
        base_type::UINT32 | base_type::UINT32Z => {
            DecodedValue::UInt32(u32::from_le_bytes(le_bytes(field)))
        }
        other => DecodedValue::Unsupported {
            base_type: other,
            len: field.len(),
        },
    }
}

/// The first `N` bytes of `field`, zero-padded when it is shorter.
fn le_bytes<const N: usize>(field: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    let n = field.len().min(N);
    out[..n].copy_from_slice(&field[..n]);
    out
}

/// Text of the declared length, cut at the first NUL terminator.
fn decode_text(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
