//! Typed values and their fixed-width byte encoding.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The type tag of a stored value.
///
/// A value must be restored with the same tag it was saved with; the
/// engine never coerces between tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Unsigned 8-bit integer.
    U8,
    /// Signed 8-bit integer.
    I8,
    /// Unsigned 16-bit integer.
    U16,
    /// Signed 16-bit integer.
    I16,
    /// Unsigned 32-bit integer.
    U32,
    /// Signed 32-bit integer.
    I32,
    /// Unsigned 64-bit integer.
    U64,
    /// Signed 64-bit integer.
    I64,
    /// NUL-terminated UTF-8 string.
    String,
    /// Opaque byte sequence with caller-declared length.
    Blob,
}

impl ValueType {
    /// All tags, in declaration order.
    pub const ALL: [ValueType; 10] = [
        ValueType::U8,
        ValueType::I8,
        ValueType::U16,
        ValueType::I16,
        ValueType::U32,
        ValueType::I32,
        ValueType::U64,
        ValueType::I64,
        ValueType::String,
        ValueType::Blob,
    ];

    /// Returns the encoded width for scalar tags, `None` for string and blob.
    #[must_use]
    pub const fn fixed_width(self) -> Option<usize> {
        match self {
            ValueType::U8 | ValueType::I8 => Some(1),
            ValueType::U16 | ValueType::I16 => Some(2),
            ValueType::U32 | ValueType::I32 => Some(4),
            ValueType::U64 | ValueType::I64 => Some(8),
            ValueType::String | ValueType::Blob => None,
        }
    }

    /// Returns true for string and blob.
    #[must_use]
    pub const fn is_variable(self) -> bool {
        self.fixed_width().is_none()
    }

    /// One-byte code of the tag, as stored in record headers.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            ValueType::U8 => 1,
            ValueType::I8 => 2,
            ValueType::U16 => 3,
            ValueType::I16 => 4,
            ValueType::U32 => 5,
            ValueType::I32 => 6,
            ValueType::U64 => 7,
            ValueType::I64 => 8,
            ValueType::String => 9,
            ValueType::Blob => 10,
        }
    }

    /// The tag with the given [`code`](Self::code), if any.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        ValueType::ALL.into_iter().find(|ty| ty.code() == code)
    }

    /// Short lowercase name, as accepted by [`FromStr`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ValueType::U8 => "u8",
            ValueType::I8 => "i8",
            ValueType::U16 => "u16",
            ValueType::I16 => "i16",
            ValueType::U32 => "u32",
            ValueType::I32 => "i32",
            ValueType::U64 => "u64",
            ValueType::I64 => "i64",
            ValueType::String => "string",
            ValueType::Blob => "blob",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ValueType::ALL
            .into_iter()
            .find(|ty| ty.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| EngineError::invalid_argument(format!("unknown value type: {s}")))
    }
}

/// A value tagged with its [`ValueType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    /// Unsigned 8-bit integer.
    U8(u8),
    /// Signed 8-bit integer.
    I8(i8),
    /// Unsigned 16-bit integer.
    U16(u16),
    /// Signed 16-bit integer.
    I16(i16),
    /// Unsigned 32-bit integer.
    U32(u32),
    /// Signed 32-bit integer.
    I32(i32),
    /// Unsigned 64-bit integer.
    U64(u64),
    /// Signed 64-bit integer.
    I64(i64),
    /// UTF-8 string without interior NUL bytes.
    String(String),
    /// Opaque bytes.
    Blob(Vec<u8>),
}

impl TypedValue {
    /// Returns the tag of this value.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            TypedValue::U8(_) => ValueType::U8,
            TypedValue::I8(_) => ValueType::I8,
            TypedValue::U16(_) => ValueType::U16,
            TypedValue::I16(_) => ValueType::I16,
            TypedValue::U32(_) => ValueType::U32,
            TypedValue::I32(_) => ValueType::I32,
            TypedValue::U64(_) => ValueType::U64,
            TypedValue::I64(_) => ValueType::I64,
            TypedValue::String(_) => ValueType::String,
            TypedValue::Blob(_) => ValueType::Blob,
        }
    }

    /// Number of bytes [`encode`](Self::encode) produces.
    ///
    /// Strings count their NUL terminator.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        match self {
            TypedValue::String(s) => s.len() + 1,
            TypedValue::Blob(b) => b.len(),
            other => other.value_type().fixed_width().unwrap_or(0),
        }
    }

    /// Encodes the value in its natural wire form.
    ///
    /// Scalars are little-endian at their natural width, strings are
    /// NUL-terminated and blobs are copied verbatim with no length prefix.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        match self {
            TypedValue::U8(v) => v.to_le_bytes().to_vec(),
            TypedValue::I8(v) => v.to_le_bytes().to_vec(),
            TypedValue::U16(v) => v.to_le_bytes().to_vec(),
            TypedValue::I16(v) => v.to_le_bytes().to_vec(),
            TypedValue::U32(v) => v.to_le_bytes().to_vec(),
            TypedValue::I32(v) => v.to_le_bytes().to_vec(),
            TypedValue::U64(v) => v.to_le_bytes().to_vec(),
            TypedValue::I64(v) => v.to_le_bytes().to_vec(),
            TypedValue::String(s) => {
                let mut out = Vec::with_capacity(s.len() + 1);
                out.extend_from_slice(s.as_bytes());
                out.push(0);
                out
            }
            TypedValue::Blob(b) => b.clone(),
        }
    }

    /// Decodes `bytes` as a value of type `ty`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidLength`] if a scalar does not have its
    /// exact width, or [`EngineError::TypeMismatch`] if a string is not
    /// NUL-terminated UTF-8.
    pub fn decode(ty: ValueType, bytes: &[u8]) -> EngineResult<Self> {
        if let Some(width) = ty.fixed_width() {
            if bytes.len() != width {
                return Err(EngineError::InvalidLength {
                    expected: width,
                    actual: bytes.len(),
                });
            }
        }

        let value = match ty {
            ValueType::U8 => TypedValue::U8(u8::from_le_bytes([bytes[0]])),
            ValueType::I8 => TypedValue::I8(i8::from_le_bytes([bytes[0]])),
            ValueType::U16 => TypedValue::U16(u16::from_le_bytes(fixed(bytes))),
            ValueType::I16 => TypedValue::I16(i16::from_le_bytes(fixed(bytes))),
            ValueType::U32 => TypedValue::U32(u32::from_le_bytes(fixed(bytes))),
            ValueType::I32 => TypedValue::I32(i32::from_le_bytes(fixed(bytes))),
            ValueType::U64 => TypedValue::U64(u64::from_le_bytes(fixed(bytes))),
            ValueType::I64 => TypedValue::I64(i64::from_le_bytes(fixed(bytes))),
            ValueType::String => {
                let Some((&0, body)) = bytes.split_last() else {
                    return Err(EngineError::TypeMismatch {
                        expected: ValueType::String,
                        actual: None,
                    });
                };
                if body.contains(&0) {
                    return Err(EngineError::TypeMismatch {
                        expected: ValueType::String,
                        actual: None,
                    });
                }
                let s = std::str::from_utf8(body).map_err(|_| EngineError::TypeMismatch {
                    expected: ValueType::String,
                    actual: None,
                })?;
                TypedValue::String(s.to_owned())
            }
            ValueType::Blob => TypedValue::Blob(bytes.to_vec()),
        };
        Ok(value)
    }

    /// Parses a textual value of type `ty`.
    ///
    /// Blobs are given as hex digits (`"deadbeef"`).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidArgument`] if `text` does not parse.
    pub fn parse(ty: ValueType, text: &str) -> EngineResult<Self> {
        fn num<T: FromStr>(ty: ValueType, text: &str) -> EngineResult<T> {
            text.trim()
                .parse()
                .map_err(|_| EngineError::invalid_argument(format!("not a valid {ty}: {text}")))
        }

        Ok(match ty {
            ValueType::U8 => TypedValue::U8(num(ty, text)?),
            ValueType::I8 => TypedValue::I8(num(ty, text)?),
            ValueType::U16 => TypedValue::U16(num(ty, text)?),
            ValueType::I16 => TypedValue::I16(num(ty, text)?),
            ValueType::U32 => TypedValue::U32(num(ty, text)?),
            ValueType::I32 => TypedValue::I32(num(ty, text)?),
            ValueType::U64 => TypedValue::U64(num(ty, text)?),
            ValueType::I64 => TypedValue::I64(num(ty, text)?),
            ValueType::String => TypedValue::String(text.to_owned()),
            ValueType::Blob => TypedValue::Blob(parse_hex(text)?),
        })
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::U8(v) => write!(f, "{v}"),
            TypedValue::I8(v) => write!(f, "{v}"),
            TypedValue::U16(v) => write!(f, "{v}"),
            TypedValue::I16(v) => write!(f, "{v}"),
            TypedValue::U32(v) => write!(f, "{v}"),
            TypedValue::I32(v) => write!(f, "{v}"),
            TypedValue::U64(v) => write!(f, "{v}"),
            TypedValue::I64(v) => write!(f, "{v}"),
            TypedValue::String(s) => f.write_str(s),
            TypedValue::Blob(b) => b.iter().try_for_each(|byte| write!(f, "{byte:02x}")),
        }
    }
}

fn fixed<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

fn parse_hex(text: &str) -> EngineResult<Vec<u8>> {
    let text = text.trim();
    if text.len() % 2 != 0 {
        return Err(EngineError::invalid_argument("hex blob needs an even number of digits"));
    }
    (0..text.len())
        .step_by(2)
        .map(|i| {
            text.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| EngineError::invalid_argument(format!("invalid hex blob: {text}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn value_strategy() -> impl Strategy<Value = TypedValue> {
        prop_oneof![
            any::<u8>().prop_map(TypedValue::U8),
            any::<i8>().prop_map(TypedValue::I8),
            any::<u16>().prop_map(TypedValue::U16),
            any::<i16>().prop_map(TypedValue::I16),
            any::<u32>().prop_map(TypedValue::U32),
            any::<i32>().prop_map(TypedValue::I32),
            any::<u64>().prop_map(TypedValue::U64),
            any::<i64>().prop_map(TypedValue::I64),
            r"[^\x00]{0,32}".prop_map(TypedValue::String),
            prop::collection::vec(any::<u8>(), 0..64).prop_map(TypedValue::Blob),
        ]
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(value in value_strategy()) {
            let bytes = value.encode();
            prop_assert_eq!(bytes.len(), value.encoded_len());
            let decoded = TypedValue::decode(value.value_type(), &bytes).unwrap();
            prop_assert_eq!(decoded, value);
        }
    }

    #[test]
    fn tag_codes_are_distinct_and_nonzero() {
        for ty in ValueType::ALL {
            assert_ne!(ty.code(), 0);
            assert_eq!(ValueType::from_code(ty.code()), Some(ty));
        }
        assert_eq!(ValueType::from_code(0), None);
        assert_eq!(ValueType::from_code(11), None);
    }

    #[test]
    fn scalars_are_little_endian() {
        assert_eq!(TypedValue::U32(42).encode(), vec![42, 0, 0, 0]);
        assert_eq!(TypedValue::I16(-2).encode(), vec![0xfe, 0xff]);
    }

    #[test]
    fn string_is_nul_terminated() {
        assert_eq!(TypedValue::String("ab".into()).encode(), b"ab\0".to_vec());
    }

    #[test]
    fn decode_rejects_wrong_width() {
        let err = TypedValue::decode(ValueType::U32, &[1, 2]).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidLength {
                expected: 4,
                actual: 2
            }
        ));
    }

    #[test]
    fn decode_rejects_unterminated_string() {
        let err = TypedValue::decode(ValueType::String, b"abc").unwrap_err();
        assert!(matches!(err, EngineError::TypeMismatch { .. }));
    }

    #[test]
    fn parse_and_display() {
        let v = TypedValue::parse(ValueType::I64, "-7").unwrap();
        assert_eq!(v, TypedValue::I64(-7));
        let blob = TypedValue::parse(ValueType::Blob, "00ff10").unwrap();
        assert_eq!(blob, TypedValue::Blob(vec![0, 0xff, 0x10]));
        assert_eq!(blob.to_string(), "00ff10");
        assert!(TypedValue::parse(ValueType::U8, "300").is_err());
        assert!(TypedValue::parse(ValueType::Blob, "abc").is_err());
    }

    #[test]
    fn type_names_round_trip() {
        for ty in ValueType::ALL {
            assert_eq!(ty.as_str().parse::<ValueType>().unwrap(), ty);
        }
        assert!("float".parse::<ValueType>().is_err());
    }
}
