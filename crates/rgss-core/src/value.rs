//! The object graph shared by the binary and document codecs.
//!
//! A [`Value`] is the in-memory form of one node of a data file: scalars,
//! ordered sequences, ordered mappings, tagged objects and the custom binary
//! leaves. Shared or self-referential objects appear once in full and every
//! later occurrence is a [`Value::Ref`] to the id the first one received in
//! the encounter-order object table.

use std::fmt;

use crate::structs::Leaf;

/// Smallest integer that is written inline as a fixnum.
pub const FIXNUM_MIN: i64 = -(1 << 30);

/// Largest integer that is written inline as a fixnum.
pub const FIXNUM_MAX: i64 = (1 << 30) - 1;

/// Index into the encounter-order object table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub usize);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Character encoding attached to a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// No encoding marker: raw bytes.
    Binary,
    Utf8,
    UsAscii,
    /// Any other encoding, stored by name (e.g. `Shift_JIS`).
    Named(String),
}

impl Encoding {
    /// The canonical encoding name.
    pub fn name(&self) -> &str {
        match self {
            Encoding::Binary => "ASCII-8BIT",
            Encoding::Utf8 => "UTF-8",
            Encoding::UsAscii => "US-ASCII",
            Encoding::Named(name) => name,
        }
    }

    /// Inverse of [`Encoding::name`]; unknown names become [`Encoding::Named`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "ASCII-8BIT" | "BINARY" => Encoding::Binary,
            "UTF-8" => Encoding::Utf8,
            "US-ASCII" => Encoding::UsAscii,
            other => Encoding::Named(other.to_string()),
        }
    }
}

/// A byte string plus its encoding marker.
#[derive(Debug, Clone, PartialEq)]
pub struct RString {
    pub bytes: Vec<u8>,
    pub encoding: Encoding,
}

impl RString {
    pub fn new(bytes: impl Into<Vec<u8>>, encoding: Encoding) -> Self {
        Self {
            bytes: bytes.into(),
            encoding,
        }
    }

    /// A UTF-8 tagged string.
    pub fn utf8(text: impl Into<String>) -> Self {
        Self::new(text.into().into_bytes(), Encoding::Utf8)
    }

    /// A string without an encoding marker.
    pub fn binary(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(bytes, Encoding::Binary)
    }

    /// The contents as text, if they are valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }
}

/// An integer outside the `i64` range, kept as sign plus magnitude.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BigInt {
    pub negative: bool,
    /// Little-endian magnitude bytes, padded to an even length.
    pub magnitude: Vec<u8>,
}

impl BigInt {
    /// Build from sign and little-endian magnitude, normalising the padding.
    pub fn new(negative: bool, magnitude: impl Into<Vec<u8>>) -> Self {
        let mut magnitude = magnitude.into();
        while magnitude.last() == Some(&0) {
            magnitude.pop();
        }
        if magnitude.len() % 2 == 1 {
            magnitude.push(0);
        }
        Self {
            negative,
            magnitude,
        }
    }

    pub fn from_i64(value: i64) -> Self {
        Self::new(value < 0, value.unsigned_abs().to_le_bytes())
    }

    /// The value as an `i64`, when it fits.
    pub fn to_i64(&self) -> Option<i64> {
        let significant = self.magnitude.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        if significant > 8 {
            return None;
        }
        let mut raw = [0u8; 8];
        raw[..significant].copy_from_slice(&self.magnitude[..significant]);
        let abs = u64::from_le_bytes(raw);
        if self.negative {
            if abs <= i64::MAX as u64 + 1 {
                Some((abs as i64).wrapping_neg())
            } else {
                None
            }
        } else {
            i64::try_from(abs).ok()
        }
    }

    /// Render as signed hexadecimal, e.g. `-0x1f00000000000000000`.
    pub fn to_hex(&self) -> String {
        let mut digits: String = self
            .magnitude
            .iter()
            .rev()
            .map(|b| format!("{b:02x}"))
            .collect::<String>()
            .trim_start_matches('0')
            .to_string();
        if digits.is_empty() {
            digits.push('0');
        }
        format!("{}0x{digits}", if self.negative { "-" } else { "" })
    }

    /// Parse the output of [`BigInt::to_hex`].
    pub fn from_hex(text: &str) -> Option<Self> {
        let (negative, rest) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let hex = rest.strip_prefix("0x")?;
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let padded = if hex.len() % 2 == 1 {
            format!("0{hex}")
        } else {
            hex.to_string()
        };
        let mut magnitude = Vec::with_capacity(padded.len() / 2);
        for pair in padded.as_bytes().chunks(2).rev() {
            let pair = std::str::from_utf8(pair).ok()?;
            magnitude.push(u8::from_str_radix(pair, 16).ok()?);
        }
        Some(Self::new(negative, magnitude))
    }
}

/// An ordered mapping, optionally with a default value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Hash {
    pub entries: Vec<(Value, Value)>,
    pub default: Option<Box<Value>>,
}

impl Hash {
    pub fn new(entries: Vec<(Value, Value)>) -> Self {
        Self {
            entries,
            default: None,
        }
    }

    /// Look up a key by structural equality.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// A tagged object: a class name plus its named fields in stored order.
///
/// Field names are stored without the `@` prefix they carry on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub class: String,
    pub fields: Vec<(String, Value)>,
}

impl Object {
    pub fn new(class: impl Into<String>, fields: Vec<(String, Value)>) -> Self {
        Self {
            class: class.into(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

/// An object stored through its marshal-dump hook: one nested payload value.
#[derive(Debug, Clone, PartialEq)]
pub struct UserMarshal {
    pub class: String,
    pub data: Box<Value>,
}

/// One node of the object graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    BigInt(BigInt),
    Float(f64),
    String(RString),
    Symbol(String),
    Array(Vec<Value>),
    Hash(Hash),
    Object(Object),
    Leaf(Leaf),
    UserMarshal(UserMarshal),
    /// A repeated encounter of an object registered earlier.
    Ref(ObjectId),
}

impl Value {
    /// Shorthand for a UTF-8 string value.
    pub fn str(text: impl Into<String>) -> Self {
        Value::String(RString::utf8(text))
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Value::Symbol(name.into())
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::BigInt(_) => "bignum",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Array(_) => "array",
            Value::Hash(_) => "hash",
            Value::Object(_) => "object",
            Value::Leaf(_) => "leaf",
            Value::UserMarshal(_) => "user-marshal object",
            Value::Ref(_) => "reference",
        }
    }
}

/// Whether an integer is written inline rather than as a registered bignum.
pub fn is_fixnum(value: i64) -> bool {
    (FIXNUM_MIN..=FIXNUM_MAX).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixnum_bounds() {
        assert!(is_fixnum(0));
        assert!(is_fixnum(FIXNUM_MAX));
        assert!(is_fixnum(FIXNUM_MIN));
        assert!(!is_fixnum(FIXNUM_MAX + 1));
        assert!(!is_fixnum(FIXNUM_MIN - 1));
    }

    #[test]
    fn bigint_i64_conversion() {
        for v in [0, 1, -1, 1 << 30, -(1 << 40), i64::MAX, i64::MIN] {
            assert_eq!(BigInt::from_i64(v).to_i64(), Some(v));
        }
        let huge = BigInt::new(false, vec![0, 0, 0, 0, 0, 0, 0, 0, 1, 0]);
        assert_eq!(huge.to_i64(), None);
    }

    #[test]
    fn bigint_magnitude_is_even() {
        let b = BigInt::from_i64(1 << 40);
        assert_eq!(b.magnitude, vec![0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn bigint_hex() {
        let b = BigInt::new(true, vec![0x00, 0x01, 0, 0, 0, 0, 0, 0, 0x1f, 0]);
        assert_eq!(b.to_hex(), "-0x1f0000000000000100");
        assert_eq!(BigInt::from_hex(&b.to_hex()), Some(b));
        assert_eq!(BigInt::from_hex("12"), None);
        assert_eq!(BigInt::from_hex("0xzz"), None);
    }

    #[test]
    fn encoding_names() {
        for enc in [
            Encoding::Binary,
            Encoding::Utf8,
            Encoding::UsAscii,
            Encoding::Named("Shift_JIS".into()),
        ] {
            assert_eq!(Encoding::from_name(enc.name()), enc);
        }
    }

    #[test]
    fn object_field_lookup() {
        let obj = Object::new("RPG::SE", vec![("name".into(), Value::str("Cursor"))]);
        assert_eq!(obj.field("name"), Some(&Value::str("Cursor")));
        assert_eq!(obj.field("volume"), None);
    }
}
