//! Marshal 4.8 binary codec for RGSS data files.
//!
//! Reads `.rxdata` / `.rvdata` / `.rvdata2` streams into the shared object
//! graph and writes them back byte-for-byte.
//!
//! ## Stream Layout
//!
//! ```text
//! Marshal stream:
//! ┌──────────────────────────────┐
//! │ Version: 0x04 0x08           │  2 bytes
//! ├──────────────────────────────┤
//! │ Root value                   │
//! │   type byte                  │  1 byte
//! │   payload                    │  depends on type
//! └──────────────────────────────┘
//!
//! Payloads:
//!   0 T F                 nil, true, false
//!   i <long>              fixnum
//!   l <sign> <long> <..>  bignum, count of 16-bit words then LE bytes
//!   f <bytes>             float as decimal text
//!   " <bytes>             byte string
//!   : <bytes>  ; <long>   symbol, symbol link
//!   [ <long> <values>     array
//!   { <long> <pairs>      hash; `}` adds a trailing default value
//!   o <sym> <long> <ivars>          object
//!   u <sym> <bytes>                 user-defined blob (Table, Color, ...)
//!   U <sym> <value>                 marshal-dumped object
//!   I <value> <long> <ivars>        wrapper carrying encoding ivars
//!   @ <long>                        link to an earlier object
//! ```
//!
//! `<long>` is the packed integer form: one byte for `-123..=122`, otherwise a
//! signed byte count followed by that many little-endian bytes.

mod error;
mod reader;
mod tags;
mod writer;

use std::io::{Read, Write};

use rgss_core::{Registry, Value};

pub use error::{MarshalError, Result};

use reader::Reader;
use writer::Writer;

/// Marshal format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarshalVersion {
    pub major: u8,
    pub minor: u8,
}

impl MarshalVersion {
    /// The only version the engine writes.
    pub const CURRENT: MarshalVersion = MarshalVersion {
        major: tags::MAJOR_VERSION,
        minor: tags::MINOR_VERSION,
    };
}

impl std::fmt::Display for MarshalVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// A decoded data file: the header version plus the root value.
#[derive(Debug, Clone, PartialEq)]
pub struct MarshalFile {
    pub version: MarshalVersion,
    pub root: Value,
}

impl MarshalFile {
    pub fn new(root: Value) -> Self {
        Self {
            version: MarshalVersion::CURRENT,
            root,
        }
    }

    /// Serialize to a writer. The stream is always written as version 4.8.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.to_bytes())?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        dump(&self.root)
    }

    pub fn read_from<R: Read>(reader: &mut R, registry: &Registry) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(&data, registry)
    }

    /// Deserialize from a byte slice, resolving custom leaves through `registry`.
    pub fn from_bytes(data: &[u8], registry: &Registry) -> Result<Self> {
        let mut reader = Reader::new(data, registry);
        let (major, minor) = reader.read_header()?;
        let root = reader.value()?;
        if reader.remaining() > 0 {
            log::warn!(
                "ignoring {} trailing bytes after the root value at offset {}",
                reader.remaining(),
                reader.position()
            );
        }
        Ok(Self {
            version: MarshalVersion { major, minor },
            root,
        })
    }
}

/// Decode a complete stream to its root value.
pub fn load(data: &[u8], registry: &Registry) -> Result<Value> {
    MarshalFile::from_bytes(data, registry).map(|file| file.root)
}

/// Encode a root value as a complete stream.
pub fn dump(root: &Value) -> Vec<u8> {
    let mut writer = Writer::new();
    writer.header();
    writer.value(root);
    writer.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_checked() {
        let registry = Registry::standard();
        assert!(matches!(
            MarshalFile::from_bytes(b"\x03\x00\x30", &registry),
            Err(MarshalError::UnsupportedVersion { major: 3, minor: 0 })
        ));
        assert!(matches!(
            MarshalFile::from_bytes(b"\x04", &registry),
            Err(MarshalError::UnexpectedEndOfInput { .. })
        ));
        let older = MarshalFile::from_bytes(b"\x04\x06\x30", &registry).unwrap();
        assert_eq!(older.version, MarshalVersion { major: 4, minor: 6 });
        assert_eq!(older.to_bytes(), b"\x04\x08\x30");
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let registry = Registry::standard();
        let file = MarshalFile::from_bytes(b"\x04\x08i\x06junk", &registry).unwrap();
        assert_eq!(file.root, Value::Int(1));
    }

    #[test]
    fn write_and_read_through_io() {
        let registry = Registry::standard();
        let file = MarshalFile::new(Value::Array(vec![Value::Nil, Value::Bool(true)]));
        let mut buf = Vec::new();
        file.write_to(&mut buf).unwrap();
        let back = MarshalFile::read_from(&mut buf.as_slice(), &registry).unwrap();
        assert_eq!(back, file);
        assert_eq!(MarshalVersion::CURRENT.to_string(), "4.8");
    }
}
