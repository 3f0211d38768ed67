//! Errors raised while reading or writing the binary stream.

use std::io;

use rgss_core::CoreError;

/// Binary codec failures. All of them are fatal for the file being converted.
#[derive(Debug, thiserror::Error)]
pub enum MarshalError {
    /// The stream ended in the middle of a value.
    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEndOfInput { offset: usize },

    /// A type byte that is not part of the supported wire format.
    #[error("unknown wire tag 0x{tag:02x} at offset {offset}")]
    UnknownWireTag { tag: u8, offset: usize },

    /// The two-byte header names a format version this codec cannot read.
    #[error("unsupported marshal format version {major}.{minor}")]
    UnsupportedVersion { major: u8, minor: u8 },

    /// An object or symbol link that points past the end of its table.
    #[error("invalid {table} link {index} at offset {offset}")]
    InvalidLink {
        table: &'static str,
        index: i64,
        offset: usize,
    },

    /// A symbol whose bytes are not valid UTF-8, or a non-symbol where one is required.
    #[error("invalid symbol at offset {offset}: {detail}")]
    InvalidSymbol { detail: String, offset: usize },

    /// A float payload that does not parse as a number.
    #[error("invalid float '{text}' at offset {offset}")]
    InvalidFloat { text: String, offset: usize },

    /// Instance variables attached to something other than a string, symbol
    /// or user-defined blob, or an ivar other than the encoding marker.
    #[error("unsupported instance variable {detail} at offset {offset}")]
    UnsupportedIvar { detail: String, offset: usize },

    /// A struct codec or model error.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias for binary codec operations.
pub type Result<T> = std::result::Result<T, MarshalError>;
