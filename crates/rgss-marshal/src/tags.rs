//! Wire type bytes.

pub const MAJOR_VERSION: u8 = 4;
pub const MINOR_VERSION: u8 = 8;

pub const NIL: u8 = b'0';
pub const TRUE: u8 = b'T';
pub const FALSE: u8 = b'F';
pub const FIXNUM: u8 = b'i';
pub const BIGNUM: u8 = b'l';
pub const FLOAT: u8 = b'f';
pub const STRING: u8 = b'"';
pub const SYMBOL: u8 = b':';
pub const SYMLINK: u8 = b';';
pub const ARRAY: u8 = b'[';
pub const HASH: u8 = b'{';
pub const HASH_DEFAULT: u8 = b'}';
pub const OBJECT: u8 = b'o';
pub const USER_DEF: u8 = b'u';
pub const USER_MARSHAL: u8 = b'U';
pub const IVAR: u8 = b'I';
pub const LINK: u8 = b'@';

/// Ivar marking a string as UTF-8 (`true`) or US-ASCII (`false`).
pub const ENCODING_SHORT: &str = "E";
/// Ivar naming any other encoding.
pub const ENCODING_LONG: &str = "encoding";
