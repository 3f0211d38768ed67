//! Document tags, written without the leading `!`.

/// `ruby/object:<Class>` for field-wise objects and struct leaves.
pub const OBJECT: &str = "ruby/object";
/// `ruby/marshal:<Class>` for marshal-dumped payloads.
pub const MARSHAL: &str = "ruby/marshal";
/// `ruby/userdef:<Class>` for binary blobs of unknown classes.
pub const USER_DEF: &str = "ruby/userdef";
pub const HASH_WITH_DEFAULT: &str = "ruby/hash-with-default";
pub const SYMBOL: &str = "ruby/symbol";
pub const BIGNUM: &str = "ruby/bignum";
/// `ruby/string:<Encoding>` for text outside the dialect's string encoding.
pub const STRING: &str = "ruby/string";
/// `binary` or `binary:<Encoding>` for bytes that are not valid UTF-8.
pub const BINARY: &str = "binary";
