//! Error types shared by every codec layer.

use crate::value::ObjectId;

/// Errors raised by the object model, the struct codecs and the field rules.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    /// A fixed-layout struct disagrees with its own declared dimensions.
    #[error("size mismatch loading {what}: expected {expected}, found {actual}")]
    SizeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// An event command does not carry exactly `indent`, `code` and `parameters`.
    #[error("malformed event command: {detail}")]
    MalformedEventCommand { detail: String },

    /// A self-switch key could not be formatted or parsed.
    #[error("malformed compound key: {key}")]
    MalformedCompoundKey { key: String },

    /// A sparse index map holds a key that is not a non-negative integer.
    #[error("malformed sparse index: {detail}")]
    MalformedSparseIndex { detail: String },

    /// A class name that is not part of the catalog. Callers degrade this to a
    /// placeholder entry instead of failing.
    #[error("unrecognized class: {class}")]
    UnrecognizedClass { class: String },

    /// A reference that points back at one of its own ancestors.
    #[error("cyclic reference to object {0} cannot be expanded")]
    CyclicReference(ObjectId),

    /// A reference to an object id that was never registered.
    #[error("dangling reference to object {0}")]
    DanglingReference(ObjectId),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
