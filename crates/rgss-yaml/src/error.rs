//! Errors raised while reading or writing documents.

use rgss_core::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum YamlError {
    /// The text is not well-formed YAML.
    #[error("YAML syntax error: {0}")]
    Syntax(#[from] serde_yaml::Error),

    /// A tag this codec does not produce.
    #[error("unknown tag '!{tag}'")]
    UnknownTag { tag: String },

    /// A node of the wrong shape for its position.
    #[error("expected {expected} for {context}, found {found}")]
    UnexpectedNode {
        expected: &'static str,
        found: String,
        context: String,
    },

    /// A key a tagged mapping must carry.
    #[error("{class} is missing field '{field}'")]
    MissingField { class: String, field: String },

    /// A table row token that is not a 16-bit hex cell.
    #[error("invalid table cell '{cell}'")]
    InvalidTableCell { cell: String },

    /// A `!binary` scalar whose text is not base64.
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// A field rule, struct codec or reference failure.
    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, YamlError>;
