use thiserror::Error;

/// 载荷形状不符合预期
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` has unexpected type {found}")]
    UnexpectedType {
        field: &'static str,
        found: &'static str,
    },

    #[error("byte value {0} out of range at index {1}")]
    ByteOutOfRange(i64, usize),

    #[error("invalid hex escape at offset {0}")]
    InvalidHexEscape(usize),

    #[error("invalid base64 blob: {0}")]
    InvalidBlob(String),

    #[error("image data is empty")]
    EmptyImage,
}
