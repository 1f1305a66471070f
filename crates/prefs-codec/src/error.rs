use thiserror::Error;

/// Errors produced by codec conversions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("encode error: {0}")]
    Encode(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("invalid base64: {0}")]
    Base64(String),
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
