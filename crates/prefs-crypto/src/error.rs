/// Errors from encryption operations.
///
/// Every variant is a hard failure: callers must never fall back to the
/// ciphertext or to partially decrypted output.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("ciphertext is not valid base64: {0}")]
    Encoding(String),

    #[error("ciphertext truncated: {len} bytes, need at least {min}")]
    Truncated { len: usize, min: usize },

    #[error("ciphertext failed authentication")]
    Authentication,

    #[error("decrypted payload is not valid UTF-8")]
    InvalidPlaintext,

    #[error("encryption failed")]
    Encryption,
}

/// Result alias for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
