use prefs_codec::CodecError;
use prefs_crypto::CryptoError;
use prefs_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrefError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("encryption error: {0}")]
    Encryption(#[from] CryptoError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("invalid import: {0}")]
    InvalidImport(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("operation aborted: {0}")]
    Aborted(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PrefError {
    /// Abort a batch or update with a caller-supplied reason.
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::Aborted(reason.into())
    }
}

pub type PrefResult<T> = Result<T, PrefError>;
