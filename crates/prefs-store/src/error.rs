use prefs_crypto::CryptoError;

/// The persisted bytes could not be decoded into a value.
///
/// Cheap to clone so it can travel on change streams alongside good values.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("corrupt data: {reason}")]
pub struct Corruption {
    reason: String,
}

impl Corruption {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The stored bytes do not decode. Recoverable by substituting a fallback.
    #[error(transparent)]
    Corrupt(#[from] Corruption),

    /// A value could not be encoded for storage.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Decryption or encryption of the stored bytes failed.
    #[error("encryption error: {0}")]
    Encryption(#[from] CryptoError),

    /// Storage backend is read-only or otherwise unavailable.
    #[error("store is read-only")]
    ReadOnly,

    /// The update transform refused to produce a new value.
    #[error("update aborted by transform")]
    Aborted,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
