use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::aead::{AesGcmEncryption, ChaChaEncryption};
use crate::error::CryptoResult;

/// Symmetric string encryption capability.
///
/// Implementations are selected once at construction time and shared by
/// every value that crosses the persisted boundary.
pub trait EncryptionProvider: Send + Sync + fmt::Debug {
    /// Encrypt plain text into an opaque, text-safe envelope.
    fn encrypt(&self, plain_text: &str) -> CryptoResult<String>;

    /// Decrypt an envelope produced by [`encrypt`](Self::encrypt).
    fn decrypt(&self, cipher_text: &str) -> CryptoResult<String>;

    /// Generate a fresh key suitable for this provider.
    fn generate_key(&self) -> String;

    /// Whether this provider actually transforms data.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Identity provider used when no key is configured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoOpEncryption;

impl EncryptionProvider for NoOpEncryption {
    fn encrypt(&self, plain_text: &str) -> CryptoResult<String> {
        Ok(plain_text.to_string())
    }

    fn decrypt(&self, cipher_text: &str) -> CryptoResult<String> {
        Ok(cipher_text.to_string())
    }

    /// The identity provider has no key; a blank key selects it.
    fn generate_key(&self) -> String {
        String::new()
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Authenticated cipher used by an enabled provider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    #[default]
    #[serde(rename = "aes-256-gcm")]
    Aes256Gcm,
    #[serde(rename = "chacha20-poly1305")]
    ChaCha20Poly1305,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aes256Gcm => write!(f, "aes-256-gcm"),
            Self::ChaCha20Poly1305 => write!(f, "chacha20-poly1305"),
        }
    }
}

/// Build the provider for a configured key.
///
/// A missing or blank key selects [`NoOpEncryption`]; anything else must be
/// a valid base64 key for `algorithm`.
pub fn provider_for_key(
    key: Option<&str>,
    algorithm: Algorithm,
) -> CryptoResult<Arc<dyn EncryptionProvider>> {
    let key = match key.map(str::trim) {
        Some(k) if !k.is_empty() => k,
        _ => return Ok(Arc::new(NoOpEncryption)),
    };
    Ok(match algorithm {
        Algorithm::Aes256Gcm => Arc::new(AesGcmEncryption::from_key(key)?),
        Algorithm::ChaCha20Poly1305 => Arc::new(ChaChaEncryption::from_key(key)?),
    })
}

/// Generate a fresh base64 key for `algorithm`.
pub fn generate_key(algorithm: Algorithm) -> String {
    match algorithm {
        Algorithm::Aes256Gcm => AesGcmEncryption::generate(),
        Algorithm::ChaCha20Poly1305 => ChaChaEncryption::generate(),
    }
}
