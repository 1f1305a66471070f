use std::fmt;

use aes_gcm::aead::generic_array::typenum::Unsigned;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, AeadCore, KeyInit};
use aes_gcm::Aes256Gcm;
use chacha20poly1305::ChaCha20Poly1305;
use prefs_codec::{decode_base64, encode_base64};
use rand::RngCore;

use crate::error::{CryptoError, CryptoResult};
use crate::provider::{Algorithm, EncryptionProvider};

/// Authenticated encryption over any RustCrypto AEAD cipher.
///
/// Envelope format (base64 of):
/// ```text
/// [nonce: NonceSize bytes][ciphertext][tag: TagSize bytes]
/// ```
///
/// A fresh random nonce is drawn for every call, so encrypting the same
/// plain text twice yields different envelopes.
pub struct AeadEncryption<C> {
    cipher: C,
    algorithm: Algorithm,
}

/// AES-256-GCM provider.
pub type AesGcmEncryption = AeadEncryption<Aes256Gcm>;

/// ChaCha20-Poly1305 provider.
pub type ChaChaEncryption = AeadEncryption<ChaCha20Poly1305>;

impl AesGcmEncryption {
    /// Create from a base64-encoded 32-byte key.
    pub fn from_key(key: &str) -> CryptoResult<Self> {
        Self::with_algorithm(key, Algorithm::Aes256Gcm)
    }
}

impl ChaChaEncryption {
    /// Create from a base64-encoded 32-byte key.
    pub fn from_key(key: &str) -> CryptoResult<Self> {
        Self::with_algorithm(key, Algorithm::ChaCha20Poly1305)
    }
}

impl<C> AeadEncryption<C>
where
    C: Aead + AeadCore + KeyInit,
{
    fn with_algorithm(key: &str, algorithm: Algorithm) -> CryptoResult<Self> {
        let bytes = decode_base64(key).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let cipher = C::new_from_slice(&bytes).map_err(|_| {
            CryptoError::InvalidKey(format!(
                "expected {} bytes, got {}",
                C::KeySize::USIZE,
                bytes.len()
            ))
        })?;
        Ok(Self { cipher, algorithm })
    }

    /// Generate a random base64 key of the cipher's key size.
    pub fn generate() -> String {
        let mut key = vec![0u8; C::KeySize::USIZE];
        rand::thread_rng().fill_bytes(&mut key);
        encode_base64(&key)
    }

    /// The cipher this provider uses.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn min_envelope_len() -> usize {
        C::NonceSize::USIZE + C::TagSize::USIZE
    }
}

impl<C> EncryptionProvider for AeadEncryption<C>
where
    C: Aead + AeadCore + KeyInit + Send + Sync,
{
    fn encrypt(&self, plain_text: &str) -> CryptoResult<String> {
        let mut nonce = GenericArray::<u8, C::NonceSize>::default();
        rand::thread_rng().fill_bytes(nonce.as_mut_slice());

        let sealed = self
            .cipher
            .encrypt(&nonce, plain_text.as_bytes())
            .map_err(|_| CryptoError::Encryption)?;

        let mut envelope = Vec::with_capacity(nonce.len() + sealed.len());
        envelope.extend_from_slice(&nonce);
        envelope.extend_from_slice(&sealed);
        Ok(encode_base64(&envelope))
    }

    fn decrypt(&self, cipher_text: &str) -> CryptoResult<String> {
        let envelope =
            decode_base64(cipher_text).map_err(|e| CryptoError::Encoding(e.to_string()))?;

        let min = Self::min_envelope_len();
        if envelope.len() < min {
            return Err(CryptoError::Truncated {
                len: envelope.len(),
                min,
            });
        }

        let (nonce, sealed) = envelope.split_at(C::NonceSize::USIZE);
        let plain = self
            .cipher
            .decrypt(GenericArray::from_slice(nonce), sealed)
            .map_err(|_| CryptoError::Authentication)?;

        String::from_utf8(plain).map_err(|_| CryptoError::InvalidPlaintext)
    }

    fn generate_key(&self) -> String {
        Self::generate()
    }
}

impl<C> fmt::Debug for AeadEncryption<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AeadEncryption({}, <redacted>)", self.algorithm)
    }
}
