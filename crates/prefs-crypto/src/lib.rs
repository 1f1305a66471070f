//! Pluggable encryption for persisted preferences.
//!
//! Provides the [`EncryptionProvider`] capability, an identity
//! [`NoOpEncryption`] used when no key is configured, and authenticated
//! encryption backed by AES-256-GCM or ChaCha20-Poly1305.
//!
//! All crypto operations wrap established RustCrypto libraries.
//! Every enabled provider is authenticated: a tampered or truncated
//! ciphertext fails to decrypt instead of yielding corrupted plaintext.

pub mod aead;
pub mod error;
pub mod provider;

pub use aead::{AeadEncryption, AesGcmEncryption, ChaChaEncryption};
pub use error::{CryptoError, CryptoResult};
pub use provider::{generate_key, provider_for_key, Algorithm, EncryptionProvider, NoOpEncryption};
