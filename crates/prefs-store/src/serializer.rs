use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use prefs_codec::{
    decode_base64, encode_base64, from_bincode, from_json, to_bincode, to_json_pretty,
};
use prefs_crypto::{CryptoError, EncryptionProvider};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Corruption, StoreError, StoreResult};

/// Converts the persisted value to and from bytes.
pub trait Serializer<P>: Send + Sync {
    /// Value of a store whose backing bytes do not exist yet.
    fn default_value(&self) -> P;

    /// Decode stored bytes.
    ///
    /// Undecodable input must be reported as `StoreError::Corrupt`.
    fn read(&self, bytes: &[u8]) -> StoreResult<P>;

    /// Encode a value for storage.
    fn write(&self, value: &P) -> StoreResult<Vec<u8>>;
}

/// Human-readable JSON encoding.
pub struct JsonSerializer<P> {
    default: P,
}

impl<P> JsonSerializer<P> {
    pub fn new(default: P) -> Self {
        Self { default }
    }
}

impl<P> Serializer<P> for JsonSerializer<P>
where
    P: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    fn default_value(&self) -> P {
        self.default.clone()
    }

    fn read(&self, bytes: &[u8]) -> StoreResult<P> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| Corruption::new(format!("not UTF-8: {e}")))?;
        from_json(text).map_err(|e| Corruption::new(e.to_string()).into())
    }

    fn write(&self, value: &P) -> StoreResult<Vec<u8>> {
        to_json_pretty(value)
            .map(String::into_bytes)
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

/// Compact binary encoding.
///
/// Bincode is not self-describing: types that deserialize through
/// `deserialize_any` or `deserialize_identifier` (`serde_json::Value`,
/// internally or adjacently tagged enums) encode fine but never decode.
/// [`checked`](Self::checked) rejects such types up front.
pub struct BincodeSerializer<P> {
    default: P,
}

impl<P> BincodeSerializer<P> {
    pub fn new(default: P) -> Self {
        Self { default }
    }
}

impl<P> BincodeSerializer<P>
where
    P: Serialize + DeserializeOwned + PartialEq,
{
    /// Like [`new`](Self::new), but fails unless `default` survives a
    /// bincode round trip.
    pub fn checked(default: P) -> StoreResult<Self> {
        let bytes = to_bincode(&default).map_err(|e| StoreError::Serialization(e.to_string()))?;
        match from_bincode::<P>(&bytes) {
            Ok(decoded) if decoded == default => Ok(Self { default }),
            Ok(_) => Err(StoreError::Serialization(
                "bincode round trip changed the default value".into(),
            )),
            Err(e) => Err(StoreError::Serialization(format!(
                "type cannot be decoded from bincode: {e}"
            ))),
        }
    }
}

impl<P> Serializer<P> for BincodeSerializer<P>
where
    P: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    fn default_value(&self) -> P {
        self.default.clone()
    }

    fn read(&self, bytes: &[u8]) -> StoreResult<P> {
        from_bincode(bytes).map_err(|e| Corruption::new(e.to_string()).into())
    }

    fn write(&self, value: &P) -> StoreResult<Vec<u8>> {
        to_bincode(value).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

/// Encrypts the whole persisted object.
///
/// The inner serializer's bytes are base64-encoded and sealed by the
/// provider. A stored envelope that fails to decrypt is an
/// `StoreError::Encryption`, never corruption: the store refuses to guess
/// what the plain text was.
pub struct EncryptedSerializer<P> {
    inner: Arc<dyn Serializer<P>>,
    provider: Arc<dyn EncryptionProvider>,
    _marker: PhantomData<fn() -> P>,
}

impl<P> EncryptedSerializer<P> {
    pub fn new(inner: Arc<dyn Serializer<P>>, provider: Arc<dyn EncryptionProvider>) -> Self {
        Self {
            inner,
            provider,
            _marker: PhantomData,
        }
    }
}

impl<P> Serializer<P> for EncryptedSerializer<P> {
    fn default_value(&self) -> P {
        self.inner.default_value()
    }

    fn read(&self, bytes: &[u8]) -> StoreResult<P> {
        let envelope = std::str::from_utf8(bytes)
            .map_err(|e| CryptoError::Encoding(e.to_string()))?;
        let plain = self.provider.decrypt(envelope.trim())?;
        let inner_bytes =
            decode_base64(&plain).map_err(|e| Corruption::new(format!("inner payload: {e}")))?;
        self.inner.read(&inner_bytes)
    }

    fn write(&self, value: &P) -> StoreResult<Vec<u8>> {
        let inner_bytes = self.inner.write(value)?;
        let sealed = self.provider.encrypt(&encode_base64(&inner_bytes))?;
        Ok(sealed.into_bytes())
    }
}

impl<P> fmt::Debug for EncryptedSerializer<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedSerializer")
            .field("provider", &self.provider)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prefs_crypto::{AesGcmEncryption, NoOpEncryption};
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
    struct Settings {
        theme: String,
        volume: u8,
    }

    fn sample() -> Settings {
        Settings {
            theme: "dark".into(),
            volume: 3,
        }
    }

    fn aes() -> Arc<dyn EncryptionProvider> {
        Arc::new(AesGcmEncryption::from_key(&AesGcmEncryption::generate()).unwrap())
    }

    #[test]
    fn json_roundtrip_is_readable() {
        let s = JsonSerializer::new(Settings::default());
        let bytes = s.write(&sample()).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains("\"theme\": \"dark\""));
        assert_eq!(s.read(&bytes).unwrap(), sample());
    }

    #[test]
    fn json_garbage_is_corruption() {
        let s = JsonSerializer::new(Settings::default());
        assert!(matches!(s.read(b"{oops"), Err(StoreError::Corrupt(_))));
        assert!(matches!(s.read(&[0xff, 0xfe]), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn bincode_roundtrip() {
        let s = BincodeSerializer::new(Settings::default());
        let bytes = s.write(&sample()).unwrap();
        assert_eq!(s.read(&bytes).unwrap(), sample());
        assert!(matches!(s.read(&bytes[..2]), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn checked_bincode_accepts_plain_structs() {
        let s = BincodeSerializer::checked(sample()).unwrap();
        assert_eq!(s.read(&s.write(&sample()).unwrap()).unwrap(), sample());
    }

    #[test]
    fn checked_bincode_rejects_self_describing_types() {
        let err = BincodeSerializer::checked(serde_json::json!({})).err().unwrap();
        assert!(matches!(err, StoreError::Serialization(_)));

        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(tag = "kind")]
        enum Tagged {
            A,
        }
        assert!(BincodeSerializer::checked(Tagged::A).is_err());
    }

    #[test]
    fn default_value_comes_from_constructor() {
        let s = JsonSerializer::new(sample());
        assert_eq!(s.default_value(), sample());
    }

    #[test]
    fn encrypted_roundtrip_hides_plaintext() {
        let inner: Arc<dyn Serializer<Settings>> =
            Arc::new(JsonSerializer::new(Settings::default()));
        let s = EncryptedSerializer::new(inner, aes());
        let bytes = s.write(&sample()).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(!text.contains("dark"));
        assert_eq!(s.read(&bytes).unwrap(), sample());
    }

    #[test]
    fn encrypted_tampering_is_encryption_error_not_corruption() {
        let inner: Arc<dyn Serializer<Settings>> =
            Arc::new(JsonSerializer::new(Settings::default()));
        let s = EncryptedSerializer::new(inner, aes());
        let bytes = s.write(&sample()).unwrap();
        let mut raw = decode_base64(std::str::from_utf8(&bytes).unwrap()).unwrap();
        raw[20] ^= 0x80;
        let tampered = encode_base64(&raw).into_bytes();
        assert!(matches!(
            s.read(&tampered),
            Err(StoreError::Encryption(CryptoError::Authentication))
        ));
    }

    #[test]
    fn encrypted_with_noop_still_wraps_in_base64() {
        let inner: Arc<dyn Serializer<Settings>> =
            Arc::new(JsonSerializer::new(Settings::default()));
        let s = EncryptedSerializer::new(inner, Arc::new(NoOpEncryption));
        let bytes = s.write(&sample()).unwrap();
        assert_eq!(s.read(&bytes).unwrap(), sample());
    }
}
