use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use prefs_crypto::{provider_for_key, Algorithm, EncryptionProvider, NoOpEncryption};
use prefs_store::{
    BincodeSerializer, EncryptedSerializer, FileDataStore, FileStoreConfig, JsonSerializer,
    Serializer, StoreValue, SyncMode,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PrefError, PrefResult};
use crate::facade::PrefStore;

/// On-disk encoding of the persisted object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreFormat {
    #[default]
    Json,
    Bincode,
}

/// What the configured key encrypts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EncryptionScope {
    /// The whole stored file.
    #[default]
    Object,
    /// Only fields created with `PrefStore::encrypted_field`.
    Fields,
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncryptionConfig {
    pub key: Option<String>,
    pub algorithm: Algorithm,
    pub scope: EncryptionScope,
}

impl fmt::Debug for EncryptionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionConfig")
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("algorithm", &self.algorithm)
            .field("scope", &self.scope)
            .finish()
    }
}

/// File-backed preference store settings, usually loaded from TOML.
///
/// ```toml
/// path = "settings.json"
/// format = "json"
/// sync = "every-write"
///
/// [encryption]
/// key = "base64 key"
/// algorithm = "chacha20-poly1305"
/// scope = "fields"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefsConfig {
    pub path: PathBuf,
    pub format: StoreFormat,
    pub sync: SyncMode,
    pub encryption: EncryptionConfig,
}

impl Default for PrefsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("prefs.json"),
            format: StoreFormat::default(),
            sync: SyncMode::default(),
            encryption: EncryptionConfig::default(),
        }
    }
}

impl PrefsConfig {
    pub fn from_toml_str(text: &str) -> PrefResult<Self> {
        toml::from_str(text).map_err(|e| PrefError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> PrefResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Provider for the configured key, or the identity provider when no
    /// key is set.
    pub fn encryption_provider(&self) -> PrefResult<Arc<dyn EncryptionProvider>> {
        Ok(provider_for_key(self.encryption.key.as_deref(), self.encryption.algorithm)?)
    }

    /// Open the configured file store and bind a facade to it.
    ///
    /// With [`EncryptionScope::Object`] the whole file is sealed and a wrong
    /// key fails the open. With [`EncryptionScope::Fields`] the file stays
    /// readable and the provider is handed to the facade for
    /// `encrypted_field`.
    ///
    /// [`StoreFormat::Bincode`] is refused with [`PrefError::Config`] for
    /// types bincode cannot decode, such as `serde_json::Value`.
    pub async fn open<P>(&self, default: P) -> PrefResult<PrefStore<P>>
    where
        P: StoreValue + Serialize + DeserializeOwned,
    {
        let base: Arc<dyn Serializer<P>> = match self.format {
            StoreFormat::Json => Arc::new(JsonSerializer::new(default.clone())),
            StoreFormat::Bincode => Arc::new(
                BincodeSerializer::checked(default.clone())
                    .map_err(|e| PrefError::Config(format!("bincode format unusable: {e}")))?,
            ),
        };
        let provider = self.encryption_provider()?;
        let encrypted = provider.is_enabled();

        let (serializer, field_provider): (Arc<dyn Serializer<P>>, Arc<dyn EncryptionProvider>) =
            match self.encryption.scope {
                EncryptionScope::Object if encrypted => (
                    Arc::new(EncryptedSerializer::new(base, provider)),
                    Arc::new(NoOpEncryption),
                ),
                EncryptionScope::Object => (base, Arc::new(NoOpEncryption)),
                EncryptionScope::Fields => (base, provider),
            };

        let store = FileDataStore::open_shared(
            &self.path,
            serializer,
            FileStoreConfig {
                sync_mode: self.sync,
            },
        )
        .await?;
        info!(
            path = %self.path.display(),
            format = ?self.format,
            encrypted,
            scope = ?self.encryption.scope,
            "preference store opened"
        );

        Ok(PrefStore::new(Arc::new(store), default).with_encryption(field_provider))
    }
}
