use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use futures::stream::{BoxStream, StreamExt};
use prefs_codec::{decode_or, to_json};
use prefs_crypto::{EncryptionProvider, NoOpEncryption};
use prefs_store::{DataStore, StoreError, StoreValue};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::batch::{BatchReadScope, BatchWriteScope};
use crate::collections::{enum_set, serialized_list, serialized_set, PreferenceEnum};
use crate::error::PrefResult;
use crate::field::{commit, FieldPreference};
use crate::nullable::{Nullable, NullableFieldPreference};

/// Typed entry point for one persisted object.
///
/// Every preference produced here is bound to the same store handle, so
/// they all observe one physical object. The store's default value doubles
/// as the fallback object used when the stored bytes are corrupt.
pub struct PrefStore<P: StoreValue> {
    store: Arc<dyn DataStore<P>>,
    default: P,
    encryption: Arc<dyn EncryptionProvider>,
}

impl<P: StoreValue> PrefStore<P> {
    pub fn new(store: Arc<dyn DataStore<P>>, default: P) -> Self {
        Self {
            store,
            default,
            encryption: Arc::new(NoOpEncryption),
        }
    }

    /// Use `provider` for fields created by [`encrypted_field`](Self::encrypted_field).
    pub fn with_encryption(mut self, provider: Arc<dyn EncryptionProvider>) -> Self {
        self.encryption = provider;
        self
    }

    pub fn store(&self) -> &Arc<dyn DataStore<P>> {
        &self.store
    }

    pub fn default_value(&self) -> &P {
        &self.default
    }

    pub fn encryption(&self) -> &Arc<dyn EncryptionProvider> {
        &self.encryption
    }

    // ---- Field factories ----

    /// The whole object as a preference.
    pub fn data(&self) -> FieldPreference<P, P> {
        self.data_keyed("data")
    }

    pub fn data_keyed(&self, key: &str) -> FieldPreference<P, P> {
        self.field(key, self.default.clone(), P::clone, |_, next| next)
    }

    pub fn field<T, G, U>(
        &self,
        key: &str,
        default: T,
        getter: G,
        updater: U,
    ) -> FieldPreference<P, T>
    where
        T: StoreValue,
        G: Fn(&P) -> T + Send + Sync + 'static,
        U: Fn(P, T) -> P + Send + Sync + 'static,
    {
        FieldPreference::new(
            key,
            Arc::clone(&self.store),
            self.default.clone(),
            default,
            getter,
            updater,
        )
    }

    pub fn try_field<T, G, U>(
        &self,
        key: &str,
        default: T,
        getter: G,
        updater: U,
    ) -> FieldPreference<P, T>
    where
        T: StoreValue,
        G: Fn(&P) -> PrefResult<T> + Send + Sync + 'static,
        U: Fn(P, T) -> PrefResult<P> + Send + Sync + 'static,
    {
        FieldPreference::try_new(
            key,
            Arc::clone(&self.store),
            self.default.clone(),
            default,
            getter,
            updater,
        )
    }

    /// A nullable field over an `Option<T>` slot, defaulting to `None`.
    pub fn nullable_field<T, G, U>(
        &self,
        key: &str,
        getter: G,
        updater: U,
    ) -> NullableFieldPreference<P, T>
    where
        T: StoreValue,
        G: Fn(&P) -> Option<T> + Send + Sync + 'static,
        U: Fn(P, Option<T>) -> P + Send + Sync + 'static,
    {
        let raw = self.field(
            key,
            Nullable::Unset,
            move |object: &P| Nullable::from(getter(object)),
            move |object: P, value: Nullable<T>| updater(object, value.resolve(None)),
        );
        NullableFieldPreference::new(raw, None)
    }

    /// A nullable field over a [`Nullable<T>`] slot with its own default.
    pub fn nullable_field_with_default<T, G, U>(
        &self,
        key: &str,
        default: Option<T>,
        getter: G,
        updater: U,
    ) -> NullableFieldPreference<P, T>
    where
        T: StoreValue,
        G: Fn(&P) -> Nullable<T> + Send + Sync + 'static,
        U: Fn(P, Nullable<T>) -> P + Send + Sync + 'static,
    {
        NullableFieldPreference::new(self.field(key, Nullable::Unset, getter, updater), default)
    }

    pub fn enum_set_field<F, G, U>(
        &self,
        key: &str,
        default: BTreeSet<F>,
        getter: G,
        updater: U,
    ) -> FieldPreference<P, BTreeSet<F>>
    where
        F: PreferenceEnum + StoreValue,
        G: Fn(&P) -> BTreeSet<String> + Send + Sync + 'static,
        U: Fn(P, BTreeSet<String>) -> P + Send + Sync + 'static,
    {
        enum_set(&self.field(key, BTreeSet::new(), getter, updater), default)
    }

    pub fn serialized_set_field<F, G, U, D, E>(
        &self,
        key: &str,
        default: BTreeSet<F>,
        getter: G,
        updater: U,
        decode: D,
        encode: E,
    ) -> FieldPreference<P, BTreeSet<F>>
    where
        F: StoreValue + Ord,
        G: Fn(&P) -> BTreeSet<String> + Send + Sync + 'static,
        U: Fn(P, BTreeSet<String>) -> P + Send + Sync + 'static,
        D: Fn(&str) -> Option<F> + Send + Sync + 'static,
        E: Fn(&F) -> String + Send + Sync + 'static,
    {
        serialized_set(&self.field(key, BTreeSet::new(), getter, updater), decode, encode, default)
    }

    pub fn serialized_list_field<F, G, U, D, E>(
        &self,
        key: &str,
        default: Vec<F>,
        getter: G,
        updater: U,
        decode: D,
        encode: E,
    ) -> FieldPreference<P, Vec<F>>
    where
        F: StoreValue,
        G: Fn(&P) -> Vec<String> + Send + Sync + 'static,
        U: Fn(P, Vec<String>) -> P + Send + Sync + 'static,
        D: Fn(&str) -> Option<F> + Send + Sync + 'static,
        E: Fn(&F) -> String + Send + Sync + 'static,
    {
        serialized_list(&self.field(key, Vec::new(), getter, updater), decode, encode, default)
    }

    /// A custom type kept as JSON text inside the object.
    ///
    /// Empty or undecodable text reads as `default`.
    pub fn json_field<T, G, U>(
        &self,
        key: &str,
        default: T,
        getter: G,
        updater: U,
    ) -> FieldPreference<P, T>
    where
        T: StoreValue + Serialize + DeserializeOwned,
        G: Fn(&P) -> String + Send + Sync + 'static,
        U: Fn(P, String) -> P + Send + Sync + 'static,
    {
        let fallback = default.clone();
        self.field(key, String::new(), getter, updater).map(
            move |text: String| {
                if text.trim().is_empty() {
                    Ok(fallback.clone())
                } else {
                    Ok(decode_or(&text, fallback.clone()))
                }
            },
            |value: T| Ok(to_json(&value)?),
            default,
        )
    }

    /// A string kept as ciphertext inside the object.
    ///
    /// Uses the provider set by [`with_encryption`](Self::with_encryption).
    /// Empty stored text reads as `default`; ciphertext that fails to
    /// decrypt is an error, never returned as-is.
    pub fn encrypted_field<G, U>(
        &self,
        key: &str,
        default: String,
        getter: G,
        updater: U,
    ) -> FieldPreference<P, String>
    where
        G: Fn(&P) -> String + Send + Sync + 'static,
        U: Fn(P, String) -> P + Send + Sync + 'static,
    {
        let decrypter = Arc::clone(&self.encryption);
        let encrypter = Arc::clone(&self.encryption);
        let fallback = default.clone();
        self.field(key, String::new(), getter, updater).map(
            move |cipher_text: String| {
                if cipher_text.is_empty() {
                    Ok(fallback.clone())
                } else {
                    Ok(decrypter.decrypt(&cipher_text)?)
                }
            },
            move |plain_text: String| Ok(encrypter.encrypt(&plain_text)?),
            default,
        )
    }

    // ---- Batch operations ----

    /// Snapshot the object once for several consistent field reads.
    pub async fn batch_read(&self) -> PrefResult<BatchReadScope<P>> {
        let snapshot = match self.store.current_value().await {
            Ok(object) => object,
            Err(StoreError::Corrupt(corruption)) => {
                warn!(reason = %corruption, "batch read from fallback object");
                self.default.clone()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(BatchReadScope::new(snapshot))
    }

    /// Stage several field writes and commit them as one update.
    ///
    /// If `body` returns an error nothing is written and that error is
    /// returned. Returns the committed object.
    pub async fn batch_write<F>(&self, body: F) -> PrefResult<P>
    where
        F: FnOnce(&mut BatchWriteScope<P>) -> PrefResult<()> + Send,
    {
        commit(self.store.as_ref(), &self.default, "batch", move |object| {
            let mut scope = BatchWriteScope::new(object);
            body(&mut scope)?;
            Ok(scope.into_inner())
        })
        .await
    }

    /// A fresh [`BatchReadScope`] for the current object and every commit.
    pub fn watch_batch(&self) -> BoxStream<'static, BatchReadScope<P>> {
        let fallback = self.default.clone();
        self.store
            .watch()
            .map(move |item| match item {
                Ok(object) => BatchReadScope::new(object),
                Err(corruption) => {
                    warn!(reason = %corruption, "batch view from fallback object");
                    BatchReadScope::new(fallback.clone())
                }
            })
            .boxed()
    }
}

impl<P: StoreValue> Clone for PrefStore<P> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            default: self.default.clone(),
            encryption: Arc::clone(&self.encryption),
        }
    }
}

impl<P: StoreValue> fmt::Debug for PrefStore<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrefStore")
            .field("encryption", &self.encryption)
            .finish()
    }
}
