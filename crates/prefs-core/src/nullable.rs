use futures::stream::BoxStream;
use prefs_store::StoreValue;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;

use crate::blocking::run_blocking;
use crate::error::PrefResult;
use crate::field::{AsField, FieldPreference};
use crate::state::{PreferenceState, SharingStarted};

/// Stored form of a nullable field.
///
/// Keeps "never written" apart from "explicitly null", so a field whose
/// default is non-null can still hold a null.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nullable<T> {
    Unset,
    Null,
    Value(T),
}

impl<T> Nullable<T> {
    /// The value a reader sees, given the field default.
    pub fn resolve(self, default: Option<T>) -> Option<T> {
        match self {
            Self::Unset => default,
            Self::Null => None,
            Self::Value(v) => Some(v),
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }
}

impl<T> Default for Nullable<T> {
    fn default() -> Self {
        Self::Unset
    }
}

impl<T> From<Option<T>> for Nullable<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Value(v),
            None => Self::Null,
        }
    }
}

/// A field whose value may be null.
///
/// `set(None)` stores an explicit null which reads back as `None` even when
/// the default is `Some`. `reset_to_default` stores [`Nullable::Unset`], so
/// the field reads as its default again.
pub struct NullableFieldPreference<P: StoreValue, T: StoreValue> {
    raw: FieldPreference<P, Nullable<T>>,
    view: FieldPreference<P, Option<T>>,
}

impl<P: StoreValue, T: StoreValue> NullableFieldPreference<P, T> {
    /// Wrap the physical `Nullable<T>` slot with a reader default.
    pub fn new(raw: FieldPreference<P, Nullable<T>>, default: Option<T>) -> Self {
        let fallback_default = default.clone();
        let view = raw.map(
            move |stored: Nullable<T>| Ok(stored.resolve(fallback_default.clone())),
            |value: Option<T>| Ok(Nullable::from(value)),
            default,
        );
        Self { raw, view }
    }

    pub fn key(&self) -> &str {
        self.view.key()
    }

    pub fn default_value(&self) -> &Option<T> {
        self.view.default_value()
    }

    pub async fn get(&self) -> PrefResult<Option<T>> {
        self.view.get().await
    }

    pub async fn set(&self, value: Option<T>) -> PrefResult<()> {
        self.view.set(value).await
    }

    pub async fn update<F>(&self, transform: F) -> PrefResult<Option<T>>
    where
        F: FnOnce(Option<T>) -> Option<T> + Send,
    {
        self.view.update(transform).await
    }

    pub async fn reset_to_default(&self) -> PrefResult<()> {
        self.raw.set(Nullable::Unset).await
    }

    pub async fn delete(&self) -> PrefResult<()> {
        self.reset_to_default().await
    }

    pub fn as_stream(&self) -> BoxStream<'static, PrefResult<Option<T>>> {
        self.view.as_stream()
    }

    pub fn state_in(
        &self,
        runtime: &Handle,
        started: SharingStarted,
        initial: Option<T>,
    ) -> PreferenceState<Option<T>> {
        self.view.state_in(runtime, started, initial)
    }

    pub fn get_blocking(&self) -> PrefResult<Option<T>> {
        self.view.get_blocking()
    }

    pub fn set_blocking(&self, value: Option<T>) -> PrefResult<()> {
        self.view.set_blocking(value)
    }

    pub fn reset_to_default_blocking(&self) -> PrefResult<()> {
        run_blocking(self.reset_to_default())?
    }

    /// The stored `Nullable<T>` slot.
    pub fn raw(&self) -> &FieldPreference<P, Nullable<T>> {
        &self.raw
    }
}

impl<P: StoreValue, T: StoreValue> AsField<P> for NullableFieldPreference<P, T> {
    type Value = Option<T>;

    fn as_field(&self) -> &FieldPreference<P, Option<T>> {
        &self.view
    }
}

impl<P: StoreValue, T: StoreValue> Clone for NullableFieldPreference<P, T> {
    fn clone(&self) -> Self {
        Self {
            raw: self.raw.clone(),
            view: self.view.clone(),
        }
    }
}

impl<P, T> std::fmt::Debug for NullableFieldPreference<P, T>
where
    P: StoreValue,
    T: StoreValue + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NullableFieldPreference")
            .field("key", &self.key())
            .field("default", self.default_value())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use prefs_store::{DataStore, InMemoryDataStore};
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq, Default)]
    struct Profile {
        nickname: Nullable<String>,
    }

    fn nickname(
        store: Arc<InMemoryDataStore<Profile>>,
        default: Option<&str>,
    ) -> NullableFieldPreference<Profile, String> {
        let raw = FieldPreference::new(
            "nickname",
            store,
            Profile::default(),
            Nullable::Unset,
            |p: &Profile| p.nickname.clone(),
            |_: Profile, nickname: Nullable<String>| Profile { nickname },
        );
        NullableFieldPreference::new(raw, default.map(str::to_string))
    }

    #[test]
    fn resolve_distinguishes_null_from_unset() {
        let default = Some(1);
        assert_eq!(Nullable::Unset.resolve(default), Some(1));
        assert_eq!(Nullable::<i32>::Null.resolve(default), None);
        assert_eq!(Nullable::Value(3).resolve(default), Some(3));
        assert!(Nullable::<i32>::default().is_unset());
    }

    #[test]
    fn serde_shape() {
        let json = serde_json::to_string(&Nullable::Value(5)).unwrap();
        assert_eq!(json, r#"{"value":5}"#);
        let null: Nullable<u8> = serde_json::from_str(r#""null""#).unwrap();
        assert_eq!(null, Nullable::Null);
    }

    #[test]
    fn bincode_roundtrip_keeps_every_state() {
        for state in [Nullable::Unset, Nullable::Null, Nullable::Value(5u32)] {
            let bytes = prefs_codec::to_bincode(&state).unwrap();
            assert_eq!(prefs_codec::from_bincode::<Nullable<u32>>(&bytes).unwrap(), state);
        }
    }

    #[tokio::test]
    async fn explicit_null_survives_a_non_null_default() {
        let store = Arc::new(InMemoryDataStore::new(Profile::default()));
        let field = nickname(store.clone(), Some("anon"));
        assert_eq!(field.get().await.unwrap().as_deref(), Some("anon"));

        field.set(None).await.unwrap();
        assert_eq!(field.get().await.unwrap(), None);
        assert_eq!(store.current_value().await.unwrap().nickname, Nullable::Null);

        field.set(Some("kit".into())).await.unwrap();
        assert_eq!(field.get().await.unwrap().as_deref(), Some("kit"));
    }

    #[tokio::test]
    async fn reset_stores_unset() {
        let store = Arc::new(InMemoryDataStore::new(Profile::default()));
        let field = nickname(store.clone(), Some("anon"));
        field.set(None).await.unwrap();
        field.reset_to_default().await.unwrap();
        assert_eq!(store.current_value().await.unwrap().nickname, Nullable::Unset);
        assert_eq!(field.get().await.unwrap().as_deref(), Some("anon"));
    }

    #[tokio::test]
    async fn null_default_roundtrip() {
        let store = Arc::new(InMemoryDataStore::new(Profile::default()));
        let field = nickname(store, None);
        field.set(Some("kit".into())).await.unwrap();
        field.set(None).await.unwrap();
        assert_eq!(field.get().await.unwrap(), None);
        assert_eq!(field.update(|_| Some("x".into())).await.unwrap().as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn stream_reports_resolved_values() {
        let store = Arc::new(InMemoryDataStore::new(Profile::default()));
        let field = nickname(store, Some("anon"));
        let mut changes = field.as_stream();
        assert_eq!(changes.next().await.unwrap().unwrap().as_deref(), Some("anon"));
        field.set(None).await.unwrap();
        assert_eq!(changes.next().await.unwrap().unwrap(), None);
    }
}
