//! Typed preferences over a persisted single-object store.
//!
//! A [`PrefStore`] binds one [`DataStore`] holding a value of type `P` and
//! hands out [`FieldPreference`]s: typed projections of one field of `P`,
//! each independently readable, writable, resettable and observable.
//!
//! # Guarantees
//!
//! - Every write is a read-modify-write cycle through the store's atomic
//!   update, so concurrent writes to different fields never lose each other.
//! - A stored object that fails to decode is read through the facade's
//!   default object instead of surfacing an error. The next write replaces it.
//! - Collection elements that fail to decode are dropped from the result.
//! - A batch write stages changes on one snapshot and commits them in one
//!   update, or commits nothing if the batch body fails.
//! - Encrypted values fail closed: ciphertext that does not authenticate is
//!   an error, never returned as plaintext.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use prefs_core::{InMemoryDataStore, PrefStore};
//!
//! #[derive(Clone, Debug, Default, PartialEq)]
//! struct Settings {
//!     theme: String,
//! }
//!
//! # async fn demo() -> prefs_core::PrefResult<()> {
//! let store = Arc::new(InMemoryDataStore::new(Settings::default()));
//! let prefs = PrefStore::new(store, Settings::default());
//! let theme = prefs.field(
//!     "theme",
//!     "light".to_string(),
//!     |s: &Settings| s.theme.clone(),
//!     |s: Settings, theme| Settings { theme, ..s },
//! );
//! theme.set("dark".into()).await?;
//! assert_eq!(theme.get().await?, "dark");
//! # Ok(())
//! # }
//! ```

pub mod batch;
mod blocking;
pub mod collections;
pub mod config;
pub mod error;
pub mod facade;
pub mod field;
pub mod nullable;
pub mod state;
pub mod transfer;

pub use batch::{BatchReadScope, BatchWriteScope};
pub use collections::{enum_set, serialized_list, serialized_set, PreferenceEnum};
pub use config::{EncryptionConfig, EncryptionScope, PrefsConfig, StoreFormat};
pub use error::{PrefError, PrefResult};
pub use facade::PrefStore;
pub use field::{AsField, FieldPreference};
pub use nullable::{Nullable, NullableFieldPreference};
pub use state::{PreferenceState, SharingStarted};
pub use transfer::{PreferenceExport, EXPORT_VERSION};

// Re-export the store and crypto types callers need to wire a facade.
pub use prefs_crypto::{Algorithm, EncryptionProvider, NoOpEncryption};
pub use prefs_store::{
    DataStore, FileDataStore, FileStoreConfig, InMemoryDataStore, StoreError, StoreValue, SyncMode,
};
