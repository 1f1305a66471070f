//! Persisted single-object storage for typed preferences.
//!
//! A store holds exactly one value of type `P` (a settings struct, a JSON
//! document, ...) and exposes three primitives:
//!
//! - read the current decoded value,
//! - atomically read-modify-write it,
//! - observe every committed change.
//!
//! # Storage Backends
//!
//! All backends implement the [`DataStore`] trait:
//!
//! - [`InMemoryDataStore`] -- watch-channel store for tests and embedding
//! - [`FileDataStore`] -- one file on disk, replaced atomically on commit
//!
//! Bytes are produced and consumed by a [`Serializer`]: [`JsonSerializer`],
//! [`BincodeSerializer`], or [`EncryptedSerializer`] wrapping either.
//!
//! # Design Rules
//!
//! 1. Updates are serialized per store: concurrent read-modify-write cycles
//!    never lose each other's changes.
//! 2. A transform that fails writes nothing.
//! 3. A transform that returns the current value writes nothing and
//!    notifies no one.
//! 4. Undecodable bytes are reported as [`Corruption`], never as a default.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod file;
pub mod memory;
pub mod serializer;
pub mod traits;

pub use error::{Corruption, StoreError, StoreResult};
pub use file::{FileDataStore, FileStoreConfig, SyncMode};
pub use memory::InMemoryDataStore;
pub use serializer::{BincodeSerializer, EncryptedSerializer, JsonSerializer, Serializer};
pub use traits::{ChangeStream, DataStore, StoreValue, Transform};
