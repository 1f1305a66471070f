use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::{Corruption, StoreResult};

/// Bounds every persisted value and every field value must satisfy.
pub trait StoreValue: Clone + PartialEq + Send + Sync + 'static {}

impl<T> StoreValue for T where T: Clone + PartialEq + Send + Sync + 'static {}

/// A read-modify-write step applied inside [`DataStore::update_data`].
///
/// Receives the current value, or the [`Corruption`] describing why the
/// stored bytes did not decode, so the caller can substitute its own
/// fallback within the same atomic cycle.
pub type Transform<'a, P> = Box<dyn FnOnce(Result<P, Corruption>) -> StoreResult<P> + Send + 'a>;

/// Stream of committed values, current value first.
pub type ChangeStream<P> = BoxStream<'static, Result<P, Corruption>>;

/// Persisted single-object store.
///
/// All implementations must satisfy these invariants:
/// - `update_data` calls against one store are serialized: each transform
///   sees the value committed by the previous one.
/// - A failing transform leaves the committed value untouched.
/// - A transform that returns a value equal to the current one is not
///   written and produces no change notification.
/// - `watch` delivers the latest committed value immediately, then every
///   subsequent commit. A slow subscriber may skip intermediate values but
///   always converges on the latest.
/// - I/O errors are propagated, never swallowed.
#[async_trait]
pub trait DataStore<P: StoreValue>: Send + Sync {
    /// Read the current value.
    ///
    /// Returns `Err(StoreError::Corrupt)` if the stored bytes do not decode.
    async fn current_value(&self) -> StoreResult<P>;

    /// Atomically replace the value with `transform(current)`.
    ///
    /// Returns the value that is committed after the call.
    async fn update_data<'a>(&self, transform: Transform<'a, P>) -> StoreResult<P>;

    /// Subscribe to committed values.
    fn watch(&self) -> ChangeStream<P>;
}
