use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::{watch, Mutex};
use tokio_stream::wrappers::WatchStream;
use tracing::debug;

use crate::error::{Corruption, StoreError, StoreResult};
use crate::traits::{ChangeStream, DataStore, StoreValue, Transform};

/// In-memory, watch-channel-backed data store.
///
/// Intended for tests and embedding. The committed value lives in a
/// `tokio::sync::watch` channel; writers are serialized by an async mutex.
pub struct InMemoryDataStore<P: StoreValue> {
    state: watch::Sender<Result<P, Corruption>>,
    write_lock: Mutex<()>,
    read_only: AtomicBool,
    commits: AtomicU64,
}

impl<P: StoreValue> InMemoryDataStore<P> {
    /// Create a store holding `initial`.
    pub fn new(initial: P) -> Self {
        Self {
            state: watch::Sender::new(Ok(initial)),
            write_lock: Mutex::new(()),
            read_only: AtomicBool::new(false),
            commits: AtomicU64::new(0),
        }
    }

    /// Number of updates that actually changed the stored value.
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    /// Make every subsequent update fail with `StoreError::ReadOnly`.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Replace the stored value with undecodable data.
    pub fn corrupt(&self, reason: impl Into<String>) {
        let corruption = Corruption::new(reason);
        self.state.send_modify(|state| *state = Err(corruption));
    }

    /// Number of live `watch` subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.state.receiver_count()
    }
}

impl<P: StoreValue + Default> Default for InMemoryDataStore<P> {
    fn default() -> Self {
        Self::new(P::default())
    }
}

#[async_trait]
impl<P: StoreValue> DataStore<P> for InMemoryDataStore<P> {
    async fn current_value(&self) -> StoreResult<P> {
        let current = self.state.borrow().clone();
        current.map_err(StoreError::from)
    }

    async fn update_data<'a>(&self, transform: Transform<'a, P>) -> StoreResult<P> {
        let _guard = self.write_lock.lock().await;
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StoreError::ReadOnly);
        }

        let current = self.state.borrow().clone();
        let unchanged = current.as_ref().ok().cloned();
        let next = transform(current)?;
        if unchanged.as_ref() == Some(&next) {
            debug!("in-memory update is a no-op");
            return Ok(next);
        }

        self.state.send_modify(|state| *state = Ok(next.clone()));
        let seq = self.commits.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(seq, "in-memory update committed");
        Ok(next)
    }

    fn watch(&self) -> ChangeStream<P> {
        WatchStream::new(self.state.subscribe()).boxed()
    }
}

impl<P: StoreValue> std::fmt::Debug for InMemoryDataStore<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDataStore")
            .field("commits", &self.commit_count())
            .field("read_only", &self.read_only.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn bump(by: u32) -> Transform<'static, u32> {
        Box::new(move |current| Ok(current.unwrap_or(0) + by))
    }

    // -----------------------------------------------------------------------
    // Read / update
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn update_returns_committed_value() {
        let store = InMemoryDataStore::new(1u32);
        assert_eq!(store.update_data(bump(2)).await.unwrap(), 3);
        assert_eq!(store.current_value().await.unwrap(), 3);
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn failing_transform_writes_nothing() {
        let store = InMemoryDataStore::new(5u32);
        let err = store
            .update_data(Box::new(|_| Err(StoreError::Aborted)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Aborted));
        assert_eq!(store.current_value().await.unwrap(), 5);
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn identical_value_is_not_committed() {
        let store = InMemoryDataStore::new(5u32);
        store.update_data(bump(0)).await.unwrap();
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn read_only_rejects_updates() {
        let store = InMemoryDataStore::new(5u32);
        store.set_read_only(true);
        assert!(matches!(
            store.update_data(bump(1)).await,
            Err(StoreError::ReadOnly)
        ));
        store.set_read_only(false);
        assert_eq!(store.update_data(bump(1)).await.unwrap(), 6);
    }

    // -----------------------------------------------------------------------
    // Corruption
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn corrupt_store_reports_corruption_until_rewritten() {
        let store = InMemoryDataStore::new(5u32);
        store.corrupt("bit rot");
        match store.current_value().await {
            Err(StoreError::Corrupt(c)) => assert_eq!(c.reason(), "bit rot"),
            other => panic!("expected corruption, got {other:?}"),
        }

        // The transform sees the corruption and may recover from it.
        let seen = store
            .update_data(Box::new(|current| {
                assert!(current.is_err());
                Ok(42)
            }))
            .await
            .unwrap();
        assert_eq!(seen, 42);
        assert_eq!(store.current_value().await.unwrap(), 42);
    }

    // -----------------------------------------------------------------------
    // Watch
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn watch_starts_with_current_value() {
        let store = InMemoryDataStore::new(7u32);
        let mut stream = store.watch();
        assert_eq!(stream.next().await.unwrap(), Ok(7));
    }

    #[tokio::test]
    async fn watch_sees_commits() {
        let store = InMemoryDataStore::new(0u32);
        let mut stream = store.watch();
        assert_eq!(stream.next().await.unwrap(), Ok(0));
        store.update_data(bump(1)).await.unwrap();
        assert_eq!(stream.next().await.unwrap(), Ok(1));
        store.update_data(bump(1)).await.unwrap();
        assert_eq!(stream.next().await.unwrap(), Ok(2));
    }

    #[tokio::test]
    async fn dropping_a_subscription_releases_it() {
        let store = InMemoryDataStore::new(0u32);
        let a = store.watch();
        let b = store.watch();
        assert_eq!(store.subscriber_count(), 2);
        drop(a);
        assert_eq!(store.subscriber_count(), 1);
        drop(b);
        assert_eq!(store.subscriber_count(), 0);
    }

    // -----------------------------------------------------------------------
    // Concurrency
    // -----------------------------------------------------------------------

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_updates_are_not_lost() {
        let store = Arc::new(InMemoryDataStore::new(0u32));
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.update_data(bump(1)).await.unwrap() })
            })
            .collect();
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(store.current_value().await.unwrap(), 32);
        assert_eq!(store.commit_count(), 32);
    }

    #[test]
    fn debug_format() {
        let store = InMemoryDataStore::new(0u32);
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryDataStore"));
        assert!(debug.contains("commits"));
    }
}
