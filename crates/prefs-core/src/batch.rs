use prefs_store::StoreValue;

use crate::error::PrefResult;
use crate::field::AsField;

/// Read-only view of one snapshot of the object.
///
/// Every accessor projects the same snapshot; none of them touch the store.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchReadScope<P> {
    snapshot: P,
}

impl<P: StoreValue> BatchReadScope<P> {
    pub(crate) fn new(snapshot: P) -> Self {
        Self { snapshot }
    }

    pub fn get<F: AsField<P>>(&self, field: &F) -> PrefResult<F::Value> {
        field.as_field().project(&self.snapshot)
    }

    pub fn data(&self) -> &P {
        &self.snapshot
    }

    pub fn into_data(self) -> P {
        self.snapshot
    }
}

/// Mutable working copy of the object inside a batch write.
///
/// Staged changes only reach the store when the batch body returns `Ok`.
#[derive(Debug)]
pub struct BatchWriteScope<P> {
    working: P,
}

impl<P: StoreValue> BatchWriteScope<P> {
    pub(crate) fn new(working: P) -> Self {
        Self { working }
    }

    pub(crate) fn into_inner(self) -> P {
        self.working
    }

    /// Read a field, including changes staged earlier in this batch.
    pub fn get<F: AsField<P>>(&self, field: &F) -> PrefResult<F::Value> {
        field.as_field().project(&self.working)
    }

    pub fn set<F: AsField<P>>(&mut self, field: &F, value: F::Value) -> PrefResult<()> {
        self.working = field.as_field().apply(self.working.clone(), value)?;
        Ok(())
    }

    pub fn update<F, T>(&mut self, field: &F, transform: T) -> PrefResult<F::Value>
    where
        F: AsField<P>,
        T: FnOnce(F::Value) -> F::Value,
    {
        let next = transform(self.get(field)?);
        self.set(field, next.clone())?;
        Ok(next)
    }

    pub fn reset<F: AsField<P>>(&mut self, field: &F) -> PrefResult<()> {
        let default = field.as_field().default_value().clone();
        self.set(field, default)
    }

    pub fn data(&self) -> &P {
        &self.working
    }

    /// Replace the whole working copy.
    pub fn replace(&mut self, object: P) {
        self.working = object;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PrefError;
    use crate::facade::PrefStore;
    use crate::field::FieldPreference;
    use futures::StreamExt;
    use prefs_store::{DataStore, InMemoryDataStore};
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq, Default)]
    struct Window {
        width: u32,
        height: u32,
        title: Option<String>,
    }

    struct Fields {
        width: FieldPreference<Window, u32>,
        height: FieldPreference<Window, u32>,
        title: crate::NullableFieldPreference<Window, String>,
    }

    fn setup() -> (Arc<InMemoryDataStore<Window>>, PrefStore<Window>, Fields) {
        let store = Arc::new(InMemoryDataStore::new(Window::default()));
        let prefs = PrefStore::new(store.clone(), Window::default());
        let fields = Fields {
            width: prefs.field(
                "width",
                800,
                |w: &Window| w.width,
                |w: Window, width| Window { width, ..w },
            ),
            height: prefs.field(
                "height",
                600,
                |w: &Window| w.height,
                |w: Window, height| Window { height, ..w },
            ),
            title: prefs.nullable_field(
                "title",
                |w: &Window| w.title.clone(),
                |w: Window, title| Window { title, ..w },
            ),
        };
        (store, prefs, fields)
    }

    // -----------------------------------------------------------------------
    // Read
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn batch_read_projects_one_snapshot() {
        let (_, prefs, f) = setup();
        f.width.set(10).await.unwrap();
        f.height.set(20).await.unwrap();

        let scope = prefs.batch_read().await.unwrap();
        f.width.set(99).await.unwrap();

        assert_eq!(scope.get(&f.width).unwrap(), 10);
        assert_eq!(scope.get(&f.height).unwrap(), 20);
        assert_eq!(scope.get(&f.title).unwrap(), None);
        assert_eq!(scope.data().width, 10);
    }

    #[tokio::test]
    async fn batch_read_of_corrupt_object_uses_fallback() {
        let (store, prefs, f) = setup();
        store.corrupt("garbage");
        let scope = prefs.batch_read().await.unwrap();
        assert_eq!(scope.get(&f.width).unwrap(), 0);
    }

    // -----------------------------------------------------------------------
    // Write
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn batch_write_commits_once() {
        let (store, prefs, f) = setup();
        let committed = prefs
            .batch_write(|scope| {
                scope.set(&f.width, 1024)?;
                scope.set(&f.height, 768)?;
                scope.set(&f.title, Some("main".into()))?;
                let doubled = scope.update(&f.width, |w| w * 2)?;
                assert_eq!(doubled, 2048);
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(store.commit_count(), 1);
        assert_eq!(committed.width, 2048);
        assert_eq!(f.height.get().await.unwrap(), 768);
        assert_eq!(f.title.get().await.unwrap().as_deref(), Some("main"));
    }

    #[tokio::test]
    async fn failing_body_commits_nothing() {
        let (store, prefs, f) = setup();
        f.width.set(5).await.unwrap();
        let before = store.current_value().await.unwrap();

        let err = prefs
            .batch_write(|scope| {
                scope.set(&f.width, 6)?;
                scope.set(&f.height, 7)?;
                Err(PrefError::aborted("changed my mind"))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PrefError::Aborted(ref r) if r == "changed my mind"));
        assert_eq!(store.current_value().await.unwrap(), before);
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn reset_in_batch_uses_field_default() {
        let (_, prefs, f) = setup();
        f.width.set(5).await.unwrap();
        prefs.batch_write(|scope| scope.reset(&f.width)).await.unwrap();
        assert_eq!(f.width.get().await.unwrap(), 800);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn readers_never_see_half_a_batch() {
        let (store, prefs, f) = setup();
        let mut views = prefs.watch_batch();
        let width = f.width.clone();
        let height = f.height.clone();

        let writer = tokio::spawn(async move {
            for n in 1..=50u32 {
                prefs
                    .batch_write(|scope| {
                        scope.set(&width, n)?;
                        scope.set(&height, n)
                    })
                    .await
                    .unwrap();
            }
        });

        loop {
            let view = views.next().await.unwrap();
            let w = view.get(&f.width).unwrap();
            let h = view.get(&f.height).unwrap();
            assert_eq!(w, h, "partial batch observed");
            if w == 50 {
                break;
            }
        }
        writer.await.unwrap();
        assert_eq!(store.commit_count(), 50);
    }

    #[tokio::test]
    async fn batch_and_field_writes_stay_consistent() {
        let (_, prefs, f) = setup();
        prefs.batch_write(|scope| scope.set(&f.width, 1)).await.unwrap();
        f.height.set(2).await.unwrap();
        let scope = prefs.batch_read().await.unwrap();
        assert_eq!((scope.get(&f.width).unwrap(), scope.get(&f.height).unwrap()), (1, 2));
    }
}
