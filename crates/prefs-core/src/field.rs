use std::fmt;
use std::sync::Arc;

use futures::future;
use futures::stream::{BoxStream, StreamExt};
use prefs_store::{DataStore, StoreError, StoreValue};
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::blocking::run_blocking;
use crate::error::{PrefError, PrefResult};
use crate::state::{PreferenceState, SharingStarted};

pub(crate) type Getter<P, T> = Arc<dyn Fn(&P) -> PrefResult<T> + Send + Sync>;
pub(crate) type Updater<P, T> = Arc<dyn Fn(P, T) -> PrefResult<P> + Send + Sync>;

/// One typed field of a persisted object.
///
/// A field owns no data. Every read projects the store's current object
/// through `getter`; every write is a read-modify-write cycle that rebuilds
/// the object through `updater`, so writes to different fields of one
/// object never clobber each other.
///
/// If the stored object does not decode, reads and writes start from the
/// fallback object instead of failing.
pub struct FieldPreference<P: StoreValue, T: StoreValue> {
    key: Arc<str>,
    default: T,
    fallback: P,
    getter: Getter<P, T>,
    updater: Updater<P, T>,
    store: Arc<dyn DataStore<P>>,
}

impl<P: StoreValue, T: StoreValue> FieldPreference<P, T> {
    /// Bind an infallible getter/updater pair to `store`.
    pub fn new<G, U>(
        key: impl Into<Arc<str>>,
        store: Arc<dyn DataStore<P>>,
        fallback: P,
        default: T,
        getter: G,
        updater: U,
    ) -> Self
    where
        G: Fn(&P) -> T + Send + Sync + 'static,
        U: Fn(P, T) -> P + Send + Sync + 'static,
    {
        Self::try_new(
            key,
            store,
            fallback,
            default,
            move |p: &P| Ok(getter(p)),
            move |p: P, v: T| Ok(updater(p, v)),
        )
    }

    /// Bind a fallible getter/updater pair to `store`.
    ///
    /// Errors from either closure are returned to the caller unchanged and
    /// abort the write they occur in.
    pub fn try_new<G, U>(
        key: impl Into<Arc<str>>,
        store: Arc<dyn DataStore<P>>,
        fallback: P,
        default: T,
        getter: G,
        updater: U,
    ) -> Self
    where
        G: Fn(&P) -> PrefResult<T> + Send + Sync + 'static,
        U: Fn(P, T) -> PrefResult<P> + Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            default,
            fallback,
            getter: Arc::new(getter),
            updater: Arc::new(updater),
            store,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Read the field from the current object.
    pub async fn get(&self) -> PrefResult<T> {
        let object = match self.store.current_value().await {
            Ok(object) => object,
            Err(StoreError::Corrupt(corruption)) => {
                warn!(key = %self.key, reason = %corruption, "reading field from fallback object");
                self.fallback.clone()
            }
            Err(e) => return Err(e.into()),
        };
        self.project(&object)
    }

    /// Write the field in one read-modify-write cycle.
    pub async fn set(&self, value: T) -> PrefResult<()> {
        let updater = Arc::clone(&self.updater);
        self.commit(move |object| updater(object, value)).await?;
        Ok(())
    }

    /// Replace the field with `transform(old)` in a single cycle.
    ///
    /// Returns the value committed for this field.
    pub async fn update<F>(&self, transform: F) -> PrefResult<T>
    where
        F: FnOnce(T) -> T + Send,
    {
        let getter = Arc::clone(&self.getter);
        let updater = Arc::clone(&self.updater);
        let committed = self
            .commit(move |object| {
                let old = getter(&object)?;
                updater(object, transform(old))
            })
            .await?;
        self.project(&committed)
    }

    pub async fn reset_to_default(&self) -> PrefResult<()> {
        self.set(self.default.clone()).await
    }

    /// Alias for [`reset_to_default`](Self::reset_to_default).
    pub async fn delete(&self) -> PrefResult<()> {
        self.reset_to_default().await
    }

    /// Observe the field.
    ///
    /// The current value is delivered first; afterwards one item is
    /// delivered per committed change of this field. Changes to other
    /// fields of the object are filtered out. The stream never ends on its
    /// own and may be dropped at any time.
    pub fn as_stream(&self) -> BoxStream<'static, PrefResult<T>> {
        let getter = Arc::clone(&self.getter);
        let fallback = self.fallback.clone();
        let key = Arc::clone(&self.key);
        let mut last: Option<T> = None;

        self.store
            .watch()
            .filter_map(move |item| {
                let projected = match item {
                    Ok(object) => getter(&object),
                    Err(corruption) => {
                        warn!(
                            key = %key,
                            reason = %corruption,
                            "observing field from fallback object"
                        );
                        getter(&fallback)
                    }
                };
                let emit = match projected {
                    Ok(value) if last.as_ref() == Some(&value) => None,
                    Ok(value) => {
                        last = Some(value.clone());
                        Some(Ok(value))
                    }
                    Err(e) => {
                        last = None;
                        Some(Err(e))
                    }
                };
                future::ready(emit)
            })
            .boxed()
    }

    /// Keep the latest value of this field available on `runtime`.
    pub fn state_in(
        &self,
        runtime: &Handle,
        started: SharingStarted,
        initial: T,
    ) -> PreferenceState<T> {
        let field = self.clone();
        PreferenceState::launch(
            Arc::clone(&self.key),
            runtime.clone(),
            started,
            initial,
            move || field.as_stream(),
        )
    }

    /// Blocking [`get`](Self::get).
    ///
    /// Must not be called from a task that the backing store itself needs
    /// in order to make progress.
    pub fn get_blocking(&self) -> PrefResult<T> {
        run_blocking(self.get())?
    }

    /// Blocking [`set`](Self::set).
    pub fn set_blocking(&self, value: T) -> PrefResult<()> {
        run_blocking(self.set(value))?
    }

    /// Blocking [`reset_to_default`](Self::reset_to_default).
    pub fn reset_to_default_blocking(&self) -> PrefResult<()> {
        run_blocking(self.reset_to_default())?
    }

    /// Derive a field of another type over the same physical slot.
    ///
    /// `decode` runs after this field's getter, `encode` before its updater.
    /// The derived field keeps this field's key.
    pub fn map<U, D, E>(&self, decode: D, encode: E, default: U) -> FieldPreference<P, U>
    where
        U: StoreValue,
        D: Fn(T) -> PrefResult<U> + Send + Sync + 'static,
        E: Fn(U) -> PrefResult<T> + Send + Sync + 'static,
    {
        let getter = Arc::clone(&self.getter);
        let updater = Arc::clone(&self.updater);
        FieldPreference::try_new(
            Arc::clone(&self.key),
            Arc::clone(&self.store),
            self.fallback.clone(),
            default,
            move |object: &P| decode(getter(object)?),
            move |object: P, value: U| updater(object, encode(value)?),
        )
    }

    pub(crate) fn project(&self, object: &P) -> PrefResult<T> {
        (self.getter)(object)
    }

    pub(crate) fn apply(&self, object: P, value: T) -> PrefResult<P> {
        (self.updater)(object, value)
    }

    async fn commit<F>(&self, step: F) -> PrefResult<P>
    where
        F: FnOnce(P) -> PrefResult<P> + Send,
    {
        commit(self.store.as_ref(), &self.fallback, &self.key, step).await
    }
}

/// Run `step` inside one `update_data` cycle of `store`.
///
/// A corrupt object is replaced by `fallback` before `step` sees it. An
/// error raised by `step` aborts the cycle and is returned as-is.
pub(crate) async fn commit<P, F>(
    store: &dyn DataStore<P>,
    fallback: &P,
    key: &str,
    step: F,
) -> PrefResult<P>
where
    P: StoreValue,
    F: FnOnce(P) -> PrefResult<P> + Send,
{
    let mut failure: Option<PrefError> = None;
    let slot = &mut failure;

    let result = store
        .update_data(Box::new(move |current| {
            let base = match current {
                Ok(object) => object,
                Err(corruption) => {
                    warn!(key, reason = %corruption, "overwriting corrupt object from fallback");
                    fallback.clone()
                }
            };
            step(base).map_err(|e| {
                *slot = Some(e);
                StoreError::Aborted
            })
        }))
        .await;

    match result {
        Ok(committed) => {
            debug!(key, "preference update applied");
            Ok(committed)
        }
        Err(e) => Err(failure.take().unwrap_or_else(|| e.into())),
    }
}

/// Anything that exposes a [`FieldPreference`] over `P`.
///
/// Lets batch scopes accept plain and nullable fields alike.
pub trait AsField<P: StoreValue> {
    type Value: StoreValue;

    fn as_field(&self) -> &FieldPreference<P, Self::Value>;
}

impl<P: StoreValue, T: StoreValue> AsField<P> for FieldPreference<P, T> {
    type Value = T;

    fn as_field(&self) -> &FieldPreference<P, T> {
        self
    }
}

impl<P: StoreValue, T: StoreValue> Clone for FieldPreference<P, T> {
    fn clone(&self) -> Self {
        Self {
            key: Arc::clone(&self.key),
            default: self.default.clone(),
            fallback: self.fallback.clone(),
            getter: Arc::clone(&self.getter),
            updater: Arc::clone(&self.updater),
            store: Arc::clone(&self.store),
        }
    }
}

impl<P: StoreValue, T: StoreValue + fmt::Debug> fmt::Debug for FieldPreference<P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldPreference")
            .field("key", &self.key)
            .field("default", &self.default)
            .finish()
    }
}
