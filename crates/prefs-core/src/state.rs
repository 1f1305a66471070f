use std::sync::{Arc, Mutex};

use futures::stream::{BoxStream, StreamExt};
use prefs_store::StoreValue;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, warn};

use crate::error::PrefResult;

/// When a [`PreferenceState`] starts collecting its source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SharingStarted {
    /// Immediately, and never stops.
    #[default]
    Eagerly,
    /// On the first subscriber, and never stops.
    Lazily,
    /// While at least one subscriber is alive; restarts on the next one.
    WhileSubscribed,
}

type Source<T> = Box<dyn Fn() -> BoxStream<'static, PrefResult<T>> + Send + Sync>;

struct Shared<T: StoreValue> {
    key: Arc<str>,
    started: SharingStarted,
    runtime: Handle,
    value: watch::Sender<T>,
    task: Mutex<Option<JoinHandle<()>>>,
    source: Source<T>,
}

/// Latest-value view of a preference stream.
///
/// Holds the most recent successfully read value. Failed items from the
/// source are logged and skipped, so the view keeps its last good value.
/// Dropping the view stops collection.
pub struct PreferenceState<T: StoreValue> {
    shared: Arc<Shared<T>>,
}

impl<T: StoreValue> PreferenceState<T> {
    pub(crate) fn launch<S>(
        key: Arc<str>,
        runtime: Handle,
        started: SharingStarted,
        initial: T,
        source: S,
    ) -> Self
    where
        S: Fn() -> BoxStream<'static, PrefResult<T>> + Send + Sync + 'static,
    {
        let shared = Arc::new(Shared {
            key,
            started,
            runtime,
            value: watch::Sender::new(initial),
            task: Mutex::new(None),
            source: Box::new(source),
        });
        if started == SharingStarted::Eagerly {
            let mut task = shared.task.lock().expect("state task lock poisoned");
            Shared::start(&shared, &mut task);
        }
        Self { shared }
    }

    /// The latest value.
    pub fn value(&self) -> T {
        self.shared.value.borrow().clone()
    }

    /// Subscribe to value changes, starting collection if needed.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        let mut task = self.shared.task.lock().expect("state task lock poisoned");
        let receiver = self.shared.value.subscribe();
        if task.as_ref().map_or(true, JoinHandle::is_finished) {
            Shared::start(&self.shared, &mut task);
        }
        receiver
    }

    /// Stream of values: the latest one first, then every change.
    pub fn changes(&self) -> BoxStream<'static, T> {
        WatchStream::new(self.subscribe()).boxed()
    }

    /// Whether the source is currently being collected.
    pub fn is_active(&self) -> bool {
        let task = self.shared.task.lock().expect("state task lock poisoned");
        task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn sharing_started(&self) -> SharingStarted {
        self.shared.started
    }
}

impl<T: StoreValue> Shared<T> {
    fn start(this: &Arc<Self>, task: &mut Option<JoinHandle<()>>) {
        debug!(key = %this.key, started = ?this.started, "preference state collecting");
        *task = Some(this.runtime.spawn(Self::collect(Arc::clone(this))));
    }

    async fn collect(this: Arc<Self>) {
        let mut source = (this.source)();
        let stop_when_idle = this.started == SharingStarted::WhileSubscribed;
        loop {
            tokio::select! {
                item = source.next() => match item {
                    Some(Ok(value)) => {
                        this.value.send_if_modified(|current| {
                            if *current == value {
                                false
                            } else {
                                *current = value;
                                true
                            }
                        });
                    }
                    Some(Err(e)) => {
                        warn!(
                            key = %this.key,
                            error = %e,
                            "preference state skipped a failed read"
                        );
                    }
                    None => break,
                },
                _ = this.value.closed(), if stop_when_idle => {
                    if this.release_if_idle() {
                        debug!(key = %this.key, "preference state idle, collection stopped");
                        break;
                    }
                }
            }
        }
    }

    /// Clear the task slot if nobody is subscribed. Runs under the task lock
    /// so a concurrent `subscribe` either sees the slot cleared or is seen
    /// here as a live receiver.
    fn release_if_idle(&self) -> bool {
        let mut task = self.task.lock().expect("state task lock poisoned");
        if self.value.receiver_count() == 0 {
            task.take();
            true
        } else {
            false
        }
    }
}

impl<T: StoreValue> Drop for PreferenceState<T> {
    fn drop(&mut self) {
        let task = self.shared.task.lock().map(|mut t| t.take());
        if let Ok(Some(task)) = task {
            task.abort();
        }
    }
}

impl<T: StoreValue + std::fmt::Debug> std::fmt::Debug for PreferenceState<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceState")
            .field("key", &self.shared.key)
            .field("started", &self.shared.started)
            .field("value", &*self.shared.value.borrow())
            .finish()
    }
}
