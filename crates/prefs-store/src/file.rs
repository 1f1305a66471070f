use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{watch, Mutex};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

use crate::error::{Corruption, StoreError, StoreResult};
use crate::serializer::Serializer;
use crate::traits::{ChangeStream, DataStore, StoreValue, Transform};

/// Flush strategy for committed files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// `fsync` the temp file before it replaces the live file.
    #[default]
    EveryWrite,
    /// Rely on OS page-cache buffering (fastest, least durable).
    OsDefault,
}

/// Configuration for a [`FileDataStore`].
#[derive(Clone, Debug, Default)]
pub struct FileStoreConfig {
    pub sync_mode: SyncMode,
}

/// Data store backed by a single file.
///
/// The decoded value is cached in memory after [`open`](Self::open); the
/// file is only read again on [`reload`](Self::reload). Every commit writes
/// a sibling `*.tmp` file and renames it over the live file, so readers of
/// the file never see a half-written object.
///
/// Once a commit has been handed its bytes it runs to completion on a
/// spawned task: dropping the `update_data` future cannot leave the file
/// and the cached value disagreeing.
pub struct FileDataStore<P: StoreValue> {
    inner: Arc<Inner<P>>,
    write_lock: Arc<Mutex<()>>,
}

struct Inner<P: StoreValue> {
    path: PathBuf,
    serializer: Arc<dyn Serializer<P>>,
    config: FileStoreConfig,
    state: watch::Sender<Result<P, Corruption>>,
}

impl<P: StoreValue> FileDataStore<P> {
    /// Open the store at `path`, decoding the current file contents.
    ///
    /// A missing or empty file yields the serializer's default value.
    /// Undecodable contents are kept as [`Corruption`] and reported by reads;
    /// any other failure (I/O, decryption) aborts the open.
    pub async fn open<S>(
        path: impl Into<PathBuf>,
        serializer: S,
        config: FileStoreConfig,
    ) -> StoreResult<Self>
    where
        S: Serializer<P> + 'static,
    {
        Self::open_shared(path, Arc::new(serializer), config).await
    }

    /// Like [`open`](Self::open), for a serializer that is already shared.
    pub async fn open_shared(
        path: impl Into<PathBuf>,
        serializer: Arc<dyn Serializer<P>>,
        config: FileStoreConfig,
    ) -> StoreResult<Self> {
        let path = path.into();
        let initial = load(&path, serializer.as_ref()).await?;
        info!(path = %path.display(), corrupt = initial.is_err(), "file store opened");
        Ok(Self {
            inner: Arc::new(Inner {
                path,
                serializer,
                config,
                state: watch::Sender::new(initial),
            }),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Re-read the backing file, picking up external modification.
    ///
    /// Subscribers are notified if the decoded value changed.
    pub async fn reload(&self) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let inner = &self.inner;
        let fresh = load(&inner.path, inner.serializer.as_ref()).await?;
        let changed = inner.state.send_if_modified(|current| {
            if *current == fresh {
                false
            } else {
                *current = fresh;
                true
            }
        });
        debug!(path = %inner.path.display(), changed, "file store reloaded");
        Ok(())
    }
}

impl<P: StoreValue> Inner<P> {
    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn persist(&self, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.temp_path();
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        if matches!(self.config.sync_mode, SyncMode::EveryWrite) {
            file.sync_all().await?;
        }
        drop(file);

        fs::rename(&tmp, &self.path).await
    }
}

/// Read and decode the file at `path`.
///
/// The outer result carries fatal errors; the inner one carries corruption.
async fn load<P>(
    path: &Path,
    serializer: &dyn Serializer<P>,
) -> StoreResult<Result<P, Corruption>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Ok(serializer.default_value())),
        Err(e) => return Err(e.into()),
    };

    if bytes.is_empty() {
        return Ok(Ok(serializer.default_value()));
    }

    match serializer.read(&bytes) {
        Ok(value) => Ok(Ok(value)),
        Err(StoreError::Corrupt(corruption)) => {
            warn!(path = %path.display(), reason = %corruption, "stored data is corrupt");
            Ok(Err(corruption))
        }
        Err(e) => Err(e),
    }
}

#[async_trait]
impl<P: StoreValue> DataStore<P> for FileDataStore<P> {
    async fn current_value(&self) -> StoreResult<P> {
        let current = self.inner.state.borrow().clone();
        current.map_err(StoreError::from)
    }

    async fn update_data<'a>(&self, transform: Transform<'a, P>) -> StoreResult<P> {
        let guard = Arc::clone(&self.write_lock).lock_owned().await;

        let current = self.inner.state.borrow().clone();
        let unchanged = current.as_ref().ok().cloned();
        let next = transform(current)?;
        if unchanged.as_ref() == Some(&next) {
            debug!(path = %self.inner.path.display(), "file update is a no-op");
            return Ok(next);
        }

        let bytes = self.inner.serializer.write(&next)?;
        let inner = Arc::clone(&self.inner);
        let published = next.clone();
        let commit = tokio::spawn(async move {
            let _guard = guard;
            inner.persist(&bytes).await?;
            inner.state.send_modify(|state| *state = Ok(published));
            debug!(path = %inner.path.display(), len = bytes.len(), "file update committed");
            Ok::<_, StoreError>(())
        });
        commit.await.map_err(|e| StoreError::Io(io::Error::other(e)))??;
        Ok(next)
    }

    fn watch(&self) -> ChangeStream<P> {
        WatchStream::new(self.inner.state.subscribe()).boxed()
    }
}

impl<P: StoreValue> std::fmt::Debug for FileDataStore<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDataStore")
            .field("path", &self.inner.path)
            .field("sync_mode", &self.inner.config.sync_mode)
            .finish()
    }
}
