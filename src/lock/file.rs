// ABOUTME: Lock files in a shared directory, one file per lock name.
// ABOUTME: Advisory (check-then-write) and exclusive (link-into-place) variants.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{DEFAULT_POLL_INTERVAL, LockError, LockInfo, Locker};
use crate::types::sanitize;

/// Directory, staleness, and polling settings shared by both file lockers.
#[derive(Debug, Clone)]
struct LockDir {
    dir: PathBuf,
    stale_after: Option<Duration>,
    poll_interval: Duration,
    broken: Arc<Mutex<Vec<String>>>,
}

/// What happened when a stale lock file was moved aside.
#[derive(Debug, PartialEq, Eq)]
enum Removal {
    Broken,
    Vanished,
    Replaced,
}

impl LockDir {
    fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            stale_after: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            broken: Arc::default(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.lock", sanitize(name)))
    }

    async fn ensure_dir(&self) -> Result<(), LockError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| LockError::Io {
                path: self.dir.clone(),
                source,
            })
    }

    /// Write the holder record for `name` at `path`.
    ///
    /// The record is written to a temporary file first, so readers never see
    /// a partial lock file. With `clobber` false the final step fails when
    /// `path` already exists and `Ok(false)` is returned.
    async fn place(&self, path: &Path, name: &str, clobber: bool) -> Result<bool, LockError> {
        let json = serde_json::to_string(&LockInfo::new(name))?;
        let dir = self.dir.clone();
        let target = path.to_path_buf();

        blocking(path, move || {
            let mut pending = tempfile::Builder::new()
                .prefix(".pending-")
                .tempfile_in(&dir)?;
            pending.write_all(json.as_bytes())?;
            pending.as_file().sync_all()?;

            let placed = if clobber {
                pending.persist(&target)
            } else {
                pending.persist_noclobber(&target)
            };
            match placed {
                Ok(_) => Ok(true),
                Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(false),
                Err(e) => Err(e.error),
            }
        })
        .await
    }

    /// Remove an existing lock file if it is stale or unreadable.
    ///
    /// Returns true when the file is gone and acquisition may proceed.
    async fn break_if_stale(&self, path: &Path) -> Result<bool, LockError> {
        let Some(max_age) = self.stale_after else {
            return Ok(false);
        };

        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            // Released between our check and the read.
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
            Err(source) => {
                return Err(LockError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let notice = match serde_json::from_str::<LockInfo>(&content) {
            Ok(existing) if existing.is_stale(max_age) => format!(
                "broke stale lock '{}' held by {} (pid {}) since {}",
                existing.name, existing.holder, existing.pid, existing.started_at
            ),
            Ok(_) => return Ok(false),
            // Unparseable content only counts once the file itself is old.
            Err(_) if modified_before(path, max_age).await? => {
                format!("broke corrupted lock file {}", path.display())
            }
            Err(_) => return Ok(false),
        };

        match self.remove_if_unchanged(path, content).await? {
            Removal::Broken => {
                tracing::info!("{}", notice);
                self.broken.lock().push(notice);
                Ok(true)
            }
            Removal::Vanished => Ok(true),
            Removal::Replaced => Ok(false),
        }
    }

    /// Move the lock file aside and delete it if it still holds `expected`.
    ///
    /// A fresh lock that replaced the stale one in the meantime is linked
    /// back into place.
    async fn remove_if_unchanged(
        &self,
        path: &Path,
        expected: String,
    ) -> Result<Removal, LockError> {
        let dir = self.dir.clone();
        let target = path.to_path_buf();

        blocking(path, move || {
            let aside = tempfile::Builder::new()
                .prefix(".broken-")
                .tempfile_in(&dir)?
                .into_temp_path();

            match std::fs::rename(&target, &aside) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Removal::Vanished),
                Err(e) => return Err(e),
            }

            if std::fs::read_to_string(&aside)? == expected {
                return Ok(Removal::Broken);
            }

            match std::fs::hard_link(&aside, &target) {
                Ok(()) => Ok(Removal::Replaced),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(Removal::Replaced),
                Err(e) => Err(e),
            }
        })
        .await
    }

    fn take_notices(&self) -> Vec<String> {
        std::mem::take(&mut *self.broken.lock())
    }
}

/// Run blocking filesystem work off the async runtime.
async fn blocking<T, F>(path: &Path, work: F) -> Result<T, LockError>
where
    T: Send + 'static,
    F: FnOnce() -> std::io::Result<T> + Send + 'static,
{
    let joined = tokio::task::spawn_blocking(work)
        .await
        .map_err(std::io::Error::other);

    joined.and_then(|result| result).map_err(|source| LockError::Io {
        path: path.to_path_buf(),
        source,
    })
}

async fn modified_before(path: &Path, max_age: Duration) -> Result<bool, LockError> {
    let modified = match tokio::fs::metadata(path).await.and_then(|m| m.modified()) {
        Ok(modified) => modified,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(source) => {
            return Err(LockError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    Ok(SystemTime::now()
        .duration_since(modified)
        .is_ok_and(|age| age >= max_age))
}

async fn remove_lock_file(path: &Path) -> Result<(), LockError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(LockError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Lock file checked for existence, then written.
///
/// There is a window between the check and the write in which another
/// process can also see the file as absent. A conflicting push is the
/// backstop when that happens.
#[derive(Debug, Clone)]
pub struct AdvisoryFileLocker {
    inner: LockDir,
}

impl AdvisoryFileLocker {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            inner: LockDir::new(dir.into()),
        }
    }

    pub fn stale_after(mut self, max_age: Duration) -> Self {
        self.inner.stale_after = Some(max_age);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.inner.poll_interval = interval;
        self
    }

    /// Path of the lock file backing `name`.
    pub fn lock_path(&self, name: &str) -> PathBuf {
        self.inner.path(name)
    }
}

#[async_trait]
impl Locker for AdvisoryFileLocker {
    async fn try_acquire(&self, name: &str) -> Result<bool, LockError> {
        self.inner.ensure_dir().await?;
        let path = self.inner.path(name);

        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|source| LockError::Io {
                path: path.clone(),
                source,
            })?;

        if exists && !self.inner.break_if_stale(&path).await? {
            return Ok(false);
        }

        self.inner.place(&path, name, true).await
    }

    async fn release(&self, name: &str) -> Result<(), LockError> {
        remove_lock_file(&self.inner.path(name)).await
    }

    fn poll_interval(&self) -> Duration {
        self.inner.poll_interval
    }

    fn take_stale_notices(&self) -> Vec<String> {
        self.inner.take_notices()
    }
}

/// Lock file linked into place only when absent, so only one creator can win.
#[derive(Debug, Clone)]
pub struct ExclusiveFileLocker {
    inner: LockDir,
}

impl ExclusiveFileLocker {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            inner: LockDir::new(dir.into()),
        }
    }

    pub fn stale_after(mut self, max_age: Duration) -> Self {
        self.inner.stale_after = Some(max_age);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.inner.poll_interval = interval;
        self
    }

    /// Path of the lock file backing `name`.
    pub fn lock_path(&self, name: &str) -> PathBuf {
        self.inner.path(name)
    }
}

#[async_trait]
impl Locker for ExclusiveFileLocker {
    async fn try_acquire(&self, name: &str) -> Result<bool, LockError> {
        self.inner.ensure_dir().await?;
        let path = self.inner.path(name);

        if self.inner.place(&path, name, false).await? {
            return Ok(true);
        }

        // Held: only retry right away if the holder was stale.
        if self.inner.break_if_stale(&path).await? {
            return self.inner.place(&path, name, false).await;
        }
        Ok(false)
    }

    async fn release(&self, name: &str) -> Result<(), LockError> {
        remove_lock_file(&self.inner.path(name)).await
    }

    fn poll_interval(&self) -> Duration {
        self.inner.poll_interval
    }

    fn take_stale_notices(&self) -> Vec<String> {
        self.inner.take_notices()
    }
}
