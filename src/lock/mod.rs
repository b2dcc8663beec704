// ABOUTME: Mutual exclusion between concurrent publishes to the same target.
// ABOUTME: Locker capability, lock metadata, and the always-release `with_lock` helper.

mod file;
mod memory;

pub use file::{AdvisoryFileLocker, ExclusiveFileLocker};
pub use memory::MemoryLocker;

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::retry::{RetryError, RetryPolicy};
use crate::types::sanitize;

/// How often a held lock is re-checked while waiting.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Errors from lock operations.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("timed out after {waited:?} waiting for lock '{name}'")]
    Timeout { name: String, waited: Duration },

    #[error("cancelled while waiting for lock '{name}'")]
    Cancelled { name: String },

    #[error("lock I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize lock info: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Information about who holds a lock, stored as JSON in the lock file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine that holds the lock.
    pub holder: String,
    /// Process ID of the lock holder.
    pub pid: u32,
    /// When the lock was acquired.
    pub started_at: DateTime<Utc>,
    /// Lock name.
    pub name: String,
}

impl LockInfo {
    /// Create new lock info for the current process.
    pub fn new(name: &str) -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            started_at: Utc::now(),
            name: name.to_string(),
        }
    }

    /// Whether the lock was taken longer ago than `max_age`.
    pub fn is_stale(&self, max_age: Duration) -> bool {
        let age = Utc::now() - self.started_at;
        age.to_std().is_ok_and(|age| age >= max_age)
    }
}

/// Lock name for publishing to `branch` of `repository`.
///
/// All deployment paths share one branch, so the lock is scoped to the branch
/// rather than to the subdirectory.
pub fn lock_name(repository: &str, branch: &str) -> String {
    format!("pagepush-{}-{}", sanitize(repository), sanitize(branch))
}

/// A named, advisory mutual-exclusion token.
#[async_trait]
pub trait Locker: Send + Sync {
    /// Make one attempt to take the lock. `Ok(false)` means it is held.
    async fn try_acquire(&self, name: &str) -> Result<bool, LockError>;

    /// Drop the lock. Releasing a lock that is not held is not an error.
    async fn release(&self, name: &str) -> Result<(), LockError>;

    /// Interval between attempts while the lock is held elsewhere.
    fn poll_interval(&self) -> Duration {
        DEFAULT_POLL_INTERVAL
    }

    /// Descriptions of stale locks broken since the last call.
    fn take_stale_notices(&self) -> Vec<String> {
        Vec::new()
    }

    /// Wait for the lock until `timeout` elapses or `cancel` fires.
    async fn acquire(
        &self,
        name: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), LockError> {
        let policy = RetryPolicy::polling(self.poll_interval(), timeout);

        // Ok(Err(_)) is a hard failure that must not be retried.
        let outcome = policy
            .run(cancel, |attempt| async move {
                match self.try_acquire(name).await {
                    Ok(true) => Ok(Ok(())),
                    Ok(false) => {
                        if attempt == 1 {
                            tracing::info!("lock '{}' is held, waiting up to {:?}", name, timeout);
                        }
                        Err(())
                    }
                    Err(e) => Ok(Err(e)),
                }
            })
            .await;

        match outcome {
            Ok(result) => {
                if result.is_ok() {
                    tracing::debug!("acquired lock '{}'", name);
                }
                result
            }
            Err(RetryError::Cancelled { .. }) => Err(LockError::Cancelled {
                name: name.to_string(),
            }),
            Err(RetryError::TimedOut { .. } | RetryError::Exhausted { .. }) => {
                Err(LockError::Timeout {
                    name: name.to_string(),
                    waited: timeout,
                })
            }
        }
    }
}

/// Value produced while holding a lock, plus any failure releasing it.
#[derive(Debug)]
pub struct Locked<T> {
    pub value: T,
    pub release_error: Option<LockError>,
}

/// Run `work` while holding `name`.
///
/// The lock is released on every exit path of `work`, including a panic,
/// which is re-raised after the release.
pub async fn with_lock<L, F, T>(
    locker: &L,
    name: &str,
    timeout: Duration,
    cancel: &CancellationToken,
    work: F,
) -> Result<Locked<T>, LockError>
where
    L: Locker + ?Sized,
    F: Future<Output = T>,
{
    locker.acquire(name, timeout, cancel).await?;

    let outcome = AssertUnwindSafe(work).catch_unwind().await;

    let release_error = locker.release(name).await.err();
    if let Some(ref e) = release_error {
        tracing::warn!("failed to release lock '{}': {}", name, e);
    } else {
        tracing::debug!("released lock '{}'", name);
    }

    match outcome {
        Ok(value) => Ok(Locked {
            value,
            release_error,
        }),
        Err(panic) => std::panic::resume_unwind(panic),
    }
}
