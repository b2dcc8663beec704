// ABOUTME: Version-control operations against a working copy of the target branch.
// ABOUTME: VcsOps capability trait plus the git-CLI implementation.

mod error;
mod git;

pub use error::{VcsError, VcsErrorKind};
pub use git::{Committer, GitRepo};

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::retry::{RetryError, RetryPolicy};
use crate::types::{BackupRef, CommitId};

/// How the working copy came into being.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneOutcome {
    /// The branch existed remotely and was fetched.
    Existing,
    /// The branch did not exist; a fresh orphan branch was seeded locally.
    Created,
}

/// How a rollback rewrites the remote branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RollbackMode {
    /// Only overwrite the remote if it is where this run expects it to be.
    #[default]
    Lease,
    /// Unconditional force-push.
    Force,
}

/// Operations the publisher needs from version control.
///
/// Each call is independent; the implementation owns one working copy.
#[async_trait]
pub trait VcsOps: Send + Sync {
    /// Root of the working copy.
    fn work_dir(&self) -> &Path;

    /// Target branch name.
    fn branch(&self) -> &str;

    /// Fetch the target branch, or seed a new orphan branch if it is missing.
    async fn clone_or_create(&self) -> Result<CloneOutcome, VcsError>;

    /// Stage everything and commit. Returns HEAD unchanged if nothing is staged.
    async fn commit(&self, message: &str) -> Result<CommitId, VcsError>;

    /// One push attempt of HEAD to the target branch.
    async fn push(&self, force: bool) -> Result<(), VcsError>;

    /// Record the current HEAD under a uniquely named ref.
    async fn create_backup(&self) -> Result<BackupRef, VcsError>;

    /// Reset the working copy to `backup` and restore the remote branch.
    ///
    /// `attempted` is the commit this run tried to publish, if any; in
    /// [`RollbackMode::Lease`] it is the only remote head that may be
    /// overwritten.
    async fn rollback(
        &self,
        backup: &BackupRef,
        mode: RollbackMode,
        attempted: Option<&CommitId>,
    ) -> Result<(), VcsError>;

    /// Current HEAD of the working copy.
    async fn current_commit(&self) -> Result<CommitId, VcsError>;

    /// Head of the target branch on the remote, `None` if it does not exist.
    async fn remote_head(&self) -> Result<Option<CommitId>, VcsError>;

    /// Push with the given retry policy, observing `cancel` between attempts.
    ///
    /// Returns the number of attempts it took.
    async fn push_with_retry(
        &self,
        force: bool,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> Result<u32, VcsError> {
        let outcome = policy
            .run(cancel, |attempt| async move {
                match self.push(force).await {
                    Ok(()) => Ok(attempt),
                    Err(e) => {
                        tracing::warn!("push attempt {} failed: {}", attempt, e);
                        Err(e)
                    }
                }
            })
            .await;

        match outcome {
            Ok(attempts) => Ok(attempts),
            Err(RetryError::Cancelled { .. }) => Err(VcsError::Cancelled {
                command: "git push".to_string(),
            }),
            Err(RetryError::Exhausted { attempts, last } | RetryError::TimedOut { attempts, last }) => {
                if last.is_cancelled() {
                    return Err(last);
                }
                Err(VcsError::PushExhausted {
                    attempts,
                    source: Box::new(last),
                })
            }
        }
    }
}
