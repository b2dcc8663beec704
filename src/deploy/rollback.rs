// ABOUTME: Manual rollback of the pages branch to an earlier commit.
// ABOUTME: Runs under the deployment lock and backs up the current head first.

use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::lock::{Locker, lock_name, with_lock};
use crate::types::{BackupRef, CommitId, RefName};
use crate::vcs::{CloneOutcome, RollbackMode, VcsOps};

use super::DeployError;

/// What a manual rollback did.
#[derive(Debug, Clone, Serialize)]
pub struct RollbackOutcome {
    /// Head before the rollback; roll back to this to undo.
    pub previous: BackupRef,
    pub restored: CommitId,
}

/// Point the target branch at `to`.
///
/// The working copy needs enough history to contain `to`, so build the
/// [`GitRepo`](crate::vcs::GitRepo) with `full_history()`. In
/// [`RollbackMode::Lease`] the remote is only overwritten if it still sits at
/// the head observed after cloning.
pub async fn manual_rollback<V, L>(
    vcs: &V,
    locker: &L,
    repository: &str,
    to: &CommitId,
    mode: RollbackMode,
    lock_timeout: Duration,
    cancel: &CancellationToken,
) -> Result<RollbackOutcome, DeployError>
where
    V: VcsOps + ?Sized,
    L: Locker + ?Sized,
{
    if !is_commit_prefix(to.as_str()) {
        return Err(DeployError::InvalidTarget {
            target: to.as_str().to_string(),
        });
    }

    let name = lock_name(repository, vcs.branch());
    let locked = with_lock(locker, &name, lock_timeout, cancel, restore(vcs, to, mode)).await?;

    if let Some(e) = locked.release_error {
        tracing::warn!("failed to release lock '{}': {}", name, e);
    }
    locked.value
}

fn is_commit_prefix(target: &str) -> bool {
    !target.is_empty() && target.chars().all(|c| c.is_ascii_hexdigit())
}

async fn restore<V: VcsOps + ?Sized>(
    vcs: &V,
    to: &CommitId,
    mode: RollbackMode,
) -> Result<RollbackOutcome, DeployError> {
    if vcs.clone_or_create().await? == CloneOutcome::Created {
        return Err(DeployError::BranchMissing {
            branch: vcs.branch().to_string(),
        });
    }

    let previous = vcs.create_backup().await?;
    if previous.commit == *to || previous.commit.as_str().starts_with(to.as_str()) {
        tracing::info!("{} already at {}", vcs.branch(), to.short());
        return Ok(RollbackOutcome {
            restored: previous.commit.clone(),
            previous,
        });
    }

    let target = BackupRef {
        name: RefName::new(to.as_str()),
        commit: to.clone(),
    };
    vcs.rollback(&target, mode, Some(&previous.commit))
        .await?;
    let restored = vcs.current_commit().await?;

    tracing::info!(
        "rolled back {} from {} to {}",
        vcs.branch(),
        previous.commit.short(),
        restored.short()
    );
    Ok(RollbackOutcome { previous, restored })
}
