// ABOUTME: State transition methods for one publish.
// ABOUTME: Each method consumes self and returns the next state, or itself plus the error.

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use crate::cleanup::{Cleaner, CleanupRequest};
use crate::diagnostics::{Diagnostics, Warning};
use crate::retry::RetryPolicy;
use crate::types::{BackupRef, CommitId, DeploymentPath, PathType};
use crate::vcs::{CloneOutcome, RollbackMode, VcsError, VcsOps};

use super::error::DeployError;
use super::options::DeploymentOptions;
use super::state::{
    Checkpointed, Committed, LockAcquired, Pending, Prepared, Pushed, Rollbackable, RolledBack,
    Verified,
};
use super::verify::{Verifier, verify_deployment};

/// Result type for transitions that may need rollback on failure.
pub type TransitionResult<'a, T, S> = Result<Publish<'a, T>, (Publish<'a, S>, DeployError)>;

/// What a publish has done so far, whatever state it ends in.
#[derive(Debug, Default)]
pub struct Progress {
    pub files_deployed: usize,
    pub files_removed: usize,
    pub removed_paths: Vec<String>,
    pub backup: Option<BackupRef>,
    pub commit: Option<CommitId>,
    pub push_attempts: u32,
    pub created_branch: bool,
    pub no_changes: bool,
    pub rolled_back: bool,
    pub diagnostics: Diagnostics,
}

/// One publish in progress, parameterized by its current state.
pub struct Publish<'a, S> {
    vcs: &'a dyn VcsOps,
    cleaner: &'a dyn Cleaner,
    options: &'a DeploymentOptions,
    cancel: &'a CancellationToken,
    target: DeploymentPath,
    progress: Progress,
    state: S,
}

impl<'a> Publish<'a, Pending> {
    pub fn new(
        vcs: &'a dyn VcsOps,
        cleaner: &'a dyn Cleaner,
        options: &'a DeploymentOptions,
        target: DeploymentPath,
        cancel: &'a CancellationToken,
    ) -> Self {
        Publish {
            vcs,
            cleaner,
            options,
            cancel,
            target,
            progress: Progress::default(),
            state: Pending,
        }
    }

    /// Enter the critical section. Call only while the deployment lock is held.
    pub fn locked(self) -> Publish<'a, LockAcquired> {
        tracing::debug!("lock held for {}", self.display_target());
        self.transition(LockAcquired)
    }
}

impl<'a, S> Publish<'a, S> {
    fn transition<T>(self, state: T) -> Publish<'a, T> {
        Publish {
            vcs: self.vcs,
            cleaner: self.cleaner,
            options: self.options,
            cancel: self.cancel,
            target: self.target,
            progress: self.progress,
            state,
        }
    }

    fn fail<T>(self, error: impl Into<DeployError>) -> TransitionResult<'a, T, S> {
        Err((self, error.into()))
    }

    fn cancelled(&self) -> bool {
        if self.cancel.is_cancelled() {
            tracing::warn!("publish to {} cancelled", self.display_target());
            return true;
        }
        false
    }

    fn display_target(&self) -> String {
        if self.target.is_root() {
            "root".to_string()
        } else {
            self.target.to_string()
        }
    }

    pub fn target(&self) -> &DeploymentPath {
        &self.target
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    /// Stop here and hand back what was done.
    pub fn into_progress(self) -> Progress {
        self.progress
    }
}

// =============================================================================
// LockAcquired -> Checkpointed
// =============================================================================

impl<'a> Publish<'a, LockAcquired> {
    /// Obtain the working copy and record the rollback point.
    ///
    /// No backup is taken in a dry run since nothing will be pushed.
    pub async fn checkpoint(mut self) -> TransitionResult<'a, Checkpointed, LockAcquired> {
        if self.cancelled() {
            return self.fail(DeployError::Cancelled);
        }

        let outcome = match self.vcs.clone_or_create().await {
            Ok(outcome) => outcome,
            Err(e) => return self.fail(e),
        };
        self.progress.created_branch = outcome == CloneOutcome::Created;

        let base = match self.vcs.current_commit().await {
            Ok(commit) => commit,
            Err(e) => return self.fail(e),
        };

        let backup = if self.options.dry_run {
            None
        } else {
            match self.vcs.create_backup().await {
                Ok(backup) => Some(backup),
                Err(e) => return self.fail(e),
            }
        };
        self.progress.backup = backup.clone();

        tracing::info!("working copy ready at {}", base.short());
        Ok(self.transition(Checkpointed { backup, base }))
    }
}

// =============================================================================
// Checkpointed -> Prepared
// =============================================================================

impl<'a> Publish<'a, Checkpointed> {
    /// Validate cleanup patterns, write the artifacts, and remove stale files.
    ///
    /// In a dry run cleanup only reports what it would remove.
    pub async fn prepare(mut self) -> TransitionResult<'a, Prepared, Checkpointed> {
        if self.cancelled() {
            return self.fail(DeployError::Cancelled);
        }

        let options = self.options;
        let work_dir = self.vcs.work_dir().to_path_buf();
        let patterns = &options.cleanup_patterns;
        if let Err(e) = self.cleaner.validate(&work_dir, patterns) {
            return self.fail(e);
        }

        let target_dir = self.target_dir(work_dir);
        if let Err(e) = self.write_artifacts(&target_dir).await {
            return self.fail(e);
        }

        let protect = self.protected_paths();
        let request = CleanupRequest::new(&target_dir, patterns).protecting(&protect);
        let cleaned = match self.cleaner.cleanup(request, options.dry_run) {
            Ok(cleaned) => cleaned,
            Err(e) => return self.fail(e),
        };

        for error in &cleaned.errors {
            self.progress
                .diagnostics
                .warn(Warning::cleanup_path(&error.path, &error.message));
        }
        self.progress.files_deployed = self.options.artifacts.len();
        self.progress.files_removed = cleaned.removed_count();
        self.progress.removed_paths = cleaned
            .removed
            .iter()
            .map(|p| self.branch_relative(p))
            .collect();

        tracing::info!(
            "wrote {} file(s), {} {} stale path(s)",
            self.progress.files_deployed,
            if self.options.dry_run { "would remove" } else { "removed" },
            self.progress.files_removed
        );

        let Checkpointed { backup, base } = self.state.clone();
        Ok(self.transition(Prepared { backup, base }))
    }

    fn target_dir(&self, work_dir: PathBuf) -> PathBuf {
        if self.target.is_root() {
            work_dir
        } else {
            work_dir.join(self.target.to_string())
        }
    }

    async fn write_artifacts(&self, target_dir: &std::path::Path) -> Result<(), DeployError> {
        let io_err = |path: &std::path::Path| {
            let path = path.to_path_buf();
            move |source| DeployError::Io { path, source }
        };

        tokio::fs::create_dir_all(target_dir)
            .await
            .map_err(io_err(target_dir))?;

        for (rel, content) in self.options.artifacts.iter() {
            let dest = target_dir.join(rel);
            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(io_err(parent))?;
            }
            tokio::fs::write(&dest, content)
                .await
                .map_err(io_err(&dest))?;
            tracing::debug!("wrote {}", self.branch_relative(rel));
        }
        Ok(())
    }

    /// Artifacts just written, plus the other deployments when publishing at the root.
    fn protected_paths(&self) -> Vec<String> {
        let mut protect: Vec<String> = self.options.artifacts.paths().map(String::from).collect();
        if self.target.is_root() {
            protect.extend(
                [PathType::Main, PathType::Branch, PathType::Pr]
                    .iter()
                    .map(|kind| kind.root_segment().to_string()),
            );
        }
        protect
    }

    fn branch_relative(&self, path: &str) -> String {
        if self.target.is_root() {
            path.to_string()
        } else {
            format!("{}/{}", self.target, path)
        }
    }
}

// =============================================================================
// Prepared -> Committed
// =============================================================================

impl<'a> Publish<'a, Prepared> {
    /// Commit everything. An unchanged tree is a successful no-op.
    pub async fn commit(mut self) -> TransitionResult<'a, Committed, Prepared> {
        if self.cancelled() {
            return self.fail(DeployError::Cancelled);
        }

        let message = self.options.commit_message(&self.target);
        let commit = match self.vcs.commit(&message).await {
            Ok(commit) => commit,
            Err(e) => return self.fail(e),
        };

        let changed = commit != self.state.base;
        if changed {
            tracing::info!("committed {}", commit.short());
        } else {
            tracing::info!("no changes to publish");
            self.progress.no_changes = true;
        }
        self.progress.commit = Some(commit.clone());

        let backup = self.state.backup.clone();
        Ok(self.transition(Committed {
            backup,
            commit,
            changed,
        }))
    }
}

// =============================================================================
// Committed -> Pushed
// =============================================================================

impl<'a> Publish<'a, Committed> {
    /// Push with retries. Skipped in a dry run and when there is nothing new.
    pub async fn push(mut self, policy: &RetryPolicy) -> TransitionResult<'a, Pushed, Committed> {
        let commit = self.state.commit.clone();

        if self.options.dry_run {
            tracing::info!("dry run: not pushing {}", commit.short());
            return Ok(self.transition(Pushed { commit }));
        }
        if !self.state.changed && !self.progress.created_branch {
            tracing::info!("remote already up to date");
            return Ok(self.transition(Pushed { commit }));
        }
        if self.cancelled() {
            return self.fail(DeployError::Cancelled);
        }

        match self
            .vcs
            .push_with_retry(self.options.force, policy, self.cancel)
            .await
        {
            Ok(attempts) => {
                self.progress.push_attempts = attempts;
                tracing::info!("pushed {} after {} attempt(s)", commit.short(), attempts);
                Ok(self.transition(Pushed { commit }))
            }
            Err(e) => {
                if let VcsError::PushExhausted { attempts, .. } = &e {
                    self.progress.push_attempts = *attempts;
                }
                self.fail(e)
            }
        }
    }
}

// =============================================================================
// Pushed -> Verified
// =============================================================================

impl<'a> Publish<'a, Pushed> {
    /// Best-effort checks. Failures become warnings, never errors.
    pub async fn verify(mut self, verifier: Option<&dyn Verifier>, url: &str) -> Publish<'a, Verified> {
        let commit = self.state.commit.clone();

        if !self.options.dry_run
            && let Some(timeout) = self.options.verify_timeout
        {
            let checked =
                verify_deployment(self.vcs, verifier, &commit, url, Some(timeout), self.cancel)
                    .await;
            if let Err(e) = checked {
                self.progress
                    .diagnostics
                    .warn(Warning::verification(e.to_string()));
            }
        }

        self.transition(Verified { commit })
    }
}

impl Publish<'_, Verified> {
    pub fn commit(&self) -> &CommitId {
        &self.state.commit
    }

    pub fn finish(self) -> Progress {
        self.progress
    }
}

// =============================================================================
// Rollback
// =============================================================================

impl<'a, S: Rollbackable> Publish<'a, S> {
    /// Restore the remote branch to the backup taken at the checkpoint.
    pub async fn rollback(
        mut self,
        mode: RollbackMode,
    ) -> Result<Publish<'a, RolledBack>, (Publish<'a, S>, VcsError)> {
        let Some(backup) = self.state.backup().cloned() else {
            tracing::debug!("dry run: nothing to roll back");
            return Ok(self.transition(RolledBack));
        };
        let attempted = self.state.attempted().cloned();

        match self.vcs.rollback(&backup, mode, attempted.as_ref()).await {
            Ok(()) => {
                tracing::info!("rolled back to {}", backup);
                self.progress.rolled_back = true;
                Ok(self.transition(RolledBack))
            }
            Err(e) => Err((self, e)),
        }
    }
}

impl Publish<'_, RolledBack> {
    pub fn finish(self) -> Progress {
        self.progress
    }
}
