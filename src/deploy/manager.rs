// ABOUTME: Orchestrates a publish: lock, checkpoint, write, commit, push, verify.
// ABOUTME: Rolls back on failure after the checkpoint and always releases the lock.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::cleanup::{CleanupEngine, Cleaner};
use crate::diagnostics::Warning;
use crate::lock::{Locked, Locker, lock_name, with_lock};
use crate::retry::RetryPolicy;
use crate::types::DeploymentPath;
use crate::vcs::{RollbackMode, VcsOps};

use super::error::{DeployError, DeployFailure};
use super::options::{DeploymentOptions, DeploymentResult, artifact_urls, deployment_url};
use super::path::{MainBranches, PathResolver};
use super::publish::{Progress, Publish};
use super::state::{Pending, Rollbackable};
use super::verify::{Verifier, VerifyError, verify_deployment};

/// Default time to wait for another publish to finish.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(300);

/// Default push attempts.
pub const DEFAULT_PUSH_ATTEMPTS: u32 = 3;

/// Default base delay between push attempts; attempt `n` waits `n` times this.
pub const DEFAULT_PUSH_BACKOFF: Duration = Duration::from_secs(1);

type Outcome = (Progress, Result<(), DeployError>);

/// Publishes artifacts to one branch through the given collaborators.
pub struct DeploymentManager<V, L, C = CleanupEngine> {
    vcs: V,
    locker: L,
    cleaner: C,
    resolver: Arc<dyn PathResolver>,
    verifier: Option<Arc<dyn Verifier>>,
    lock_timeout: Duration,
    push_policy: RetryPolicy,
    rollback_mode: RollbackMode,
    base_url: String,
    verify_timeout: Option<Duration>,
}

impl<V: VcsOps, L: Locker, C: Cleaner> DeploymentManager<V, L, C> {
    pub fn new(vcs: V, locker: L, cleaner: C) -> Self {
        Self {
            vcs,
            locker,
            cleaner,
            resolver: Arc::new(MainBranches::default()),
            verifier: None,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            push_policy: RetryPolicy::linear(DEFAULT_PUSH_ATTEMPTS, DEFAULT_PUSH_BACKOFF),
            rollback_mode: RollbackMode::default(),
            base_url: String::new(),
            verify_timeout: None,
        }
    }

    pub fn resolver(mut self, resolver: impl PathResolver + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    pub fn verifier(mut self, verifier: impl Verifier + 'static) -> Self {
        self.verifier = Some(Arc::new(verifier));
        self
    }

    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn push_policy(mut self, policy: RetryPolicy) -> Self {
        self.push_policy = policy;
        self
    }

    pub fn rollback_mode(mut self, mode: RollbackMode) -> Self {
        self.rollback_mode = mode;
        self
    }

    /// Public URL the branch is served from.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Verification timeout used when the options do not set one.
    pub fn verify_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.verify_timeout = timeout;
        self
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    pub fn locker(&self) -> &L {
        &self.locker
    }

    /// The explicit target if the options carry one, otherwise the resolved one.
    pub fn resolve_path(&self, options: &DeploymentOptions) -> DeploymentPath {
        options.target.clone().unwrap_or_else(|| {
            self.resolver.resolve(
                &options.event_name,
                &options.branch,
                options.pr_number.as_deref(),
            )
        })
    }

    /// Publish `options.artifacts`.
    ///
    /// On failure the returned [`DeployFailure`] still carries a result with
    /// whatever was done, including the backup reference and rollback status.
    pub async fn deploy(
        &self,
        options: &DeploymentOptions,
        cancel: &CancellationToken,
    ) -> Result<DeploymentResult, DeployFailure> {
        let started = Instant::now();
        let options = self.with_defaults(options);
        let target = self.resolve_path(&options);
        let url = deployment_url(&self.base_url, &target);
        let name = lock_name(&options.repository, self.vcs.branch());

        tracing::info!(
            path = %target,
            dry_run = options.dry_run,
            "publishing {} artifact(s) to {}",
            options.artifacts.len(),
            self.vcs.branch()
        );

        let publish = Publish::new(&self.vcs, &self.cleaner, &options, target.clone(), cancel);
        let locked = with_lock(
            &self.locker,
            &name,
            self.lock_timeout,
            cancel,
            self.run(publish, &url),
        )
        .await;

        let (mut progress, outcome) = match locked {
            Ok(Locked {
                value,
                release_error,
            }) => {
                let (mut progress, outcome) = value;
                if let Some(e) = release_error {
                    progress.diagnostics.warn(Warning::lock_release(format!(
                        "failed to release lock '{name}': {e}"
                    )));
                }
                (progress, outcome)
            }
            Err(e) => (Progress::default(), Err(DeployError::from(e))),
        };
        for notice in self.locker.take_stale_notices() {
            progress.diagnostics.warn(Warning::stale_lock(notice));
        }

        let place = if target.is_root() {
            "root".to_string()
        } else {
            target.to_string()
        };
        let mut result = DeploymentResult {
            success: outcome.is_ok(),
            message: String::new(),
            additional_urls: artifact_urls(&url, &options.artifacts),
            url,
            path: target.to_string(),
            files_deployed: progress.files_deployed,
            files_removed: progress.files_removed,
            removed_paths: progress.removed_paths,
            backup: progress.backup,
            warnings: progress.diagnostics.into_warnings(),
            commit: progress.commit,
            push_attempts: progress.push_attempts,
            no_changes: progress.no_changes,
            dry_run: options.dry_run,
            rolled_back: progress.rolled_back,
            duration: started.elapsed(),
        };

        match outcome {
            Ok(()) => {
                result.message = if options.dry_run {
                    format!(
                        "dry run: would deploy {} file(s) to {} and remove {}",
                        result.files_deployed, place, result.files_removed
                    )
                } else if result.no_changes {
                    format!("{place} already up to date")
                } else {
                    format!("deployed {} file(s) to {}", result.files_deployed, place)
                };
                tracing::info!("{}", result.message);
                Ok(result)
            }
            Err(error) => {
                result.message = if result.rolled_back {
                    format!("deployment to {place} failed and was rolled back: {error}")
                } else {
                    format!("deployment to {place} failed: {error}")
                };
                tracing::error!("{}", result.message);
                Err(DeployFailure {
                    error,
                    result: Box::new(result),
                })
            }
        }
    }

    /// Confirm a reported deployment: remote head, then the URL if a
    /// verifier and timeout are configured.
    pub async fn verify(
        &self,
        result: &DeploymentResult,
        cancel: &CancellationToken,
    ) -> Result<(), VerifyError> {
        let commit = result.commit.as_ref().ok_or(VerifyError::NothingPublished)?;
        verify_deployment(
            &self.vcs,
            self.verifier.as_deref(),
            commit,
            &result.url,
            self.verify_timeout,
            cancel,
        )
        .await
    }

    fn with_defaults(&self, options: &DeploymentOptions) -> DeploymentOptions {
        let mut options = options.clone();
        if options.verify_timeout.is_none() {
            options.verify_timeout = self.verify_timeout;
        }
        options
    }

    async fn run(&self, publish: Publish<'_, Pending>, url: &str) -> Outcome {
        let publish = publish.locked();

        let publish = match publish.checkpoint().await {
            Ok(next) => next,
            Err((publish, e)) => return (publish.into_progress(), Err(e)),
        };
        let publish = match publish.prepare().await {
            Ok(next) => next,
            Err((publish, e)) => return self.recover(publish, e).await,
        };
        let publish = match publish.commit().await {
            Ok(next) => next,
            Err((publish, e)) => return self.recover(publish, e).await,
        };
        let publish = match publish.push(&self.push_policy).await {
            Ok(next) => next,
            Err((publish, e)) => return self.recover(publish, e).await,
        };

        let publish = publish.verify(self.verifier.as_deref(), url).await;
        (publish.finish(), Ok(()))
    }

    /// Roll back after a failure, unless nothing was touched yet.
    async fn recover<S: Rollbackable>(&self, publish: Publish<'_, S>, error: DeployError) -> Outcome {
        if error.is_validation() {
            return (publish.into_progress(), Err(error));
        }

        tracing::warn!("publish failed, rolling back: {}", error);
        match publish.rollback(self.rollback_mode).await {
            Ok(rolled_back) => (rolled_back.finish(), Err(error)),
            Err((publish, rollback)) => {
                tracing::error!("rollback failed: {}", rollback);
                (
                    publish.into_progress(),
                    Err(DeployError::RollbackFailed {
                        original: Box::new(error),
                        rollback,
                    }),
                )
            }
        }
    }
}
