// ABOUTME: Best-effort post-publish checks: remote head and HTTP reachability.
// ABOUTME: HttpVerifier polls the deployment URL until it answers 2xx or time runs out.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::retry::{RetryError, RetryPolicy};
use crate::types::CommitId;
use crate::vcs::{VcsError, VcsOps};

/// Default interval between reachability probes.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("{url} not reachable after {attempts} attempt(s): {last}")]
    Unreachable {
        url: String,
        attempts: u32,
        last: String,
    },

    #[error("verification of {url} cancelled")]
    Cancelled { url: String },

    #[error("remote branch is at {actual}, expected {expected}")]
    HeadMismatch { expected: String, actual: String },

    #[error("remote branch does not exist")]
    BranchMissing,

    #[error("deployment has no commit to verify")]
    NothingPublished,

    #[error(transparent)]
    Vcs(#[from] VcsError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Confirms a published URL is being served.
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(
        &self,
        url: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), VerifyError>;
}

/// Verifier issuing HTTP GET requests with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpVerifier {
    client: reqwest::Client,
    probe_interval: Duration,
}

impl HttpVerifier {
    pub fn new() -> Result<Self, VerifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("pagepush/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            probe_interval: DEFAULT_PROBE_INTERVAL,
        })
    }

    pub fn probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    async fn probe(&self, url: &str) -> Result<(), String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(format!("HTTP {status}"))
        }
    }
}

#[async_trait]
impl Verifier for HttpVerifier {
    async fn verify(
        &self,
        url: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), VerifyError> {
        let policy = RetryPolicy::polling(self.probe_interval, timeout);
        policy
            .run(cancel, |attempt| async move {
                let outcome = self.probe(url).await;
                if let Err(ref reason) = outcome {
                    tracing::debug!("probe {} of {} failed: {}", attempt, url, reason);
                }
                outcome
            })
            .await
            .map_err(|e| match e {
                RetryError::Cancelled { .. } => VerifyError::Cancelled {
                    url: url.to_string(),
                },
                RetryError::Exhausted { attempts, last } | RetryError::TimedOut { attempts, last } => {
                    VerifyError::Unreachable {
                        url: url.to_string(),
                        attempts,
                        last,
                    }
                }
            })?;

        tracing::info!("{} is live", url);
        Ok(())
    }
}

/// Check that the remote branch head is `commit`, then probe `url` if a
/// verifier and timeout are given.
pub async fn verify_deployment<V: VcsOps + ?Sized>(
    vcs: &V,
    verifier: Option<&dyn Verifier>,
    commit: &CommitId,
    url: &str,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> Result<(), VerifyError> {
    match vcs.remote_head().await? {
        None => return Err(VerifyError::BranchMissing),
        Some(head) if head != *commit => {
            return Err(VerifyError::HeadMismatch {
                expected: commit.to_string(),
                actual: head.to_string(),
            });
        }
        Some(_) => {}
    }

    if let (Some(verifier), Some(timeout)) = (verifier, timeout) {
        verifier.verify(url, timeout, cancel).await?;
    }
    Ok(())
}
