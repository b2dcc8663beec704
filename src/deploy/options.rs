// ABOUTME: Input to a publish and the result reported back to the caller.
// ABOUTME: Also derives the public URLs of a deployment.

use std::time::Duration;

use serde::Serialize;

use crate::diagnostics::Warning;
use crate::types::{BackupRef, CommitId, DeploymentPath};

use super::Artifacts;

/// Everything one publish needs from the caller.
#[derive(Debug, Clone, Default)]
pub struct DeploymentOptions {
    pub artifacts: Artifacts,
    /// `owner/name` of the repository the artifacts belong to.
    pub repository: String,
    /// Source branch or ref that produced the artifacts.
    pub branch: String,
    pub commit_sha: String,
    pub pr_number: Option<String>,
    pub event_name: String,
    /// Explicit target; resolved from the CI context when `None`.
    pub target: Option<DeploymentPath>,
    pub cleanup_patterns: Vec<String>,
    pub dry_run: bool,
    /// Force-push the publish commit.
    pub force: bool,
    pub verify_timeout: Option<Duration>,
}

impl DeploymentOptions {
    pub fn new(repository: impl Into<String>, artifacts: Artifacts) -> Self {
        Self {
            repository: repository.into(),
            artifacts,
            ..Default::default()
        }
    }

    /// Commit message for the publish commit.
    pub fn commit_message(&self, target: &DeploymentPath) -> String {
        let place = if target.is_root() {
            "root".to_string()
        } else {
            target.to_string()
        };
        let mut message = format!("Deploy {} file(s) to {}", self.artifacts.len(), place);

        let sha = self.commit_sha.trim();
        if !sha.is_empty() {
            let short = sha.get(..7).unwrap_or(sha);
            message.push_str(&format!(" from {short}"));
        }
        if !self.repository.is_empty() {
            message.push_str(&format!("\n\nSource: {}", self.repository));
            if !self.branch.is_empty() {
                message.push_str(&format!("@{}", self.branch));
            }
        }
        message
    }
}

/// Outcome of one publish attempt.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeploymentResult {
    pub success: bool,
    pub message: String,
    pub url: String,
    pub additional_urls: Vec<String>,
    /// Rendered deployment path, empty for the root.
    pub path: String,
    pub files_deployed: usize,
    pub files_removed: usize,
    /// Paths removed by cleanup (would-be removals in a dry run).
    pub removed_paths: Vec<String>,
    pub backup: Option<BackupRef>,
    pub warnings: Vec<Warning>,
    pub commit: Option<CommitId>,
    pub push_attempts: u32,
    pub no_changes: bool,
    pub dry_run: bool,
    pub rolled_back: bool,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}

impl DeploymentResult {
    pub fn backup_ref(&self) -> Option<&str> {
        self.backup.as_ref().map(|b| b.name.as_str())
    }
}

/// URL of the deployment directory, always ending in `/`.
pub fn deployment_url(base_url: &str, target: &DeploymentPath) -> String {
    let base = base_url.trim_end_matches('/');
    if target.is_root() {
        format!("{base}/")
    } else {
        format!("{base}/{target}/")
    }
}

/// URLs of each deployed artifact other than the index page.
pub fn artifact_urls(deployment_url: &str, artifacts: &Artifacts) -> Vec<String> {
    artifacts
        .paths()
        .filter(|p| *p != "index.html")
        .map(|p| format!("{deployment_url}{p}"))
        .collect()
}
