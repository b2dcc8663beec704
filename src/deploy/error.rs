// ABOUTME: Error types for the publish pipeline.
// ABOUTME: DeployError with a programmatic kind, and DeployFailure carrying the partial result.

use std::path::PathBuf;
use std::time::Duration;

use crate::cleanup::CleanupError;
use crate::lock::LockError;
use crate::vcs::{VcsError, VcsErrorKind};

use super::DeploymentResult;

/// Errors that can occur during a publish.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// The deployment lock was not obtained in time.
    #[error("timed out after {waited:?} waiting for deployment lock '{name}'")]
    LockTimeout { name: String, waited: Duration },

    /// The lock backend failed outright.
    #[error("deployment lock failed: {0}")]
    Lock(#[source] LockError),

    /// A version-control operation failed.
    #[error(transparent)]
    Vcs(#[from] VcsError),

    /// Cleanup was rejected or could not read the tree.
    #[error(transparent)]
    Cleanup(#[from] CleanupError),

    /// An artifact path would escape or corrupt the deployment directory.
    #[error("invalid artifact path '{path}': {reason}")]
    ArtifactPathInvalid { path: String, reason: &'static str },

    /// Writing artifacts into the working copy failed.
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The target branch does not exist on the remote.
    #[error("branch '{branch}' does not exist on the remote")]
    BranchMissing { branch: String },

    /// A rollback target that cannot name a commit.
    #[error("invalid rollback target '{target}': expected a hex commit id")]
    InvalidTarget { target: String },

    /// The caller cancelled the run.
    #[error("deployment cancelled")]
    Cancelled,

    /// Rollback after a failure also failed; the remote may be inconsistent.
    #[error("{original}; rollback also failed: {rollback}")]
    RollbackFailed {
        original: Box<DeployError>,
        rollback: VcsError,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    LockTimeout,
    VcsCommandFailed,
    RemoteMoved,
    CleanupPatternCritical,
    WorkDirMissing,
    ArtifactPathInvalid,
    RollbackFailed,
    BranchMissing,
    InvalidTarget,
    Cancelled,
    Io,
}

impl DeployError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::LockTimeout { .. } => DeployErrorKind::LockTimeout,
            DeployError::Lock(_) | DeployError::Io { .. } => DeployErrorKind::Io,
            DeployError::Vcs(e) => match e.kind() {
                VcsErrorKind::CommandFailed => DeployErrorKind::VcsCommandFailed,
                VcsErrorKind::Cancelled => DeployErrorKind::Cancelled,
                VcsErrorKind::RemoteMoved => DeployErrorKind::RemoteMoved,
                VcsErrorKind::Io => DeployErrorKind::Io,
            },
            DeployError::Cleanup(e) => match e {
                CleanupError::CriticalPattern { .. } => DeployErrorKind::CleanupPatternCritical,
                CleanupError::WorkDirMissing(_) => DeployErrorKind::WorkDirMissing,
                CleanupError::Io { .. } => DeployErrorKind::Io,
            },
            DeployError::ArtifactPathInvalid { .. } => DeployErrorKind::ArtifactPathInvalid,
            DeployError::BranchMissing { .. } => DeployErrorKind::BranchMissing,
            DeployError::InvalidTarget { .. } => DeployErrorKind::InvalidTarget,
            DeployError::Cancelled => DeployErrorKind::Cancelled,
            DeployError::RollbackFailed { .. } => DeployErrorKind::RollbackFailed,
        }
    }

    /// Validation failures are raised before anything is written.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.kind(),
            DeployErrorKind::CleanupPatternCritical
                | DeployErrorKind::WorkDirMissing
                | DeployErrorKind::ArtifactPathInvalid
                | DeployErrorKind::InvalidTarget
        )
    }

    /// Whether the caller may simply try again later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            DeployErrorKind::LockTimeout | DeployErrorKind::RemoteMoved
        )
    }
}

impl From<LockError> for DeployError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Timeout { name, waited } => DeployError::LockTimeout { name, waited },
            LockError::Cancelled { .. } => DeployError::Cancelled,
            other => DeployError::Lock(other),
        }
    }
}

/// A failed publish: the structured error plus the result assembled so far.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct DeployFailure {
    #[source]
    pub error: DeployError,
    pub result: Box<DeploymentResult>,
}

impl DeployFailure {
    pub fn kind(&self) -> DeployErrorKind {
        self.error.kind()
    }
}
