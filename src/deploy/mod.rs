// ABOUTME: Publish orchestration using the type state pattern.
// ABOUTME: Exports the manager, state markers, path resolution, and verification.

mod artifacts;
mod error;
mod manager;
mod options;
mod path;
mod publish;
mod rollback;
mod state;
mod verify;

pub use artifacts::{Artifacts, validate_path};
pub use error::{DeployError, DeployErrorKind, DeployFailure};
pub use manager::{
    DEFAULT_LOCK_TIMEOUT, DEFAULT_PUSH_ATTEMPTS, DEFAULT_PUSH_BACKOFF, DeploymentManager,
};
pub use options::{DeploymentOptions, DeploymentResult, artifact_urls, deployment_url};
pub use path::{MainBranches, PathResolver, build_deployment_path};
pub use publish::{Progress, Publish, TransitionResult};
pub use rollback::{RollbackOutcome, manual_rollback};
pub use state::{
    Checkpointed, Committed, LockAcquired, Pending, Prepared, Pushed, Rollbackable, RolledBack,
    Verified,
};
pub use verify::{DEFAULT_PROBE_INTERVAL, HttpVerifier, Verifier, VerifyError, verify_deployment};
