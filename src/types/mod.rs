// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Commit ids, ref names, repository slugs, and deployment paths.

mod deployment_path;
mod id;
mod repo_slug;

pub use deployment_path::{DeploymentPath, PathType, sanitize};
pub use id::{BackupRef, CommitId, Id, RefName};
pub use repo_slug::{RepoSlug, RepoSlugError};
