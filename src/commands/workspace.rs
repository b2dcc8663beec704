// ABOUTME: Shared setup for commands that touch the target branch.
// ABOUTME: Resolves repository and credentials, then opens a working copy in a temp dir.

use pagepush::config::Config;
use pagepush::error::Result;
use pagepush::output::Output;
use pagepush::types::RepoSlug;
use pagepush::vcs::GitRepo;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// A working copy of the target branch that lives as long as this value.
pub struct Workspace {
    pub repo: GitRepo,
    pub repository: RepoSlug,
    pub base_url: String,
    _dir: TempDir,
}

/// Open a working copy for the configured branch.
///
/// `ci_repository` is used when the config names no repository.
pub fn open_workspace(
    config: &Config,
    ci_repository: Option<&str>,
    cancel: &CancellationToken,
    full_history: bool,
    output: &Output,
) -> Result<Workspace> {
    let repository = config.repository_or(ci_repository)?;
    let token = config.resolve_token()?;
    let remote = config.remote_url(&repository, token.as_deref());

    let dir = tempfile::Builder::new().prefix("pagepush-").tempdir()?;
    output.progress(&format!(
        "  → Working copy of {}@{} in {}",
        repository,
        config.branch,
        dir.path().display()
    ));

    let mut repo = GitRepo::new(dir.path(), remote, &config.branch)
        .committer(config.committer.clone())
        .cancellation(cancel.clone());
    if let Some(token) = token {
        repo = repo.secret(token);
    }
    if full_history {
        repo = repo.full_history();
    }

    Ok(Workspace {
        base_url: config.base_url(&repository),
        repo,
        repository,
        _dir: dir,
    })
}
