// ABOUTME: Rollback command implementation.
// ABOUTME: Restores the target branch to an earlier commit under the deployment lock.

use super::workspace::open_workspace;
use pagepush::config::{CiContext, Config};
use pagepush::deploy::manual_rollback;
use pagepush::error::Result;
use pagepush::output::Output;
use pagepush::types::CommitId;
use tokio_util::sync::CancellationToken;

pub async fn rollback(
    config: Config,
    to: String,
    cancel: CancellationToken,
    mut output: Output,
) -> Result<()> {
    output.start_timer();

    let ci = CiContext::from_env();
    let workspace = open_workspace(&config, ci.repository.as_deref(), &cancel, true, &output)?;
    let to = CommitId::new(to.trim());

    output.progress(&format!(
        "Rolling back {}@{} to {}",
        workspace.repository,
        config.branch,
        to.short()
    ));

    let outcome = manual_rollback(
        &workspace.repo,
        &config.locker(),
        &workspace.repository.to_string(),
        &to,
        config.rollback,
        config.lock.timeout,
        &cancel,
    )
    .await?;

    output.progress(&format!(
        "  → Previous head kept as {}",
        outcome.previous.name
    ));
    output.record("rollback", &outcome);
    output.success(&format!(
        "{} now at {} (was {})",
        config.branch,
        outcome.restored.short(),
        outcome.previous.commit.short()
    ));
    Ok(())
}
