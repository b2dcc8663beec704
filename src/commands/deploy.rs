// ABOUTME: Deploy command implementation.
// ABOUTME: Loads artifacts, builds the manager from config, and reports the result.

use std::path::PathBuf;

use super::workspace::open_workspace;
use pagepush::config::{CiContext, Config};
use pagepush::deploy::{Artifacts, DeploymentManager, DeploymentOptions, DeploymentResult, HttpVerifier};
use pagepush::error::{Error, Result};
use pagepush::output::Output;
use pagepush::types::DeploymentPath;
use tokio_util::sync::CancellationToken;

/// Everything the deploy subcommand takes from the command line.
#[derive(Debug, Default)]
pub struct DeployArgs {
    pub dir: PathBuf,
    pub event: Option<String>,
    pub branch: Option<String>,
    pub pr: Option<String>,
    pub sha: Option<String>,
    pub patterns: Vec<String>,
    pub target: Option<String>,
    pub dry_run: bool,
    pub force: bool,
}

pub async fn deploy(
    config: Config,
    args: DeployArgs,
    cancel: CancellationToken,
    mut output: Output,
) -> Result<()> {
    output.start_timer();

    let artifacts = Artifacts::from_dir(&args.dir)?;
    output.progress(&format!(
        "Publishing {} file(s) from {}",
        artifacts.len(),
        args.dir.display()
    ));

    let ci = CiContext::from_env();
    let workspace = open_workspace(&config, ci.repository.as_deref(), &cancel, false, &output)?;

    let target = args
        .target
        .as_deref()
        .map(str::parse::<DeploymentPath>)
        .transpose()
        .map_err(Error::InvalidConfig)?;

    let mut cleanup_patterns = config.cleanup.patterns.clone();
    cleanup_patterns.extend(args.patterns);

    let options = DeploymentOptions {
        branch: args.branch.unwrap_or(ci.branch),
        commit_sha: args.sha.unwrap_or(ci.sha),
        pr_number: args.pr.or(ci.pr_number),
        event_name: args.event.unwrap_or(ci.event_name),
        target,
        cleanup_patterns,
        dry_run: args.dry_run,
        force: args.force,
        verify_timeout: config.verify_timeout(),
        ..DeploymentOptions::new(workspace.repository.to_string(), artifacts)
    };

    let mut manager = DeploymentManager::new(workspace.repo, config.locker(), config.cleaner())
        .resolver(config.main_branches())
        .lock_timeout(config.lock.timeout)
        .push_policy(config.push.policy())
        .rollback_mode(config.rollback)
        .base_url(workspace.base_url);
    if let Some(verify) = &config.verify {
        manager = manager.verifier(HttpVerifier::new()?.probe_interval(verify.interval));
    }

    match manager.deploy(&options, &cancel).await {
        Ok(result) => {
            report(&result, &output);
            output.success(&result.message);
            Ok(())
        }
        Err(failure) => {
            report(&failure.result, &output);
            Err(failure.into())
        }
    }
}

fn report(result: &DeploymentResult, output: &Output) {
    for warning in &result.warnings {
        output.warning(&warning.message);
    }
    if let Some(backup) = result.backup_ref() {
        output.progress(&format!("  → Backup: {backup}"));
    }
    for path in &result.removed_paths {
        output.progress(&format!("  - {path}"));
    }
    if result.success && !result.dry_run && !result.no_changes {
        output.progress(&format!("  → {}", result.url));
    }
    output.record("result", result);
}
