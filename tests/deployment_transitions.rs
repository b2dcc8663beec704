// ABOUTME: Tests for publish state transitions.
// ABOUTME: Drives the type state machine step by step against the fake VCS.

mod support;

use std::time::Duration;

use pagepush::cleanup::CleanupEngine;
use pagepush::deploy::{
    Artifacts, Checkpointed, Committed, DeployError, DeploymentOptions, LockAcquired, Pending,
    Prepared, Publish, Pushed, RolledBack, Verified,
};
use pagepush::retry::RetryPolicy;
use pagepush::types::DeploymentPath;
use pagepush::vcs::{RollbackMode, VcsError, VcsOps};
use support::fake_vcs::FakeVcs;
use tokio_util::sync::CancellationToken;

// =============================================================================
// Transition Type Signature Tests
// =============================================================================

/// The happy path and the rollback edges type-check with the expected states.
#[test]
fn transition_type_signatures_compile() {
    #[allow(dead_code)]
    async fn check_signatures(publish: Publish<'_, Pending>, policy: &RetryPolicy) {
        let p1: Publish<'_, LockAcquired> = publish.locked();
        let p2: Result<Publish<'_, Checkpointed>, (Publish<'_, LockAcquired>, DeployError)> =
            p1.checkpoint().await;
        let p3: Result<Publish<'_, Prepared>, (Publish<'_, Checkpointed>, DeployError)> =
            p2.ok().unwrap().prepare().await;
        let p4: Result<Publish<'_, Committed>, (Publish<'_, Prepared>, DeployError)> =
            p3.ok().unwrap().commit().await;
        let p5: Result<Publish<'_, Pushed>, (Publish<'_, Committed>, DeployError)> =
            p4.ok().unwrap().push(policy).await;
        let p6: Publish<'_, Verified> = p5.ok().unwrap().verify(None, "").await;
        let _ = p6.finish();
    }

    #[allow(dead_code)]
    async fn check_rollback(
        committed: Publish<'_, Committed>,
    ) -> Result<Publish<'_, RolledBack>, (Publish<'_, Committed>, VcsError)> {
        committed.rollback(RollbackMode::Lease).await
    }
}

fn site() -> Artifacts {
    Artifacts::new()
        .with("index.html", "<h1>v2</h1>")
        .unwrap()
        .with("app.js", "run()")
        .unwrap()
}

fn policy() -> RetryPolicy {
    RetryPolicy::linear(2, Duration::from_millis(1))
}

// =============================================================================
// Step-by-step behaviour
// =============================================================================

#[tokio::test]
async fn checkpoint_records_backup_of_base() {
    support::init_tracing();
    let vcs = FakeVcs::with_files(&[("index.html", "v1")]);
    let base = vcs.remote().unwrap();
    let cleaner = CleanupEngine::default();
    let options = DeploymentOptions::new("acme/site", site());
    let cancel = CancellationToken::new();

    let publish = Publish::new(&vcs, &cleaner, &options, DeploymentPath::pr("3"), &cancel)
        .locked()
        .checkpoint()
        .await
        .ok()
        .unwrap();

    let backup = publish.progress().backup.clone().unwrap();
    assert_eq!(backup.commit, base);
    assert!(!publish.progress().created_branch);
}

#[tokio::test]
async fn dry_run_checkpoint_takes_no_backup() {
    let vcs = FakeVcs::with_files(&[("index.html", "v1")]);
    let cleaner = CleanupEngine::default();
    let options = DeploymentOptions {
        dry_run: true,
        ..DeploymentOptions::new("acme/site", site())
    };
    let cancel = CancellationToken::new();

    let publish = Publish::new(&vcs, &cleaner, &options, DeploymentPath::root(), &cancel)
        .locked()
        .checkpoint()
        .await
        .ok()
        .unwrap();

    assert!(publish.progress().backup.is_none());
    assert!(vcs.state.lock().backups.is_empty());
}

#[tokio::test]
async fn prepare_writes_under_target_and_reports_branch_paths() {
    let vcs = FakeVcs::with_files(&[
        ("index.html", "root"),
        ("pr/3/old.txt", "stale"),
        ("pr/3/index.html", "v1"),
        ("pr/4/index.html", "other"),
    ]);
    let cleaner = CleanupEngine::default();
    let options = DeploymentOptions {
        cleanup_patterns: vec!["*.txt".to_string()],
        ..DeploymentOptions::new("acme/site", site())
    };
    let cancel = CancellationToken::new();

    let prepared = Publish::new(&vcs, &cleaner, &options, DeploymentPath::pr("3"), &cancel)
        .locked()
        .checkpoint()
        .await
        .ok()
        .unwrap()
        .prepare()
        .await
        .ok()
        .unwrap();

    let work = vcs.work_dir().to_path_buf();
    assert_eq!(std::fs::read_to_string(work.join("pr/3/index.html")).unwrap(), "<h1>v2</h1>");
    assert!(work.join("pr/3/app.js").exists());
    assert!(!work.join("pr/3/old.txt").exists());
    assert!(work.join("pr/4/index.html").exists());
    assert_eq!(prepared.progress().removed_paths, vec!["pr/3/old.txt"]);
    assert_eq!(prepared.progress().files_deployed, 2);
}

#[tokio::test]
async fn failed_prepare_hands_back_checkpoint_for_rollback() {
    let vcs = FakeVcs::with_files(&[("index.html", "v1")]);
    let cleaner = CleanupEngine::default();
    let options = DeploymentOptions {
        cleanup_patterns: vec!["**".to_string()],
        ..DeploymentOptions::new("acme/site", site())
    };
    let cancel = CancellationToken::new();

    let checkpointed = Publish::new(&vcs, &cleaner, &options, DeploymentPath::root(), &cancel)
        .locked()
        .checkpoint()
        .await
        .ok()
        .unwrap();
    let (back, err) = checkpointed.prepare().await.err().unwrap();

    assert!(matches!(err, DeployError::Cleanup(_)));
    assert!(back.progress().backup.is_some());
    let rolled = back.rollback(RollbackMode::Lease).await.ok().unwrap();
    assert!(rolled.finish().rolled_back);
}

#[tokio::test]
async fn commit_then_push_reaches_remote() {
    let vcs = FakeVcs::with_files(&[("index.html", "v1")]);
    let cleaner = CleanupEngine::default();
    let options = DeploymentOptions {
        commit_sha: "0123456789abcdef".to_string(),
        ..DeploymentOptions::new("acme/site", site())
    };
    let cancel = CancellationToken::new();

    let committed = Publish::new(&vcs, &cleaner, &options, DeploymentPath::main("main"), &cancel)
        .locked()
        .checkpoint()
        .await
        .ok()
        .unwrap()
        .prepare()
        .await
        .ok()
        .unwrap()
        .commit()
        .await
        .ok()
        .unwrap();

    assert!(!committed.progress().no_changes);
    let message = vcs.state.lock().commit_messages[0].clone();
    assert!(message.starts_with("Deploy 2 file(s) to main/main from 0123456"));

    let verified = committed.push(&policy()).await.ok().unwrap().verify(None, "").await;
    assert_eq!(vcs.remote().as_ref(), Some(verified.commit()));
    assert_eq!(verified.finish().push_attempts, 1);
}

#[tokio::test]
async fn exhausted_push_returns_committed_state() {
    let vcs = FakeVcs::with_files(&[("index.html", "v1")]).fail_pushes(5);
    let base = vcs.remote().unwrap();
    let cleaner = CleanupEngine::default();
    let options = DeploymentOptions::new("acme/site", site());
    let cancel = CancellationToken::new();

    let committed = Publish::new(&vcs, &cleaner, &options, DeploymentPath::root(), &cancel)
        .locked()
        .checkpoint()
        .await
        .ok()
        .unwrap()
        .prepare()
        .await
        .ok()
        .unwrap()
        .commit()
        .await
        .ok()
        .unwrap();

    let (committed, err) = committed.push(&policy()).await.err().unwrap();
    assert!(matches!(err, DeployError::Vcs(VcsError::PushExhausted { attempts: 2, .. })));
    assert_eq!(committed.progress().push_attempts, 2);

    let progress = committed
        .rollback(RollbackMode::Lease)
        .await
        .ok()
        .unwrap()
        .finish();
    assert!(progress.rolled_back);
    assert_eq!(vcs.remote(), Some(base));

    let rollbacks = vcs.state.lock().rollbacks.clone();
    assert_eq!(rollbacks.len(), 1);
    assert!(rollbacks[0].2.is_some(), "committed state reports its commit");
}

#[tokio::test]
async fn cancellation_stops_before_next_step() {
    let vcs = FakeVcs::with_files(&[("index.html", "v1")]);
    let cleaner = CleanupEngine::default();
    let options = DeploymentOptions::new("acme/site", site());
    let cancel = CancellationToken::new();

    let checkpointed = Publish::new(&vcs, &cleaner, &options, DeploymentPath::root(), &cancel)
        .locked()
        .checkpoint()
        .await
        .ok()
        .unwrap();
    cancel.cancel();

    let (_, err) = checkpointed.prepare().await.err().unwrap();
    assert!(matches!(err, DeployError::Cancelled));
    assert_eq!(vcs.state.lock().push_calls, 0);
}
