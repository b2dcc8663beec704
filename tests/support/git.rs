// ABOUTME: Local bare git remotes for integration tests.
// ABOUTME: Seeds and inspects branches with the git binary, no network involved.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

/// Whether a usable `git` binary is on PATH.
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Run git with a fixed identity, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(["-c", "user.name=test", "-c", "user.email=test@example.com"])
        .args(["-c", "init.defaultBranch=main", "-c", "commit.gpgsign=false"])
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .expect("git should run");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A bare repository standing in for the hosting remote.
pub struct BareRemote {
    dir: TempDir,
}

impl BareRemote {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        git(dir.path(), &["init", "--bare", "--quiet", "."]);
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Remote URL as given to `git clone`.
    pub fn url(&self) -> String {
        self.dir.path().display().to_string()
    }

    /// Head of `branch`, `None` if the branch does not exist.
    pub fn head(&self, branch: &str) -> Option<String> {
        let output = Command::new("git")
            .args(["rev-parse", "--verify", "--quiet"])
            .arg(format!("refs/heads/{branch}"))
            .current_dir(self.path())
            .output()
            .ok()?;
        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Contents of `path` at the tip of `branch`.
    pub fn read(&self, branch: &str, path: &str) -> Option<String> {
        let output = Command::new("git")
            .arg("show")
            .arg(format!("{branch}:{path}"))
            .current_dir(self.path())
            .output()
            .ok()?;
        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Paths in the tree at the tip of `branch`, sorted.
    pub fn files(&self, branch: &str) -> Vec<String> {
        let listing = git(
            self.path(),
            &["ls-tree", "-r", "--name-only", &format!("refs/heads/{branch}")],
        );
        let mut files: Vec<String> = listing.lines().map(str::to_string).collect();
        files.sort();
        files
    }

    /// Commit `files` on top of `branch` (creating it if needed) and push.
    /// Returns the new head.
    pub fn commit_files(&self, branch: &str, files: &[(&str, &str)]) -> String {
        let work = tempfile::tempdir().unwrap();
        let dir = work.path();
        if self.head(branch).is_some() {
            git(dir, &["clone", "--quiet", "--branch", branch, &self.url(), "."]);
        } else {
            git(dir, &["init", "--quiet", "."]);
            git(dir, &["checkout", "--quiet", "--orphan", branch]);
            git(dir, &["remote", "add", "origin", &self.url()]);
        }

        for (path, content) in files {
            let dest: PathBuf = dir.join(path);
            std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
            std::fs::write(dest, content).unwrap();
        }
        git(dir, &["add", "--all"]);
        git(dir, &["commit", "--quiet", "--allow-empty", "-m", "seed"]);
        git(dir, &["push", "--quiet", "origin", &format!("HEAD:refs/heads/{branch}")]);
        git(dir, &["rev-parse", "HEAD"])
    }
}
