// ABOUTME: In-memory VcsOps fake with a real working directory.
// ABOUTME: Models commits as tree snapshots and lets tests inject push and rollback failures.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use async_trait::async_trait;
use pagepush::types::{BackupRef, CommitId, RefName};
use pagepush::vcs::{CloneOutcome, RollbackMode, VcsError, VcsOps};
use parking_lot::Mutex;
use tempfile::TempDir;

type Tree = BTreeMap<String, Vec<u8>>;

#[derive(Debug, Default)]
pub struct FakeState {
    pub remote: Option<CommitId>,
    pub local: Option<CommitId>,
    pub trees: HashMap<CommitId, Tree>,
    /// Pushes that fail before one succeeds.
    pub push_failures: u32,
    pub push_calls: u32,
    pub forced_pushes: u32,
    pub commit_messages: Vec<String>,
    pub backups: Vec<BackupRef>,
    pub rollbacks: Vec<(BackupRef, RollbackMode, Option<CommitId>)>,
    pub fail_rollback: bool,
    /// Someone else pushes this commit right after our first push attempt.
    pub interloper: Option<CommitId>,
    next: u32,
}

pub struct FakeVcs {
    work: TempDir,
    branch: String,
    pub state: Mutex<FakeState>,
}

impl FakeVcs {
    /// A remote without the target branch.
    pub fn empty() -> Self {
        Self {
            work: tempfile::tempdir().unwrap(),
            branch: "gh-pages".to_string(),
            state: Mutex::new(FakeState::default()),
        }
    }

    /// A remote whose branch already holds `files`.
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let vcs = Self::empty();
        let tree: Tree = files
            .iter()
            .map(|(p, c)| (p.to_string(), c.as_bytes().to_vec()))
            .collect();
        {
            let mut state = vcs.state.lock();
            let id = state.next_id();
            state.trees.insert(id.clone(), tree);
            state.remote = Some(id);
        }
        vcs
    }

    pub fn fail_pushes(self, times: u32) -> Self {
        self.state.lock().push_failures = times;
        self
    }

    pub fn remote(&self) -> Option<CommitId> {
        self.state.lock().remote.clone()
    }

    /// Files of the remote branch head.
    pub fn remote_files(&self) -> Vec<String> {
        let state = self.state.lock();
        state
            .remote
            .as_ref()
            .and_then(|c| state.trees.get(c))
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn remote_file(&self, path: &str) -> Option<String> {
        let state = self.state.lock();
        let tree = state.trees.get(state.remote.as_ref()?)?;
        tree.get(path).map(|b| String::from_utf8_lossy(b).to_string())
    }

    fn snapshot(&self) -> Tree {
        let mut tree = Tree::new();
        collect(self.work.path(), self.work.path(), &mut tree);
        tree
    }

    fn materialize(&self, tree: &Tree) {
        for (path, content) in tree {
            let dest = self.work.path().join(path);
            std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
            std::fs::write(dest, content).unwrap();
        }
    }
}

impl FakeState {
    fn next_id(&mut self) -> CommitId {
        self.next += 1;
        CommitId::new(format!("{:040x}", self.next))
    }
}

fn collect(root: &Path, dir: &Path, tree: &mut Tree) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect(root, &path, tree);
        } else {
            let rel = path
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/");
            tree.insert(rel, std::fs::read(&path).unwrap());
        }
    }
}

fn failed(command: &str, output: &str) -> VcsError {
    VcsError::CommandFailed {
        command: command.to_string(),
        status: "exit status: 1".to_string(),
        output: output.to_string(),
    }
}

#[async_trait]
impl VcsOps for FakeVcs {
    fn work_dir(&self) -> &Path {
        self.work.path()
    }

    fn branch(&self) -> &str {
        &self.branch
    }

    async fn clone_or_create(&self) -> Result<CloneOutcome, VcsError> {
        let remote = self.state.lock().remote.clone();
        match remote {
            Some(head) => {
                let tree = self.state.lock().trees[&head].clone();
                self.materialize(&tree);
                self.state.lock().local = Some(head);
                Ok(CloneOutcome::Existing)
            }
            None => {
                std::fs::write(self.work.path().join(".nojekyll"), b"").unwrap();
                let tree = self.snapshot();
                let mut state = self.state.lock();
                let id = state.next_id();
                state.trees.insert(id.clone(), tree);
                state.local = Some(id);
                Ok(CloneOutcome::Created)
            }
        }
    }

    async fn commit(&self, message: &str) -> Result<CommitId, VcsError> {
        let tree = self.snapshot();
        let mut state = self.state.lock();
        let local = state.local.clone().ok_or_else(|| failed("git commit", "no HEAD"))?;
        if state.trees.get(&local) == Some(&tree) {
            return Ok(local);
        }
        let id = state.next_id();
        state.trees.insert(id.clone(), tree);
        state.local = Some(id.clone());
        state.commit_messages.push(message.to_string());
        Ok(id)
    }

    async fn push(&self, force: bool) -> Result<(), VcsError> {
        let mut state = self.state.lock();
        state.push_calls += 1;
        if force {
            state.forced_pushes += 1;
        }
        if let Some(other) = state.interloper.take() {
            state.remote = Some(other);
        }
        if state.push_failures > 0 {
            state.push_failures -= 1;
            return Err(failed("git push origin HEAD:refs/heads/gh-pages", "rejected"));
        }
        state.remote = state.local.clone();
        Ok(())
    }

    async fn create_backup(&self) -> Result<BackupRef, VcsError> {
        let mut state = self.state.lock();
        let commit = state.local.clone().ok_or_else(|| failed("git update-ref", "no HEAD"))?;
        let backup = BackupRef {
            name: RefName::new(format!("refs/pagepush/backups/{}", state.backups.len())),
            commit,
        };
        state.backups.push(backup.clone());
        Ok(backup)
    }

    async fn rollback(
        &self,
        backup: &BackupRef,
        mode: RollbackMode,
        attempted: Option<&CommitId>,
    ) -> Result<(), VcsError> {
        let mut state = self.state.lock();
        state
            .rollbacks
            .push((backup.clone(), mode, attempted.cloned()));
        if state.fail_rollback {
            return Err(failed("git push --force", "remote unreachable"));
        }
        state.local = Some(backup.commit.clone());

        match (mode, state.remote.clone()) {
            (RollbackMode::Force, _) => {
                state.remote = Some(backup.commit.clone());
                Ok(())
            }
            (RollbackMode::Lease, None) => Ok(()),
            (RollbackMode::Lease, Some(head)) if head == backup.commit => Ok(()),
            (RollbackMode::Lease, Some(head)) if attempted == Some(&head) => {
                state.remote = Some(backup.commit.clone());
                Ok(())
            }
            (RollbackMode::Lease, Some(head)) => Err(VcsError::RemoteMoved {
                expected: backup.commit.to_string(),
                actual: head.to_string(),
            }),
        }
    }

    async fn current_commit(&self) -> Result<CommitId, VcsError> {
        self.state
            .lock()
            .local
            .clone()
            .ok_or_else(|| failed("git rev-parse HEAD", "no HEAD"))
    }

    async fn remote_head(&self) -> Result<Option<CommitId>, VcsError> {
        Ok(self.state.lock().remote.clone())
    }
}
