// ABOUTME: Publish state marker types for the type state pattern.
// ABOUTME: States carry the data that must exist once they are reached.

use crate::types::{BackupRef, CommitId};

/// Not started: target resolved, lock not yet held.
/// Available actions: `locked()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Pending;

/// Lock held, working copy not yet prepared.
/// Available actions: `checkpoint()`
#[derive(Debug, Clone, Copy, Default)]
pub struct LockAcquired;

/// Working copy ready and a rollback point recorded.
/// Available actions: `prepare()`, `rollback()`
#[derive(Debug, Clone)]
pub struct Checkpointed {
    /// `None` in a dry run, where nothing is pushed.
    pub(crate) backup: Option<BackupRef>,
    pub(crate) base: CommitId,
}

/// Artifacts written and stale files cleaned up.
/// Available actions: `commit()`, `rollback()`
#[derive(Debug, Clone)]
pub struct Prepared {
    pub(crate) backup: Option<BackupRef>,
    pub(crate) base: CommitId,
}

/// Changes committed locally.
/// Available actions: `push()`, `rollback()`
#[derive(Debug, Clone)]
pub struct Committed {
    pub(crate) backup: Option<BackupRef>,
    pub(crate) commit: CommitId,
    pub(crate) changed: bool,
}

/// Commit is on the remote (or the push was skipped).
/// Available actions: `verify()`
#[derive(Debug, Clone)]
pub struct Pushed {
    pub(crate) commit: CommitId,
}

/// Post-publish checks done; failures were recorded as warnings.
/// Available actions: `finish()`
#[derive(Debug, Clone)]
pub struct Verified {
    pub(crate) commit: CommitId,
}

/// Remote restored to the backup after a failure.
/// Available actions: `finish()`
#[derive(Debug, Clone, Copy, Default)]
pub struct RolledBack;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Checkpointed {}
    impl Sealed for super::Prepared {}
    impl Sealed for super::Committed {}
}

/// States from which a failed publish can be rolled back.
pub trait Rollbackable: sealed::Sealed {
    fn backup(&self) -> Option<&BackupRef>;

    /// Commit this run may have pushed, if any.
    fn attempted(&self) -> Option<&CommitId> {
        None
    }
}

impl Rollbackable for Checkpointed {
    fn backup(&self) -> Option<&BackupRef> {
        self.backup.as_ref()
    }
}

impl Rollbackable for Prepared {
    fn backup(&self) -> Option<&BackupRef> {
        self.backup.as_ref()
    }
}

impl Rollbackable for Committed {
    fn backup(&self) -> Option<&BackupRef> {
        self.backup.as_ref()
    }

    fn attempted(&self) -> Option<&CommitId> {
        self.changed.then_some(&self.commit)
    }
}
