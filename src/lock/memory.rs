// ABOUTME: In-process locker backed by a shared set of held names.
// ABOUTME: Serializes publishes between tasks of one process without touching disk.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{LockError, Locker};

/// Locker whose clones share the same set of held names.
#[derive(Debug, Clone, Default)]
pub struct MemoryLocker {
    held: Arc<Mutex<HashSet<String>>>,
}

impl MemoryLocker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self, name: &str) -> bool {
        self.held.lock().contains(name)
    }
}

#[async_trait]
impl Locker for MemoryLocker {
    async fn try_acquire(&self, name: &str) -> Result<bool, LockError> {
        Ok(self.held.lock().insert(name.to_string()))
    }

    async fn release(&self, name: &str) -> Result<(), LockError> {
        self.held.lock().remove(name);
        Ok(())
    }
}
