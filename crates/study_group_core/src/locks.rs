//! crates/study_group_core/src/locks.rs
//!
//! Async mutexes created on demand per key (a user or a task id).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

/// Held while the key is locked. Dropping it releases the key and forgets
/// the entry once nobody else holds or waits on it.
pub struct KeyedGuard<'a> {
    owner: &'a KeyedLocks,
    key: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: Uuid) -> KeyedGuard<'_> {
        let lock = self.table().entry(key).or_default().clone();
        KeyedGuard {
            owner: self,
            key,
            guard: Some(lock.lock_owned().await),
        }
    }

    /// True when no key is held or awaited.
    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<Uuid, Arc<AsyncMutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for KeyedGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut table = self.owner.table();
        if table
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            table.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn entries_are_dropped_after_release() {
        let locks = KeyedLocks::new();
        let key = Uuid::new_v4();
        {
            let _guard = locks.lock(key).await;
            assert!(!locks.is_empty());
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn same_key_is_exclusive_other_keys_are_not() {
        let locks = Arc::new(KeyedLocks::new());
        let key = Uuid::new_v4();
        let guard = locks.lock(key).await;

        let other = tokio::time::timeout(Duration::from_millis(50), locks.lock(Uuid::new_v4())).await;
        assert!(other.is_ok());
        drop(other);

        let same = tokio::time::timeout(Duration::from_millis(50), locks.lock(key)).await;
        assert!(same.is_err());

        drop(guard);
        assert!(locks.is_empty());
    }
}
