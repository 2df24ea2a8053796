//! Per-conversation serialization of turns

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockTable = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// One async mutex per conversation id, created on demand and dropped once
/// nobody holds or waits on it.
#[derive(Clone, Default)]
pub struct ConversationLocks {
    table: LockTable,
}

/// Exclusive access to one conversation until dropped
pub struct ConversationGuard {
    id: String,
    table: LockTable,
    _guard: OwnedMutexGuard<()>,
}

impl ConversationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`
    pub async fn lock(&self, id: &str) -> ConversationGuard {
        let mutex = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries only the table references were left by cancelled waiters
            table.retain(|_, mutex| Arc::strong_count(mutex) > 1);
            Arc::clone(table.entry(id.to_string()).or_default())
        };
        let guard = mutex.lock_owned().await;
        ConversationGuard {
            id: id.to_string(),
            table: Arc::clone(&self.table),
            _guard: guard,
        }
    }

    /// Number of conversations with a live lock entry
    #[cfg(test)]
    pub fn tracked(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Drop for ConversationGuard {
    fn drop(&mut self) {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        // The table and this guard hold the only references: no waiters.
        if table
            .get(&self.id)
            .is_some_and(|mutex| Arc::strong_count(mutex) <= 2)
        {
            table.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_entry_removed_after_release() {
        let locks = ConversationLocks::new();
        let guard = locks.lock("a").await;
        assert_eq!(locks.tracked(), 1);
        drop(guard);
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn test_same_id_is_exclusive() {
        let locks = ConversationLocks::new();
        let guard = locks.lock("a").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.lock("a").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_entry_is_swept() {
        let locks = ConversationLocks::new();
        let guard = locks.lock("a").await;

        let mut waiter = Box::pin(locks.lock("a"));
        assert!(tokio::time::timeout(Duration::from_millis(10), &mut waiter)
            .await
            .is_err());
        drop(guard);
        drop(waiter);
        assert_eq!(locks.tracked(), 1);

        let b = locks.lock("b").await;
        assert_eq!(locks.tracked(), 1);
        drop(b);
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn test_different_ids_do_not_block() {
        let locks = ConversationLocks::new();
        let _a = locks.lock("a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.lock("b")).await;
        assert!(b.is_ok());
        assert_eq!(locks.tracked(), 2);
    }
}
