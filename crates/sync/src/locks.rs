//! Per-id async mutexes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use oneflow_core::RecordId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One FIFO async mutex per record id, created on demand and dropped again
/// once nobody holds or waits for it.
#[derive(Debug, Default)]
pub(crate) struct KeyedLocks {
    inner: Mutex<HashMap<RecordId, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn acquire(&self, id: &RecordId) -> KeyedGuard<'_> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            Arc::clone(map.entry(id.clone()).or_default())
        };
        // Built before waiting so a waiter cancelled in the queue still
        // releases its map entry.
        let mut held = KeyedGuard {
            locks: self,
            id: id.clone(),
            lock,
            guard: None,
        };
        held.guard = Some(Arc::clone(&held.lock).lock_owned().await);
        held
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().map(|m| m.len()).unwrap_or(0)
    }
}

pub(crate) struct KeyedGuard<'a> {
    locks: &'a KeyedLocks,
    id: RecordId,
    lock: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyedGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut map = self.locks.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // The map and this guard hold the only references: nobody else holds
        // or waits.
        if Arc::strong_count(&self.lock) == 2 {
            map.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_id_waits_for_the_holder() {
        let locks = Arc::new(KeyedLocks::new());
        let id = RecordId::from("1");
        let first = locks.acquire(&id).await;

        let second = {
            let locks = Arc::clone(&locks);
            let id = id.clone();
            tokio::spawn(async move {
                let _g = locks.acquire(&id).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!second.is_finished());

        drop(first);
        second.await.unwrap();
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn cancelled_waiter_leaves_no_entry_behind() {
        let locks = Arc::new(KeyedLocks::new());
        let id = RecordId::from("1");
        let holder = locks.acquire(&id).await;

        let waiter = {
            let locks = Arc::clone(&locks);
            let id = id.clone();
            tokio::spawn(async move {
                let _g = locks.acquire(&id).await;
                std::future::pending::<()>().await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(holder);
        waiter.abort();
        assert!(waiter.await.unwrap_err().is_cancelled());
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn waiter_cancelled_behind_a_holder_keeps_the_holders_entry() {
        let locks = Arc::new(KeyedLocks::new());
        let id = RecordId::from("1");
        let holder = locks.acquire(&id).await;

        let waiter = {
            let locks = Arc::clone(&locks);
            let id = id.clone();
            tokio::spawn(async move {
                let _g = locks.acquire(&id).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        waiter.abort();
        let _ = waiter.await;
        assert_eq!(locks.len(), 1);

        drop(holder);
        assert_eq!(locks.len(), 0);
        let _again = locks.acquire(&id).await;
        assert_eq!(locks.len(), 1);
    }

    #[tokio::test]
    async fn different_ids_do_not_block() {
        let locks = KeyedLocks::new();
        let _a = locks.acquire(&RecordId::from("a")).await;
        let _b = locks.acquire(&RecordId::from("b")).await;
        assert_eq!(locks.len(), 2);
    }
}
