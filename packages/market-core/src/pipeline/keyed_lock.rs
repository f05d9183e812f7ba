//! Per-identity-key mutual exclusion.
//!
//! Two concurrent upserts for the same `(platform, source_id)` must be
//! serialized or the later `last_seen`/price write can be lost; upserts for
//! distinct keys proceed independently. This is the explicit keyed-lock
//! abstraction the pipeline wraps around every upsert+rescore pair.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::types::listing::SourceKey;

/// A map of async mutexes, one per listing identity.
///
/// Intended to live for the duration of one ingest batch; the table grows
/// with the number of distinct keys seen and is dropped with the batch.
#[derive(Default)]
pub struct KeyedLocks {
    locks: StdMutex<HashMap<SourceKey, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for one identity, creating it on first use.
    ///
    /// The guard is owned, so it can be held across awaits inside a
    /// spawned or buffered task.
    pub async fn acquire(&self, key: &SourceKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap();
            locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of distinct keys seen so far.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::listing::Platform;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_same_key_serializes() {
        let locks = KeyedLocks::new();
        let key = SourceKey::new(Platform::Yad2, "1");

        let guard = locks.acquire(&key).await;
        let blocked = timeout(Duration::from_millis(50), locks.acquire(&key)).await;
        assert!(blocked.is_err(), "second acquire must wait for the first");

        drop(guard);
        let reacquired = timeout(Duration::from_millis(50), locks.acquire(&key)).await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn test_distinct_keys_are_independent() {
        let locks = KeyedLocks::new();
        let _held = locks.acquire(&SourceKey::new(Platform::Yad2, "1")).await;

        let other = timeout(
            Duration::from_millis(50),
            locks.acquire(&SourceKey::new(Platform::Yad2, "2")),
        )
        .await;
        assert!(other.is_ok(), "distinct keys must not contend");
        assert_eq!(locks.len(), 2);
    }
}
