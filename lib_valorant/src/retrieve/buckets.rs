//! # Per-Bucket Lock Table
//!
//! Maps a bucket key to the async mutex that serializes requests for that
//! bucket. The table only holds weak references: once no in-flight request
//! holds a bucket's lock, the lock is freed and the next request for that
//! bucket creates a fresh one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::Mutex as AsyncMutex;

/// The lock guarding one bucket.
pub type BucketLock = Arc<AsyncMutex<()>>;

/// Lazily populated bucket key -> lock table.
#[derive(Debug, Default)]
pub struct BucketLocks {
    locks: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

impl BucketLocks {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the live lock for `bucket`, creating it if none exists.
    pub fn lock_for(&self, bucket: &str) -> BucketLock {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(lock) = locks.get(bucket).and_then(Weak::upgrade) {
            return lock;
        }

        // Sweep entries whose locks have been dropped before adding a new one.
        locks.retain(|_, weak| weak.strong_count() > 0);

        let lock = Arc::new(AsyncMutex::new(()));
        locks.insert(bucket.to_string(), Arc::downgrade(&lock));
        lock
    }

    /// Bucket keys whose locks are still referenced.
    pub fn live_buckets(&self) -> Vec<String> {
        let locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .map(|(k, _)| k.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_bucket_shares_a_lock_while_alive() {
        let table = BucketLocks::new();
        let a = table.lock_for("/agents/{uuid}");
        let b = table.lock_for("/agents/{uuid}");
        assert!(Arc::ptr_eq(&a, &b));

        let other = table.lock_for("/buddies");
        assert!(!Arc::ptr_eq(&a, &other));
    }

    #[test]
    fn dropped_locks_are_released_and_recreated() {
        let table = BucketLocks::new();
        let first = table.lock_for("/ceremonies");
        assert_eq!(table.live_buckets(), vec!["/ceremonies".to_string()]);
        drop(first);
        assert!(table.live_buckets().is_empty());

        let _ = table.lock_for("/agents");
        let locks = table.locks.lock().unwrap();
        assert!(!locks.contains_key("/ceremonies"));
    }

    #[tokio::test]
    async fn lock_is_exclusive_per_bucket() {
        let table = BucketLocks::new();
        let lock = table.lock_for("/agents");
        let _held = lock.clone().lock_owned().await;
        assert!(table.lock_for("/agents").try_lock().is_err());
        assert!(table.lock_for("/buddies").try_lock().is_ok());
    }
}
