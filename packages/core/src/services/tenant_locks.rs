//! Per-tenant serialization of structural mutations
//!
//! A move reads the current subtree, computes new positions and writes them
//! back. Two such sequences interleaving on one tenant can lose updates or
//! leave a torn subtree. `TenantLocks` hands out one async mutex per tenant so
//! a service instance runs at most one structural mutation per tenant at a time.
//! Different tenants never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Lazily created mutex per tenant id
///
/// Entries of tenants with no holder or waiter are dropped on the next
/// acquisition, so the map stays bounded by the tenants currently mutating.
#[derive(Debug, Default)]
pub struct TenantLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl TenantLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, tenant_id: &str) -> Arc<AsyncMutex<()>> {
        // Entries are inserted whole, so a poisoned map is still consistent
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Idle entries (no guard, no waiter) only hold the map's own reference
        locks.retain(|tenant, lock| tenant == tenant_id || Arc::strong_count(lock) > 1);
        locks
            .entry(tenant_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Wait for exclusive access to `tenant_id`'s tree.
    ///
    /// The guard releases the lock on drop.
    pub async fn acquire(&self, tenant_id: &str) -> OwnedMutexGuard<()> {
        self.lock_for(tenant_id).lock_owned().await
    }

    /// Number of tenants currently tracked (held, awaited, or most recently acquired)
    pub fn tracked_tenants(&self) -> usize {
        self.locks
            .lock()
            .map(|locks| locks.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_tenant_is_serialized() {
        let locks = Arc::new(TenantLocks::new());
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let in_flight = in_flight.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("t1").await;
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(locks.tracked_tenants(), 1);
    }

    #[tokio::test]
    async fn test_idle_tenants_are_pruned() {
        let locks = TenantLocks::new();
        let held = locks.acquire("busy").await;

        for tenant in ["t1", "t2", "t3"] {
            drop(locks.acquire(tenant).await);
        }
        // "busy" is still held, "t3" was just acquired, t1 and t2 are gone
        assert_eq!(locks.tracked_tenants(), 2);

        drop(held);
        drop(locks.acquire("t4").await);
        assert_eq!(locks.tracked_tenants(), 1);
    }

    #[tokio::test]
    async fn test_different_tenants_do_not_block() {
        let locks = TenantLocks::new();
        let _a = locks.acquire("t1").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire("t2")).await;
        assert!(b.is_ok());
        assert_eq!(locks.tracked_tenants(), 2);
    }
}
