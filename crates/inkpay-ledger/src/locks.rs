//! Per-wallet lock registry
//!
//! Concurrent withdrawals against one wallet must not both read a stale
//! balance; every wallet mutation runs under that wallet's mutex. Locks are
//! created on first use and shared via `Arc`, so two callers asking for the
//! same owner always contend on the same mutex.

use dashmap::DashMap;
use inkpay_types::UserId;
use parking_lot::Mutex;
use std::sync::Arc;

/// Registry of one mutex per wallet id
#[derive(Default)]
pub struct WalletLocks {
    locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl WalletLocks {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Get (or create) the mutex guarding the given wallet.
    ///
    /// Callers hold the returned `Arc` and lock it for the duration of one
    /// read-check-write-persist cycle, never across unrelated I/O.
    pub fn for_wallet(&self, owner: &UserId) -> Arc<Mutex<()>> {
        self.locks
            .entry(owner.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_owner_same_mutex() {
        let locks = WalletLocks::new();
        let owner = UserId::new();
        let a = locks.for_wallet(&owner);
        let b = locks.for_wallet(&owner);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_different_owners_different_mutexes() {
        let locks = WalletLocks::new();
        let a = locks.for_wallet(&UserId::new());
        let b = locks.for_wallet(&UserId::new());
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_lock_serializes_access() {
        let locks = Arc::new(WalletLocks::new());
        let owner = UserId::new();
        let counter = Arc::new(Mutex::new(0u32));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let owner = owner.clone();
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || {
                    let mutex = locks.for_wallet(&owner);
                    let _guard = mutex.lock();
                    let mut n = counter.lock();
                    *n += 1;
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(*counter.lock(), 8);
    }
}
