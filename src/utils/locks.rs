//! Per-address transaction locks
//!
//! Two transactions from the same wallet must not race for a nonce. A sweep
//! takes its middleware and provider locks together through `lock_pair`.
//! The provider lock is released once the funding transfer is broadcast; the
//! middleware lock is held to the end. No lock is requested while another is
//! held, so sweepers sharing a registry cannot deadlock even when one
//! sweeper's provider is another's middleware wallet.

use alloy_primitives::Address;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of async mutexes keyed by wallet address
#[derive(Clone, Default)]
pub struct WalletLocks {
    locks: Arc<DashMap<Address, Arc<Mutex<()>>>>,
}

impl WalletLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, address: Address) -> Arc<Mutex<()>> {
        self.locks
            .entry(address)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Wait for exclusive use of `address`
    pub async fn lock(&self, address: Address) -> OwnedMutexGuard<()> {
        // DashMap shard guard is dropped before awaiting
        let mutex = self.entry(address);
        mutex.lock_owned().await
    }

    /// Take exclusive use of `address` if nobody holds it
    pub fn try_lock(&self, address: Address) -> Option<OwnedMutexGuard<()>> {
        self.entry(address).try_lock_owned().ok()
    }

    /// Lock two distinct addresses, always acquiring the lower one first.
    /// Guards come back in argument order.
    pub async fn lock_pair(
        &self,
        first: Address,
        second: Address,
    ) -> (OwnedMutexGuard<()>, OwnedMutexGuard<()>) {
        debug_assert_ne!(first, second);
        if first < second {
            let a = self.lock(first).await;
            let b = self.lock(second).await;
            (a, b)
        } else {
            let b = self.lock(second).await;
            let a = self.lock(first).await;
            (a, b)
        }
    }

    /// Number of addresses seen so far
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
