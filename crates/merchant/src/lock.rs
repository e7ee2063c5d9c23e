//! Per-key serialization of read-modify-write operations.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use vendorledger_core::{MemberId, MerchantId};

/// In-process lock registry keyed by an identity.
///
/// Two operations on the same key never interleave; operations on different
/// keys run in parallel. An entry lives only while some caller holds or waits
/// on it, so the registry is bounded by the number of concurrent callers.
#[derive(Debug)]
pub struct KeyedLocks<K> {
    inner: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

/// Serializes ledger operations on one merchant. The account store's version
/// check still guards against writers in other processes.
pub type MerchantLocks = KeyedLocks<MerchantId>;

/// Serializes sign-up submission and review for one member.
pub type MemberLocks = KeyedLocks<MemberId>;

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Copy + Eq + Hash> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, key: K) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.entry(key).or_default().clone()
    }

    fn release(&self, key: K, handle: Arc<Mutex<()>>) {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        drop(handle);
        if map.get(&key).is_some_and(|h| Arc::strong_count(h) == 1) {
            map.remove(&key);
        }
    }

    /// Run `f` while holding the lock for `key`.
    ///
    /// A poisoned lock is recovered: it guards no data, only ordering.
    pub fn with_lock<T>(&self, key: K, f: impl FnOnce() -> T) -> T {
        let handle = self.handle(key);
        let result = {
            let _guard = handle.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        self.release(key, handle);
        result
    }

    /// Number of keys currently held or waited on.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
