//! In-memory adapters for the merchant ports.
//!
//! Intended for tests/dev. Every store guards its maps with `RwLock`; a
//! poisoned lock surfaces as `DomainError::Persistence`.

use std::sync::PoisonError;
use std::sync::atomic::{AtomicI64, Ordering};

use vendorledger_core::{DomainError, DomainResult};

mod account_store;
mod catalog;
mod member_gateway;
mod merchant_repository;
mod value_registry;

pub use account_store::InMemoryAccountStore;
pub use catalog::InMemoryCatalog;
pub use member_gateway::InMemoryMemberGateway;
pub use merchant_repository::InMemoryMerchantRepository;
pub use value_registry::StaticValueRegistry;

pub(crate) fn poisoned<T>(_: PoisonError<T>) -> DomainError {
    DomainError::persistence("lock poisoned")
}

/// Monotonic identity sequence starting at 1.
#[derive(Debug)]
pub(crate) struct Sequence(AtomicI64);

impl Default for Sequence {
    fn default() -> Self {
        Self(AtomicI64::new(1))
    }
}

impl Sequence {
    pub(crate) fn next<T>(&self, make: impl FnOnce(i64) -> Option<T>) -> DomainResult<T> {
        let raw = self.0.fetch_add(1, Ordering::SeqCst);
        make(raw).ok_or_else(|| DomainError::persistence(format!("invalid generated id {raw}")))
    }
}
