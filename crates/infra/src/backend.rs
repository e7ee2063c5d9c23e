//! Wiring of the in-memory adapters into `MerchantDeps`.

use std::sync::Arc;

use vendorledger_merchant::{
    MemberLocks, MerchantConfig, MerchantDeps, MerchantLocks, SignUpManager,
};

use crate::in_memory::{
    InMemoryAccountStore, InMemoryCatalog, InMemoryMemberGateway, InMemoryMerchantRepository,
    StaticValueRegistry,
};

/// A complete in-memory backend. Handles are public so callers can seed data
/// and inject failures.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    pub merchants: Arc<InMemoryMerchantRepository>,
    pub accounts: Arc<InMemoryAccountStore>,
    pub members: Arc<InMemoryMemberGateway>,
    pub values: Arc<StaticValueRegistry>,
    pub catalog: Arc<InMemoryCatalog>,
    pub locks: Arc<MerchantLocks>,
    pub sign_up_locks: Arc<MemberLocks>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deps(&self, config: MerchantConfig) -> MerchantDeps {
        MerchantDeps {
            merchants: self.merchants.clone(),
            accounts: self.accounts.clone(),
            members: self.members.clone(),
            values: self.values.clone(),
            wholesale: self.catalog.clone(),
            shops: self.catalog.clone(),
            users: self.catalog.clone(),
            locks: self.locks.clone(),
            sign_up_locks: self.sign_up_locks.clone(),
            config: Arc::new(config),
        }
    }

    pub fn sign_up_manager(&self, config: MerchantConfig) -> SignUpManager {
        SignUpManager::new(self.deps(config))
    }
}
