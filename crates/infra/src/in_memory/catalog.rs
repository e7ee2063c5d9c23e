use std::collections::HashMap;
use std::sync::RwLock;

use vendorledger_core::{DomainResult, MerchantId};
use vendorledger_merchant::{
    MerchantUser, Shop, ShopRepository, UserRepository, WholesaleRepository, Wholesaler,
};

use super::poisoned;

/// Wholesalers, shops and back-office users in one store.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    wholesalers: RwLock<HashMap<MerchantId, Wholesaler>>,
    shops: RwLock<Vec<Shop>>,
    users: RwLock<Vec<MerchantUser>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_shop(&self, shop: Shop) -> DomainResult<()> {
        self.shops.write().map_err(poisoned)?.push(shop);
        Ok(())
    }

    pub fn add_user(&self, user: MerchantUser) -> DomainResult<()> {
        self.users.write().map_err(poisoned)?.push(user);
        Ok(())
    }
}

impl WholesaleRepository for InMemoryCatalog {
    fn get_wholesaler(&self, id: MerchantId) -> DomainResult<Option<Wholesaler>> {
        Ok(self.wholesalers.read().map_err(poisoned)?.get(&id).cloned())
    }

    fn save_wholesaler(&self, wholesaler: &Wholesaler) -> DomainResult<()> {
        self.wholesalers
            .write()
            .map_err(poisoned)?
            .insert(wholesaler.merchant_id, wholesaler.clone());
        Ok(())
    }
}

impl ShopRepository for InMemoryCatalog {
    fn shops(&self, id: MerchantId) -> DomainResult<Vec<Shop>> {
        Ok(self
            .shops
            .read()
            .map_err(poisoned)?
            .iter()
            .filter(|s| s.merchant_id == id)
            .cloned()
            .collect())
    }
}

impl UserRepository for InMemoryCatalog {
    fn users(&self, id: MerchantId) -> DomainResult<Vec<MerchantUser>> {
        Ok(self
            .users
            .read()
            .map_err(poisoned)?
            .iter()
            .filter(|u| u.merchant_id == id)
            .cloned()
            .collect())
    }
}
