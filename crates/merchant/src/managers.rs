//! Thin per-merchant facades over settings, member levels, users and shops.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use vendorledger_core::{DomainResult, MerchantId};

use crate::ports::{MerchantRepository, ShopRepository, UserRepository};

/// Namespaced key-value settings of one merchant.
#[derive(Clone)]
pub struct KvManager {
    merchant_id: MerchantId,
    namespace: &'static str,
    repo: Arc<dyn MerchantRepository>,
}

impl KvManager {
    pub const MERCHANT_NAMESPACE: &'static str = "kvset";
    pub const MEMBER_NAMESPACE: &'static str = "kvset_member";

    pub fn new(
        merchant_id: MerchantId,
        namespace: &'static str,
        repo: Arc<dyn MerchantRepository>,
    ) -> Self {
        Self {
            merchant_id,
            namespace,
            repo,
        }
    }

    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    pub fn get(&self, key: &str) -> DomainResult<Option<String>> {
        self.repo.get_kv(self.merchant_id, self.namespace, key)
    }

    /// Integer setting; absent or unparsable values read as 0.
    pub fn get_int(&self, key: &str) -> DomainResult<i64> {
        Ok(self
            .get(key)?
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0))
    }

    pub fn set(&self, key: &str, value: &str) -> DomainResult<()> {
        self.repo.set_kv(self.merchant_id, self.namespace, key, value)
    }
}

/// Member tier defined by a merchant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberLevel {
    pub id: Option<i64>,
    pub merchant_id: MerchantId,
    pub name: String,
    /// Rank; higher is better.
    pub value: i32,
    pub enabled: bool,
}

#[derive(Clone)]
pub struct LevelManager {
    merchant_id: MerchantId,
    repo: Arc<dyn MerchantRepository>,
}

impl LevelManager {
    pub fn new(merchant_id: MerchantId, repo: Arc<dyn MerchantRepository>) -> Self {
        Self { merchant_id, repo }
    }

    /// Levels ordered by rank.
    pub fn levels(&self) -> DomainResult<Vec<MemberLevel>> {
        let mut levels = self.repo.member_levels(self.merchant_id)?;
        levels.sort_by_key(|l| l.value);
        Ok(levels)
    }

    pub fn save_level(&self, mut level: MemberLevel) -> DomainResult<i64> {
        level.merchant_id = self.merchant_id;
        self.repo.save_member_level(&level)
    }

    /// Lowest enabled level, assigned to new members.
    pub fn initial_level(&self) -> DomainResult<Option<MemberLevel>> {
        Ok(self.levels()?.into_iter().find(|l| l.enabled))
    }
}

/// Back-office operator of a merchant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantUser {
    pub id: i64,
    pub merchant_id: MerchantId,
    pub name: String,
    pub role: String,
    pub enabled: bool,
}

#[derive(Clone)]
pub struct UserManager {
    merchant_id: MerchantId,
    repo: Arc<dyn UserRepository>,
}

impl UserManager {
    pub fn new(merchant_id: MerchantId, repo: Arc<dyn UserRepository>) -> Self {
        Self { merchant_id, repo }
    }

    pub fn users(&self) -> DomainResult<Vec<MerchantUser>> {
        self.repo.users(self.merchant_id)
    }

    pub fn user(&self, id: i64) -> DomainResult<Option<MerchantUser>> {
        Ok(self.users()?.into_iter().find(|u| u.id == id))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShopKind {
    Online,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shop {
    pub id: i64,
    pub merchant_id: MerchantId,
    pub name: String,
    pub kind: ShopKind,
    pub enabled: bool,
}

#[derive(Clone)]
pub struct ShopManager {
    merchant_id: MerchantId,
    repo: Arc<dyn ShopRepository>,
}

impl ShopManager {
    pub fn new(merchant_id: MerchantId, repo: Arc<dyn ShopRepository>) -> Self {
        Self { merchant_id, repo }
    }

    pub fn shops(&self) -> DomainResult<Vec<Shop>> {
        self.repo.shops(self.merchant_id)
    }

    /// The merchant's online store, if it has one.
    pub fn online_shop(&self) -> DomainResult<Option<Shop>> {
        Ok(self
            .shops()?
            .into_iter()
            .find(|s| s.kind == ShopKind::Online))
    }
}
