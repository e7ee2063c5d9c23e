use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use uuid::Uuid;

use vendorledger_core::{DomainError, DomainResult, MemberId, MerchantId, SignUpId};
use vendorledger_merchant::{
    ApiInfo, EnterpriseProfile, MemberLevel, Merchant, MerchantRepository, MerchantSignUp,
};

use super::{Sequence, poisoned};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct KvKey {
    merchant_id: MerchantId,
    namespace: String,
    key: String,
}

/// In-memory merchant repository.
///
/// Merchant ids are handed out from 1, so the first merchant saved becomes the
/// platform's own store.
#[derive(Debug, Default)]
pub struct InMemoryMerchantRepository {
    merchant_ids: Sequence,
    sign_up_ids: Sequence,
    level_ids: Sequence,
    merchants: RwLock<HashMap<MerchantId, Merchant>>,
    hosts: RwLock<HashMap<MerchantId, String>>,
    sign_ups: RwLock<HashMap<SignUpId, MerchantSignUp>>,
    tokens: RwLock<HashMap<String, MemberId>>,
    profiles: RwLock<HashMap<MerchantId, EnterpriseProfile>>,
    api_infos: RwLock<HashMap<MerchantId, ApiInfo>>,
    levels: RwLock<HashMap<MerchantId, Vec<MemberLevel>>>,
    kv: RwLock<HashMap<KvKey, String>>,
    fail_profile_saves: AtomicBool,
    lookup_delay_ms: AtomicU64,
}

impl InMemoryMerchantRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a storefront host to a merchant.
    pub fn bind_host(&self, id: MerchantId, host: impl Into<String>) -> DomainResult<()> {
        self.hosts.write().map_err(poisoned)?.insert(id, host.into());
        Ok(())
    }

    /// Make every enterprise profile save fail until switched off.
    pub fn fail_profile_saves(&self, fail: bool) {
        self.fail_profile_saves.store(fail, Ordering::SeqCst);
    }

    /// Slow down member-to-merchant lookups, widening check-then-act windows.
    pub fn delay_member_lookups(&self, delay: Duration) {
        self.lookup_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn merchant_count(&self) -> DomainResult<usize> {
        Ok(self.merchants.read().map_err(poisoned)?.len())
    }
}

impl MerchantRepository for InMemoryMerchantRepository {
    fn save_merchant(&self, merchant: &Merchant) -> DomainResult<MerchantId> {
        let id = match merchant.id {
            Some(id) => id,
            None => self.merchant_ids.next(MerchantId::new)?,
        };
        let mut stored = merchant.clone();
        stored.id = Some(id);
        self.merchants.write().map_err(poisoned)?.insert(id, stored);
        Ok(id)
    }

    fn get_merchant(&self, id: MerchantId) -> DomainResult<Option<Merchant>> {
        Ok(self.merchants.read().map_err(poisoned)?.get(&id).cloned())
    }

    fn get_merchant_by_member(&self, member_id: MemberId) -> DomainResult<Option<Merchant>> {
        let delay = self.lookup_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay));
        }
        let merchants = self.merchants.read().map_err(poisoned)?;
        Ok(merchants
            .values()
            .filter(|m| m.member_id == Some(member_id))
            .min_by_key(|m| m.id)
            .cloned())
    }

    fn major_host(&self, id: MerchantId) -> DomainResult<Option<String>> {
        Ok(self.hosts.read().map_err(poisoned)?.get(&id).cloned())
    }

    fn save_sign_up(&self, sign_up: &MerchantSignUp) -> DomainResult<SignUpId> {
        let id = match sign_up.id {
            Some(id) => id,
            None => self.sign_up_ids.next(SignUpId::new)?,
        };
        let mut stored = sign_up.clone();
        stored.id = Some(id);
        self.sign_ups.write().map_err(poisoned)?.insert(id, stored);
        Ok(id)
    }

    fn get_sign_up(&self, id: SignUpId) -> DomainResult<Option<MerchantSignUp>> {
        Ok(self.sign_ups.read().map_err(poisoned)?.get(&id).cloned())
    }

    fn get_sign_up_by_member(&self, member_id: MemberId) -> DomainResult<Option<MerchantSignUp>> {
        let sign_ups = self.sign_ups.read().map_err(poisoned)?;
        Ok(sign_ups
            .values()
            .filter(|v| v.member_id == Some(member_id))
            .max_by_key(|v| v.id)
            .cloned())
    }

    fn delete_sign_up_by_member(&self, member_id: MemberId) -> DomainResult<usize> {
        let mut sign_ups = self.sign_ups.write().map_err(poisoned)?;
        let before = sign_ups.len();
        sign_ups.retain(|_, v| v.member_id != Some(member_id));
        Ok(before - sign_ups.len())
    }

    fn create_sign_up_token(&self, member_id: MemberId) -> DomainResult<String> {
        let token = Uuid::now_v7().simple().to_string();
        self.tokens
            .write()
            .map_err(poisoned)?
            .insert(token.clone(), member_id);
        Ok(token)
    }

    fn member_from_sign_up_token(&self, token: &str) -> DomainResult<Option<MemberId>> {
        Ok(self.tokens.read().map_err(poisoned)?.get(token).copied())
    }

    fn save_enterprise_info(&self, profile: &EnterpriseProfile) -> DomainResult<()> {
        if self.fail_profile_saves.load(Ordering::SeqCst) {
            return Err(DomainError::persistence("enterprise profile store unavailable"));
        }
        self.profiles
            .write()
            .map_err(poisoned)?
            .insert(profile.merchant_id, profile.clone());
        Ok(())
    }

    fn get_enterprise_info(&self, id: MerchantId) -> DomainResult<Option<EnterpriseProfile>> {
        Ok(self.profiles.read().map_err(poisoned)?.get(&id).cloned())
    }

    fn save_api_info(&self, info: &ApiInfo) -> DomainResult<()> {
        self.api_infos
            .write()
            .map_err(poisoned)?
            .insert(info.merchant_id, info.clone());
        Ok(())
    }

    fn get_api_info(&self, id: MerchantId) -> DomainResult<Option<ApiInfo>> {
        Ok(self.api_infos.read().map_err(poisoned)?.get(&id).cloned())
    }

    fn member_levels(&self, id: MerchantId) -> DomainResult<Vec<MemberLevel>> {
        Ok(self
            .levels
            .read()
            .map_err(poisoned)?
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }

    fn save_member_level(&self, level: &MemberLevel) -> DomainResult<i64> {
        let mut levels = self.levels.write().map_err(poisoned)?;
        let list = levels.entry(level.merchant_id).or_default();
        match level.id {
            Some(id) => {
                let existing = list
                    .iter_mut()
                    .find(|l| l.id == Some(id))
                    .ok_or_else(|| DomainError::persistence(format!("no member level {id}")))?;
                *existing = level.clone();
                Ok(id)
            }
            None => {
                let id = self.level_ids.next(Some)?;
                let mut stored = level.clone();
                stored.id = Some(id);
                list.push(stored);
                Ok(id)
            }
        }
    }

    fn get_kv(&self, id: MerchantId, namespace: &str, key: &str) -> DomainResult<Option<String>> {
        let k = KvKey {
            merchant_id: id,
            namespace: namespace.to_string(),
            key: key.to_string(),
        };
        Ok(self.kv.read().map_err(poisoned)?.get(&k).cloned())
    }

    fn set_kv(&self, id: MerchantId, namespace: &str, key: &str, value: &str) -> DomainResult<()> {
        let k = KvKey {
            merchant_id: id,
            namespace: namespace.to_string(),
            key: key.to_string(),
        };
        self.kv
            .write()
            .map_err(poisoned)?
            .insert(k, value.to_string());
        Ok(())
    }
}
