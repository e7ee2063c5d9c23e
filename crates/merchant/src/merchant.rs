//! Merchant aggregate: identity, status and the self-operated invariant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use vendorledger_core::{AggregateRoot, DomainError, DomainResult, Entity, MemberId, MerchantId};

use crate::account::AccountLedger;
use crate::api::{ApiInfo, ApiManager};
use crate::managers::{KvManager, LevelManager, ShopManager, UserManager};
use crate::ports::MerchantDeps;
use crate::profile::ProfileManager;
use crate::signup::ReviewStatus;
use crate::wholesale::Wholesaler;

/// Placeholder login written onto the root merchant. The platform store signs
/// in through the administration channel, never with merchant credentials.
pub const DISABLED_CREDENTIAL: &str = "-";

/// Persisted merchant snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Merchant {
    /// Assigned by the repository on first persist.
    pub id: Option<MerchantId>,
    pub member_id: Option<MemberId>,
    pub name: String,
    pub self_operated: bool,
    pub level: i32,
    pub logo: String,
    pub province: i32,
    pub city: i32,
    pub district: i32,
    pub enabled: bool,
    pub expires_at: DateTime<Utc>,
    pub join_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
    pub login_time: Option<DateTime<Utc>>,
    pub last_login_time: Option<DateTime<Utc>>,
    /// Login account name.
    pub account: String,
    pub password: String,
}

impl Entity for Merchant {
    type Id = MerchantId;

    fn entity_id(&self) -> Option<MerchantId> {
        self.id
    }
}

/// Outcome of a status check.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MerchantStatus {
    Ok,
    Disabled,
    Expired,
}

/// Editable merchant attributes (`set_value`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MerchantUpdate {
    pub name: String,
    pub province: i32,
    pub city: i32,
    pub district: i32,
    /// Ignored when empty.
    pub logo: String,
    /// Ignored when `None`.
    pub login_time: Option<DateTime<Utc>>,
    /// Ignored when `None`.
    pub last_login_time: Option<DateTime<Utc>>,
    pub password: String,
}

/// Enforce "self-operated iff id is root" on a snapshot.
///
/// - flagged self-operated but not the root merchant: un-flag and disable
///   (the data is inconsistent and must not trade as the platform store);
/// - the root merchant but not flagged: flag it and replace its login with
///   the disabled placeholder.
///
/// Returns whether anything changed. An unsaved merchant is never corrected.
pub fn correct_self_operated(merchant: &mut Merchant) -> bool {
    let Some(id) = merchant.id else {
        return false;
    };
    match (merchant.self_operated, id.is_root()) {
        (false, true) => {
            merchant.self_operated = true;
            merchant.account = DISABLED_CREDENTIAL.to_string();
            merchant.password = DISABLED_CREDENTIAL.to_string();
            true
        }
        (true, false) => {
            merchant.self_operated = false;
            merchant.enabled = false;
            true
        }
        _ => false,
    }
}

/// Aggregate root: Merchant.
///
/// Sub-managers are built on access from the merchant id and the injected
/// collaborators; none of them holds state of its own.
#[derive(Debug, Clone)]
pub struct MerchantAggregate {
    value: Merchant,
    deps: MerchantDeps,
}

impl AggregateRoot for MerchantAggregate {
    type Id = MerchantId;

    fn aggregate_id(&self) -> Option<MerchantId> {
        self.value.id
    }
}

impl MerchantAggregate {
    pub fn new(value: Merchant, deps: MerchantDeps) -> Self {
        Self { value, deps }
    }

    /// Load a persisted merchant.
    pub fn load(id: MerchantId, deps: MerchantDeps) -> DomainResult<Self> {
        let value = deps
            .merchants
            .get_merchant(id)?
            .ok_or(DomainError::NoSuchMerchant)?;
        Ok(Self::new(value, deps))
    }

    pub fn id(&self) -> Option<MerchantId> {
        self.value.id
    }

    pub fn value(&self) -> &Merchant {
        &self.value
    }

    pub fn member_id(&self) -> Option<MemberId> {
        self.value.member_id
    }

    fn persisted_id(&self) -> DomainResult<MerchantId> {
        self.require_id(DomainError::NoSuchMerchant)
    }

    /// Whether this is the platform's own store.
    pub fn is_self_operated(&self) -> bool {
        self.value.self_operated || self.value.id.is_some_and(MerchantId::is_root)
    }

    /// Status as of `now`. Disabled is reported before expired.
    pub fn status_at(&self, now: DateTime<Utc>) -> MerchantStatus {
        if !self.value.enabled {
            MerchantStatus::Disabled
        } else if self.value.expires_at < now {
            MerchantStatus::Expired
        } else {
            MerchantStatus::Ok
        }
    }

    pub fn status(&self) -> MerchantStatus {
        self.status_at(Utc::now())
    }

    /// Fail with `MerchantDisabled` / `MerchantExpired` unless the merchant may trade.
    pub fn ensure_active(&self, now: DateTime<Utc>) -> DomainResult<()> {
        match self.status_at(now) {
            MerchantStatus::Ok => Ok(()),
            MerchantStatus::Disabled => Err(DomainError::MerchantDisabled),
            MerchantStatus::Expired => Err(DomainError::MerchantExpired),
        }
    }

    /// Apply editable attributes. Identity, flags and expiry are untouched.
    pub fn set_value(&mut self, update: MerchantUpdate) {
        let v = &mut self.value;
        v.name = update.name;
        v.province = update.province;
        v.city = update.city;
        v.district = update.district;
        if let Some(t) = update.login_time {
            v.login_time = Some(t);
        }
        if let Some(t) = update.last_login_time {
            v.last_login_time = Some(t);
        }
        if !update.logo.is_empty() {
            v.logo = update.logo;
        }
        v.password = update.password;
        v.update_time = Utc::now();
    }

    pub fn set_enabled(&mut self, enabled: bool) -> DomainResult<()> {
        self.value.enabled = enabled;
        self.save().map(|_| ())
    }

    /// Persist the merchant.
    ///
    /// The first save assigns identity, applies the self-operated correction
    /// and provisions API credentials. Later saves re-apply the correction and
    /// write the snapshot.
    #[instrument(skip(self), fields(merchant_id = ?self.value.id), err)]
    pub fn save(&mut self) -> DomainResult<MerchantId> {
        if self.value.id.is_some() {
            self.apply_self_operated_correction();
            return self.deps.merchants.save_merchant(&self.value);
        }
        self.create()
    }

    fn apply_self_operated_correction(&mut self) -> bool {
        let changed = correct_self_operated(&mut self.value);
        if changed {
            warn!(
                merchant_id = ?self.value.id,
                self_operated = self.value.self_operated,
                enabled = self.value.enabled,
                "self-operated flag corrected"
            );
        }
        changed
    }

    fn create(&mut self) -> DomainResult<MerchantId> {
        let id = self.deps.merchants.save_merchant(&self.value)?;
        self.value.id = Some(id);

        if self.apply_self_operated_correction() {
            self.deps.merchants.save_merchant(&self.value)?;
        }

        let api = ApiInfo::generate(id, &self.deps.config.api_white_list);
        self.api_manager()?.save_api_info(api)?;

        info!(merchant_id = %id, name = %self.value.name, "merchant created");
        Ok(id)
    }

    /// Primary host of the merchant's storefront.
    pub fn major_host(&self) -> DomainResult<String> {
        let id = self.persisted_id()?;
        match self.deps.merchants.major_host(id)? {
            Some(host) if !host.is_empty() => Ok(host),
            _ => Ok(format!("{}.{}", self.value.account, self.deps.config.server_domain)),
        }
    }

    pub fn wholesaler(&self) -> DomainResult<Option<Wholesaler>> {
        let id = self.persisted_id()?;
        self.deps.wholesale.get_wholesaler(id)
    }

    /// Enrol the merchant as a wholesaler, pending review.
    pub fn enable_wholesale(&self) -> DomainResult<Wholesaler> {
        let id = self.persisted_id()?;
        if self.deps.wholesale.get_wholesaler(id)?.is_some() {
            return Err(DomainError::WholesaleAlreadyEnabled);
        }
        let wholesaler = Wholesaler::new(id, ReviewStatus::Awaiting);
        self.deps.wholesale.save_wholesaler(&wholesaler)?;
        Ok(wholesaler)
    }

    pub fn account(&self) -> DomainResult<AccountLedger> {
        Ok(AccountLedger::new(
            self.persisted_id()?,
            self.value.member_id,
            &self.deps,
        ))
    }

    pub fn profile_manager(&self) -> DomainResult<ProfileManager> {
        Ok(ProfileManager::new(
            self.persisted_id()?,
            self.deps.merchants.clone(),
        ))
    }

    pub fn api_manager(&self) -> DomainResult<ApiManager> {
        Ok(ApiManager::new(
            self.persisted_id()?,
            self.deps.merchants.clone(),
        ))
    }

    pub fn user_manager(&self) -> DomainResult<UserManager> {
        Ok(UserManager::new(self.persisted_id()?, self.deps.users.clone()))
    }

    pub fn level_manager(&self) -> DomainResult<LevelManager> {
        Ok(LevelManager::new(
            self.persisted_id()?,
            self.deps.merchants.clone(),
        ))
    }

    /// Merchant-wide settings.
    pub fn kv_manager(&self) -> DomainResult<KvManager> {
        Ok(KvManager::new(
            self.persisted_id()?,
            KvManager::MERCHANT_NAMESPACE,
            self.deps.merchants.clone(),
        ))
    }

    /// Settings that apply to the merchant's members.
    pub fn member_kv_manager(&self) -> DomainResult<KvManager> {
        Ok(KvManager::new(
            self.persisted_id()?,
            KvManager::MEMBER_NAMESPACE,
            self.deps.merchants.clone(),
        ))
    }

    pub fn shop_manager(&self) -> DomainResult<ShopManager> {
        Ok(ShopManager::new(self.persisted_id()?, self.deps.shops.clone()))
    }
}
