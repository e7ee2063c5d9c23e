//! Collaborator interfaces consumed by the merchant domain.
//!
//! Persistence, member wallets and platform settings live outside this crate.
//! Adapters implement these traits (see `vendorledger-infra` for in-memory
//! versions); the domain only ever talks to them through `MerchantDeps`.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use vendorledger_core::{
    BalanceLogId, DomainResult, ExpectedVersion, MemberId, MerchantId, Money, SignUpId,
};

use crate::account::{BalanceLog, MerchantAccount};
use crate::api::ApiInfo;
use crate::config::MerchantConfig;
use crate::lock::{MemberLocks, MerchantLocks};
use crate::managers::{MemberLevel, MerchantUser, Shop};
use crate::merchant::Merchant;
use crate::profile::EnterpriseProfile;
use crate::signup::MerchantSignUp;
use crate::wholesale::Wholesaler;

/// Merchant-side persistence: merchants, sign-ups and per-merchant settings.
pub trait MerchantRepository: Send + Sync {
    /// Insert (when `merchant.id` is unset) or update a merchant snapshot.
    /// Returns the merchant's identity.
    fn save_merchant(&self, merchant: &Merchant) -> DomainResult<MerchantId>;
    fn get_merchant(&self, id: MerchantId) -> DomainResult<Option<Merchant>>;
    fn get_merchant_by_member(&self, member_id: MemberId) -> DomainResult<Option<Merchant>>;
    /// Primary storefront host bound to the merchant, if one is configured.
    fn major_host(&self, id: MerchantId) -> DomainResult<Option<String>>;

    /// Insert (when `sign_up.id` is unset) or update an application.
    fn save_sign_up(&self, sign_up: &MerchantSignUp) -> DomainResult<SignUpId>;
    fn get_sign_up(&self, id: SignUpId) -> DomainResult<Option<MerchantSignUp>>;
    fn get_sign_up_by_member(&self, member_id: MemberId) -> DomainResult<Option<MerchantSignUp>>;
    /// Delete every application submitted by the member. Returns how many were removed.
    fn delete_sign_up_by_member(&self, member_id: MemberId) -> DomainResult<usize>;
    fn create_sign_up_token(&self, member_id: MemberId) -> DomainResult<String>;
    fn member_from_sign_up_token(&self, token: &str) -> DomainResult<Option<MemberId>>;

    fn save_enterprise_info(&self, profile: &EnterpriseProfile) -> DomainResult<()>;
    fn get_enterprise_info(&self, id: MerchantId) -> DomainResult<Option<EnterpriseProfile>>;

    fn save_api_info(&self, info: &ApiInfo) -> DomainResult<()>;
    fn get_api_info(&self, id: MerchantId) -> DomainResult<Option<ApiInfo>>;

    fn member_levels(&self, id: MerchantId) -> DomainResult<Vec<MemberLevel>>;
    fn save_member_level(&self, level: &MemberLevel) -> DomainResult<i64>;

    fn get_kv(&self, id: MerchantId, namespace: &str, key: &str) -> DomainResult<Option<String>>;
    fn set_kv(&self, id: MerchantId, namespace: &str, key: &str, value: &str) -> DomainResult<()>;
}

/// Ledger persistence primitive.
///
/// `commit` is the atomic unit: the entry and the account snapshot are written
/// together or not at all.
pub trait AccountStore: Send + Sync {
    /// Current account snapshot. A merchant without an account row gets a
    /// zeroed account at version 0.
    fn get_account(&self, id: MerchantId) -> DomainResult<MerchantAccount>;
    fn get_log(&self, id: BalanceLogId) -> DomainResult<Option<BalanceLog>>;
    fn find_log_by_outer_no(
        &self,
        merchant_id: MerchantId,
        outer_no: &str,
    ) -> DomainResult<Option<BalanceLog>>;
    /// Append `log` and replace the account snapshot, provided the stored
    /// account is still at `expected`. Returns the new entry id and the new
    /// account version.
    fn commit(
        &self,
        log: &BalanceLog,
        account: &MerchantAccount,
        expected: ExpectedVersion,
    ) -> DomainResult<(BalanceLogId, u64)>;
}

/// Minimal view of a member resolved through the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSummary {
    pub id: MemberId,
    pub name: String,
}

/// Which member balance a charge targets.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletKind {
    Balance,
    Wallet,
}

/// Direction of a member wallet change.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    WalletAdd,
    WalletDeduct,
}

/// Related-user marker for charges initiated by the platform itself.
pub const SYSTEM_RELATE_USER: i64 = 0;

/// One change to a member wallet. `amount` is always positive; `kind` gives
/// the direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletCharge {
    pub wallet: WalletKind,
    pub kind: ChangeKind,
    pub title: String,
    pub outer_no: String,
    pub amount: Money,
    pub relate_user: i64,
}

impl WalletCharge {
    pub fn credit(title: impl Into<String>, amount: Money) -> Self {
        Self {
            wallet: WalletKind::Wallet,
            kind: ChangeKind::WalletAdd,
            title: title.into(),
            outer_no: String::new(),
            amount,
            relate_user: SYSTEM_RELATE_USER,
        }
    }

    pub fn debit(title: impl Into<String>, amount: Money) -> Self {
        Self {
            kind: ChangeKind::WalletDeduct,
            ..Self::credit(title, amount)
        }
    }
}

/// Member lookups and wallet changes (another bounded context).
pub trait MemberGateway: Send + Sync {
    fn get_member(&self, id: MemberId) -> DomainResult<Option<MemberSummary>>;
    fn charge(&self, member_id: MemberId, charge: &WalletCharge) -> DomainResult<()>;
}

/// Platform-wide switches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    /// When set, merchants withdraw for free: the withdrawal fee is refunded
    /// to the member wallet after each transfer.
    pub merchant_free_withdrawal: bool,
}

/// Platform-wide numeric settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Fee charged on merchant withdrawals, as a fraction (`0.006` = 0.6%).
    pub withdrawal_fee_rate: Decimal,
}

/// Key-value settings and geographic name resolution.
pub trait ValueRegistry: Send + Sync {
    fn registry(&self) -> Registry;
    fn fee_config(&self) -> FeeConfig;
    /// Display names for the given area codes, in order. Unknown codes are skipped.
    fn area_names(&self, codes: &[i32]) -> Vec<String>;
}

pub trait WholesaleRepository: Send + Sync {
    fn get_wholesaler(&self, id: MerchantId) -> DomainResult<Option<Wholesaler>>;
    fn save_wholesaler(&self, wholesaler: &Wholesaler) -> DomainResult<()>;
}

pub trait ShopRepository: Send + Sync {
    fn shops(&self, id: MerchantId) -> DomainResult<Vec<Shop>>;
}

pub trait UserRepository: Send + Sync {
    fn users(&self, id: MerchantId) -> DomainResult<Vec<MerchantUser>>;
}

/// Everything a merchant aggregate and its sub-managers are built from.
///
/// Cloning is cheap (shared handles only).
#[derive(Clone)]
pub struct MerchantDeps {
    pub merchants: Arc<dyn MerchantRepository>,
    pub accounts: Arc<dyn AccountStore>,
    pub members: Arc<dyn MemberGateway>,
    pub values: Arc<dyn ValueRegistry>,
    pub wholesale: Arc<dyn WholesaleRepository>,
    pub shops: Arc<dyn ShopRepository>,
    pub users: Arc<dyn UserRepository>,
    pub locks: Arc<MerchantLocks>,
    pub sign_up_locks: Arc<MemberLocks>,
    pub config: Arc<MerchantConfig>,
}

impl core::fmt::Debug for MerchantDeps {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MerchantDeps")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
