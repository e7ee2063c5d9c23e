//! Merchant domain: onboarding, merchant aggregate and account ledger.
//!
//! Domain logic only. Persistence, member wallets and platform settings are
//! reached through the traits in [`ports`]; adapters live in `vendorledger-infra`.

pub mod account;
pub mod api;
pub mod config;
pub mod id_card;
pub mod lock;
pub mod managers;
pub mod merchant;
pub mod ports;
pub mod profile;
pub mod signup;
pub mod wholesale;

pub use account::{
    AccountLedger, BalanceLog, BalanceLogKind, LogState, MerchantAccount, TransferReceipt,
};
pub use api::{ApiInfo, ApiManager};
pub use config::MerchantConfig;
pub use lock::{KeyedLocks, MemberLocks, MerchantLocks};
pub use managers::{
    KvManager, LevelManager, MemberLevel, MerchantUser, Shop, ShopKind, ShopManager, UserManager,
};
pub use merchant::{Merchant, MerchantAggregate, MerchantStatus, MerchantUpdate};
pub use ports::{
    AccountStore, ChangeKind, FeeConfig, MemberGateway, MemberSummary, MerchantDeps,
    MerchantRepository, Registry, ShopRepository, UserRepository, ValueRegistry, WalletCharge,
    WalletKind, WholesaleRepository,
};
pub use profile::{EnterpriseProfile, ProfileManager};
pub use signup::{MerchantSignUp, ReviewDecision, ReviewStatus, SignUpManager};
pub use wholesale::Wholesaler;
