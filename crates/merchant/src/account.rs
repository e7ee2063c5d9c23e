//! Merchant account ledger: settlement, transfer to member wallet and bonus.
//!
//! Every balance change is recorded as an append-only `BalanceLog` entry and
//! committed together with the account snapshot in one `AccountStore::commit`.
//! Operations on one merchant are serialized through `MerchantLocks`, and the
//! account is re-read inside the lock, so concurrent settlements never lose an
//! update.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use vendorledger_core::{
    BalanceLogId, DomainError, DomainResult, Entity, ExpectedVersion, MemberId, MerchantId, Money,
    SignUpField,
};

use crate::lock::MerchantLocks;
use crate::ports::{AccountStore, MemberGateway, MerchantDeps, ValueRegistry, WalletCharge};

/// Kind of balance-affecting event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceLogKind {
    SettleOrder,
    TransferToMember,
    Present,
}

/// Entry state. Pending → Completed only.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogState {
    Pending,
    Completed,
}

/// One balance-affecting event on a merchant account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceLog {
    pub id: Option<BalanceLogId>,
    pub merchant_id: MerchantId,
    pub kind: BalanceLogKind,
    pub title: String,
    /// External reference (order number) for audit and idempotency.
    pub outer_no: Option<String>,
    /// Signed: credits are positive, debits negative.
    pub amount: Money,
    /// Fee associated with the event.
    pub csn_amount: Money,
    pub state: LogState,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

impl Entity for BalanceLog {
    type Id = BalanceLogId;

    fn entity_id(&self) -> Option<BalanceLogId> {
        self.id
    }
}

impl BalanceLog {
    fn completed(
        merchant_id: MerchantId,
        kind: BalanceLogKind,
        title: impl Into<String>,
        outer_no: Option<String>,
        amount: Money,
        csn_amount: Money,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            merchant_id,
            kind,
            title: title.into(),
            outer_no,
            amount,
            csn_amount,
            state: LogState::Completed,
            create_time: now,
            update_time: now,
        }
    }

    /// Move a pending entry to completed. Completed entries are never reopened.
    pub fn complete(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        match self.state {
            LogState::Pending => {
                self.state = LogState::Completed;
                self.update_time = at;
                Ok(())
            }
            LogState::Completed => Err(DomainError::conflict("balance log already completed")),
        }
    }
}

/// Per-merchant account snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantAccount {
    pub merchant_id: MerchantId,
    pub balance: Money,
    /// Cumulative settled sales.
    pub sales_amount: Money,
    /// Cumulative refunds reported with settlements.
    pub refund_amount: Money,
    /// Cumulative amount transferred out to the member wallet.
    pub take_amount: Money,
    /// Cumulative bonus credited.
    pub present_amount: Money,
    pub update_time: DateTime<Utc>,
    /// Bumped by the store on every commit.
    pub version: u64,
}

impl MerchantAccount {
    pub fn open(merchant_id: MerchantId, now: DateTime<Utc>) -> Self {
        Self {
            merchant_id,
            balance: Money::ZERO,
            sales_amount: Money::ZERO,
            refund_amount: Money::ZERO,
            take_amount: Money::ZERO,
            present_amount: Money::ZERO,
            update_time: now,
            version: 0,
        }
    }
}

/// A committed transfer and the rebate that followed it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub log: BalanceLog,
    pub fee_rebate: Option<Money>,
}

const TRANSFER_LOG_TITLE: &str = "transfer to member wallet";
const TRANSFER_WALLET_TITLE: &str = "merchant balance withdrawal";
const TRANSFER_REVERSAL_TITLE: &str = "reversal of merchant balance withdrawal";
const FEE_REBATE_TITLE: &str = "merchant withdrawal fee refund";

/// Ledger facade scoped to one merchant.
#[derive(Clone)]
pub struct AccountLedger {
    merchant_id: MerchantId,
    member_id: Option<MemberId>,
    store: Arc<dyn AccountStore>,
    members: Arc<dyn MemberGateway>,
    values: Arc<dyn ValueRegistry>,
    locks: Arc<MerchantLocks>,
}

impl core::fmt::Debug for AccountLedger {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AccountLedger")
            .field("merchant_id", &self.merchant_id)
            .field("member_id", &self.member_id)
            .finish_non_exhaustive()
    }
}

impl AccountLedger {
    pub fn new(merchant_id: MerchantId, member_id: Option<MemberId>, deps: &MerchantDeps) -> Self {
        Self {
            merchant_id,
            member_id,
            store: deps.accounts.clone(),
            members: deps.members.clone(),
            values: deps.values.clone(),
            locks: deps.locks.clone(),
        }
    }

    pub fn merchant_id(&self) -> MerchantId {
        self.merchant_id
    }

    /// Current account snapshot.
    pub fn account(&self) -> DomainResult<MerchantAccount> {
        self.store.get_account(self.merchant_id)
    }

    pub fn balance_log(&self, id: BalanceLogId) -> DomainResult<Option<BalanceLog>> {
        Ok(self
            .store
            .get_log(id)?
            .filter(|log| log.merchant_id == self.merchant_id))
    }

    pub fn balance_log_by_outer_no(&self, outer_no: &str) -> DomainResult<Option<BalanceLog>> {
        self.store.find_log_by_outer_no(self.merchant_id, outer_no)
    }

    fn commit(&self, mut log: BalanceLog, account: &MerchantAccount) -> DomainResult<BalanceLog> {
        let (id, _version) =
            self.store
                .commit(&log, account, ExpectedVersion::Exact(account.version))?;
        log.id = Some(id);
        Ok(log)
    }

    /// Credit the proceeds of a settled order.
    ///
    /// `order_no` is the idempotency key: settling the same order twice is
    /// rejected with `DuplicateReference` and leaves the account untouched.
    #[instrument(skip_all, fields(merchant_id = %self.merchant_id, amount = %amount), err)]
    pub fn settle_order(
        &self,
        order_no: &str,
        amount: Money,
        csn: Money,
        refund_amount: Money,
        remark: &str,
    ) -> DomainResult<BalanceLog> {
        amount.ensure_positive()?;
        if csn.is_negative() || refund_amount.is_negative() {
            return Err(DomainError::InvalidAmount);
        }
        let order_no = order_no.trim();
        if order_no.is_empty() {
            return Err(DomainError::missing(SignUpField::OrderNo));
        }

        self.locks.with_lock(self.merchant_id, || {
            if self
                .store
                .find_log_by_outer_no(self.merchant_id, order_no)?
                .is_some()
            {
                return Err(DomainError::DuplicateReference(order_no.to_string()));
            }

            let now = Utc::now();
            let mut account = self.store.get_account(self.merchant_id)?;
            account.balance += amount;
            account.sales_amount += amount;
            account.refund_amount += refund_amount;
            account.update_time = now;

            let log = BalanceLog::completed(
                self.merchant_id,
                BalanceLogKind::SettleOrder,
                remark,
                Some(order_no.to_string()),
                amount,
                csn,
                now,
            );
            let log = self.commit(log, &account)?;
            info!(order_no, balance = %account.balance, "order settled");
            Ok(log)
        })
    }

    /// Move funds from the merchant balance to the owning member's wallet.
    ///
    /// The member wallet is credited first; the entry and the debit are then
    /// committed atomically. If that commit fails the wallet credit is
    /// reversed. A fee rebate (free-withdrawal policy) is credited last; its
    /// failure is returned as `FeeRebateFailed` while the transfer itself
    /// stays committed.
    #[instrument(skip_all, fields(merchant_id = %self.merchant_id, amount = %amount), err)]
    pub fn transfer_to_member(&self, amount: Money) -> DomainResult<TransferReceipt> {
        amount.ensure_positive()?;

        let (member_id, log) = self.locks.with_lock(self.merchant_id, || {
            let mut account = self.store.get_account(self.merchant_id)?;
            if account.balance < amount || !account.balance.is_positive() {
                return Err(DomainError::InsufficientFunds);
            }
            let member_id = self.member_id.ok_or(DomainError::NoSuchMember)?;
            self.members
                .get_member(member_id)?
                .ok_or(DomainError::NoSuchMember)?;

            self.members
                .charge(member_id, &WalletCharge::credit(TRANSFER_WALLET_TITLE, amount))?;

            let now = Utc::now();
            account.balance -= amount;
            account.take_amount += amount;
            account.update_time = now;
            let log = BalanceLog::completed(
                self.merchant_id,
                BalanceLogKind::TransferToMember,
                TRANSFER_LOG_TITLE,
                None,
                -amount,
                Money::ZERO,
                now,
            );

            match self.commit(log, &account) {
                Ok(log) => {
                    info!(member_id = %member_id, balance = %account.balance, "transferred to member");
                    Ok((member_id, log))
                }
                Err(commit_err) => Err(self.compensate(member_id, amount, commit_err)),
            }
        })?;

        let fee_rebate = self.fee_rebate(amount);
        if let Some(rebate) = fee_rebate {
            self.members
                .charge(member_id, &WalletCharge::credit(FEE_REBATE_TITLE, rebate))
                .map_err(|e| {
                    warn!(member_id = %member_id, rebate = %rebate, error = %e, "fee rebate failed");
                    DomainError::FeeRebateFailed(e.to_string())
                })?;
        }

        Ok(TransferReceipt { log, fee_rebate })
    }

    /// Reverse the wallet credit after the merchant-side commit failed.
    fn compensate(&self, member_id: MemberId, amount: Money, cause: DomainError) -> DomainError {
        warn!(member_id = %member_id, error = %cause, "transfer commit failed; reversing wallet credit");
        match self
            .members
            .charge(member_id, &WalletCharge::debit(TRANSFER_REVERSAL_TITLE, amount))
        {
            Ok(()) => cause,
            Err(reversal) => {
                error!(member_id = %member_id, amount = %amount, error = %reversal, "wallet reversal failed");
                DomainError::CompensationFailed(format!("{cause}; reversal: {reversal}"))
            }
        }
    }

    fn fee_rebate(&self, amount: Money) -> Option<Money> {
        if !self.values.registry().merchant_free_withdrawal {
            return None;
        }
        let rate = self.values.fee_config().withdrawal_fee_rate;
        if rate <= rust_decimal::Decimal::ZERO {
            return None;
        }
        Some(amount.mul_rate(rate)).filter(|rebate| rebate.is_positive())
    }

    /// Credit a platform-funded bonus.
    #[instrument(skip_all, fields(merchant_id = %self.merchant_id, amount = %amount), err)]
    pub fn present(&self, amount: Money, remark: &str) -> DomainResult<BalanceLog> {
        amount.ensure_positive()?;

        self.locks.with_lock(self.merchant_id, || {
            let now = Utc::now();
            let mut account = self.store.get_account(self.merchant_id)?;
            account.balance += amount;
            account.present_amount += amount;
            account.update_time = now;

            let log = BalanceLog::completed(
                self.merchant_id,
                BalanceLogKind::Present,
                remark,
                None,
                amount,
                Money::ZERO,
                now,
            );
            let log = self.commit(log, &account)?;
            info!(balance = %account.balance, "bonus presented");
            Ok(log)
        })
    }
}
