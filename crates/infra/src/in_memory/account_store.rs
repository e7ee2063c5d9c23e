use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use tracing::debug;

use vendorledger_core::{
    BalanceLogId, DomainError, DomainResult, ExpectedVersion, MerchantId,
};
use vendorledger_merchant::{AccountStore, BalanceLog, MerchantAccount};

use super::poisoned;

#[derive(Debug, Default)]
struct Ledger {
    accounts: HashMap<MerchantId, MerchantAccount>,
    /// Append-only; an entry's id is its position + 1.
    logs: Vec<BalanceLog>,
}

/// In-memory account store. Entry and account live behind one lock, so a
/// commit is all-or-nothing.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    ledger: RwLock<Ledger>,
    failing_commits: AtomicUsize,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` commits fail before touching any state.
    pub fn fail_next_commits(&self, n: usize) {
        self.failing_commits.store(n, Ordering::SeqCst);
    }

    /// Every entry recorded for a merchant, oldest first.
    pub fn logs(&self, merchant_id: MerchantId) -> DomainResult<Vec<BalanceLog>> {
        let ledger = self.ledger.read().map_err(poisoned)?;
        Ok(ledger
            .logs
            .iter()
            .filter(|log| log.merchant_id == merchant_id)
            .cloned()
            .collect())
    }

    fn take_injected_failure(&self) -> bool {
        self.failing_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl AccountStore for InMemoryAccountStore {
    fn get_account(&self, id: MerchantId) -> DomainResult<MerchantAccount> {
        let ledger = self.ledger.read().map_err(poisoned)?;
        Ok(ledger
            .accounts
            .get(&id)
            .cloned()
            .unwrap_or_else(|| MerchantAccount::open(id, Utc::now())))
    }

    fn get_log(&self, id: BalanceLogId) -> DomainResult<Option<BalanceLog>> {
        let ledger = self.ledger.read().map_err(poisoned)?;
        let idx = usize::try_from(id.get() - 1)
            .map_err(|_| DomainError::persistence(format!("invalid balance log id {id}")))?;
        Ok(ledger.logs.get(idx).cloned())
    }

    fn find_log_by_outer_no(
        &self,
        merchant_id: MerchantId,
        outer_no: &str,
    ) -> DomainResult<Option<BalanceLog>> {
        let ledger = self.ledger.read().map_err(poisoned)?;
        Ok(ledger
            .logs
            .iter()
            .find(|log| log.merchant_id == merchant_id && log.outer_no.as_deref() == Some(outer_no))
            .cloned())
    }

    fn commit(
        &self,
        log: &BalanceLog,
        account: &MerchantAccount,
        expected: ExpectedVersion,
    ) -> DomainResult<(BalanceLogId, u64)> {
        if log.merchant_id != account.merchant_id {
            return Err(DomainError::persistence(
                "balance log and account belong to different merchants",
            ));
        }
        if self.take_injected_failure() {
            return Err(DomainError::persistence("account store unavailable"));
        }

        let mut ledger = self.ledger.write().map_err(poisoned)?;
        let current = ledger
            .accounts
            .get(&account.merchant_id)
            .map(|a| a.version)
            .unwrap_or(0);
        if let Err(e) = expected.check(current) {
            debug!(merchant_id = %account.merchant_id, current, "stale account snapshot rejected");
            return Err(e);
        }

        let raw_id = i64::try_from(ledger.logs.len() + 1)
            .map_err(|_| DomainError::persistence("balance log sequence exhausted"))?;
        let id = BalanceLogId::new(raw_id)
            .ok_or_else(|| DomainError::persistence("balance log sequence exhausted"))?;
        let version = current + 1;

        let mut stored_log = log.clone();
        stored_log.id = Some(id);
        let mut stored_account = account.clone();
        stored_account.version = version;

        ledger.logs.push(stored_log);
        ledger.accounts.insert(account.merchant_id, stored_account);
        Ok((id, version))
    }
}
