use std::collections::HashMap;
use std::sync::RwLock;

use vendorledger_core::{DomainError, DomainResult, MemberId, Money};
use vendorledger_merchant::ports::ChangeKind;
use vendorledger_merchant::{MemberGateway, MemberSummary, WalletCharge};

use super::poisoned;

type ChargeFilter = Box<dyn Fn(&WalletCharge) -> bool + Send + Sync>;

/// In-memory member directory with wallets.
///
/// Records every successful charge so tests can inspect the saga's side
/// effects.
#[derive(Default)]
pub struct InMemoryMemberGateway {
    members: RwLock<HashMap<MemberId, MemberSummary>>,
    wallets: RwLock<HashMap<MemberId, Money>>,
    charges: RwLock<Vec<(MemberId, WalletCharge)>>,
    failing: RwLock<Option<ChargeFilter>>,
}

impl core::fmt::Debug for InMemoryMemberGateway {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryMemberGateway").finish_non_exhaustive()
    }
}

impl InMemoryMemberGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_member(&self, id: MemberId, name: impl Into<String>) -> DomainResult<()> {
        let summary = MemberSummary {
            id,
            name: name.into(),
        };
        self.members.write().map_err(poisoned)?.insert(id, summary);
        Ok(())
    }

    /// Wallet balance of a member (zero if never charged).
    pub fn wallet(&self, id: MemberId) -> DomainResult<Money> {
        Ok(self
            .wallets
            .read()
            .map_err(poisoned)?
            .get(&id)
            .copied()
            .unwrap_or(Money::ZERO))
    }

    pub fn charges(&self, id: MemberId) -> DomainResult<Vec<WalletCharge>> {
        Ok(self
            .charges
            .read()
            .map_err(poisoned)?
            .iter()
            .filter(|(member, _)| *member == id)
            .map(|(_, c)| c.clone())
            .collect())
    }

    /// Reject every charge matching `filter` until cleared.
    pub fn fail_charges_where(
        &self,
        filter: impl Fn(&WalletCharge) -> bool + Send + Sync + 'static,
    ) -> DomainResult<()> {
        *self.failing.write().map_err(poisoned)? = Some(Box::new(filter));
        Ok(())
    }

    pub fn clear_failures(&self) -> DomainResult<()> {
        *self.failing.write().map_err(poisoned)? = None;
        Ok(())
    }
}

impl MemberGateway for InMemoryMemberGateway {
    fn get_member(&self, id: MemberId) -> DomainResult<Option<MemberSummary>> {
        Ok(self.members.read().map_err(poisoned)?.get(&id).cloned())
    }

    fn charge(&self, member_id: MemberId, charge: &WalletCharge) -> DomainResult<()> {
        if !charge.amount.is_positive() {
            return Err(DomainError::InvalidAmount);
        }
        if self
            .failing
            .read()
            .map_err(poisoned)?
            .as_ref()
            .is_some_and(|reject| reject(charge))
        {
            return Err(DomainError::persistence(format!(
                "wallet service rejected charge '{}'",
                charge.title
            )));
        }
        if !self.members.read().map_err(poisoned)?.contains_key(&member_id) {
            return Err(DomainError::NoSuchMember);
        }

        let mut wallets = self.wallets.write().map_err(poisoned)?;
        let wallet = wallets.entry(member_id).or_insert(Money::ZERO);
        match charge.kind {
            ChangeKind::WalletAdd => *wallet += charge.amount,
            ChangeKind::WalletDeduct => *wallet -= charge.amount,
        }
        self.charges
            .write()
            .map_err(poisoned)?
            .push((member_id, charge.clone()));
        Ok(())
    }
}
