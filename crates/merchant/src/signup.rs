//! Merchant sign-up and review workflow.
//!
//! ```text
//! Draft ──submit──▶ Awaiting ──approve──▶ Pass   (merchant + enterprise profile created)
//!                      │
//!                      └──reject(remark)──▶ Reject ──reject(remark)──▶ Reject
//! ```
//!
//! Pass is terminal: a second approval would create a second merchant.
//! Submission and review for one member are serialized, and a member owns at
//! most one merchant.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use vendorledger_core::{
    DomainError, DomainResult, Entity, FieldProblem, MemberId, MerchantId, SignUpField, SignUpId,
};

use crate::id_card::is_valid_resident_id;
use crate::merchant::{Merchant, MerchantAggregate};
use crate::ports::MerchantDeps;
use crate::profile::EnterpriseProfile;

/// Review state shared by applications, enterprise profiles and wholesalers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    Draft,
    Awaiting,
    Pass,
    Reject,
}

impl core::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ReviewStatus::Draft => f.write_str("draft"),
            ReviewStatus::Awaiting => f.write_str("awaiting"),
            ReviewStatus::Pass => f.write_str("pass"),
            ReviewStatus::Reject => f.write_str("reject"),
        }
    }
}

/// A member's application to become a merchant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantSignUp {
    /// Set once persisted; resubmitting a draft keeps its id.
    pub id: Option<SignUpId>,
    pub member_id: Option<MemberId>,
    pub mch_name: String,
    pub province: i32,
    pub city: i32,
    pub district: i32,
    pub address: String,
    pub company_name: String,
    /// Business registration number.
    pub company_no: String,
    pub phone: String,
    /// Legal person.
    pub person_name: String,
    pub person_id: String,
    pub person_image: String,
    pub company_image: String,
    pub auth_doc: String,
    pub reviewed: ReviewStatus,
    pub remark: String,
    pub submit_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
}

impl Entity for MerchantSignUp {
    type Id = SignUpId;

    fn entity_id(&self) -> Option<SignUpId> {
        self.id
    }
}

fn require(value: &str, field: SignUpField) -> DomainResult<()> {
    if value.trim().is_empty() {
        Err(DomainError::missing(field))
    } else {
        Ok(())
    }
}

/// Field checks that need no collaborators, in submission order
/// (member existence is checked separately, before these).
pub fn check_sign_up_fields(v: &MerchantSignUp) -> DomainResult<()> {
    require(&v.mch_name, SignUpField::MerchantName)?;
    require(&v.company_name, SignUpField::CompanyName)?;
    require(&v.company_no, SignUpField::CompanyNo)?;
    require(&v.address, SignUpField::Address)?;
    require(&v.person_name, SignUpField::PersonName)?;
    require(&v.person_id, SignUpField::PersonId)?;
    if !is_valid_resident_id(&v.person_id) {
        return Err(DomainError::validation(
            SignUpField::PersonId,
            FieldProblem::Malformed,
        ));
    }
    require(&v.company_image, SignUpField::CompanyImage)?;
    require(&v.person_image, SignUpField::PersonImage)?;
    Ok(())
}

/// Review decision for an application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Reject { remark: String },
}

impl ReviewDecision {
    pub fn from_flag(pass: bool, remark: &str) -> Self {
        if pass {
            Self::Approve
        } else {
            Self::Reject {
                remark: remark.to_string(),
            }
        }
    }
}

/// Onboarding entry point: sign-up submission, review and merchant lookup.
#[derive(Debug, Clone)]
pub struct SignUpManager {
    deps: MerchantDeps,
}

impl SignUpManager {
    pub fn new(deps: MerchantDeps) -> Self {
        Self { deps }
    }

    /// Issue an opaque token a member uses to resume their application.
    pub fn create_sign_up_token(&self, member_id: MemberId) -> DomainResult<String> {
        self.deps.merchants.create_sign_up_token(member_id)
    }

    pub fn member_from_sign_up_token(&self, token: &str) -> DomainResult<Option<MemberId>> {
        self.deps.merchants.member_from_sign_up_token(token)
    }

    /// Delete the member's application data.
    pub fn remove_sign_up(&self, member_id: MemberId) -> DomainResult<usize> {
        self.deps.merchants.delete_sign_up_by_member(member_id)
    }

    pub fn sign_up(&self, id: SignUpId) -> DomainResult<Option<MerchantSignUp>> {
        self.deps.merchants.get_sign_up(id)
    }

    pub fn sign_up_by_member(&self, member_id: MemberId) -> DomainResult<Option<MerchantSignUp>> {
        self.deps.merchants.get_sign_up_by_member(member_id)
    }

    pub fn merchant(&self, id: MerchantId) -> DomainResult<MerchantAggregate> {
        MerchantAggregate::load(id, self.deps.clone())
    }

    pub fn merchant_by_member(&self, member_id: MemberId) -> DomainResult<Option<MerchantAggregate>> {
        Ok(self
            .deps
            .merchants
            .get_merchant_by_member(member_id)?
            .map(|v| MerchantAggregate::new(v, self.deps.clone())))
    }

    fn check_sign_up(&self, v: &MerchantSignUp) -> DomainResult<()> {
        let member_unknown = DomainError::validation(SignUpField::Member, FieldProblem::Unknown);
        let member_id = v.member_id.ok_or_else(|| member_unknown.clone())?;
        if self.deps.members.get_member(member_id)?.is_none() {
            return Err(member_unknown);
        }
        check_sign_up_fields(v)
    }

    /// Validate and submit an application for review.
    ///
    /// A member who already owns a merchant cannot submit another application.
    #[instrument(skip_all, fields(member_id = ?v.member_id, sign_up_id = ?v.id), err)]
    pub fn commit_sign_up(&self, v: MerchantSignUp) -> DomainResult<SignUpId> {
        self.check_sign_up(&v)?;
        let member_id = v
            .member_id
            .ok_or_else(|| DomainError::validation(SignUpField::Member, FieldProblem::Unknown))?;
        self.deps
            .sign_up_locks
            .with_lock(member_id, || self.submit_locked(member_id, v))
    }

    fn submit_locked(&self, member_id: MemberId, mut v: MerchantSignUp) -> DomainResult<SignUpId> {
        if self.deps.merchants.get_merchant_by_member(member_id)?.is_some() {
            return Err(DomainError::review_state(format!(
                "member {member_id} already owns a merchant"
            )));
        }
        if let Some(id) = v.id {
            let previous = self.deps.merchants.get_sign_up(id)?;
            if previous.is_some_and(|p| p.reviewed == ReviewStatus::Pass) {
                return Err(DomainError::review_state(
                    "an approved application cannot be resubmitted",
                ));
            }
        }
        let now = Utc::now();
        v.reviewed = ReviewStatus::Awaiting;
        v.submit_time = Some(now);
        v.update_time = Some(now);
        let id = self.deps.merchants.save_sign_up(&v)?;
        info!(sign_up_id = %id, "merchant sign-up submitted");
        Ok(id)
    }

    /// Approve or reject an application.
    ///
    /// Approval creates the merchant and its enterprise profile before the
    /// application is stored as Pass; if creation fails the application keeps
    /// its previous state.
    #[instrument(skip(self), err)]
    pub fn review(&self, id: SignUpId, decision: ReviewDecision) -> DomainResult<()> {
        let member_id = self
            .deps
            .merchants
            .get_sign_up(id)?
            .ok_or(DomainError::NoSuchApplication)?
            .member_id
            .ok_or_else(|| DomainError::validation(SignUpField::Member, FieldProblem::Unknown))?;
        self.deps
            .sign_up_locks
            .with_lock(member_id, || self.review_locked(id, decision))
    }

    fn review_locked(&self, id: SignUpId, decision: ReviewDecision) -> DomainResult<()> {
        let mut v = self
            .deps
            .merchants
            .get_sign_up(id)?
            .ok_or(DomainError::NoSuchApplication)?;

        match decision {
            ReviewDecision::Approve => {
                if v.reviewed != ReviewStatus::Awaiting {
                    return Err(DomainError::review_state(format!(
                        "cannot approve an application in state {}",
                        v.reviewed
                    )));
                }
                v.reviewed = ReviewStatus::Pass;
                v.remark.clear();
                let merchant = self.create_new_merchant(&v)?;
                info!(sign_up_id = %id, merchant_id = ?merchant.id(), "merchant sign-up approved");
            }
            ReviewDecision::Reject { remark } => {
                if !matches!(v.reviewed, ReviewStatus::Awaiting | ReviewStatus::Reject) {
                    return Err(DomainError::review_state(format!(
                        "cannot reject an application in state {}",
                        v.reviewed
                    )));
                }
                if remark.trim().is_empty() {
                    return Err(DomainError::MissingRejectionRemark);
                }
                v.reviewed = ReviewStatus::Reject;
                v.remark = remark;
                info!(sign_up_id = %id, "merchant sign-up rejected");
            }
        }

        v.update_time = Some(Utc::now());
        self.deps.merchants.save_sign_up(&v).map(|_| ())
    }

    /// Promote an approved application into a merchant and its enterprise
    /// profile.
    ///
    /// A failure after the merchant is saved is returned as-is; the merchant
    /// stays persisted and a retried approval picks it up again instead of
    /// creating another one. A merchant that already has an enterprise
    /// profile is never taken over by another application.
    fn create_new_merchant(&self, v: &MerchantSignUp) -> DomainResult<MerchantAggregate> {
        let now = Utc::now();
        let existing = match v.member_id {
            Some(member_id) => self.deps.merchants.get_merchant_by_member(member_id)?,
            None => None,
        };
        let (merchant, merchant_id) = match existing {
            Some(value) => {
                let merchant = MerchantAggregate::new(value, self.deps.clone());
                let id = merchant.id().ok_or(DomainError::NoSuchMerchant)?;
                if self.deps.merchants.get_enterprise_info(id)?.is_some() {
                    return Err(DomainError::review_state(format!(
                        "merchant {id} already has an enterprise profile"
                    )));
                }
                (merchant, id)
            }
            None => {
                let value = self.merchant_from(v, now);
                let mut merchant = MerchantAggregate::new(value, self.deps.clone());
                let id = merchant.save()?;
                (merchant, id)
            }
        };

        let location = self
            .deps
            .values
            .area_names(&[v.province, v.city, v.district])
            .concat();
        let profile = EnterpriseProfile::from_sign_up(merchant_id, v, location, now);
        let profiles = merchant.profile_manager()?;
        profiles.save_enterprise_info(profile)?;
        profiles.review_enterprise_info(true, "")?;

        Ok(merchant)
    }

    fn merchant_from(&self, v: &MerchantSignUp, now: DateTime<Utc>) -> Merchant {
        let config = &self.deps.config;
        let submitted = v.submit_time.unwrap_or(now);

        Merchant {
            id: None,
            member_id: v.member_id,
            name: v.mch_name.clone(),
            self_operated: false,
            level: config.default_level,
            logo: String::new(),
            province: v.province,
            city: v.city,
            district: v.district,
            enabled: true,
            expires_at: submitted + Duration::days(config.membership_days),
            join_time: now,
            update_time: now,
            login_time: None,
            last_login_time: None,
            account: String::new(),
            password: String::new(),
        }
    }
}
