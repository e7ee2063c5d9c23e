//! Enterprise (legal entity) profile of a merchant.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vendorledger_core::{DomainError, DomainResult, MerchantId};

use crate::ports::MerchantRepository;
use crate::signup::{MerchantSignUp, ReviewStatus};

/// Company and legal-person data backing a merchant. 1:1 with the merchant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnterpriseProfile {
    pub merchant_id: MerchantId,
    /// Company name.
    pub name: String,
    pub company_no: String,
    pub person_name: String,
    pub person_id_no: String,
    pub person_image: String,
    pub tel: String,
    pub province: i32,
    pub city: i32,
    pub district: i32,
    /// Human-readable province/city/district names.
    pub location: String,
    pub address: String,
    pub company_image: String,
    pub auth_doc: String,
    pub reviewed: ReviewStatus,
    pub review_time: Option<DateTime<Utc>>,
    pub remark: String,
    pub update_time: DateTime<Utc>,
}

impl EnterpriseProfile {
    /// Copy the legal fields of an approved application.
    pub fn from_sign_up(
        merchant_id: MerchantId,
        v: &MerchantSignUp,
        location: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            merchant_id,
            name: v.company_name.clone(),
            company_no: v.company_no.clone(),
            person_name: v.person_name.clone(),
            person_id_no: v.person_id.clone(),
            person_image: v.person_image.clone(),
            tel: v.phone.clone(),
            province: v.province,
            city: v.city,
            district: v.district,
            location,
            address: v.address.clone(),
            company_image: v.company_image.clone(),
            auth_doc: v.auth_doc.clone(),
            reviewed: v.reviewed,
            review_time: Some(now),
            remark: String::new(),
            update_time: now,
        }
    }
}

/// Profile facade scoped to one merchant.
#[derive(Clone)]
pub struct ProfileManager {
    merchant_id: MerchantId,
    repo: Arc<dyn MerchantRepository>,
}

impl ProfileManager {
    pub fn new(merchant_id: MerchantId, repo: Arc<dyn MerchantRepository>) -> Self {
        Self { merchant_id, repo }
    }

    pub fn enterprise_info(&self) -> DomainResult<Option<EnterpriseProfile>> {
        self.repo.get_enterprise_info(self.merchant_id)
    }

    /// Store the profile under this merchant, whatever id it carried.
    pub fn save_enterprise_info(&self, mut profile: EnterpriseProfile) -> DomainResult<MerchantId> {
        profile.merchant_id = self.merchant_id;
        profile.update_time = Utc::now();
        self.repo.save_enterprise_info(&profile)?;
        Ok(self.merchant_id)
    }

    /// Approve or reject the stored profile. Rejection needs a remark.
    pub fn review_enterprise_info(&self, pass: bool, remark: &str) -> DomainResult<()> {
        let mut profile = self
            .enterprise_info()?
            .ok_or(DomainError::NoSuchApplication)?;
        if pass {
            profile.reviewed = ReviewStatus::Pass;
            profile.remark.clear();
        } else {
            if remark.trim().is_empty() {
                return Err(DomainError::MissingRejectionRemark);
            }
            profile.reviewed = ReviewStatus::Reject;
            profile.remark = remark.to_string();
        }
        let now = Utc::now();
        profile.review_time = Some(now);
        profile.update_time = now;
        self.repo.save_enterprise_info(&profile)
    }
}
