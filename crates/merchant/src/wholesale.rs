//! Wholesale enrolment record.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use vendorledger_core::MerchantId;

use crate::signup::ReviewStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wholesaler {
    pub merchant_id: MerchantId,
    /// Price multiplier applied to wholesale listings.
    pub rate: Decimal,
    pub review_state: ReviewStatus,
}

impl Wholesaler {
    pub fn new(merchant_id: MerchantId, review_state: ReviewStatus) -> Self {
        Self {
            merchant_id,
            rate: Decimal::ONE,
            review_state,
        }
    }
}
