//! Domain error model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Application field that failed validation.
///
/// Order of declaration follows the order in which a sign-up is checked.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignUpField {
    Member,
    MerchantName,
    CompanyName,
    CompanyNo,
    Address,
    PersonName,
    PersonId,
    CompanyImage,
    PersonImage,
    /// External order reference on a settlement.
    OrderNo,
}

impl SignUpField {
    pub fn as_str(self) -> &'static str {
        match self {
            SignUpField::Member => "member",
            SignUpField::MerchantName => "merchant_name",
            SignUpField::CompanyName => "company_name",
            SignUpField::CompanyNo => "company_no",
            SignUpField::Address => "address",
            SignUpField::PersonName => "person_name",
            SignUpField::PersonId => "person_id",
            SignUpField::CompanyImage => "company_image",
            SignUpField::PersonImage => "person_image",
            SignUpField::OrderNo => "order_no",
        }
    }
}

impl core::fmt::Display for SignUpField {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a field was rejected.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldProblem {
    /// Empty or absent.
    Missing,
    /// Present but syntactically invalid.
    Malformed,
    /// Refers to something that does not exist.
    Unknown,
}

impl core::fmt::Display for FieldProblem {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FieldProblem::Missing => f.write_str("missing"),
            FieldProblem::Malformed => f.write_str("malformed"),
            FieldProblem::Unknown => f.write_str("unknown"),
        }
    }
}

/// Domain-level error.
///
/// Business failures are returned verbatim to callers at the service boundary.
/// `Persistence`, `Conflict` and the two transfer-saga failures are operational
/// and should be logged/alerted on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A sign-up (or settlement) field was missing or malformed.
    #[error("validation failed: {field} is {problem}")]
    ValidationFailed {
        field: SignUpField,
        problem: FieldProblem,
    },

    /// Amount was zero, negative or not a finite number.
    #[error("invalid amount")]
    InvalidAmount,

    #[error("insufficient balance")]
    InsufficientFunds,

    #[error("no such merchant")]
    NoSuchMerchant,

    #[error("no such member")]
    NoSuchMember,

    #[error("no such sign-up application")]
    NoSuchApplication,

    #[error("a rejection remark is required")]
    MissingRejectionRemark,

    /// Review requested from a state that does not allow it.
    #[error("invalid review state: {0}")]
    InvalidReviewState(String),

    #[error("merchant is disabled")]
    MerchantDisabled,

    #[error("merchant has expired")]
    MerchantExpired,

    #[error("wholesale is already enabled for this merchant")]
    WholesaleAlreadyEnabled,

    /// The external reference was already recorded on this ledger.
    #[error("duplicate reference: {0}")]
    DuplicateReference(String),

    /// Stale snapshot / optimistic concurrency failure.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The transfer committed but the fee rebate could not be credited.
    #[error("transfer completed but fee rebate failed: {0}")]
    FeeRebateFailed(String),

    /// The member wallet credit could not be reversed after a failed commit.
    #[error("compensation failed: {0}")]
    CompensationFailed(String),

    /// Opaque pass-through from the storage layer or an external gateway.
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl DomainError {
    pub fn validation(field: SignUpField, problem: FieldProblem) -> Self {
        Self::ValidationFailed { field, problem }
    }

    pub fn missing(field: SignUpField) -> Self {
        Self::validation(field, FieldProblem::Missing)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    pub fn review_state(msg: impl Into<String>) -> Self {
        Self::InvalidReviewState(msg.into())
    }

    /// Stable, machine-readable error code for the service boundary.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::ValidationFailed { field, problem } => match (field, problem) {
                (SignUpField::Member, _) => "err_no_such_member",
                (SignUpField::MerchantName, _) => "err_mch_missing_merchant_name",
                (SignUpField::CompanyName, _) => "err_mch_missing_company_name",
                (SignUpField::CompanyNo, _) => "err_mch_missing_company_no",
                (SignUpField::Address, _) => "err_mch_missing_address",
                (SignUpField::PersonName, _) => "err_mch_missing_person_name",
                (SignUpField::PersonId, FieldProblem::Malformed) => {
                    "err_mch_missing_person_card_id"
                }
                (SignUpField::PersonId, _) => "err_mch_missing_person_id",
                (SignUpField::CompanyImage, _) => "err_mch_missing_company_image",
                (SignUpField::PersonImage, _) => "err_mch_missing_person_image",
                (SignUpField::OrderNo, _) => "err_mch_missing_order_no",
            },
            DomainError::InvalidAmount => "err_mch_amount",
            DomainError::InsufficientFunds => "err_mch_no_more_amount",
            DomainError::NoSuchMerchant => "no_such_partner",
            DomainError::NoSuchMember => "err_no_such_member",
            DomainError::NoSuchApplication => "err_no_such_sign_up_info",
            DomainError::MissingRejectionRemark => "err_mch_require_remark",
            DomainError::InvalidReviewState(_) => "err_mch_review_state",
            DomainError::MerchantDisabled => "err_merchant_disabled",
            DomainError::MerchantExpired => "err_merchant_expires",
            DomainError::WholesaleAlreadyEnabled => "err_wholesale_enabled",
            DomainError::DuplicateReference(_) => "err_mch_duplicate_reference",
            DomainError::Conflict(_) => "err_conflict",
            DomainError::FeeRebateFailed(_) => "err_mch_fee_rebate",
            DomainError::CompensationFailed(_) => "err_mch_compensation",
            DomainError::Persistence(_) => "err_persistence",
        }
    }

    /// Whether this error signals an operational incident rather than a
    /// business rule rejection.
    pub fn is_operational(&self) -> bool {
        matches!(
            self,
            DomainError::Persistence(_)
                | DomainError::Conflict(_)
                | DomainError::FeeRebateFailed(_)
                | DomainError::CompensationFailed(_)
        )
    }
}
