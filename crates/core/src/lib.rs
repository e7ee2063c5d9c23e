//! `vendorledger-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! typed identifiers, the `Money` value object and the domain error taxonomy.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult, FieldProblem, SignUpField};
pub use id::{BalanceLogId, MemberId, MerchantId, SignUpId};
pub use value_object::{Money, ValueObject};
