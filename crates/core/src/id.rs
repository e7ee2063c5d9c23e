//! Strongly-typed identifiers used across the domain.
//!
//! Identifiers are positive integers handed out by the repository on first
//! persist. Zero and negative values never identify a stored record.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// Identifier of a merchant aggregate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct MerchantId(i64);

/// Identifier of a marketplace member (the person behind a merchant).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct MemberId(i64);

/// Identifier of a merchant sign-up application.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct SignUpId(i64);

/// Identifier of a balance log entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct BalanceLogId(i64);

/// Error returned when parsing or constructing an identifier fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {name}: {reason}")]
pub struct InvalidId {
    pub name: &'static str,
    pub reason: String,
}

macro_rules! impl_int_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Wrap a raw identifier. Returns `None` for non-positive values.
            pub fn new(raw: i64) -> Option<Self> {
                (raw > 0).then_some(Self(raw))
            }

            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl TryFrom<i64> for $t {
            type Error = InvalidId;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                Self::new(value).ok_or_else(|| InvalidId {
                    name: $name,
                    reason: format!("{value} is not positive"),
                })
            }
        }

        impl FromStr for $t {
            type Err = InvalidId;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s.trim().parse::<i64>().map_err(|e| InvalidId {
                    name: $name,
                    reason: e.to_string(),
                })?;
                Self::try_from(raw)
            }
        }
    };
}

impl_int_newtype!(MerchantId, "MerchantId");
impl_int_newtype!(MemberId, "MemberId");
impl_int_newtype!(SignUpId, "SignUpId");
impl_int_newtype!(BalanceLogId, "BalanceLogId");

impl MerchantId {
    /// The platform's own, self-operated storefront.
    pub const ROOT: MerchantId = MerchantId(1);

    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }
}
