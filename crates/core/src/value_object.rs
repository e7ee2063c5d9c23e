//! Value objects: equality by value, not identity.

use core::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// Monetary amount in the marketplace's single currency.
///
/// Fixed-point decimal with two fractional digits. Every constructor rounds to
/// that scale (half away from zero), so cumulative sums are exact.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl ValueObject for Money {}

impl Money {
    /// Number of fractional digits carried by every amount.
    pub const SCALE: u32 = 2;

    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn from_decimal(value: Decimal) -> Self {
        Self(round(value))
    }

    /// Build from an integer count of minor units (cents).
    pub fn from_minor(minor: i64) -> Self {
        Self(Decimal::new(minor, Self::SCALE))
    }

    /// Convert a binary float coming from an outer boundary.
    ///
    /// NaN and infinities are rejected with `InvalidAmount`.
    pub fn try_from_f64(value: f64) -> DomainResult<Self> {
        if !value.is_finite() {
            return Err(DomainError::InvalidAmount);
        }
        Decimal::try_from(value)
            .map(Self::from_decimal)
            .map_err(|_| DomainError::InvalidAmount)
    }

    /// Returns `self` if strictly positive, otherwise `InvalidAmount`.
    pub fn ensure_positive(self) -> DomainResult<Self> {
        if self.is_positive() {
            Ok(self)
        } else {
            Err(DomainError::InvalidAmount)
        }
    }

    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }

    /// Multiply by a rate (e.g. a fee percentage expressed as `0.006`).
    pub fn mul_rate(self, rate: Decimal) -> Self {
        Self(round(self.0 * rate))
    }
}

fn round(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(Money::SCALE, RoundingStrategy::MidpointAwayFromZero)
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl core::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}
