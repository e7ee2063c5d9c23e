//! Aggregate root trait and optimistic concurrency expectations.

use crate::error::{DomainError, DomainResult};

/// Aggregate root marker + minimal interface.
///
/// Aggregates in this workspace are persisted as snapshots. Identity is handed
/// out by the repository the first time the aggregate is saved and never
/// changes afterwards.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier (`None` until first persist).
    fn aggregate_id(&self) -> Option<Self::Id>;

    /// Returns the identifier or `not_found` if the aggregate was never saved.
    fn require_id(&self, not_found: DomainError) -> DomainResult<Self::Id> {
        self.aggregate_id().ok_or(not_found)
    }
}

/// Optimistic concurrency expectation for a versioned snapshot.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking (first write, migrations, etc.).
    Any,
    /// Require the stored snapshot to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}
