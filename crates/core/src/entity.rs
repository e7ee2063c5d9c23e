//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Identity is assigned by the repository on first persist, so an entity that
/// has never been saved reports `None`.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier, if one has been assigned.
    fn entity_id(&self) -> Option<Self::Id>;

    /// Whether the entity has been persisted at least once.
    fn is_persisted(&self) -> bool {
        self.entity_id().is_some()
    }
}
