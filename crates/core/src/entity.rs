//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Roles and permissions keep their identifier across renames; relations
/// reference the identifier, never the name.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Human-facing unique name.
    fn name(&self) -> &str;
}

/// Sort entities by name (names are unique, so the order is total).
pub fn sort_by_name<E: Entity>(items: &mut [E]) {
    items.sort_by(|a, b| a.name().cmp(b.name()));
}
