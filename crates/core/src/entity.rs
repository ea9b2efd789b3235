//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Accounts, transactions and workspaces are entities: two records with the
/// same id are the same record even when their fields differ (e.g. before and
/// after an "update transaction" call).
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Same identity, regardless of the current field values.
    fn same_identity_as(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}
