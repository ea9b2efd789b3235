//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have no identity and are compared by their attribute values.
/// [`crate::Amount`] is the canonical example in this workspace: two amounts of
/// `8000000.00` are interchangeable, while two transactions with identical
/// lines are not (see [`crate::Entity`]).
///
/// Value objects are immutable; to "modify" one, build a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
