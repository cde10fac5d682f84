//! Typed primary keys for ledger rows.

/// A row with a stable, typed primary key.
///
/// Every ledger row is an entity: two rows with the same id are the same row,
/// whatever their column values.
pub trait Entity {
    type Id: Copy + Eq + Ord + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> Self::Id;
}
