//! `verdant-core` — shared building blocks for the nursery ledger.
//!
//! This crate contains **pure domain** primitives (no storage, no rules).

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{
    ClientId, EmployeeId, InventoryId, ProductId, PurchaseId, TransactionId, VivariumId, WorkId,
    ZoneId,
};
