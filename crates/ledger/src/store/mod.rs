//! Transactional ledger store boundary.
//!
//! The rule engine treats the store as an external collaborator: it only needs
//! point lookups, foreign-key aggregates and single-row writes inside a
//! transaction. `InMemoryLedger` is the reference implementation.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::{InMemoryLedger, InMemoryTx};
pub use r#trait::{Deleted, LedgerStore, LedgerTx, StoreError, StoreResult, Transaction};
