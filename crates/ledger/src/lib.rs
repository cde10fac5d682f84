//! Nursery ledger: the base tables and their transactional store.
//!
//! The ledger owns rows and referential integrity. It knows nothing about
//! derived-field rules; those live in `verdant-engine` and talk to the ledger
//! only through `LedgerStore` / `LedgerTx`.

pub mod access;
pub mod model;
pub mod store;

pub use access::check_client_write;
pub use model::{
    Client, Employee, Inventory, Product, Purchase, Row, RowKey, Table, Vivarium, Work, Zone,
    bonus_for_purchases,
};
pub use store::{
    Deleted, InMemoryLedger, InMemoryTx, LedgerStore, LedgerTx, StoreError, StoreResult,
    Transaction,
};
