use std::collections::BTreeSet;

use thiserror::Error;

use verdant_core::{ClientId, EmployeeId, InventoryId, ProductId, WorkId, ZoneId};

use crate::model::{
    Client, Employee, Inventory, Product, Purchase, Row, RowKey, Table, Vivarium, Work, Zone,
};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("row not found: {0}")]
    NotFound(RowKey),

    #[error("duplicate row: {0}")]
    Duplicate(String),

    #[error("foreign key violation: {0}")]
    ForeignKey(String),

    #[error("aggregate out of range: {0}")]
    Overflow(String),

    #[error("ledger lock poisoned")]
    Poisoned,
}

/// Result of a delete: the removed row plus everything referential delete
/// actions removed with it, transitively, in removal order.
#[derive(Debug, Clone, PartialEq)]
pub struct Deleted {
    pub row: Row,
    pub cascaded: Vec<Row>,
}

/// Read/write view of the ledger inside one transaction.
///
/// Reads observe every write already made through the same transaction.
/// The trait is object-safe: rules receive `&dyn LedgerTx`.
///
/// Referential actions performed by `delete`:
///
/// | deleted  | effect                                                    |
/// |----------|-----------------------------------------------------------|
/// | Vivarium | cascade Zone                                              |
/// | Product  | cascade Inventory, cascade Purchase                       |
/// | Zone     | cascade Inventory, cascade Work, null `Purchase.zone`     |
/// | Employee | cascade Work, null `Purchase.employee`                    |
/// | Client   | null `Purchase.client`                                    |
pub trait LedgerTx {
    /// Point lookup by primary key.
    fn get(&self, key: RowKey) -> StoreResult<Option<Row>>;

    /// All rows of a table, in key order.
    fn scan(&self, table: Table) -> StoreResult<Vec<Row>>;

    /// The allocation row for an exact (product, zone) pair.
    fn find_inventory(&self, product: ProductId, zone: ZoneId) -> StoreResult<Option<Inventory>>;

    /// `SUM(inventory.stock_units) WHERE product = ?`, optionally skipping one row.
    fn sum_inventory_by_product(
        &self,
        product: ProductId,
        exclude: Option<InventoryId>,
    ) -> StoreResult<i64>;

    /// `SUM(inventory.stock_units) WHERE zone = ?`.
    fn sum_inventory_by_zone(&self, zone: ZoneId) -> StoreResult<i64>;

    /// `SUM(work.hours_worked) WHERE employee = ?`.
    fn sum_hours_by_employee(&self, employee: EmployeeId) -> StoreResult<i64>;

    /// Distinct zones in which the employee has at least one work row.
    fn work_zones_of_employee(&self, employee: EmployeeId) -> StoreResult<BTreeSet<ZoneId>>;

    /// Distinct employees with at least one work row in the zone.
    fn employees_in_zone(&self, zone: ZoneId) -> StoreResult<BTreeSet<EmployeeId>>;

    /// `COUNT(*) FROM purchase WHERE client = ?`.
    fn count_purchases_by_client(&self, client: ClientId) -> StoreResult<u64>;

    /// Insert a new row (unique key, foreign keys checked).
    fn insert(&mut self, row: Row) -> StoreResult<()>;

    /// Replace an existing row; returns the previous image.
    fn update(&mut self, row: Row) -> StoreResult<Row>;

    /// Remove a row and apply referential delete actions.
    fn delete(&mut self, key: RowKey) -> StoreResult<Deleted>;

    fn vivarium(&self, id: verdant_core::VivariumId) -> StoreResult<Option<Vivarium>> {
        Ok(self.get(RowKey::Vivarium(id))?.and_then(Row::into_vivarium))
    }

    fn product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.get(RowKey::Product(id))?.and_then(Row::into_product))
    }

    fn zone(&self, id: ZoneId) -> StoreResult<Option<Zone>> {
        Ok(self.get(RowKey::Zone(id))?.and_then(Row::into_zone))
    }

    fn inventory(&self, id: InventoryId) -> StoreResult<Option<Inventory>> {
        Ok(self.get(RowKey::Inventory(id))?.and_then(Row::into_inventory))
    }

    fn employee(&self, id: EmployeeId) -> StoreResult<Option<Employee>> {
        Ok(self.get(RowKey::Employee(id))?.and_then(Row::into_employee))
    }

    fn work(&self, id: WorkId) -> StoreResult<Option<Work>> {
        Ok(self.get(RowKey::Work(id))?.and_then(Row::into_work))
    }

    fn client(&self, id: ClientId) -> StoreResult<Option<Client>> {
        Ok(self.get(RowKey::Client(id))?.and_then(Row::into_client))
    }

    fn purchase(&self, id: verdant_core::PurchaseId) -> StoreResult<Option<Purchase>> {
        Ok(self.get(RowKey::Purchase(id))?.and_then(Row::into_purchase))
    }
}

/// A ledger transaction: commit publishes every write atomically; dropping it
/// without committing rolls every write back.
pub trait Transaction: LedgerTx {
    fn commit(self) -> StoreResult<()>;
}

/// Transactional ledger store.
///
/// Implementations must isolate transactions so that a recomputation's
/// read-aggregate-then-write sequence cannot lose updates to a concurrent
/// writer (serializable, or equivalent locking on the touched rows).
pub trait LedgerStore: Send + Sync {
    type Tx<'a>: Transaction
    where
        Self: 'a;

    fn begin(&self) -> StoreResult<Self::Tx<'_>>;
}
