use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use verdant_core::{ClientId, EmployeeId, InventoryId, ProductId, ZoneId};

use super::r#trait::{Deleted, LedgerStore, LedgerTx, StoreError, StoreResult, Transaction};
use crate::model::{Inventory, Row, RowKey, Table};

/// Sum that fails instead of wrapping.
fn checked_sum(
    mut values: impl Iterator<Item = i64>,
    what: impl FnOnce() -> String,
) -> StoreResult<i64> {
    values
        .try_fold(0i64, |acc, v| acc.checked_add(v))
        .ok_or_else(|| StoreError::Overflow(what()))
}

#[derive(Debug, Default)]
struct Tables {
    rows: BTreeMap<Table, BTreeMap<RowKey, Row>>,
}

impl Tables {
    fn rows(&self, table: Table) -> impl Iterator<Item = &Row> + '_ {
        self.rows.get(&table).into_iter().flat_map(|t| t.values())
    }

    fn get(&self, key: &RowKey) -> Option<&Row> {
        self.rows.get(&key.table()).and_then(|t| t.get(key))
    }

    fn contains(&self, key: RowKey) -> bool {
        self.get(&key).is_some()
    }

    fn put(&mut self, row: Row) -> Option<Row> {
        let key = row.key();
        self.rows.entry(key.table()).or_default().insert(key, row)
    }

    fn take(&mut self, key: &RowKey) -> Option<Row> {
        self.rows.get_mut(&key.table()).and_then(|t| t.remove(key))
    }

    fn require(&self, key: RowKey, what: &str) -> StoreResult<()> {
        if self.contains(key) {
            Ok(())
        } else {
            Err(StoreError::ForeignKey(format!("{what} references missing {key}")))
        }
    }

    /// Foreign keys and the (product, zone) uniqueness of inventory.
    fn check_references(&self, row: &Row) -> StoreResult<()> {
        match row {
            Row::Vivarium(_) | Row::Product(_) | Row::Employee(_) | Row::Client(_) => Ok(()),
            Row::Zone(z) => self.require(RowKey::Vivarium(z.vivarium), "zone"),
            Row::Inventory(i) => {
                self.require(RowKey::Product(i.product), "inventory")?;
                self.require(RowKey::Zone(i.zone), "inventory")?;
                let clash = self
                    .rows(Table::Inventory)
                    .filter_map(Row::as_inventory)
                    .any(|other| other.id != i.id && other.product == i.product && other.zone == i.zone);
                if clash {
                    return Err(StoreError::Duplicate(format!(
                        "inventory for product {} in zone {} already exists",
                        i.product, i.zone
                    )));
                }
                Ok(())
            }
            Row::Work(w) => {
                self.require(RowKey::Employee(w.employee), "work")?;
                self.require(RowKey::Zone(w.zone), "work")
            }
            Row::Purchase(p) => {
                self.require(RowKey::Product(p.product), "purchase")?;
                if let Some(client) = p.client {
                    self.require(RowKey::Client(client), "purchase")?;
                }
                if let Some(employee) = p.employee {
                    self.require(RowKey::Employee(employee), "purchase")?;
                }
                if let Some(zone) = p.zone {
                    self.require(RowKey::Zone(zone), "purchase")?;
                }
                Ok(())
            }
        }
    }

    fn keys_where(&self, table: Table, pred: impl Fn(&Row) -> bool) -> Vec<RowKey> {
        self.rows(table).filter(|r| pred(r)).map(Row::key).collect()
    }
}

#[derive(Debug)]
enum Undo {
    Remove(RowKey),
    Restore(Row),
}

/// In-memory transactional ledger.
///
/// Intended for tests/dev. Transactions are fully serialized: `begin()` holds
/// the ledger lock until the transaction commits or is dropped, which makes
/// every read-aggregate-then-write sequence atomic with respect to other
/// writers. Writes go straight to the shared tables and are journaled in an
/// undo log that is replayed in reverse on rollback.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    tables: Mutex<Tables>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for InMemoryLedger {
    type Tx<'a> = InMemoryTx<'a>;

    fn begin(&self) -> StoreResult<InMemoryTx<'_>> {
        let tables = self.tables.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(InMemoryTx {
            tables,
            undo: Vec::new(),
            committed: false,
        })
    }
}

/// Transaction over an `InMemoryLedger`. Rolls back on drop unless committed.
#[derive(Debug)]
pub struct InMemoryTx<'a> {
    tables: MutexGuard<'a, Tables>,
    undo: Vec<Undo>,
    committed: bool,
}

impl InMemoryTx<'_> {
    fn remove_cascaded(&mut self, key: RowKey, out: &mut Vec<Row>) {
        if let Some(row) = self.tables.take(&key) {
            self.undo.push(Undo::Restore(row.clone()));
            out.push(row);
            self.apply_delete_actions(key, out);
        }
    }

    fn null_purchases(
        &mut self,
        matches: impl Fn(&crate::model::Purchase) -> bool,
        clear: impl Fn(&mut crate::model::Purchase),
    ) {
        let keys = self
            .tables
            .keys_where(Table::Purchase, |r| r.as_purchase().is_some_and(&matches));
        for key in keys {
            if let Some(Row::Purchase(before)) = self.tables.get(&key).cloned() {
                let mut after = before.clone();
                clear(&mut after);
                self.undo.push(Undo::Restore(Row::Purchase(before)));
                self.tables.put(Row::Purchase(after));
            }
        }
    }

    fn apply_delete_actions(&mut self, key: RowKey, out: &mut Vec<Row>) {
        match key {
            RowKey::Vivarium(v) => {
                let zones = self
                    .tables
                    .keys_where(Table::Zone, |r| r.as_zone().is_some_and(|z| z.vivarium == v));
                for k in zones {
                    self.remove_cascaded(k, out);
                }
            }
            RowKey::Product(p) => {
                let mut doomed = self.tables.keys_where(Table::Inventory, |r| {
                    r.as_inventory().is_some_and(|i| i.product == p)
                });
                doomed.extend(self.tables.keys_where(Table::Purchase, |r| {
                    r.as_purchase().is_some_and(|x| x.product == p)
                }));
                for k in doomed {
                    self.remove_cascaded(k, out);
                }
            }
            RowKey::Zone(z) => {
                let mut doomed = self.tables.keys_where(Table::Inventory, |r| {
                    r.as_inventory().is_some_and(|i| i.zone == z)
                });
                doomed.extend(
                    self.tables
                        .keys_where(Table::Work, |r| r.as_work().is_some_and(|w| w.zone == z)),
                );
                for k in doomed {
                    self.remove_cascaded(k, out);
                }
                self.null_purchases(|p| p.zone == Some(z), |p| p.zone = None);
            }
            RowKey::Employee(e) => {
                let doomed = self
                    .tables
                    .keys_where(Table::Work, |r| r.as_work().is_some_and(|w| w.employee == e));
                for k in doomed {
                    self.remove_cascaded(k, out);
                }
                self.null_purchases(|p| p.employee == Some(e), |p| p.employee = None);
            }
            RowKey::Client(c) => {
                self.null_purchases(|p| p.client == Some(c), |p| p.client = None);
            }
            RowKey::Inventory(_) | RowKey::Work(_) | RowKey::Purchase(_) => {}
        }
    }

    fn rollback(&mut self) {
        let steps = self.undo.len();
        while let Some(step) = self.undo.pop() {
            match step {
                Undo::Remove(key) => {
                    self.tables.take(&key);
                }
                Undo::Restore(row) => {
                    self.tables.put(row);
                }
            }
        }
        if steps > 0 {
            debug!(steps, "ledger transaction rolled back");
        }
    }
}

impl Drop for InMemoryTx<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.rollback();
        }
    }
}

impl Transaction for InMemoryTx<'_> {
    fn commit(mut self) -> StoreResult<()> {
        self.committed = true;
        self.undo.clear();
        Ok(())
    }
}

impl LedgerTx for InMemoryTx<'_> {
    fn get(&self, key: RowKey) -> StoreResult<Option<Row>> {
        Ok(self.tables.get(&key).cloned())
    }

    fn scan(&self, table: Table) -> StoreResult<Vec<Row>> {
        Ok(self.tables.rows(table).cloned().collect())
    }

    fn find_inventory(&self, product: ProductId, zone: ZoneId) -> StoreResult<Option<Inventory>> {
        Ok(self
            .tables
            .rows(Table::Inventory)
            .filter_map(Row::as_inventory)
            .find(|i| i.product == product && i.zone == zone)
            .cloned())
    }

    fn sum_inventory_by_product(
        &self,
        product: ProductId,
        exclude: Option<InventoryId>,
    ) -> StoreResult<i64> {
        let units = self
            .tables
            .rows(Table::Inventory)
            .filter_map(Row::as_inventory)
            .filter(|i| i.product == product && Some(i.id) != exclude)
            .map(|i| i.stock_units);
        checked_sum(units, || format!("inventory of product {product}"))
    }

    fn sum_inventory_by_zone(&self, zone: ZoneId) -> StoreResult<i64> {
        let units = self
            .tables
            .rows(Table::Inventory)
            .filter_map(Row::as_inventory)
            .filter(|i| i.zone == zone)
            .map(|i| i.stock_units);
        checked_sum(units, || format!("inventory of zone {zone}"))
    }

    fn sum_hours_by_employee(&self, employee: EmployeeId) -> StoreResult<i64> {
        let hours = self
            .tables
            .rows(Table::Work)
            .filter_map(Row::as_work)
            .filter(|w| w.employee == employee)
            .map(|w| w.hours_worked);
        checked_sum(hours, || format!("hours of employee {employee}"))
    }

    fn work_zones_of_employee(&self, employee: EmployeeId) -> StoreResult<BTreeSet<ZoneId>> {
        Ok(self
            .tables
            .rows(Table::Work)
            .filter_map(Row::as_work)
            .filter(|w| w.employee == employee)
            .map(|w| w.zone)
            .collect())
    }

    fn employees_in_zone(&self, zone: ZoneId) -> StoreResult<BTreeSet<EmployeeId>> {
        Ok(self
            .tables
            .rows(Table::Work)
            .filter_map(Row::as_work)
            .filter(|w| w.zone == zone)
            .map(|w| w.employee)
            .collect())
    }

    fn count_purchases_by_client(&self, client: ClientId) -> StoreResult<u64> {
        Ok(self
            .tables
            .rows(Table::Purchase)
            .filter_map(Row::as_purchase)
            .filter(|p| p.client == Some(client))
            .count() as u64)
    }

    fn insert(&mut self, row: Row) -> StoreResult<()> {
        let key = row.key();
        if self.tables.contains(key) {
            return Err(StoreError::Duplicate(key.to_string()));
        }
        self.tables.check_references(&row)?;
        self.tables.put(row);
        self.undo.push(Undo::Remove(key));
        Ok(())
    }

    fn update(&mut self, row: Row) -> StoreResult<Row> {
        let key = row.key();
        let before = self
            .tables
            .get(&key)
            .cloned()
            .ok_or(StoreError::NotFound(key))?;
        self.tables.check_references(&row)?;
        self.tables.put(row);
        self.undo.push(Undo::Restore(before.clone()));
        Ok(before)
    }

    fn delete(&mut self, key: RowKey) -> StoreResult<Deleted> {
        let row = self.tables.take(&key).ok_or(StoreError::NotFound(key))?;
        self.undo.push(Undo::Restore(row.clone()));

        let mut cascaded = Vec::new();
        self.apply_delete_actions(key, &mut cascaded);

        Ok(Deleted { row, cascaded })
    }
}
