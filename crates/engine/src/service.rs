//! `Nursery`: typed ledger operations over the rule dispatcher.
//!
//! Every mutating operation is one top-level transaction. Returned rows are
//! the committed images, derived fields included.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use verdant_core::{
    ClientId, EmployeeId, InventoryId, ProductId, PurchaseId, VivariumId, WorkId, ZoneId,
};
use verdant_events::{CommitEnvelope, EventBus, InMemoryEventBus, Origin};
use verdant_ledger::{
    Client, Employee, InMemoryLedger, Inventory, LedgerStore, LedgerTx, Product, Purchase, Row,
    RowKey, Table, Vivarium, Work, Zone,
};

use crate::config::EngineConfig;
use crate::consistency;
use crate::error::{EngineError, EngineResult};
use crate::rule_dispatcher::{CommitReceipt, RuleDispatcher};
use crate::rules::{
    RuleRegistry, Write, client_bonus, employee_productivity, productivity_from_hours, zone_stock,
};

/// Origin recorded on writes issued by `recompute_all`.
pub const RECOMPUTE_ALL: &str = "recompute_all";

pub type InMemoryNursery = Nursery<InMemoryLedger, Arc<InMemoryEventBus<CommitEnvelope>>>;

#[derive(Debug)]
pub struct Nursery<S, B> {
    dispatcher: RuleDispatcher<S, B>,
}

impl InMemoryNursery {
    /// In-memory ledger and change feed with the standard rules.
    pub fn in_memory(config: EngineConfig) -> EngineResult<Self> {
        let dispatcher = RuleDispatcher::new(
            InMemoryLedger::new(),
            Arc::new(InMemoryEventBus::new()),
            RuleRegistry::standard(),
            config,
        )?;
        Ok(Self::new(dispatcher))
    }
}

impl<S, B> Nursery<S, B> {
    pub fn new(dispatcher: RuleDispatcher<S, B>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &RuleDispatcher<S, B> {
        &self.dispatcher
    }
}

fn committed<T>(
    receipt: &CommitReceipt,
    key: RowKey,
    project: fn(Row) -> Option<T>,
) -> EngineResult<T> {
    receipt
        .latest(key)
        .cloned()
        .and_then(project)
        .ok_or_else(|| EngineError::not_found(key.to_string()))
}

fn require<T>(found: Option<T>, key: RowKey) -> EngineResult<T> {
    found.ok_or_else(|| EngineError::not_found(key.to_string()))
}

impl<S, B> Nursery<S, B>
where
    S: LedgerStore,
    B: EventBus<CommitEnvelope>,
{
    /// Apply several client writes as one transaction.
    pub fn execute(&self, writes: Vec<Write>) -> EngineResult<CommitReceipt> {
        self.dispatcher.execute(writes)
    }

    fn insert<T: Into<Row>>(&self, row: T, project: fn(Row) -> Option<T>) -> EngineResult<T> {
        let row = row.into();
        let key = row.key();
        let receipt = self.dispatcher.execute(vec![Write::Insert(row)])?;
        committed(&receipt, key, project)
    }

    /// Read-modify-write of one stored row.
    fn modify<T: Into<Row>>(
        &self,
        key: RowKey,
        project: fn(Row) -> Option<T>,
        change: impl FnOnce(&mut T),
    ) -> EngineResult<T> {
        let receipt = self.dispatcher.run(Origin::Client, |tx| {
            let mut row = require(tx.get(key)?.and_then(project), key)?;
            change(&mut row);
            Ok(vec![Write::Update(row.into())])
        })?;
        committed(&receipt, key, project)
    }

    fn delete(&self, key: RowKey) -> EngineResult<CommitReceipt> {
        self.dispatcher.execute(vec![Write::Delete(key)])
    }

    // --- vivariums -------------------------------------------------------

    pub fn create_vivarium(&self, name: impl Into<String>) -> EngineResult<Vivarium> {
        self.insert(Vivarium::new(name), Row::into_vivarium)
    }

    // --- products --------------------------------------------------------

    pub fn create_product(
        &self,
        name: impl Into<String>,
        stock_units: i64,
        price: i64,
    ) -> EngineResult<Product> {
        self.insert(Product::new(name, stock_units, price), Row::into_product)
    }

    /// Replace a product's name, ceiling and price. Lowering the ceiling below
    /// what is already allocated is rejected.
    pub fn update_product(&self, product: Product) -> EngineResult<Product> {
        let key = RowKey::Product(product.id);
        let receipt = self.dispatcher.execute(vec![Write::Update(product.into())])?;
        committed(&receipt, key, Row::into_product)
    }

    pub fn delete_product(&self, id: ProductId) -> EngineResult<CommitReceipt> {
        self.delete(RowKey::Product(id))
    }

    // --- zones -----------------------------------------------------------

    pub fn create_zone(&self, vivarium: VivariumId, name: impl Into<String>) -> EngineResult<Zone> {
        self.insert(Zone::new(vivarium, name), Row::into_zone)
    }

    pub fn rename_zone(&self, id: ZoneId, name: impl Into<String>) -> EngineResult<Zone> {
        let name = name.into();
        self.modify(RowKey::Zone(id), Row::into_zone, |zone| zone.name = name)
    }

    pub fn delete_zone(&self, id: ZoneId) -> EngineResult<CommitReceipt> {
        self.delete(RowKey::Zone(id))
    }

    // --- inventory -------------------------------------------------------

    pub fn allocate_inventory(
        &self,
        product: ProductId,
        zone: ZoneId,
        stock_units: i64,
    ) -> EngineResult<Inventory> {
        self.insert(Inventory::new(product, zone, stock_units), Row::into_inventory)
    }

    pub fn set_inventory_stock(&self, id: InventoryId, stock_units: i64) -> EngineResult<Inventory> {
        self.modify(RowKey::Inventory(id), Row::into_inventory, |inventory| {
            inventory.stock_units = stock_units
        })
    }

    pub fn delete_inventory(&self, id: InventoryId) -> EngineResult<CommitReceipt> {
        self.delete(RowKey::Inventory(id))
    }

    // --- employees and work ----------------------------------------------

    pub fn hire_employee(&self, name: impl Into<String>) -> EngineResult<Employee> {
        self.insert(Employee::new(name), Row::into_employee)
    }

    pub fn rename_employee(&self, id: EmployeeId, name: impl Into<String>) -> EngineResult<Employee> {
        let name = name.into();
        self.modify(RowKey::Employee(id), Row::into_employee, |employee| {
            employee.name = name
        })
    }

    pub fn delete_employee(&self, id: EmployeeId) -> EngineResult<CommitReceipt> {
        self.delete(RowKey::Employee(id))
    }

    pub fn log_work(
        &self,
        employee: EmployeeId,
        zone: ZoneId,
        started_at: DateTime<Utc>,
        ended_at: Option<DateTime<Utc>>,
        hours_worked: i64,
    ) -> EngineResult<Work> {
        let mut work = Work::new(employee, zone, started_at, hours_worked);
        work.ended_at = ended_at;
        self.insert(work, Row::into_work)
    }

    pub fn update_work_hours(&self, id: WorkId, hours_worked: i64) -> EngineResult<Work> {
        self.modify(RowKey::Work(id), Row::into_work, |work| {
            work.hours_worked = hours_worked
        })
    }

    pub fn delete_work(&self, id: WorkId) -> EngineResult<CommitReceipt> {
        self.delete(RowKey::Work(id))
    }

    // --- clients and purchases -------------------------------------------

    pub fn register_client(&self, name: impl Into<String>) -> EngineResult<Client> {
        self.insert(Client::new(name), Row::into_client)
    }

    pub fn delete_client(&self, id: ClientId) -> EngineResult<CommitReceipt> {
        self.delete(RowKey::Client(id))
    }

    /// Sell from the purchase's (product, zone) inventory.
    pub fn record_purchase(&self, purchase: Purchase) -> EngineResult<Purchase> {
        self.insert(purchase, Row::into_purchase)
    }

    /// Remove a purchase record. Sold units are not returned to inventory.
    pub fn delete_purchase(&self, id: PurchaseId) -> EngineResult<CommitReceipt> {
        self.delete(RowKey::Purchase(id))
    }

    // --- reads -----------------------------------------------------------

    pub fn vivarium(&self, id: VivariumId) -> EngineResult<Option<Vivarium>> {
        self.dispatcher.read(|tx| Ok(tx.vivarium(id)?))
    }

    pub fn product(&self, id: ProductId) -> EngineResult<Option<Product>> {
        self.dispatcher.read(|tx| Ok(tx.product(id)?))
    }

    pub fn zone(&self, id: ZoneId) -> EngineResult<Option<Zone>> {
        self.dispatcher.read(|tx| Ok(tx.zone(id)?))
    }

    pub fn inventory(&self, id: InventoryId) -> EngineResult<Option<Inventory>> {
        self.dispatcher.read(|tx| Ok(tx.inventory(id)?))
    }

    pub fn find_inventory(&self, product: ProductId, zone: ZoneId) -> EngineResult<Option<Inventory>> {
        self.dispatcher.read(|tx| Ok(tx.find_inventory(product, zone)?))
    }

    pub fn employee(&self, id: EmployeeId) -> EngineResult<Option<Employee>> {
        self.dispatcher.read(|tx| Ok(tx.employee(id)?))
    }

    pub fn work(&self, id: WorkId) -> EngineResult<Option<Work>> {
        self.dispatcher.read(|tx| Ok(tx.work(id)?))
    }

    pub fn client(&self, id: ClientId) -> EngineResult<Option<Client>> {
        self.dispatcher.read(|tx| Ok(tx.client(id)?))
    }

    pub fn purchase(&self, id: PurchaseId) -> EngineResult<Option<Purchase>> {
        self.dispatcher.read(|tx| Ok(tx.purchase(id)?))
    }

    pub fn rows(&self, table: Table) -> EngineResult<Vec<Row>> {
        self.dispatcher.read(|tx| Ok(tx.scan(table)?))
    }

    // --- maintenance -----------------------------------------------------

    /// Recompute every derived field from base facts in one transaction.
    ///
    /// Zone productivity is computed from work hours directly so the result
    /// does not depend on the order employees are rewritten in.
    pub fn recompute_all(&self) -> EngineResult<CommitReceipt> {
        let receipt = self
            .dispatcher
            .run(Origin::Rule(RECOMPUTE_ALL), recompute_plan)?;
        info!(writes = receipt.len(), "derived fields recomputed");
        Ok(receipt)
    }

    /// Scan the ledger for invariant violations.
    pub fn audit(&self) -> EngineResult<()> {
        self.dispatcher.read(consistency::verify)
    }

    /// Violations as a list, empty when consistent.
    pub fn violations(&self) -> EngineResult<Vec<String>> {
        self.dispatcher.read(|tx| Ok(consistency::violations(tx)?))
    }

    /// Subscribe to committed mutations.
    pub fn subscribe(&self) -> verdant_events::Subscription<CommitEnvelope> {
        self.dispatcher.bus().subscribe()
    }
}

fn recompute_plan(tx: &dyn LedgerTx) -> EngineResult<Vec<Write>> {
    let mut writes = Vec::new();

    for mut employee in tx.scan(Table::Employee)?.into_iter().filter_map(Row::into_employee) {
        employee.productivity = employee_productivity(tx, employee.id)?;
        writes.push(Write::Update(employee.into()));
    }

    for mut zone in tx.scan(Table::Zone)?.into_iter().filter_map(Row::into_zone) {
        zone.stock_units = zone_stock(tx, zone.id)?;
        let mut productivity = 0.0;
        for employee in tx.employees_in_zone(zone.id)? {
            productivity += productivity_from_hours(tx.sum_hours_by_employee(employee)?);
        }
        zone.productivity = productivity;
        writes.push(Write::Update(zone.into()));
    }

    for mut client in tx.scan(Table::Client)?.into_iter().filter_map(Row::into_client) {
        client.bonus = client_bonus(tx, client.id)?;
        writes.push(Write::Update(client.into()));
    }

    Ok(writes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nursery() -> InMemoryNursery {
        InMemoryNursery::in_memory(EngineConfig::default()).unwrap()
    }

    #[test]
    fn created_rows_are_readable() {
        let n = nursery();
        let vivarium = n.create_vivarium("Conservatory").unwrap();
        let zone = n.create_zone(vivarium.id, "Central bed").unwrap();

        assert_eq!(n.vivarium(vivarium.id).unwrap(), Some(vivarium));
        assert_eq!(n.zone(zone.id).unwrap(), Some(zone));
    }

    #[test]
    fn rename_of_missing_zone_is_not_found() {
        let n = nursery();
        let err = n.rename_zone(ZoneId::new(), "Nowhere").unwrap_err();
        assert!(matches!(err, EngineError::Domain(verdant_core::DomainError::NotFound(_))));
    }

    #[test]
    fn rename_keeps_derived_fields() {
        let n = nursery();
        let vivarium = n.create_vivarium("Conservatory").unwrap();
        let zone = n.create_zone(vivarium.id, "Central bed").unwrap();
        let product = n.create_product("Bird of paradise", 10, 3_000).unwrap();
        n.allocate_inventory(product.id, zone.id, 6).unwrap();

        let renamed = n.rename_zone(zone.id, "Palm bed").unwrap();
        assert_eq!(renamed.name, "Palm bed");
        assert_eq!(renamed.stock_units, 6);
    }

    #[test]
    fn empty_name_is_a_validation_error() {
        let n = nursery();
        let err = n.hire_employee("  ").unwrap_err();
        assert!(matches!(err, EngineError::Domain(verdant_core::DomainError::Validation(_))));
    }

    #[test]
    fn recompute_all_on_empty_ledger_commits_nothing() {
        let n = nursery();
        assert!(n.recompute_all().unwrap().is_empty());
        assert!(n.audit().is_ok());
    }
}
