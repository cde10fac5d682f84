//! Guard and recomputation rules, and the registry that routes events to them.
//!
//! Rules never write to the ledger themselves. A rule reads through the
//! transaction it is handed and returns the `Write`s it wants; the dispatcher
//! applies them as tracked mutations one level deeper in the cascade. That keeps
//! every write visible to the depth bound and to the change feed.
//!
//! Standard wiring, in declaration order:
//!
//! ```text
//! guard      stock_ceiling          inventory.insert, inventory.update, product.update
//! guard      purchase_feasibility   purchase.insert
//! recompute  zone_stock             inventory.*, cascade(inventory)
//! recompute  employee_productivity  work.*, cascade(work)
//! recompute  zone_productivity      employee.*, work.update, work.delete, cascade(work)
//! recompute  client_bonus           purchase.*, cascade(purchase)
//! ```

mod client_bonus;
mod employee_productivity;
mod purchase_feasibility;
mod stock_ceiling;
mod zone_productivity;
mod zone_stock;

use verdant_events::{MutationEvent, MutationKind};
use verdant_ledger::{LedgerTx, Row, RowKey, Table};

use crate::error::EngineResult;

pub use client_bonus::{ClientBonus, client_bonus};
pub use employee_productivity::{EmployeeProductivity, employee_productivity, productivity_from_hours};
pub use purchase_feasibility::PurchaseFeasibility;
pub use stock_ceiling::StockCeiling;
pub use zone_productivity::{ZoneProductivity, zone_productivity};
pub use zone_stock::{ZoneStock, zone_stock};

/// A write requested by a client or a rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    Insert(Row),
    Update(Row),
    Delete(RowKey),
}

impl Write {
    pub fn table(&self) -> Table {
        match self {
            Write::Insert(row) | Write::Update(row) => row.key().table(),
            Write::Delete(key) => key.table(),
        }
    }
}

/// What a rule listens to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Subscription {
    /// A direct write of `kind` to `table`.
    Row(Table, MutationKind),
    /// A delete whose referential actions removed rows of `table`.
    Cascade(Table),
}

impl Subscription {
    pub fn matches(&self, event: &MutationEvent<Row>) -> bool {
        match *self {
            Subscription::Row(table, kind) => event.table == table && event.kind == kind,
            Subscription::Cascade(table) => event.has_cascaded(table),
        }
    }
}

impl core::fmt::Display for Subscription {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Subscription::Row(table, kind) => write!(f, "{table}.{kind}"),
            Subscription::Cascade(table) => write!(f, "cascade({table})"),
        }
    }
}

/// Pre-mutation validator.
///
/// `event` is the candidate mutation: images are filled in but the write has not
/// been applied, and `cascaded` is always empty. Returning `Err` aborts the
/// transaction. Returned writes are compensating side effects, applied after the
/// candidate is admitted.
pub trait Guard: Send + Sync {
    fn name(&self) -> &'static str;

    fn subscriptions(&self) -> &'static [Subscription];

    fn check(&self, tx: &dyn LedgerTx, event: &MutationEvent<Row>) -> EngineResult<Vec<Write>>;
}

/// Post-mutation handler restoring a derived field.
///
/// Reads observe the applied mutation. Must be deterministic: running it twice
/// against the same state returns the same writes.
pub trait Recompute: Send + Sync {
    fn name(&self) -> &'static str;

    fn subscriptions(&self) -> &'static [Subscription];

    fn recompute(&self, tx: &dyn LedgerTx, event: &MutationEvent<Row>)
    -> EngineResult<Vec<Write>>;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    Guard,
    Recompute,
}

/// One edge of the rule graph: `subscription` → `rule`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RuleEdge {
    pub phase: Phase,
    pub rule: &'static str,
    pub subscription: Subscription,
}

/// Ordered set of registered rules.
#[derive(Default)]
pub struct RuleRegistry {
    guards: Vec<Box<dyn Guard>>,
    recomputes: Vec<Box<dyn Recompute>>,
}

impl RuleRegistry {
    /// Empty registry (no invariants maintained).
    pub fn new() -> Self {
        Self::default()
    }

    /// The six ledger rules in their documented order.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register_guard(StockCeiling);
        registry.register_guard(PurchaseFeasibility);
        registry.register_recompute(ZoneStock);
        registry.register_recompute(EmployeeProductivity);
        registry.register_recompute(ZoneProductivity);
        registry.register_recompute(ClientBonus);
        registry
    }

    pub fn register_guard(&mut self, guard: impl Guard + 'static) -> &mut Self {
        self.guards.push(Box::new(guard));
        self
    }

    pub fn register_recompute(&mut self, rule: impl Recompute + 'static) -> &mut Self {
        self.recomputes.push(Box::new(rule));
        self
    }

    pub fn guards_for<'a>(
        &'a self,
        event: &'a MutationEvent<Row>,
    ) -> impl Iterator<Item = &'a dyn Guard> + 'a {
        self.guards
            .iter()
            .filter(move |g| g.subscriptions().iter().any(|s| s.matches(event)))
            .map(|g| -> &'a dyn Guard { g.as_ref() })
    }

    pub fn recomputes_for<'a>(
        &'a self,
        event: &'a MutationEvent<Row>,
    ) -> impl Iterator<Item = &'a dyn Recompute> + 'a {
        self.recomputes
            .iter()
            .filter(move |r| r.subscriptions().iter().any(|s| s.matches(event)))
            .map(|r| -> &'a dyn Recompute { r.as_ref() })
    }

    /// Every subscription edge, guards first, each in declaration order.
    pub fn graph(&self) -> Vec<RuleEdge> {
        let guards = self.guards.iter().flat_map(|g| {
            g.subscriptions().iter().map(|s| RuleEdge {
                phase: Phase::Guard,
                rule: g.name(),
                subscription: *s,
            })
        });
        let recomputes = self.recomputes.iter().flat_map(|r| {
            r.subscriptions().iter().map(|s| RuleEdge {
                phase: Phase::Recompute,
                rule: r.name(),
                subscription: *s,
            })
        });
        guards.chain(recomputes).collect()
    }
}

impl core::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("guards", &self.guards.iter().map(|g| g.name()).collect::<Vec<_>>())
            .field(
                "recomputes",
                &self.recomputes.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdant_events::Origin;
    use verdant_ledger::{Employee, Inventory, Work};
    use verdant_core::{ProductId, ZoneId};

    #[test]
    fn standard_order_is_documented_order() {
        let registry = RuleRegistry::standard();
        let mut names: Vec<&str> = registry.graph().iter().map(|e| e.rule).collect();
        names.dedup();
        assert_eq!(
            names,
            vec![
                "stock_ceiling",
                "purchase_feasibility",
                "zone_stock",
                "employee_productivity",
                "zone_productivity",
                "client_bonus",
            ]
        );
    }

    #[test]
    fn inventory_insert_routes_to_ceiling_and_zone_stock_only() {
        let registry = RuleRegistry::standard();
        let event = MutationEvent::insert(
            Row::from(Inventory::new(ProductId::new(), ZoneId::new(), 1)),
            Origin::Client,
            0,
        );

        let guards: Vec<_> = registry.guards_for(&event).map(|g| g.name()).collect();
        let recomputes: Vec<_> = registry.recomputes_for(&event).map(|r| r.name()).collect();
        assert_eq!(guards, vec!["stock_ceiling"]);
        assert_eq!(recomputes, vec!["zone_stock"]);
    }

    #[test]
    fn employee_delete_with_work_cascade_hits_productivity_rules() {
        let registry = RuleRegistry::standard();
        let employee = Employee::new("Linden");
        let work = Work::new(employee.id, ZoneId::new(), chrono::Utc::now(), 8);
        let event = MutationEvent::delete(Row::from(employee), Origin::Client, 0)
            .with_cascaded(vec![Row::from(work)]);

        let recomputes: Vec<_> = registry.recomputes_for(&event).map(|r| r.name()).collect();
        assert_eq!(recomputes, vec!["employee_productivity", "zone_productivity"]);
    }

    #[test]
    fn subscriptions_render_as_table_dot_kind() {
        assert_eq!(
            Subscription::Row(Table::Work, MutationKind::Update).to_string(),
            "work.update"
        );
        assert_eq!(Subscription::Cascade(Table::Purchase).to_string(), "cascade(purchase)");
    }
}
