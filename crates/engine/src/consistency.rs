//! Whole-ledger invariant scan.
//!
//! Recomputes every derived field from base facts and compares it with the
//! stored value. Used before commit when `verify_consistency` is on, and on
//! demand through `Nursery::audit`.

use verdant_ledger::{LedgerTx, Row, StoreResult, Table};

use crate::error::{EngineError, EngineResult};
use crate::rules::{client_bonus, employee_productivity, zone_productivity, zone_stock};

const TOLERANCE: f64 = 1e-9;

fn differs(stored: f64, expected: f64) -> bool {
    (stored - expected).abs() > TOLERANCE
}

/// Human-readable description of every violated invariant, in table order.
pub fn violations(tx: &dyn LedgerTx) -> StoreResult<Vec<String>> {
    let mut found = Vec::new();

    for product in tx.scan(Table::Product)?.into_iter().filter_map(Row::into_product) {
        let allocated = tx.sum_inventory_by_product(product.id, None)?;
        if allocated > product.stock_units {
            found.push(format!(
                "product {}: allocated {allocated} exceeds ceiling {}",
                product.id, product.stock_units
            ));
        }
    }

    for zone in tx.scan(Table::Zone)?.into_iter().filter_map(Row::into_zone) {
        let stock = zone_stock(tx, zone.id)?;
        if zone.stock_units != stock {
            found.push(format!(
                "zone {}: stock_units {} but inventory holds {stock}",
                zone.id, zone.stock_units
            ));
        }
        let productivity = zone_productivity(tx, zone.id)?;
        if differs(zone.productivity, productivity) {
            found.push(format!(
                "zone {}: productivity {} but employees sum to {productivity}",
                zone.id, zone.productivity
            ));
        }
    }

    for employee in tx.scan(Table::Employee)?.into_iter().filter_map(Row::into_employee) {
        let productivity = employee_productivity(tx, employee.id)?;
        if differs(employee.productivity, productivity) {
            found.push(format!(
                "employee {}: productivity {} but work hours give {productivity}",
                employee.id, employee.productivity
            ));
        }
    }

    for client in tx.scan(Table::Client)?.into_iter().filter_map(Row::into_client) {
        let bonus = client_bonus(tx, client.id)?;
        if client.bonus != bonus {
            found.push(format!(
                "client {}: bonus {} but purchase count gives {bonus}",
                client.id, client.bonus
            ));
        }
    }

    Ok(found)
}

/// `Err(ConsistencyViolation)` listing every violation, if any.
pub fn verify(tx: &dyn LedgerTx) -> EngineResult<()> {
    let found = violations(tx)?;
    if found.is_empty() {
        Ok(())
    } else {
        Err(EngineError::ConsistencyViolation(found.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdant_ledger::{Client, InMemoryLedger, Inventory, LedgerStore, Product, Vivarium, Zone};

    #[test]
    fn empty_ledger_is_consistent() {
        let ledger = InMemoryLedger::new();
        let tx = ledger.begin().unwrap();
        assert!(verify(&tx).is_ok());
    }

    #[test]
    fn stale_zone_stock_and_bonus_are_reported() {
        let ledger = InMemoryLedger::new();
        let mut tx = ledger.begin().unwrap();
        let vivarium = Vivarium::new("Lath house");
        let zone = Zone::new(vivarium.id, "East row");
        let product = Product::new("Hosta", 10, 700);
        let mut client = Client::new("Clover");
        client.bonus = 5;
        tx.insert(vivarium.into()).unwrap();
        tx.insert(zone.clone().into()).unwrap();
        tx.insert(product.clone().into()).unwrap();
        tx.insert(Inventory::new(product.id, zone.id, 4).into()).unwrap();
        tx.insert(client.into()).unwrap();

        let found = violations(&tx).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found[0].contains("stock_units 0 but inventory holds 4"));
        assert!(found[1].contains("bonus 5 but purchase count gives 0"));

        let err = verify(&tx).unwrap_err();
        assert!(err.is_engine_fault());
    }
}
