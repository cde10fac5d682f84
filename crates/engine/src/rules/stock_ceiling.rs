use verdant_core::DomainError;
use verdant_events::{MutationEvent, MutationKind};
use verdant_ledger::{Inventory, LedgerTx, Product, Row, Table};

use super::{Guard, Subscription, Write};
use crate::error::EngineResult;

/// Σ allocated inventory of a product never exceeds its ceiling.
#[derive(Debug, Default, Clone, Copy)]
pub struct StockCeiling;

const SUBSCRIPTIONS: &[Subscription] = &[
    Subscription::Row(Table::Inventory, MutationKind::Insert),
    Subscription::Row(Table::Inventory, MutationKind::Update),
    Subscription::Row(Table::Product, MutationKind::Update),
];

impl StockCeiling {
    fn check_allocation(tx: &dyn LedgerTx, candidate: &Inventory) -> EngineResult<()> {
        let product = tx
            .product(candidate.product)?
            .ok_or_else(|| DomainError::not_found(format!("product {}", candidate.product)))?;
        let allocated = tx.sum_inventory_by_product(candidate.product, Some(candidate.id))?;
        let total = candidate.stock_units.checked_add(allocated);
        if total.is_none_or(|total| total > product.stock_units) {
            return Err(DomainError::StockCeilingExceeded {
                product: product.id,
                requested: candidate.stock_units,
                allocated,
                ceiling: product.stock_units,
            }
            .into());
        }
        Ok(())
    }

    fn check_ceiling(tx: &dyn LedgerTx, candidate: &Product) -> EngineResult<()> {
        let allocated = tx.sum_inventory_by_product(candidate.id, None)?;
        if allocated > candidate.stock_units {
            return Err(DomainError::StockCeilingExceeded {
                product: candidate.id,
                requested: 0,
                allocated,
                ceiling: candidate.stock_units,
            }
            .into());
        }
        Ok(())
    }
}

impl Guard for StockCeiling {
    fn name(&self) -> &'static str {
        "stock_ceiling"
    }

    fn subscriptions(&self) -> &'static [Subscription] {
        SUBSCRIPTIONS
    }

    fn check(&self, tx: &dyn LedgerTx, event: &MutationEvent<Row>) -> EngineResult<Vec<Write>> {
        match event.after.as_ref() {
            Some(Row::Inventory(candidate)) => Self::check_allocation(tx, candidate)?,
            Some(Row::Product(candidate)) => Self::check_ceiling(tx, candidate)?,
            _ => {}
        }
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use verdant_events::Origin;
    use verdant_ledger::{InMemoryLedger, LedgerStore, Vivarium, Zone};

    struct Seed {
        product: Product,
        zones: Vec<Zone>,
    }

    fn seed(tx: &mut dyn LedgerTx) -> Seed {
        let vivarium = Vivarium::new("Glasshouse");
        let product = Product::new("Calathea", 10, 900);
        let zones: Vec<Zone> = (0..3)
            .map(|i| Zone::new(vivarium.id, format!("Bench {i}")))
            .collect();
        tx.insert(vivarium.into()).unwrap();
        tx.insert(product.clone().into()).unwrap();
        for zone in &zones {
            tx.insert(zone.clone().into()).unwrap();
        }
        Seed { product, zones }
    }

    #[test]
    fn insert_within_ceiling_passes() {
        let ledger = InMemoryLedger::new();
        let mut tx = ledger.begin().unwrap();
        let s = seed(&mut tx);
        tx.insert(Inventory::new(s.product.id, s.zones[0].id, 6).into())
            .unwrap();

        let candidate = Inventory::new(s.product.id, s.zones[1].id, 4);
        let event = MutationEvent::insert(candidate.into(), Origin::Client, 0);
        assert_eq!(StockCeiling.check(&tx, &event).unwrap(), Vec::new());
    }

    #[test]
    fn insert_past_ceiling_reports_allocation() {
        let ledger = InMemoryLedger::new();
        let mut tx = ledger.begin().unwrap();
        let s = seed(&mut tx);
        tx.insert(Inventory::new(s.product.id, s.zones[0].id, 6).into())
            .unwrap();
        tx.insert(Inventory::new(s.product.id, s.zones[1].id, 3).into())
            .unwrap();

        let candidate = Inventory::new(s.product.id, s.zones[2].id, 2);
        let event = MutationEvent::insert(candidate.into(), Origin::Client, 0);
        let err = StockCeiling.check(&tx, &event).unwrap_err();
        assert_eq!(
            err,
            EngineError::Domain(DomainError::StockCeilingExceeded {
                product: s.product.id,
                requested: 2,
                allocated: 9,
                ceiling: 10,
            })
        );
    }

    #[test]
    fn update_excludes_the_row_being_replaced() {
        let ledger = InMemoryLedger::new();
        let mut tx = ledger.begin().unwrap();
        let s = seed(&mut tx);
        let stored = Inventory::new(s.product.id, s.zones[0].id, 8);
        tx.insert(stored.clone().into()).unwrap();

        let mut raised = stored.clone();
        raised.stock_units = 10;
        let event = MutationEvent::update(stored.into(), raised.into(), Origin::Client, 0);
        assert!(StockCeiling.check(&tx, &event).is_ok());
    }

    #[test]
    fn lowering_ceiling_below_allocation_is_rejected() {
        let ledger = InMemoryLedger::new();
        let mut tx = ledger.begin().unwrap();
        let s = seed(&mut tx);
        tx.insert(Inventory::new(s.product.id, s.zones[0].id, 7).into())
            .unwrap();

        let mut lowered = s.product.clone();
        lowered.stock_units = 5;
        let event = MutationEvent::update(s.product.into(), lowered.clone().into(), Origin::Client, 0);
        let err = StockCeiling.check(&tx, &event).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Domain(DomainError::StockCeilingExceeded { allocated: 7, ceiling: 5, .. })
        ));

        lowered.stock_units = 7;
        let event = MutationEvent::update(lowered.clone().into(), lowered.into(), Origin::Client, 0);
        assert!(StockCeiling.check(&tx, &event).is_ok());
    }
    #[test]
    fn allocation_summing_past_i64_range_is_over_ceiling() {
        let ledger = InMemoryLedger::new();
        let mut tx = ledger.begin().unwrap();
        let s = seed(&mut tx);
        let mut product = s.product.clone();
        product.stock_units = i64::MAX;
        tx.update(product.clone().into()).unwrap();
        tx.insert(Inventory::new(product.id, s.zones[0].id, 1).into())
            .unwrap();

        let candidate = Inventory::new(product.id, s.zones[1].id, i64::MAX);
        let event = MutationEvent::insert(candidate.into(), Origin::Client, 0);
        let err = StockCeiling.check(&tx, &event).unwrap_err();
        assert_eq!(
            err,
            EngineError::Domain(DomainError::StockCeilingExceeded {
                product: product.id,
                requested: i64::MAX,
                allocated: 1,
                ceiling: i64::MAX,
            })
        );
    }
}
