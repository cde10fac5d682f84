use std::collections::BTreeSet;

use verdant_core::ZoneId;
use verdant_events::{MutationEvent, MutationKind};
use verdant_ledger::{LedgerTx, Row, StoreResult, Table};

use super::{Recompute, Subscription, Write};
use crate::error::EngineResult;

/// Keeps `Zone.stock_units` equal to the inventory held in the zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZoneStock;

const SUBSCRIPTIONS: &[Subscription] = &[
    Subscription::Row(Table::Inventory, MutationKind::Insert),
    Subscription::Row(Table::Inventory, MutationKind::Update),
    Subscription::Row(Table::Inventory, MutationKind::Delete),
    Subscription::Cascade(Table::Inventory),
];

/// `Σ inventory.stock_units` for the zone.
pub fn zone_stock(tx: &dyn LedgerTx, zone: ZoneId) -> StoreResult<i64> {
    tx.sum_inventory_by_zone(zone)
}

impl Recompute for ZoneStock {
    fn name(&self) -> &'static str {
        "zone_stock"
    }

    fn subscriptions(&self) -> &'static [Subscription] {
        SUBSCRIPTIONS
    }

    fn recompute(&self, tx: &dyn LedgerTx, event: &MutationEvent<Row>) -> EngineResult<Vec<Write>> {
        let images = event.before.iter().chain(event.after.iter());
        let zones: BTreeSet<ZoneId> = images
            .chain(event.cascaded_in(Table::Inventory))
            .filter_map(Row::as_inventory)
            .map(|i| i.zone)
            .collect();

        let mut writes = Vec::with_capacity(zones.len());
        for id in zones {
            let Some(mut zone) = tx.zone(id)? else {
                continue;
            };
            zone.stock_units = zone_stock(tx, id)?;
            writes.push(Write::Update(zone.into()));
        }
        Ok(writes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdant_events::Origin;
    use verdant_ledger::{InMemoryLedger, Inventory, LedgerStore, Product, RowKey, Vivarium, Zone};

    #[test]
    fn moving_inventory_recomputes_both_zones() {
        let ledger = InMemoryLedger::new();
        let mut tx = ledger.begin().unwrap();
        let vivarium = Vivarium::new("Fern house");
        let from = Zone::new(vivarium.id, "Mist bench");
        let to = Zone::new(vivarium.id, "Dry bench");
        let product = Product::new("Staghorn fern", 30, 2_000);
        tx.insert(vivarium.into()).unwrap();
        tx.insert(from.clone().into()).unwrap();
        tx.insert(to.clone().into()).unwrap();
        tx.insert(product.clone().into()).unwrap();

        let stored = Inventory::new(product.id, from.id, 4);
        tx.insert(stored.clone().into()).unwrap();
        let mut moved = stored.clone();
        moved.zone = to.id;
        tx.update(moved.clone().into()).unwrap();

        let event = MutationEvent::update(stored.into(), moved.into(), Origin::Client, 0);
        let writes = ZoneStock.recompute(&tx, &event).unwrap();

        let stock: Vec<(ZoneId, i64)> = writes
            .iter()
            .filter_map(|w| match w {
                Write::Update(Row::Zone(z)) => Some((z.id, z.stock_units)),
                _ => None,
            })
            .collect();
        assert_eq!(stock.len(), 2);
        assert!(stock.contains(&(from.id, 0)));
        assert!(stock.contains(&(to.id, 4)));
    }

    #[test]
    fn deleted_zone_is_skipped() {
        let ledger = InMemoryLedger::new();
        let mut tx = ledger.begin().unwrap();
        let vivarium = Vivarium::new("Cactus house");
        let zone = Zone::new(vivarium.id, "South wall");
        let product = Product::new("Barrel cactus", 10, 600);
        let inventory = Inventory::new(product.id, zone.id, 3);
        tx.insert(vivarium.into()).unwrap();
        tx.insert(zone.clone().into()).unwrap();
        tx.insert(product.into()).unwrap();
        tx.insert(inventory.into()).unwrap();

        let deleted = tx.delete(RowKey::Zone(zone.id)).unwrap();
        let event = MutationEvent::delete(deleted.row, Origin::Client, 0).with_cascaded(deleted.cascaded);
        assert!(ZoneStock.recompute(&tx, &event).unwrap().is_empty());
    }
}
