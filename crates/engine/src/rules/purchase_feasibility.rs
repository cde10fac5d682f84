use verdant_core::DomainError;
use verdant_events::{MutationEvent, MutationKind};
use verdant_ledger::{LedgerTx, Row, Table};

use super::{Guard, Subscription, Write};
use crate::error::EngineResult;

/// A purchase must be covered by the inventory of its exact (product, zone)
/// pair. On acceptance the sold units are taken out of that inventory row.
#[derive(Debug, Default, Clone, Copy)]
pub struct PurchaseFeasibility;

const SUBSCRIPTIONS: &[Subscription] = &[Subscription::Row(Table::Purchase, MutationKind::Insert)];

impl Guard for PurchaseFeasibility {
    fn name(&self) -> &'static str {
        "purchase_feasibility"
    }

    fn subscriptions(&self) -> &'static [Subscription] {
        SUBSCRIPTIONS
    }

    fn check(&self, tx: &dyn LedgerTx, event: &MutationEvent<Row>) -> EngineResult<Vec<Write>> {
        let Some(Row::Purchase(purchase)) = event.after.as_ref() else {
            return Ok(Vec::new());
        };

        let insufficient = |available: i64| DomainError::InsufficientStock {
            product: purchase.product,
            zone: purchase.zone,
            requested: purchase.units,
            available,
        };

        let Some(zone) = purchase.zone else {
            return Err(insufficient(0).into());
        };
        let Some(mut inventory) = tx.find_inventory(purchase.product, zone)? else {
            return Err(insufficient(0).into());
        };
        if purchase.units > inventory.stock_units {
            return Err(insufficient(inventory.stock_units).into());
        }

        inventory.stock_units -= purchase.units;
        Ok(vec![Write::Update(inventory.into())])
    }
}
