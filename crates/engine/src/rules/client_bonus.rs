use std::collections::BTreeSet;

use verdant_core::ClientId;
use verdant_events::{MutationEvent, MutationKind};
use verdant_ledger::{LedgerTx, Row, StoreResult, Table, bonus_for_purchases};

use super::{Recompute, Subscription, Write};
use crate::error::EngineResult;

/// Keeps `Client.bonus` on the tier matching the client's purchase count.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClientBonus;

const SUBSCRIPTIONS: &[Subscription] = &[
    Subscription::Row(Table::Purchase, MutationKind::Insert),
    Subscription::Row(Table::Purchase, MutationKind::Update),
    Subscription::Row(Table::Purchase, MutationKind::Delete),
    Subscription::Cascade(Table::Purchase),
];

pub fn client_bonus(tx: &dyn LedgerTx, client: ClientId) -> StoreResult<u32> {
    Ok(bonus_for_purchases(tx.count_purchases_by_client(client)?))
}

impl Recompute for ClientBonus {
    fn name(&self) -> &'static str {
        "client_bonus"
    }

    fn subscriptions(&self) -> &'static [Subscription] {
        SUBSCRIPTIONS
    }

    fn recompute(&self, tx: &dyn LedgerTx, event: &MutationEvent<Row>) -> EngineResult<Vec<Write>> {
        let clients: BTreeSet<ClientId> = event
            .before
            .iter()
            .chain(event.after.iter())
            .chain(event.cascaded_in(Table::Purchase))
            .filter_map(Row::as_purchase)
            .filter_map(|p| p.client)
            .collect();

        let mut writes = Vec::with_capacity(clients.len());
        for id in clients {
            let Some(mut client) = tx.client(id)? else {
                continue;
            };
            client.bonus = client_bonus(tx, id)?;
            writes.push(Write::Update(client.into()));
        }
        Ok(writes)
    }
}
