use std::collections::BTreeSet;

use verdant_core::ZoneId;
use verdant_events::{MutationEvent, MutationKind};
use verdant_ledger::{LedgerTx, Row, StoreResult, Table};

use super::{Recompute, Subscription, Write};
use crate::error::EngineResult;

/// Keeps `Zone.productivity` equal to the summed productivity of every
/// employee working in the zone.
///
/// An employee counts toward each zone they hold at least one work row in, so
/// a change to one employee fans out to all of their zones. Work rows leaving a
/// zone change its membership, which the employee update alone cannot reveal.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZoneProductivity;

const SUBSCRIPTIONS: &[Subscription] = &[
    Subscription::Row(Table::Employee, MutationKind::Insert),
    Subscription::Row(Table::Employee, MutationKind::Update),
    Subscription::Row(Table::Employee, MutationKind::Delete),
    Subscription::Row(Table::Work, MutationKind::Update),
    Subscription::Row(Table::Work, MutationKind::Delete),
    Subscription::Cascade(Table::Work),
];

/// `Σ employee.productivity` over employees with work in the zone.
pub fn zone_productivity(tx: &dyn LedgerTx, zone: ZoneId) -> StoreResult<f64> {
    let mut total = 0.0;
    for id in tx.employees_in_zone(zone)? {
        if let Some(employee) = tx.employee(id)? {
            total += employee.productivity;
        }
    }
    Ok(total)
}

impl ZoneProductivity {
    fn affected_zones(tx: &dyn LedgerTx, event: &MutationEvent<Row>) -> StoreResult<BTreeSet<ZoneId>> {
        let mut zones: BTreeSet<ZoneId> = event
            .cascaded_in(Table::Work)
            .filter_map(Row::as_work)
            .map(|w| w.zone)
            .collect();

        match (event.table, event.kind) {
            (Table::Employee, MutationKind::Insert | MutationKind::Update) => {
                if let Some(Row::Employee(employee)) = event.after.as_ref() {
                    zones.extend(tx.work_zones_of_employee(employee.id)?);
                }
            }
            (Table::Work, _) => {
                zones.extend(
                    event
                        .before
                        .iter()
                        .chain(event.after.iter())
                        .filter_map(Row::as_work)
                        .map(|w| w.zone),
                );
            }
            _ => {}
        }
        Ok(zones)
    }
}

impl Recompute for ZoneProductivity {
    fn name(&self) -> &'static str {
        "zone_productivity"
    }

    fn subscriptions(&self) -> &'static [Subscription] {
        SUBSCRIPTIONS
    }

    fn recompute(&self, tx: &dyn LedgerTx, event: &MutationEvent<Row>) -> EngineResult<Vec<Write>> {
        let zones = Self::affected_zones(tx, event)?;

        let mut writes = Vec::with_capacity(zones.len());
        for id in zones {
            let Some(mut zone) = tx.zone(id)? else {
                continue;
            };
            zone.productivity = zone_productivity(tx, id)?;
            writes.push(Write::Update(zone.into()));
        }
        Ok(writes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use verdant_events::Origin;
    use verdant_ledger::{Employee, InMemoryLedger, LedgerStore, RowKey, Vivarium, Work, Zone};

    struct Site {
        zones: Vec<Zone>,
        employee: Employee,
    }

    /// One employee (productivity 2.0) working in two zones, plus an idle zone.
    fn site(tx: &mut dyn LedgerTx) -> Site {
        let vivarium = Vivarium::new("Tropical house");
        let zones: Vec<Zone> = ["Canopy", "Understory", "Pond"]
            .into_iter()
            .map(|name| Zone::new(vivarium.id, name))
            .collect();
        let mut employee = Employee::new("Moss");
        employee.productivity = 2.0;
        tx.insert(vivarium.into()).unwrap();
        for zone in &zones {
            tx.insert(zone.clone().into()).unwrap();
        }
        tx.insert(employee.clone().into()).unwrap();
        tx.insert(Work::new(employee.id, zones[0].id, Utc::now(), 8).into())
            .unwrap();
        tx.insert(Work::new(employee.id, zones[1].id, Utc::now(), 8).into())
            .unwrap();
        Site { zones, employee }
    }

    fn productivity_by_zone(writes: &[Write]) -> Vec<(ZoneId, f64)> {
        writes
            .iter()
            .filter_map(|w| match w {
                Write::Update(Row::Zone(z)) => Some((z.id, z.productivity)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn employee_update_reaches_every_zone_they_work_in() {
        let ledger = InMemoryLedger::new();
        let mut tx = ledger.begin().unwrap();
        let s = site(&mut tx);

        let event = MutationEvent::update(
            s.employee.clone().into(),
            s.employee.clone().into(),
            Origin::Rule("employee_productivity"),
            1,
        );
        let writes = ZoneProductivity.recompute(&tx, &event).unwrap();
        let got = productivity_by_zone(&writes);
        assert_eq!(got.len(), 2);
        assert!(got.contains(&(s.zones[0].id, 2.0)));
        assert!(got.contains(&(s.zones[1].id, 2.0)));
    }

    #[test]
    fn work_moved_out_of_a_zone_clears_it() {
        let ledger = InMemoryLedger::new();
        let mut tx = ledger.begin().unwrap();
        let s = site(&mut tx);

        let stored = tx
            .scan(Table::Work)
            .unwrap()
            .into_iter()
            .filter_map(Row::into_work)
            .find(|w| w.zone == s.zones[1].id)
            .unwrap();
        let mut moved = stored.clone();
        moved.zone = s.zones[2].id;
        tx.update(moved.clone().into()).unwrap();

        let event = MutationEvent::update(stored.into(), moved.into(), Origin::Client, 0);
        let got = productivity_by_zone(&ZoneProductivity.recompute(&tx, &event).unwrap());
        assert_eq!(got.len(), 2);
        assert!(got.contains(&(s.zones[1].id, 0.0)));
        assert!(got.contains(&(s.zones[2].id, 2.0)));
    }

    #[test]
    fn employee_delete_uses_cascaded_work_zones() {
        let ledger = InMemoryLedger::new();
        let mut tx = ledger.begin().unwrap();
        let s = site(&mut tx);

        let deleted = tx.delete(RowKey::Employee(s.employee.id)).unwrap();
        let event = MutationEvent::delete(deleted.row, Origin::Client, 0).with_cascaded(deleted.cascaded);
        let got = productivity_by_zone(&ZoneProductivity.recompute(&tx, &event).unwrap());
        assert_eq!(got.len(), 2);
        assert!(got.iter().all(|(_, p)| *p == 0.0));
    }

    #[test]
    fn deleted_zone_is_not_written() {
        let ledger = InMemoryLedger::new();
        let mut tx = ledger.begin().unwrap();
        let s = site(&mut tx);

        let deleted = tx.delete(RowKey::Zone(s.zones[0].id)).unwrap();
        let event = MutationEvent::delete(deleted.row, Origin::Client, 0).with_cascaded(deleted.cascaded);
        assert!(ZoneProductivity.recompute(&tx, &event).unwrap().is_empty());
    }
}
