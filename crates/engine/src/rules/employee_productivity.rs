use std::collections::BTreeSet;

use verdant_core::EmployeeId;
use verdant_events::{MutationEvent, MutationKind};
use verdant_ledger::{LedgerTx, Row, StoreResult, Table};

use super::{Recompute, Subscription, Write};
use crate::error::EngineResult;

/// Hours that make one unit of productivity (one working day).
pub const HOURS_PER_UNIT: f64 = 8.0;

/// Keeps `Employee.productivity` equal to logged hours over an eight hour day.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmployeeProductivity;

const SUBSCRIPTIONS: &[Subscription] = &[
    Subscription::Row(Table::Work, MutationKind::Insert),
    Subscription::Row(Table::Work, MutationKind::Update),
    Subscription::Row(Table::Work, MutationKind::Delete),
    Subscription::Cascade(Table::Work),
];

pub fn productivity_from_hours(hours: i64) -> f64 {
    hours as f64 / HOURS_PER_UNIT
}

/// Productivity of an employee computed from their work rows.
pub fn employee_productivity(tx: &dyn LedgerTx, employee: EmployeeId) -> StoreResult<f64> {
    Ok(productivity_from_hours(tx.sum_hours_by_employee(employee)?))
}

impl Recompute for EmployeeProductivity {
    fn name(&self) -> &'static str {
        "employee_productivity"
    }

    fn subscriptions(&self) -> &'static [Subscription] {
        SUBSCRIPTIONS
    }

    fn recompute(&self, tx: &dyn LedgerTx, event: &MutationEvent<Row>) -> EngineResult<Vec<Write>> {
        let employees: BTreeSet<EmployeeId> = event
            .before
            .iter()
            .chain(event.after.iter())
            .chain(event.cascaded_in(Table::Work))
            .filter_map(Row::as_work)
            .map(|w| w.employee)
            .collect();

        let mut writes = Vec::with_capacity(employees.len());
        for id in employees {
            let Some(mut employee) = tx.employee(id)? else {
                continue;
            };
            employee.productivity = employee_productivity(tx, id)?;
            writes.push(Write::Update(employee.into()));
        }
        Ok(writes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use verdant_events::Origin;
    use verdant_ledger::{Employee, InMemoryLedger, LedgerStore, Vivarium, Work, Zone};

    #[test]
    fn hours_convert_with_real_division() {
        assert_eq!(productivity_from_hours(0), 0.0);
        assert_eq!(productivity_from_hours(8), 1.0);
        assert_eq!(productivity_from_hours(12), 1.5);
        assert_eq!(productivity_from_hours(3), 0.375);
    }

    #[test]
    fn sums_hours_across_zones() {
        let ledger = InMemoryLedger::new();
        let mut tx = ledger.begin().unwrap();
        let vivarium = Vivarium::new("Orchid house");
        let a = Zone::new(vivarium.id, "Mount wall");
        let b = Zone::new(vivarium.id, "Pot bench");
        let employee = Employee::new("Hazel");
        tx.insert(vivarium.into()).unwrap();
        tx.insert(a.clone().into()).unwrap();
        tx.insert(b.clone().into()).unwrap();
        tx.insert(employee.clone().into()).unwrap();
        tx.insert(Work::new(employee.id, a.id, Utc::now(), 6).into())
            .unwrap();
        let latest = Work::new(employee.id, b.id, Utc::now(), 6);
        tx.insert(latest.clone().into()).unwrap();

        let event = MutationEvent::insert(latest.into(), Origin::Client, 0);
        let writes = EmployeeProductivity.recompute(&tx, &event).unwrap();

        let mut expected = employee;
        expected.productivity = 1.5;
        assert_eq!(writes, vec![Write::Update(expected.into())]);
    }

    #[test]
    fn reassigned_work_recomputes_both_employees() {
        let ledger = InMemoryLedger::new();
        let mut tx = ledger.begin().unwrap();
        let vivarium = Vivarium::new("Orchid house");
        let zone = Zone::new(vivarium.id, "Mount wall");
        let first = Employee::new("Hazel");
        let second = Employee::new("Reed");
        tx.insert(vivarium.into()).unwrap();
        tx.insert(zone.clone().into()).unwrap();
        tx.insert(first.clone().into()).unwrap();
        tx.insert(second.clone().into()).unwrap();
        let stored = Work::new(first.id, zone.id, Utc::now(), 16);
        tx.insert(stored.clone().into()).unwrap();
        let mut moved = stored.clone();
        moved.employee = second.id;
        tx.update(moved.clone().into()).unwrap();

        let event = MutationEvent::update(stored.into(), moved.into(), Origin::Client, 0);
        let writes = EmployeeProductivity.recompute(&tx, &event).unwrap();
        let productivity: Vec<(EmployeeId, f64)> = writes
            .iter()
            .filter_map(|w| match w {
                Write::Update(Row::Employee(e)) => Some((e.id, e.productivity)),
                _ => None,
            })
            .collect();
        assert_eq!(productivity.len(), 2);
        assert!(productivity.contains(&(first.id, 0.0)));
        assert!(productivity.contains(&(second.id, 2.0)));
    }
}
