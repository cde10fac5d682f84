//! Client write access at the ledger boundary.
//!
//! Callers own base facts; the rule engine owns derived fields. A client write
//! may read derived columns but must not change them:
//!
//! - inserts must carry the initial value (0 / 0.0)
//! - updates must carry the stored value unchanged
//!
//! A recorded sale keeps its `product`, `zone` and `units`: inventory was
//! decremented against exactly those. Rule-origin writes skip both checks.

use verdant_core::{DomainError, DomainResult};

use crate::model::{Client, Employee, Purchase, Row, Zone};

/// First derived column of `after` that differs from `before`, or from the
/// initial value when `before` is `None`.
fn changed_derived(before: Option<&Row>, after: &Row) -> Option<(&'static str, &'static str)> {
    match after {
        Row::Zone(z) => {
            let (stock, productivity) = before
                .and_then(Row::as_zone)
                .map_or((0, 0.0), |b: &Zone| (b.stock_units, b.productivity));
            if z.stock_units != stock {
                Some(("zone", "stock_units"))
            } else if z.productivity != productivity {
                Some(("zone", "productivity"))
            } else {
                None
            }
        }
        Row::Employee(e) => {
            let stored = before
                .and_then(Row::as_employee)
                .map_or(0.0, |b: &Employee| b.productivity);
            (e.productivity != stored).then_some(("employee", "productivity"))
        }
        Row::Client(c) => {
            let stored = before.and_then(Row::as_client).map_or(0, |b: &Client| b.bonus);
            (c.bonus != stored).then_some(("client", "bonus"))
        }
        _ => None,
    }
}

fn changed_sale_fact(stored: &Purchase, proposed: &Purchase) -> Option<&'static str> {
    if proposed.product != stored.product {
        Some("product")
    } else if proposed.zone != stored.zone {
        Some("zone")
    } else if proposed.units != stored.units {
        Some("units")
    } else {
        None
    }
}

/// Reject a client write that touches a derived column or rewrites a sale.
///
/// `before` is the stored row for updates, `None` for inserts.
pub fn check_client_write(before: Option<&Row>, after: &Row) -> DomainResult<()> {
    if let Some((table, column)) = changed_derived(before, after) {
        return Err(DomainError::derived(table, column));
    }
    if let (Some(Row::Purchase(stored)), Row::Purchase(proposed)) = (before, after) {
        if let Some(column) = changed_sale_fact(stored, proposed) {
            return Err(DomainError::recorded("purchase", column));
        }
    }
    Ok(())
}
