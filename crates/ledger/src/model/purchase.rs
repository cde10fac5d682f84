use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use verdant_core::{
    ClientId, DomainError, DomainResult, EmployeeId, Entity, ProductId, PurchaseId, ZoneId,
};

/// A sale of `units` of a product, taken from one zone's inventory.
///
/// `client`, `employee` and `zone` are nulled when the referenced row is
/// deleted; the sale itself is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: PurchaseId,
    pub product: ProductId,
    pub client: Option<ClientId>,
    pub employee: Option<EmployeeId>,
    pub zone: Option<ZoneId>,
    pub units: i64,
    pub occurred_at: DateTime<Utc>,
}

impl Purchase {
    pub fn new(product: ProductId, zone: ZoneId, units: i64) -> Self {
        Self {
            id: PurchaseId::new(),
            product,
            client: None,
            employee: None,
            zone: Some(zone),
            units,
            occurred_at: Utc::now(),
        }
    }

    pub fn by_client(mut self, client: ClientId) -> Self {
        self.client = Some(client);
        self
    }

    pub fn served_by(mut self, employee: EmployeeId) -> Self {
        self.employee = Some(employee);
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.units <= 0 {
            return Err(DomainError::validation("purchase units must be positive"));
        }
        Ok(())
    }
}

impl Entity for Purchase {
    type Id = PurchaseId;

    fn id(&self) -> PurchaseId {
        self.id
    }
}
