use serde::{Deserialize, Serialize};

use verdant_core::{DomainError, DomainResult, Entity, InventoryId, ProductId, ZoneId};

/// Units of one product physically held in one zone.
///
/// At most one row exists per (product, zone) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub id: InventoryId,
    pub product: ProductId,
    pub zone: ZoneId,
    pub stock_units: i64,
}

impl Inventory {
    pub fn new(product: ProductId, zone: ZoneId, stock_units: i64) -> Self {
        Self {
            id: InventoryId::new(),
            product,
            zone,
            stock_units,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.stock_units < 0 {
            return Err(DomainError::validation("inventory stock_units cannot be negative"));
        }
        Ok(())
    }
}

impl Entity for Inventory {
    type Id = InventoryId;

    fn id(&self) -> InventoryId {
        self.id
    }
}
