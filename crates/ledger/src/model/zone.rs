use serde::{Deserialize, Serialize};

use verdant_core::{DomainResult, Entity, VivariumId, ZoneId};

/// A storage/work zone inside a vivarium.
///
/// `stock_units` and `productivity` are derived and engine-owned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub vivarium: VivariumId,
    pub name: String,
    /// Sum of this zone's inventory allocations.
    pub stock_units: i64,
    /// Sum of the productivity of employees who logged work here.
    pub productivity: f64,
}

impl Zone {
    pub fn new(vivarium: VivariumId, name: impl Into<String>) -> Self {
        Self {
            id: ZoneId::new(),
            vivarium,
            name: name.into(),
            stock_units: 0,
            productivity: 0.0,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        super::require_name("zone", &self.name)
    }
}

impl Entity for Zone {
    type Id = ZoneId;

    fn id(&self) -> ZoneId {
        self.id
    }
}
