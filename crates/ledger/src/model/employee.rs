use serde::{Deserialize, Serialize};

use verdant_core::{DomainResult, Entity, EmployeeId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    /// Total hours worked divided by 8 (engine-owned).
    pub productivity: f64,
}

impl Employee {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EmployeeId::new(),
            name: name.into(),
            productivity: 0.0,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        super::require_name("employee", &self.name)
    }
}

impl Entity for Employee {
    type Id = EmployeeId;

    fn id(&self) -> EmployeeId {
        self.id
    }
}
