use serde::{Deserialize, Serialize};

use verdant_core::{DomainResult, Entity, VivariumId};

/// A greenhouse/vivarium: the owner of storage zones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vivarium {
    pub id: VivariumId,
    pub name: String,
}

impl Vivarium {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: VivariumId::new(),
            name: name.into(),
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        super::require_name("vivarium", &self.name)
    }
}

impl Entity for Vivarium {
    type Id = VivariumId;

    fn id(&self) -> VivariumId {
        self.id
    }
}
