use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use verdant_core::{DomainError, DomainResult, EmployeeId, Entity, WorkId, ZoneId};

/// An employee's assignment to a zone for an interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Work {
    pub id: WorkId,
    pub employee: EmployeeId,
    pub zone: ZoneId,
    pub started_at: DateTime<Utc>,
    /// `None` while the assignment is still open.
    pub ended_at: Option<DateTime<Utc>>,
    pub hours_worked: i64,
}

impl Work {
    pub fn new(
        employee: EmployeeId,
        zone: ZoneId,
        started_at: DateTime<Utc>,
        hours_worked: i64,
    ) -> Self {
        Self {
            id: WorkId::new(),
            employee,
            zone,
            started_at,
            ended_at: None,
            hours_worked,
        }
    }

    pub fn ended(mut self, ended_at: DateTime<Utc>) -> Self {
        self.ended_at = Some(ended_at);
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.hours_worked < 0 {
            return Err(DomainError::validation("work hours_worked cannot be negative"));
        }
        if let Some(end) = self.ended_at {
            if end < self.started_at {
                return Err(DomainError::validation("work cannot end before it starts"));
            }
        }
        Ok(())
    }
}

impl Entity for Work {
    type Id = WorkId;

    fn id(&self) -> WorkId {
        self.id
    }
}
