//! Engine error model.
//!
//! Two families share one enum:
//!
//! - **caller errors** (`Domain`, `Store`): the request was bad; surfaced verbatim
//! - **engine faults** (`CascadeLimitExceeded`, `ConsistencyViolation`): a rule
//!   is mis-wired or the engine itself is wrong
//!
//! Both abort the transaction. `is_engine_fault()` tells them apart for logging.

use thiserror::Error;

use verdant_core::DomainError;
use verdant_ledger::StoreError;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// A guard or validation rejected the write.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The ledger refused the write (missing row, foreign key, duplicate, aggregate overflow).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Rule-issued writes recursed past the configured bound.
    #[error("cascade depth {depth} exceeds limit {limit} (write issued by {issued_by})")]
    CascadeLimitExceeded {
        depth: u32,
        limit: u32,
        issued_by: String,
    },

    /// A derived field disagrees with its base facts at commit time.
    #[error("consistency violation: {0}")]
    ConsistencyViolation(String),

    #[error("invalid engine configuration: {0}")]
    Config(String),
}

impl EngineError {
    /// True when the error signals an engine/rule defect rather than bad input.
    pub fn is_engine_fault(&self) -> bool {
        matches!(
            self,
            EngineError::CascadeLimitExceeded { .. } | EngineError::ConsistencyViolation(_)
        )
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        EngineError::Domain(DomainError::not_found(what))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdant_core::ProductId;

    #[test]
    fn guard_rejections_are_not_engine_faults() {
        let err = EngineError::from(DomainError::InsufficientStock {
            product: ProductId::new(),
            zone: None,
            requested: 3,
            available: 2,
        });
        assert!(!err.is_engine_fault());
    }

    #[test]
    fn cascade_trip_is_an_engine_fault() {
        let err = EngineError::CascadeLimitExceeded {
            depth: 9,
            limit: 8,
            issued_by: "rule:zone_stock".into(),
        };
        assert!(err.is_engine_fault());
        assert_eq!(
            err.to_string(),
            "cascade depth 9 exceeds limit 8 (write issued by rule:zone_stock)"
        );
    }
}
