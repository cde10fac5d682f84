//! Domain error model.

use thiserror::Error;

use crate::id::{ProductId, ZoneId};

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// These are caller-input failures: the request was rejected, nothing was
/// written. Engine faults (runaway cascades, broken invariants) live in the
/// engine crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. negative stock, empty name).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An inventory allocation would push a product over its stock ceiling.
    #[error(
        "stock ceiling exceeded for product {product}: requested {requested}, already allocated {allocated}, ceiling {ceiling}"
    )]
    StockCeilingExceeded {
        product: ProductId,
        requested: i64,
        allocated: i64,
        ceiling: i64,
    },

    /// A purchase asks for more units than the (product, zone) allocation holds.
    #[error("insufficient stock for product {product} in zone {zone:?}: requested {requested}, available {available}")]
    InsufficientStock {
        product: ProductId,
        zone: Option<ZoneId>,
        requested: i64,
        available: i64,
    },

    /// A caller tried to write an engine-owned column.
    #[error("{table}.{column} is derived and cannot be written directly")]
    DerivedFieldWrite {
        table: &'static str,
        column: &'static str,
    },

    /// A caller tried to rewrite a fact that is fixed once recorded.
    #[error("{table}.{column} is fixed once recorded")]
    RecordedFactWrite {
        table: &'static str,
        column: &'static str,
    },
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn derived(table: &'static str, column: &'static str) -> Self {
        Self::DerivedFieldWrite { table, column }
    }

    pub fn recorded(table: &'static str, column: &'static str) -> Self {
        Self::RecordedFactWrite { table, column }
    }
}
