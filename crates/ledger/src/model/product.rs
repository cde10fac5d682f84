use serde::{Deserialize, Serialize};

use verdant_core::{DomainError, DomainResult, Entity, ProductId};

/// A sellable product.
///
/// `stock_units` is the authoritative total: the ceiling that the sum of all
/// inventory allocations of this product may never exceed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub stock_units: i64,
    /// Unit price in the smallest currency unit (e.g. cents).
    pub price: i64,
}

impl Product {
    pub fn new(name: impl Into<String>, stock_units: i64, price: i64) -> Self {
        Self {
            id: ProductId::new(),
            name: name.into(),
            stock_units,
            price,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        super::require_name("product", &self.name)?;
        if self.stock_units < 0 {
            return Err(DomainError::validation("product stock_units cannot be negative"));
        }
        if self.price < 0 {
            return Err(DomainError::validation("product price cannot be negative"));
        }
        Ok(())
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_ceiling_and_price() {
        assert!(Product::new("Fern", -1, 100).validate().is_err());
        assert!(Product::new("Fern", 1, -100).validate().is_err());
        assert!(Product::new("Fern", 0, 0).validate().is_ok());
    }
}
