//! Product model

use serde::{Deserialize, Serialize};

use super::{RecordId, SyncEntity};
use crate::error::{Error, Result};

/// A stocked product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Display name, unique among live products (case-insensitive)
    pub name: String,
    /// Owning category
    pub category_id: RecordId,
    /// Unit price
    pub price: f64,
    /// Units in stock
    #[serde(default, alias = "stock")]
    pub quantity: i64,
    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Product {
    /// Create a product with no stock
    #[must_use]
    pub fn new(name: impl Into<String>, category_id: RecordId, price: f64) -> Self {
        Self {
            name: name.into(),
            category_id,
            price,
            quantity: 0,
            description: None,
        }
    }

    /// Set the initial stock
    #[must_use]
    pub const fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = quantity;
        self
    }
}

/// Partial update for a product
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub category_id: Option<RecordId>,
    pub price: Option<f64>,
    pub quantity: Option<i64>,
    pub description: Option<String>,
}

impl SyncEntity for Product {
    type Patch = ProductPatch;

    const KIND: &'static str = "product";
    const COLLECTION: &'static str = "products";
    // Creating a product also records its opening supply: `{product, supply}`
    const CREATED_KEY: Option<&'static str> = Some("product");

    fn apply(&mut self, patch: &Self::Patch) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(category_id) = &patch.category_id {
            self.category_id = category_id.clone();
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
    }

    fn unique_name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput("product name cannot be empty".into()));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(Error::InvalidInput(format!(
                "product price must be a non-negative number, got {}",
                self.price
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_only_touches_given_fields() {
        let mut product = Product::new("Flour", RecordId::from(1), 2.5).with_quantity(4);
        product.apply(&ProductPatch {
            price: Some(3.0),
            ..ProductPatch::default()
        });
        assert_eq!(product.name, "Flour");
        assert_eq!(product.quantity, 4);
        assert!((product.price - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn accepts_stock_alias_from_api() {
        let product: Product =
            serde_json::from_str(r#"{"name":"Rice","category_id":2,"price":1.0,"stock":9}"#)
                .unwrap();
        assert_eq!(product.quantity, 9);
        assert_eq!(product.category_id.as_str(), "2");
    }

    #[test]
    fn rejects_negative_price() {
        assert!(Product::new("Salt", RecordId::from(1), -1.0).validate().is_err());
    }
}
