//! Order model

use serde::{Deserialize, Serialize};

use super::{RecordId, SyncEntity};
use crate::error::{Error, Result};

/// One product line of an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: RecordId,
    pub quantity: i64,
    /// Unit price quoted at order time; the remote store computes the final one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

/// A customer order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub customer_id: RecordId,
    #[serde(default)]
    pub products: Vec<OrderLine>,
}

/// Partial update for an order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderPatch {
    pub customer_id: Option<RecordId>,
    pub products: Option<Vec<OrderLine>>,
}

impl Order {
    /// Total units across all lines
    pub fn total_units(&self) -> i64 {
        self.products.iter().map(|line| line.quantity).sum()
    }
}

impl SyncEntity for Order {
    type Patch = OrderPatch;

    const KIND: &'static str = "order";
    const COLLECTION: &'static str = "orders";

    fn apply(&mut self, patch: &Self::Patch) {
        if let Some(customer_id) = &patch.customer_id {
            self.customer_id = customer_id.clone();
        }
        if let Some(products) = &patch.products {
            self.products.clone_from(products);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.products.is_empty() {
            return Err(Error::InvalidInput("order needs at least one product".into()));
        }
        if let Some(line) = self.products.iter().find(|line| line.quantity <= 0) {
            return Err(Error::InvalidInput(format!(
                "order quantity for product {} must be positive",
                line.product_id
            )));
        }
        Ok(())
    }
}
