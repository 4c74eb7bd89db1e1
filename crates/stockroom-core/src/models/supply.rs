//! Supply model: a stock delivery for one product

use serde::{Deserialize, Serialize};

use super::{RecordId, SyncEntity};
use crate::error::{Error, Result};

/// Units received for a product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supply {
    /// Supplied product
    pub product_id: RecordId,
    /// Units received
    pub quantity: i64,
}

/// Partial update for a supply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupplyPatch {
    pub quantity: Option<i64>,
}

impl SyncEntity for Supply {
    type Patch = SupplyPatch;

    const KIND: &'static str = "supply";
    const COLLECTION: &'static str = "supplies";

    fn apply(&mut self, patch: &Self::Patch) {
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.quantity <= 0 {
            return Err(Error::InvalidInput(format!(
                "supply quantity must be positive, got {}",
                self.quantity
            )));
        }
        Ok(())
    }

    fn create_path(&self) -> String {
        format!("/products/{}/supplies", self.product_id)
    }
}
