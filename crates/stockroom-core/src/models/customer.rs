//! Customer model

use serde::{Deserialize, Serialize};

use super::SyncEntity;
use crate::error::{Error, Result};

/// A customer placing orders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Display name, unique among live customers (case-insensitive)
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Customer {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: None,
            address: None,
        }
    }
}

/// Partial update for a customer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl SyncEntity for Customer {
    type Patch = CustomerPatch;

    const KIND: &'static str = "customer";
    const COLLECTION: &'static str = "customers";
    // The listing also carries the products offered in the order form
    const LISTING_KEY: Option<&'static str> = Some("customers");

    fn apply(&mut self, patch: &Self::Patch) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(phone) = &patch.phone {
            self.phone = Some(phone.clone());
        }
        if let Some(address) = &patch.address {
            self.address = Some(address.clone());
        }
    }

    fn unique_name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput("customer name cannot be empty".into()));
        }
        Ok(())
    }
}
