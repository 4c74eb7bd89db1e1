//! Category model

use serde::{Deserialize, Serialize};

use super::SyncEntity;
use crate::error::{Error, Result};

/// A product category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Display name, unique among live categories (case-insensitive)
    pub name: String,
}

impl Category {
    /// Create a category with the given name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Partial update for a category
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryPatch {
    pub name: Option<String>,
}

impl SyncEntity for Category {
    type Patch = CategoryPatch;

    const KIND: &'static str = "category";
    const COLLECTION: &'static str = "categories";

    fn apply(&mut self, patch: &Self::Patch) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
    }

    fn unique_name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput("category name cannot be empty".into()));
        }
        Ok(())
    }
}
