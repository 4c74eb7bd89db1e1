//! The structural contract shared by every synchronizable entity.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::RecordId;
use crate::error::Result;

/// Entity-specific behavior the synchronizer needs to know about.
///
/// Everything else about an entity's fields is opaque to the sync engine.
pub trait SyncEntity:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Partial update accepted by `edit`
    type Patch: fmt::Debug + Clone + Default + Send + Sync;

    /// Singular name used in errors and logs
    const KIND: &'static str;

    /// Local table name and remote collection path segment
    const COLLECTION: &'static str;

    /// Key under the response `data` holding a newly created record, when the
    /// API nests it next to related records
    const CREATED_KEY: Option<&'static str> = None;

    /// Key under the response `data` holding the collection listing, when the
    /// API nests it
    const LISTING_KEY: Option<&'static str> = None;

    /// Merge a partial update into these fields
    fn apply(&mut self, patch: &Self::Patch);

    /// Name that must be unique (case-insensitive) among live records, if any
    fn unique_name(&self) -> Option<&str> {
        None
    }

    /// Local validation run before any write
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Remote path used to create this record
    fn create_path(&self) -> String {
        format!("/{}", Self::COLLECTION)
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// An entity as stored in a local table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<E> {
    /// Authoritative or provisional identity
    pub id: RecordId,
    /// Entity fields
    #[serde(flatten)]
    pub fields: E,
    /// Owed to the remote store
    #[serde(default)]
    pub unsynced: bool,
    /// Tombstone awaiting remote deletion
    #[serde(default, skip_serializing_if = "is_false")]
    pub deleted: bool,
}

impl<E: SyncEntity> Record<E> {
    /// A record that still has to reach the remote store
    pub const fn pending(id: RecordId, fields: E) -> Self {
        Self {
            id,
            fields,
            unsynced: true,
            deleted: false,
        }
    }

    /// A record confirmed by the remote store
    pub const fn confirmed(id: RecordId, fields: E) -> Self {
        Self {
            id,
            fields,
            unsynced: false,
            deleted: false,
        }
    }

    /// Mark as logically removed, pending remote deletion
    #[must_use]
    pub fn into_tombstone(self) -> Self {
        Self {
            unsynced: true,
            deleted: true,
            ..self
        }
    }

    /// Visible to readers (not tombstoned)
    pub const fn is_live(&self) -> bool {
        !self.deleted
    }

    /// Whether this record's name collides with `name` (case-insensitive)
    pub fn has_name(&self, name: &str) -> bool {
        self.fields
            .unique_name()
            .is_some_and(|own| own.to_lowercase() == name.to_lowercase())
    }
}
