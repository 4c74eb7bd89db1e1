//! Authoritative remote store abstraction.

mod auth;
mod http;
#[cfg(test)]
pub(crate) mod stub;

pub use auth::Session;
pub use http::{ApiClient, HttpRemote};

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Record, RecordId, SyncEntity};

/// Per-entity client for the authoritative API.
///
/// Every call fails with `Error::RemoteUnavailable` or `Error::RemoteRejected`
/// when the store cannot be reached or refuses the request, and with
/// `Error::UnreadableResponse` when it applied the request but answered with
/// a body that cannot be decoded. Records returned
/// by `create` and `update` always carry the authoritative id and the full
/// canonical fields.
#[async_trait]
pub trait RemoteClient<E: SyncEntity>: Send + Sync {
    /// Create a record from its fields
    async fn create(&self, fields: &E) -> Result<Record<E>>;

    /// Overwrite the fields of an existing record
    async fn update(&self, id: &RecordId, fields: &E) -> Result<Record<E>>;

    /// Delete a record
    async fn delete(&self, id: &RecordId) -> Result<()>;

    /// Fetch the full authoritative collection
    async fn list_all(&self) -> Result<Vec<Record<E>>>;
}
