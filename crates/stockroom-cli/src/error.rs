use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] stockroom_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Record ID cannot be empty")]
    EmptyRecordId,
    #[error("No {kind} found for id/prefix: {query}")]
    RecordNotFound { kind: &'static str, query: String },
    #[error("{0}")]
    AmbiguousRecordId(String),
    #[error("Nothing to change: pass at least one field to edit")]
    NothingToEdit,
    #[error("Category '{0}' still has products; delete them first or pass --force")]
    CategoryInUse(String),
    #[error("Invalid order line '{0}': expected PRODUCT_ID:QUANTITY[@PRICE]")]
    InvalidOrderLine(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("No API configured. Run `stock config init --api-base-url <URL>` or set STOCKROOM_API_URL.")]
    SyncNotConfigured,
}
