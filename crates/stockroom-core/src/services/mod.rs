//! Service layer shared by clients

mod inventory;

pub use inventory::{InventoryService, StockSummary, Synced};
