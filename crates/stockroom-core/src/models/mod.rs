//! Data models for Stockroom

mod category;
mod customer;
mod id;
mod order;
mod product;
mod record;
mod supply;

pub use category::{Category, CategoryPatch};
pub use customer::{Customer, CustomerPatch};
pub use id::{RecordId, PROVISIONAL_PREFIX};
pub use order::{Order, OrderLine, OrderPatch};
pub use product::{Product, ProductPatch};
pub use record::{Record, SyncEntity};
pub use supply::{Supply, SupplyPatch};
