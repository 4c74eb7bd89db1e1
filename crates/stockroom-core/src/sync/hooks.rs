//! Entity-specific side effects run inside `create`.

use async_trait::async_trait;

use crate::db::LocalTable;
use crate::error::{Error, Result};
use crate::models::{Product, Record, Supply, SyncEntity};

/// Local side effect of creating a record.
///
/// Runs after the new record is written locally and before any remote call,
/// so its effect is visible even if the network call never completes. An
/// error removes the new record again and aborts the create.
#[async_trait]
pub trait CreateHook<E: SyncEntity>: Send + Sync {
    async fn on_create(&self, fields: &E) -> Result<()>;
}

/// No side effect
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHook;

#[async_trait]
impl<E: SyncEntity> CreateHook<E> for NoHook {
    async fn on_create(&self, _fields: &E) -> Result<()> {
        Ok(())
    }
}

/// Adds a supply's quantity to the referenced product's stock
pub struct RestockProduct<T> {
    products: T,
}

impl<T> RestockProduct<T> {
    pub const fn new(products: T) -> Self {
        Self { products }
    }
}

#[async_trait]
impl<T: LocalTable<Product>> CreateHook<Supply> for RestockProduct<T> {
    async fn on_create(&self, supply: &Supply) -> Result<()> {
        let _lock = self.products.lock().await;

        let Some(mut product) = self
            .products
            .get(&supply.product_id)
            .await?
            .filter(Record::is_live)
        else {
            return Err(Error::not_found(Product::KIND, &supply.product_id));
        };

        product.fields.quantity += supply.quantity;
        product.unsynced = true;
        self.products.put(&product).await?;

        tracing::debug!(
            "Restocked {} {} by {} (now {})",
            Product::KIND,
            product.id,
            supply.quantity,
            product.fields.quantity
        );
        Ok(())
    }
}
