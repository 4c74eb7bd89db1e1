//! Inventory service: one local store, one connectivity signal and a
//! synchronizer per entity, wired the same way for every client.

use std::path::Path;
use std::sync::Arc;

use crate::config::SyncSettings;
use crate::connectivity::Connectivity;
use crate::db::{LibSqlTable, LocalStore, LocalTable};
use crate::models::{Category, Customer, Order, Product, Record, RecordId, Supply, SyncEntity};
use crate::remote::{ApiClient, HttpRemote};
use crate::sync::{
    EntitySynchronizer, NoHook, RestockProduct, SweepReport, SyncOrchestrator, SyncTarget,
};
use crate::Result;

/// Synchronizer over the libSQL store and the HTTP API
pub type Synced<E, H = NoHook> = EntitySynchronizer<E, LibSqlTable<E>, HttpRemote<E>, H>;

type Supplies = Synced<Supply, RestockProduct<LibSqlTable<Product>>>;

/// Offline dashboard figures
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockSummary {
    pub categories: usize,
    pub products: usize,
    /// Sum of live product quantities
    pub units_in_stock: i64,
    pub customers: usize,
    pub orders: usize,
    /// Records owed to the remote store, per entity kind
    pub pending: Vec<(&'static str, usize)>,
}

impl StockSummary {
    pub fn total_pending(&self) -> usize {
        self.pending.iter().map(|(_, count)| count).sum()
    }
}

/// Thread-safe facade over every entity synchronizer.
#[derive(Clone)]
pub struct InventoryService {
    store: LocalStore,
    connectivity: Connectivity,
    client: Option<ApiClient>,
    settings: SyncSettings,
    categories: Arc<Synced<Category>>,
    products: Arc<Synced<Product>>,
    supplies: Arc<Supplies>,
    customers: Arc<Synced<Customer>>,
    orders: Arc<Synced<Order>>,
}

impl InventoryService {
    /// Open the service over a database file
    pub async fn open(db_path: impl AsRef<Path>, settings: SyncSettings) -> Result<Self> {
        let store = LocalStore::open(db_path).await?;
        Self::with_store(store, settings).await
    }

    /// Open an in-memory service (primarily for tests)
    pub async fn open_in_memory(settings: SyncSettings) -> Result<Self> {
        let store = LocalStore::open_in_memory().await?;
        Self::with_store(store, settings).await
    }

    async fn with_store(store: LocalStore, settings: SyncSettings) -> Result<Self> {
        let client = settings
            .remote()?
            .map(|remote| ApiClient::new(&remote))
            .transpose()?;
        if client.is_none() {
            tracing::info!("Running in local-only mode (no API configured)");
        }
        let connectivity = Connectivity::new(false);

        let builder = Builder {
            store: &store,
            client: client.as_ref(),
            connectivity: &connectivity,
            settings: &settings,
        };
        let categories = Arc::new(builder.synchronizer::<Category>());
        let products = Arc::new(builder.synchronizer::<Product>());
        let supplies = Arc::new(
            builder
                .synchronizer::<Supply>()
                .with_hook(RestockProduct::new(store.table::<Product>())),
        );
        let customers = Arc::new(builder.synchronizer::<Customer>());
        let orders = Arc::new(builder.synchronizer::<Order>());

        let service = Self {
            store,
            connectivity,
            client,
            settings,
            categories,
            products,
            supplies,
            customers,
            orders,
        };
        service.load_all().await?;
        Ok(service)
    }

    pub fn categories(&self) -> &Synced<Category> {
        &self.categories
    }

    pub fn products(&self) -> &Synced<Product> {
        &self.products
    }

    pub fn supplies(&self) -> &Synced<Supply, RestockProduct<LibSqlTable<Product>>> {
        &self.supplies
    }

    pub fn customers(&self) -> &Synced<Customer> {
        &self.customers
    }

    pub fn orders(&self) -> &Synced<Order> {
        &self.orders
    }

    pub const fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    pub const fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Whether an API is configured at all
    pub const fn has_remote(&self) -> bool {
        self.client.is_some()
    }

    /// Ping the API and publish the result on the connectivity signal
    pub async fn check_connection(&self) -> bool {
        let online = match &self.client {
            Some(client) => client.ping().await,
            None => false,
        };
        self.connectivity.set_online(online);
        online
    }

    /// Record a delivery; the product's stock goes up locally right away
    pub async fn receive_supply(&self, supply: Supply) -> Result<Record<Supply>> {
        let record = self.supplies.create(supply).await?;
        self.products.load().await?;
        Ok(record)
    }

    /// Whether any live product references the category
    pub async fn category_has_products(&self, category_id: &RecordId) -> Result<bool> {
        let products = self.store.table::<Product>().get_all().await?;
        Ok(products
            .iter()
            .any(|product| product.is_live() && &product.fields.category_id == category_id))
    }

    /// Counts over the local tables, usable offline
    pub async fn summary(&self) -> Result<StockSummary> {
        let products = live(&self.store.table::<Product>()).await?;
        let mut pending = Vec::new();
        for target in self.targets() {
            pending.push((target.kind(), target.pending().await?));
        }

        Ok(StockSummary {
            categories: live(&self.store.table::<Category>()).await?.len(),
            units_in_stock: products.iter().map(|product| product.fields.quantity).sum(),
            products: products.len(),
            customers: live(&self.store.table::<Customer>()).await?.len(),
            orders: live(&self.store.table::<Order>()).await?.len(),
            pending,
        })
    }

    /// Every synchronizer, in sweep order
    pub fn targets(&self) -> Vec<Arc<dyn SyncTarget>> {
        let targets: [Arc<dyn SyncTarget>; 5] = [
            self.categories.clone(),
            self.products.clone(),
            self.supplies.clone(),
            self.customers.clone(),
            self.orders.clone(),
        ];
        targets.into()
    }

    /// Orchestrator over every synchronizer, using the configured interval
    pub fn orchestrator(&self) -> SyncOrchestrator {
        self.targets().into_iter().fold(
            SyncOrchestrator::new(self.connectivity.clone(), self.settings.sweep_interval()),
            SyncOrchestrator::with_target,
        )
    }

    /// Push pending changes of every entity now
    pub async fn sync_now(&self) -> SweepReport {
        self.orchestrator().sweep_all().await
    }

    /// Refresh every entity from the API (or the local tables when offline)
    pub async fn refresh_all(&self) {
        self.orchestrator().refresh_all().await;
    }

    async fn load_all(&self) -> Result<()> {
        self.categories.load().await?;
        self.products.load().await?;
        self.supplies.load().await?;
        self.customers.load().await?;
        self.orders.load().await
    }
}

struct Builder<'a> {
    store: &'a LocalStore,
    client: Option<&'a ApiClient>,
    connectivity: &'a Connectivity,
    settings: &'a SyncSettings,
}

impl Builder<'_> {
    fn synchronizer<E: SyncEntity>(&self) -> Synced<E> {
        EntitySynchronizer::new(
            self.store.table::<E>(),
            self.client.map(ApiClient::collection::<E>),
            self.connectivity.clone(),
        )
        .with_refresh_policy(self.settings.refresh_policy)
    }
}

async fn live<E: SyncEntity>(table: &LibSqlTable<E>) -> Result<Vec<Record<E>>> {
    Ok(table
        .get_all()
        .await?
        .into_iter()
        .filter(Record::is_live)
        .collect())
}
