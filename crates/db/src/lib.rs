//! Catalog persistence: record models, the `CatalogStore` seam, the store
//! factory, and the `db` core module.

use std::sync::Arc;

use async_trait::async_trait;
use shelf_kernel::settings::DatabaseSettings;
use shelf_kernel::{InitCtx, Module};

pub mod memory;
pub mod models;
pub mod sqlite;
pub mod store;

pub use memory::MemoryStore;
pub use models::{
    Book, BookChanges, BookId, NewBook, NewReview, Review, ReviewId, CATEGORY_MAX_CHARS,
    RATE_RANGE, TITLE_MAX_CHARS,
};
pub use sqlite::SqliteStore;
pub use store::{CatalogStore, DbError};

const MEMORY_SCHEME: &str = "memory://";
const SQLITE_SCHEME: &str = "sqlite:";

/// Shared handle to the configured store.
pub type SharedStore = Arc<dyn CatalogStore>;

/// Open the store named by `settings.endpoint`.
pub fn connect(settings: &DatabaseSettings) -> Result<SharedStore, DbError> {
    if settings.endpoint.starts_with(MEMORY_SCHEME) {
        tracing::info!(target: "shelf-db", endpoint = %settings.endpoint, "using in-process store");
        return Ok(Arc::new(MemoryStore::new()));
    }

    if settings.endpoint.starts_with(SQLITE_SCHEME) {
        tracing::info!(target: "shelf-db", endpoint = %settings.endpoint, "using sqlite store");
        return Ok(Arc::new(SqliteStore::connect_lazy(&settings.endpoint)?));
    }

    Err(DbError::UnsupportedEndpoint(settings.endpoint.clone()))
}

/// Core module owning the store connection for the process lifetime.
pub struct DbModule {
    store: SharedStore,
}

impl DbModule {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Module for DbModule {
    fn name(&self) -> &'static str {
        "db"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let books = self.store.list_books().await?.len();
        let reviews = self.store.list_reviews().await?.len();
        tracing::info!(
            module = self.name(),
            endpoint = %ctx.settings.database.endpoint,
            books,
            reviews,
            "store reachable"
        );
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "store released");
        Ok(())
    }
}

/// Create the `db` core module for `store`.
pub fn create_module(store: SharedStore) -> Arc<dyn Module> {
    Arc::new(DbModule::new(store))
}
