use std::sync::Arc;

use thiserror::Error;

use catalog_infra::{
    seed, CatalogConfig, CatalogStore, InMemoryCatalogStore, PostgresCatalogStore,
    ProductCatalog, StoreBackend, StoreError,
};

/// Services shared by every handler.
#[derive(Clone)]
pub struct AppServices {
    pub catalog: ProductCatalog,
}

impl AppServices {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            catalog: ProductCatalog::new(store),
        }
    }
}

#[derive(Debug, Error)]
pub enum ServicesError {
    #[error("failed to prepare postgres store: {0}")]
    Postgres(#[from] StoreError),
}

fn build_in_memory_store(seed_demo_data: bool) -> Arc<dyn CatalogStore> {
    if seed_demo_data {
        Arc::new(InMemoryCatalogStore::with_reference_data(
            &seed::demo_categories(),
            &seed::demo_tags(),
        ))
    } else {
        Arc::new(InMemoryCatalogStore::new())
    }
}

async fn build_postgres_store(
    database_url: &str,
    max_connections: u32,
    seed_demo_data: bool,
) -> Result<Arc<dyn CatalogStore>, ServicesError> {
    let store = PostgresCatalogStore::connect(database_url, max_connections).await?;
    store.ensure_schema().await?;
    if seed_demo_data {
        store
            .seed_reference_data(&seed::demo_categories(), &seed::demo_tags())
            .await?;
    }
    Ok(Arc::new(store))
}

/// Wire the store selected by configuration into the service set.
pub async fn build_services(config: &CatalogConfig) -> Result<AppServices, ServicesError> {
    let store = match &config.backend {
        StoreBackend::InMemory => {
            tracing::info!(seed = config.seed_demo_data, "using in-memory catalog store");
            build_in_memory_store(config.seed_demo_data)
        }
        StoreBackend::Postgres {
            database_url,
            max_connections,
        } => {
            tracing::info!(max_connections, "using postgres catalog store");
            build_postgres_store(database_url, *max_connections, config.seed_demo_data).await?
        }
    };
    Ok(AppServices::new(store))
}
