//! Infrastructure layer: storage backends, the catalog service, config.

pub mod catalog;
pub mod config;
pub mod seed;
pub mod store;

pub use catalog::{CatalogError, CatalogResult, ProductCatalog};
pub use config::{CatalogConfig, ConfigError, StoreBackend};
pub use store::{CatalogStore, InMemoryCatalogStore, PostgresCatalogStore, StoreError};
