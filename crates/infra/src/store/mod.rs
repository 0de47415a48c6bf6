//! Relational catalog storage.
//!
//! `CatalogStore` is the only seam between the catalog service and whatever
//! holds the rows. Two implementations ship:
//!
//! - [`InMemoryCatalogStore`]: tests/dev, emulates foreign keys and cascades
//! - [`PostgresCatalogStore`]: production, backed by a `sqlx::PgPool`
//!
//! Every method is a single store round trip. Nothing here spans calls with a
//! transaction; callers composing several calls get no atomicity.

use async_trait::async_trait;
use thiserror::Error;

use catalog_core::{ProductId, ProductTagId, TagId};
use catalog_products::{NewProduct, Product, ProductChanges, ProductDetails, ProductTag};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryCatalogStore;
pub use postgres::PostgresCatalogStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store operation error.
///
/// These are infrastructure errors. Callers surface the message as-is.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A foreign key, uniqueness, check, or not-null constraint rejected the write.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// The store could not be reached (pool closed, IO failure, poisoned lock).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Any other query failure.
    #[error("query failed: {0}")]
    Query(String),
}

/// Data-access primitives the catalog service is built on.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// All products with category and tags loaded, ascending by id.
    async fn list_products(&self) -> StoreResult<Vec<ProductDetails>>;

    /// One product with category and tags loaded.
    async fn find_product(&self, id: ProductId) -> StoreResult<Option<ProductDetails>>;

    /// Insert the product row only. Tag links are written separately.
    async fn insert_product(&self, new: &NewProduct) -> StoreResult<Product>;

    /// Apply field changes; returns the number of rows matched.
    async fn update_product(&self, id: ProductId, changes: &ProductChanges) -> StoreResult<u64>;

    /// Delete the product (join rows cascade); returns the number of rows deleted.
    async fn delete_product(&self, id: ProductId) -> StoreResult<u64>;

    /// Join rows for one product, ascending by join-row id.
    async fn product_tags_for(&self, product_id: ProductId) -> StoreResult<Vec<ProductTag>>;

    /// Insert one join row per tag id in a single statement.
    async fn bulk_insert_product_tags(
        &self,
        product_id: ProductId,
        tag_ids: &[TagId],
    ) -> StoreResult<Vec<ProductTag>>;

    /// Delete join rows by id; returns the number deleted.
    async fn delete_product_tags(&self, ids: &[ProductTagId]) -> StoreResult<u64>;
}
