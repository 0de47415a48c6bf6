//! Product catalog service (application-level orchestration).
//!
//! `ProductCatalog` sits between the HTTP handlers and a [`CatalogStore`]. It
//! owns the multi-step sequences (create then link tags, update then reconcile
//! tags) and maps "zero rows matched" to [`CatalogError::NotFound`].
//!
//! No sequence here is transactional. If the tag bulk insert of a create fails,
//! the product row stays; if one half of a tag reconciliation fails, the other
//! half may still have been applied.

use std::sync::Arc;

use thiserror::Error;
use tracing::{instrument, warn};

use catalog_core::{DomainError, ProductId};
use catalog_products::{
    plan_tag_sync, NewProduct, Product, ProductChanges, ProductDetails, TagIds, TagSyncPlan,
};

use crate::store::{CatalogStore, StoreError};

#[derive(Debug, Error)]
pub enum CatalogError {
    /// No product matched the identifier.
    #[error("product not found")]
    NotFound,

    /// The payload was rejected before reaching the store.
    #[error(transparent)]
    Invalid(#[from] DomainError),

    /// The store rejected or failed the operation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Product CRUD over an injected store handle.
#[derive(Clone)]
pub struct ProductCatalog {
    store: Arc<dyn CatalogStore>,
}

impl ProductCatalog {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self), err)]
    pub async fn list(&self) -> CatalogResult<Vec<ProductDetails>> {
        Ok(self.store.list_products().await?)
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    pub async fn get(&self, id: ProductId) -> CatalogResult<ProductDetails> {
        self.store
            .find_product(id)
            .await?
            .ok_or(CatalogError::NotFound)
    }

    /// Insert the product, then link its initial tags.
    #[instrument(skip(self, payload), fields(tag_count = payload.initial_tags().len()), err)]
    pub async fn create(&self, payload: NewProduct) -> CatalogResult<Product> {
        payload.validate()?;

        let product = self.store.insert_product(&payload).await?;

        let tags = payload.initial_tags();
        if !tags.is_empty() {
            if let Err(e) = self.store.bulk_insert_product_tags(product.id, tags).await {
                warn!(product_id = %product.id, "product created but tag links failed: {e}");
                return Err(e.into());
            }
        }

        Ok(product)
    }

    /// Apply field changes, then reconcile tags if a non-empty tag list was sent.
    ///
    /// The payload is validated before the product is looked up, so an invalid
    /// payload is rejected even for an unknown id.
    #[instrument(skip(self, changes), fields(product_id = %id), err)]
    pub async fn update(&self, id: ProductId, changes: ProductChanges) -> CatalogResult<()> {
        changes.validate()?;

        let matched = self.store.update_product(id, &changes).await?;
        if matched == 0 {
            return Err(CatalogError::NotFound);
        }

        if let Some(desired) = changes.requested_tags() {
            self.sync_tags(id, desired).await?;
        }
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    pub async fn delete(&self, id: ProductId) -> CatalogResult<()> {
        match self.store.delete_product(id).await? {
            0 => Err(CatalogError::NotFound),
            _ => Ok(()),
        }
    }

    /// Removal and addition run concurrently; both finish before this returns.
    async fn sync_tags(&self, id: ProductId, desired: &TagIds) -> CatalogResult<TagSyncPlan> {
        let existing = self.store.product_tags_for(id).await?;
        let plan = plan_tag_sync(&existing, desired);
        if plan.is_noop() {
            return Ok(plan);
        }

        let (removed, added) = tokio::join!(
            self.store.delete_product_tags(&plan.to_remove),
            self.store.bulk_insert_product_tags(id, &plan.to_add),
        );

        if let Err(e) = &removed {
            warn!(product_id = %id, "removing tag links failed: {e}");
        }
        if let Err(e) = &added {
            warn!(product_id = %id, "adding tag links failed: {e}");
        }
        removed?;
        added?;

        Ok(plan)
    }
}
