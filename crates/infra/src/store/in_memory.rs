use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use catalog_core::{CategoryId, Entity, ProductId, ProductTagId, TagId};
use catalog_products::{
    Category, NewProduct, Product, ProductChanges, ProductDetails, ProductTag, Tag,
};

use super::{CatalogStore, StoreError, StoreResult};

/// Rows of one entity type keyed by id, plus the id sequence.
#[derive(Debug)]
struct Table<E: Entity> {
    rows: BTreeMap<E::Id, E>,
    next_id: i64,
}

impl<E> Table<E>
where
    E: Entity,
    E::Id: Into<i64>,
{
    fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn allocate(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn insert(&mut self, row: E) {
        let id = row.id();
        // Keep the sequence ahead of explicitly-keyed rows (seed data).
        self.next_id = self.next_id.max(id.into() + 1);
        self.rows.insert(id, row);
    }

    fn get(&self, id: &E::Id) -> Option<&E> {
        self.rows.get(id)
    }

    fn values(&self) -> impl Iterator<Item = &E> {
        self.rows.values()
    }
}

#[derive(Debug)]
struct Tables {
    categories: Table<Category>,
    tags: Table<Tag>,
    products: Table<Product>,
    product_tags: Table<ProductTag>,
}

impl Tables {
    fn details(&self, product: &Product) -> ProductDetails {
        let category = product
            .category_id
            .and_then(|id| self.categories.get(&id))
            .cloned();
        let tags = self
            .product_tags
            .values()
            .filter(|row| row.product_id == product.id)
            .filter_map(|row| self.tags.get(&row.tag_id))
            .cloned()
            .collect();
        ProductDetails {
            product: product.clone(),
            category,
            tags,
        }
    }

    fn check_category(&self, id: Option<CategoryId>) -> StoreResult<()> {
        match id {
            Some(id) if self.categories.get(&id).is_none() => Err(StoreError::Constraint(
                format!("category {id} does not exist"),
            )),
            _ => Ok(()),
        }
    }
}

/// In-memory catalog store for tests/dev.
///
/// Emulates the relational rules the Postgres schema enforces: foreign keys
/// on category and tag references, `(product_id, tag_id)` uniqueness, and the
/// cascade from product to join rows. Bulk inserts are all-or-nothing.
#[derive(Debug)]
pub struct InMemoryCatalogStore {
    inner: RwLock<Tables>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Tables {
                categories: Table::new(),
                tags: Table::new(),
                products: Table::new(),
                product_tags: Table::new(),
            }),
        }
    }

    /// Store pre-populated with reference rows (categories and tags keep their ids).
    pub fn with_reference_data(categories: &[Category], tags: &[Tag]) -> Self {
        let store = Self::new();
        if let Ok(mut t) = store.inner.write() {
            for c in categories {
                t.categories.insert(c.clone());
            }
            for tag in tags {
                t.tags.insert(tag.clone());
            }
        }
        store
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }
}

impl Default for InMemoryCatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn list_products(&self) -> StoreResult<Vec<ProductDetails>> {
        let t = self.read()?;
        Ok(t.products.values().map(|p| t.details(p)).collect())
    }

    async fn find_product(&self, id: ProductId) -> StoreResult<Option<ProductDetails>> {
        let t = self.read()?;
        Ok(t.products.get(&id).map(|p| t.details(p)))
    }

    async fn insert_product(&self, new: &NewProduct) -> StoreResult<Product> {
        let mut t = self.write()?;
        t.check_category(new.category_id)?;

        let product = Product {
            id: ProductId::new(t.products.allocate()),
            name: new.name.clone(),
            price: new.price,
            stock: new.stock,
            category_id: new.category_id,
        };
        t.products.insert(product.clone());
        Ok(product)
    }

    async fn update_product(&self, id: ProductId, changes: &ProductChanges) -> StoreResult<u64> {
        let mut t = self.write()?;
        if t.products.get(&id).is_none() {
            return Ok(0);
        }
        if let Some(category_id) = changes.category_id {
            t.check_category(category_id)?;
        }

        match t.products.rows.get_mut(&id) {
            Some(product) => {
                changes.apply_to(product);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<u64> {
        let mut t = self.write()?;
        if t.products.rows.remove(&id).is_none() {
            return Ok(0);
        }
        t.product_tags.rows.retain(|_, row| row.product_id != id);
        Ok(1)
    }

    async fn product_tags_for(&self, product_id: ProductId) -> StoreResult<Vec<ProductTag>> {
        let t = self.read()?;
        Ok(t.product_tags
            .values()
            .filter(|row| row.product_id == product_id)
            .copied()
            .collect())
    }

    async fn bulk_insert_product_tags(
        &self,
        product_id: ProductId,
        tag_ids: &[TagId],
    ) -> StoreResult<Vec<ProductTag>> {
        let mut t = self.write()?;

        if t.products.get(&product_id).is_none() {
            return Err(StoreError::Constraint(format!(
                "product {product_id} does not exist"
            )));
        }
        for (idx, tag_id) in tag_ids.iter().enumerate() {
            if t.tags.get(tag_id).is_none() {
                return Err(StoreError::Constraint(format!("tag {tag_id} does not exist")));
            }
            let linked = t
                .product_tags
                .values()
                .any(|row| row.product_id == product_id && row.tag_id == *tag_id);
            if linked || tag_ids[..idx].contains(tag_id) {
                return Err(StoreError::Constraint(format!(
                    "product {product_id} is already tagged with {tag_id}"
                )));
            }
        }

        let mut inserted = Vec::with_capacity(tag_ids.len());
        for tag_id in tag_ids {
            let row = ProductTag {
                id: ProductTagId::new(t.product_tags.allocate()),
                product_id,
                tag_id: *tag_id,
            };
            t.product_tags.insert(row);
            inserted.push(row);
        }
        Ok(inserted)
    }

    async fn delete_product_tags(&self, ids: &[ProductTagId]) -> StoreResult<u64> {
        let mut t = self.write()?;
        let before = t.product_tags.rows.len();
        t.product_tags.rows.retain(|id, _| !ids.contains(id));
        Ok((before - t.product_tags.rows.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InMemoryCatalogStore {
        InMemoryCatalogStore::with_reference_data(
            &[Category {
                id: CategoryId::new(1),
                name: "Shirts".to_string(),
            }],
            &[
                Tag {
                    id: TagId::new(1),
                    name: "red".to_string(),
                },
                Tag {
                    id: TagId::new(2),
                    name: "blue".to_string(),
                },
            ],
        )
    }

    fn shirt(category_id: Option<CategoryId>) -> NewProduct {
        NewProduct {
            name: "Plain T-Shirt".to_string(),
            price: 14.99,
            stock: 14,
            category_id,
            tag_ids: None,
        }
    }

    #[tokio::test]
    async fn insert_assigns_increasing_ids() {
        let store = store();
        let a = store.insert_product(&shirt(None)).await.unwrap();
        let b = store.insert_product(&shirt(None)).await.unwrap();
        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn insert_rejects_unknown_category() {
        let store = store();
        let err = store
            .insert_product(&shirt(Some(CategoryId::new(99))))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[tokio::test]
    async fn find_loads_category_and_tags() {
        let store = store();
        let p = store
            .insert_product(&shirt(Some(CategoryId::new(1))))
            .await
            .unwrap();
        store
            .bulk_insert_product_tags(p.id, &[TagId::new(2), TagId::new(1)])
            .await
            .unwrap();

        let details = store.find_product(p.id).await.unwrap().unwrap();
        assert_eq!(details.category.unwrap().name, "Shirts");
        let mut tag_ids = details.tags.iter().map(|t| t.id.get()).collect::<Vec<_>>();
        tag_ids.sort();
        assert_eq!(tag_ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn bulk_insert_is_all_or_nothing() {
        let store = store();
        let p = store.insert_product(&shirt(None)).await.unwrap();

        let err = store
            .bulk_insert_product_tags(p.id, &[TagId::new(1), TagId::new(42)])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
        assert!(store.product_tags_for(p.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn bulk_insert_rejects_existing_link() {
        let store = store();
        let p = store.insert_product(&shirt(None)).await.unwrap();
        store
            .bulk_insert_product_tags(p.id, &[TagId::new(1)])
            .await
            .unwrap();

        let err = store
            .bulk_insert_product_tags(p.id, &[TagId::new(1)])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[tokio::test]
    async fn update_on_missing_product_matches_nothing() {
        let store = store();
        let changes = ProductChanges {
            stock: Some(1),
            ..Default::default()
        };
        assert_eq!(store.update_product(ProductId::new(7), &changes).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_cascades_to_join_rows() {
        let store = store();
        let p = store.insert_product(&shirt(None)).await.unwrap();
        store
            .bulk_insert_product_tags(p.id, &[TagId::new(1), TagId::new(2)])
            .await
            .unwrap();

        assert_eq!(store.delete_product(p.id).await.unwrap(), 1);
        assert!(store.product_tags_for(p.id).await.unwrap().is_empty());
        assert_eq!(store.delete_product(p.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_product_tags_counts_removed_rows() {
        let store = store();
        let p = store.insert_product(&shirt(None)).await.unwrap();
        let rows = store
            .bulk_insert_product_tags(p.id, &[TagId::new(1), TagId::new(2)])
            .await
            .unwrap();

        let removed = store
            .delete_product_tags(&[rows[0].id, ProductTagId::new(999)])
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.product_tags_for(p.id).await.unwrap().len(), 1);
    }
}
