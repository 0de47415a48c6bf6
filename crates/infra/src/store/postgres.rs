//! Postgres-backed catalog store.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (not-null / FK / unique / check) | `23502` `23503` `23505` `23514` | `Constraint` |
//! | Database (other) | Any other | `Query` |
//! | PoolClosed / PoolTimedOut / Io | N/A | `Unavailable` |
//! | Other | N/A | `Query` |
//!
//! ## Thread Safety
//!
//! `PostgresCatalogStore` is `Send + Sync` and can be shared across tasks.
//! Each method is one statement (or one read round per relation) on the pool;
//! none of them opens a transaction.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{FromRow, Row};
use tracing::instrument;

use catalog_core::{CategoryId, ProductId, ProductTagId, TagId};
use catalog_products::{
    Category, NewProduct, Product, ProductChanges, ProductDetails, ProductTag, Tag,
};

use super::{CatalogStore, StoreError, StoreResult};

const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

const PRODUCT_COLUMNS: &str = r#"
    p.id,
    p.product_name,
    p.price::float8 AS price,
    p.stock,
    p.category_id,
    c.category_name
"#;

/// Postgres-backed catalog store.
#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: Arc<PgPool>,
}

impl PostgresCatalogStore {
    /// Create a new store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect a pool with at most `max_connections` connections.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    /// Insert reference rows under their fixed ids, skipping ones already present.
    #[instrument(skip_all, fields(categories = categories.len(), tags = tags.len()), err)]
    pub async fn seed_reference_data(&self, categories: &[Category], tags: &[Tag]) -> StoreResult<()> {
        let (ids, names): (Vec<i64>, Vec<String>) =
            categories.iter().map(|c| (c.id.get(), c.name.clone())).unzip();
        sqlx::query(
            r#"
            INSERT INTO category (id, category_name)
            SELECT * FROM UNNEST($1::bigint[], $2::text[])
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&ids)
        .bind(&names)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("seed_categories", e))?;

        let (ids, names): (Vec<i64>, Vec<String>) =
            tags.iter().map(|t| (t.id.get(), t.name.clone())).unzip();
        sqlx::query(
            r#"
            INSERT INTO tag (id, tag_name)
            SELECT * FROM UNNEST($1::bigint[], $2::text[])
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&ids)
        .bind(&names)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("seed_tags", e))?;

        // Explicit ids bypass the sequences; move them past the seeded rows.
        sqlx::raw_sql(
            r#"
            SELECT setval(pg_get_serial_sequence('category', 'id'), COALESCE(MAX(id), 0) + 1, false) FROM category;
            SELECT setval(pg_get_serial_sequence('tag', 'id'), COALESCE(MAX(id), 0) + 1, false) FROM tag;
            "#,
        )
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("seed_sequences", e))?;

        Ok(())
    }

    /// Load tags for a set of products, grouped by product id.
    async fn tags_by_product(&self, product_ids: &[i64]) -> StoreResult<HashMap<i64, Vec<Tag>>> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT pt.product_id, t.id, t.tag_name
            FROM product_tag pt
            JOIN tag t ON t.id = pt.tag_id
            WHERE pt.product_id = ANY($1)
            ORDER BY pt.product_id, pt.id
            "#,
        )
        .bind(product_ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_product_tags", e))?;

        let mut grouped: HashMap<i64, Vec<Tag>> = HashMap::new();
        for row in rows {
            let tagged = TaggedRow::from_row(&row).map_err(|e| map_sqlx_error("decode_tag", e))?;
            grouped.entry(tagged.product_id).or_default().push(Tag {
                id: TagId::new(tagged.tag_id),
                name: tagged.tag_name,
            });
        }
        Ok(grouped)
    }

    async fn with_relations(&self, rows: Vec<PgRow>) -> StoreResult<Vec<ProductDetails>> {
        let products = rows
            .iter()
            .map(ProductRow::from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_product", e))?;

        let ids: Vec<i64> = products.iter().map(|p| p.id).collect();
        let mut tags = self.tags_by_product(&ids).await?;

        Ok(products
            .into_iter()
            .map(|row| {
                let product_tags = tags.remove(&row.id).unwrap_or_default();
                row.into_details(product_tags)
            })
            .collect())
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    #[instrument(skip(self), err)]
    async fn list_products(&self) -> StoreResult<Vec<ProductDetails>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product p LEFT JOIN category c ON c.id = p.category_id ORDER BY p.id"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;

        self.with_relations(rows).await
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn find_product(&self, id: ProductId) -> StoreResult<Option<ProductDetails>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product p LEFT JOIN category c ON c.id = p.category_id WHERE p.id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_product", e))?;

        match row {
            Some(row) => Ok(self.with_relations(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, new), err)]
    async fn insert_product(&self, new: &NewProduct) -> StoreResult<Product> {
        let row = sqlx::query(
            r#"
            INSERT INTO product (product_name, price, stock, category_id)
            VALUES ($1, $2::float8::numeric, $3, $4)
            RETURNING id, product_name, price::float8 AS price, stock, category_id
            "#,
        )
        .bind(&new.name)
        .bind(new.price)
        .bind(new.stock)
        .bind(new.category_id.map(|c| c.get()))
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;

        product_from_row(&row).map_err(|e| map_sqlx_error("decode_product", e))
    }

    #[instrument(skip(self, changes), fields(product_id = %id), err)]
    async fn update_product(&self, id: ProductId, changes: &ProductChanges) -> StoreResult<u64> {
        let (set_category, category_id) = match changes.category_id {
            Some(c) => (true, c.map(|c| c.get())),
            None => (false, None),
        };

        let result = sqlx::query(
            r#"
            UPDATE product SET
                product_name = COALESCE($2, product_name),
                price = COALESCE($3::float8::numeric, price),
                stock = COALESCE($4, stock),
                category_id = CASE WHEN $5 THEN $6 ELSE category_id END
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .bind(changes.name.as_deref())
        .bind(changes.price)
        .bind(changes.stock)
        .bind(set_category)
        .bind(category_id)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&self, id: ProductId) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM product WHERE id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn product_tags_for(&self, product_id: ProductId) -> StoreResult<Vec<ProductTag>> {
        let rows = sqlx::query(
            "SELECT id, product_id, tag_id FROM product_tag WHERE product_id = $1 ORDER BY id",
        )
        .bind(product_id.get())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("product_tags_for", e))?;

        decode_product_tags(&rows)
    }

    #[instrument(skip(self, tag_ids), fields(product_id = %product_id, count = tag_ids.len()), err)]
    async fn bulk_insert_product_tags(
        &self,
        product_id: ProductId,
        tag_ids: &[TagId],
    ) -> StoreResult<Vec<ProductTag>> {
        if tag_ids.is_empty() {
            return Ok(vec![]);
        }

        let raw: Vec<i64> = tag_ids.iter().map(|t| t.get()).collect();
        let rows = sqlx::query(
            r#"
            INSERT INTO product_tag (product_id, tag_id)
            SELECT $1, tag_id FROM UNNEST($2::bigint[]) WITH ORDINALITY AS u(tag_id, ord)
            ORDER BY ord
            RETURNING id, product_id, tag_id
            "#,
        )
        .bind(product_id.get())
        .bind(&raw)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("bulk_insert_product_tags", e))?;

        decode_product_tags(&rows)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn delete_product_tags(&self, ids: &[ProductTagId]) -> StoreResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let raw: Vec<i64> = ids.iter().map(|id| id.get()).collect();
        let result = sqlx::query("DELETE FROM product_tag WHERE id = ANY($1)")
            .bind(&raw)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product_tags", e))?;

        Ok(result.rows_affected())
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23502" | "23503" | "23505" | "23514") => StoreError::Constraint(msg),
                _ => StoreError::Query(msg),
            }
        }
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool unavailable in {}", operation))
        }
        sqlx::Error::Io(e) => StoreError::Unavailable(format!("io error in {}: {}", operation, e)),
        _ => StoreError::Query(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn decode_product_tags(rows: &[PgRow]) -> StoreResult<Vec<ProductTag>> {
    rows.iter()
        .map(|row| {
            Ok(ProductTag {
                id: ProductTagId::new(row.try_get("id")?),
                product_id: ProductId::new(row.try_get("product_id")?),
                tag_id: TagId::new(row.try_get("tag_id")?),
            })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()
        .map_err(|e| map_sqlx_error("decode_product_tag", e))
}

fn product_from_row(row: &PgRow) -> Result<Product, sqlx::Error> {
    Ok(Product {
        id: ProductId::new(row.try_get("id")?),
        name: row.try_get("product_name")?,
        price: row.try_get("price")?,
        stock: row.try_get("stock")?,
        category_id: row.try_get::<Option<i64>, _>("category_id")?.map(CategoryId::new),
    })
}

// SQLx row types

#[derive(Debug)]
struct ProductRow {
    id: i64,
    product: Product,
    category_name: Option<String>,
}

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let product = product_from_row(row)?;
        Ok(ProductRow {
            id: product.id.get(),
            product,
            category_name: row.try_get("category_name")?,
        })
    }
}

impl ProductRow {
    fn into_details(self, tags: Vec<Tag>) -> ProductDetails {
        let category = match (self.product.category_id, self.category_name) {
            (Some(id), Some(name)) => Some(Category { id, name }),
            _ => None,
        };
        ProductDetails {
            product: self.product,
            category,
            tags,
        }
    }
}

#[derive(Debug)]
struct TaggedRow {
    product_id: i64,
    tag_id: i64,
    tag_name: String,
}

impl<'r> FromRow<'r, PgRow> for TaggedRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(TaggedRow {
            product_id: row.try_get("product_id")?,
            tag_id: row.try_get("id")?,
            tag_name: row.try_get("tag_name")?,
        })
    }
}
