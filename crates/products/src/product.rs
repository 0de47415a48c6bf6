use serde::{Deserialize, Serialize};

use catalog_core::{CategoryId, DomainError, DomainResult, Entity, ProductId, ProductTagId, TagId};

/// Stock quantity assumed when a create payload omits it.
pub const DEFAULT_STOCK: i32 = 0;

/// Product row as stored (no relations loaded).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: f64,
    pub stock: i32,
    pub category_id: Option<CategoryId>,
}

/// Category referenced by products. Read-only for this service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// Tag attachable to products. Read-only for this service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

/// Join row linking one product to one tag.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductTag {
    pub id: ProductTagId,
    pub product_id: ProductId,
    pub tag_id: TagId,
}

/// Product with its category and tags eagerly loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDetails {
    pub product: Product,
    pub category: Option<Category>,
    pub tags: Vec<Tag>,
}

impl ProductDetails {
    pub fn tag_ids(&self) -> Vec<TagId> {
        self.tags.iter().map(|t| t.id).collect()
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.id
    }
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> CategoryId {
        self.id
    }
}

impl Entity for Tag {
    type Id = TagId;

    fn id(&self) -> TagId {
        self.id
    }
}

impl Entity for ProductTag {
    type Id = ProductTagId;

    fn id(&self) -> ProductTagId {
        self.id
    }
}

/// Normalized list of tag ids submitted for a product.
///
/// Duplicates are dropped, first occurrence wins, so the list is also a set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagIds(Vec<TagId>);

impl TagIds {
    pub fn new(ids: impl IntoIterator<Item = TagId>) -> Self {
        let mut out: Vec<TagId> = Vec::new();
        for id in ids {
            if !out.contains(&id) {
                out.push(id);
            }
        }
        Self(out)
    }

    pub fn as_slice(&self) -> &[TagId] {
        &self.0
    }

    pub fn contains(&self, id: TagId) -> bool {
        self.0.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<TagId> for TagIds {
    fn from_iter<I: IntoIterator<Item = TagId>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Payload for creating a product.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub price: f64,
    pub stock: i32,
    pub category_id: Option<CategoryId>,
    /// `None` when the caller sent no tag list at all.
    pub tag_ids: Option<TagIds>,
}

impl NewProduct {
    pub fn validate(&self) -> DomainResult<()> {
        validate_name(&self.name)?;
        validate_price(self.price)?;
        validate_stock(self.stock)
    }

    /// Tags to link after the product row exists. Absent means none.
    pub fn initial_tags(&self) -> &[TagId] {
        self.tag_ids.as_ref().map(TagIds::as_slice).unwrap_or(&[])
    }
}

/// Partial update for a product. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i32>,
    /// Outer `None`: leave as is. `Some(None)`: clear the category.
    pub category_id: Option<Option<CategoryId>>,
    /// `None` or an empty list means "no tag change requested".
    pub tag_ids: Option<TagIds>,
}

impl ProductChanges {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if let Some(stock) = self.stock {
            validate_stock(stock)?;
        }
        Ok(())
    }

    /// The tag list to reconcile against, if a non-empty one was supplied.
    pub fn requested_tags(&self) -> Option<&TagIds> {
        self.tag_ids.as_ref().filter(|ids| !ids.is_empty())
    }

    /// Apply the field changes to a stored row.
    pub fn apply_to(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(category_id) = self.category_id {
            product.category_id = category_id;
        }
    }
}

fn validate_name(name: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("product name cannot be empty"));
    }
    Ok(())
}

fn validate_price(price: f64) -> DomainResult<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(DomainError::validation("price must be a non-negative number"));
    }
    Ok(())
}

fn validate_stock(stock: i32) -> DomainResult<()> {
    if stock < 0 {
        return Err(DomainError::validation("stock cannot be negative"));
    }
    Ok(())
}
