use serde::{Deserialize, Deserializer};

use catalog_core::{CategoryId, TagId};
use catalog_products::{
    Category, NewProduct, Product, ProductChanges, ProductDetails, Tag, TagIds,
    product::DEFAULT_STOCK,
};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    #[serde(alias = "product_name")]
    pub name: String,
    pub price: f64,
    pub stock: Option<i32>,
    pub category_id: Option<CategoryId>,
    #[serde(rename = "tagIds", alias = "tag_ids")]
    pub tag_ids: Option<Vec<TagId>>,
}

impl From<CreateProductRequest> for NewProduct {
    fn from(body: CreateProductRequest) -> Self {
        NewProduct {
            name: body.name,
            price: body.price,
            stock: body.stock.unwrap_or(DEFAULT_STOCK),
            category_id: body.category_id,
            tag_ids: body.tag_ids.map(TagIds::new),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    #[serde(alias = "product_name")]
    pub name: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i32>,
    /// Absent: unchanged. `null`: clear.
    #[serde(default, deserialize_with = "present")]
    pub category_id: Option<Option<CategoryId>>,
    #[serde(rename = "tagIds", alias = "tag_ids")]
    pub tag_ids: Option<Vec<TagId>>,
}

impl From<UpdateProductRequest> for ProductChanges {
    fn from(body: UpdateProductRequest) -> Self {
        ProductChanges {
            name: body.name,
            price: body.price,
            stock: body.stock,
            category_id: body.category_id,
            tag_ids: body.tag_ids.map(TagIds::new),
        }
    }
}

/// Marks a field as present even when its value is `null`.
fn present<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

// -------------------------
// Response mapping
// -------------------------

pub fn product_row_to_json(p: &Product) -> serde_json::Value {
    serde_json::json!({
        "id": p.id,
        "name": p.name,
        "price": p.price,
        "stock": p.stock,
        "category_id": p.category_id,
    })
}

pub fn category_to_json(c: &Category) -> serde_json::Value {
    serde_json::json!({ "id": c.id, "name": c.name })
}

pub fn tag_to_json(t: &Tag) -> serde_json::Value {
    serde_json::json!({ "id": t.id, "name": t.name })
}

pub fn product_to_json(details: &ProductDetails) -> serde_json::Value {
    let mut body = product_row_to_json(&details.product);
    body["category"] = details
        .category
        .as_ref()
        .map(category_to_json)
        .unwrap_or(serde_json::Value::Null);
    body["tags"] = details.tags.iter().map(tag_to_json).collect();
    body
}

pub fn message(text: &str) -> serde_json::Value {
    serde_json::json!({ "message": text })
}
