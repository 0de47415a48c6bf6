use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use catalog_core::ProductId;

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

/// An id that cannot name a stored product is reported like any other unknown id.
fn parse_id(id: &str) -> Result<ProductId, axum::response::Response> {
    id.parse().map_err(|_| errors::not_found())
}

fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, axum::response::Response> {
    body.map(|Json(b)| b)
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_body", e.body_text()))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.catalog.list().await {
        Ok(products) => {
            let items = products.iter().map(dto::product_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(e) => errors::catalog_error_to_response(e, StatusCode::INTERNAL_SERVER_ERROR),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.catalog.get(id).await {
        Ok(product) => (StatusCode::OK, Json(dto::product_to_json(&product))).into_response(),
        Err(e) => errors::catalog_error_to_response(e, StatusCode::INTERNAL_SERVER_ERROR),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateProductRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match parse_body(body) {
        Ok(b) => b,
        Err(res) => return res,
    };
    match services.catalog.create(body.into()).await {
        Ok(product) => (StatusCode::OK, Json(dto::product_row_to_json(&product))).into_response(),
        Err(e) => errors::catalog_error_to_response(e, StatusCode::BAD_REQUEST),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateProductRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let body = match parse_body(body) {
        Ok(b) => b,
        Err(res) => return res,
    };
    match services.catalog.update(id, body.into()).await {
        Ok(()) => (
            StatusCode::OK,
            Json(dto::message("Product updated successfully")),
        )
            .into_response(),
        Err(e) => errors::catalog_error_to_response(e, StatusCode::BAD_REQUEST),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.catalog.delete(id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(dto::message("Product deleted successfully")),
        )
            .into_response(),
        Err(e) => errors::catalog_error_to_response(e, StatusCode::INTERNAL_SERVER_ERROR),
    }
}
