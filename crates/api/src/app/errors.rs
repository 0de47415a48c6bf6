use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use catalog_infra::CatalogError;

pub const PRODUCT_NOT_FOUND: &str = "Product not found";

/// Map a catalog failure to a response.
///
/// Not-found is always 404 with the fixed message. Everything else uses
/// `failure_status`, which the route picks (400 for writes, 500 for reads and
/// deletes), and carries the error detail.
pub fn catalog_error_to_response(
    err: CatalogError,
    failure_status: StatusCode,
) -> axum::response::Response {
    match err {
        CatalogError::NotFound => not_found(),
        CatalogError::Invalid(e) => json_error(failure_status, "validation_error", e.to_string()),
        CatalogError::Store(e) => {
            tracing::warn!(status = failure_status.as_u16(), "store operation failed: {e}");
            json_error(failure_status, "store_error", e.to_string())
        }
    }
}

pub fn not_found() -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        axum::Json(json!({ "message": PRODUCT_NOT_FOUND })),
    )
        .into_response()
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use catalog_infra::StoreError;

    use super::*;

    #[test]
    fn not_found_ignores_failure_status() {
        let res = catalog_error_to_response(CatalogError::NotFound, StatusCode::BAD_REQUEST);
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn store_errors_use_route_status() {
        let err = CatalogError::Store(StoreError::Unavailable("pool closed".to_string()));
        let res = catalog_error_to_response(err, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = CatalogError::Store(StoreError::Constraint("tag 9 does not exist".to_string()));
        let res = catalog_error_to_response(err, StatusCode::BAD_REQUEST);
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
