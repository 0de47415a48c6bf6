use std::collections::BTreeSet;
use std::sync::Arc;

use catalog_api::app::services::AppServices;
use catalog_infra::{seed, InMemoryCatalogStore};
use reqwest::StatusCode;
use serde_json::{json, Value};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        catalog_observability::tracing::init(catalog_observability::tracing::LogFormat::Text);

        // Same router as prod over a seeded in-memory store, bound to an ephemeral port.
        let store = InMemoryCatalogStore::with_reference_data(&seed::demo_categories(), &seed::demo_tags());
        let app = catalog_api::app::build_app(Arc::new(AppServices::new(Arc::new(store))));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}/api/products", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn tag_ids(product: &Value) -> BTreeSet<i64> {
    product["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_i64().unwrap())
        .collect()
}

async fn create(client: &reqwest::Client, srv: &TestServer, body: Value) -> Value {
    let res = client.post(srv.url("")).json(&body).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    res.json().await.unwrap()
}

async fn fetch(client: &reqwest::Client, srv: &TestServer, id: i64) -> Value {
    let res = client.get(srv.url(&format!("/{id}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    res.json().await.unwrap()
}

#[tokio::test]
async fn list_on_empty_store_is_empty_array() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn create_then_retag_lifecycle() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // Create
    let created = create(
        &client,
        &srv,
        json!({ "name": "Widget", "price": 9.99, "stock": 5, "category_id": 1, "tagIds": [1, 2] }),
    )
    .await;
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["name"], "Widget");

    let product = fetch(&client, &srv, id).await;
    assert_eq!(tag_ids(&product), BTreeSet::from([1, 2]));
    assert_eq!(product["category"]["name"], "Shirts");

    // Retag: 1 removed, 3 added, 2 kept
    let res = client
        .put(srv.url(&format!("/{id}")))
        .json(&json!({ "tagIds": [2, 3] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Product updated successfully");

    let product = fetch(&client, &srv, id).await;
    assert_eq!(tag_ids(&product), BTreeSet::from([2, 3]));

    // Listed with relations
    let all: Value = client.get(srv.url("")).send().await.unwrap().json().await.unwrap();
    assert_eq!(all.as_array().unwrap().len(), 1);
    assert_eq!(tag_ids(&all[0]), BTreeSet::from([2, 3]));
}

#[tokio::test]
async fn create_without_tag_ids_succeeds() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let created = create(&client, &srv, json!({ "name": "Plain Hat", "price": 22.0 })).await;
    let product = fetch(&client, &srv, created["id"].as_i64().unwrap()).await;

    assert!(tag_ids(&product).is_empty());
    assert_eq!(product["stock"], 0);
    assert!(product["category"].is_null());
}

#[tokio::test]
async fn update_fields_without_tags_keeps_tags() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let created = create(
        &client,
        &srv,
        json!({ "name": "Cargo Shorts", "price": 29.99, "stock": 22, "category_id": 2, "tagIds": [6] }),
    )
    .await;
    let id = created["id"].as_i64().unwrap();

    for body in [json!({ "price": 19.99, "category_id": null }), json!({ "tagIds": [] })] {
        let res = client
            .put(srv.url(&format!("/{id}")))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let product = fetch(&client, &srv, id).await;
    assert_eq!(product["price"], 19.99);
    assert_eq!(product["name"], "Cargo Shorts");
    assert!(product["category_id"].is_null());
    assert_eq!(tag_ids(&product), BTreeSet::from([6]));
}

#[tokio::test]
async fn unknown_product_is_not_found() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/999")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .put(srv.url("/999"))
        .json(&json!({ "stock": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client.delete(srv.url("/999")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Product not found");
}

#[tokio::test]
async fn delete_removes_product() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let created = create(&client, &srv, json!({ "name": "Top 40 Music Compilation Vinyl Record", "price": 12.99, "tagIds": [1, 2, 8] })).await;
    let id = created["id"].as_i64().unwrap();

    let res = client.delete(srv.url(&format!("/{id}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Product deleted successfully");

    let res = client.get(srv.url(&format!("/{id}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn store_and_payload_errors_are_client_errors() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // Unknown tag: product row is kept, the response still reports the failure.
    let res = client
        .post(srv.url(""))
        .json(&json!({ "name": "Mystery Box", "price": 5.0, "tagIds": [404] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "store_error");

    // Missing required field.
    let res = client
        .post(srv.url(""))
        .json(&json!({ "name": "No Price" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

}

#[tokio::test]
async fn unparseable_ids_are_not_found() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for path in ["/abc", "/99999999999999999999"] {
        let res = client.get(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body, json!({ "message": "Product not found" }));

        let res = client
            .put(srv.url(path))
            .json(&json!({ "stock": 1 }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = client.delete(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["message"], "Product not found");
    }
}

#[tokio::test]
async fn update_store_errors_are_client_errors() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let created = create(
        &client,
        &srv,
        json!({ "name": "Red Hat", "price": 15.0, "category_id": 4, "tagIds": [1, 2] }),
    )
    .await;
    let id = created["id"].as_i64().unwrap();

    // Unknown tag: the insert half fails, the removal half still lands.
    let res = client
        .put(srv.url(&format!("/{id}")))
        .json(&json!({ "tagIds": [404] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "store_error");

    let product = fetch(&client, &srv, id).await;
    assert!(tag_ids(&product).is_empty());

    // Unknown category: row is left as it was.
    let res = client
        .put(srv.url(&format!("/{id}")))
        .json(&json!({ "category_id": 404, "stock": 7 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "store_error");

    let product = fetch(&client, &srv, id).await;
    assert_eq!(product["category_id"], 4);
    assert_eq!(product["stock"], 0);
}
