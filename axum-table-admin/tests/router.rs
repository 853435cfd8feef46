#![cfg(feature = "sqlite")]

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use axum_table_admin::{AdminConfig, TableAdminLayer};
use common::{row_count, seeded_pool};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::ServiceExt;

fn router(pool: &SqlitePool, config: AdminConfig) -> Router {
    TableAdminLayer::sqlite("/admin", pool.clone(), config).into_router()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_index_and_show() {
    let pool = seeded_pool().await;
    let app = router(&pool, AdminConfig::default());

    let (status, body) = get_json(&app, "/admin/tables").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tables"].as_array().unwrap().len(), 4);

    let (status, body) = get_json(&app, "/admin/tables/orders").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "orders");
    assert_eq!(body["columns"].as_array().unwrap().len(), 4);

    let (status, body) = get_json(&app, "/admin/tables/schema_migrations").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["category"], "unknown_table");
}

#[tokio::test]
async fn test_data_endpoint() {
    let pool = seeded_pool().await;
    let app = router(&pool, AdminConfig::default());

    let (status, body) = get_json(&app, "/admin/tables/orders/data?page=3&per_page=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["records"].as_array().unwrap().len(), 5);
    assert_eq!(body["total_count"], 25);
    assert_eq!(body["total_pages"], 3);
    assert!(body["query_text"].as_str().unwrap().contains("LIMIT 10 OFFSET 20"));

    let (_, body) = get_json(
        &app,
        "/admin/tables/orders/data?q%5Bstatus_eq%5D=shipped&q%5Bs%5D=total+desc&q%5Bbogus_eq%5D=1",
    )
    .await;
    assert_eq!(body["total_count"], 8);
    assert_eq!(body["records"][0]["total"], 33.0);
    assert_eq!(body["warnings"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_record_lifecycle() {
    let pool = seeded_pool().await;
    let app = router(&pool, AdminConfig::default());

    let (status, body) = get_json(&app, "/admin/tables/users/new").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["record"]["name"].is_null());

    let (status, body) = send_json(
        &app,
        "POST",
        "/admin/tables/users/records",
        json!({ "record": { "name": "Eve", "email": "eve@example.com" } }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "success");
    assert_eq!(body["record"]["id"], 4);

    let (_, body) = send_json(
        &app,
        "POST",
        "/admin/tables/users/records",
        json!({ "record": { "name": "Eve again", "email": "eve@example.com" } }),
    )
    .await;
    assert_eq!(body["outcome"], "constraint");

    let (_, body) = send_json(
        &app,
        "PUT",
        "/admin/tables/users/records/4",
        json!({ "record": { "name": "Eve Updated" } }),
    )
    .await;
    assert_eq!(body["outcome"], "success");

    let (status, body) = get_json(&app, "/admin/tables/users/records/4").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["record"]["name"], "Eve Updated");

    let request = Request::builder()
        .method("DELETE")
        .uri("/admin/tables/users/records/4")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["outcome"], "success");
    assert_eq!(body["message"], "Record has been deleted successfully.");

    let (status, _) = get_json(&app, "/admin/tables/users/records/4").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_json(
        &app,
        "PUT",
        "/admin/tables/users/records/4",
        json!({ "record": { "name": "Ghost" } }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_delete_is_reported_as_an_outcome() {
    let pool = seeded_pool().await;
    let app = router(&pool, AdminConfig::default());

    let request = Request::builder()
        .method("DELETE")
        .uri("/admin/tables/orders/records/999")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    let body: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "not_found");
    assert_eq!(row_count(&pool, "orders").await, 25);
}

#[tokio::test]
async fn test_sandbox_truncate_is_skipped() {
    let pool = seeded_pool().await;
    let app = router(&pool, AdminConfig::default().with_sandbox(true));

    let request = Request::builder()
        .method("POST")
        .uri("/admin/tables/orders/truncate")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    let body: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "skipped");
    assert_eq!(row_count(&pool, "orders").await, 25);
}

#[tokio::test]
async fn test_export_streams_ndjson() {
    let pool = seeded_pool().await;
    let app = router(&pool, AdminConfig::default());

    let request = Request::builder()
        .uri("/admin/tables/orders/export")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/x-ndjson"
    );

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 26);

    let header_line: Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(header_line["columns"][0]["name"], "id");

    let first_row: Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(first_row, json!([1, 1, "pending", 0.0]));
}
