//! Catalog endpoints: bulk insert, lookup, update, delete and filters.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::{Method, StatusCode};
use rust_decimal::Decimal;
use serde_json::json;

use bazaar_integration_tests::{TestApp, id_of, product};

fn price_of(product: &serde_json::Value) -> Decimal {
    product["price"]["org"].as_str().unwrap().parse().unwrap()
}

async fn seeded() -> (TestApp, Vec<serde_json::Value>) {
    let app = TestApp::new();
    let products = app
        .add_products(json!([
            product("Silk Saree", "Women", 120, &["Free"]),
            product("Cotton Kurta", "Men", 40, &["M", "L"]),
            product("Linen Shirt", "Men", 60, &["S", "M"]),
            product("Kids Frock", "Kids", 25, &["S"]),
        ]))
        .await;
    (app, products)
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new();
    let live = app.get("/health", None).await;
    assert_eq!(live.status, StatusCode::OK);
    assert_eq!(live.body, "ok");

    let ready = app.get("/health/ready", None).await;
    assert_eq!(ready.status, StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_header_on_every_response() {
    let app = TestApp::new();
    let response = app.get("/api/products", None).await;
    assert!(response.headers.contains_key("x-request-id"));
    assert_eq!(response.headers["x-content-type-options"], "nosniff");
}

// =============================================================================
// Bulk insert
// =============================================================================

#[tokio::test]
async fn test_add_products_returns_created() {
    let app = TestApp::new();
    let response = app
        .post(
            "/api/products/add",
            None,
            json!([product("Dupatta", "Women", 15, &["Free"])]),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["message"], "Products added successfully");
    let created = response.body["createdProducts"].as_array().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0]["title"], "Dupatta");
    assert!(created[0]["id"].is_string());
}

#[tokio::test]
async fn test_add_products_requires_array() {
    let app = TestApp::new();
    let response = app
        .post(
            "/api/products/add",
            None,
            product("Dupatta", "Women", 15, &[]),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["success"], false);
    assert_eq!(response.body["status"], 400);
    assert_eq!(
        response.body["message"],
        "Invalid request. Expected an array of products."
    );
}

#[tokio::test]
async fn test_add_products_rejects_whole_batch_on_bad_entry() {
    let app = TestApp::new();
    let response = app
        .post(
            "/api/products/add",
            None,
            json!([
                product("Good", "Women", 15, &[]),
                { "title": "Bad", "price": { "org": -1 } },
            ]),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(
        response.body["message"]
            .as_str()
            .unwrap()
            .starts_with("product 1:")
    );

    let listing = app.get("/api/products", None).await;
    assert_eq!(listing.body, json!([]));
}

#[tokio::test]
async fn test_malformed_json_uses_error_body() {
    let app = TestApp::new();
    let response = app
        .send(
            Method::PUT,
            "/api/products/6f2d9e0c-4a8b-4c57-9a39-0b6f1c2d3e4f",
            None,
            Some(json!({ "price": "cheap" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["success"], false);
}

// =============================================================================
// Lookup by id
// =============================================================================

#[tokio::test]
async fn test_product_lookup() {
    let (app, products) = seeded().await;
    let id = id_of(&products[1]);

    let found = app.get(&format!("/api/products/{id}"), None).await;
    assert_eq!(found.status, StatusCode::OK);
    assert_eq!(found.body["title"], "Cotton Kurta");
}

#[tokio::test]
async fn test_malformed_id_is_bad_request() {
    let (app, _) = seeded().await;
    for id in ["123", "not-a-uuid", "6f2d9e0c-4a8b"] {
        let response = app.get(&format!("/api/products/{id}"), None).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{id}");
        assert_eq!(response.body["message"], "Invalid product ID");
    }
}

#[tokio::test]
async fn test_unknown_id_is_not_found() {
    let (app, _) = seeded().await;
    let response = app
        .get("/api/products/6f2d9e0c-4a8b-4c57-9a39-0b6f1c2d3e4f", None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["status"], 404);
    assert_eq!(response.body["message"], "Product not found");
}

// =============================================================================
// Update and delete
// =============================================================================

#[tokio::test]
async fn test_update_product_is_partial() {
    let (app, products) = seeded().await;
    let id = id_of(&products[0]);

    let response = app
        .send(
            Method::PUT,
            &format!("/api/products/{id}"),
            None,
            Some(json!({ "stock": 9, "price": { "org": 100, "mrp": 120, "off": 16 } })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["title"], "Silk Saree");
    assert_eq!(response.body["stock"], 9);
    assert_eq!(price_of(&response.body), Decimal::from(100));
}

#[tokio::test]
async fn test_update_rejects_invalid_merge() {
    let (app, products) = seeded().await;
    let id = id_of(&products[0]);

    let response = app
        .send(
            Method::PUT,
            &format!("/api/products/{id}"),
            None,
            Some(json!({ "title": "  " })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let unchanged = app.get(&format!("/api/products/{id}"), None).await;
    assert_eq!(unchanged.body["title"], "Silk Saree");
}

#[tokio::test]
async fn test_delete_product() {
    let (app, products) = seeded().await;
    let id = id_of(&products[3]);
    let uri = format!("/api/products/{id}");

    let deleted = app.send(Method::DELETE, &uri, None, None).await;
    assert_eq!(deleted.status, StatusCode::OK);

    assert_eq!(app.get(&uri, None).await.status, StatusCode::NOT_FOUND);
    let again = app.send(Method::DELETE, &uri, None, None).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Filters
// =============================================================================

#[tokio::test]
async fn test_list_without_filters_returns_everything() {
    let (app, _) = seeded().await;
    let response = app.get("/api/products", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body.as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_price_range_is_inclusive() {
    let (app, _) = seeded().await;
    let response = app.get("/api/products?minPrice=40&maxPrice=120", None).await;
    assert_eq!(response.status, StatusCode::OK);

    let found = response.body.as_array().unwrap();
    assert_eq!(found.len(), 3);
    for product in found {
        let price = price_of(product);
        assert!(price >= Decimal::from(40) && price <= Decimal::from(120));
    }
}

#[tokio::test]
async fn test_categories_filter() {
    let (app, _) = seeded().await;
    let response = app.get("/api/products?categories=Men,Kids", None).await;

    let found = response.body.as_array().unwrap();
    assert_eq!(found.len(), 3);
    for product in found {
        let category = product["category"].as_str().unwrap();
        assert!(["Men", "Kids"].contains(&category));
    }
}

#[tokio::test]
async fn test_sizes_and_search_combine() {
    let (app, _) = seeded().await;
    let response = app.get("/api/products?sizes=M&search=shirt", None).await;

    let found = response.body.as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["title"], "Linen Shirt");
}

#[tokio::test]
async fn test_search_is_literal() {
    let (app, _) = seeded().await;
    let response = app.get("/api/products?search=%25", None).await;
    assert_eq!(response.body, json!([]));
}

#[tokio::test]
async fn test_bad_price_filters_rejected() {
    let (app, _) = seeded().await;

    let response = app.get("/api/products?minPrice=abc", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app.get("/api/products?minPrice=100&maxPrice=10", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app.get("/api/products?minPrice=&maxPrice=", None).await;
    assert_eq!(response.status, StatusCode::OK);
}

// =============================================================================
// Error bodies outside the handlers
// =============================================================================

#[tokio::test]
async fn test_undecodable_id_uses_error_body() {
    let (app, _) = seeded().await;
    for method in [Method::GET, Method::PUT, Method::DELETE] {
        let response = app
            .send(method.clone(), "/api/products/%FF", None, Some(json!({})))
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{method}");
        assert_eq!(response.body["success"], false);
        assert_eq!(response.body["status"], 400);
    }
}

#[tokio::test]
async fn test_unknown_route_and_method_use_error_body() {
    let app = TestApp::new();

    let missing = app.get("/api/nope", None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.body["success"], false);
    assert_eq!(missing.body["status"], 404);

    let wrong_method = app
        .send(Method::DELETE, "/api/user/cart", None, None)
        .await;
    assert_eq!(wrong_method.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(wrong_method.body["success"], false);
    assert_eq!(wrong_method.body["status"], 405);
}

#[tokio::test]
async fn test_oversized_body_is_payload_too_large() {
    let app = TestApp::new();
    let huge = "x".repeat(2 * 1024 * 1024);
    let response = app
        .post(
            "/api/products/add",
            None,
            json!([{ "title": huge, "price": { "org": 1 } }]),
        )
        .await;
    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.body["success"], false);
    assert_eq!(response.body["status"], 413);
}

#[tokio::test]
async fn test_missing_content_type_is_unsupported_media_type() {
    let app = TestApp::new();
    let response = app
        .send_raw(
            Method::POST,
            "/api/products/add",
            None,
            None,
            json!([product("Dupatta", "Women", 15, &[])]).to_string(),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(response.body["success"], false);
    assert_eq!(response.body["status"], 415);
}
