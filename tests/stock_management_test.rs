mod common;

use axum::http::StatusCode;
use common::{as_f64, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use storefront_api::entities::user::UserRole;

/// Seed one single-variant product and return (app, customer token,
/// admin token, variant id as string).
async fn seeded_app(sku: &str, stock: i32) -> (TestApp, String, String, String) {
    let app = TestApp::new().await;
    let (retailer, _) = app.create_user("retailer@example.com", UserRole::Retailer).await;
    let (_, customer_token) = app.create_user("customer@example.com", UserRole::Customer).await;
    let (_, admin_token) = app.create_user("admin@example.com", UserRole::Admin).await;
    let (_, variant_id) = app.seed_product(retailer.id, sku, dec!(19.99), stock).await;
    (app, customer_token, admin_token, variant_id.to_string())
}

fn snapshot_for<'a>(body: &'a serde_json::Value, variant_id: &str) -> &'a serde_json::Value {
    body["data"]
        .as_array()
        .expect("paginated data array")
        .iter()
        .find(|s| s["variant_id"] == variant_id)
        .expect("snapshot for seeded variant")
}

#[tokio::test]
async fn stock_dashboard_requires_admin() {
    let (app, customer_token, _, _) = seeded_app("GATE-1", 10).await;

    let (status, _) = app.get("/api/v1/admin/stock", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/v1/admin/stock", Some(&customer_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn holds_exceeding_stock_show_out_of_stock() {
    let (app, customer_token, admin_token, variant_id) = seeded_app("HOLD-12", 10).await;

    let (status, _) = app
        .post(
            "/api/v1/cart/items",
            Some(&customer_token),
            json!({ "variant_id": variant_id, "quantity": 12 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/api/v1/admin/stock", Some(&admin_token)).await;
    assert_eq!(status, StatusCode::OK);
    let snapshot = snapshot_for(&body, &variant_id);
    assert_eq!(snapshot["stock_quantity"], 10);
    assert_eq!(snapshot["cart_hold"], 12);
    assert_eq!(snapshot["available_stock"], 0);
    assert_eq!(snapshot["status"], "Out of Stock");
}

#[tokio::test]
async fn small_hold_leaves_variant_in_stock() {
    let (app, customer_token, admin_token, variant_id) = seeded_app("HOLD-2", 10).await;

    app.post(
        "/api/v1/cart/items",
        Some(&customer_token),
        json!({ "variant_id": variant_id, "quantity": 2 }),
    )
    .await;

    let (_, body) = app.get("/api/v1/admin/stock", Some(&admin_token)).await;
    let snapshot = snapshot_for(&body, &variant_id);
    assert_eq!(snapshot["available_stock"], 8);
    assert_eq!(snapshot["status"], "In Stock");
}

#[tokio::test]
async fn wishlist_entries_hold_one_unit_each() {
    let (app, customer_token, admin_token, variant_id) = seeded_app("WISH-1", 10).await;
    let (_, second_customer) = app
        .create_user("customer2@example.com", UserRole::Customer)
        .await;

    // 6 units in one cart plus one wishlist entry from another user: hold 7.
    app.post(
        "/api/v1/cart/items",
        Some(&customer_token),
        json!({ "variant_id": variant_id, "quantity": 6 }),
    )
    .await;
    let (status, _) = app
        .post(
            "/api/v1/wishlist/items",
            Some(&second_customer),
            json!({ "variant_id": variant_id }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = app.get("/api/v1/admin/stock", Some(&admin_token)).await;
    let snapshot = snapshot_for(&body, &variant_id);
    assert_eq!(snapshot["cart_hold"], 7);
    assert_eq!(snapshot["available_stock"], 3);
    assert_eq!(snapshot["status"], "Low");
}

#[tokio::test]
async fn adding_to_cart_removes_the_wishlist_hold() {
    let (app, customer_token, admin_token, variant_id) = seeded_app("WISH-2", 10).await;

    app.post(
        "/api/v1/wishlist/items",
        Some(&customer_token),
        json!({ "variant_id": variant_id }),
    )
    .await;
    app.post(
        "/api/v1/cart/items",
        Some(&customer_token),
        json!({ "variant_id": variant_id, "quantity": 3 }),
    )
    .await;

    // The wishlist row is consumed by the cart add; only the cart holds.
    let (_, body) = app.get("/api/v1/admin/stock", Some(&admin_token)).await;
    let snapshot = snapshot_for(&body, &variant_id);
    assert_eq!(snapshot["cart_hold"], 3);
}

#[tokio::test]
async fn low_stock_raises_a_single_alert() {
    let (app, customer_token, admin_token, variant_id) = seeded_app("ALERT-1", 10).await;

    app.post(
        "/api/v1/cart/items",
        Some(&customer_token),
        json!({ "variant_id": variant_id, "quantity": 8 }),
    )
    .await;

    // Two dashboard reads must not produce two open alerts.
    app.get("/api/v1/admin/stock", Some(&admin_token)).await;
    app.get("/api/v1/admin/stock", Some(&admin_token)).await;

    let (status, body) = app.get("/api/v1/admin/stock/alerts", Some(&admin_token)).await;
    assert_eq!(status, StatusCode::OK);
    let alerts = body["data"].as_array().expect("alerts array");
    let open: Vec<_> = alerts
        .iter()
        .filter(|a| a["alert"]["variant_id"] == variant_id && a["alert"]["acknowledged"] == false)
        .collect();
    assert_eq!(open.len(), 1, "exactly one open alert per variant");
    assert_eq!(open[0]["alert"]["available_stock"], 2);

    let alert_id = open[0]["alert"]["id"].as_str().expect("alert id");
    let (status, acked) = app
        .post(
            &format!("/api/v1/admin/stock/alerts/{}/ack", alert_id),
            Some(&admin_token),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(acked["acknowledged"], true);
}

#[tokio::test]
async fn update_stock_overwrites_quantity_only() {
    let (app, customer_token, admin_token, variant_id) = seeded_app("SET-1", 10).await;

    app.post(
        "/api/v1/cart/items",
        Some(&customer_token),
        json!({ "variant_id": variant_id, "quantity": 4 }),
    )
    .await;

    let (status, snapshot) = app
        .put(
            &format!("/api/v1/admin/stock/{}", variant_id),
            Some(&admin_token),
            json!({ "stock_quantity": 42 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "body: {snapshot}");
    assert_eq!(snapshot["stock_quantity"], 42);
    // The hold survives the overwrite.
    assert_eq!(snapshot["cart_hold"], 4);
    assert_eq!(snapshot["available_stock"], 38);
    assert_eq!(snapshot["status"], "In Stock");
}

#[tokio::test]
async fn negative_stock_is_rejected() {
    let (app, _, admin_token, variant_id) = seeded_app("NEG-1", 10).await;

    let (status, body) = app
        .put(
            &format!("/api/v1/admin/stock/{}", variant_id),
            Some(&admin_token),
            json!({ "stock_quantity": -1 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body["message"].as_str().unwrap_or_default().is_empty());
}

#[tokio::test]
async fn status_filter_narrows_the_overview() {
    let (app, customer_token, admin_token, variant_id) = seeded_app("FILTER-1", 10).await;
    let (retailer, _) = app.create_user("retailer2@example.com", UserRole::Retailer).await;
    let (_, other_variant) = app
        .seed_product(retailer.id, "FILTER-2", dec!(5.00), 100)
        .await;

    app.post(
        "/api/v1/cart/items",
        Some(&customer_token),
        json!({ "variant_id": variant_id, "quantity": 10 }),
    )
    .await;

    let (status, body) = app
        .get(
            "/api/v1/admin/stock?status=Out%20of%20Stock",
            Some(&admin_token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().expect("data");
    assert!(data.iter().any(|s| s["variant_id"] == variant_id));
    assert!(!data
        .iter()
        .any(|s| s["variant_id"] == other_variant.to_string()));

    let (status, body) = app
        .get("/api/v1/admin/stock?status=Backordered", Some(&admin_token))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
}

#[tokio::test]
async fn status_filter_applies_before_pagination() {
    let (app, customer_token, admin_token, _) = seeded_app("PAGE-1", 100).await;
    let (retailer, _) = app
        .create_user("retailer3@example.com", UserRole::Retailer)
        .await;
    let (_, depleted) = app.seed_product(retailer.id, "PAGE-2", dec!(9.99), 5).await;

    app.post(
        "/api/v1/cart/items",
        Some(&customer_token),
        json!({ "variant_id": depleted.to_string(), "quantity": 5 }),
    )
    .await;

    // The sole match sits behind an in-stock variant; a one-row page must
    // still surface it and `total` must count only matches.
    let (status, body) = app
        .get(
            "/api/v1/admin/stock?status=Out%20of%20Stock&per_page=1&page=1",
            Some(&admin_token),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["total"], 1);
    let data = body["data"].as_array().expect("data");
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["variant_id"], depleted.to_string());
    assert_eq!(data[0]["status"], "Out of Stock");
}

#[tokio::test]
async fn snapshot_endpoint_returns_single_variant() {
    let (app, _, admin_token, variant_id) = seeded_app("ONE-1", 7).await;

    let (status, snapshot) = app
        .get(
            &format!("/api/v1/admin/stock/{}", variant_id),
            Some(&admin_token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["variant_id"], variant_id);
    assert_eq!(snapshot["available_stock"], 7);
    assert_eq!(as_f64(&snapshot["price"]), 19.99);
}
