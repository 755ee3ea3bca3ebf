mod common;

use axum::http::StatusCode;
use common::{as_f64, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use storefront_api::entities::user::UserRole;

async fn app_with_roles() -> (TestApp, String, String, String) {
    let app = TestApp::new().await;
    let (_, retailer_token) = app.create_user("retailer@example.com", UserRole::Retailer).await;
    let (_, customer_token) = app.create_user("customer@example.com", UserRole::Customer).await;
    let (_, admin_token) = app.create_user("admin@example.com", UserRole::Admin).await;
    (app, retailer_token, customer_token, admin_token)
}

async fn create_taxonomy(app: &TestApp, admin_token: &str) -> (String, String) {
    let (status, category) = app
        .post(
            "/api/v1/admin/categories",
            Some(admin_token),
            json!({ "name": "Shoes", "slug": "shoes" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "body: {category}");

    let (status, brand) = app
        .post(
            "/api/v1/admin/brands",
            Some(admin_token),
            json!({ "name": "Acme", "slug": "acme" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "body: {brand}");

    (
        category["id"].as_str().unwrap().to_string(),
        brand["id"].as_str().unwrap().to_string(),
    )
}

fn wizard_payload(category_id: &str, brand_id: &str) -> serde_json::Value {
    json!({
        "category_id": category_id,
        "brand_id": brand_id,
        "name": "Runner",
        "slug": "runner",
        "description": "Lightweight running shoe",
        "variants": [
            { "sku": "RUN-42", "price": 89.90, "stock_quantity": 12,
              "attributes": { "size": "42" } },
            { "sku": "RUN-43", "price": 89.90, "stock_quantity": 3,
              "attributes": { "size": "43" } }
        ]
    })
}

#[tokio::test]
async fn retailer_creates_product_with_variants_in_one_request() {
    let (app, retailer_token, _, admin_token) = app_with_roles().await;
    let (category_id, brand_id) = create_taxonomy(&app, &admin_token).await;

    let (status, body) = app
        .post(
            "/api/v1/retailer/products",
            Some(&retailer_token),
            wizard_payload(&category_id, &brand_id),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "body: {body}");
    assert_eq!(body["product"]["slug"], "runner");
    assert_eq!(body["variants"].as_array().map(Vec::len), Some(2));

    // Public detail carries category, brand and an empty review summary.
    let product_id = body["product"]["id"].as_str().unwrap();
    let (status, detail) = app
        .get(&format!("/api/v1/products/{}", product_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["category"]["slug"], "shoes");
    assert_eq!(detail["brand"]["slug"], "acme");
    assert_eq!(detail["reviews"]["review_count"], 0);
}

#[tokio::test]
async fn product_creation_is_gated_to_staff() {
    let (app, _, customer_token, admin_token) = app_with_roles().await;
    let (category_id, brand_id) = create_taxonomy(&app, &admin_token).await;

    let (status, _) = app
        .post(
            "/api/v1/retailer/products",
            Some(&customer_token),
            wizard_payload(&category_id, &brand_id),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            "/api/v1/retailer/products",
            None,
            wizard_payload(&category_id, &brand_id),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn failed_wizard_persists_nothing() {
    let (app, retailer_token, _, admin_token) = app_with_roles().await;
    let (category_id, brand_id) = create_taxonomy(&app, &admin_token).await;

    let mut payload = wizard_payload(&category_id, &brand_id);
    // Duplicate SKU inside one submission; the whole request must roll back.
    payload["variants"][1]["sku"] = json!("RUN-42");

    let (status, body) = app
        .post("/api/v1/retailer/products", Some(&retailer_token), payload)
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "body: {body}");

    let (_, listing) = app.get("/api/v1/products", None).await;
    assert_eq!(listing["total"], 0, "no partial product may survive");
}

#[tokio::test]
async fn product_without_variants_is_rejected() {
    let (app, retailer_token, _, admin_token) = app_with_roles().await;
    let (category_id, brand_id) = create_taxonomy(&app, &admin_token).await;

    let mut payload = wizard_payload(&category_id, &brand_id);
    payload["variants"] = json!([]);

    let (status, _) = app
        .post("/api/v1/retailer/products", Some(&retailer_token), payload)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn brand_facet_lists_only_brands_used_in_category() {
    let (app, retailer_token, _, admin_token) = app_with_roles().await;
    let (category_id, brand_id) = create_taxonomy(&app, &admin_token).await;

    // A second brand with no products in the category.
    let (_, idle_brand) = app
        .post(
            "/api/v1/admin/brands",
            Some(&admin_token),
            json!({ "name": "Idle", "slug": "idle" }),
        )
        .await;

    app.post(
        "/api/v1/retailer/products",
        Some(&retailer_token),
        wizard_payload(&category_id, &brand_id),
    )
    .await;

    let (status, brands) = app
        .get(&format!("/api/v1/categories/{}/brands", category_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let slugs: Vec<&str> = brands
        .as_array()
        .expect("brand array")
        .iter()
        .filter_map(|b| b["slug"].as_str())
        .collect();
    assert!(slugs.contains(&"acme"));
    assert!(!slugs.contains(&"idle"), "unused brand leaked: {idle_brand}");
}

#[tokio::test]
async fn listing_filters_and_aggregates_variants() {
    let (app, retailer_token, _, admin_token) = app_with_roles().await;
    let (category_id, brand_id) = create_taxonomy(&app, &admin_token).await;

    app.post(
        "/api/v1/retailer/products",
        Some(&retailer_token),
        wizard_payload(&category_id, &brand_id),
    )
    .await;

    let (status, listing) = app
        .get(&format!("/api/v1/products?category_id={}", category_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["total"], 1);
    let item = &listing["data"][0];
    assert_eq!(item["variant_count"], 2);
    assert_eq!(as_f64(&item["price_from"]), 89.90);

    let (_, empty) = app
        .get("/api/v1/products?search=nonexistent", None)
        .await;
    assert_eq!(empty["total"], 0);
}

#[tokio::test]
async fn category_with_products_cannot_be_deleted() {
    let (app, retailer_token, _, admin_token) = app_with_roles().await;
    let (category_id, brand_id) = create_taxonomy(&app, &admin_token).await;

    app.post(
        "/api/v1/retailer/products",
        Some(&retailer_token),
        wizard_payload(&category_id, &brand_id),
    )
    .await;

    let (status, _) = app
        .request(
            axum::http::Method::DELETE,
            &format!("/api/v1/admin/categories/{}", category_id),
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn review_upsert_replaces_previous_rating() {
    let (app, retailer_token, customer_token, admin_token) = app_with_roles().await;
    let (category_id, brand_id) = create_taxonomy(&app, &admin_token).await;

    let (_, created) = app
        .post(
            "/api/v1/retailer/products",
            Some(&retailer_token),
            wizard_payload(&category_id, &brand_id),
        )
        .await;
    let product_id = created["product"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .post(
            "/api/v1/reviews",
            Some(&customer_token),
            json!({ "product_id": product_id, "rating": 2, "comment": "meh" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, review) = app
        .post(
            "/api/v1/reviews",
            Some(&customer_token),
            json!({ "product_id": product_id, "rating": 5, "comment": "grew on me" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(review["rating"], 5);

    let (_, listing) = app
        .get(&format!("/api/v1/products/{}/reviews", product_id), None)
        .await;
    assert_eq!(listing["total"], 1, "one review per user and product");
    assert_eq!(listing["data"][0]["review"]["rating"], 5);

    let (status, _) = app
        .post(
            "/api/v1/reviews",
            Some(&customer_token),
            json!({ "product_id": product_id, "rating": 6 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn variant_media_joins_back_to_its_variant() {
    use sea_orm::EntityTrait;
    use storefront_api::entities::{product_media, product_variant};

    let app = TestApp::new().await;
    let (retailer, _) = app.create_user("media@example.com", UserRole::Retailer).await;
    let (product_id, variant_id) = app
        .seed_product(retailer.id, "MEDIA-1", dec!(10.00), 3)
        .await;

    app.state
        .services
        .catalog
        .add_media(
            product_id,
            Some(variant_id),
            "product_images/media-1.jpg".to_string(),
            "image/jpeg".to_string(),
        )
        .await
        .expect("attach media");

    let rows = product_media::Entity::find()
        .find_also_related(product_variant::Entity)
        .all(&*app.state.db)
        .await
        .expect("join media to variants");
    assert_eq!(rows.len(), 1);
    let (media, variant) = &rows[0];
    assert_eq!(media.variant_id, Some(variant_id));
    assert_eq!(variant.as_ref().map(|v| v.id), Some(variant_id));
}

#[tokio::test]
async fn banner_update_rejects_empty_title() {
    let (app, _, _, admin_token) = app_with_roles().await;

    // Validation fires before the lookup, so any id works.
    let (status, body) = app
        .put(
            &format!("/api/v1/admin/banners/{}", uuid::Uuid::new_v4()),
            Some(&admin_token),
            json!({ "title": "" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body["message"].as_str().unwrap_or_default().is_empty());
}
