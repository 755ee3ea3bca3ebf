use crate::handlers::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    Paginated, PaginationParams,
};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    services::{
        catalog::{
            CreateProductInput, CreateVariantInput, ProductFilter, UpdateProductInput,
            UpdateVariantInput,
        },
        uploads::UploadKind,
    },
    AppState,
};
use axum::{
    extract::{Json, Multipart, Path, Query, State},
    routing::{delete, get, post, put},
    Extension, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Public catalog reads
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_products))
        .route("/:id", get(product_detail))
}

/// Retailer/admin product management. The wizard submits the product and
/// all its variants in one request; persistence is all-or-nothing.
pub fn staff_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_product))
        .route("/", get(list_all_products))
        .route("/:id", put(update_product))
        .route("/:id", delete(delete_product))
        .route("/:id/variants", post(add_variant))
        .route("/:id/media", post(upload_media))
        .route("/variants/:variant_id", put(update_variant))
        .route("/variants/:variant_id", delete(delete_variant))
}

// Serialize is required by the length rule on `CreateProductRequest::variants`;
// the validator records the offending value as a parameter of the error.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct VariantRequest {
    #[validate(length(min = 1))]
    pub sku: String,
    pub price: Decimal,
    pub stock_quantity: i32,
    #[serde(default)]
    pub attributes: serde_json::Value,
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    pub category_id: Uuid,
    pub brand_id: Uuid,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub slug: String,
    pub description: Option<String>,
    #[validate(length(min = 1, message = "at least one variant is required"))]
    pub variants: Vec<VariantRequest>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateVariantRequest {
    pub price: Option<Decimal>,
    pub attributes: Option<serde_json::Value>,
    pub position: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    pub search: Option<String>,
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl ProductListQuery {
    fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            per_page: self.per_page,
        }
    }

    fn filter(&self, include_inactive: bool) -> ProductFilter {
        ProductFilter {
            category_id: self.category_id,
            brand_id: self.brand_id,
            search: self.search.clone(),
            price_min: self.price_min,
            price_max: self.price_max,
            include_inactive: Some(include_inactive),
        }
    }
}

async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProductListQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let pagination = query.pagination();
    let filter = query.filter(false);
    let (items, total) = state
        .services
        .catalog
        .list_products(filter, pagination.page(), pagination.per_page())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(Paginated::new(items, total, &pagination)))
}

async fn list_all_products(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProductListQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let pagination = query.pagination();
    let filter = query.filter(true);
    let (items, total) = state
        .services
        .catalog
        .list_products(filter, pagination.page(), pagination.per_page())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(Paginated::new(items, total, &pagination)))
}

async fn product_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let detail = state
        .services
        .catalog
        .product_detail(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(detail))
}

async fn create_product(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = CreateProductInput {
        category_id: payload.category_id,
        brand_id: payload.brand_id,
        name: payload.name,
        slug: payload.slug,
        description: payload.description,
        variants: payload
            .variants
            .into_iter()
            .map(|v| CreateVariantInput {
                sku: v.sku,
                price: v.price,
                stock_quantity: v.stock_quantity,
                attributes: v.attributes,
                position: v.position,
            })
            .collect(),
    };

    let detail = state
        .services
        .catalog
        .create_product(user.user_id, input)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(detail))
}

async fn update_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let detail = state
        .services
        .catalog
        .update_product(
            id,
            UpdateProductInput {
                category_id: payload.category_id,
                brand_id: payload.brand_id,
                name: payload.name,
                description: payload.description,
                active: payload.active,
            },
        )
        .await
        .map_err(map_service_error)?;
    Ok(success_response(detail))
}

async fn delete_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .catalog
        .delete_product(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

async fn add_variant(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<VariantRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let variant = state
        .services
        .catalog
        .add_variant(
            id,
            CreateVariantInput {
                sku: payload.sku,
                price: payload.price,
                stock_quantity: payload.stock_quantity,
                attributes: payload.attributes,
                position: payload.position,
            },
        )
        .await
        .map_err(map_service_error)?;
    Ok(created_response(variant))
}

async fn update_variant(
    State(state): State<Arc<AppState>>,
    Path(variant_id): Path<Uuid>,
    Json(payload): Json<UpdateVariantRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let variant = state
        .services
        .catalog
        .update_variant(
            variant_id,
            UpdateVariantInput {
                price: payload.price,
                attributes: payload.attributes,
                position: payload.position,
            },
        )
        .await
        .map_err(map_service_error)?;
    Ok(success_response(variant))
}

async fn delete_variant(
    State(state): State<Arc<AppState>>,
    Path(variant_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .catalog
        .delete_variant(variant_id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

/// Upload a product image (multipart field `image`, optional `variant_id`
/// text field to attach the image to one variant).
async fn upload_media(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut variant_id: Option<Uuid> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest {
            message: format!("Invalid multipart body: {}", e),
        })?
    {
        match field.name() {
            Some("image") => {
                let name = field.file_name().unwrap_or("image.jpg").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest {
                        message: format!("Failed to read uploaded file: {}", e),
                    })?
                    .to_vec();
                file = Some((name, data));
            }
            Some("variant_id") => {
                let text = field.text().await.map_err(|e| ApiError::BadRequest {
                    message: format!("Failed to read variant_id: {}", e),
                })?;
                variant_id =
                    Some(
                        Uuid::parse_str(text.trim()).map_err(|_| ApiError::BadRequest {
                            message: format!("'{}' is not a valid variant id", text),
                        })?,
                    );
            }
            _ => {}
        }
    }

    let (name, data) = file.ok_or_else(|| ApiError::BadRequest {
        message: "Missing 'image' field".to_string(),
    })?;

    let stored = state
        .services
        .uploads
        .save_image(UploadKind::Product, &name, data)
        .await
        .map_err(map_service_error)?;

    let media = state
        .services
        .catalog
        .add_media(
            id,
            variant_id,
            stored.relative_path.clone(),
            stored.mime_type.clone(),
        )
        .await
        .map_err(map_service_error)?;

    Ok(created_response(media))
}
