use crate::handlers::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    Paginated, PaginationParams,
};
use crate::{
    entities::coupon::CouponKind,
    errors::ApiError,
    services::coupons::{CreateCouponInput, UpdateCouponInput},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{delete, get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Customer-facing coupon preview; discount math matches order placement.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/preview", post(preview_coupon))
}

/// Admin coupon management
pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_coupon))
        .route("/", get(list_coupons))
        .route("/:id", put(update_coupon))
        .route("/:id", delete(delete_coupon))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCouponRequest {
    #[validate(length(min = 1))]
    pub code: String,
    pub kind: CouponKind,
    pub value: Decimal,
    #[serde(default)]
    pub min_order_total: Decimal,
    pub starts_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub usage_limit: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCouponRequest {
    pub value: Option<Decimal>,
    pub min_order_total: Option<Decimal>,
    pub expires_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PreviewRequest {
    #[validate(length(min = 1))]
    pub code: String,
    pub subtotal: Decimal,
}

async fn preview_coupon(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PreviewRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let preview = state
        .services
        .coupons
        .preview(&payload.code, payload.subtotal)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(preview))
}

async fn create_coupon(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCouponRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let coupon = state
        .services
        .coupons
        .create(CreateCouponInput {
            code: payload.code,
            kind: payload.kind,
            value: payload.value,
            min_order_total: payload.min_order_total,
            starts_at: payload.starts_at,
            expires_at: payload.expires_at,
            usage_limit: payload.usage_limit,
        })
        .await
        .map_err(map_service_error)?;
    Ok(created_response(coupon))
}

async fn list_coupons(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (coupons, total) = state
        .services
        .coupons
        .list(params.page(), params.per_page())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(Paginated::new(coupons, total, &params)))
}

async fn update_coupon(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCouponRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let coupon = state
        .services
        .coupons
        .update(
            id,
            UpdateCouponInput {
                value: payload.value,
                min_order_total: payload.min_order_total,
                expires_at: payload.expires_at,
                usage_limit: payload.usage_limit,
                active: payload.active,
            },
        )
        .await
        .map_err(map_service_error)?;
    Ok(success_response(coupon))
}

async fn delete_coupon(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .coupons
        .delete(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
