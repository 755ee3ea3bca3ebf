use crate::handlers::{
    created_response, map_service_error, success_response, validate_input, Paginated,
    PaginationParams,
};
use crate::{
    auth::AuthUser,
    entities::order::OrderStatus,
    errors::ApiError,
    services::orders::PlaceOrderInput,
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post, put},
    Extension, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Customer order endpoints
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(place_order))
        .route("/", get(list_orders))
        .route("/:id", get(get_order))
        .route("/:id/cancel", post(cancel_order))
}

/// Admin order management
pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(admin_list_orders))
        .route("/:id", get(admin_get_order))
        .route("/:id/status", put(update_status))
}

#[derive(Debug, Deserialize, Validate)]
pub struct PlaceOrderRequest {
    #[validate(length(min = 1))]
    pub shipping_name: String,
    #[validate(length(min = 1))]
    pub shipping_phone: String,
    #[validate(length(min = 1))]
    pub shipping_address: String,
    #[validate(length(min = 1))]
    pub shipping_city: String,
    #[validate(length(min = 1))]
    pub shipping_postal_code: String,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminOrderQuery {
    pub status: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

async fn place_order(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<PlaceOrderRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let order = state
        .services
        .orders
        .place_order(
            user.user_id,
            PlaceOrderInput {
                shipping_name: payload.shipping_name,
                shipping_phone: payload.shipping_phone,
                shipping_address: payload.shipping_address,
                shipping_city: payload.shipping_city,
                shipping_postal_code: payload.shipping_postal_code,
                coupon_code: payload.coupon_code,
            },
        )
        .await
        .map_err(map_service_error)?;
    Ok(created_response(order))
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (orders, total) = state
        .services
        .orders
        .list_for_user(user.user_id, params.page(), params.per_page())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(Paginated::new(orders, total, &params)))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .get_order(id, user.user_id, user.is_admin())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .cancel_order(user.user_id, id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

async fn admin_list_orders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdminOrderQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let status = match query.status.as_deref() {
        None => None,
        Some(s) => Some(OrderStatus::parse(s).ok_or_else(|| ApiError::BadRequest {
            message: format!("Unknown order status '{}'", s),
        })?),
    };
    let params = PaginationParams {
        page: query.page,
        per_page: query.per_page,
    };
    let (orders, total) = state
        .services
        .orders
        .admin_list(status, params.page(), params.per_page())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(Paginated::new(orders, total, &params)))
}

async fn admin_get_order(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .get_order(id, user.user_id, true)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let next = OrderStatus::parse(&payload.status).ok_or_else(|| ApiError::BadRequest {
        message: format!("Unknown order status '{}'", payload.status),
    })?;
    let order = state
        .services
        .orders
        .advance_status(id, next)
        .await
        .map_err(map_service_error)?;

    state
        .services
        .notifications
        .notify(
            order.user_id,
            "Order update",
            &format!("Your order {} is now {}.", order.id, order.status.as_str()),
        )
        .await
        .map_err(map_service_error)?;

    Ok(success_response(order))
}
