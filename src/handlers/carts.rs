use crate::handlers::{map_service_error, no_content_response, success_response, validate_input};
use crate::{auth::AuthUser, errors::ApiError, AppState};
use axum::{
    extract::{Json, Path, State},
    routing::{delete, get, post, put},
    Extension, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Cart lines hold units against the variant's stock until ordered or
/// removed, so every mutation returns the recomputed cart view.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_cart))
        .route("/items", post(add_item))
        .route("/items/:item_id", put(update_quantity))
        .route("/items/:item_id", delete(remove_item))
        .route("/", delete(clear_cart))
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddItemRequest {
    pub variant_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i32,
}

async fn get_cart(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .get_cart(user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

async fn add_item(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<AddItemRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let cart = state
        .services
        .cart
        .add_item(user.user_id, payload.variant_id, payload.quantity)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

async fn update_quantity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .update_quantity(user.user_id, item_id, payload.quantity)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

async fn remove_item(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(item_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .remove_item(user.user_id, item_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

async fn clear_cart(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .cart
        .clear_cart(user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
