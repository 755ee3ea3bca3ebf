use crate::handlers::{created_response, map_service_error, no_content_response, success_response};
use crate::{auth::AuthUser, errors::ApiError, AppState};
use axum::{
    extract::{Json, Path, State},
    routing::{delete, get, post},
    Extension, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_wishlist))
        .route("/items", post(add_item))
        .route("/items/:item_id", delete(remove_item))
}

#[derive(Debug, Deserialize)]
pub struct AddWishlistRequest {
    pub variant_id: Uuid,
}

async fn list_wishlist(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let entries = state
        .services
        .wishlist
        .list(user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(entries))
}

async fn add_item(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<AddWishlistRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let item = state
        .services
        .wishlist
        .add(user.user_id, payload.variant_id)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(item))
}

async fn remove_item(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(item_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .wishlist
        .remove(user.user_id, item_id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
