use crate::handlers::{created_response, map_service_error, no_content_response, success_response, validate_input};
use crate::{
    errors::ApiError,
    services::catalog::{CreateBrandInput, UpdateBrandInput},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(list_brands))
}

pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_brand))
        .route("/:id", put(update_brand))
        .route("/:id", delete(delete_brand))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBrandRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub slug: String,
    pub logo_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBrandRequest {
    pub name: Option<String>,
    pub logo_path: Option<String>,
    pub active: Option<bool>,
}

async fn list_brands(
    State(state): State<Arc<AppState>>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let brands = state
        .services
        .catalog
        .list_brands()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(brands))
}

async fn create_brand(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateBrandRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let brand = state
        .services
        .catalog
        .create_brand(CreateBrandInput {
            name: payload.name,
            slug: payload.slug,
            logo_path: payload.logo_path,
        })
        .await
        .map_err(map_service_error)?;
    Ok(created_response(brand))
}

async fn update_brand(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBrandRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let brand = state
        .services
        .catalog
        .update_brand(
            id,
            UpdateBrandInput {
                name: payload.name,
                logo_path: payload.logo_path,
                active: payload.active,
            },
        )
        .await
        .map_err(map_service_error)?;
    Ok(success_response(brand))
}

async fn delete_brand(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .catalog
        .delete_brand(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
