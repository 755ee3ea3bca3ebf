use crate::handlers::{created_response, map_service_error, no_content_response, success_response, validate_input};
use crate::{
    errors::ApiError,
    services::catalog::{CreateCategoryInput, UpdateCategoryInput},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Public category reads, including the per-category brand facet used by
/// the product-creation wizard and storefront filters.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_categories))
        .route("/:id/brands", get(brands_for_category))
}

/// Admin category management
pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_category))
        .route("/", get(list_all_categories))
        .route("/:id", put(update_category))
        .route("/:id", delete(delete_category))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub slug: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub include_inactive: Option<bool>,
}

async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let categories = state
        .services
        .catalog
        .list_categories(false)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(categories))
}

async fn list_all_categories(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let categories = state
        .services
        .catalog
        .list_categories(query.include_inactive.unwrap_or(true))
        .await
        .map_err(map_service_error)?;
    Ok(success_response(categories))
}

async fn brands_for_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let brands = state
        .services
        .catalog
        .brands_for_category(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(brands))
}

async fn create_category(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let category = state
        .services
        .catalog
        .create_category(CreateCategoryInput {
            name: payload.name,
            slug: payload.slug,
            description: payload.description,
        })
        .await
        .map_err(map_service_error)?;
    Ok(created_response(category))
}

async fn update_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let category = state
        .services
        .catalog
        .update_category(
            id,
            UpdateCategoryInput {
                name: payload.name,
                description: payload.description,
                active: payload.active,
            },
        )
        .await
        .map_err(map_service_error)?;
    Ok(success_response(category))
}

async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .catalog
        .delete_category(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
