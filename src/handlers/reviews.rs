use crate::handlers::{
    map_service_error, no_content_response, success_response, validate_input, Paginated,
    PaginationParams,
};
use crate::{auth::AuthUser, errors::ApiError, AppState};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{delete, get, post},
    Extension, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Public review reads. Merged into the products router, so the full path
/// is `/products/:id/reviews`.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/:id/reviews", get(list_reviews))
}

/// Authenticated review writes. One review per user and product; posting
/// again replaces the earlier one.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(upsert_review))
        .route("/:id", delete(delete_review))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertReviewRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    pub comment: Option<String>,
}

async fn list_reviews(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (reviews, total) = state
        .services
        .reviews
        .list_for_product(product_id, params.page(), params.per_page())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(Paginated::new(reviews, total, &params)))
}

async fn upsert_review(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<UpsertReviewRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let review = state
        .services
        .reviews
        .upsert(
            user.user_id,
            payload.product_id,
            payload.rating,
            payload.comment,
        )
        .await
        .map_err(map_service_error)?;
    Ok(success_response(review))
}

async fn delete_review(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .reviews
        .delete(id, user.user_id, user.is_admin())
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
