use crate::handlers::{map_service_error, success_response, Paginated, PaginationParams};
use crate::{auth::AuthUser, errors::ApiError, AppState};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use uuid::Uuid;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/:id/read", post(mark_read))
}

async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (notifications, total) = state
        .services
        .notifications
        .list_for_user(user.user_id, params.page(), params.per_page())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(Paginated::new(
        notifications,
        total,
        &params,
    )))
}

async fn unread_count(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let count = state
        .services
        .notifications
        .unread_count(user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({ "unread": count })))
}

async fn mark_read(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let notification = state
        .services
        .notifications
        .mark_read(user.user_id, id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(notification))
}
