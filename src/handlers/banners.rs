use crate::handlers::{created_response, map_service_error, no_content_response, success_response, validate_input};
use crate::{
    errors::ApiError,
    services::{
        banners::{CreateBannerInput, UpdateBannerInput},
        uploads::UploadKind,
    },
    AppState,
};
use axum::{
    extract::{Json, Multipart, Path, State},
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Public: active banners for the storefront home page.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(active_banners))
}

/// Admin banner management. Creation is multipart so the image and its
/// metadata land in one request.
pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_banner))
        .route("/", get(list_banners))
        .route("/:id", put(update_banner))
        .route("/:id", delete(delete_banner))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBannerRequest {
    #[validate(length(min = 1, message = "title cannot be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "target_url cannot be empty"))]
    pub target_url: Option<String>,
    pub position: Option<i32>,
    pub active: Option<bool>,
}

async fn active_banners(
    State(state): State<Arc<AppState>>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let banners = state
        .services
        .banners
        .active()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(banners))
}

async fn list_banners(
    State(state): State<Arc<AppState>>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let banners = state
        .services
        .banners
        .list_all()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(banners))
}

/// Multipart fields: `image` (file), `title` (text), optional `target_url`
/// and `position` text fields.
async fn create_banner(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut title: Option<String> = None;
    let mut target_url: Option<String> = None;
    let mut position: Option<i32> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest {
            message: format!("Invalid multipart body: {}", e),
        })?
    {
        match field.name() {
            Some("image") => {
                let name = field.file_name().unwrap_or("banner.jpg").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest {
                        message: format!("Failed to read uploaded file: {}", e),
                    })?
                    .to_vec();
                file = Some((name, data));
            }
            Some("title") => {
                title = Some(field.text().await.map_err(|e| ApiError::BadRequest {
                    message: format!("Failed to read title: {}", e),
                })?);
            }
            Some("target_url") => {
                target_url = Some(field.text().await.map_err(|e| ApiError::BadRequest {
                    message: format!("Failed to read target_url: {}", e),
                })?);
            }
            Some("position") => {
                let text = field.text().await.map_err(|e| ApiError::BadRequest {
                    message: format!("Failed to read position: {}", e),
                })?;
                position =
                    Some(
                        text.trim()
                            .parse::<i32>()
                            .map_err(|_| ApiError::BadRequest {
                                message: format!("'{}' is not a valid position", text),
                            })?,
                    );
            }
            _ => {}
        }
    }

    let (name, data) = file.ok_or_else(|| ApiError::BadRequest {
        message: "Missing 'image' field".to_string(),
    })?;
    let title = title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest {
            message: "Missing 'title' field".to_string(),
        })?;

    let stored = state
        .services
        .uploads
        .save_image(UploadKind::Banner, &name, data)
        .await
        .map_err(map_service_error)?;

    let banner = state
        .services
        .banners
        .create(CreateBannerInput {
            title,
            image_path: stored.relative_path,
            target_url,
            position,
        })
        .await
        .map_err(map_service_error)?;
    Ok(created_response(banner))
}

async fn update_banner(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBannerRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let banner = state
        .services
        .banners
        .update(
            id,
            UpdateBannerInput {
                title: payload.title,
                image_path: None,
                target_url: payload.target_url,
                position: payload.position,
                active: payload.active,
            },
        )
        .await
        .map_err(map_service_error)?;
    Ok(success_response(banner))
}

async fn delete_banner(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .banners
        .delete(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
