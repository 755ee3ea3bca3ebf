use crate::handlers::{map_service_error, success_response, validate_input};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    services::{uploads::UploadKind, users::UpdateProfileInput},
    AppState,
};
use axum::{
    extract::{Json, Multipart, State},
    routing::{get, post, put},
    Extension, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

/// Creates the router for authenticated profile endpoints
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/profile", get(get_profile))
        .route("/profile", put(update_profile))
        .route("/profile/image", post(upload_profile_image))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1))]
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let profile = state
        .services
        .users
        .get_profile(user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(profile))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let profile = state
        .services
        .users
        .update_profile(
            user.user_id,
            UpdateProfileInput {
                full_name: payload.full_name,
                phone: payload.phone,
            },
        )
        .await
        .map_err(map_service_error)?;
    Ok(success_response(profile))
}

/// Upload a profile image (multipart field `profileImage`, jpeg/jpg/png only)
async fn upload_profile_image(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest {
            message: format!("Invalid multipart body: {}", e),
        })?
    {
        if field.name() == Some("profileImage") {
            let name = field.file_name().unwrap_or("profile.jpg").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest {
                    message: format!("Failed to read uploaded file: {}", e),
                })?
                .to_vec();
            file = Some((name, data));
        }
    }

    let (name, data) = file.ok_or_else(|| ApiError::BadRequest {
        message: "Missing 'profileImage' field".to_string(),
    })?;

    let stored = state
        .services
        .uploads
        .save_image(UploadKind::Profile, &name, data)
        .await
        .map_err(map_service_error)?;

    let profile = state
        .services
        .users
        .set_profile_image(user.user_id, stored.relative_path.clone())
        .await
        .map_err(map_service_error)?;

    Ok(success_response(serde_json::json!({
        "user": profile,
        "image": stored,
    })))
}
