use crate::handlers::{created_response, map_service_error, success_response, validate_input};
use crate::{
    entities::user::UserRole,
    errors::ApiError,
    services::users::RegisterInput,
    AppState,
};
use axum::{
    extract::{Json, State},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// Creates the router for authentication endpoints
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(length(min = 1))]
    pub full_name: String,
    pub phone: Option<String>,
    /// "customer" (default) or "retailer".
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
    user: crate::entities::user::Model,
}

/// Register a new customer or retailer account
async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let role = match payload.role.as_deref() {
        None => UserRole::Customer,
        Some(r) => UserRole::parse(r).ok_or_else(|| ApiError::ValidationError {
            message: format!("Unknown role '{}'", r),
        })?,
    };

    let input = RegisterInput {
        email: payload.email,
        password: payload.password,
        full_name: payload.full_name,
        phone: payload.phone,
        role,
    };

    let (user, token) = state
        .services
        .users
        .register(input)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(AuthResponse { token, user }))
}

/// Exchange credentials for a bearer token
async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let (user, token) = state
        .services
        .users
        .login(&payload.email, &payload.password)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(AuthResponse { token, user }))
}
