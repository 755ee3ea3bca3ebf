pub mod auth;
pub mod banners;
pub mod brands;
pub mod carts;
pub mod categories;
pub mod coupons;
pub mod health;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod stock;
pub mod users;
pub mod wishlists;

use crate::errors::{ApiError, ServiceError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Standard no-content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ApiError> {
    input.validate().map_err(|e| ApiError::ValidationError {
        message: format!("Validation failed: {}", e),
    })
}

/// Map service errors to API errors
pub fn map_service_error(err: ServiceError) -> ApiError {
    match err {
        ServiceError::NotFound(msg) => ApiError::NotFound { message: msg },
        ServiceError::ValidationError(msg) => ApiError::ValidationError { message: msg },
        ServiceError::AuthError(msg) => ApiError::AuthError { message: msg },
        ServiceError::Forbidden(msg) => ApiError::Forbidden { message: msg },
        ServiceError::Conflict(msg) => ApiError::Conflict { message: msg },
        ServiceError::InvalidOperation(msg) => ApiError::BadRequest { message: msg },
        _ => ApiError::InternalServerError {
            message: "An unexpected error occurred".to_string(),
        },
    }
}

/// Common pagination query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl PaginationParams {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> u64 {
        self.per_page.unwrap_or(20).clamp(1, 100)
    }
}

/// Paginated response envelope.
#[derive(Debug, Serialize)]
pub struct Paginated<T: Serialize> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(data: Vec<T>, total: u64, params: &PaginationParams) -> Self {
        Self {
            data,
            total,
            page: params.page(),
            per_page: params.per_page(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults() {
        let params = PaginationParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.per_page(), 20);
    }

    #[test]
    fn pagination_clamps_extremes() {
        let params = PaginationParams {
            page: Some(0),
            per_page: Some(10_000),
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.per_page(), 100);
    }

    #[test]
    fn service_errors_map_to_api_errors() {
        let mapped = map_service_error(ServiceError::Conflict("duplicate SKU".into()));
        assert!(matches!(mapped, ApiError::Conflict { .. }));

        let mapped = map_service_error(ServiceError::InvalidOperation("cart is empty".into()));
        assert!(matches!(mapped, ApiError::BadRequest { .. }));

        let mapped = map_service_error(ServiceError::InternalError("boom".into()));
        assert!(matches!(mapped, ApiError::InternalServerError { .. }));
    }
}
