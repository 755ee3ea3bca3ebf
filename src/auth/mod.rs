//! Authentication and authorization.
//!
//! Bearer JWTs carry `{sub, email, role}` and are verified on every request
//! to a protected route group. Role gating is middleware-based: `require_auth`
//! validates the token and stores an [`AuthUser`] extension, `require_admin`
//! and `require_staff` check the stored role.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::entities::user::{self, UserRole};
use crate::AppState;

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// Authenticated user data extracted from a validated token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Retailers and admins may manage catalog content.
    pub fn is_staff(&self) -> bool {
        matches!(self.role, UserRole::Admin | UserRole::Retailer)
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: String,
    pub audience: String,
    pub token_ttl: Duration,
}

impl AuthConfig {
    pub fn new(jwt_secret: String, issuer: String, audience: String, token_ttl: Duration) -> Self {
        Self {
            jwt_secret,
            issuer,
            audience,
            token_ttl,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication token")]
    MissingToken,
    #[error("Invalid authentication token")]
    InvalidToken,
    #[error("Token has expired")]
    ExpiredToken,
    #[error("Insufficient permissions")]
    InsufficientPermissions,
    #[error("Failed to create token: {0}")]
    TokenCreation(String),
    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, label) = match &self {
            AuthError::InsufficientPermissions => (StatusCode::FORBIDDEN, "Forbidden"),
            AuthError::TokenCreation(_) | AuthError::Hashing(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
            _ => (StatusCode::UNAUTHORIZED, "Unauthorized"),
        };
        let body = Json(serde_json::json!({
            "error": label,
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

/// Issues and validates JWTs.
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Issue an access token for the given user.
    pub fn issue_token(&self, user: &user::Model) -> Result<String, AuthError> {
        let now = Utc::now();
        let ttl = ChronoDuration::from_std(self.config.token_ttl)
            .map_err(|e| AuthError::TokenCreation(e.to_string()))?;
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Validate a token and return its claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.config.audience.clone()]);
        validation.set_issuer(&[self.config.issuer.clone()]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            debug!("Token validation failed: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken,
            }
        })?;
        Ok(data.claims)
    }

    /// Resolve validated claims into an [`AuthUser`].
    pub fn auth_user_from_claims(&self, claims: &Claims) -> Result<AuthUser, AuthError> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        let role = UserRole::parse(&claims.role).ok_or(AuthError::InvalidToken)?;
        Ok(AuthUser {
            user_id,
            email: claims.email.clone(),
            role,
        })
    }
}

/// Hash a password with argon2id and a fresh salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Verify a password against a stored argon2 hash.
pub fn verify_password(hash: &str, password: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::Hashing(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Middleware: validate the bearer token and attach an [`AuthUser`] extension.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(&req).ok_or(AuthError::MissingToken)?;
    let claims = state.auth.validate_token(token)?;
    let auth_user = state.auth.auth_user_from_claims(&claims)?;
    req.extensions_mut().insert(auth_user);
    Ok(next.run(req).await)
}

/// Middleware: require the `admin` role. Must run inside `require_auth`.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AuthError> {
    let user = req
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingToken)?;
    if !user.is_admin() {
        return Err(AuthError::InsufficientPermissions);
    }
    Ok(next.run(req).await)
}

/// Middleware: require the `retailer` or `admin` role. Must run inside
/// `require_auth`.
pub async fn require_staff(req: Request, next: Next) -> Result<Response, AuthError> {
    let user = req
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingToken)?;
    if !user.is_staff() {
        return Err(AuthError::InsufficientPermissions);
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn service() -> AuthService {
        AuthService::new(AuthConfig::new(
            "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            "storefront-api".to_string(),
            "storefront-clients".to_string(),
            Duration::from_secs(3600),
        ))
    }

    fn test_user(role: UserRole) -> user::Model {
        user::Model {
            id: Uuid::new_v4(),
            email: "jordan@example.com".to_string(),
            password_hash: String::new(),
            full_name: "Jordan Doe".to_string(),
            phone: None,
            role,
            profile_image: None,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn issued_token_round_trips() {
        let svc = service();
        let user = test_user(UserRole::Admin);
        let token = svc.issue_token(&user).expect("issue token");

        let claims = svc.validate_token(&token).expect("validate token");
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.role, "admin");

        let auth_user = svc.auth_user_from_claims(&claims).expect("resolve claims");
        assert!(auth_user.is_admin());
        assert!(auth_user.is_staff());
    }

    #[test]
    fn garbage_token_is_rejected() {
        let svc = service();
        assert!(matches!(
            svc.validate_token("not-a-jwt"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let svc = service();
        let other = AuthService::new(AuthConfig::new(
            "another_secret_key_entirely_with_enough_length_xx".to_string(),
            "storefront-api".to_string(),
            "storefront-clients".to_string(),
            Duration::from_secs(3600),
        ));
        let token = other
            .issue_token(&test_user(UserRole::Customer))
            .expect("issue token");
        assert!(svc.validate_token(&token).is_err());
    }

    #[test]
    fn customer_is_not_staff() {
        let svc = service();
        let token = svc
            .issue_token(&test_user(UserRole::Customer))
            .expect("issue token");
        let claims = svc.validate_token(&token).expect("validate");
        let user = svc.auth_user_from_claims(&claims).expect("resolve");
        assert!(!user.is_admin());
        assert!(!user.is_staff());
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("s3cret-password").expect("hash");
        assert!(verify_password(&hash, "s3cret-password").expect("verify"));
        assert!(!verify_password(&hash, "wrong-password").expect("verify"));
    }
}
