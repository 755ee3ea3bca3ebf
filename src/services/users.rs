use crate::{
    auth::{self, AuthService},
    entities::user::{self, UserRole},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Account registration, login and profile management.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
    events: EventSender,
    auth: Arc<AuthService>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileInput {
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

impl UserService {
    pub fn new(db: Arc<DatabaseConnection>, events: EventSender, auth: Arc<AuthService>) -> Self {
        Self { db, events, auth }
    }

    /// Register a new customer or retailer account and issue a token.
    ///
    /// Admin accounts are provisioned out of band, never through this path.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(
        &self,
        input: RegisterInput,
    ) -> Result<(user::Model, String), ServiceError> {
        if input.role == UserRole::Admin {
            return Err(ServiceError::Forbidden(
                "Admin accounts cannot be self-registered".to_string(),
            ));
        }

        let existing = user::Entity::find()
            .filter(user::Column::Email.eq(input.email.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "An account with email {} already exists",
                input.email
            )));
        }

        let password_hash = auth::hash_password(&input.password)
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;

        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(input.email),
            password_hash: Set(password_hash),
            full_name: Set(input.full_name),
            phone: Set(input.phone),
            role: Set(input.role),
            profile_image: Set(None),
            active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };

        let created = model.insert(&*self.db).await?;
        let token = self
            .auth
            .issue_token(&created)
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;

        self.events
            .send_or_log(Event::UserRegistered(created.id))
            .await;
        info!("Registered user {}", created.id);
        Ok((created, token))
    }

    /// Verify credentials and issue a token.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(user::Model, String), ServiceError> {
        let user = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::AuthError("Invalid email or password".to_string()))?;

        if !user.active {
            return Err(ServiceError::AuthError("Account is disabled".to_string()));
        }

        let ok = auth::verify_password(&user.password_hash, password)
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;
        if !ok {
            return Err(ServiceError::AuthError(
                "Invalid email or password".to_string(),
            ));
        }

        let token = self
            .auth
            .issue_token(&user)
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;
        Ok((user, token))
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))
    }

    #[instrument(skip(self, input))]
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        input: UpdateProfileInput,
    ) -> Result<user::Model, ServiceError> {
        let user = self.get_profile(user_id).await?;
        let mut active: user::ActiveModel = user.into();

        if let Some(full_name) = input.full_name {
            active.full_name = Set(full_name);
        }
        if let Some(phone) = input.phone {
            active.phone = Set(Some(phone));
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db).await?;
        self.events
            .send_or_log(Event::ProfileUpdated(user_id))
            .await;
        Ok(updated)
    }

    /// Record the path of a freshly uploaded profile image.
    pub async fn set_profile_image(
        &self,
        user_id: Uuid,
        path: String,
    ) -> Result<user::Model, ServiceError> {
        let user = self.get_profile(user_id).await?;
        let mut active: user::ActiveModel = user.into();
        active.profile_image = Set(Some(path));
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }
}
